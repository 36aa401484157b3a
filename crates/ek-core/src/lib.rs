//! Core primitives for the emukit emulation SDK
//!
//! This crate provides the lock-free SPSC ring primitive shared by the audio
//! and input transports, along with error handling, configuration, logging
//! and the system/feature descriptions a core advertises.

pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod ring;
pub mod system;

pub use config::Config;
pub use error::{ConfigError, EmuError, Result, RingError};
pub use features::CoreFeatures;
pub use ring::SpscRing;
pub use system::System;
