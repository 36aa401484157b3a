//! Host integration for emukit
//!
//! Defines the protocol a core implements and the session runner that
//! connects a core to the audio and input transports.

pub mod bridge;
pub mod protocol;
pub mod session;
pub mod tone;

pub use bridge::{BridgeStats, CoreBridge, NullBridge, RingAudioBridge};
pub use protocol::{EmulationCore, PlayerConnectionBehavior};
pub use session::{RunnerState, SessionIo, SessionRunner};
pub use tone::{ToneCore, ToneError};
