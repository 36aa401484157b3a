//! Error types for emukit

use thiserror::Error;

/// Main error type for the SDK
#[derive(Error, Debug)]
pub enum EmuError {
    #[error("Ring error: {0}")]
    Ring(#[from] RingError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Core error: {0}")]
    Core(String),

    #[error("Invalid session state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unsupported system: {0}")]
    UnsupportedSystem(String),
}

/// Ring buffer construction and handle errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    #[error("Ring capacity must be at least one slot")]
    ZeroCapacity,

    #[error("Ring capacity {0} exceeds the addressable maximum")]
    CapacityOverflow(usize),

    #[error("Producer and consumer belong to different rings")]
    ForeignHalf,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, EmuError>;
