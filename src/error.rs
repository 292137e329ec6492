//! Error types for scribewire.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribeError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    // Session preconditions
    #[error("No API credential configured: {message}")]
    Unconfigured { message: String },

    #[error("Recognition service unreachable at {endpoint}: {message}")]
    Unreachable { endpoint: String, message: String },

    // Audio capture errors
    #[error("Audio device unavailable: {message}")]
    DeviceUnavailable { message: String },

    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Transport errors
    #[error("Transport failed: {message}")]
    Transport { message: String },

    #[error("Malformed result frame: {message}")]
    MalformedFrame { message: String },
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScribeError>;
