//! scribewire - Real-time dictation streaming core
//!
//! Microphone PCM → signal conditioning → adaptive buffering → WebSocket
//! streaming to a cloud speech API → transcript reconciliation.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod transcript;
pub mod transport;

// Core traits (source → process → send)
pub use audio::capture::{CaptureSource, MockCaptureSource, ScriptedCaptureSource};
pub use transport::credentials::{CredentialProvider, EnvCredentialProvider, StaticToken};

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineConfig, Recorder, SessionHandle, SessionStatus};
pub use pipeline::types::SessionEvent;

// Error handling
pub use error::{Result, ScribeError};

// Config
pub use config::Config;

// Transport
pub use transport::state::ConnectionState;

// Station framework (for advanced users)
pub use pipeline::error::{ErrorReporter, StationError};
pub use pipeline::station::Station;

/// Build version string with optional git commit hash.
///
/// Returns `"0.2.0+abc1234"` when git hash is available, `"0.2.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }
}
