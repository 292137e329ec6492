use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub buffer: BufferConfig,
    pub transport: TransportConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Adaptive buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BufferConfig {
    pub target_chunk_bytes: usize,
    pub min_chunk_bytes: usize,
    pub max_chunk_bytes: usize,
    pub hard_cap_bytes: usize,
    pub flush_interval_ms: u64,
}

/// Streaming transport configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    pub endpoint: String,
    pub model: String,
    pub language: String,
    pub diarize: bool,
    pub probe_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub close_timeout_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            target_chunk_bytes: defaults::TARGET_CHUNK_BYTES,
            min_chunk_bytes: defaults::MIN_CHUNK_BYTES,
            max_chunk_bytes: defaults::MAX_CHUNK_BYTES,
            hard_cap_bytes: defaults::BUFFER_HARD_CAP_BYTES,
            flush_interval_ms: defaults::FLUSH_INTERVAL.as_millis() as u64,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://api.deepgram.com/v1/listen".to_string(),
            model: defaults::DEFAULT_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            diarize: false,
            probe_timeout_secs: defaults::PROBE_TIMEOUT.as_secs(),
            connect_timeout_secs: defaults::CONNECT_TIMEOUT.as_secs(),
            close_timeout_secs: defaults::CLOSE_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file is missing
    ///
    /// Invalid TOML still surfaces as an error message on stderr; only a
    /// missing file silently falls back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    eprintln!("scribewire: invalid config ({e}), using defaults");
                    Self::default()
                }
            }
        }
    }

    /// Check invariants the buffer layer depends on.
    pub fn validate(&self) -> anyhow::Result<()> {
        let b = &self.buffer;
        if b.min_chunk_bytes == 0 || b.min_chunk_bytes % 2 != 0 {
            anyhow::bail!("buffer.min_chunk_bytes must be a positive even number");
        }
        if b.target_chunk_bytes < b.min_chunk_bytes || b.target_chunk_bytes > b.max_chunk_bytes {
            anyhow::bail!(
                "buffer.target_chunk_bytes must lie in [{}, {}]",
                b.min_chunk_bytes,
                b.max_chunk_bytes
            );
        }
        if b.hard_cap_bytes < b.max_chunk_bytes {
            anyhow::bail!("buffer.hard_cap_bytes must be >= buffer.max_chunk_bytes");
        }
        if self.audio.channels == 0 {
            anyhow::bail!("audio.channels must be at least 1");
        }
        Ok(())
    }
}
