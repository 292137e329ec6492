//! Default configuration constants for scribewire.
//!
//! Shared constants used across configuration types to keep the audio,
//! buffering, and transport layers consistent.

use std::time::Duration;

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and network bandwidth for streaming transcription.
pub const SAMPLE_RATE: u32 = 16_000;

/// Default channel count. Dictation audio is mono.
pub const CHANNELS: u16 = 1;

/// Default target chunk size in bytes sent per network frame.
pub const TARGET_CHUNK_BYTES: usize = 4_096;

/// Smallest chunk worth sending. Non-forced flushes below this are no-ops.
pub const MIN_CHUNK_BYTES: usize = 1_024;

/// Largest allowed target chunk size.
pub const MAX_CHUNK_BYTES: usize = 16_384;

/// Hard ceiling on buffered-but-unsent audio. Reaching it forces a flush,
/// bounding memory regardless of network stalls.
pub const BUFFER_HARD_CAP_BYTES: usize = 32_768;

/// Period of the buffer flush timer. Bounds worst-case chunk latency under
/// slow capture rates.
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Noise gate threshold: samples with absolute amplitude below this are
/// zeroed during conditioning.
pub const NOISE_GATE_THRESHOLD: i32 = 100;

/// Soft compression factor applied to every sample during conditioning.
pub const COMPRESSION_FACTOR: f64 = 0.9;

/// Send latency above which the buffer grows its target chunk size.
pub const LATENCY_GROW_THRESHOLD_MS: u64 = 200;

/// Send latency below which (on a stable connection) the buffer shrinks
/// its target chunk size.
pub const LATENCY_SHRINK_THRESHOLD_MS: u64 = 50;

/// Default recognition model requested from the service.
pub const DEFAULT_MODEL: &str = "nova-2";

/// Default language code for transcription.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Bounded wait for the pre-start reachability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounded wait for the connection open.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded wait for the closing handshake after CloseStream is sent.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "SCRIBEWIRE_API_KEY";
