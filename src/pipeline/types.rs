//! Data types for the streaming dictation pipeline.

use std::time::Instant;

/// A bounded block of conditioned PCM bytes sent as one network frame.
///
/// Produced by the adaptive buffer, consumed exactly once by the transport.
/// Always carries whole 16-bit samples (even byte length).
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Little-endian 16-bit PCM bytes.
    pub bytes: Vec<u8>,
    /// Sequence number for ordering.
    pub sequence: u64,
    /// Timestamp when this chunk was emitted from the buffer.
    pub emitted_at: Instant,
}

impl Chunk {
    /// Creates a new chunk.
    pub fn new(bytes: Vec<u8>, sequence: u64) -> Self {
        Self {
            bytes,
            sequence,
            emitted_at: Instant::now(),
        }
    }

    /// Chunk payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the chunk carries no audio.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Events a running session reports to its caller.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A transcript update: the latest interim hypothesis or a final segment.
    Transcript { text: String, is_final: bool },
    /// The transport connection state changed.
    StateChanged(crate::transport::ConnectionState),
    /// A non-fatal protocol problem (e.g. a skipped malformed frame).
    Warning(String),
    /// A fatal in-flight failure; the session is shutting down.
    Error(String),
}
