//! Performance counters for the streaming pipeline.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Read-only projection of pipeline performance, recomputed on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSnapshot {
    /// Total conditioned bytes emitted as chunks.
    pub bytes_processed: u64,
    /// Number of chunks emitted.
    pub chunks_emitted: u64,
    /// Running average chunk size in bytes.
    pub average_chunk_size: f64,
    /// Running average chunk send latency in milliseconds.
    pub average_latency_ms: f64,
    /// Current accumulation length divided by the hard cap. Never above 1.0.
    pub buffer_utilization: f64,
}

impl PerformanceSnapshot {
    /// An empty snapshot (fresh session).
    pub fn empty() -> Self {
        Self {
            bytes_processed: 0,
            chunks_emitted: 0,
            average_chunk_size: 0.0,
            average_latency_ms: 0.0,
            buffer_utilization: 0.0,
        }
    }
}

/// Latency observations shared between the transport (writer) and the
/// buffer station (reader), used to tune the target chunk size.
///
/// Lock-free: the transport records after each send, the buffer station
/// samples on its flush tick.
#[derive(Debug, Default)]
pub struct LatencyFeedback {
    latency_ms: AtomicU64,
    stable: AtomicBool,
    has_sample: AtomicBool,
}

impl LatencyFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed send latency and whether the connection looks
    /// stable (no recent errors or reconnects).
    pub fn record(&self, latency_ms: u64, stable: bool) {
        self.latency_ms.store(latency_ms, Ordering::Relaxed);
        self.stable.store(stable, Ordering::Relaxed);
        self.has_sample.store(true, Ordering::Release);
    }

    /// Take the latest observation, if a send has completed since the last
    /// call. Consuming it keeps one observation from being applied to the
    /// target size on every subsequent flush tick.
    pub fn sample(&self) -> Option<(u64, bool)> {
        if self.has_sample.swap(false, Ordering::Acquire) {
            Some((
                self.latency_ms.load(Ordering::Relaxed),
                self.stable.load(Ordering::Relaxed),
            ))
        } else {
            None
        }
    }
}
