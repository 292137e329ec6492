//! Adaptive buffer that turns a conditioned byte stream into network chunks.
//!
//! Accumulates bytes and emits fixed-size chunks, adapting the target chunk
//! size to observed send latency. A hard cap bounds memory under network
//! stalls; a periodic flush (driven by the buffer station) bounds latency
//! under slow capture rates.

use crate::config::BufferConfig;
use crate::pipeline::metrics::PerformanceSnapshot;
use crate::pipeline::types::Chunk;

/// Accumulation and chunk-size state for one session.
pub struct AdaptiveBuffer {
    config: BufferConfig,
    accumulation: Vec<u8>,
    target: usize,
    sequence: u64,
    bytes_processed: u64,
    chunks_emitted: u64,
    avg_chunk_size: f64,
    avg_latency_ms: f64,
    latency_samples: u64,
}

impl AdaptiveBuffer {
    pub fn new(config: BufferConfig) -> Self {
        let target = config
            .target_chunk_bytes
            .clamp(config.min_chunk_bytes, config.max_chunk_bytes);
        Self {
            config,
            accumulation: Vec::new(),
            target,
            sequence: 0,
            bytes_processed: 0,
            chunks_emitted: 0,
            avg_chunk_size: 0.0,
            avg_latency_ms: 0.0,
            latency_samples: 0,
        }
    }

    /// Append conditioned bytes and emit any chunks that are due.
    ///
    /// Reaching the hard cap forces a flush before this call returns, so
    /// accumulation never exceeds the cap.
    pub fn ingest(&mut self, bytes: &[u8]) -> Vec<Chunk> {
        self.accumulation.extend_from_slice(bytes);

        let mut emitted = Vec::new();
        while self.accumulation.len() >= self.config.hard_cap_bytes {
            if let Some(chunk) = self.flush(true) {
                emitted.push(chunk);
            } else {
                break;
            }
        }
        if self.accumulation.len() >= self.target
            && let Some(chunk) = self.flush(false)
        {
            emitted.push(chunk);
        }
        emitted
    }

    /// Emit one chunk from the front of the accumulation (FIFO).
    ///
    /// Non-forced: takes the largest whole multiple of the target size and
    /// is a no-op below the minimum chunk size. Forced: drains everything.
    pub fn flush(&mut self, force: bool) -> Option<Chunk> {
        let len = self.accumulation.len();
        let n = if force {
            len
        } else {
            (len / self.target) * self.target
        };

        if n == 0 || (!force && n < self.config.min_chunk_bytes) {
            return None;
        }

        let bytes: Vec<u8> = self.accumulation.drain(..n).collect();
        let chunk = Chunk::new(bytes, self.sequence);
        self.sequence += 1;

        self.bytes_processed += n as u64;
        self.chunks_emitted += 1;
        self.avg_chunk_size += (n as f64 - self.avg_chunk_size) / self.chunks_emitted as f64;

        Some(chunk)
    }

    /// Tune the target chunk size from an observed send latency.
    ///
    /// High latency grows chunks (fewer, larger sends); low latency on a
    /// stable connection shrinks them for finer-grained interim results.
    /// Advisory only — the result is clamped so buffering invariants hold.
    pub fn adjust_target_size(&mut self, observed_latency_ms: u64, is_stable: bool) {
        let proposed = if observed_latency_ms > crate::defaults::LATENCY_GROW_THRESHOLD_MS {
            self.target + self.target / 2
        } else if observed_latency_ms < crate::defaults::LATENCY_SHRINK_THRESHOLD_MS && is_stable {
            self.target - self.target / 5
        } else {
            return;
        };

        // Keep whole samples: round down to an even size before clamping.
        let proposed = proposed / 2 * 2;
        self.target = proposed.clamp(self.config.min_chunk_bytes, self.config.hard_cap_bytes / 2);
    }

    /// Record an observed chunk send latency (incremental mean).
    pub fn record_latency(&mut self, latency_ms: u64) {
        self.latency_samples += 1;
        self.avg_latency_ms +=
            (latency_ms as f64 - self.avg_latency_ms) / self.latency_samples as f64;
    }

    /// Current target chunk size in bytes.
    pub fn target_size(&self) -> usize {
        self.target
    }

    /// Bytes currently accumulated and not yet emitted.
    pub fn pending_len(&self) -> usize {
        self.accumulation.len()
    }

    /// Accumulation length relative to the hard cap, in [0.0, 1.0].
    pub fn utilization(&self) -> f64 {
        (self.accumulation.len() as f64 / self.config.hard_cap_bytes as f64).min(1.0)
    }

    /// Performance counters as a read-only projection.
    pub fn snapshot(&self) -> PerformanceSnapshot {
        PerformanceSnapshot {
            bytes_processed: self.bytes_processed,
            chunks_emitted: self.chunks_emitted,
            average_chunk_size: self.avg_chunk_size,
            average_latency_ms: self.avg_latency_ms,
            buffer_utilization: self.utilization(),
        }
    }

    /// Drop any pending audio and reset counters and target size.
    pub fn reset(&mut self) {
        self.accumulation.clear();
        self.target = self
            .config
            .target_chunk_bytes
            .clamp(self.config.min_chunk_bytes, self.config.max_chunk_bytes);
        self.sequence = 0;
        self.bytes_processed = 0;
        self.chunks_emitted = 0;
        self.avg_chunk_size = 0.0;
        self.avg_latency_ms = 0.0;
        self.latency_samples = 0;
    }
}
