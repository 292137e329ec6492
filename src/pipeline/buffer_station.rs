//! Station that drives the adaptive buffer from a single input channel.
//!
//! Conditioned bytes and periodic flush ticks arrive on the same channel,
//! so the accumulation has exactly one writer at a time by construction.

use crate::pipeline::buffer::AdaptiveBuffer;
use crate::pipeline::error::StationError;
use crate::pipeline::metrics::{LatencyFeedback, PerformanceSnapshot};
use crate::pipeline::station::Station;
use crate::pipeline::types::Chunk;
use std::sync::{Arc, Mutex};

/// Input to the buffer station.
#[derive(Debug, Clone)]
pub enum BufferInput {
    /// Conditioned PCM bytes from the conditioner station.
    Bytes(Vec<u8>),
    /// Periodic flush tick from the orchestrator's timer thread.
    Tick,
}

/// Station owning the adaptive buffer.
pub struct BufferStation {
    buffer: AdaptiveBuffer,
    /// Latest send-latency observation from the transport.
    latency: Arc<LatencyFeedback>,
    /// Published counters, readable while the session runs.
    snapshot: Arc<Mutex<PerformanceSnapshot>>,
}

impl BufferStation {
    pub fn new(buffer: AdaptiveBuffer, latency: Arc<LatencyFeedback>) -> Self {
        Self {
            buffer,
            latency,
            snapshot: Arc::new(Mutex::new(PerformanceSnapshot::empty())),
        }
    }

    /// Shared handle to the published performance counters.
    pub fn snapshot_handle(&self) -> Arc<Mutex<PerformanceSnapshot>> {
        self.snapshot.clone()
    }

    fn publish_snapshot(&self) {
        if let Ok(mut snap) = self.snapshot.lock() {
            *snap = self.buffer.snapshot();
        }
    }
}

impl Station for BufferStation {
    type Input = BufferInput;
    type Output = Chunk;

    fn name(&self) -> &'static str {
        "buffer"
    }

    fn process(&mut self, input: BufferInput) -> Result<Vec<Chunk>, StationError> {
        let chunks = match input {
            BufferInput::Bytes(bytes) => self.buffer.ingest(&bytes),
            BufferInput::Tick => {
                if let Some((latency_ms, stable)) = self.latency.sample() {
                    self.buffer.record_latency(latency_ms);
                    self.buffer.adjust_target_size(latency_ms, stable);
                }
                self.buffer.flush(false).into_iter().collect()
            }
        };
        self.publish_snapshot();
        Ok(chunks)
    }

    /// Forced flush so the last partial chunk is not lost, then reset.
    fn shutdown(&mut self) -> Vec<Chunk> {
        let remainder: Vec<Chunk> = self.buffer.flush(true).into_iter().collect();
        self.publish_snapshot();
        self.buffer.reset();
        remainder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferConfig;

    fn make_station() -> BufferStation {
        BufferStation::new(
            AdaptiveBuffer::new(BufferConfig::default()),
            Arc::new(LatencyFeedback::new()),
        )
    }

    #[test]
    fn test_station_name() {
        assert_eq!(make_station().name(), "buffer");
    }

    #[test]
    fn test_accumulates_below_target() {
        let mut station = make_station();
        let out = station
            .process(BufferInput::Bytes(vec![0u8; 512]))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_emits_chunk_at_target() {
        let mut station = make_station();
        let out = station
            .process(BufferInput::Bytes(vec![0u8; 4096]))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 4096);
        assert_eq!(out[0].sequence, 0);
    }

    #[test]
    fn test_tick_flush_below_min_is_noop() {
        let mut station = make_station();
        station
            .process(BufferInput::Bytes(vec![0u8; 512]))
            .unwrap();
        let out = station.process(BufferInput::Tick).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_tick_applies_latency_feedback() {
        let latency = Arc::new(LatencyFeedback::new());
        let mut station = BufferStation::new(
            AdaptiveBuffer::new(BufferConfig::default()),
            latency.clone(),
        );

        latency.record(300, true);
        station.process(BufferInput::Tick).unwrap();

        let snap = station.snapshot_handle();
        let snap = snap.lock().unwrap();
        assert!((snap.average_latency_ms - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_without_new_send_leaves_target_alone() {
        let latency = Arc::new(LatencyFeedback::new());
        let mut station = BufferStation::new(
            AdaptiveBuffer::new(BufferConfig::default()),
            latency.clone(),
        );

        // One slow send grows the target once; idle ticks afterwards must
        // not keep re-applying the same observation.
        latency.record(300, true);
        station.process(BufferInput::Tick).unwrap();
        let grown = station.buffer.target_size();
        assert!(grown > 4096);

        for _ in 0..10 {
            station.process(BufferInput::Tick).unwrap();
        }
        assert_eq!(station.buffer.target_size(), grown);
    }

    #[test]
    fn test_shutdown_flushes_remaining_audio() {
        let mut station = make_station();
        station
            .process(BufferInput::Bytes(vec![7u8; 600]))
            .unwrap();

        let remainder = station.shutdown();
        assert_eq!(remainder.len(), 1);
        assert_eq!(remainder[0].bytes, vec![7u8; 600]);
    }

    #[test]
    fn test_shutdown_with_empty_buffer_emits_nothing() {
        let mut station = make_station();
        assert!(station.shutdown().is_empty());
    }

    #[test]
    fn test_snapshot_published_after_process() {
        let mut station = make_station();
        let handle = station.snapshot_handle();
        station
            .process(BufferInput::Bytes(vec![0u8; 4096]))
            .unwrap();

        let snap = handle.lock().unwrap();
        assert_eq!(snap.chunks_emitted, 1);
        assert_eq!(snap.bytes_processed, 4096);
    }

    #[test]
    fn test_oversize_ingest_emits_multiple_chunks() {
        let mut station = make_station();

        // Large enough to trip the hard cap inside a single ingest
        let out = station
            .process(BufferInput::Bytes(vec![0u8; 40_000]))
            .unwrap();

        assert!(out.len() > 1);
        let total: usize = out.iter().map(|c| c.len()).sum();
        assert!(total >= 32_768);
    }
}
