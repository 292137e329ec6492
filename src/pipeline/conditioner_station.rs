//! Station that applies signal conditioning to captured PCM bytes.

use crate::audio::conditioner::condition;
use crate::pipeline::buffer_station::BufferInput;
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;

/// Wraps the pure conditioning function as a pipeline station.
///
/// Output feeds the buffer station's input channel, alongside the flush
/// ticks the orchestrator injects. Empty reads and odd single-byte
/// leftovers condition to nothing; those are filtered rather than
/// forwarded as empty buffers.
pub struct ConditionerStation;

impl Station for ConditionerStation {
    type Input = Vec<u8>;
    type Output = BufferInput;

    fn name(&self) -> &'static str {
        "conditioner"
    }

    fn process(&mut self, input: Vec<u8>) -> Result<Vec<BufferInput>, StationError> {
        let conditioned = condition(&input);
        if conditioned.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![BufferInput::Bytes(conditioned)])
        }
    }
}
