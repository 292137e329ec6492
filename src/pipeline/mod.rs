//! Streaming dictation pipeline.
//!
//! Implements a multi-station pipeline where each station runs in its own
//! thread, connected by bounded crossbeam channels for backpressure.

pub mod buffer;
pub mod buffer_station;
pub mod conditioner_station;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod station;
pub mod types;

pub use buffer::AdaptiveBuffer;
pub use buffer_station::{BufferInput, BufferStation};
pub use conditioner_station::ConditionerStation;
pub use error::{ErrorReporter, LogReporter, StationError};
pub use metrics::{LatencyFeedback, PerformanceSnapshot};
pub use orchestrator::{Pipeline, PipelineConfig, Recorder, SessionHandle, SessionStatus};
pub use station::{Station, StationRunner};
pub use types::{Chunk, SessionEvent};
