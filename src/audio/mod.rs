//! Audio capture and signal conditioning.

pub mod capture;
pub mod conditioner;
#[cfg(feature = "cpal-audio")]
pub mod cpal_capture;

pub use capture::{CaptureSource, MockCaptureSource, ScriptedCaptureSource};
pub use conditioner::condition;
#[cfg(feature = "cpal-audio")]
pub use cpal_capture::{CpalCaptureSource, list_devices};
