//! Transcript reconciliation.

pub mod reconciler;

pub use reconciler::TranscriptReconciler;
