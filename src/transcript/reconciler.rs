//! Transcript reconciliation: merges interim and final recognition results
//! into a single growing text.

use crate::transport::frame::ResultFrame;

/// Committed and interim transcript state for one session.
///
/// Only frames with `is_final` commit text; interim frames replace the
/// working hypothesis wholesale (last-seen-wins). Committed text is
/// append-only, one segment per line.
#[derive(Debug, Default)]
pub struct TranscriptReconciler {
    committed: String,
    interim: String,
    /// Metadata frames seen, kept for diagnostics only.
    metadata_count: u64,
}

impl TranscriptReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one inbound result frame.
    pub fn on_frame(&mut self, frame: &ResultFrame) {
        match frame {
            ResultFrame::Transcript { text, is_final } => {
                if *is_final {
                    self.commit(text);
                    self.interim.clear();
                } else {
                    // Last-seen-wins: earlier hypotheses for the same
                    // utterance are never preserved.
                    self.interim = text.clone();
                }
            }
            ResultFrame::Metadata { .. } => {
                self.metadata_count += 1;
            }
        }
    }

    /// Promote any leftover interim text to committed on session stop.
    pub fn on_stop(&mut self) {
        if !self.interim.is_empty() {
            let pending = std::mem::take(&mut self.interim);
            self.commit(&pending);
        }
    }

    /// Current `(committed, interim)` view.
    ///
    /// Committed append happens as a single in-place extension while the
    /// caller holds the same lock that guards mutation, so a snapshot never
    /// observes a partially-appended line.
    pub fn snapshot(&self) -> (String, String) {
        (self.committed.clone(), self.interim.clone())
    }

    /// Committed transcript only.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// Number of metadata frames seen this session.
    pub fn metadata_count(&self) -> u64 {
        self.metadata_count
    }

    fn commit(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.committed.is_empty() {
            self.committed.push('\n');
        }
        self.committed.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interim(text: &str) -> ResultFrame {
        ResultFrame::Transcript {
            text: text.to_string(),
            is_final: false,
        }
    }

    fn final_frame(text: &str) -> ResultFrame {
        ResultFrame::Transcript {
            text: text.to_string(),
            is_final: true,
        }
    }

    #[test]
    fn test_interim_replaced_wholesale() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.on_frame(&interim("hel"));
        reconciler.on_frame(&interim("hello"));

        let (committed, interim_text) = reconciler.snapshot();
        assert_eq!(committed, "");
        assert_eq!(interim_text, "hello");
    }

    #[test]
    fn test_final_commits_and_clears_interim() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.on_frame(&interim("hel"));
        reconciler.on_frame(&interim("hello"));
        reconciler.on_frame(&final_frame("hello world"));
        reconciler.on_stop();

        let (committed, interim_text) = reconciler.snapshot();
        assert_eq!(committed, "hello world");
        assert_eq!(interim_text, "");
    }

    #[test]
    fn test_segments_joined_by_newline() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.on_frame(&final_frame("first sentence"));
        reconciler.on_frame(&final_frame("second sentence"));
        assert_eq!(reconciler.committed(), "first sentence\nsecond sentence");
    }

    #[test]
    fn test_stop_promotes_leftover_interim() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.on_frame(&final_frame("done part"));
        reconciler.on_frame(&interim("trailing words"));
        reconciler.on_stop();

        let (committed, interim_text) = reconciler.snapshot();
        assert_eq!(committed, "done part\ntrailing words");
        assert_eq!(interim_text, "");
    }

    #[test]
    fn test_stop_with_empty_interim_changes_nothing() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.on_frame(&final_frame("only text"));
        reconciler.on_stop();
        reconciler.on_stop();
        assert_eq!(reconciler.committed(), "only text");
    }

    #[test]
    fn test_empty_final_not_committed() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.on_frame(&final_frame(""));
        reconciler.on_frame(&final_frame("real text"));
        // No stray newline from the empty segment
        assert_eq!(reconciler.committed(), "real text");
    }

    #[test]
    fn test_metadata_ignored_by_transcript_model() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.on_frame(&ResultFrame::Metadata {
            raw: "{\"type\":\"Metadata\"}".to_string(),
        });
        reconciler.on_frame(&interim("words"));

        let (committed, interim_text) = reconciler.snapshot();
        assert_eq!(committed, "");
        assert_eq!(interim_text, "words");
        assert_eq!(reconciler.metadata_count(), 1);
    }

    #[test]
    fn test_ordered_frame_sequence_no_duplication() {
        // "hel" then "hello" then final "hello world", then stop
        let mut reconciler = TranscriptReconciler::new();
        reconciler.on_frame(&interim("hel"));
        reconciler.on_frame(&interim("hello"));
        reconciler.on_frame(&final_frame("hello world"));
        reconciler.on_stop();

        assert_eq!(reconciler.committed(), "hello world");
        assert!(!reconciler.committed().contains("hel\n"));
    }
}
