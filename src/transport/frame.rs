//! Inbound result-frame parsing.
//!
//! The service replies with JSON text frames. Recognition results carry
//! `"type": "Results"` with the best hypothesis under
//! `channel.alternatives[0].transcript`; everything else (metadata,
//! utterance markers) is kept raw for diagnostics.

use crate::error::{Result, ScribeError};
use serde::Deserialize;

/// A parsed inbound frame from the recognition service.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultFrame {
    /// A transcript hypothesis. `is_final` marks a committed segment.
    Transcript { text: String, is_final: bool },
    /// A non-result frame (metadata, utterance markers), kept verbatim.
    Metadata { raw: String },
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    is_final: bool,
    channel: Option<RawChannel>,
}

#[derive(Deserialize)]
struct RawChannel {
    alternatives: Vec<RawAlternative>,
}

#[derive(Deserialize)]
struct RawAlternative {
    transcript: String,
}

impl ResultFrame {
    /// Parse one JSON text frame.
    ///
    /// Results frames missing the alternatives list are malformed; frames
    /// with an unrecognized `type` are metadata, not errors, so protocol
    /// additions on the service side do not break the session.
    pub fn parse(text: &str) -> Result<ResultFrame> {
        let raw: RawFrame =
            serde_json::from_str(text).map_err(|e| ScribeError::MalformedFrame {
                message: e.to_string(),
            })?;

        if raw.frame_type != "Results" {
            return Ok(ResultFrame::Metadata {
                raw: text.to_string(),
            });
        }

        let channel = raw.channel.ok_or_else(|| ScribeError::MalformedFrame {
            message: "Results frame missing channel".to_string(),
        })?;
        let alternative =
            channel
                .alternatives
                .into_iter()
                .next()
                .ok_or_else(|| ScribeError::MalformedFrame {
                    message: "Results frame has no alternatives".to_string(),
                })?;

        Ok(ResultFrame::Transcript {
            text: alternative.transcript,
            is_final: raw.is_final,
        })
    }
}
