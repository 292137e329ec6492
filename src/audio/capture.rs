use crate::error::{Result, ScribeError};

/// Trait for audio capture sources.
///
/// This trait allows swapping implementations (real microphone vs mock).
/// Sources produce raw 16-bit little-endian PCM bytes.
pub trait CaptureSource: Send {
    /// Start capturing audio from the source.
    ///
    /// Acquires the exclusive hardware resource for the session.
    ///
    /// # Errors
    /// Returns `ScribeError::DeviceUnavailable` if the device cannot grant
    /// audio access.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    ///
    /// Idempotent; releases the hardware resource even when called after
    /// an error.
    fn stop(&mut self) -> Result<()>;

    /// Read captured PCM bytes since the last call.
    ///
    /// An empty read from a finite source means the stream has ended; from
    /// a live source it is normal while the device warms up.
    fn read_bytes(&mut self) -> Result<Vec<u8>>;

    /// Whether this source ends on its own (scripted input) rather than
    /// running until stopped (microphone).
    fn is_finite(&self) -> bool {
        false
    }
}

/// Mock capture source for testing
#[derive(Debug, Clone)]
pub struct MockCaptureSource {
    is_started: bool,
    bytes: Vec<u8>,
    should_fail_start: bool,
    should_fail_stop: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockCaptureSource {
    /// Create a new mock capture source with default settings
    pub fn new() -> Self {
        Self {
            is_started: false,
            bytes: vec![0u8; 320],
            should_fail_start: false,
            should_fail_stop: false,
            should_fail_read: false,
            error_message: "mock capture error".to_string(),
        }
    }

    /// Configure the mock to return specific bytes on every read
    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = bytes;
        self
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on stop
    pub fn with_stop_failure(mut self) -> Self {
        self.should_fail_stop = true;
        self
    }

    /// Configure the mock to fail on read
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the capture source is started
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockCaptureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for MockCaptureSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            Err(ScribeError::DeviceUnavailable {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = true;
            Ok(())
        }
    }

    fn stop(&mut self) -> Result<()> {
        if self.should_fail_stop {
            Err(ScribeError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = false;
            Ok(())
        }
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        if self.should_fail_read {
            Err(ScribeError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            Ok(self.bytes.clone())
        }
    }
}

/// Capture source that replays a fixed byte script in slices, then ends.
///
/// Used for deterministic pipeline tests and for feeding pre-recorded
/// audio through the live path. Reads real provided bytes; it never
/// fabricates samples.
pub struct ScriptedCaptureSource {
    script: Vec<u8>,
    position: usize,
    slice_len: usize,
    is_started: bool,
}

impl ScriptedCaptureSource {
    /// Create a scripted source that yields `slice_len` bytes per read.
    pub fn new(script: Vec<u8>, slice_len: usize) -> Self {
        Self {
            script,
            position: 0,
            slice_len: slice_len.max(1),
            is_started: false,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len() - self.position
    }
}

impl CaptureSource for ScriptedCaptureSource {
    fn start(&mut self) -> Result<()> {
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        if !self.is_started || self.position >= self.script.len() {
            return Ok(Vec::new());
        }
        let end = (self.position + self.slice_len).min(self.script.len());
        let slice = self.script[self.position..end].to_vec();
        self.position = end;
        Ok(slice)
    }

    fn is_finite(&self) -> bool {
        true
    }
}
