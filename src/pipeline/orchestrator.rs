//! Session orchestration: capture, conditioning, buffering, and transport
//! wired together for one dictation session.

use crate::audio::capture::CaptureSource;
use crate::config::Config;
use crate::error::{Result, ScribeError};
use crate::pipeline::buffer::AdaptiveBuffer;
use crate::pipeline::buffer_station::{BufferInput, BufferStation};
use crate::pipeline::conditioner_station::ConditionerStation;
use crate::pipeline::error::{ErrorReporter, LogReporter};
use crate::pipeline::metrics::{LatencyFeedback, PerformanceSnapshot};
use crate::pipeline::station::StationRunner;
use crate::pipeline::types::SessionEvent;
use crate::transcript::TranscriptReconciler;
use crate::transport::client::TransportClient;
use crate::transport::credentials::{CredentialProvider, EnvCredentialProvider};
use crate::transport::probe::check_reachable;
use crate::transport::state::{ConnectionState, StateCell};
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Configuration for one dictation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Audio, buffer, and transport settings.
    pub config: Config,
    /// Channel buffer sizes
    pub raw_buffer: usize,
    pub buffer_input_buffer: usize,
    pub chunk_buffer: usize,
    /// Optional event sender for session event streaming (crossbeam, non-blocking)
    pub event_tx: Option<crossbeam_channel::Sender<SessionEvent>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            config: Config::default(),
            raw_buffer: 1024,
            buffer_input_buffer: 1024,
            chunk_buffer: 16,
            event_tx: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }
}

/// Dictation pipeline: CaptureSource → Conditioner → AdaptiveBuffer → Transport.
pub struct Pipeline {
    config: PipelineConfig,
    error_reporter: Arc<dyn ErrorReporter>,
    credentials: Arc<dyn CredentialProvider>,
}

impl Pipeline {
    /// Creates a new pipeline with the default error reporter and the
    /// environment credential provider.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            error_reporter: Arc::new(LogReporter),
            credentials: Arc::new(EnvCredentialProvider),
        }
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    /// Sets a custom credential provider.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Starts a session.
    ///
    /// Preconditions run before any resource is acquired, in a fixed order:
    /// credential first, then the reachability probe, then the capture
    /// device. A missing credential therefore surfaces without touching the
    /// network or the microphone.
    pub fn start(self, mut source: Box<dyn CaptureSource>) -> Result<SessionHandle> {
        self.config
            .config
            .validate()
            .map_err(|e| ScribeError::ConfigParse {
                message: e.to_string(),
            })?;
        let token = self.credentials.current_token()?;
        let transport_cfg = &self.config.config.transport;
        check_reachable(
            &transport_cfg.endpoint,
            Duration::from_secs(transport_cfg.probe_timeout_secs),
        )?;

        source.start()?;

        let running = Arc::new(AtomicBool::new(true));
        let reconciler = Arc::new(Mutex::new(TranscriptReconciler::new()));
        let latency = Arc::new(LatencyFeedback::new());

        let mut client = TransportClient::new(
            self.config.config.clone(),
            token,
            latency.clone(),
            reconciler.clone(),
        );
        if let Some(event_tx) = &self.config.event_tx {
            client = client.with_event_tx(event_tx.clone());
        }
        let state = client.state_handle();
        let transport = match client.spawn() {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(stop_err) = source.stop() {
                    eprintln!("scribewire: failed to stop capture: {stop_err}");
                }
                return Err(e);
            }
        };

        // Create channels between stations
        let (raw_tx, raw_rx) = bounded(self.config.raw_buffer);
        let (buffer_in_tx, buffer_in_rx) = bounded(self.config.buffer_input_buffer);
        let (chunk_tx, chunk_rx) = bounded(self.config.chunk_buffer);

        let buffer_station = BufferStation::new(
            AdaptiveBuffer::new(self.config.config.buffer.clone()),
            latency.clone(),
        );
        let snapshot = buffer_station.snapshot_handle();

        let conditioner_runner = StationRunner::spawn(
            ConditionerStation,
            raw_rx,
            buffer_in_tx.clone(),
            self.error_reporter.clone(),
        );
        let buffer_runner = StationRunner::spawn(
            buffer_station,
            buffer_in_rx,
            chunk_tx,
            self.error_reporter.clone(),
        );

        // Flush ticker: bounds worst-case chunk latency under slow capture.
        // Also watches the connection state, so a mid-session transport
        // failure unwinds the whole pipeline without caller involvement.
        let flush_interval =
            Duration::from_millis(self.config.config.buffer.flush_interval_ms.max(1));
        let ticker_running = running.clone();
        let ticker_state = state.clone();
        let ticker_handle = thread::spawn(move || {
            while ticker_running.load(Ordering::SeqCst) {
                thread::sleep(flush_interval);
                if ticker_state.get() == ConnectionState::Failed {
                    // Stops capture, which releases the device and lets the
                    // stations drain and flush through their channels.
                    ticker_running.store(false, Ordering::SeqCst);
                    break;
                }
                match buffer_in_tx.try_send(BufferInput::Tick) {
                    Ok(()) => {}
                    // A full channel means audio is already flowing fast
                    // enough that the tick is redundant.
                    Err(crossbeam_channel::TrySendError::Full(_)) => {}
                    Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
                }
            }
        });

        // Capture polling thread
        let source_is_finite = source.is_finite();
        let capture_running = running.clone();
        let capture_event_tx = self.config.event_tx.clone();
        let capture_handle = thread::spawn(move || {
            // Poll audio source at ~60Hz (every 16ms)
            let poll_interval = Duration::from_millis(16);

            let mut consecutive_errors: u32 = 0;
            const MAX_CONSECUTIVE_ERRORS: u32 = 10;

            while capture_running.load(Ordering::SeqCst) {
                let bytes = match source.read_bytes() {
                    Ok(b) => {
                        consecutive_errors = 0;
                        b
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            eprintln!(
                                "scribewire: audio capture failed {consecutive_errors} times in a row: {e}"
                            );
                            if let Some(tx) = &capture_event_tx {
                                let _ = tx.send(SessionEvent::Error(e.to_string()));
                            }
                            break;
                        }
                        thread::sleep(poll_interval);
                        continue;
                    }
                };

                if bytes.is_empty() {
                    if source_is_finite {
                        // Scripted source exhausted — exit polling loop.
                        break;
                    }
                    // Live microphone: empty reads are normal while the
                    // device warms up. Keep polling.
                    thread::sleep(poll_interval);
                    continue;
                }

                if raw_tx.try_send(bytes).is_err() {
                    // Channel full or disconnected
                    if !capture_running.load(Ordering::SeqCst) {
                        break;
                    }
                }

                thread::sleep(poll_interval);
            }

            if let Err(e) = source.stop() {
                eprintln!("scribewire: failed to stop audio capture: {e}");
            }
        });

        // Chunk forwarder: feeds the transport and, once the pipeline drains,
        // runs the closing handshake and publishes the final transcript.
        let (result_tx, result_rx) = bounded(1);
        let forwarder_reconciler = reconciler.clone();
        let forwarder_event_tx = self.config.event_tx.clone();
        let mut transport = transport;
        let forwarder_handle = thread::spawn(move || {
            for chunk in chunk_rx.iter() {
                transport.send_chunk(chunk);
            }

            if let Err(e) = transport.close() {
                eprintln!("scribewire: transport close failed: {e}");
                if let Some(tx) = &forwarder_event_tx {
                    let _ = tx.send(SessionEvent::Error(e.to_string()));
                }
            }

            let committed = match forwarder_reconciler.lock() {
                Ok(mut r) => {
                    r.on_stop();
                    r.committed().to_string()
                }
                Err(_) => String::new(),
            };
            let result = if committed.is_empty() {
                None
            } else {
                Some(committed)
            };
            let _ = result_tx.send(result);
        });

        let mut threads = vec![capture_handle, ticker_handle, forwarder_handle];
        threads.push(thread::spawn(move || {
            if let Err(msg) = conditioner_runner.join() {
                eprintln!("scribewire: {msg}");
            }
        }));
        threads.push(thread::spawn(move || {
            if let Err(msg) = buffer_runner.join() {
                eprintln!("scribewire: {msg}");
            }
        }));

        Ok(SessionHandle {
            running,
            threads,
            result_rx: Some(result_rx),
            state,
            snapshot,
            reconciler,
        })
    }
}

/// Handle to a running session.
#[derive(Debug)]
pub struct SessionHandle {
    /// Flag to signal shutdown
    running: Arc<AtomicBool>,
    /// Join handles for spawned threads
    threads: Vec<JoinHandle<()>>,
    /// Receiver for the final transcript
    result_rx: Option<crossbeam_channel::Receiver<Option<String>>>,
    /// Connection state shared with the transport thread
    state: Arc<StateCell>,
    /// Buffer counters shared with the buffer station
    snapshot: Arc<Mutex<PerformanceSnapshot>>,
    /// Transcript state shared with the transport thread
    reconciler: Arc<Mutex<TranscriptReconciler>>,
}

impl SessionHandle {
    /// Stops the session and returns the committed transcript, if any.
    ///
    /// Teardown unwinds in a fixed order: capture polling exits first, then
    /// the ticker, then the stations flush and drain, then the transport runs
    /// its closing handshake. The final transcript arrives only after that
    /// handshake, so late final results are still included.
    pub fn stop(mut self) -> Option<String> {
        self.running.store(false, Ordering::SeqCst);

        // The closing handshake can take the connect timeout plus the close
        // drain in the worst case.
        let result = self
            .result_rx
            .as_ref()
            .and_then(|rx| rx.recv_timeout(Duration::from_secs(15)).ok().flatten());

        // Wait briefly for threads to finish, joining completed ones to
        // detect panics. After the deadline, remaining threads are detached.
        let deadline = Instant::now() + Duration::from_secs(2);
        let poll_interval = Duration::from_millis(50);

        loop {
            let mut remaining = Vec::new();
            for handle in self.threads.drain(..) {
                if handle.is_finished() {
                    if handle.join().is_err() {
                        eprintln!("scribewire: session thread panicked");
                    }
                } else {
                    remaining.push(handle);
                }
            }
            self.threads = remaining;

            if self.threads.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                eprintln!(
                    "scribewire: shutdown timeout, {} thread(s) still running, detaching",
                    self.threads.len()
                );
                break;
            }
            thread::sleep(poll_interval);
        }

        result
    }

    /// Returns true if the session has not been stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current transport connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Live `(committed, interim)` transcript view.
    pub fn transcript(&self) -> (String, String) {
        match self.reconciler.lock() {
            Ok(r) => r.snapshot(),
            Err(_) => (String::new(), String::new()),
        }
    }

    /// Current buffer performance counters.
    pub fn performance(&self) -> PerformanceSnapshot {
        match self.snapshot.lock() {
            Ok(snap) => snap.clone(),
            Err(_) => PerformanceSnapshot::empty(),
        }
    }
}

/// Whether a recorder currently has a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Recording,
}

/// One-session-at-a-time wrapper around [`Pipeline`].
///
/// `start` while recording is a no-op; `stop` is idempotent and keeps
/// returning the last transcript.
pub struct Recorder {
    config: PipelineConfig,
    credentials: Arc<dyn CredentialProvider>,
    session: Option<SessionHandle>,
    last_transcript: Option<String>,
}

impl Recorder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            credentials: Arc::new(EnvCredentialProvider),
            session: None,
            last_transcript: None,
        }
    }

    /// Sets a custom credential provider for sessions this recorder starts.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn status(&self) -> SessionStatus {
        if self.session.is_some() {
            SessionStatus::Recording
        } else {
            SessionStatus::Idle
        }
    }

    /// Starts a session unless one is already running.
    pub fn start(&mut self, source: Box<dyn CaptureSource>) -> Result<SessionStatus> {
        if self.session.is_some() {
            return Ok(SessionStatus::Recording);
        }
        let pipeline =
            Pipeline::new(self.config.clone()).with_credentials(self.credentials.clone());
        self.session = Some(pipeline.start(source)?);
        Ok(SessionStatus::Recording)
    }

    /// Stops the running session, if any, and returns the transcript.
    ///
    /// Further calls return the same cached transcript.
    pub fn stop(&mut self) -> Option<String> {
        if let Some(session) = self.session.take() {
            self.last_transcript = session.stop();
        }
        self.last_transcript.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::capture::MockCaptureSource;
    use crate::transport::credentials::StaticToken;
    use std::net::TcpListener;

    /// Keeps a local TCP listener alive so the reachability probe passes
    /// without touching the real network.
    fn probe_target() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, format!("ws://127.0.0.1:{port}/v1/listen"))
    }

    fn local_config(endpoint: String) -> PipelineConfig {
        let mut config = Config::default();
        config.transport.endpoint = endpoint;
        config.transport.probe_timeout_secs = 1;
        config.transport.connect_timeout_secs = 1;
        config.transport.close_timeout_secs = 1;
        PipelineConfig::from_config(config)
    }

    #[test]
    fn test_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.raw_buffer, 1024);
        assert_eq!(config.buffer_input_buffer, 1024);
        assert_eq!(config.chunk_buffer, 16);
        assert!(config.event_tx.is_none());
    }

    #[test]
    fn test_missing_credential_fails_before_probe() {
        // Endpoint is unreachable nonsense; the credential error must win
        // because the credential check runs first.
        let mut config = Config::default();
        config.transport.endpoint = "ws://127.0.0.1:1/".to_string();
        let pipeline = Pipeline::new(PipelineConfig::from_config(config))
            .with_credentials(Arc::new(StaticToken(String::new())));

        let result = pipeline.start(Box::new(MockCaptureSource::new()));
        assert!(matches!(
            result.unwrap_err(),
            ScribeError::Unconfigured { .. }
        ));
    }

    #[test]
    fn test_unreachable_endpoint_fails_before_device_open() {
        // Port with no listener → probe fails; the capture source must never
        // be started.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = local_config(format!("ws://127.0.0.1:{port}/"));
        let pipeline = Pipeline::new(config)
            .with_credentials(Arc::new(StaticToken("test-token".to_string())));

        let source = Box::new(MockCaptureSource::new().with_start_failure());
        let result = pipeline.start(source);
        assert!(matches!(
            result.unwrap_err(),
            ScribeError::Unreachable { .. }
        ));
    }

    #[test]
    fn test_device_failure_surfaces_after_probe() {
        let (_listener, endpoint) = probe_target();
        let pipeline = Pipeline::new(local_config(endpoint))
            .with_credentials(Arc::new(StaticToken("test-token".to_string())));

        let source = Box::new(MockCaptureSource::new().with_start_failure());
        let result = pipeline.start(source);
        assert!(matches!(
            result.unwrap_err(),
            ScribeError::DeviceUnavailable { .. }
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.buffer.min_chunk_bytes = 1023;
        let pipeline = Pipeline::new(PipelineConfig::from_config(config))
            .with_credentials(Arc::new(StaticToken("test-token".to_string())));

        let result = pipeline.start(Box::new(MockCaptureSource::new()));
        assert!(matches!(
            result.unwrap_err(),
            ScribeError::ConfigParse { .. }
        ));
    }

    #[test]
    fn test_handle_stop_returns_none_without_result() {
        let handle = SessionHandle {
            running: Arc::new(AtomicBool::new(true)),
            threads: vec![],
            result_rx: None,
            state: Arc::new(StateCell::new()),
            snapshot: Arc::new(Mutex::new(PerformanceSnapshot::empty())),
            reconciler: Arc::new(Mutex::new(TranscriptReconciler::new())),
        };
        assert!(handle.stop().is_none());
    }

    #[test]
    fn test_handle_stop_sets_running_false() {
        let running = Arc::new(AtomicBool::new(true));
        let (result_tx, result_rx) = bounded(1);
        result_tx.send(Some("test".to_string())).unwrap();
        drop(result_tx);

        let handle = SessionHandle {
            running: running.clone(),
            threads: vec![],
            result_rx: Some(result_rx),
            state: Arc::new(StateCell::new()),
            snapshot: Arc::new(Mutex::new(PerformanceSnapshot::empty())),
            reconciler: Arc::new(Mutex::new(TranscriptReconciler::new())),
        };

        assert!(handle.is_running());
        let result = handle.stop();
        assert_eq!(result, Some("test".to_string()));
        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_handle_stop_returns_none_when_channel_disconnected() {
        let (result_tx, result_rx) = bounded::<Option<String>>(1);
        drop(result_tx);

        let handle = SessionHandle {
            running: Arc::new(AtomicBool::new(true)),
            threads: vec![],
            result_rx: Some(result_rx),
            state: Arc::new(StateCell::new()),
            snapshot: Arc::new(Mutex::new(PerformanceSnapshot::empty())),
            reconciler: Arc::new(Mutex::new(TranscriptReconciler::new())),
        };
        assert!(handle.stop().is_none());
    }

    #[test]
    fn test_recorder_stop_without_session_returns_cached() {
        let (_listener, endpoint) = probe_target();
        let mut recorder = Recorder::new(local_config(endpoint));
        assert_eq!(recorder.status(), SessionStatus::Idle);
        assert!(recorder.stop().is_none());
        assert!(recorder.stop().is_none());
    }

    #[test]
    fn test_recorder_failed_start_stays_idle() {
        let mut config = Config::default();
        config.transport.endpoint = "ws://127.0.0.1:1/".to_string();
        config.transport.probe_timeout_secs = 1;
        let mut recorder = Recorder::new(PipelineConfig::from_config(config))
            .with_credentials(Arc::new(StaticToken("test-token".to_string())));

        assert!(recorder.start(Box::new(MockCaptureSource::new())).is_err());
        assert_eq!(recorder.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_pipeline_thread_panic_is_reported() {
        let running = Arc::new(AtomicBool::new(true));
        let panicking_handle = thread::spawn(|| {
            panic!("intentional test panic");
        });

        let handle = SessionHandle {
            running: running.clone(),
            threads: vec![panicking_handle],
            result_rx: None,
            state: Arc::new(StateCell::new()),
            snapshot: Arc::new(Mutex::new(PerformanceSnapshot::empty())),
            reconciler: Arc::new(Mutex::new(TranscriptReconciler::new())),
        };

        // stop() must return without hanging; the panic is logged to stderr
        assert!(handle.stop().is_none());
        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_timeout_on_stuck_thread() {
        let running = Arc::new(AtomicBool::new(true));
        let stuck_running = running.clone();
        let stuck_handle = thread::spawn(move || {
            while stuck_running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(10));
            }
            thread::park();
        });

        let handle = SessionHandle {
            running,
            threads: vec![stuck_handle],
            result_rx: None,
            state: Arc::new(StateCell::new()),
            snapshot: Arc::new(Mutex::new(PerformanceSnapshot::empty())),
            reconciler: Arc::new(Mutex::new(TranscriptReconciler::new())),
        };

        let start = Instant::now();
        assert!(handle.stop().is_none());
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "stop() should complete within the detach deadline even with stuck threads"
        );
    }
}
