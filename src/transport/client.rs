//! WebSocket streaming client.
//!
//! Runs on a dedicated thread with its own single-threaded tokio runtime, so
//! the capture and buffering stations stay plain threads. Audio chunks arrive
//! over an async channel; transcript frames flow back through the shared
//! reconciler and the session event channel.

use crate::config::Config;
use crate::error::{Result, ScribeError};
use crate::pipeline::metrics::LatencyFeedback;
use crate::pipeline::types::{Chunk, SessionEvent};
use crate::transcript::TranscriptReconciler;
use crate::transport::frame::ResultFrame;
use crate::transport::state::{ConnectionState, StateCell};
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Sends after this many consecutive successful frames treat the link as
/// stable, allowing the buffer to shrink toward lower latency.
const STABLE_SEND_STREAK: u64 = 8;

/// Capacity of the chunk handoff channel into the transport thread.
const CHUNK_CHANNEL_CAPACITY: usize = 32;

/// Final message of the audio stream, telling the service to flush any
/// pending recognition results before the socket closes.
const CLOSE_STREAM_MESSAGE: &str = r#"{"type":"CloseStream"}"#;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The streaming-session query string for the recognition endpoint.
pub fn listen_url(config: &Config) -> String {
    let t = &config.transport;
    let mut url = format!(
        "{}?model={}&language={}&encoding=linear16&sample_rate={}&channels={}\
         &punctuate=true&smart_format=true&interim_results=true&endpointing=300",
        t.endpoint, t.model, t.language, config.audio.sample_rate, config.audio.channels,
    );
    if t.diarize {
        url.push_str("&diarize=true");
    }
    url
}

/// Owns the connection lifecycle for one session.
pub struct TransportClient {
    config: Config,
    token: String,
    state: Arc<StateCell>,
    latency: Arc<LatencyFeedback>,
    reconciler: Arc<Mutex<TranscriptReconciler>>,
    event_tx: Option<crossbeam_channel::Sender<SessionEvent>>,
}

/// Handle to a running transport thread.
///
/// `send_chunk` silently drops audio unless the connection is in the
/// `Connected` state, so capture can keep running across connect and close
/// without stalling the pipeline.
pub struct TransportHandle {
    chunk_tx: mpsc::Sender<Chunk>,
    close_tx: Option<oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<Result<()>>>,
    state: Arc<StateCell>,
}

impl TransportClient {
    pub fn new(
        config: Config,
        token: String,
        latency: Arc<LatencyFeedback>,
        reconciler: Arc<Mutex<TranscriptReconciler>>,
    ) -> Self {
        Self {
            config,
            token,
            state: Arc::new(StateCell::new()),
            latency,
            reconciler,
            event_tx: None,
        }
    }

    /// Set the channel session events are published on.
    pub fn with_event_tx(mut self, tx: crossbeam_channel::Sender<SessionEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Shared view of the connection state.
    pub fn state_handle(&self) -> Arc<StateCell> {
        self.state.clone()
    }

    /// Start the transport thread and return its handle.
    pub fn spawn(self) -> Result<TransportHandle> {
        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel();
        let state = self.state.clone();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ScribeError::Transport {
                message: format!("failed to build transport runtime: {e}"),
            })?;

        let thread = std::thread::Builder::new()
            .name("scribewire-transport".to_string())
            .spawn(move || runtime.block_on(self.run(chunk_rx, close_rx)))
            .map_err(|e| ScribeError::Transport {
                message: format!("failed to spawn transport thread: {e}"),
            })?;

        Ok(TransportHandle {
            chunk_tx,
            close_tx: Some(close_tx),
            thread: Some(thread),
            state,
        })
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.set(state);
        self.emit(SessionEvent::StateChanged(state));
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn fail(&self, error: ScribeError) -> ScribeError {
        self.set_state(ConnectionState::Failed);
        self.emit(SessionEvent::Error(error.to_string()));
        error
    }

    async fn run(
        self,
        mut chunk_rx: mpsc::Receiver<Chunk>,
        mut close_rx: oneshot::Receiver<()>,
    ) -> Result<()> {
        self.set_state(ConnectionState::Connecting);

        let connect_timeout = Duration::from_secs(self.config.transport.connect_timeout_secs);
        let request = match self.build_request() {
            Ok(request) => request,
            Err(e) => return Err(self.fail(e)),
        };
        let connected = tokio::time::timeout(connect_timeout, connect_async(request)).await;
        let ws = match connected {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => {
                return Err(self.fail(ScribeError::Transport {
                    message: format!("connection handshake failed: {e}"),
                }));
            }
            Err(_) => {
                return Err(self.fail(ScribeError::Unreachable {
                    endpoint: self.config.transport.endpoint.clone(),
                    message: format!("connect timed out after {connect_timeout:?}"),
                }));
            }
        };

        let (mut sink, mut stream) = ws.split();
        self.set_state(ConnectionState::Connected);

        let mut send_streak: u64 = 0;
        let mut server_closed = false;

        loop {
            tokio::select! {
                maybe_chunk = chunk_rx.recv() => match maybe_chunk {
                    Some(chunk) => {
                        let queued_at = chunk.emitted_at;
                        if let Err(e) = sink.send(Message::Binary(chunk.bytes.into())).await {
                            return Err(self.fail(ScribeError::Transport {
                                message: format!("audio send failed: {e}"),
                            }));
                        }
                        send_streak += 1;
                        let latency_ms = Instant::now()
                            .duration_since(queued_at)
                            .as_millis() as u64;
                        self.latency.record(latency_ms, send_streak >= STABLE_SEND_STREAK);
                    }
                    // All senders dropped; the pipeline is gone.
                    None => break,
                },
                _ = &mut close_rx => break,
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()),
                    Some(Ok(Message::Close(_))) => {
                        server_closed = true;
                        break;
                    }
                    // Pings are answered by the protocol layer on flush.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(self.fail(ScribeError::Transport {
                            message: format!("connection lost: {e}"),
                        }));
                    }
                    None => {
                        return Err(self.fail(ScribeError::Transport {
                            message: "connection closed by server without close frame".to_string(),
                        }));
                    }
                },
            }
        }

        self.set_state(ConnectionState::Closing);

        if !server_closed {
            // Ask the service to flush pending results, then drain them
            // until the close frame or the deadline.
            let _ = sink.send(Message::Text(CLOSE_STREAM_MESSAGE.into())).await;
            let close_timeout = Duration::from_secs(self.config.transport.close_timeout_secs);
            let _ = tokio::time::timeout(close_timeout, self.drain(&mut stream)).await;
            let _ = sink.send(Message::Close(None)).await;
        }

        self.set_state(ConnectionState::Closed);
        Ok(())
    }

    /// Consume trailing frames after CloseStream, committing any late finals.
    async fn drain(&self, stream: &mut futures_util::stream::SplitStream<WsStream>) {
        while let Some(inbound) = stream.next().await {
            match inbound {
                Ok(Message::Text(text)) => self.handle_text(text.as_str()),
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    }

    fn handle_text(&self, text: &str) {
        match ResultFrame::parse(text) {
            Ok(frame) => {
                if let Ok(mut reconciler) = self.reconciler.lock() {
                    reconciler.on_frame(&frame);
                }
                if let ResultFrame::Transcript { text, is_final } = frame {
                    self.emit(SessionEvent::Transcript { text, is_final });
                }
            }
            // Malformed frames are skipped; the stream itself is still good.
            Err(e) => {
                eprintln!("scribewire: skipping frame: {e}");
                self.emit(SessionEvent::Warning(e.to_string()));
            }
        }
    }

    fn build_request(&self) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request> {
        let mut request =
            listen_url(&self.config)
                .into_client_request()
                .map_err(|e| ScribeError::Transport {
                    message: format!("invalid endpoint URL: {e}"),
                })?;
        let auth = HeaderValue::from_str(&format!("Token {}", self.token)).map_err(|_| {
            ScribeError::Unconfigured {
                message: "credential contains invalid header characters".to_string(),
            }
        })?;
        request.headers_mut().insert("Authorization", auth);
        Ok(request)
    }
}

impl TransportHandle {
    /// Hand one chunk to the transport. Outside the `Connected` state the
    /// chunk is dropped without error.
    pub fn send_chunk(&self, chunk: Chunk) {
        if !self.state.get().can_send() {
            return;
        }
        // A send error means the transport thread already exited; the state
        // cell will read terminal on the next check.
        let _ = self.chunk_tx.blocking_send(chunk);
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Trigger the closing handshake and wait for the transport thread.
    ///
    /// Idempotent: a second call returns `Ok` without doing anything.
    pub fn close(&mut self) -> Result<()> {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
        match self.thread.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                Err(ScribeError::Transport {
                    message: "transport thread panicked".to_string(),
                })
            }),
            None => Ok(()),
        }
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.transport.endpoint = "wss://api.example.com/v1/listen".to_string();
        config.transport.model = "nova-2".to_string();
        config.transport.language = "en".to_string();
        config
    }

    #[test]
    fn test_listen_url_carries_stream_parameters() {
        let url = listen_url(&test_config());
        assert!(url.starts_with("wss://api.example.com/v1/listen?"));
        assert!(url.contains("model=nova-2"));
        assert!(url.contains("language=en"));
        assert!(url.contains("encoding=linear16"));
        assert!(url.contains("sample_rate=16000"));
        assert!(url.contains("channels=1"));
        assert!(url.contains("punctuate=true"));
        assert!(url.contains("smart_format=true"));
        assert!(url.contains("interim_results=true"));
        assert!(url.contains("endpointing=300"));
        assert!(!url.contains("diarize"));
    }

    #[test]
    fn test_listen_url_with_diarization() {
        let mut config = test_config();
        config.transport.diarize = true;
        assert!(listen_url(&config).contains("&diarize=true"));
    }

    #[test]
    fn test_send_chunk_dropped_when_not_connected() {
        let (chunk_tx, mut chunk_rx) = mpsc::channel(4);
        let handle = TransportHandle {
            chunk_tx,
            close_tx: None,
            thread: None,
            state: Arc::new(StateCell::new()),
        };

        handle.send_chunk(Chunk::new(vec![0u8; 64], 0));
        assert!(chunk_rx.try_recv().is_err());
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_send_chunk_forwarded_when_connected() {
        let (chunk_tx, mut chunk_rx) = mpsc::channel(4);
        let state = Arc::new(StateCell::new());
        state.set(ConnectionState::Connected);
        let handle = TransportHandle {
            chunk_tx,
            close_tx: None,
            thread: None,
            state,
        };

        handle.send_chunk(Chunk::new(vec![1u8; 64], 3));
        let chunk = chunk_rx.try_recv().unwrap();
        assert_eq!(chunk.sequence, 3);
    }

    #[test]
    fn test_close_without_thread_is_ok() {
        let (chunk_tx, _chunk_rx) = mpsc::channel(1);
        let mut handle = TransportHandle {
            chunk_tx,
            close_tx: None,
            thread: None,
            state: Arc::new(StateCell::new()),
        };
        assert!(handle.close().is_ok());
        assert!(handle.close().is_ok());
    }
}
