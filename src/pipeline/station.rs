//! Station abstraction and runner for the streaming pipeline.

use crate::pipeline::error::{ErrorReporter, StationError};
use crossbeam_channel::{Receiver, Sender};
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A processing stage in the streaming pipeline.
///
/// Stations run in their own threads and are connected by channels. One
/// input may produce any number of outputs: conditioning maps a read to at
/// most one conditioned batch, while buffering can emit several chunks from
/// a single large ingest.
pub trait Station: Send + 'static {
    /// The input type this station receives.
    type Input: Send + 'static;
    /// The output type this station produces.
    type Output: Send + 'static;

    /// Process one input, producing its outputs in emission order.
    fn process(&mut self, input: Self::Input) -> Result<Vec<Self::Output>, StationError>;

    /// Returns the name of this station for logging and error reporting.
    fn name(&self) -> &'static str;

    /// Final outputs to emit when the input channel closes.
    ///
    /// Override this to flush state held across inputs.
    fn shutdown(&mut self) -> Vec<Self::Output> {
        Vec::new()
    }
}

/// Runs a station in a dedicated thread.
pub struct StationRunner<S: Station> {
    /// Handle to the spawned thread.
    handle: Option<JoinHandle<()>>,
    /// Name of the station (cached for error reporting).
    station_name: &'static str,
    /// Phantom data to mark the station type.
    _phantom: PhantomData<S>,
}

impl<S: Station> StationRunner<S> {
    /// Spawns a new station in a dedicated thread.
    ///
    /// The thread drains `input_rx` until it disconnects, then emits the
    /// station's shutdown outputs before exiting. A disconnected output
    /// channel ends the thread early.
    pub fn spawn(
        mut station: S,
        input_rx: Receiver<S::Input>,
        output_tx: Sender<S::Output>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let station_name = station.name();

        let handle = thread::spawn(move || {
            Self::run_station(&mut station, input_rx, output_tx, error_reporter);
        });

        Self {
            handle: Some(handle),
            station_name,
            _phantom: PhantomData,
        }
    }

    /// Main processing loop for the station.
    fn run_station(
        station: &mut S,
        input_rx: Receiver<S::Input>,
        output_tx: Sender<S::Output>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) {
        let station_name = station.name();

        'recv: while let Ok(input) = input_rx.recv() {
            match station.process(input) {
                Ok(outputs) => {
                    for output in outputs {
                        if output_tx.send(output).is_err() {
                            // Downstream gone, nothing left to feed.
                            break 'recv;
                        }
                    }
                }
                Err(StationError::Recoverable(msg)) => {
                    error_reporter.report(station_name, &StationError::Recoverable(msg));
                }
                Err(StationError::Fatal(msg)) => {
                    error_reporter.report(station_name, &StationError::Fatal(msg));
                    break;
                }
            }
        }

        for output in station.shutdown() {
            if output_tx.send(output).is_err() {
                break;
            }
        }
    }

    /// Waits for the station thread to complete.
    pub fn join(mut self) -> Result<(), String> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| format!("Station '{}' thread panicked", self.station_name))
        } else {
            Ok(())
        }
    }

    /// Returns the name of the station.
    pub fn name(&self) -> &'static str {
        self.station_name
    }
}
