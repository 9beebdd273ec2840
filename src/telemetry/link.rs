//! Threaded telemetry link
//!
//! A reader thread pulls newline-delimited lines off the sensor stream and
//! forwards them over a channel. An estimator thread owns the
//! `BiometricEstimator`, folds each line into it, runs the staleness check
//! while the stream is quiet, and publishes snapshots. The frame loop only
//! ever sees published copies, so no state is shared between the threads.

use super::estimator::BiometricEstimator;
use super::parser::parse_line;
use crate::config::TelemetryConfig;
use crate::error::FlowError;
use crate::types::BiometricSnapshot;
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often the estimator thread wakes to check for staleness
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Message published by the link
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryUpdate {
    Snapshot(BiometricSnapshot),
    /// Link-level status for display
    Status(String),
}

/// Handle to a running telemetry link
pub struct TelemetryLink {
    updates: Receiver<TelemetryUpdate>,
    stop_flag: Arc<AtomicBool>,
    estimator_handle: Option<JoinHandle<()>>,
}

impl TelemetryLink {
    /// Start reading telemetry lines from `reader`
    pub fn open<R>(reader: R, config: TelemetryConfig) -> Result<Self, FlowError>
    where
        R: BufRead + Send + 'static,
    {
        let (line_tx, line_rx) = crossbeam_channel::unbounded::<(String, u64)>();
        let (update_tx, update_rx) = crossbeam_channel::unbounded::<TelemetryUpdate>();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let started = Instant::now();

        // The reader may block on I/O indefinitely, so it is detached. It exits
        // on end of stream or once the estimator side has hung up.
        std::thread::Builder::new()
            .name("telemetry-reader".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            warn!("Telemetry read failed: {}", e);
                            break;
                        }
                    };
                    let now_ms = started.elapsed().as_millis() as u64;
                    if line_tx.send((line, now_ms)).is_err() {
                        break;
                    }
                }
                debug!("telemetry reader finished");
            })?;

        let estimator_stop = stop_flag.clone();
        let estimator_handle = std::thread::Builder::new()
            .name("telemetry-estimator".to_string())
            .spawn(move || {
                let mut estimator = BiometricEstimator::new(config);
                estimator.set_connected(true);
                let _ = update_tx.send(TelemetryUpdate::Snapshot(estimator.snapshot().clone()));

                while !estimator_stop.load(Ordering::Relaxed) {
                    match line_rx.recv_timeout(TICK_INTERVAL) {
                        Ok((line, now_ms)) => {
                            let snapshot = parse_line(&line)
                                .and_then(|parsed| estimator.ingest(&parsed, now_ms));
                            if let Some(snapshot) = snapshot {
                                let _ = update_tx.send(TelemetryUpdate::Snapshot(snapshot));
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            let now_ms = started.elapsed().as_millis() as u64;
                            if let Some(snapshot) = estimator.tick(now_ms) {
                                let _ = update_tx.send(TelemetryUpdate::Snapshot(snapshot));
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            warn!("Telemetry stream ended");
                            let cleared = estimator.disconnect();
                            let _ = update_tx.send(TelemetryUpdate::Snapshot(cleared));
                            let _ = update_tx
                                .send(TelemetryUpdate::Status("Connection lost".to_string()));
                            break;
                        }
                    }
                }
            })?;

        info!("Telemetry link opened");
        Ok(Self {
            updates: update_rx,
            stop_flag,
            estimator_handle: Some(estimator_handle),
        })
    }

    /// Drain every update published since the last call
    pub fn poll(&self) -> Result<Vec<TelemetryUpdate>, FlowError> {
        let mut updates = Vec::new();
        loop {
            match self.updates.try_recv() {
                Ok(update) => updates.push(update),
                Err(TryRecvError::Empty) => return Ok(updates),
                Err(TryRecvError::Disconnected) if !updates.is_empty() => return Ok(updates),
                Err(TryRecvError::Disconnected) => return Err(FlowError::TelemetryClosed),
            }
        }
    }

    /// Most recent snapshot among pending updates, if any
    pub fn latest(&self) -> Result<Option<BiometricSnapshot>, FlowError> {
        Ok(self
            .poll()?
            .into_iter()
            .filter_map(|update| match update {
                TelemetryUpdate::Snapshot(snapshot) => Some(snapshot),
                TelemetryUpdate::Status(_) => None,
            })
            .last())
    }

    /// Whether the estimator thread is still running
    pub fn is_open(&self) -> bool {
        self.estimator_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the estimator thread and wait for it to exit
    pub fn close(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.estimator_handle.take() {
            if handle.join().is_err() {
                warn!("Telemetry estimator thread panicked");
            }
            info!("Telemetry link closed");
        }
    }
}

impl Drop for TelemetryLink {
    fn drop(&mut self) {
        self.close();
    }
}
