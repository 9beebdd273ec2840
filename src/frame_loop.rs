//! Frame loop driver
//!
//! Connects the session engine to its external collaborators: a landmark
//! source, a speech sink, a render sink and optionally a telemetry link. One
//! call to `tick` is one display frame. The loop never halts on collaborator
//! failure; a failing source is reported once as a status event and its frames
//! are processed as empty detections until it recovers.

use crate::error::FlowError;
use crate::events::Event;
use crate::landmarks::Detection;
use crate::render::{DrawCommand, SceneComposer};
use crate::session::{SessionEngine, SessionReport};
use crate::telemetry::{TelemetryLink, TelemetryUpdate};
use crate::types::FrameOutput;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Hand/face detector
pub trait LandmarkSource {
    fn detect(&mut self, now_ms: u64) -> Result<Detection, FlowError>;
}

/// Speech output; a new utterance cancels any in flight
pub trait SpeechSink {
    fn speak(&mut self, text: &str);
}

/// Drawing surface
pub trait RenderSink {
    fn submit(&mut self, commands: Vec<DrawCommand>);
}

/// Cloneable handle that stops a running loop
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct FrameLoop<S, V, R> {
    engine: SessionEngine,
    source: S,
    speech: V,
    render: R,
    composer: SceneComposer,
    telemetry: Option<TelemetryLink>,
    stop: StopHandle,
    source_failed: bool,
}

impl<S, V, R> FrameLoop<S, V, R>
where
    S: LandmarkSource,
    V: SpeechSink,
    R: RenderSink,
{
    pub fn new(engine: SessionEngine, source: S, speech: V, render: R) -> Self {
        Self {
            engine,
            source,
            speech,
            render,
            composer: SceneComposer::default(),
            telemetry: None,
            stop: StopHandle::default(),
            source_failed: false,
        }
    }

    pub fn with_composer(mut self, composer: SceneComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_telemetry(mut self, link: TelemetryLink) -> Self {
        self.telemetry = Some(link);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    /// Run one frame: drain telemetry, detect, process, dispatch
    pub fn tick(&mut self, now_ms: u64) -> FrameOutput {
        let mut events = self.drain_telemetry();

        let detection = match self.source.detect(now_ms) {
            Ok(detection) => {
                if self.source_failed {
                    self.source_failed = false;
                    info!("Landmark source recovered");
                    events.push(Event::status("Detector recovered"));
                }
                detection
            }
            Err(e) => {
                if !self.source_failed {
                    self.source_failed = true;
                    warn!("Landmark source failed: {}", e);
                    events.push(Event::status(e.to_string()));
                }
                Detection::empty()
            }
        };

        let mut output = self.engine.process_frame(&detection, now_ms);
        events.append(&mut output.events);
        output.events = events;

        for text in output.events.iter().filter_map(Event::speech_text) {
            self.speech.speak(text);
        }
        self.render.submit(self.composer.compose(&output.snapshot));

        output
    }

    /// Tick until stopped or the clock runs out, then tear down.
    ///
    /// `clock` is called once per frame and returns the frame timestamp, or
    /// `None` to end the session.
    pub fn run<C>(mut self, mut clock: C) -> SessionReport
    where
        C: FnMut() -> Option<u64>,
    {
        while !self.stop.is_stopped() {
            let Some(now_ms) = clock() else {
                break;
            };
            self.tick(now_ms);
        }
        self.shutdown()
    }

    /// Close the telemetry link and produce the final report
    pub fn shutdown(mut self) -> SessionReport {
        if let Some(mut link) = self.telemetry.take() {
            link.close();
        }
        let report = self.engine.report();
        info!(session_id = %report.session_id, frames = report.frames, "session ended");
        report
    }

    fn drain_telemetry(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let Some(link) = &self.telemetry else {
            return events;
        };

        match link.poll() {
            Ok(updates) => {
                for update in updates {
                    match update {
                        TelemetryUpdate::Snapshot(snapshot) => {
                            events.extend(self.engine.apply_biometrics(snapshot));
                        }
                        TelemetryUpdate::Status(message) => events.push(Event::status(message)),
                    }
                }
            }
            Err(e) => {
                warn!("Telemetry link gone: {}", e);
                self.telemetry = None;
            }
        }
        events
    }
}
