//! Scripted engine used by the unit tests

use super::traits::{
    AudioParams, EngineError, EngineEvent, EngineEventSender, EngineFacade, EngineResult,
    RecordStatus, SurfaceSize, VideoParams,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct FakeState {
    pub calls: Vec<String>,
    pub previewing: bool,
    pub streaming: bool,
    pub recording: bool,
    pub reject_video: bool,
    pub reject_audio: bool,
    pub fail_stop_stream: bool,
    pub fail_stop_record: bool,
    /// Number of upcoming `start_stream` calls that report a connection
    /// failure on the event channel before returning
    pub fail_connects: u32,
    /// Set if prepare was ever called with a sub-state active
    pub prepared_while_active: bool,
    pub last_preview_surface: Option<SurfaceSize>,
}

/// Handle kept by a test to inspect and script the engine after it has
/// been moved into a coordinator
#[derive(Clone, Default)]
pub struct FakeHandle {
    pub state: Arc<Mutex<FakeState>>,
    /// When set, `prepare_video` waits for a notification before returning
    pub prepare_gate: Arc<Mutex<Option<Arc<Notify>>>>,
    /// Notified every time `prepare_video` is entered
    pub prepare_entered: Arc<Notify>,
}

impl FakeHandle {
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.as_str() == name).count()
    }

    pub fn gate_prepare(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.prepare_gate.lock() = Some(gate.clone());
        gate
    }
}

pub struct FakeEngine {
    handle: FakeHandle,
    events: Option<EngineEventSender>,
}

impl FakeEngine {
    pub fn new() -> (Self, FakeHandle) {
        let handle = FakeHandle::default();
        (
            Self {
                handle: handle.clone(),
                events: None,
            },
            handle,
        )
    }

    pub fn with_events(events: EngineEventSender) -> (Self, FakeHandle) {
        let (mut engine, handle) = Self::new();
        engine.events = Some(events);
        (engine, handle)
    }

    fn record(&self, call: &str) {
        self.handle.state.lock().calls.push(call.to_string());
    }

    fn check_idle_for_prepare(&self) {
        let mut state = self.handle.state.lock();
        if state.previewing || state.streaming || state.recording {
            state.prepared_while_active = true;
        }
    }
}

#[async_trait]
impl EngineFacade for FakeEngine {
    async fn prepare_video(&mut self, _params: VideoParams) -> EngineResult<bool> {
        self.check_idle_for_prepare();
        self.record("prepare_video");
        self.handle.prepare_entered.notify_one();
        let gate = self.handle.prepare_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(!self.handle.state.lock().reject_video)
    }

    async fn prepare_audio(&mut self, _params: AudioParams) -> EngineResult<bool> {
        self.check_idle_for_prepare();
        self.record("prepare_audio");
        Ok(!self.handle.state.lock().reject_audio)
    }

    async fn start_preview(&mut self, surface: Option<SurfaceSize>) -> EngineResult<()> {
        self.record("start_preview");
        let mut state = self.handle.state.lock();
        state.previewing = true;
        state.last_preview_surface = surface;
        Ok(())
    }

    async fn stop_preview(&mut self) -> EngineResult<()> {
        self.record("stop_preview");
        self.handle.state.lock().previewing = false;
        Ok(())
    }

    async fn set_preview_resolution(&mut self, _size: SurfaceSize) -> EngineResult<()> {
        self.record("set_preview_resolution");
        Ok(())
    }

    async fn start_stream(&mut self, _url: &str) -> EngineResult<()> {
        self.record("start_stream");
        let fail_connect = {
            let mut state = self.handle.state.lock();
            state.streaming = true;
            if state.fail_connects > 0 {
                state.fail_connects -= 1;
                true
            } else {
                false
            }
        };
        if fail_connect {
            if let Some(events) = &self.events {
                let _ = events.send(EngineEvent::ConnectionFailed("connect timeout".to_string()));
            }
            // Let the event consumer run before the start completes
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    async fn stop_stream(&mut self) -> EngineResult<()> {
        self.record("stop_stream");
        let mut state = self.handle.state.lock();
        state.streaming = false;
        if state.fail_stop_stream {
            return Err(EngineError::Operation("stop stream failed".to_string()));
        }
        Ok(())
    }

    async fn start_record(&mut self, _path: &Path) -> EngineResult<()> {
        self.record("start_record");
        self.handle.state.lock().recording = true;
        if let Some(events) = &self.events {
            let _ = events.send(EngineEvent::RecordStatus(RecordStatus::Started));
        }
        Ok(())
    }

    async fn stop_record(&mut self) -> EngineResult<()> {
        self.record("stop_record");
        let mut state = self.handle.state.lock();
        state.recording = false;
        if state.fail_stop_record {
            return Err(EngineError::Operation("stop record failed".to_string()));
        }
        Ok(())
    }

    async fn switch_camera(&mut self) -> EngineResult<()> {
        self.record("switch_camera");
        Ok(())
    }

    async fn release(&mut self) -> EngineResult<()> {
        // Sub-state flags are left alone so tests can tell whether the
        // coordinator stopped them explicitly.
        self.record("release");
        Ok(())
    }
}
