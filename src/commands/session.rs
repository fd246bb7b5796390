//! Session commands for the UI shell
//!
//! Button presses, menu selections and surface callbacks land here and are
//! turned into coordinator operations. UI updates go out on the event
//! channel returned by [`StreamerState::subscribe`].

use crate::connection::ConnectionMonitor;
use crate::engine::{engine_event_channel, EngineEventSender, EngineFacade};
use crate::notify::{ui_event_channel, Notice, UiEvent, UiEventSender};
use crate::session::{
    LifecycleState, Orientation, SessionCoordinator, SessionError, StartTarget, SubState,
    SurfaceReadinessTracker,
};
use crate::settings::StreamerSettings;
use crate::utils::paths::new_recording_path;
use crate::utils::{AppError, ErrorResponse};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Application state for one streaming screen
pub struct StreamerState {
    pub coordinator: Arc<SessionCoordinator>,
    settings: StreamerSettings,
    orientation: Mutex<Orientation>,
    ui_tx: UiEventSender,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl StreamerState {
    /// Build the engine with the sender it reports events on, hand it to a
    /// new coordinator and start the connection monitor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<E, F>(settings: StreamerSettings, build_engine: F) -> Self
    where
        E: EngineFacade + 'static,
        F: FnOnce(EngineEventSender) -> E,
    {
        let (events_tx, events_rx) = engine_event_channel();
        let engine = build_engine(events_tx);
        let coordinator = Arc::new(SessionCoordinator::new(
            Box::new(engine),
            SurfaceReadinessTracker::new(),
            settings.coordinator_options(),
        ));

        let (ui_tx, _) = ui_event_channel();
        let monitor =
            ConnectionMonitor::new(coordinator.clone(), settings.retry_policy(), ui_tx.clone())
                .spawn(events_rx);

        Self {
            coordinator,
            settings,
            orientation: Mutex::new(Orientation::Landscape),
            ui_tx,
            monitor: Mutex::new(Some(monitor)),
        }
    }

    pub fn settings(&self) -> &StreamerSettings {
        &self.settings
    }

    pub fn orientation(&self) -> Orientation {
        *self.orientation.lock()
    }

    /// Subscribe to UI updates
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.ui_tx.subscribe()
    }

    fn emit(&self, event: UiEvent) {
        let _ = self.ui_tx.send(event);
    }
}

/// Outcome of pressing the record button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordToggle {
    Started(PathBuf),
    Stopped(Option<PathBuf>),
}

async fn apply_orientation(
    state: &StreamerState,
    orientation: Orientation,
) -> Result<(), ErrorResponse> {
    let config = state
        .settings
        .session_config(orientation)
        .map_err(|e| ErrorResponse::from(SessionError::from(e)))?;
    let was_streaming = state.coordinator.state().streaming;

    match state.coordinator.reconfigure(config).await {
        Ok(()) => {
            *state.orientation.lock() = orientation;
            if was_streaming {
                state.emit(UiEvent::StreamingChanged(false));
            }
            Ok(())
        }
        Err(e) => {
            if e.is_fatal() {
                state.emit(UiEvent::StreamingChanged(false));
                state.emit(UiEvent::Notice(Notice::blocking(
                    "Audio or Video configuration failed",
                )));
            }
            Err(e.into())
        }
    }
}

/// Initial prepare with the current orientation
pub async fn prepare_session(state: &StreamerState) -> Result<(), ErrorResponse> {
    tracing::info!("Preparing session");
    apply_orientation(state, state.orientation()).await
}

/// Switch between landscape and portrait output
pub async fn set_orientation_mode(
    state: &StreamerState,
    is_vertical: bool,
) -> Result<(), ErrorResponse> {
    let orientation = Orientation::from_vertical(is_vertical);
    tracing::info!("Orientation change requested: {:?}", orientation);
    apply_orientation(state, orientation).await
}

/// Start streaming to `url`, or stop if already streaming. Returns whether
/// the stream is now active.
pub async fn toggle_stream(state: &StreamerState, url: String) -> Result<bool, ErrorResponse> {
    let coordinator = &state.coordinator;
    if coordinator.state().streaming {
        // The sub-state is cleared even when the engine stop fails
        let result = coordinator.request_stop(SubState::Stream).await;
        let streaming = coordinator.state().streaming;
        if !streaming {
            state.emit(UiEvent::StreamingChanged(false));
        }
        result?;
        Ok(streaming)
    } else {
        coordinator.request_start(StartTarget::Stream(url)).await?;
        state.emit(UiEvent::StreamingChanged(true));
        Ok(true)
    }
}

/// Start a timestamped recording, or stop the current one
pub async fn toggle_record(state: &StreamerState) -> Result<RecordToggle, ErrorResponse> {
    let coordinator = &state.coordinator;
    if coordinator.state().recording {
        let path = coordinator.record_path().await;
        let result = coordinator.request_stop(SubState::Record).await;
        if !coordinator.state().recording {
            if let Some(path) = &path {
                tracing::info!("Recording saved to {:?}", path);
                state.emit(UiEvent::RecordingSaved(path.clone()));
            }
        }
        result?;
        return Ok(RecordToggle::Stopped(path));
    }

    if !coordinator.state().is_ready() {
        return Err(SessionError::from(crate::session::StateError::NotReady).into());
    }
    let path = new_recording_path(&state.settings.recordings_dir)
        .map_err(|e| ErrorResponse::from(AppError::from(e)))?;
    coordinator
        .request_start(StartTarget::Record(path.clone()))
        .await?;
    Ok(RecordToggle::Started(path))
}

pub async fn switch_camera(state: &StreamerState) -> Result<(), ErrorResponse> {
    state.coordinator.switch_camera().await?;
    Ok(())
}

pub async fn surface_created(state: &StreamerState) {
    state.coordinator.surface_created().await;
}

pub async fn surface_changed(state: &StreamerState, width: u32, height: u32) {
    state.coordinator.surface_changed(width, height).await;
}

pub async fn surface_destroyed(state: &StreamerState) {
    state.coordinator.surface_destroyed().await;
}

pub fn get_session_state(state: &StreamerState) -> LifecycleState {
    state.coordinator.state()
}

/// Release the engine and wait for the monitor to finish
pub async fn shutdown(state: &StreamerState) {
    state.coordinator.teardown().await;
    let monitor = state.monitor.lock().take();
    if let Some(monitor) = monitor {
        if let Err(e) = monitor.await {
            tracing::warn!("Connection monitor ended abnormally: {}", e);
        }
    }
}
