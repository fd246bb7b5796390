//! Session coordinator
//!
//! Owns the engine and the lifecycle state, serializes every transition,
//! and sequences teardown before reconfiguration.

use super::config::SessionConfig;
use super::error::{ConfigError, SessionResult, StateError};
use super::state::{LifecycleState, Phase, SubState};
use super::surface::SurfaceReadinessTracker;
use crate::engine::{EngineFacade, EngineResult};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

/// Events emitted on every committed transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged(Phase),
    Started(SubState),
    Stopped(SubState),
    /// Prepare was rejected; the hosting session should be closed
    PrepareFailed(String),
}

/// What to activate, with the target it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTarget {
    /// Render into the surface tracked by the coordinator
    Preview,
    /// Connect to the given URL
    Stream(String),
    /// Write to the given file
    Record(PathBuf),
}

impl StartTarget {
    pub fn kind(&self) -> SubState {
        match self {
            StartTarget::Preview => SubState::Preview,
            StartTarget::Stream(_) => SubState::Stream,
            StartTarget::Record(_) => SubState::Record,
        }
    }
}

/// Behavioural switches for a coordinator
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinatorOptions {
    /// Start preview whenever the session is Ready and the surface is
    /// available, not only when restoring one after a reconfigure
    pub preview_on_surface: bool,
}

/// Everything guarded by the operation lock
struct Inner {
    engine: Box<dyn EngineFacade>,
    config: Option<SessionConfig>,
    stream_url: Option<String>,
    record_path: Option<PathBuf>,
    /// Engine holds resources from an earlier prepare
    needs_release: bool,
}

/// Clears the in-flight reconfigure flag when dropped
struct ReconfigureGuard<'a>(&'a AtomicBool);

impl Drop for ReconfigureGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Lifecycle state machine around a single exclusively owned engine.
///
/// All operations take `&self` and are serialized by one async lock held for
/// the whole operation, engine calls included, so no caller ever observes a
/// half-applied transition. [`state`](Self::state) reads a snapshot that is
/// only written while that lock is held.
pub struct SessionCoordinator {
    id: Uuid,
    state: Arc<RwLock<LifecycleState>>,
    inner: Mutex<Inner>,
    reconfiguring: AtomicBool,
    /// Set from the moment a stream start is issued until it is stopped
    stream_requested: AtomicBool,
    surface: SurfaceReadinessTracker,
    options: CoordinatorOptions,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionCoordinator {
    /// Create a coordinator that takes ownership of `engine`
    pub fn new(
        engine: Box<dyn EngineFacade>,
        surface: SurfaceReadinessTracker,
        options: CoordinatorOptions,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let id = Uuid::new_v4();
        tracing::debug!("Created session coordinator {}", id);
        Self {
            id,
            state: Arc::new(RwLock::new(LifecycleState::default())),
            inner: Mutex::new(Inner {
                engine,
                config: None,
                stream_url: None,
                record_path: None,
                needs_release: false,
            }),
            reconfiguring: AtomicBool::new(false),
            stream_requested: AtomicBool::new(false),
            surface,
            options,
            event_tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Snapshot of the current lifecycle state
    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Whether a stream is active or currently being started.
    ///
    /// Unlike `state().streaming` this is already true while the engine's
    /// `start_stream` call is in progress, so connection events reported
    /// during the start are attributed to the stream.
    pub fn stream_requested(&self) -> bool {
        self.stream_requested.load(Ordering::Acquire)
    }

    pub fn surface(&self) -> &SurfaceReadinessTracker {
        &self.surface
    }

    /// Subscribe to transition events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Configuration of the current prepare cycle, if prepared
    pub async fn config(&self) -> Option<SessionConfig> {
        self.inner.lock().await.config
    }

    /// Path of the recording in progress
    pub async fn record_path(&self) -> Option<PathBuf> {
        self.inner.lock().await.record_path.clone()
    }

    fn enter_phase(&self, phase: Phase) {
        self.state.write().enter(phase);
        tracing::info!("Session {} -> {:?}", self.id, phase);
        let _ = self.event_tx.send(SessionEvent::PhaseChanged(phase));
    }

    fn set_active(&self, kind: SubState, active: bool) {
        self.state.write().set_active(kind, active);
        let event = if active {
            SessionEvent::Started(kind)
        } else {
            SessionEvent::Stopped(kind)
        };
        let _ = self.event_tx.send(event);
    }

    /// Tear down active sub-states and prepare the engine with `config`.
    ///
    /// Stop and release failures are logged and ignored. A rejected prepare
    /// leaves the session Idle and is reported as
    /// [`ConfigError::PrepareFailed`]. A reconfigure issued while another is
    /// still in flight fails with [`StateError::Busy`].
    pub async fn reconfigure(&self, config: SessionConfig) -> SessionResult<()> {
        if self.state().is_released() {
            return Err(StateError::Released.into());
        }
        if self
            .reconfiguring
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Rejecting reconfigure: another one is in flight");
            return Err(StateError::Busy.into());
        }
        let _guard = ReconfigureGuard(&self.reconfiguring);

        let mut inner = self.inner.lock().await;
        let before = self.state();
        if before.is_released() {
            return Err(StateError::Released.into());
        }
        let was_previewing = before.previewing;

        tracing::info!(
            "Reconfiguring session {}: {}x{} @ {} bps (max {} bps), rotation {}",
            self.id,
            config.width(),
            config.height(),
            config.video_bitrate_bps(),
            config.max_bitrate_bps(),
            config.rotation().degrees()
        );

        self.stop_all(&mut inner).await;
        if inner.needs_release {
            if let Err(e) = inner.engine.release().await {
                tracing::warn!("Failed to release engine before prepare: {}", e);
            }
            inner.needs_release = false;
        }
        inner.config = None;
        self.enter_phase(Phase::Preparing);

        inner.needs_release = true;
        match prepare_engine(inner.engine.as_mut(), &config).await {
            Ok(()) => {
                inner.config = Some(config);
                self.enter_phase(Phase::Ready);

                let restore_preview = was_previewing || self.options.preview_on_surface;
                if restore_preview && self.surface.is_ready() {
                    tracing::debug!("Surface ready, starting preview");
                    if let Err(e) = self.start_locked(&mut inner, StartTarget::Preview).await {
                        tracing::error!("Failed to start preview after prepare: {}", e);
                    }
                }
                Ok(())
            }
            Err(reason) => {
                tracing::error!("Prepare failed: {}", reason);
                self.enter_phase(Phase::Idle);
                let _ = self.event_tx.send(SessionEvent::PrepareFailed(reason.clone()));
                Err(ConfigError::PrepareFailed(reason).into())
            }
        }
    }

    /// Activate a sub-state. Already active is a no-op success.
    pub async fn request_start(&self, target: StartTarget) -> SessionResult<()> {
        let mut inner = self.inner.lock().await;
        self.start_locked(&mut inner, target).await
    }

    async fn start_locked(&self, inner: &mut Inner, target: StartTarget) -> SessionResult<()> {
        let state = self.state();
        if state.is_released() {
            return Err(StateError::Released.into());
        }
        if !state.is_ready() {
            return Err(StateError::NotReady.into());
        }
        let kind = target.kind();
        if state.is_active(kind) {
            tracing::debug!("{} already active", kind);
            return Ok(());
        }

        match target {
            StartTarget::Preview => {
                if !self.surface.is_ready() {
                    return Err(StateError::SurfaceNotReady.into());
                }
                inner.engine.start_preview(self.surface.size()).await?;
            }
            StartTarget::Stream(url) => {
                tracing::info!("Starting stream to {}", url);
                self.stream_requested.store(true, Ordering::Release);
                if let Err(e) = inner.engine.start_stream(&url).await {
                    self.stream_requested.store(false, Ordering::Release);
                    return Err(e.into());
                }
                inner.stream_url = Some(url);
            }
            StartTarget::Record(path) => {
                tracing::info!("Starting recording to {:?}", path);
                inner.engine.start_record(&path).await?;
                inner.record_path = Some(path);
            }
        }

        self.set_active(kind, true);
        Ok(())
    }

    /// Deactivate a sub-state. Already inactive is a no-op success.
    ///
    /// The sub-state is cleared even if the engine reports an error, since
    /// engine stops are idempotent; the error is still returned.
    pub async fn request_stop(&self, kind: SubState) -> SessionResult<()> {
        let mut inner = self.inner.lock().await;
        let state = self.state();
        if state.is_released() {
            return Err(StateError::Released.into());
        }
        if !state.is_active(kind) {
            return Ok(());
        }

        tracing::info!("Stopping {}", kind);
        let result = stop_engine(inner.engine.as_mut(), kind).await;
        self.clear_locked(&mut inner, kind);
        result.map_err(Into::into)
    }

    fn clear_locked(&self, inner: &mut Inner, kind: SubState) {
        match kind {
            SubState::Stream => {
                inner.stream_url = None;
                self.stream_requested.store(false, Ordering::Release);
            }
            SubState::Record => inner.record_path = None,
            SubState::Preview => {}
        }
        self.set_active(kind, false);
    }

    /// Best-effort stop of every active sub-state
    async fn stop_all(&self, inner: &mut Inner) {
        for kind in self.state().active() {
            if let Err(e) = stop_engine(inner.engine.as_mut(), kind).await {
                tracing::warn!("Failed to stop {} (continuing): {}", kind, e);
            }
            self.clear_locked(inner, kind);
        }
    }

    /// Reconnect the active stream to its URL.
    ///
    /// Returns `false` without touching the engine when no stream is active,
    /// e.g. because the user stopped it while a retry was pending.
    pub async fn retry_stream(&self) -> SessionResult<bool> {
        let mut inner = self.inner.lock().await;
        let state = self.state();
        if state.is_released() {
            return Err(StateError::Released.into());
        }
        let url = match (&inner.stream_url, state.streaming) {
            (Some(url), true) => url.clone(),
            _ => return Ok(false),
        };

        tracing::info!("Retrying stream to {}", url);
        if let Err(e) = inner.engine.stop_stream().await {
            tracing::debug!("Stop before retry failed: {}", e);
        }
        inner.engine.start_stream(&url).await?;
        Ok(true)
    }

    /// Switch between front and back camera
    pub async fn switch_camera(&self) -> SessionResult<()> {
        let mut inner = self.inner.lock().await;
        let state = self.state();
        if state.is_released() {
            return Err(StateError::Released.into());
        }
        if !state.is_ready() {
            return Err(StateError::NotReady.into());
        }
        inner.engine.switch_camera().await?;
        Ok(())
    }

    /// A renderable surface now exists
    pub async fn surface_created(&self) {
        self.surface.on_surface_created();
        if !self.options.preview_on_surface {
            return;
        }

        let mut inner = self.inner.lock().await;
        let state = self.state();
        if state.is_ready() && !state.previewing {
            if let Err(e) = self.start_locked(&mut inner, StartTarget::Preview).await {
                tracing::error!("Failed to start preview on new surface: {}", e);
            }
        } else {
            tracing::debug!("Surface created, waiting for prepare (phase {:?})", state.phase);
        }
    }

    /// The surface was resized. Forwarded to the engine only once Ready;
    /// otherwise the size is kept for the next preview start.
    pub async fn surface_changed(&self, width: u32, height: u32) {
        let Some(size) = self.surface.on_surface_changed(width, height) else {
            return;
        };

        let mut inner = self.inner.lock().await;
        if !self.state().is_ready() {
            return;
        }
        if let Err(e) = inner.engine.set_preview_resolution(size).await {
            tracing::error!("Failed to set preview resolution: {}", e);
        }
    }

    /// The surface is gone. Preview is stopped before readiness drops.
    pub async fn surface_destroyed(&self) {
        let mut inner = self.inner.lock().await;
        let inner = &mut *inner;
        self.surface
            .on_surface_destroyed(move || async move {
                if !self.state().previewing {
                    return;
                }
                if let Err(e) = stop_engine(inner.engine.as_mut(), SubState::Preview).await {
                    tracing::error!("Failed to stop preview: {}", e);
                }
                self.clear_locked(inner, SubState::Preview);
            })
            .await;
    }

    /// Stop everything and release the engine. Terminal; later operations
    /// fail with [`StateError::Released`].
    pub async fn teardown(&self) {
        let mut inner = self.inner.lock().await;
        if self.state().is_released() {
            return;
        }

        tracing::info!("Tearing down session {}", self.id);
        self.stop_all(&mut inner).await;
        if let Err(e) = inner.engine.release().await {
            tracing::error!("Failed to release engine: {}", e);
        }
        inner.needs_release = false;
        inner.config = None;
        self.enter_phase(Phase::Released);
    }
}

/// Run video then audio prepare; both must succeed
async fn prepare_engine(
    engine: &mut dyn EngineFacade,
    config: &SessionConfig,
) -> Result<(), String> {
    let video = engine
        .prepare_video(config.video())
        .await
        .map_err(|e| format!("video prepare failed: {}", e))?;
    tracing::debug!("Video prepare result: {}", video);

    let audio = engine
        .prepare_audio(config.audio())
        .await
        .map_err(|e| format!("audio prepare failed: {}", e))?;
    tracing::debug!("Audio prepare result: {}", audio);

    match (video, audio) {
        (true, true) => Ok(()),
        (false, _) => Err("video configuration rejected".to_string()),
        (true, false) => Err("audio configuration rejected".to_string()),
    }
}

async fn stop_engine(engine: &mut dyn EngineFacade, kind: SubState) -> EngineResult<()> {
    match kind {
        SubState::Preview => engine.stop_preview().await,
        SubState::Stream => engine.stop_stream().await,
        SubState::Record => engine.stop_record().await,
    }
}
