//! Engine event handling
//!
//! The monitor is the single consumer of the engine's event channel. It runs
//! connection events through the retry policy, drives the coordinator when a
//! stream has to be retried or stopped, and publishes UI updates.

use super::retry::{ConnectionRetryPolicy, ConnectionStatus, RetryDecision};
use crate::engine::{EngineEvent, EngineEventReceiver};
use crate::notify::{format_bitrate, Notice, UiEvent, UiEventSender};
use crate::session::{Phase, SessionCoordinator, SessionEvent, SubState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

pub struct ConnectionMonitor {
    coordinator: Arc<SessionCoordinator>,
    policy: ConnectionRetryPolicy,
    ui_tx: UiEventSender,
    pending_retry: Option<JoinHandle<()>>,
}

impl ConnectionMonitor {
    pub fn new(
        coordinator: Arc<SessionCoordinator>,
        policy: ConnectionRetryPolicy,
        ui_tx: UiEventSender,
    ) -> Self {
        Self {
            coordinator,
            policy,
            ui_tx,
            pending_retry: None,
        }
    }

    pub fn policy(&self) -> &ConnectionRetryPolicy {
        &self.policy
    }

    pub fn has_pending_retry(&self) -> bool {
        self.pending_retry
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Run the monitor on its own task until the session is released or
    /// the engine drops its sender
    pub fn spawn(self, engine_rx: EngineEventReceiver) -> JoinHandle<()> {
        // Subscribe before the task first runs so no transition is missed
        let session_rx = self.coordinator.subscribe();
        tokio::spawn(self.run(engine_rx, session_rx))
    }

    async fn run(
        mut self,
        mut engine_rx: EngineEventReceiver,
        mut session_rx: broadcast::Receiver<SessionEvent>,
    ) {
        tracing::debug!("Connection monitor started");

        loop {
            // Session transitions are committed before the engine calls that
            // follow them, so they are drained first.
            tokio::select! {
                biased;

                event = session_rx.recv() => match event {
                    Ok(SessionEvent::PhaseChanged(Phase::Released)) => break,
                    Ok(event) => self.handle_session_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Monitor lagged behind {} session events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                event = engine_rx.recv() => match event {
                    Some(event) => self.handle_engine_event(event).await,
                    None => break,
                },
            }
        }

        self.cancel_pending_retry();
        tracing::debug!("Connection monitor stopped");
    }

    fn emit(&self, event: UiEvent) {
        // No subscribers is fine; the UI may not be attached yet
        let _ = self.ui_tx.send(event);
    }

    pub async fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::ConnectionStarted(url) => {
                tracing::info!("Connecting to {}", url);
            }
            EngineEvent::ConnectionSuccess => {
                self.policy.on_connection_success();
                self.emit(UiEvent::Connection(ConnectionStatus::Connected));
                self.emit(UiEvent::Notice(Notice::transient("Connected")));
            }
            EngineEvent::ConnectionFailed(reason) if !self.coordinator.stream_requested() => {
                tracing::debug!("Ignoring connection failure with no stream: {}", reason);
            }
            EngineEvent::ConnectionFailed(reason) => {
                match self.policy.on_connection_failed(&reason) {
                    RetryDecision::Retry { after, .. } => {
                        self.schedule_retry(after);
                        self.emit(UiEvent::Connection(ConnectionStatus::Retrying));
                        self.emit(UiEvent::Notice(Notice::transient("Retry")));
                    }
                    RetryDecision::GiveUp => {
                        self.give_up(format!("Failed: {}", reason)).await;
                    }
                }
            }
            EngineEvent::Disconnect => {
                self.policy.on_disconnect();
                self.emit(UiEvent::Bitrate(None));
                self.emit(UiEvent::Connection(self.policy.status()));
                self.emit(UiEvent::Notice(Notice::transient("Disconnected")));
            }
            EngineEvent::AuthError => {
                self.policy.on_auth_error();
                self.give_up("Auth error".to_string()).await;
            }
            EngineEvent::AuthSuccess => {
                self.policy.on_auth_success();
                self.emit(UiEvent::Connection(ConnectionStatus::Connected));
                self.emit(UiEvent::Notice(Notice::transient("Auth success")));
            }
            EngineEvent::BitrateChanged(bitrate) => {
                tracing::trace!("Bitrate {} bps", bitrate);
                self.emit(UiEvent::Bitrate(Some(format_bitrate(bitrate))));
            }
            EngineEvent::RecordStatus(status) => {
                tracing::debug!("Record status: {:?}", status);
                self.emit(UiEvent::RecordStatus(status));
            }
        }
    }

    /// Retry state ends with the stream it belongs to.
    ///
    /// `Started(Stream)` is not a reset point: the engine may already have
    /// reported a failure for the new stream before the start is committed.
    pub fn handle_session_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Stopped(SubState::Stream) | SessionEvent::PhaseChanged(_) => {
                self.cancel_pending_retry();
                self.policy.reset();
            }
            _ => {}
        }
    }

    fn schedule_retry(&mut self, after: Duration) {
        self.cancel_pending_retry();
        let coordinator = self.coordinator.clone();
        self.pending_retry = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            match coordinator.retry_stream().await {
                Ok(true) => {}
                Ok(false) => tracing::debug!("Stream no longer active, retry skipped"),
                Err(e) => tracing::error!("Stream retry failed: {}", e),
            }
        }));
    }

    fn cancel_pending_retry(&mut self) {
        if let Some(handle) = self.pending_retry.take() {
            handle.abort();
        }
    }

    async fn give_up(&mut self, message: String) {
        self.cancel_pending_retry();
        if let Err(e) = self.coordinator.request_stop(SubState::Stream).await {
            tracing::error!("Failed to stop stream: {}", e);
        }
        self.emit(UiEvent::StreamingChanged(false));
        self.emit(UiEvent::Connection(ConnectionStatus::Failed));
        self.emit(UiEvent::Notice(Notice::blocking(message)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{FakeEngine, FakeHandle};
    use crate::engine::{engine_event_channel, RecordStatus};
    use crate::notify::{ui_event_channel, NoticeLevel};
    use crate::session::{
        CoordinatorOptions, SessionConfig, StartTarget, SurfaceReadinessTracker,
    };
    use std::path::PathBuf;

    async fn streaming_coordinator() -> (Arc<SessionCoordinator>, FakeHandle) {
        let (engine, handle) = FakeEngine::new();
        let coordinator = Arc::new(SessionCoordinator::new(
            Box::new(engine),
            SurfaceReadinessTracker::new(),
            CoordinatorOptions::default(),
        ));
        let config = SessionConfig::new(640, 480, 1_200_000, 0, 32_000, true, 128_000).unwrap();
        coordinator.reconfigure(config).await.unwrap();
        coordinator
            .request_start(StartTarget::Stream("rtmp://localhost/live".to_string()))
            .await
            .unwrap();
        (coordinator, handle)
    }

    fn drain(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_auth_error_stops_stream_without_retry() {
        let (coordinator, handle) = streaming_coordinator().await;
        let (ui_tx, mut ui_rx) = ui_event_channel();
        let mut monitor =
            ConnectionMonitor::new(coordinator.clone(), ConnectionRetryPolicy::default(), ui_tx);

        monitor.handle_engine_event(EngineEvent::AuthError).await;

        assert!(!coordinator.state().streaming);
        assert!(!monitor.has_pending_retry());
        assert_eq!(handle.count("start_stream"), 1);
        assert_eq!(monitor.policy().status(), ConnectionStatus::Failed);

        let events = drain(&mut ui_rx);
        assert!(events.contains(&UiEvent::Notice(Notice::blocking("Auth error"))));
        assert!(events.contains(&UiEvent::StreamingChanged(false)));
    }

    #[tokio::test]
    async fn test_failure_schedules_retry() {
        let (coordinator, handle) = streaming_coordinator().await;
        let (ui_tx, mut ui_rx) = ui_event_channel();
        let policy = ConnectionRetryPolicy::new(5, Duration::from_millis(10));
        let mut monitor = ConnectionMonitor::new(coordinator.clone(), policy, ui_tx);

        monitor
            .handle_engine_event(EngineEvent::ConnectionFailed("timeout".to_string()))
            .await;
        assert_eq!(monitor.policy().status(), ConnectionStatus::Retrying);
        let events = drain(&mut ui_rx);
        assert!(events.contains(&UiEvent::Notice(Notice::transient("Retry"))));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.count("start_stream"), 2);
        assert!(coordinator.state().streaming);

        monitor.handle_engine_event(EngineEvent::ConnectionSuccess).await;
        assert_eq!(monitor.policy().attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_stop_stream() {
        let (coordinator, _handle) = streaming_coordinator().await;
        let (ui_tx, mut ui_rx) = ui_event_channel();
        let policy = ConnectionRetryPolicy::new(2, Duration::from_secs(60));
        let mut monitor = ConnectionMonitor::new(coordinator.clone(), policy, ui_tx);

        monitor
            .handle_engine_event(EngineEvent::ConnectionFailed("timeout".to_string()))
            .await;
        assert!(monitor.has_pending_retry());
        monitor
            .handle_engine_event(EngineEvent::ConnectionFailed("timeout".to_string()))
            .await;

        assert!(!monitor.has_pending_retry());
        assert!(!coordinator.state().streaming);
        let blocking: Vec<_> = drain(&mut ui_rx)
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Notice(notice) if notice.level == NoticeLevel::Blocking => {
                    Some(notice.message)
                }
                _ => None,
            })
            .collect();
        assert_eq!(blocking, vec!["Failed: timeout".to_string()]);
    }

    #[tokio::test]
    async fn test_bitrate_and_disconnect_update_label() {
        let (coordinator, _handle) = streaming_coordinator().await;
        let (ui_tx, mut ui_rx) = ui_event_channel();
        let mut monitor =
            ConnectionMonitor::new(coordinator, ConnectionRetryPolicy::default(), ui_tx);

        monitor.handle_engine_event(EngineEvent::BitrateChanged(1_100_000)).await;
        monitor.handle_engine_event(EngineEvent::Disconnect).await;

        let events = drain(&mut ui_rx);
        assert_eq!(events[0], UiEvent::Bitrate(Some("1.1 mb/s".to_string())));
        assert_eq!(events[1], UiEvent::Bitrate(None));
        assert!(events.contains(&UiEvent::Notice(Notice::transient("Disconnected"))));
    }

    #[tokio::test]
    async fn test_stream_stop_resets_policy() {
        let (coordinator, _handle) = streaming_coordinator().await;
        let (ui_tx, _ui_rx) = ui_event_channel();
        let mut monitor =
            ConnectionMonitor::new(coordinator, ConnectionRetryPolicy::default(), ui_tx);

        monitor
            .handle_engine_event(EngineEvent::ConnectionFailed("timeout".to_string()))
            .await;
        assert_eq!(monitor.policy().attempt_count(), 1);

        monitor.handle_session_event(&SessionEvent::Stopped(SubState::Stream));
        assert_eq!(monitor.policy().attempt_count(), 0);
        assert!(!monitor.has_pending_retry());
    }

    #[tokio::test]
    async fn test_failure_after_stop_is_ignored() {
        let (coordinator, handle) = streaming_coordinator().await;
        let (ui_tx, mut ui_rx) = ui_event_channel();
        let policy = ConnectionRetryPolicy::new(5, Duration::from_millis(10));
        let mut monitor = ConnectionMonitor::new(coordinator.clone(), policy, ui_tx);

        coordinator.request_stop(SubState::Stream).await.unwrap();
        assert!(!coordinator.stream_requested());
        monitor
            .handle_engine_event(EngineEvent::ConnectionFailed("late".to_string()))
            .await;

        assert_eq!(monitor.policy().attempt_count(), 0);
        assert!(!monitor.has_pending_retry());
        assert!(drain(&mut ui_rx).is_empty());
        assert_eq!(handle.count("start_stream"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failure_during_stream_start_is_retried() {
        for _ in 0..20 {
            let (events_tx, events_rx) = engine_event_channel();
            let (engine, handle) = FakeEngine::with_events(events_tx);
            let coordinator = Arc::new(SessionCoordinator::new(
                Box::new(engine),
                SurfaceReadinessTracker::new(),
                CoordinatorOptions::default(),
            ));
            let (ui_tx, mut ui_rx) = ui_event_channel();
            let task = ConnectionMonitor::new(
                coordinator.clone(),
                ConnectionRetryPolicy::new(5, Duration::from_millis(5)),
                ui_tx,
            )
            .spawn(events_rx);

            let config =
                SessionConfig::new(640, 480, 1_200_000, 0, 32_000, true, 128_000).unwrap();
            coordinator.reconfigure(config).await.unwrap();
            handle.state.lock().fail_connects = 1;
            coordinator
                .request_start(StartTarget::Stream("rtmp://localhost/live".to_string()))
                .await
                .unwrap();

            tokio::time::timeout(Duration::from_secs(1), async {
                while handle.count("start_stream") < 2 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("scheduled retry never reached the engine");
            assert!(coordinator.state().streaming);
            assert!(drain(&mut ui_rx).contains(&UiEvent::Notice(Notice::transient("Retry"))));

            coordinator.teardown().await;
            tokio::time::timeout(Duration::from_secs(1), task)
                .await
                .unwrap()
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_run_forwards_events_and_stops_on_release() {
        let (events_tx, events_rx) = engine_event_channel();
        let (engine, _handle) = FakeEngine::with_events(events_tx.clone());
        let coordinator = Arc::new(SessionCoordinator::new(
            Box::new(engine),
            SurfaceReadinessTracker::new(),
            CoordinatorOptions::default(),
        ));
        let (ui_tx, mut ui_rx) = ui_event_channel();
        let task = ConnectionMonitor::new(
            coordinator.clone(),
            ConnectionRetryPolicy::default(),
            ui_tx,
        )
        .spawn(events_rx);

        let config = SessionConfig::new(640, 480, 1_200_000, 0, 32_000, true, 128_000).unwrap();
        coordinator.reconfigure(config).await.unwrap();
        coordinator
            .request_start(StartTarget::Record(PathBuf::from("/tmp/out.mp4")))
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), ui_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, UiEvent::RecordStatus(RecordStatus::Started));

        coordinator.teardown().await;
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
