//! Reconnecting telemetry client
//!
//! A single worker task owns the connection. It connects, reads frames
//! until the feed ends or fails, waits a fixed delay and connects again.
//! Every await point also watches the shutdown signal, so teardown cancels
//! a pending reconnect and closes an open connection.

use crate::alert::{AlertDispatcher, AlertPolicy, AlertRaiser, AlertSink};
use crate::buffer::EventBuffer;
use crate::config::TelemetryConfig;
use crate::message::{parse_message, TelemetryMessage};
use crate::source::{FrameStream, TelemetrySource};
use crate::state::{ConnectionEvent, ConnectionState, ConnectionStateMachine};
use eza_types::{EzaError, PipelineHealth, TelemetryEvent};
use futures_util::StreamExt;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// State shared between the worker and the handle.
#[derive(Debug)]
struct Shared {
    buffer: RwLock<EventBuffer>,
    health: RwLock<Option<PipelineHealth>>,
    dropped: AtomicU64,
}

/// Builder for a running telemetry feed.
pub struct TelemetryClient {
    config: TelemetryConfig,
    source: Arc<dyn TelemetrySource>,
    alert_sink: Option<Arc<dyn AlertSink>>,
}

impl TelemetryClient {
    pub fn new(config: TelemetryConfig, source: Arc<dyn TelemetrySource>) -> Self {
        Self {
            config,
            source,
            alert_sink: None,
        }
    }

    /// Deliver alerts to `sink`. Alerts are only raised when
    /// `alerts_enabled` is also set.
    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = Some(sink);
        self
    }

    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn start(self) -> TelemetryHandle {
        let shared = Arc::new(Shared {
            buffer: RwLock::new(EventBuffer::new(self.config.effective_capacity())),
            health: RwLock::new(None),
            dropped: AtomicU64::new(0),
        });
        let (state_tx, state_rx) = watch::channel(ConnectionStateMachine::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let dispatcher = self
            .alert_sink
            .filter(|_| self.config.alerts_enabled)
            .map(|sink| AlertDispatcher::spawn(sink, self.config.alert_queue));

        let worker = Worker {
            policy: AlertPolicy {
                enabled: dispatcher.is_some(),
                threshold: self.config.alert_threshold,
            },
            alerts: dispatcher.as_ref().map(AlertDispatcher::raiser),
            config: self.config,
            source: self.source,
            shared: shared.clone(),
            machine: ConnectionStateMachine::new(),
            state_tx,
            events: events_tx.clone(),
            shutdown: shutdown_rx,
        };

        TelemetryHandle {
            shared,
            state: state_rx,
            events: events_tx,
            shutdown: shutdown_tx,
            worker: Some(tokio::spawn(worker.run())),
            alerts: dispatcher,
        }
    }
}

/// Handle to a running telemetry feed.
///
/// Dropping the handle aborts the worker; [`TelemetryHandle::shutdown`]
/// stops it cleanly.
pub struct TelemetryHandle {
    shared: Arc<Shared>,
    state: watch::Receiver<ConnectionStateMachine>,
    events: broadcast::Sender<TelemetryEvent>,
    shutdown: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
    alerts: Option<AlertDispatcher>,
}

impl TelemetryHandle {
    /// Buffered events, newest first.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.shared.buffer.read().snapshot()
    }

    pub fn latest_event(&self) -> Option<TelemetryEvent> {
        self.shared.buffer.read().latest().cloned()
    }

    pub fn latest_health(&self) -> Option<PipelineHealth> {
        self.shared.health.read().clone()
    }

    pub fn connection(&self) -> ConnectionStateMachine {
        self.state.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.borrow().state()
    }

    /// Watch connection state changes.
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionStateMachine> {
        self.state.clone()
    }

    /// Receive events as they arrive. Slow receivers lag rather than
    /// holding up the feed.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.events.subscribe()
    }

    /// Messages dropped because they could not be parsed.
    pub fn dropped_messages(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Stop the feed: cancels any pending reconnect, closes the open
    /// connection and drains queued alerts.
    pub async fn shutdown(mut self) {
        self.shutdown.send_replace(true);
        if let Some(mut worker) = self.worker.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut worker).await.is_err() {
                warn!("Telemetry worker did not stop in time, aborting");
                worker.abort();
            }
        }
        if let Some(alerts) = self.alerts.take() {
            alerts.close(SHUTDOWN_GRACE).await;
        }
    }
}

impl Drop for TelemetryHandle {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        if let Some(alerts) = self.alerts.take() {
            alerts.abort();
        }
    }
}

struct Worker {
    config: TelemetryConfig,
    source: Arc<dyn TelemetrySource>,
    shared: Arc<Shared>,
    machine: ConnectionStateMachine,
    state_tx: watch::Sender<ConnectionStateMachine>,
    events: broadcast::Sender<TelemetryEvent>,
    alerts: Option<AlertRaiser>,
    policy: AlertPolicy,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        info!(url = %self.config.stream_url, "Telemetry client started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            self.transition(ConnectionEvent::Connect);
            let connected = tokio::select! {
                _ = self.shutdown.changed() => break,
                result = self.source.connect() => result,
            };

            match connected {
                Ok(stream) => {
                    self.transition(ConnectionEvent::Opened);
                    match self.consume(stream).await {
                        Some(reason) => {
                            warn!(reason = %reason, "Telemetry connection lost");
                            self.transition(ConnectionEvent::Lost(reason));
                        }
                        None => break,
                    }
                }
                Err(err) => {
                    warn!(error = %err, attempts = self.machine.attempts(), "Telemetry connect failed");
                    self.transition(ConnectionEvent::ConnectFailed(err.to_string()));
                }
            }

            let delay = self.config.reconnect_delay();
            debug!(delay_ms = delay.as_millis() as u64, "Reconnecting telemetry feed");
            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.transition(ConnectionEvent::Teardown);
        info!("Telemetry client stopped");
    }

    /// Read frames until the connection ends. Returns the reason it
    /// ended, or `None` on shutdown.
    async fn consume(&mut self, mut stream: FrameStream) -> Option<String> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.changed() => return None,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(frame)) => self.handle(&frame),
                Some(Err(EzaError::ParseFailure(reason))) => self.drop_message(&reason),
                Some(Err(err)) => return Some(err.to_string()),
                None => return Some("event feed closed".to_string()),
            }
        }
    }

    fn handle(&self, frame: &Value) {
        match parse_message(frame) {
            Ok(TelemetryMessage::Event(event)) => {
                let alert = self.policy.evaluate(&event);
                trace!(event_id = %event.id, "Telemetry event");
                self.shared.buffer.write().push(event.clone());
                // No subscribers is fine.
                let _ = self.events.send(event);
                if let (Some(raiser), Some(alert)) = (&self.alerts, alert) {
                    raiser.raise(alert);
                }
            }
            Ok(TelemetryMessage::Health(health)) => {
                debug!(status = ?health.status, "Pipeline health update");
                *self.shared.health.write() = Some(health);
            }
            Ok(TelemetryMessage::Heartbeat) => trace!("Telemetry heartbeat"),
            Err(err) => self.drop_message(&err.to_string()),
        }
    }

    fn drop_message(&self, reason: &str) {
        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        warn!(reason = %reason, "Dropping unreadable telemetry message");
    }

    fn transition(&mut self, event: ConnectionEvent) {
        match self.machine.apply(event) {
            Ok(state) => {
                debug!(state = %state, attempts = self.machine.attempts(), "Telemetry connection state");
                self.state_tx.send_replace(self.machine.clone());
            }
            Err(err) => warn!(error = %err, "Ignoring connection transition"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertReason, MemoryAlertSink};
    use async_trait::async_trait;
    use eza_types::{EzaResult, PipelineStatus};
    use futures_util::stream;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::Instant;

    enum Connection {
        Refuse,
        Frames {
            frames: Vec<EzaResult<Value>>,
            hold_open: bool,
        },
    }

    struct ScriptedSource {
        script: Mutex<VecDeque<Connection>>,
        connects: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Connection>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                connects: AtomicUsize::new(0),
            })
        }

        fn connects(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TelemetrySource for ScriptedSource {
        async fn connect(&self) -> EzaResult<FrameStream> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().pop_front() {
                Some(Connection::Frames { frames, hold_open }) => {
                    let frames = stream::iter(frames);
                    if hold_open {
                        Ok(frames.chain(stream::pending()).boxed())
                    } else {
                        Ok(frames.boxed())
                    }
                }
                Some(Connection::Refuse) | None => {
                    Err(EzaError::TransportFailure("connection refused".into()))
                }
            }
        }
    }

    fn event(id: &str, risk: f64, fail_safe: bool) -> EzaResult<Value> {
        Ok(json!({"id": id, "risk_score": risk, "fail_safe_triggered": fail_safe}))
    }

    fn config(alerts_enabled: bool) -> TelemetryConfig {
        TelemetryConfig {
            alerts_enabled,
            ..TelemetryConfig::default()
        }
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..20_000 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_safe_event_raises_one_alert() {
        let source = ScriptedSource::new(vec![Connection::Frames {
            frames: vec![
                event("evt-1", 0.95, true),
                Ok(json!({"type": "heartbeat"})),
            ],
            hold_open: true,
        }]);
        let sink = Arc::new(MemoryAlertSink::new());
        let handle = TelemetryClient::new(config(true), source.clone())
            .with_alert_sink(sink.clone())
            .start();

        wait_for(|| sink.count() == 1).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(sink.count(), 1);
        assert_eq!(sink.alerts()[0].reason, AlertReason::FailSafe);
        let events = handle.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "evt-1");
        assert_eq!(handle.connection_state(), ConnectionState::Connected);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_alerts_need_explicit_opt_in() {
        let source = ScriptedSource::new(vec![Connection::Frames {
            frames: vec![event("evt-1", 0.99, true)],
            hold_open: true,
        }]);
        let sink = Arc::new(MemoryAlertSink::new());
        let handle = TelemetryClient::new(config(false), source)
            .with_alert_sink(sink.clone())
            .start();

        wait_for(|| handle.events().len() == 1).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.count(), 0);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_messages_are_dropped() {
        let source = ScriptedSource::new(vec![Connection::Frames {
            frames: vec![
                Err(EzaError::ParseFailure("bad json".into())),
                Ok(json!([1, 2])),
                Ok(json!({"risk_score": 0.2})),
                event("evt-1", 0.1, false),
                Ok(json!({"type": "pipeline_health", "status": "down"})),
            ],
            hold_open: true,
        }]);
        let handle = TelemetryClient::new(config(false), source).start();

        wait_for(|| handle.latest_health().is_some()).await;
        assert_eq!(handle.dropped_messages(), 3);
        assert_eq!(handle.events().len(), 1);
        assert_eq!(
            handle.latest_health().map(|h| h.status),
            Some(PipelineStatus::Down)
        );
        assert_eq!(handle.connection_state(), ConnectionState::Connected);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_fixed_delay() {
        let source = ScriptedSource::new(vec![
            Connection::Refuse,
            Connection::Frames {
                frames: vec![event("evt-1", 0.3, false)],
                hold_open: false,
            },
            Connection::Frames {
                frames: Vec::new(),
                hold_open: true,
            },
        ]);
        let started = Instant::now();
        let handle = TelemetryClient::new(config(false), source.clone()).start();

        wait_for(|| source.connects() == 1).await;
        wait_for(|| handle.connection().last_error().is_some()).await;
        assert_eq!(handle.connection_state(), ConnectionState::Disconnected);
        assert_eq!(handle.connection().attempts(), 1);

        wait_for(|| source.connects() == 2).await;
        assert!(started.elapsed() >= Duration::from_millis(3_000));

        // Second connection closes after one event; the third stays open.
        wait_for(|| source.connects() == 3).await;
        assert!(started.elapsed() >= Duration::from_millis(6_000));
        wait_for(|| handle.connection_state() == ConnectionState::Connected).await;
        assert_eq!(handle.connection().connections(), 2);
        assert_eq!(handle.events().len(), 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_reconnect() {
        let source = ScriptedSource::new(vec![Connection::Refuse]);
        let handle = TelemetryClient::new(config(false), source.clone()).start();
        let mut states = handle.watch_connection();

        wait_for(|| source.connects() == 1).await;
        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(source.connects(), 1);
        assert_eq!(
            states.borrow_and_update().state(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_reconnecting() {
        let source = ScriptedSource::new(Vec::new());
        let handle = TelemetryClient::new(config(false), source.clone()).start();

        wait_for(|| source.connects() == 1).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffer_keeps_newest_events() {
        let frames = (0..30)
            .map(|i| event(&format!("evt-{i}"), 0.1, false))
            .collect();
        let source = ScriptedSource::new(vec![Connection::Frames {
            frames,
            hold_open: true,
        }]);
        let mut config = config(false);
        config.buffer_capacity = 20;
        let handle = TelemetryClient::new(config, source).start();
        let mut live = handle.subscribe();

        wait_for(|| handle.latest_event().is_some_and(|e| e.id == "evt-29")).await;
        let events = handle.events();
        assert_eq!(events.len(), 20);
        assert_eq!(events[0].id, "evt-29");
        assert_eq!(events[19].id, "evt-10");
        assert!(live.try_recv().is_ok());
        handle.shutdown().await;
    }
}
