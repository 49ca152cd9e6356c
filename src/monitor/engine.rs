use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    collect::{Collector, CollectorHandle, EventSink},
    db::settings::{PersistedState, SettingsRepository},
    detect::{fingerprint, policy, scorer, DedupLedger, DetectionHistory},
    domain::{ConfigPatch, DetectionEvent, MonitoringConfig, ScoredDetection},
    infrastructure::shutdown::ShutdownListener,
    monitor::dispatch::Dispatcher,
};

struct MonitorState {
    active: bool,
    config: MonitoringConfig,
    ledger: DedupLedger,
    history: DetectionHistory,
}

/// The detection pipeline orchestrator. Owns the monitoring state machine
/// (Stopped ↔ Active), the dedup ledger, and the detection history; wires
/// collectors → dedup → scorer → threshold gate → history → dispatcher.
pub struct ContentMonitor {
    state: Mutex<MonitorState>,
    collectors: Vec<Arc<dyn Collector>>,
    handles: Mutex<Vec<CollectorHandle>>,
    sink: EventSink,
    dispatcher: Dispatcher,
    settings: Arc<SettingsRepository>,
    id_seq: AtomicU64,
}

impl ContentMonitor {
    pub fn new(
        config: MonitoringConfig,
        collectors: Vec<Arc<dyn Collector>>,
        sink: EventSink,
        settings: Arc<SettingsRepository>,
        dispatcher: Dispatcher,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MonitorState {
                active: false,
                config,
                ledger: DedupLedger::new(),
                history: DetectionHistory::new(),
            }),
            collectors,
            handles: Mutex::new(Vec::new()),
            sink,
            dispatcher,
            settings,
            id_seq: AtomicU64::new(0),
        })
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    pub fn config(&self) -> MonitoringConfig {
        self.state.lock().config.clone()
    }

    pub fn history(&self, limit: usize) -> Vec<ScoredDetection> {
        self.state.lock().history.recent(limit)
    }

    pub fn subscribe_notices(&self) -> tokio::sync::broadcast::Receiver<crate::messaging::ContextNotice> {
        self.dispatcher.subscribe()
    }

    /// Stopped → Active. Idempotent: calling while already active is a
    /// no-op. Attaches every collector whose channel is enabled; the DOM
    /// collector runs its backfill scan as part of attaching.
    pub async fn start(&self) {
        let config = {
            let mut state = self.state.lock();
            if state.active {
                tracing::debug!(target: "monitor", "start ignored; already active");
                return;
            }
            state.active = true;
            state.config.enabled = true;
            state.config.clone()
        };

        self.persist().await;

        let shared = Arc::new(config.clone());
        {
            let mut handles = self.handles.lock();
            for collector in &self.collectors {
                if !config.enabled_sources.contains(&collector.kind()) {
                    continue;
                }
                handles.push(collector.attach(self.sink.clone(), shared.clone()));
                tracing::info!(
                    target: "monitor",
                    source = ?collector.kind(),
                    "collector attached"
                );
            }
        }

        tracing::info!(target: "monitor", "monitoring started");
        self.dispatcher.monitoring_toggled(true);
    }

    /// Active → Stopped, as an explicit user action. Every collector handle
    /// is detached before this returns; a tick that was already scheduled
    /// can no longer produce a detection because the Active gate is down.
    /// Persists `is_monitoring = false` so the choice survives a restart.
    pub async fn stop(&self) {
        let Some(detached) = self.deactivate() else {
            tracing::debug!(target: "monitor", "stop ignored; not active");
            return;
        };
        self.state.lock().config.enabled = false;

        self.persist().await;

        tracing::info!(target: "monitor", collectors = detached, "monitoring stopped");
        self.dispatcher.monitoring_toggled(false);
    }

    /// Process-teardown variant of [`ContentMonitor::stop`]: detaches the
    /// collectors and closes the Active gate without touching persisted
    /// state, so the next run resumes monitoring if the user had it on.
    pub fn halt(&self) {
        let Some(detached) = self.deactivate() else {
            return;
        };
        tracing::info!(target: "monitor", collectors = detached, "monitoring halted for shutdown");
    }

    fn deactivate(&self) -> Option<usize> {
        {
            let mut state = self.state.lock();
            if !state.active {
                return None;
            }
            state.active = false;
        }

        let mut handles = self.handles.lock();
        let drained: Vec<_> = handles.drain(..).collect();
        for handle in &drained {
            handle.detach();
        }
        Some(drained.len())
    }

    pub async fn set_enabled(&self, enabled: bool) {
        if enabled {
            self.start().await;
        } else {
            self.stop().await;
        }
    }

    /// Shallow-merges a partial config and persists the result. Detections
    /// already in history are never rescored; collectors keep the gating
    /// config they captured at attach time until the next start.
    pub async fn update_config(&self, patch: ConfigPatch) {
        {
            let mut state = self.state.lock();
            state.config.apply(patch);
        }
        self.persist().await;
        tracing::info!(target: "monitor", "configuration updated");
    }

    /// Runs one raw event through the pipeline. Dedup marking happens
    /// regardless of the threshold outcome, so identical low-value content
    /// is never rescored while it stays in the ledger.
    pub fn ingest(&self, event: DetectionEvent) {
        if let Err(err) = event.validate() {
            tracing::debug!(target: "monitor", error = %err, "rejected malformed event");
            return;
        }

        let accepted = {
            let mut state = self.state.lock();
            if !state.active {
                return;
            }

            let print = fingerprint(&event.payload);
            if !state.ledger.should_process(&print) {
                tracing::trace!(target: "monitor", "duplicate content skipped");
                return;
            }
            state.ledger.record(print);

            let confidence = scorer::score(&event, &state.config);
            let bar = policy::threshold(state.config.sensitivity);
            if confidence < bar {
                tracing::debug!(
                    target: "monitor",
                    confidence,
                    bar,
                    source = ?event.source,
                    "below sensitivity threshold"
                );
                return;
            }

            let scored = ScoredDetection::new(self.next_id(), event, confidence);
            state.history.push(scored.clone());
            scored
        };

        tracing::info!(
            target: "monitor",
            id = %accepted.id,
            confidence = accepted.confidence,
            source = ?accepted.event.source,
            "detection recorded"
        );
        self.dispatcher.dispatch(&accepted);
    }

    /// Forwards collector events into the pipeline until shutdown.
    pub fn spawn_pump(
        self: Arc<Self>,
        mut events: mpsc::Receiver<DetectionEvent>,
        mut shutdown: ShutdownListener,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.notified() => break,
                    maybe = events.recv() => match maybe {
                        Some(event) => self.ingest(event),
                        None => break,
                    },
                }
            }
            tracing::info!(target: "monitor", "event pump stopped");
        })
    }

    /// Unique within a millisecond: epoch millis plus a process-wide
    /// sequence suffix.
    fn next_id(&self) -> String {
        format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            self.id_seq.fetch_add(1, Ordering::Relaxed)
        )
    }

    /// Best-effort persistence: a failed write is logged and the in-memory
    /// state stays authoritative (stale-on-disk beats stopping monitoring).
    async fn persist(&self) {
        let snapshot = {
            let state = self.state.lock();
            PersistedState {
                config: state.config.clone(),
                is_monitoring: state.active,
            }
        };
        if let Err(err) = self.settings.save(&snapshot).await {
            tracing::warn!(target: "db", error = %err, "failed to persist monitoring state");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::{
        db,
        detect::history::HISTORY_CAP,
        domain::{CollectorKind, EventKind, Sensitivity, SourceChannel},
        messaging::ContextNotice,
    };

    struct CountingCollector {
        kind: CollectorKind,
        attaches: Arc<AtomicUsize>,
    }

    impl Collector for CountingCollector {
        fn kind(&self) -> CollectorKind {
            self.kind
        }

        fn attach(&self, _sink: EventSink, _config: Arc<MonitoringConfig>) -> CollectorHandle {
            self.attaches.fetch_add(1, Ordering::SeqCst);
            CollectorHandle::new(self.kind, tokio::spawn(async {}))
        }
    }

    async fn monitor_with(
        config: MonitoringConfig,
        collectors: Vec<Arc<dyn Collector>>,
    ) -> Arc<ContentMonitor> {
        let settings = Arc::new(SettingsRepository::new(db::memory_pool().await));
        let (sink, _rx) = mpsc::channel(16);
        ContentMonitor::new(config, collectors, sink, settings, Dispatcher::new(32))
    }

    fn clipboard_text(payload: &str) -> DetectionEvent {
        DetectionEvent::new(EventKind::Text, payload, SourceChannel::Clipboard)
    }

    #[tokio::test]
    async fn boundary_score_is_recorded_but_not_popped() {
        let monitor = monitor_with(MonitoringConfig::default(), Vec::new()).await;
        monitor.start().await;
        let mut notices = monitor.subscribe_notices();

        monitor.ingest(clipboard_text("I love this Sephora serum review"));

        let history = monitor.history(10);
        assert_eq!(history.len(), 1);
        assert!((history[0].confidence - 0.6).abs() < 1e-9);
        assert!(matches!(
            notices.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn high_confidence_detection_pops() {
        let monitor = monitor_with(MonitoringConfig::default(), Vec::new()).await;
        monitor.start().await;
        let mut notices = monitor.subscribe_notices();

        monitor.ingest(clipboard_text(
            "sephora and fenty beauty serum review roundup",
        ));

        match notices.try_recv() {
            Ok(ContextNotice::ShowPopup(detection)) => {
                assert!(detection.confidence > 0.6);
            }
            other => panic!("expected ShowPopup, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicates_are_scored_once() {
        let monitor = monitor_with(MonitoringConfig::default(), Vec::new()).await;
        monitor.start().await;

        monitor.ingest(clipboard_text("I love this Sephora serum review"));
        monitor.ingest(clipboard_text("I love this Sephora serum review"));

        assert_eq!(monitor.history(10).len(), 1);
    }

    #[tokio::test]
    async fn low_sensitivity_rejects_but_still_marks_the_ledger() {
        let mut config = MonitoringConfig::default();
        config.sensitivity = Sensitivity::Low;
        let monitor = monitor_with(config, Vec::new()).await;
        monitor.start().await;

        monitor.ingest(clipboard_text("I love this Sephora serum review"));
        assert!(monitor.history(10).is_empty());

        // Raising the sensitivity afterwards must not resurface the same
        // content: the ledger marked it on first sight.
        monitor
            .update_config(ConfigPatch {
                sensitivity: Some(Sensitivity::High),
                ..Default::default()
            })
            .await;
        monitor.ingest(clipboard_text("I love this Sephora serum review"));
        assert!(monitor.history(10).is_empty());
    }

    #[tokio::test]
    async fn navigation_bonus_alone_is_rejected_under_medium() {
        let monitor = monitor_with(MonitoringConfig::default(), Vec::new()).await;
        monitor.start().await;

        monitor.ingest(DetectionEvent::new(
            EventKind::Url,
            "https://www.dermstore.com/brands",
            SourceChannel::Navigation,
        ));
        assert!(monitor.history(10).is_empty());
    }

    #[tokio::test]
    async fn history_holds_the_last_hundred() {
        let monitor = monitor_with(MonitoringConfig::default(), Vec::new()).await;
        monitor.start().await;

        for i in 1..=HISTORY_CAP + 1 {
            monitor.ingest(clipboard_text(&format!("sephora serum review no {i}")));
        }

        let history = monitor.history(HISTORY_CAP + 10);
        assert_eq!(history.len(), HISTORY_CAP);
        assert!(history[0].event.payload.ends_with("no 101"));
        assert!(history
            .iter()
            .all(|d| !d.event.payload.ends_with(" no 1")));
    }

    #[tokio::test]
    async fn events_after_stop_are_dropped() {
        let monitor = monitor_with(MonitoringConfig::default(), Vec::new()).await;
        monitor.start().await;
        monitor.ingest(clipboard_text("I love this Sephora serum review"));
        assert_eq!(monitor.history(10).len(), 1);

        monitor.stop().await;
        monitor.ingest(clipboard_text("another glossier lipstick review post"));
        assert_eq!(monitor.history(10).len(), 1);
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_detaches() {
        let attaches = Arc::new(AtomicUsize::new(0));
        let collector: Arc<dyn Collector> = Arc::new(CountingCollector {
            kind: CollectorKind::Dom,
            attaches: attaches.clone(),
        });
        let monitor = monitor_with(MonitoringConfig::default(), vec![collector]).await;

        monitor.start().await;
        monitor.start().await;
        assert_eq!(attaches.load(Ordering::SeqCst), 1);
        assert!(monitor.is_active());

        monitor.stop().await;
        assert!(!monitor.is_active());

        monitor.start().await;
        assert_eq!(attaches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_sources_are_not_attached() {
        let attaches = Arc::new(AtomicUsize::new(0));
        let collector: Arc<dyn Collector> = Arc::new(CountingCollector {
            kind: CollectorKind::Clipboard,
            attaches: attaches.clone(),
        });
        let mut config = MonitoringConfig::default();
        config.enabled_sources.remove(&CollectorKind::Clipboard);
        let monitor = monitor_with(config, vec![collector]).await;

        monitor.start().await;
        assert_eq!(attaches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn state_transitions_are_persisted() {
        let settings = Arc::new(SettingsRepository::new(db::memory_pool().await));
        let (sink, _rx) = mpsc::channel(16);
        let monitor = ContentMonitor::new(
            MonitoringConfig::default(),
            Vec::new(),
            sink,
            settings.clone(),
            Dispatcher::new(8),
        );

        monitor.start().await;
        let stored = settings.load().await.unwrap().expect("state saved");
        assert!(stored.is_monitoring);

        monitor
            .update_config(ConfigPatch {
                sensitivity: Some(Sensitivity::Low),
                ..Default::default()
            })
            .await;
        let stored = settings.load().await.unwrap().expect("state saved");
        assert_eq!(stored.config.sensitivity, Sensitivity::Low);

        monitor.stop().await;
        let stored = settings.load().await.unwrap().expect("state saved");
        assert!(!stored.is_monitoring);
    }

    #[tokio::test]
    async fn halt_keeps_persisted_monitoring_on_for_the_next_run() {
        let attaches = Arc::new(AtomicUsize::new(0));
        let collector: Arc<dyn Collector> = Arc::new(CountingCollector {
            kind: CollectorKind::Dom,
            attaches: attaches.clone(),
        });
        let settings = Arc::new(SettingsRepository::new(db::memory_pool().await));
        let (sink, _rx) = mpsc::channel(16);
        let monitor = ContentMonitor::new(
            MonitoringConfig::default(),
            vec![collector],
            sink,
            settings.clone(),
            Dispatcher::new(8),
        );

        monitor.start().await;
        monitor.halt();

        assert!(!monitor.is_active());
        monitor.ingest(clipboard_text("I love this Sephora serum review"));
        assert!(monitor.history(10).is_empty());

        let stored = settings.load().await.unwrap().expect("state saved");
        assert!(
            stored.is_monitoring,
            "graceful shutdown must not flip the persisted monitoring flag"
        );
        assert!(stored.config.enabled);
    }
}
