use std::{sync::Arc, time::Duration};

use anyhow::Result;
use reqwest::Client;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::timeout,
};

use crate::{
    ai::ProductAnalyst,
    collect::{
        ClipboardCollector, Collector, DomCollector, DomSnapshot, FileClipboard,
        NavigationCollector, PageScanner, UnavailableClipboard,
    },
    config::AppConfig,
    db::{self, settings::SettingsRepository},
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    messaging::{self, BusClient, ContextNotice, Router},
    monitor::{ContentMonitor, Dispatcher},
    page_content::PageContentFetcher,
};

const EVENT_QUEUE_CAPACITY: usize = 256;
const NOTICE_FEED_CAPACITY: usize = 32;
const DOM_FEED_CAPACITY: usize = 64;
const VISIT_FEED_CAPACITY: usize = 32;
const BUS_CAPACITY: usize = 64;

pub struct RadarApp {
    _paths: ResolvedPaths,
    monitor: Arc<ContentMonitor>,
    settings: Arc<SettingsRepository>,
    pump_handle: JoinHandle<()>,
    router_handle: JoinHandle<()>,
    popup_handle: JoinHandle<()>,
    _bus: BusClient,
    visits: broadcast::Sender<String>,
    shutdown: Shutdown,
    resume_monitoring: bool,
}

impl RadarApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let pool = db::init_pool(&paths.db_path).await?;
        let settings = Arc::new(SettingsRepository::new(pool));

        let persisted = settings.load().await?.unwrap_or_default();
        let monitoring_config = persisted.config.clone();

        let http_client = Client::builder()
            .user_agent(format!("beauty-radar/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let analyst = Arc::new(ProductAnalyst::new(
            http_client.clone(),
            config.analyst.clone(),
        ));

        let (dom_feed, _) = broadcast::channel(DOM_FEED_CAPACITY);
        let (visits, _) = broadcast::channel(VISIT_FEED_CAPACITY);

        let scanner = if config.page.enabled {
            Some(Arc::new(PageScanner::new(
                PageContentFetcher::new(http_client, config.page.clone()),
                dom_feed.clone(),
            )))
        } else {
            None
        };

        // With no live DOM behind this process, the backfill snapshot is
        // empty; page scans feed the DOM channel instead.
        let snapshot: DomSnapshot = Arc::new(Vec::new);

        let collectors: Vec<Arc<dyn Collector>> = vec![
            Arc::new(ClipboardCollector::new(
                clipboard_source(&config),
                config.collect.clipboard_poll_interval,
            )),
            Arc::new(DomCollector::new(dom_feed, snapshot)),
            Arc::new(NavigationCollector::new(visits.clone(), scanner)),
        ];

        let (sink, events) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let dispatcher = Dispatcher::new(NOTICE_FEED_CAPACITY);
        let notices = dispatcher.subscribe();

        let monitor = ContentMonitor::new(
            monitoring_config,
            collectors,
            sink,
            settings.clone(),
            dispatcher,
        );

        let pump_handle = monitor.clone().spawn_pump(events, shutdown.subscribe());
        let popup_handle = spawn_popup_surface(notices, shutdown.subscribe());

        let (bus, envelopes) = messaging::channel(BUS_CAPACITY);
        let router_handle =
            Router::new(monitor.clone(), analyst).spawn(envelopes, shutdown.subscribe());

        Ok(Self {
            _paths: paths,
            monitor,
            settings,
            pump_handle,
            router_handle,
            popup_handle,
            _bus: bus,
            visits,
            shutdown,
            resume_monitoring: persisted.is_monitoring,
        })
    }

    pub async fn run(self) -> Result<()> {
        let RadarApp {
            _paths: _,
            monitor,
            settings,
            pump_handle,
            router_handle,
            popup_handle,
            _bus: _bus_client,
            visits,
            shutdown,
            resume_monitoring,
        } = self;

        tracing::info!("beauty content radar starting");

        if resume_monitoring {
            tracing::info!("resuming monitoring from persisted state");
            monitor.start().await;
        }

        let stdin_handle = spawn_visit_feed(visits, shutdown.subscribe());

        let mut shutdown_listener = shutdown.subscribe();
        shutdown_listener.notified().await;
        tracing::info!("shutdown signal received");

        shutdown.trigger();
        // halt, not stop: persisted is_monitoring must survive a restart
        monitor.halt();

        let shutdown_timeout = Duration::from_secs(5);
        for (name, handle) in [
            ("event pump", pump_handle),
            ("router", router_handle),
            ("popup surface", popup_handle),
        ] {
            await_task(name, handle, shutdown_timeout).await;
        }
        stdin_handle.abort();

        if timeout(shutdown_timeout, settings.close()).await.is_err() {
            tracing::warn!(
                target: "db",
                "settings pool did not close within {:?}",
                shutdown_timeout
            );
        }

        tracing::info!("beauty content radar stopped");
        Ok(())
    }
}

fn clipboard_source(config: &AppConfig) -> Arc<dyn crate::collect::ClipboardSource> {
    match &config.collect.clipboard_bridge_file {
        Some(path) => Arc::new(FileClipboard::new(path.into())),
        None => {
            tracing::warn!(
                target: "collect",
                "no clipboard bridge file configured; clipboard channel will be idle"
            );
            Arc::new(UnavailableClipboard)
        }
    }
}

/// Operator-facing popup surface. Logs each popup-worthy detection and
/// monitoring toggle so a headless deployment still has a visible bar.
fn spawn_popup_surface(
    mut notices: broadcast::Receiver<ContextNotice>,
    mut shutdown: crate::infrastructure::ShutdownListener,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                notice = notices.recv() => match notice {
                    Ok(ContextNotice::ShowPopup(detection)) => {
                        tracing::info!(
                            target: "popup",
                            id = %detection.id,
                            confidence = detection.confidence,
                            source = ?detection.event.source,
                            payload = %detection.event.payload,
                            "beauty content detected"
                        );
                    }
                    Ok(ContextNotice::MonitoringToggled { enabled }) => {
                        tracing::info!(target: "popup", enabled, "monitoring toggled");
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::debug!(target: "popup", missed, "notice feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    })
}

/// Feeds URLs typed on stdin into the navigation medium, one visit per
/// line. Blank lines are ignored.
fn spawn_visit_feed(
    visits: broadcast::Sender<String>,
    mut shutdown: crate::infrastructure::ShutdownListener,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        let url = line.trim();
                        if url.is_empty() {
                            continue;
                        }
                        if visits.send(url.to_string()).is_err() {
                            tracing::debug!(target: "collect", "no navigation subscribers");
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::debug!(target: "collect", error = %err, "stdin read failed");
                        break;
                    }
                },
            }
        }
    })
}

async fn await_task(name: &str, handle: JoinHandle<()>, wait: Duration) {
    match timeout(wait, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) if err.is_panic() => {
            tracing::error!(target: "lifecycle", task = name, "task ended in a panic");
        }
        Ok(Err(_)) => {}
        Err(_) => {
            tracing::warn!(
                target: "lifecycle",
                task = name,
                "task did not stop within {:?}",
                wait
            );
        }
    }
}
