use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
    collect::{dom::DomContent, Collector, CollectorHandle, EventSink},
    domain::{CollectorKind, DetectionEvent, EventKind, MonitoringConfig, SourceChannel},
    page_content::PageContentFetcher,
};

/// Scans the content of a visited page and replays it into the DOM feed,
/// so page text and product images go through the same DOM screening as
/// live mutations would.
pub struct PageScanner {
    fetcher: PageContentFetcher,
    dom_feed: broadcast::Sender<DomContent>,
}

impl PageScanner {
    pub fn new(fetcher: PageContentFetcher, dom_feed: broadcast::Sender<DomContent>) -> Self {
        Self { fetcher, dom_feed }
    }

    async fn scan(&self, url: &str) {
        let page = match self.fetcher.fetch(url).await {
            Ok(Some(page)) => page,
            Ok(None) => return,
            Err(err) => {
                tracing::debug!(target: "page", error = %err, url, "page scan skipped");
                return;
            }
        };

        if let Some(text) = page.text {
            let _ = self.dom_feed.send(DomContent::Text(text));
        }
        for image in page.images {
            let _ = self.dom_feed.send(DomContent::Image {
                src: image.src,
                alt: image.alt,
                class: image.class,
            });
        }
    }
}

/// Observer of committed page loads. Emits a `url` event once per visited
/// URL whose domain matches the beauty allow-list, skipping excluded sites.
pub struct NavigationCollector {
    visits: broadcast::Sender<String>,
    scanner: Option<Arc<PageScanner>>,
}

impl NavigationCollector {
    pub fn new(visits: broadcast::Sender<String>, scanner: Option<Arc<PageScanner>>) -> Self {
        Self { visits, scanner }
    }
}

impl Collector for NavigationCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Navigation
    }

    fn attach(&self, sink: EventSink, config: Arc<MonitoringConfig>) -> CollectorHandle {
        let mut visits = self.visits.subscribe();
        let scanner = self.scanner.clone();
        let task = tokio::spawn(async move {
            loop {
                let url = match visits.recv().await {
                    Ok(url) => url,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::debug!(target: "collect", missed, "navigation feed lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                if config.is_excluded(&url) || !config.is_beauty_domain(&url) {
                    continue;
                }

                let event =
                    DetectionEvent::new(EventKind::Url, url.clone(), SourceChannel::Navigation);
                if sink.send(event).await.is_err() {
                    break;
                }

                // Scan off the loop; a slow fetch must not stall gating of
                // the visits behind it.
                if let Some(scanner) = &scanner {
                    let scanner = scanner.clone();
                    tokio::spawn(async move {
                        scanner.scan(&url).await;
                    });
                }
            }
        });
        CollectorHandle::new(CollectorKind::Navigation, task)
    }
}
