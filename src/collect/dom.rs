use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
    collect::{Collector, CollectorHandle, EventSink},
    domain::{CollectorKind, DetectionEvent, EventKind, MonitoringConfig, SourceChannel},
};

/// Minimum normalized text length for a DOM text candidate.
pub const DOM_TEXT_MIN_LEN: usize = 10;

/// Tokens that mark an image as beauty-related when found in its address,
/// alternate text, or class attribute.
const IMAGE_INDICATORS: [&str; 10] = [
    "product",
    "beauty",
    "cosmetic",
    "skincare",
    "makeup",
    "serum",
    "cream",
    "foundation",
    "lipstick",
    "mascara",
];

/// One piece of content observed in (or harvested from) a page subtree.
#[derive(Debug, Clone)]
pub enum DomContent {
    Text(String),
    Image {
        src: String,
        alt: String,
        class: String,
    },
}

/// Provider of content already present when monitoring starts, scanned
/// eagerly on attach before any future mutations are observed.
pub type DomSnapshot = Arc<dyn Fn() -> Vec<DomContent> + Send + Sync>;

/// Observer of DOM subtree insertions. The feed is a broadcast channel so
/// each start/stop cycle gets a fresh subscription.
pub struct DomCollector {
    feed: broadcast::Sender<DomContent>,
    snapshot: DomSnapshot,
}

impl DomCollector {
    pub fn new(feed: broadcast::Sender<DomContent>, snapshot: DomSnapshot) -> Self {
        Self { feed, snapshot }
    }
}

impl Collector for DomCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Dom
    }

    fn attach(&self, sink: EventSink, config: Arc<MonitoringConfig>) -> CollectorHandle {
        let mut feed = self.feed.subscribe();
        let backfill = (self.snapshot)();
        let task = tokio::spawn(async move {
            for item in backfill {
                if !forward(item, &config, &sink).await {
                    return;
                }
            }
            loop {
                match feed.recv().await {
                    Ok(item) => {
                        if !forward(item, &config, &sink).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::debug!(target: "collect", missed, "dom feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        CollectorHandle::new(CollectorKind::Dom, task)
    }
}

async fn forward(item: DomContent, config: &MonitoringConfig, sink: &EventSink) -> bool {
    match screen(item, config) {
        Some(event) => sink.send(event).await.is_ok(),
        None => true,
    }
}

fn screen(item: DomContent, config: &MonitoringConfig) -> Option<DetectionEvent> {
    match item {
        DomContent::Text(raw) => {
            let text = normalize_text(&raw);
            if text.chars().count() < DOM_TEXT_MIN_LEN {
                return None;
            }
            let lowered = text.to_lowercase();
            let hit = config
                .keywords
                .all_terms()
                .any(|term| lowered.contains(term.to_lowercase().as_str()));
            if !hit {
                return None;
            }
            Some(DetectionEvent::new(
                EventKind::Text,
                text,
                SourceChannel::DomText,
            ))
        }
        DomContent::Image { src, alt, class } => {
            let haystack = format!(
                "{} {} {}",
                src.to_lowercase(),
                alt.to_lowercase(),
                class.to_lowercase()
            );
            let hit = IMAGE_INDICATORS
                .iter()
                .any(|indicator| haystack.contains(indicator));
            if !hit || src.is_empty() {
                return None;
            }
            Some(DetectionEvent::new(
                EventKind::Image,
                src,
                SourceChannel::DomImage,
            ))
        }
    }
}

fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn empty_snapshot() -> DomSnapshot {
        Arc::new(Vec::new)
    }

    #[test]
    fn short_or_keywordless_text_is_screened_out() {
        let config = MonitoringConfig::default();
        assert!(screen(DomContent::Text("serum".into()), &config).is_none());
        assert!(screen(
            DomContent::Text("nothing of interest in this sentence".into()),
            &config
        )
        .is_none());

        let event = screen(
            DomContent::Text("  new   drunk elephant  serum   restock ".into()),
            &config,
        )
        .expect("keyword text passes");
        assert_eq!(event.payload, "new drunk elephant serum restock");
        assert_eq!(event.source, SourceChannel::DomText);
    }

    #[test]
    fn image_indicator_tokens_in_any_attribute() {
        let config = MonitoringConfig::default();
        let by_alt = screen(
            DomContent::Image {
                src: "https://cdn.test/img/1234.jpg".into(),
                alt: "Skincare set".into(),
                class: String::new(),
            },
            &config,
        );
        assert!(by_alt.is_some());

        let by_class = screen(
            DomContent::Image {
                src: "https://cdn.test/img/5678.jpg".into(),
                alt: String::new(),
                class: "product-tile__image".into(),
            },
            &config,
        );
        assert!(by_class.is_some());

        let miss = screen(
            DomContent::Image {
                src: "https://cdn.test/logo.svg".into(),
                alt: "site logo".into(),
                class: "header-logo".into(),
            },
            &config,
        );
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn backfill_is_scanned_before_live_mutations() {
        let (feed, _keep) = broadcast::channel(16);
        let snapshot: DomSnapshot = Arc::new(|| {
            vec![DomContent::Text(
                "already-present glossier lipstick shelf".into(),
            )]
        });
        let collector = DomCollector::new(feed.clone(), snapshot);
        let (tx, mut rx) = mpsc::channel(8);
        let handle = collector.attach(tx, Arc::new(MonitoringConfig::default()));

        let first = rx.recv().await.expect("backfill event");
        assert!(first.payload.contains("glossier"));

        feed.send(DomContent::Text("fresh mascara review incoming".into()))
            .expect("subscriber alive");
        let second = rx.recv().await.expect("live event");
        assert!(second.payload.contains("mascara"));
        handle.detach();
    }
}
