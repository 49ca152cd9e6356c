use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{EventKind, SourceChannel};

/// A candidate observation, before scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub kind: EventKind,
    pub payload: String,
    pub source: SourceChannel,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum InvalidEvent {
    #[error("event payload is empty")]
    EmptyPayload,
    // Field must not be called `source`; thiserror would treat it as the
    // error-source and demand an Error impl on SourceChannel.
    #[error("{kind:?} payload cannot originate from the {channel:?} channel")]
    KindSourceMismatch {
        kind: EventKind,
        channel: SourceChannel,
    },
}

impl DetectionEvent {
    pub fn new(kind: EventKind, payload: impl Into<String>, source: SourceChannel) -> Self {
        Self {
            kind,
            payload: payload.into(),
            source,
            observed_at: Utc::now(),
        }
    }

    /// Malformed events are rejected here, before they can reach the
    /// dedup ledger or history.
    pub fn validate(&self) -> Result<(), InvalidEvent> {
        if self.payload.trim().is_empty() {
            return Err(InvalidEvent::EmptyPayload);
        }
        if !valid_pair(self.kind, self.source) {
            return Err(InvalidEvent::KindSourceMismatch {
                kind: self.kind,
                channel: self.source,
            });
        }
        Ok(())
    }
}

fn valid_pair(kind: EventKind, source: SourceChannel) -> bool {
    matches!(
        (kind, source),
        (EventKind::Text, SourceChannel::Clipboard)
            | (EventKind::Text, SourceChannel::DomText)
            | (EventKind::Image, SourceChannel::DomImage)
            | (EventKind::Url, SourceChannel::Navigation)
    )
}

/// A detection that passed the sensitivity threshold. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDetection {
    pub id: String,
    #[serde(flatten)]
    pub event: DetectionEvent,
    pub confidence: f64,
}

impl ScoredDetection {
    pub fn new(id: String, event: DetectionEvent, confidence: f64) -> Self {
        Self {
            id,
            event,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_is_rejected() {
        let event = DetectionEvent::new(EventKind::Text, "   ", SourceChannel::Clipboard);
        assert!(matches!(event.validate(), Err(InvalidEvent::EmptyPayload)));
    }

    #[test]
    fn kind_source_pairs_are_checked() {
        let bad = DetectionEvent::new(EventKind::Url, "https://x.test", SourceChannel::Clipboard);
        assert!(matches!(
            bad.validate(),
            Err(InvalidEvent::KindSourceMismatch { .. })
        ));

        let ok = DetectionEvent::new(
            EventKind::Url,
            "https://sephora.com",
            SourceChannel::Navigation,
        );
        assert!(ok.validate().is_ok());
        let dom = DetectionEvent::new(EventKind::Text, "serum restock", SourceChannel::DomText);
        assert!(dom.validate().is_ok());
    }

    #[test]
    fn mismatch_error_names_kind_and_channel() {
        let bad = DetectionEvent::new(EventKind::Image, "pic.jpg", SourceChannel::Clipboard);
        let err = bad.validate().expect_err("invalid pair");
        let rendered = err.to_string();
        assert!(rendered.contains("Image"));
        assert!(rendered.contains("Clipboard"));
    }
}
