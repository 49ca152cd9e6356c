use tokio::sync::broadcast;

use crate::{detect::policy, domain::ScoredDetection, messaging::ContextNotice};

/// Decides whether an accepted detection also interrupts the user, and
/// delivers notices to whatever contexts are subscribed. Recording in
/// history has already happened by the time a detection reaches here.
#[derive(Clone)]
pub struct Dispatcher {
    notices: broadcast::Sender<ContextNotice>,
}

impl Dispatcher {
    pub fn new(capacity: usize) -> Self {
        let (notices, _) = broadcast::channel(capacity);
        Self { notices }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContextNotice> {
        self.notices.subscribe()
    }

    pub fn dispatch(&self, detection: &ScoredDetection) {
        if !policy::should_popup(detection.confidence) {
            return;
        }
        tracing::info!(
            target: "monitor",
            id = %detection.id,
            confidence = detection.confidence,
            "detection cleared the popup bar"
        );
        self.send(ContextNotice::ShowPopup(detection.clone()));
    }

    pub fn monitoring_toggled(&self, enabled: bool) {
        self.send(ContextNotice::MonitoringToggled { enabled });
    }

    /// A send with zero receivers means every UI surface is closed; that is
    /// never an error for the pipeline.
    fn send(&self, notice: ContextNotice) {
        if self.notices.send(notice).is_err() {
            tracing::debug!(target: "monitor", "no active context to notify");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DetectionEvent, EventKind, SourceChannel};

    fn detection(confidence: f64) -> ScoredDetection {
        ScoredDetection::new(
            "d-1".into(),
            DetectionEvent::new(
                EventKind::Text,
                "glossier lipstick haul",
                SourceChannel::Clipboard,
            ),
            confidence,
        )
    }

    #[test]
    fn exactly_the_bar_does_not_pop() {
        let dispatcher = Dispatcher::new(8);
        let mut rx = dispatcher.subscribe();
        dispatcher.dispatch(&detection(0.6));
        assert!(rx.try_recv().is_err());

        dispatcher.dispatch(&detection(0.7));
        assert!(matches!(rx.try_recv(), Ok(ContextNotice::ShowPopup(_))));
    }

    #[test]
    fn dispatch_without_subscribers_is_silent() {
        let dispatcher = Dispatcher::new(8);
        // Must not panic or error with every UI surface closed.
        dispatcher.dispatch(&detection(0.9));
        dispatcher.monitoring_toggled(true);
    }
}
