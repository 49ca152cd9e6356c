use std::{io::ErrorKind, path::PathBuf, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::time::sleep;

use crate::{
    collect::{Collector, CollectorHandle, EventSink},
    domain::{CollectorKind, DetectionEvent, EventKind, MonitoringConfig, SourceChannel},
};

/// Clipboard text shorter than this is ignored as noise.
pub const CLIPBOARD_MIN_LEN: usize = 10;
/// Clipboard text longer than this is ignored as bulk content.
pub const CLIPBOARD_MAX_LEN: usize = 1000;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("clipboard access denied")]
    AccessDenied,
    #[error("clipboard read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Narrow seam over the clipboard medium so the collector is testable
/// without a real desktop session.
pub trait ClipboardSource: Send + Sync {
    fn read_text(&self) -> Result<Option<String>, SourceError>;
}

/// Clipboard bridge backed by a plain file, for headless hosts where a
/// companion process mirrors the real clipboard into a path.
pub struct FileClipboard {
    path: PathBuf,
}

impl FileClipboard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ClipboardSource for FileClipboard {
    fn read_text(&self) -> Result<Option<String>, SourceError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                Err(SourceError::AccessDenied)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Placeholder source for hosts with no clipboard bridge configured. Every
/// read reports an access failure, which the collector swallows.
pub struct UnavailableClipboard;

impl ClipboardSource for UnavailableClipboard {
    fn read_text(&self) -> Result<Option<String>, SourceError> {
        Err(SourceError::AccessDenied)
    }
}

/// Timer-driven clipboard observer. Polls the source on a fixed interval
/// and emits a text event for clipboard content within the length bounds.
pub struct ClipboardCollector {
    source: Arc<dyn ClipboardSource>,
    poll_interval: Duration,
}

impl ClipboardCollector {
    pub fn new(source: Arc<dyn ClipboardSource>, poll_interval: Duration) -> Self {
        Self {
            source,
            poll_interval,
        }
    }
}

impl Collector for ClipboardCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Clipboard
    }

    fn attach(&self, sink: EventSink, _config: Arc<MonitoringConfig>) -> CollectorHandle {
        let source = self.source.clone();
        let interval = self.poll_interval;
        let task = tokio::spawn(async move {
            loop {
                sleep(interval).await;
                match source.read_text() {
                    Ok(Some(text)) => {
                        if let Some(event) = capture(&text) {
                            if sink.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        // Access failures never stop the collector; the
                        // next tick naturally retries.
                        tracing::debug!(target: "collect", error = %err, "clipboard read skipped");
                    }
                }
            }
        });
        CollectorHandle::new(CollectorKind::Clipboard, task)
    }
}

fn capture(text: &str) -> Option<DetectionEvent> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    if !(CLIPBOARD_MIN_LEN..=CLIPBOARD_MAX_LEN).contains(&len) {
        return None;
    }
    Some(DetectionEvent::new(
        EventKind::Text,
        trimmed,
        SourceChannel::Clipboard,
    ))
}
