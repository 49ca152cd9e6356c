use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::domain::{CollectorKind, DetectionEvent, MonitoringConfig};

pub mod clipboard;
pub mod dom;
pub mod navigation;

pub use clipboard::{ClipboardCollector, ClipboardSource, FileClipboard, UnavailableClipboard};
pub use dom::{DomCollector, DomContent, DomSnapshot};
pub use navigation::{NavigationCollector, PageScanner};

/// Where collectors deliver raw events. The orchestrator's event pump sits
/// on the other end.
pub type EventSink = mpsc::Sender<DetectionEvent>;

/// Owned subscription to a running collector task. Dropping the handle does
/// not stop the task; the owner must call [`CollectorHandle::detach`].
#[derive(Debug)]
pub struct CollectorHandle {
    kind: CollectorKind,
    task: JoinHandle<()>,
}

impl CollectorHandle {
    pub fn new(kind: CollectorKind, task: JoinHandle<()>) -> Self {
        Self { kind, task }
    }

    pub fn kind(&self) -> CollectorKind {
        self.kind
    }

    /// Aborts the collector task. Returns synchronously; afterwards the
    /// task can no longer push events into its sink.
    pub fn detach(&self) {
        self.task.abort();
    }
}

/// A source observer. `attach` spawns the observation task with a snapshot
/// of the monitoring config; the collector never reports medium failures
/// upward, it only ever fails to produce an event.
pub trait Collector: Send + Sync {
    fn kind(&self) -> CollectorKind;

    fn attach(&self, sink: EventSink, config: Arc<MonitoringConfig>) -> CollectorHandle;
}
