use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::{
    ai::ProductAnalysis,
    domain::{ConfigPatch, DetectionEvent, MonitoringConfig, ScoredDetection},
};

/// Inbound protocol: messages from UI and content contexts to the
/// background monitor. At most one response per request; `ContentDetected`
/// is fire-and-forget.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    GetConfig,
    UpdateConfig(ConfigPatch),
    ToggleMonitoring { enabled: bool },
    ContentDetected(DetectionEvent),
    GetHistory,
    AnalyzeContent(ScoredDetection),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Config {
        config: MonitoringConfig,
        is_monitoring: bool,
    },
    Ack {
        success: bool,
    },
    History(Vec<ScoredDetection>),
    Analysis(ProductAnalysis),
}

/// Outbound fire-and-forget notices from the background to whatever
/// contexts happen to be listening.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextNotice {
    MonitoringToggled { enabled: bool },
    ShowPopup(ScoredDetection),
}

pub struct Envelope {
    pub request: Request,
    pub reply: Option<oneshot::Sender<Response>>,
}

/// Sender half handed to UI/content contexts. Delivery is best effort: a
/// gone router simply yields `None`.
#[derive(Clone)]
pub struct BusClient {
    tx: mpsc::Sender<Envelope>,
}

impl BusClient {
    pub async fn request(&self, request: Request) -> Option<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope {
            request,
            reply: Some(reply_tx),
        };
        if self.tx.send(envelope).await.is_err() {
            return None;
        }
        reply_rx.await.ok()
    }

    /// Fire-and-forget send; errors are suppressed on the sender side.
    pub async fn notify(&self, request: Request) {
        let _ = self
            .tx
            .send(Envelope {
                request,
                reply: None,
            })
            .await;
    }
}

pub fn channel(capacity: usize) -> (BusClient, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(capacity);
    (BusClient { tx }, rx)
}
