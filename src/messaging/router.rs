use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    ai::ProductAnalyst,
    detect::history::UI_HISTORY_LIMIT,
    infrastructure::shutdown::ShutdownListener,
    messaging::types::{Envelope, Request, Response},
    monitor::ContentMonitor,
};

/// Serves bus requests against the monitor and the analyst. One router task
/// owns the receive side of the bus; replies go back over the per-request
/// oneshot when the caller asked for one.
pub struct Router {
    monitor: Arc<ContentMonitor>,
    analyst: Arc<ProductAnalyst>,
}

impl Router {
    pub fn new(monitor: Arc<ContentMonitor>, analyst: Arc<ProductAnalyst>) -> Self {
        Self { monitor, analyst }
    }

    pub fn spawn(
        self,
        mut envelopes: mpsc::Receiver<Envelope>,
        mut shutdown: ShutdownListener,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.notified() => break,
                    maybe = envelopes.recv() => match maybe {
                        Some(envelope) => self.serve(envelope).await,
                        None => break,
                    },
                }
            }
            tracing::info!(target: "bus", "router stopped");
        })
    }

    async fn serve(&self, envelope: Envelope) {
        let Envelope { request, reply } = envelope;
        let response = self.handle(request).await;
        if let Some(reply) = reply {
            // A caller that gave up waiting is not an error.
            let _ = reply.send(response);
        }
    }

    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::GetConfig => Response::Config {
                config: self.monitor.config(),
                is_monitoring: self.monitor.is_active(),
            },
            Request::UpdateConfig(patch) => {
                self.monitor.update_config(patch).await;
                Response::Ack { success: true }
            }
            Request::ToggleMonitoring { enabled } => {
                self.monitor.set_enabled(enabled).await;
                Response::Ack { success: true }
            }
            Request::ContentDetected(event) => {
                self.monitor.ingest(event);
                Response::Ack { success: true }
            }
            Request::GetHistory => Response::History(self.monitor.history(UI_HISTORY_LIMIT)),
            Request::AnalyzeContent(detection) => {
                Response::Analysis(self.analyst.analyze(&detection).await)
            }
        }
    }
}
