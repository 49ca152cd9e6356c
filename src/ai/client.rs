use anyhow::Result;
use reqwest::Client;

use crate::{config::AnalystConfig, domain::ScoredDetection};

use super::analysis::{build_request, fallback_analysis, parse_response, ProductAnalysis};

/// Enrichment collaborator behind the `ANALYZE_CONTENT` message. Calls the
/// configured chat-completion API when a key is present; otherwise, and on
/// any remote failure, degrades to the built-in enrichment.
#[derive(Clone)]
pub struct ProductAnalyst {
    http: Client,
    config: AnalystConfig,
}

impl ProductAnalyst {
    pub fn new(http: Client, config: AnalystConfig) -> Self {
        Self { http, config }
    }

    pub async fn analyze(&self, detection: &ScoredDetection) -> ProductAnalysis {
        let Some(api_key) = self.config.api_key.clone() else {
            tracing::debug!(target: "ai", "no analysis api key; using built-in enrichment");
            return fallback_analysis(detection);
        };
        match self.analyze_remote(&api_key, detection).await {
            Ok(analysis) => analysis,
            Err(err) => {
                tracing::warn!(
                    target: "ai",
                    error = %err,
                    id = %detection.id,
                    "remote analysis failed; using built-in enrichment"
                );
                fallback_analysis(detection)
            }
        }
    }

    async fn analyze_remote(
        &self,
        api_key: &str,
        detection: &ScoredDetection,
    ) -> Result<ProductAnalysis> {
        let request = build_request(self.config.model.clone(), detection);
        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        parse_response(response).await
    }
}
