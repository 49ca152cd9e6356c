use anyhow::{Context, Result};
use reqwest::Response;
use serde::{Deserialize, Serialize};

use crate::domain::{EventKind, ScoredDetection, SourceChannel};

const SYSTEM_PROMPT: &str = r#"You are a beauty product analyst. You receive a snippet of detected content (page text, a clipboard excerpt, an image address, or a shop URL) and identify the beauty products it refers to.
Return a single JSON object with this shape:
{"detection_triggered": bool, "products_found": [{"product_name": str, "brand": str, "category": str, "confidence_score": float, "key_ingredients": [str], "primary_benefits": [str], "price_range": str}], "context_analysis": {"source_type": str, "detection_context": str, "urgency_level": str}}
If no concrete product can be identified, return detection_triggered false with an empty products_found list. Do not include any text outside the JSON object."#;

/// Enrichment result for an `ANALYZE_CONTENT` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAnalysis {
    pub detection_triggered: bool,
    pub products_found: Vec<ProductInsight>,
    pub context_analysis: ContextAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInsight {
    pub product_name: String,
    pub brand: String,
    pub category: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub key_ingredients: Vec<String>,
    #[serde(default)]
    pub primary_benefits: Vec<String>,
    #[serde(default)]
    pub price_range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextAnalysis {
    pub source_type: String,
    pub detection_context: String,
    pub urgency_level: String,
}

/// Built-in enrichment used when no analysis API is configured or the
/// remote call fails. Keeps the popup's analyze action functional offline.
pub fn fallback_analysis(detection: &ScoredDetection) -> ProductAnalysis {
    ProductAnalysis {
        detection_triggered: true,
        products_found: vec![ProductInsight {
            product_name: "Detected Beauty Product".into(),
            brand: "Unknown".into(),
            category: category_for(detection.event.kind).into(),
            confidence_score: detection.confidence,
            key_ingredients: vec!["Unknown".into()],
            primary_benefits: vec!["Beauty enhancement".into()],
            price_range: "$10-50".into(),
        }],
        context_analysis: ContextAnalysis {
            source_type: source_label(detection.event.source).into(),
            detection_context: "real_time_monitoring".into(),
            urgency_level: "medium".into(),
        },
    }
}

fn category_for(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Url => "shopping",
        EventKind::Image | EventKind::Text => "skincare",
    }
}

fn source_label(source: SourceChannel) -> &'static str {
    match source {
        SourceChannel::Clipboard => "clipboard",
        SourceChannel::Navigation => "navigation",
        SourceChannel::DomText => "dom_text",
        SourceChannel::DomImage => "dom_image",
    }
}

pub fn build_request(model: String, detection: &ScoredDetection) -> ChatCompletionRequest {
    let prompt = format!(
        "source: {}\nconfidence: {:.2}\ncontent:\n{}",
        source_label(detection.event.source),
        detection.confidence,
        detection.event.payload
    );
    ChatCompletionRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system".into(),
                content: SYSTEM_PROMPT.into(),
            },
            ChatMessage {
                role: "user".into(),
                content: prompt,
            },
        ],
        temperature: 0.2,
        top_p: 1.0,
        max_tokens: 1024,
        response_format: ResponseFormat {
            r#type: "json_object".into(),
        },
    }
}

pub async fn parse_response(response: Response) -> Result<ProductAnalysis> {
    let completion: ChatCompletionResponse = response.json().await?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .context("analysis response did not contain any choices")?;

    let content = choice
        .message
        .and_then(|msg| msg.content)
        .context("analysis response missing message content")?;

    let analysis: ProductAnalysis = serde_json::from_str(&content)?;
    Ok(analysis)
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: i32,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub r#type: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: Option<ChatCompletionMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionMessage {
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DetectionEvent;

    #[test]
    fn fallback_carries_the_detection_confidence() {
        let detection = ScoredDetection::new(
            "d-1".into(),
            DetectionEvent::new(
                EventKind::Url,
                "https://www.sephora.com/foo",
                SourceChannel::Navigation,
            ),
            0.8,
        );
        let analysis = fallback_analysis(&detection);
        assert!(analysis.detection_triggered);
        assert_eq!(analysis.products_found.len(), 1);
        assert_eq!(analysis.products_found[0].confidence_score, 0.8);
        assert_eq!(analysis.context_analysis.source_type, "navigation");
    }
}
