use crate::domain::{DetectionEvent, MonitoringConfig, SourceChannel};

pub const BRAND_WEIGHT: f64 = 0.3;
pub const PRODUCT_TYPE_WEIGHT: f64 = 0.2;
pub const INGREDIENT_WEIGHT: f64 = 0.15;
pub const CONTEXT_WEIGHT: f64 = 0.1;

pub const NAVIGATION_BONUS: f64 = 0.2;
pub const DOM_IMAGE_BONUS: f64 = 0.15;

/// Linear keyword-weighted confidence model.
///
/// Distinct matching terms per category times the category weight, plus a
/// flat source bonus, saturating at 1.0. Intentionally not a classifier: a
/// change in any weight has a locally predictable effect on the score.
pub fn score(event: &DetectionEvent, config: &MonitoringConfig) -> f64 {
    let text = event.payload.to_lowercase();
    let keywords = &config.keywords;

    let mut confidence = 0.0;
    confidence += count_matches(&text, &keywords.brands) as f64 * BRAND_WEIGHT;
    confidence += count_matches(&text, &keywords.product_types) as f64 * PRODUCT_TYPE_WEIGHT;
    confidence += count_matches(&text, &keywords.ingredients) as f64 * INGREDIENT_WEIGHT;
    confidence += count_matches(&text, &keywords.contexts) as f64 * CONTEXT_WEIGHT;

    confidence += match event.source {
        SourceChannel::Navigation => NAVIGATION_BONUS,
        SourceChannel::DomImage => DOM_IMAGE_BONUS,
        _ => 0.0,
    };

    confidence.clamp(0.0, 1.0)
}

fn count_matches(text: &str, terms: &[String]) -> usize {
    terms
        .iter()
        .filter(|term| text.contains(term.to_lowercase().as_str()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventKind, SourceChannel};

    fn text_event(payload: &str, source: SourceChannel) -> DetectionEvent {
        let kind = match source {
            SourceChannel::Navigation => EventKind::Url,
            SourceChannel::DomImage => EventKind::Image,
            _ => EventKind::Text,
        };
        DetectionEvent::new(kind, payload, source)
    }

    #[test]
    fn brand_product_context_sum_to_point_six() {
        let config = MonitoringConfig::default();
        let event = text_event(
            "I love this Sephora serum review",
            SourceChannel::Clipboard,
        );
        let got = score(&event, &config);
        assert!((got - 0.6).abs() < 1e-9, "expected 0.6, got {got}");
    }

    #[test]
    fn navigation_without_keywords_scores_only_the_bonus() {
        let config = MonitoringConfig::default();
        let event = text_event("https://www.example.com/checkout", SourceChannel::Navigation);
        let got = score(&event, &config);
        assert!((got - NAVIGATION_BONUS).abs() < 1e-9);
    }

    #[test]
    fn no_matches_and_no_bonus_scores_zero() {
        let config = MonitoringConfig::default();
        let event = text_event("weather forecast for tomorrow", SourceChannel::Clipboard);
        assert_eq!(score(&event, &config), 0.0);
    }

    #[test]
    fn monotonic_in_matched_terms() {
        let config = MonitoringConfig::default();
        let one = text_event("new serum drop", SourceChannel::Clipboard);
        let two = text_event("new serum and toner drop", SourceChannel::Clipboard);
        let three = text_event("new serum, toner, and mascara drop", SourceChannel::Clipboard);
        let s1 = score(&one, &config);
        let s2 = score(&two, &config);
        let s3 = score(&three, &config);
        assert!(s1 <= s2 && s2 <= s3);
    }

    #[test]
    fn many_matches_clamp_to_one() {
        let config = MonitoringConfig::default();
        let event = text_event(
            "sephora ulta glossier cerave serum moisturizer foundation lipstick \
             mascara retinol niacinamide vitamin c routine review tutorial haul",
            SourceChannel::DomImage,
        );
        assert_eq!(score(&event, &config), 1.0);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let config = MonitoringConfig::default();
        let lower = text_event("fenty beauty foundation", SourceChannel::Clipboard);
        let mixed = text_event("FENTY Beauty Foundation", SourceChannel::Clipboard);
        assert_eq!(score(&lower, &config), score(&mixed, &config));
    }
}
