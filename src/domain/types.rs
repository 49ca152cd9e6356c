use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Shape of a raw observation payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Text,
    Image,
    Url,
}

/// Channel an observation was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceChannel {
    Clipboard,
    Navigation,
    #[serde(alias = "dom_mutation")]
    DomText,
    DomImage,
}

/// User-facing acceptance knob. Unrecognized values parse to `Medium`
/// rather than failing, so a stale persisted config never disables the
/// pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Sensitivity {
    High,
    #[default]
    Medium,
    Low,
}

impl Sensitivity {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Sensitivity::High,
            "low" => Sensitivity::Low,
            _ => Sensitivity::Medium,
        }
    }
}

impl From<String> for Sensitivity {
    fn from(value: String) -> Self {
        Sensitivity::parse(&value)
    }
}

/// A collector that can be independently switched on or off. One `Dom`
/// collector covers both the `dom_text` and `dom_image` channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectorKind {
    Clipboard,
    Dom,
    Navigation,
}

/// Lexical triggers grouped by category. Each category carries a fixed
/// weight in the confidence model; terms are matched as lower-case
/// substrings of the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordCategories {
    pub brands: Vec<String>,
    pub product_types: Vec<String>,
    pub ingredients: Vec<String>,
    pub contexts: Vec<String>,
}

impl KeywordCategories {
    /// All terms across every category, for collectors that only need a
    /// "contains any keyword" gate.
    pub fn all_terms(&self) -> impl Iterator<Item = &str> {
        self.brands
            .iter()
            .chain(&self.product_types)
            .chain(&self.ingredients)
            .chain(&self.contexts)
            .map(String::as_str)
    }
}

impl Default for KeywordCategories {
    fn default() -> Self {
        Self {
            brands: to_strings(&[
                "sephora",
                "ulta",
                "fenty beauty",
                "rare beauty",
                "glossier",
                "drunk elephant",
                "the ordinary",
                "cerave",
                "neutrogena",
                "olay",
                "clinique",
                "estee lauder",
                "nars",
                "urban decay",
                "too faced",
                "charlotte tilbury",
                "dior beauty",
            ]),
            product_types: to_strings(&[
                "serum",
                "moisturizer",
                "cleanser",
                "foundation",
                "concealer",
                "lipstick",
                "mascara",
                "eyeshadow",
                "blush",
                "bronzer",
                "primer",
                "toner",
                "essence",
            ]),
            ingredients: to_strings(&[
                "retinol",
                "vitamin c",
                "hyaluronic acid",
                "niacinamide",
                "salicylic acid",
            ]),
            contexts: to_strings(&["routine", "review", "tutorial", "haul", "grwm"]),
        }
    }
}

/// Runtime monitoring configuration. Mutable only through an explicit
/// merge of a [`ConfigPatch`]; persisted on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub sensitivity: Sensitivity,
    pub enabled_sources: BTreeSet<CollectorKind>,
    pub keywords: KeywordCategories,
    pub beauty_domains: Vec<String>,
    pub excluded_sites: Vec<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sensitivity: Sensitivity::Medium,
            enabled_sources: [
                CollectorKind::Clipboard,
                CollectorKind::Dom,
                CollectorKind::Navigation,
            ]
            .into_iter()
            .collect(),
            keywords: KeywordCategories::default(),
            beauty_domains: to_strings(&[
                "sephora.com",
                "ulta.com",
                "beautylish.com",
                "dermstore.com",
                "spacenk.com",
                "cultbeauty.com",
                "lookfantastic.com",
                "feelunique.com",
                "amazon.com",
                "target.com",
                "cvs.com",
                "walgreens.com",
            ]),
            excluded_sites: to_strings(&["gmail.com", "docs.google.com", "slack.com"]),
        }
    }
}

impl MonitoringConfig {
    pub fn is_beauty_domain(&self, url: &str) -> bool {
        let lowered = url.to_lowercase();
        self.beauty_domains
            .iter()
            .any(|domain| lowered.contains(domain.as_str()))
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        let lowered = url.to_lowercase();
        self.excluded_sites
            .iter()
            .any(|site| lowered.contains(site.as_str()))
    }

    /// Shallow merge: a field present in the patch replaces the current
    /// value wholesale, absent fields stay untouched.
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(sensitivity) = patch.sensitivity {
            self.sensitivity = sensitivity;
        }
        if let Some(sources) = patch.enabled_sources {
            self.enabled_sources = sources;
        }
        if let Some(keywords) = patch.keywords {
            self.keywords = keywords;
        }
        if let Some(domains) = patch.beauty_domains {
            self.beauty_domains = domains;
        }
        if let Some(sites) = patch.excluded_sites {
            self.excluded_sites = sites;
        }
    }
}

/// Partial configuration update as carried by `UPDATE_CONFIG` messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub enabled: Option<bool>,
    pub sensitivity: Option<Sensitivity>,
    pub enabled_sources: Option<BTreeSet<CollectorKind>>,
    pub keywords: Option<KeywordCategories>,
    pub beauty_domains: Option<Vec<String>>,
    pub excluded_sites: Option<Vec<String>>,
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitivity_parse_falls_back_to_medium() {
        assert_eq!(Sensitivity::parse("high"), Sensitivity::High);
        assert_eq!(Sensitivity::parse("LOW"), Sensitivity::Low);
        assert_eq!(Sensitivity::parse("paranoid"), Sensitivity::Medium);
        assert_eq!(Sensitivity::parse(""), Sensitivity::Medium);
    }

    #[test]
    fn patch_merges_shallowly() {
        let mut config = MonitoringConfig::default();
        let brands_before = config.keywords.brands.clone();
        config.apply(ConfigPatch {
            sensitivity: Some(Sensitivity::High),
            excluded_sites: Some(vec!["intranet.example".into()]),
            ..Default::default()
        });
        assert_eq!(config.sensitivity, Sensitivity::High);
        assert_eq!(config.excluded_sites, vec!["intranet.example".to_string()]);
        assert_eq!(config.keywords.brands, brands_before);
    }

    #[test]
    fn domain_checks_are_case_insensitive_substrings() {
        let config = MonitoringConfig::default();
        assert!(config.is_beauty_domain("https://www.Sephora.com/shop/serum"));
        assert!(!config.is_beauty_domain("https://news.ycombinator.com"));
        assert!(config.is_excluded("https://mail.gmail.com/inbox"));
    }
}
