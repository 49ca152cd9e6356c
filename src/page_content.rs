use anyhow::{Context, Result};
use dom_smoothie::{Config as ReadabilityConfig, Readability, TextMode};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::warn;
use url::Url;

use crate::config::PageFetchConfig;

static IMG_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid img tag regex"));
static SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid src regex"));
static ALT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\balt\s*=\s*["']([^"']*)["']"#).expect("valid alt regex"));
static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\bclass\s*=\s*["']([^"']*)["']"#).expect("valid class regex"));

#[derive(Debug, Clone)]
pub struct PageContent {
    pub title: Option<String>,
    pub text: Option<String>,
    pub images: Vec<PageImage>,
}

#[derive(Debug, Clone)]
pub struct PageImage {
    pub src: String,
    pub alt: String,
    pub class: String,
}

/// Fetches a visited page and reduces it to the parts the detection
/// pipeline can scan: readable text plus `<img>` attributes.
pub struct PageContentFetcher {
    client: Client,
    config: PageFetchConfig,
}

impl PageContentFetcher {
    pub fn new(client: Client, config: PageFetchConfig) -> Self {
        Self { client, config }
    }

    pub async fn fetch(&self, raw_url: &str) -> Result<Option<PageContent>> {
        let url = match Url::parse(raw_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => return Ok(None),
        };

        let response = self
            .client
            .get(url.clone())
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .with_context(|| format!("failed to fetch {}", url))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let body = response.text().await?;
        let images = extract_images(&body, self.config.max_images);

        let readability_cfg = ReadabilityConfig {
            text_mode: TextMode::Formatted,
            ..Default::default()
        };
        let mut readability =
            match Readability::new(body.as_str(), Some(url.as_str()), Some(readability_cfg)) {
                Ok(reader) => reader,
                Err(err) => {
                    warn!(target: "page", error = %err, url = %url, "readability init failed");
                    return Ok(Some(PageContent {
                        title: None,
                        text: None,
                        images,
                    }));
                }
            };

        let (title, text) = match readability.parse() {
            Ok(article) => {
                let mut text = article.text_content.trim().to_string();
                if text.len() > self.config.text_max_length {
                    text.truncate(self.config.text_max_length);
                }
                (
                    clean_str(Some(article.title)),
                    if text.is_empty() { None } else { Some(text) },
                )
            }
            Err(err) => {
                warn!(target: "page", error = %err, url = %url, "readability parse failed");
                (None, None)
            }
        };

        Ok(Some(PageContent {
            title,
            text,
            images,
        }))
    }
}

fn extract_images(html: &str, limit: usize) -> Vec<PageImage> {
    IMG_TAG_RE
        .find_iter(html)
        .filter_map(|m| {
            let tag = m.as_str();
            let src = attr(&SRC_RE, tag)?;
            Some(PageImage {
                src,
                alt: attr(&ALT_RE, tag).unwrap_or_default(),
                class: attr(&CLASS_RE, tag).unwrap_or_default(),
            })
        })
        .take(limit)
        .collect()
}

fn attr(re: &Regex, tag: &str) -> Option<String> {
    re.captures(tag)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_str(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_img_attributes() {
        let html = r#"
            <html><body>
            <img src="https://cdn.test/serum.jpg" alt="Night Serum" class="product-img">
            <IMG CLASS='hero' SRC='https://cdn.test/hero.png'>
            <img alt="no source here">
            </body></html>
        "#;
        let images = extract_images(html, 10);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].src, "https://cdn.test/serum.jpg");
        assert_eq!(images[0].alt, "Night Serum");
        assert_eq!(images[0].class, "product-img");
        assert_eq!(images[1].class, "hero");
        assert!(images[1].alt.is_empty());
    }

    #[test]
    fn image_limit_is_honored() {
        let html = "<img src='a.jpg'><img src='b.jpg'><img src='c.jpg'>";
        assert_eq!(extract_images(html, 2).len(), 2);
    }
}
