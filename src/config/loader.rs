use std::{env, time::Duration};

use super::env::{
    AnalystConfig, AppConfig, CollectConfig, ConfigError, DirectoryConfig, LoggingConfig,
    PageFetchConfig,
};

const DEFAULT_ANALYSIS_API_URL: &str = "https://api.cerebras.ai/v1/chat/completions";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "radar.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let collect = CollectConfig {
            clipboard_poll_interval: Duration::from_millis(parse_u64(
                "CLIPBOARD_POLL_MS",
                2_000,
            )?),
            clipboard_bridge_file: env::var("CLIPBOARD_BRIDGE_FILE")
                .ok()
                .filter(|v| !v.is_empty()),
        };

        let page = PageFetchConfig {
            enabled: parse_bool("PAGE_SCAN_ENABLED", true),
            fetch_timeout: Duration::from_millis(parse_u64("PAGE_FETCH_TIMEOUT", 10_000)?),
            text_max_length: parse_u64("PAGE_TEXT_MAX_LENGTH", 2_000)? as usize,
            max_images: parse_u64("PAGE_MAX_IMAGES", 20)? as usize,
        };

        let analyst = AnalystConfig {
            api_key: env::var("ANALYSIS_API_KEY").ok().filter(|v| !v.is_empty()),
            model: env::var("ANALYSIS_MODEL").unwrap_or_else(|_| "gpt-oss-120b".to_string()),
            api_url: env::var("ANALYSIS_API_URL")
                .unwrap_or_else(|_| DEFAULT_ANALYSIS_API_URL.to_string()),
        };

        Ok(Self {
            directories,
            logging,
            collect,
            page,
            analyst,
        })
    }
}

fn parse_u64(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber(key)),
        _ => Ok(default),
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
