use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub collect: CollectConfig,
    pub page: PageFetchConfig,
    pub analyst: AnalystConfig,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub db_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub clipboard_poll_interval: Duration,
    pub clipboard_bridge_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PageFetchConfig {
    pub enabled: bool,
    pub fetch_timeout: Duration,
    pub text_max_length: usize,
    pub max_images: usize,
}

#[derive(Debug, Clone)]
pub struct AnalystConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not a valid number")]
    InvalidNumber(&'static str),
}
