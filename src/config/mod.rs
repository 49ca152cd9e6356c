pub mod env;
mod loader;

pub use env::{
    AnalystConfig, AppConfig, CollectConfig, ConfigError, DirectoryConfig, LoggingConfig,
    PageFetchConfig,
};
pub use loader::load_config;
