mod ai;
mod app;
mod collect;
mod config;
mod db;
mod detect;
mod domain;
mod infrastructure;
mod messaging;
mod monitor;
mod page_content;

use anyhow::Result;
use infrastructure::{directories, instance_guard::InstanceGuard, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config.logging.level, &paths)?;

    let _guard = InstanceGuard::acquire(&paths)?;

    let (shutdown, _) = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::RadarApp::initialize(config, paths, shutdown.clone()).await?;
    app.run().await
}
