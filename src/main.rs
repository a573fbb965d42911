//! ReMarkable HTTP server.
//!
//! Loads settings, opens the database and serves the metadata endpoint
//! until Ctrl+C or SIGTERM.

use remarkable::app::App;
use remarkable::server::start_server;
use remarkable::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut engine = SettingsEngine::new(None);
    engine.load()?;
    engine.apply_env_overrides();
    info!("Loaded settings from {}", engine.get_config_path().display());

    let app = App::new(engine.get_settings().clone())?;
    start_server(&app).await
}
