mod action;
mod app;
mod component;
mod components;
mod theme;
mod widgets;

use std::sync::Arc;

use watchthis_proto::config::Config;
use watchthis_proto::platform;
use watchthis_sync::{HttpMovieApi, MovieApi, SyncSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = platform::log_path();

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG wins; otherwise debug for app code with HTTP/socket internals quiet.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "debug,hyper_util=warn,reqwest=warn,hyper=warn,tungstenite=warn".to_string()
    });
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("watchthis log: {}", log_path.display());

    tracing::info!("watchthis starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("config: {}; using defaults", e);
        let mut config = Config::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    });
    tracing::info!(
        "api {} push {} ({})",
        config.api.base_url,
        config.push.ws_url,
        if config.push.enabled { "enabled" } else { "disabled" }
    );

    // ── Sync session ─────────────────────────────────────────────────────────
    let api: Arc<dyn MovieApi> = Arc::new(HttpMovieApi::new(&config.api)?);
    let session = SyncSession::start(config, api);

    // ── Run TUI ──────────────────────────────────────────────────────────────
    app::App::new(session).run().await
}
