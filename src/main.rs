// Poll client entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Build the HTTP backend client
// 4. Create mpsc channels and the refresh trigger hub
// 5. Spawn the orchestrator event loop
// 6. Run the interactive shell (blocking until quit)
// 7. Cleanup on exit

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use pollboard::api::HttpPollApi;
use pollboard::app::{self, AppState};
use pollboard::config;
use pollboard::shell;
use pollboard::triggers::TriggerHub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not the terminal used by the shell)
    init_tracing()?;
    info!("pollboard starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: backend={}, timeout={}s",
        config.backend.base_url, config.backend.timeout_secs
    );

    // 3. Build the HTTP backend client
    let backend = HttpPollApi::new(&config.backend.base_url, config.request_timeout())
        .context("failed to build HTTP client")?;

    // 4. Channels and trigger hub
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (fetch_tx, fetch_rx) = mpsc::channel(256);
    let (ui_tx, ui_rx) = mpsc::channel(256);
    let triggers = TriggerHub::new();
    let trigger_rx = triggers.subscribe();

    let state = AppState::new(
        Arc::new(backend),
        config.placeholder_mode(),
        triggers,
        fetch_tx,
    );

    // 5. Spawn the orchestrator event loop
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, fetch_rx, trigger_rx, ui_tx, state).await {
            error!("orchestrator loop error: {}", e);
        }
    });

    // 6. Run the shell (blocks until the user quits or stdin closes)
    if let Err(e) = shell::run(ui_rx, cmd_tx).await {
        error!("shell error: {}", e);
    }

    // 7. Cleanup: give the orchestrator a moment to drain and exit
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("pollboard shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (the terminal belongs to the shell).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("pollboard.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pollboard=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
