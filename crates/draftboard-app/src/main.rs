// Draft board server entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Open database, seed players if configured
// 4. Spawn WebSocket server and request loop
// 5. Wait for Ctrl+C or a task exit, then clean up

use draftboard_app::app::{self, AppState};
use draftboard_app::config;
use draftboard_app::ws_server;
use draftboard_core::Board;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Draft board starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, {} teams, ${} default budget",
        config.league.name, config.league.num_teams, config.league.default_budget
    );

    let board = Board::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    let ws_port = config.ws_port;
    let state = AppState::new(config, board);
    app::seed_from_csv(&state).context("failed to load seed players")?;

    let listener = ws_server::bind(ws_port)
        .await
        .with_context(|| format!("failed to bind WebSocket server on port {ws_port}"))?;

    let (ws_tx, ws_rx) = mpsc::channel(256);

    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(listener, ws_tx).await {
            error!("WebSocket server error: {}", e);
        }
    });

    let mut app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(ws_rx, state).await {
            error!("Application loop error: {}", e);
        }
    });

    info!("Draft board ready on ws://127.0.0.1:{}", ws_port);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Ctrl+C received, shutting down");
        }
        _ = &mut app_handle => {
            info!("Application loop exited");
        }
    }

    // The server loops forever; the app loop ends once the server is gone.
    ws_handle.abort();
    app_handle.abort();

    info!("Draft board shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to `logs/draftboard.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draftboard.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draftboard=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
