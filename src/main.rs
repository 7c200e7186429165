//! Pomodoro Clock - a session/break countdown timer served over HTTP
//!
//! This is the main entry point for the pomodoro-clock application.

use std::sync::Arc;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use pomodoro_clock::{
    api::create_router,
    config::Config,
    services::alert_sound_for,
    state::AppState,
    tasks::display_log_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("pomodoro_clock={},tower_http=info", config.log_level()))
        .init();

    info!("Starting pomodoro-clock v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, alert_command={:?}",
          config.host, config.port, config.alert_command);

    let sound = alert_sound_for(config.alert_command.as_deref());
    let state = Arc::new(AppState::new(config.port, config.host.clone(), sound));

    // Log display changes as the clock runs
    tokio::spawn(display_log_task(state.clock.subscribe_display()));

    let app = create_router(Arc::clone(&state));

    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /display           - Current clock face");
    info!("  POST /toggle            - Start or stop the countdown");
    info!("  POST /reset             - Stop and restore defaults");
    info!("  POST /break/increment   - Lengthen the break");
    info!("  POST /break/decrement   - Shorten the break");
    info!("  POST /session/increment - Lengthen the session");
    info!("  POST /session/decrement - Shorten the session");
    info!("  GET  /status            - Countdown internals and server info");
    info!("  GET  /events            - Server-sent clock events");
    info!("  GET  /health            - Health check");

    // Event streams never finish on their own, so the server is raced
    // against the signal rather than drained.
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    if let Err(e) = state.clock.shutdown() {
        tracing::error!("Failed to shut down clock: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}
