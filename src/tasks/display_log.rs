//! Display logging background task

use tokio::sync::watch;
use tracing::{debug, info};

use crate::state::DisplayState;

/// Follow display changes and log them. Mode switches and start/stop are
/// logged at info, countdown steps at debug.
pub async fn display_log_task(mut display_rx: watch::Receiver<DisplayState>) {
    info!("Starting display log task");

    let mut last = display_rx.borrow_and_update().clone();

    while display_rx.changed().await.is_ok() {
        let current = display_rx.borrow_and_update().clone();

        if current.mode != last.mode {
            info!(
                "{}: {} ({} min break, {} min session)",
                current.mode_label,
                current.remaining_display,
                current.break_length,
                current.session_length
            );
        } else if current.running != last.running {
            info!(
                "{} {} at {}",
                current.mode_label,
                if current.running { "running" } else { "paused" },
                current.remaining_display
            );
        } else {
            debug!("{} {}", current.mode_label, current.remaining_display);
        }

        last = current;
    }

    debug!("Display channel closed, display log task exiting");
}
