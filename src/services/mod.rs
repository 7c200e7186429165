//! Alert sound module
//!
//! This module contains the sound backends the clock notifies at interval
//! boundaries.

pub mod sound;

use std::sync::Arc;
use tracing::{info, warn};

// Re-export main types
pub use sound::{AlertSound, CommandSound, TerminalBell};

/// Pick the alert backend for an optional player command line
pub fn alert_sound_for(command_line: Option<&str>) -> Arc<dyn AlertSound> {
    match command_line.map(CommandSound::from_command_line) {
        Some(Some(sound)) => {
            info!("Using alert command: {}", sound.program());
            Arc::new(sound)
        }
        Some(None) => {
            warn!("Empty alert command, falling back to terminal bell");
            Arc::new(TerminalBell::new())
        }
        None => Arc::new(TerminalBell::new()),
    }
}
