//! Pomodoro Clock - a session/break countdown timer
//!
//! The clock alternates between a session interval and a break interval,
//! rings an alert at every boundary, and is controlled over a small HTTP
//! API.

pub mod api;
pub mod config;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use state::{AppState, PomodoroClock};
pub use utils::signals::shutdown_signal;
