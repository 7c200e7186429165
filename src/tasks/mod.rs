//! Background tasks module
//!
//! This module contains the scheduler tasks that drive the clock and the
//! task that follows its display.

pub mod display_log;
pub mod rearm;
pub mod ticker;

// Re-export main functions
pub use display_log::display_log_task;
pub use rearm::spawn_rearm;
pub use ticker::spawn_ticker;
