//! State management module
//!
//! This module contains the timer data model, the pure state machine, the
//! clock driver that schedules it, and the shared application state.

pub mod app_state;
pub mod clock;
pub mod machine;
pub mod timer_config;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use clock::{ClockEvent, PomodoroClock};
pub use machine::{TickOutcome, TimerMachine};
pub use timer_config::TimerConfig;
pub use timer_state::{DisplayState, Mode, TimerState};
