//! Timer state structure and the derived display values

use serde::{Deserialize, Serialize};

use super::TimerConfig;

/// Which interval is currently counting down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Session,
    Break,
}

impl Mode {
    /// The other mode
    pub fn flipped(self) -> Self {
        match self {
            Mode::Session => Mode::Break,
            Mode::Break => Mode::Session,
        }
    }

    /// Label shown above the countdown
    pub fn label(self) -> &'static str {
        match self {
            Mode::Session => "Current Session",
            Mode::Break => "Current Break",
        }
    }

    /// Configured length of this mode, in minutes
    pub fn length_minutes(self, config: &TimerConfig) -> u32 {
        match self {
            Mode::Session => config.session_length,
            Mode::Break => config.break_length,
        }
    }
}

/// Mutable countdown state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub elapsed_ticks: u64,
    pub mode: Mode,
    pub running: bool,
}

impl TimerState {
    /// Create an idle state at the start of a session
    pub fn new() -> Self {
        Self {
            elapsed_ticks: 0,
            mode: Mode::Session,
            running: false,
        }
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the presentation layer needs to render the clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayState {
    pub mode: Mode,
    pub mode_label: String,
    pub remaining_display: String,
    pub break_length: u32,
    pub session_length: u32,
    pub running: bool,
}

/// Format a number of seconds as `MM:SS`
pub fn format_mm_ss(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
