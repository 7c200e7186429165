//! Interval length configuration

use serde::{Deserialize, Serialize};

/// Shortest interval a user can configure, in minutes
pub const LENGTH_MIN: u32 = 1;
/// Longest interval a user can configure, in minutes
pub const LENGTH_MAX: u32 = 60;

pub const DEFAULT_BREAK_LENGTH: u32 = 5;
pub const DEFAULT_SESSION_LENGTH: u32 = 1;

/// Session and break lengths, both in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub break_length: u32,
    pub session_length: u32,
}

impl TimerConfig {
    pub fn new() -> Self {
        Self {
            break_length: DEFAULT_BREAK_LENGTH,
            session_length: DEFAULT_SESSION_LENGTH,
        }
    }

    /// Adjust the break length by `delta`, clamped to the allowed range
    pub fn adjust_break(&mut self, delta: i32) -> u32 {
        self.break_length = clamp_length(self.break_length, delta);
        self.break_length
    }

    /// Adjust the session length by `delta`, clamped to the allowed range
    pub fn adjust_session(&mut self, delta: i32) -> u32 {
        self.session_length = clamp_length(self.session_length, delta);
        self.session_length
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_length(current: u32, delta: i32) -> u32 {
    let adjusted = i64::from(current) + i64::from(delta);
    adjusted.clamp(i64::from(LENGTH_MIN), i64::from(LENGTH_MAX)) as u32
}
