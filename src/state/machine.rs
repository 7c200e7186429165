//! Pure session/break state machine
//!
//! The machine knows nothing about schedulers or sound. It advances the
//! countdown one tick at a time and reports when an interval boundary has
//! been crossed; the clock driver turns that report into side effects.

use super::{timer_state::format_mm_ss, DisplayState, Mode, TimerConfig, TimerState};

/// Real time represented by one tick, in milliseconds
pub const TICK_PERIOD_MS: u64 = 1000;

/// Convert a tick count into whole elapsed seconds
pub fn elapsed_seconds(ticks: u64) -> u64 {
    ticks * TICK_PERIOD_MS / 1000
}

/// Result of advancing the machine by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting down in the current mode
    Counting,
    /// The countdown reached zero; the machine now runs `new_mode`
    Boundary { new_mode: Mode },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerMachine {
    pub config: TimerConfig,
    pub state: TimerState,
}

impl TimerMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds left in the current mode. Negative values are clamped to zero.
    pub fn remaining_seconds(&self) -> u64 {
        let total = u64::from(self.state.mode.length_minutes(&self.config)) * 60;
        total.saturating_sub(elapsed_seconds(self.state.elapsed_ticks))
    }

    /// Advance by one tick. Reaching zero remaining time flips the mode and
    /// rewinds the tick count in the same step.
    pub fn tick(&mut self) -> TickOutcome {
        self.state.elapsed_ticks += 1;

        if self.remaining_seconds() == 0 {
            self.state.elapsed_ticks = 0;
            self.state.mode = self.state.mode.flipped();
            TickOutcome::Boundary {
                new_mode: self.state.mode,
            }
        } else {
            TickOutcome::Counting
        }
    }

    pub fn set_running(&mut self, running: bool) {
        self.state.running = running;
    }

    /// Restore default configuration and an idle session
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn set_break_length(&mut self, delta: i32) -> u32 {
        self.config.adjust_break(delta)
    }

    pub fn set_session_length(&mut self, delta: i32) -> u32 {
        self.config.adjust_session(delta)
    }

    /// Remaining time in the current mode as `MM:SS`
    pub fn remaining_display(&self) -> String {
        format_mm_ss(self.remaining_seconds())
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            mode: self.state.mode,
            mode_label: self.state.mode.label().to_string(),
            remaining_display: self.remaining_display(),
            break_length: self.config.break_length,
            session_length: self.config.session_length,
            running: self.state.running,
        }
    }
}
