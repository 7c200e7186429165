//! Periodic ticker task

use std::{sync::Weak, time::Duration};
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, warn};

use crate::state::{machine::TICK_PERIOD_MS, PomodoroClock};

/// Spawn the repeating wake-up that drives `clock`.
///
/// The first wake-up lands one period after the call. Late wake-ups are
/// delivered in a burst so the tick count stays aligned with wall-clock
/// seconds.
///
/// Returns `None` when called outside a tokio runtime.
pub fn spawn_ticker(clock: Weak<PomodoroClock>, generation: u64) -> Option<JoinHandle<()>> {
    let Ok(runtime) = Handle::try_current() else {
        warn!("No tokio runtime to drive ticker {}", generation);
        return None;
    };

    let period = Duration::from_millis(TICK_PERIOD_MS);
    let first = Instant::now() + period;

    let handle = runtime.spawn(async move {
        let mut interval = interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        debug!("Ticker {} started", generation);

        loop {
            interval.tick().await;

            let Some(clock) = clock.upgrade() else {
                debug!("Clock dropped, ticker {} exiting", generation);
                break;
            };

            match clock.scheduled_tick(generation) {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => error!("Failed to apply tick: {}", e),
            }
        }
    });
    Some(handle)
}
