//! One-shot alert rearm task

use std::{sync::Weak, time::Duration};
use tokio::{runtime::Handle, task::JoinHandle, time::sleep};
use tracing::{debug, warn};

use crate::state::PomodoroClock;

/// Rearm the clock's alert sound after `delay`. Does nothing if the clock
/// is gone or has been reset in the meantime.
///
/// Returns `None` when called outside a tokio runtime.
pub fn spawn_rearm(
    clock: Weak<PomodoroClock>,
    generation: u64,
    delay: Duration,
) -> Option<JoinHandle<()>> {
    let Ok(runtime) = Handle::try_current() else {
        warn!("No tokio runtime, alert sound will stay spent until reset");
        return None;
    };

    let handle = runtime.spawn(async move {
        sleep(delay).await;

        match clock.upgrade() {
            Some(clock) => {
                if let Err(e) = clock.rearm_alert(generation) {
                    warn!("Failed to rearm alert sound: {}", e);
                }
            }
            None => debug!("Clock dropped before rearm {}", generation),
        }
    });
    Some(handle)
}
