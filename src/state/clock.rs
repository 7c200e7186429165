//! Clock driver: owns the state machine, its scheduler handles and the
//! alert sound

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, info};

use super::{
    machine::{TickOutcome, TimerMachine},
    DisplayState, Mode, TimerConfig, TimerState,
};
use crate::{
    services::AlertSound,
    tasks::{spawn_rearm, spawn_ticker},
};

/// Delay between an alert and rearming the sound for the next boundary
pub const REARM_DELAY: Duration = Duration::from_secs(5);

/// Notifications for event subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClockEvent {
    Started,
    Stopped,
    Reset,
    /// An interval ended; `mode` is the interval that just began
    Alert { mode: Mode },
    Rearm,
}

impl ClockEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClockEvent::Started => "started",
            ClockEvent::Stopped => "stopped",
            ClockEvent::Reset => "reset",
            ClockEvent::Alert { .. } => "alert",
            ClockEvent::Rearm => "rearm",
        }
    }
}

#[derive(Debug, Default)]
struct ClockInner {
    machine: TimerMachine,
    ticker: Option<JoinHandle<()>>,
    /// Identifies the current ticker; wake-ups from older tickers are ignored
    ticker_generation: u64,
    rearm: Option<JoinHandle<()>>,
    rearm_generation: u64,
}

impl ClockInner {
    fn cancel_ticker(&mut self) -> bool {
        self.ticker_generation += 1;
        self.machine.set_running(false);
        match self.ticker.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn cancel_rearm(&mut self) {
        self.rearm_generation += 1;
        if let Some(handle) = self.rearm.take() {
            handle.abort();
        }
    }
}

/// Session/break countdown driven by a tokio ticker task
pub struct PomodoroClock {
    inner: Mutex<ClockInner>,
    sound: Arc<dyn AlertSound>,
    display_tx: watch::Sender<DisplayState>,
    event_tx: broadcast::Sender<ClockEvent>,
}

impl PomodoroClock {
    /// Create an idle clock with default lengths
    pub fn new(sound: Arc<dyn AlertSound>) -> Arc<Self> {
        let inner = ClockInner::default();
        let (display_tx, _) = watch::channel(inner.machine.display_state());
        let (event_tx, _) = broadcast::channel(64);

        Arc::new(Self {
            inner: Mutex::new(inner),
            sound,
            display_tx,
            event_tx,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ClockInner>, String> {
        self.inner
            .lock()
            .map_err(|e| format!("Failed to lock clock state: {}", e))
    }

    fn publish(&self, machine: &TimerMachine) -> DisplayState {
        let display = machine.display_state();
        self.display_tx.send_replace(display.clone());
        display
    }

    fn notify(&self, event: ClockEvent) {
        if let Err(e) = self.event_tx.send(event) {
            debug!("No event subscribers for {}", e.0.name());
        }
    }

    /// Begin ticking. Calling this while already running keeps the
    /// existing ticker.
    pub fn start(self: &Arc<Self>) -> Result<DisplayState, String> {
        let mut inner = self.lock()?;
        self.start_locked(&mut inner)?;
        Ok(self.publish(&inner.machine))
    }

    /// Stop ticking, keeping the countdown where it is
    pub fn stop(&self) -> Result<DisplayState, String> {
        let mut inner = self.lock()?;
        self.stop_locked(&mut inner);
        Ok(self.publish(&inner.machine))
    }

    /// Stop if running, start otherwise
    pub fn toggle(self: &Arc<Self>) -> Result<DisplayState, String> {
        let mut inner = self.lock()?;

        if inner.ticker.is_some() {
            self.stop_locked(&mut inner);
        } else {
            self.start_locked(&mut inner)?;
        }
        Ok(self.publish(&inner.machine))
    }

    fn start_locked(self: &Arc<Self>, inner: &mut ClockInner) -> Result<(), String> {
        if inner.ticker.is_some() {
            debug!("Clock already running, keeping current ticker");
            return Ok(());
        }

        let generation = inner.ticker_generation + 1;
        let ticker = spawn_ticker(Arc::downgrade(self), generation)
            .ok_or_else(|| "Cannot start clock outside a tokio runtime".to_string())?;

        inner.ticker_generation = generation;
        inner.ticker = Some(ticker);
        inner.machine.set_running(true);

        info!("Clock started in {:?} mode", inner.machine.state.mode);
        self.notify(ClockEvent::Started);
        Ok(())
    }

    fn stop_locked(&self, inner: &mut ClockInner) {
        if inner.cancel_ticker() {
            info!(
                "Clock stopped with {} remaining",
                inner.machine.remaining_display()
            );
            self.notify(ClockEvent::Stopped);
        } else {
            debug!("Clock already stopped");
        }
    }

    /// Advance the countdown by one tick
    pub fn tick(self: &Arc<Self>) -> Result<TickOutcome, String> {
        let mut inner = self.lock()?;
        Ok(self.apply_tick(&mut inner))
    }

    /// Tick on behalf of the ticker with the given generation. Returns
    /// `None` once that ticker has been cancelled.
    pub(crate) fn scheduled_tick(
        self: &Arc<Self>,
        generation: u64,
    ) -> Result<Option<TickOutcome>, String> {
        let mut inner = self.lock()?;

        if inner.ticker_generation != generation || !inner.machine.state.running {
            debug!("Dropping wake-up from cancelled ticker {}", generation);
            return Ok(None);
        }
        Ok(Some(self.apply_tick(&mut inner)))
    }

    fn apply_tick(self: &Arc<Self>, inner: &mut ClockInner) -> TickOutcome {
        let outcome = inner.machine.tick();

        if let TickOutcome::Boundary { new_mode } = outcome {
            info!("Interval finished, switching to {}", new_mode.label());
            self.sound.play();

            inner.cancel_rearm();
            let generation = inner.rearm_generation;
            inner.rearm = spawn_rearm(Arc::downgrade(self), generation, REARM_DELAY);
            self.notify(ClockEvent::Alert { mode: new_mode });
        }

        self.publish(&inner.machine);
        outcome
    }

    /// Rearm the alert sound for the rearm task with the given generation
    pub(crate) fn rearm_alert(&self, generation: u64) -> Result<(), String> {
        let mut inner = self.lock()?;

        if inner.rearm_generation != generation {
            debug!("Skipping stale rearm {}", generation);
            return Ok(());
        }

        inner.rearm = None;
        self.sound.rearm();
        debug!("Alert sound rearmed");
        self.notify(ClockEvent::Rearm);
        Ok(())
    }

    /// Cancel all scheduled work and restore default lengths and state
    pub fn reset(&self) -> Result<DisplayState, String> {
        let mut inner = self.lock()?;

        inner.cancel_ticker();
        inner.cancel_rearm();
        self.sound.rearm();
        inner.machine.reset();

        info!("Clock reset to defaults");
        self.notify(ClockEvent::Reset);
        Ok(self.publish(&inner.machine))
    }

    /// Adjust the break length by `delta` minutes, clamped to 1..=60
    pub fn set_break_length(&self, delta: i32) -> Result<DisplayState, String> {
        let mut inner = self.lock()?;
        let length = inner.machine.set_break_length(delta);
        debug!("Break length is now {} min", length);
        Ok(self.publish(&inner.machine))
    }

    /// Adjust the session length by `delta` minutes, clamped to 1..=60
    pub fn set_session_length(&self, delta: i32) -> Result<DisplayState, String> {
        let mut inner = self.lock()?;
        let length = inner.machine.set_session_length(delta);
        debug!("Session length is now {} min", length);
        Ok(self.publish(&inner.machine))
    }

    pub fn remaining_display(&self) -> Result<String, String> {
        Ok(self.lock()?.machine.remaining_display())
    }

    pub fn display_state(&self) -> Result<DisplayState, String> {
        Ok(self.lock()?.machine.display_state())
    }

    pub fn timer_state(&self) -> Result<TimerState, String> {
        Ok(self.lock()?.machine.state.clone())
    }

    pub fn timer_config(&self) -> Result<TimerConfig, String> {
        Ok(self.lock()?.machine.config)
    }

    /// Consistent copy of configuration and countdown state
    pub fn snapshot(&self) -> Result<TimerMachine, String> {
        Ok(self.lock()?.machine.clone())
    }

    pub fn is_running(&self) -> Result<bool, String> {
        Ok(self.lock()?.ticker.is_some())
    }

    /// Receive every display change
    pub fn subscribe_display(&self) -> watch::Receiver<DisplayState> {
        self.display_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClockEvent> {
        self.event_tx.subscribe()
    }

    /// Cancel the ticker and any pending rearm. The clock stays usable.
    pub fn shutdown(&self) -> Result<(), String> {
        let mut inner = self.lock()?;
        inner.cancel_ticker();
        inner.cancel_rearm();
        self.publish(&inner.machine);
        info!("Clock scheduler shut down");
        Ok(())
    }
}

impl Drop for PomodoroClock {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        inner.cancel_ticker();
        inner.cancel_rearm();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    use super::*;

    #[derive(Default)]
    struct RecordingSound {
        plays: AtomicUsize,
        rearms: AtomicUsize,
    }

    impl RecordingSound {
        fn plays(&self) -> usize {
            self.plays.load(Ordering::SeqCst)
        }

        fn rearms(&self) -> usize {
            self.rearms.load(Ordering::SeqCst)
        }
    }

    impl AlertSound for RecordingSound {
        fn play(&self) {
            self.plays.fetch_add(1, Ordering::SeqCst);
        }

        fn rearm(&self) {
            self.rearms.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn clock() -> (Arc<PomodoroClock>, Arc<RecordingSound>) {
        let sound = Arc::new(RecordingSound::default());
        (PomodoroClock::new(sound.clone()), sound)
    }

    // Paused time auto-advances to the next timer whenever the runtime is
    // idle, so sleeping half a tick past a boundary lets the ticker run.

    #[tokio::test(start_paused = true)]
    async fn sixty_manual_ticks_flip_to_break() {
        let (clock, sound) = clock();
        let mut events = clock.subscribe_events();
        clock.start().unwrap();

        for _ in 0..60 {
            clock.tick().unwrap();
        }

        let state = clock.timer_state().unwrap();
        assert_eq!(state.mode, Mode::Break);
        assert_eq!(state.elapsed_ticks, 0);
        assert_eq!(sound.plays(), 1);

        assert_eq!(events.try_recv().unwrap(), ClockEvent::Started);
        assert_eq!(
            events.try_recv().unwrap(),
            ClockEvent::Alert { mode: Mode::Break }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_counts_down_in_real_seconds() {
        let (clock, sound) = clock();
        clock.start().unwrap();

        sleep(Duration::from_millis(59_500)).await;
        assert_eq!(clock.remaining_display().unwrap(), "00:01");
        assert_eq!(sound.plays(), 0);

        sleep(Duration::from_secs(1)).await;
        let display = clock.display_state().unwrap();
        assert_eq!(display.mode, Mode::Break);
        assert_eq!(display.mode_label, "Current Break");
        assert_eq!(display.remaining_display, "05:00");
        assert_eq!(sound.plays(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_follows_alert_after_delay() {
        let (clock, sound) = clock();
        clock.start().unwrap();

        sleep(Duration::from_millis(60_500)).await;
        assert_eq!(sound.plays(), 1);
        assert_eq!(sound.rearms(), 0);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(sound.rearms(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_pending_rearm() {
        let (clock, sound) = clock();
        clock.start().unwrap();
        sleep(Duration::from_millis(60_500)).await;

        let display = clock.reset().unwrap();
        assert_eq!(sound.rearms(), 1);
        assert_eq!(display.remaining_display, "01:00");
        assert!(!display.running);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(sound.rearms(), 1);
        assert_eq!(clock.timer_state().unwrap(), TimerState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restores_defaults_from_any_state() {
        let (clock, _sound) = clock();
        clock.set_session_length(7).unwrap();
        clock.set_break_length(-3).unwrap();
        clock.start().unwrap();
        sleep(Duration::from_millis(12_500)).await;

        clock.reset().unwrap();
        assert_eq!(clock.timer_state().unwrap(), TimerState::default());
        assert_eq!(clock.timer_config().unwrap(), TimerConfig::default());
        assert!(!clock.is_running().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_stop() {
        let (clock, _sound) = clock();
        clock.start().unwrap();
        sleep(Duration::from_millis(3_500)).await;

        clock.stop().unwrap();
        let stopped = clock.timer_state().unwrap();
        assert_eq!(stopped.elapsed_ticks, 3);
        assert!(!stopped.running);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(clock.timer_state().unwrap(), stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let (clock, _sound) = clock();
        clock.start().unwrap();
        sleep(Duration::from_millis(2_500)).await;

        let first = clock.stop().unwrap();
        let second = clock.stop().unwrap();
        assert_eq!(first, second);
        assert_eq!(clock.timer_state().unwrap().elapsed_ticks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_keeps_single_ticker() {
        let (clock, _sound) = clock();
        clock.start().unwrap();
        clock.start().unwrap();

        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(clock.timer_state().unwrap().elapsed_ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_is_ignored() {
        let (clock, _sound) = clock();
        clock.start().unwrap();
        clock.stop().unwrap();
        clock.start().unwrap();

        assert_eq!(clock.scheduled_tick(1).unwrap(), None);
        assert_eq!(clock.timer_state().unwrap().elapsed_ticks, 0);
        assert!(clock.scheduled_tick(3).unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_alternates_running() {
        let (clock, _sound) = clock();
        let display = clock.subscribe_display();

        assert!(clock.toggle().unwrap().running);
        assert!(display.borrow().running);
        assert!(!clock.toggle().unwrap().running);
        assert!(!display.borrow().running);
    }

    #[tokio::test(start_paused = true)]
    async fn lengths_saturate_while_running() {
        let (clock, _sound) = clock();
        clock.start().unwrap();

        for _ in 0..100 {
            let display = clock.set_session_length(1).unwrap();
            assert!(display.session_length <= 60);
        }
        assert_eq!(clock.timer_config().unwrap().session_length, 60);
        assert_eq!(clock.timer_state().unwrap().mode, Mode::Session);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_clock_cancels_ticker() {
        let (clock, sound) = clock();
        clock.start().unwrap();
        let weak = Arc::downgrade(&clock);
        drop(clock);

        assert!(weak.upgrade().is_none());
        sleep(Duration::from_secs(120)).await;
        assert_eq!(sound.plays(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_ticker_and_rearm() {
        let (clock, sound) = clock();
        clock.start().unwrap();
        sleep(Duration::from_millis(60_500)).await;

        clock.shutdown().unwrap();
        sleep(Duration::from_secs(10)).await;
        assert_eq!(sound.rearms(), 0);
        assert!(!clock.is_running().unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_toggles_cancel_out() {
        let runtime = tokio::runtime::Handle::current();

        for _ in 0..200 {
            let (clock, _sound) = clock();
            let barrier = Arc::new(std::sync::Barrier::new(2));

            let threads: Vec<_> = (0..2)
                .map(|_| {
                    let clock = Arc::clone(&clock);
                    let barrier = Arc::clone(&barrier);
                    let runtime = runtime.clone();
                    std::thread::spawn(move || {
                        let _guard = runtime.enter();
                        barrier.wait();
                        clock.toggle()
                    })
                })
                .collect();

            for thread in threads {
                assert!(thread.join().unwrap().is_ok());
            }
            assert!(!clock.is_running().unwrap());
            assert!(!clock.timer_state().unwrap().running);
        }
    }

    #[test]
    fn boundary_tick_without_runtime_keeps_clock_usable() {
        let (clock, sound) = clock();

        for _ in 0..60 {
            clock.tick().unwrap();
        }
        assert_eq!(sound.plays(), 1);
        assert_eq!(clock.display_state().unwrap().mode, Mode::Break);
        assert_eq!(clock.timer_state().unwrap().elapsed_ticks, 0);

        assert!(clock.toggle().is_err());
        assert!(!clock.is_running().unwrap());

        let display = clock.reset().unwrap();
        assert_eq!(display.remaining_display, "01:00");
        assert_eq!(sound.rearms(), 1);
    }
}
