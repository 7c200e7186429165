//! Alert sound backends
//!
//! A sound is played once per interval boundary. After playing it stays
//! spent until it is rearmed, which the clock does a few seconds later or
//! on reset.

use std::{
    io::Write,
    process::Stdio,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};
use tokio::{process::Command, runtime::Handle, task::JoinHandle};
use tracing::{debug, info, warn};

/// Playable alert resource owned by the presentation layer
pub trait AlertSound: Send + Sync {
    /// Play the alert once. Has no audible effect until rearmed.
    fn play(&self);

    /// Return the resource to a playable state, cutting off any playback
    fn rearm(&self);
}

/// Rings the terminal bell on stdout
#[derive(Debug)]
pub struct TerminalBell {
    armed: AtomicBool,
}

impl TerminalBell {
    pub fn new() -> Self {
        Self {
            armed: AtomicBool::new(true),
        }
    }
}

impl Default for TerminalBell {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSound for TerminalBell {
    fn play(&self) {
        if !self.armed.swap(false, Ordering::SeqCst) {
            debug!("Terminal bell not rearmed yet, skipping");
            return;
        }

        info!("Ringing terminal bell");
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            warn!("Failed to ring terminal bell: {}", e);
        }
    }

    fn rearm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

/// Plays the alert by running an external player, e.g. `paplay beep.wav`
#[derive(Debug)]
pub struct CommandSound {
    program: String,
    args: Vec<String>,
    armed: AtomicBool,
    playback: Mutex<Option<JoinHandle<()>>>,
}

impl CommandSound {
    /// Build from a whitespace separated command line.
    /// Returns `None` for an empty command.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;

        Some(Self {
            program,
            args: parts.collect(),
            armed: AtomicBool::new(true),
            playback: Mutex::new(None),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl AlertSound for CommandSound {
    fn play(&self) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("No tokio runtime to run {}, skipping alert", self.program);
            return;
        };

        if !self.armed.swap(false, Ordering::SeqCst) {
            debug!("Alert command not rearmed yet, skipping");
            return;
        }

        info!("Playing alert with {}", self.program);
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let program = self.program.clone();
        let handle = runtime.spawn(async move {
            match command.output().await {
                Ok(output) if output.status.success() => {
                    debug!("{} finished playing", program);
                }
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    warn!("{} failed: {}", program, stderr.trim());
                }
                Err(e) => warn!("Failed to execute {}: {}", program, e),
            }
        });

        match self.playback.lock() {
            Ok(mut playback) => {
                if let Some(previous) = playback.replace(handle) {
                    previous.abort();
                }
            }
            Err(e) => warn!("Failed to lock alert playback: {}", e),
        }
    }

    fn rearm(&self) {
        // Dropping the aborted output future kills the player process.
        match self.playback.lock() {
            Ok(mut playback) => {
                if let Some(handle) = playback.take() {
                    handle.abort();
                }
            }
            Err(e) => warn!("Failed to lock alert playback: {}", e),
        }
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_line() {
        let sound = CommandSound::from_command_line("paplay  /tmp/beep.wav").unwrap();
        assert_eq!(sound.program(), "paplay");
        assert_eq!(sound.args, ["/tmp/beep.wav".to_string()]);
    }

    #[test]
    fn empty_command_line_is_rejected() {
        assert!(CommandSound::from_command_line("   ").is_none());
    }

    #[test]
    fn bell_is_spent_until_rearmed() {
        let bell = TerminalBell::new();
        bell.play();
        assert!(!bell.armed.load(Ordering::SeqCst));
        bell.rearm();
        assert!(bell.armed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn command_sound_plays_once_per_arm() {
        let sound = CommandSound::from_command_line("true").unwrap();
        sound.play();
        assert!(!sound.armed.load(Ordering::SeqCst));
        assert!(sound.playback.lock().unwrap().is_some());

        sound.rearm();
        assert!(sound.armed.load(Ordering::SeqCst));
        assert!(sound.playback.lock().unwrap().is_none());
    }

    #[test]
    fn command_sound_without_runtime_does_not_panic() {
        let sound = CommandSound::from_command_line("true").unwrap();
        sound.play();
        assert!(sound.armed.load(Ordering::SeqCst));
        assert!(sound.playback.lock().unwrap().is_none());
    }
}
