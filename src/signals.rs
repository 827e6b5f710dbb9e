// src/signals.rs
//! Turns SIGINT / SIGTERM into a `Quit` command.
//!
//! The signals are blocked before any other thread is spawned, so every thread
//! inherits the mask and only the watcher thread ever sees them (via `sigwait`).

use crate::control::{Command, ControlSender};
use anyhow::{Context, Result};
use log::*;
use nix::sys::signal::{SigSet, Signal};
use std::thread::{self, JoinHandle};

/// Blocks SIGINT and SIGTERM on the calling thread and returns the set.
///
/// Call from `main` before spawning threads.
pub fn block_termination_signals() -> Result<SigSet> {
    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTERM);
    set.thread_block()
        .context("Failed to block termination signals")?;
    Ok(set)
}

/// Spawns a detached thread that waits for one signal in `set` and pushes `Quit`.
pub fn spawn_signal_watcher(set: SigSet, control: ControlSender) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || match set.wait() {
            Ok(signal) => {
                info!("SignalWatcher: received {:?}, requesting quit", signal);
                if control.push(Command::Quit).is_err() {
                    debug!("SignalWatcher: render loop already gone");
                }
            }
            Err(e) => error!("SignalWatcher: sigwait failed: {}", e),
        })
        .context("Failed to spawn signal watcher thread")
}
