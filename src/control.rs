// src/control.rs

//! Control channel between the control source and the frame scheduler.
//!
//! Producers push [`Command`]s without ever blocking; the scheduler drains them
//! between ticks with [`ControlReceiver::try_drain_until`], which is the only
//! place the render loop waits.

pub mod line;
pub mod stdin_source;

use log::trace;
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Instant;

/// Replacement parameters for one named color channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorUpdate {
    pub name: String,
    pub speed: f64,
    pub freq: f64,
}

impl ColorUpdate {
    pub fn new(name: impl Into<String>, speed: f64, freq: f64) -> Self {
        Self {
            name: name.into(),
            speed,
            freq,
        }
    }
}

/// Messages accepted by the render loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ColorUpdate(ColorUpdate),
    Quit,
}

/// The other end of the control channel has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

impl fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "control channel closed")
    }
}

impl std::error::Error for ChannelClosed {}

/// Producer half. Cloneable so the stdin source and the signal watcher can share it.
#[derive(Debug, Clone)]
pub struct ControlSender {
    tx: Sender<Command>,
}

impl ControlSender {
    /// Enqueues a command. Never blocks; fails only once the scheduler is gone.
    pub fn push(&self, command: Command) -> Result<(), ChannelClosed> {
        self.tx.send(command).map_err(|_| ChannelClosed)
    }
}

/// Consumer half, owned by the frame scheduler.
#[derive(Debug)]
pub struct ControlReceiver {
    rx: Receiver<Command>,
}

impl ControlReceiver {
    /// Returns every command available by `deadline`, in arrival order.
    ///
    /// Blocks only while nothing is queued and the deadline has not passed. Once at
    /// least one command is in hand, whatever else is already queued is collected
    /// without waiting and the batch is returned. An empty batch is the normal
    /// outcome of a quiet tick.
    ///
    /// Returns `Err(ChannelClosed)` when every producer is gone and nothing is left
    /// to deliver. Commands queued before the disconnect are still returned first.
    pub fn try_drain_until(&self, deadline: Instant) -> Result<Vec<Command>, ChannelClosed> {
        let mut commands = Vec::new();

        if self.drain_ready(&mut commands) {
            return Self::finish(commands);
        }
        if !commands.is_empty() {
            return Ok(commands);
        }

        let timeout = deadline.saturating_duration_since(Instant::now());
        if timeout.is_zero() {
            return Ok(commands);
        }

        match self.rx.recv_timeout(timeout) {
            Ok(command) => {
                commands.push(command);
                // A disconnect right after this batch is reported on the next call.
                self.drain_ready(&mut commands);
                trace!("ControlReceiver: drained {} commands", commands.len());
                Ok(commands)
            }
            Err(RecvTimeoutError::Timeout) => Ok(commands),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelClosed),
        }
    }

    /// Moves everything already queued into `out`. Returns `true` if the channel
    /// turned out to be disconnected.
    fn drain_ready(&self, out: &mut Vec<Command>) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(command) => out.push(command),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
    }

    fn finish(commands: Vec<Command>) -> Result<Vec<Command>, ChannelClosed> {
        if commands.is_empty() {
            Err(ChannelClosed)
        } else {
            Ok(commands)
        }
    }
}

/// Creates an unbounded control channel.
pub fn control_channel() -> (ControlSender, ControlReceiver) {
    let (tx, rx) = mpsc::channel();
    (ControlSender { tx }, ControlReceiver { rx })
}
