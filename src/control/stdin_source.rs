// src/control/stdin_source.rs

//! Control source that reads control lines from a reader (stdin in the binary)
//! on its own thread and forwards them to the control channel.

use crate::control::line::parse_command_line;
use crate::control::ControlSender;
use anyhow::{Context, Result};
use log::*;
use std::io::BufRead;
use std::thread::{self, JoinHandle};

/// Reads lines until EOF or until the scheduler stops listening.
///
/// Returns the number of commands forwarded.
pub fn forward_lines<R: BufRead>(reader: R, control: &ControlSender) -> usize {
    let mut forwarded = 0;
    for (line_no, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("ControlSource: read error, stopping: {}", e);
                break;
            }
        };
        match parse_command_line(&line) {
            Ok(Some(command)) => {
                debug!("ControlSource: line {} -> {:?}", line_no + 1, command);
                if control.push(command).is_err() {
                    info!("ControlSource: render loop gone, stopping");
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => warn!("ControlSource: dropping line {}: {}", line_no + 1, e),
        }
    }
    forwarded
}

/// Spawns the stdin reader thread.
///
/// EOF on stdin does not request shutdown; the process keeps rendering until a
/// `quit` line or a termination signal arrives.
pub fn spawn_stdin_source(control: ControlSender) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("control-stdin".to_string())
        .spawn(move || {
            info!("ControlSource: reading control lines from stdin");
            let stdin = std::io::stdin();
            let forwarded = forward_lines(stdin.lock(), &control);
            debug!("ControlSource: stdin closed after {} commands", forwarded);
        })
        .context("Failed to spawn stdin control thread")
}
