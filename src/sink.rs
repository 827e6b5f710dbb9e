// src/sink.rs
//! DisplaySink trait - the boundary between the render loop and whatever shows the pixels.
//!
//! ## Lifecycle
//! 1. `connect_probe()` - called exactly once at startup, before the render loop
//! 2. `send_frame()` - called once per tick with the frame in pixel order
//! 3. `Drop` - cleanup (no explicit shutdown call)
//!
//! A failed `send_frame` is terminal: the render loop stops and reports the
//! failure instead of retrying against a broken link.

pub mod headless;
pub mod opc;

pub use headless::HeadlessSink;
pub use opc::OpcSink;

use crate::config::SinkConfig;
use crate::frame::Frame;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum SinkError {
    /// `send_frame` was called without a successful probe.
    NotConnected,
    /// The underlying transport failed.
    Io(io::Error),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::NotConnected => write!(f, "display sink not connected"),
            SinkError::Io(e) => write!(f, "display sink I/O error: {}", e),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::NotConnected => None,
            SinkError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        SinkError::Io(e)
    }
}

/// Downstream consumer of rendered frames.
pub trait DisplaySink {
    /// Checks once whether the sink is reachable. May open the underlying connection.
    fn connect_probe(&mut self) -> bool;

    /// Delivers one frame.
    fn send_frame(&mut self, frame: &Frame) -> Result<(), SinkError>;
}

/// Builds the sink described by the config. No connection is attempted here.
pub fn build_sink(config: &SinkConfig) -> Box<dyn DisplaySink + Send> {
    match config {
        SinkConfig::Opc { address, channel } => Box::new(OpcSink::new(address.clone(), *channel)),
        SinkConfig::Headless => Box::new(HeadlessSink::new()),
    }
}
