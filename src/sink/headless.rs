//! Headless display sink: accepts frames and only counts them.

use crate::frame::Frame;
use crate::sink::{DisplaySink, SinkError};
use log::{debug, info, trace};

/// How often (in frames) the headless sink logs progress.
const PROGRESS_LOG_INTERVAL: u64 = 240;

pub struct HeadlessSink {
    reachable: bool,
    connected: bool,
    frames_received: u64,
    last_frame_len: usize,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self {
            reachable: true,
            connected: false,
            frames_received: 0,
            last_frame_len: 0,
        }
    }

    /// A sink whose probe always fails.
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new()
        }
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn last_frame_len(&self) -> usize {
        self.last_frame_len
    }
}

impl Default for HeadlessSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for HeadlessSink {
    fn connect_probe(&mut self) -> bool {
        info!("HeadlessSink: probe -> reachable={}", self.reachable);
        self.connected = self.reachable;
        self.reachable
    }

    fn send_frame(&mut self, frame: &Frame) -> Result<(), SinkError> {
        if !self.connected {
            return Err(SinkError::NotConnected);
        }
        self.frames_received += 1;
        self.last_frame_len = frame.len();
        trace!("HeadlessSink: frame {} ({} px)", self.frames_received, frame.len());
        if self.frames_received % PROGRESS_LOG_INTERVAL == 0 {
            debug!("HeadlessSink: {} frames received", self.frames_received);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgb;

    #[test]
    fn counts_frames_after_probe() {
        let mut sink = HeadlessSink::new();
        assert!(sink.connect_probe());
        let frame = Frame::from_pixels(vec![Rgb::default(); 7]);
        sink.send_frame(&frame).unwrap();
        sink.send_frame(&frame).unwrap();
        assert_eq!(sink.frames_received(), 2);
        assert_eq!(sink.last_frame_len(), 7);
    }

    #[test]
    fn unreachable_sink_rejects_frames() {
        let mut sink = HeadlessSink::unreachable();
        assert!(!sink.connect_probe());
        assert!(matches!(
            sink.send_frame(&Frame::default()),
            Err(SinkError::NotConnected)
        ));
        assert_eq!(sink.frames_received(), 0);
    }
}
