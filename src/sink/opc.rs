//! Open Pixel Control sink.
//!
//! Each frame goes out as one OPC "set pixel colours" message:
//!
//! ```text
//! [channel] [0x00] [len_hi] [len_lo] [r0 g0 b0 r1 g1 b1 ...]
//! ```
//!
//! where `len` is the byte length of the pixel data (`3 * n_pixels`).

use crate::frame::Frame;
use crate::sink::{DisplaySink, SinkError};
use log::*;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
/// A peer that stops reading for this long counts as a broken link.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
const CMD_SET_PIXEL_COLORS: u8 = 0;
const HEADER_LEN: usize = 4;

/// Largest pixel count that fits the 16-bit OPC length field.
pub const MAX_PIXELS: usize = u16::MAX as usize / 3;

pub struct OpcSink {
    address: String,
    channel: u8,
    write_timeout: Duration,
    stream: Option<TcpStream>,
    message: Vec<u8>,
}

impl OpcSink {
    pub fn new(address: impl Into<String>, channel: u8) -> Self {
        Self {
            address: address.into(),
            channel,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            stream: None,
            message: Vec::new(),
        }
    }

    /// Overrides how long a single frame write may block. Must be non-zero.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn connect(&self) -> io::Result<TcpStream> {
        let addrs: Vec<SocketAddr> = self.address.to_socket_addrs()?.collect();
        let mut last_err = io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' resolved to no addresses", self.address),
        );
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_write_timeout(Some(self.write_timeout))?;
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("OpcSink: connect to {} failed: {}", addr, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

/// Encodes `frame` as an OPC message into `out`, replacing its contents.
pub fn encode_message(channel: u8, frame: &Frame, out: &mut Vec<u8>) -> Result<(), SinkError> {
    if frame.len() > MAX_PIXELS {
        return Err(SinkError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "frame of {} pixels exceeds OPC limit of {}",
                frame.len(),
                MAX_PIXELS
            ),
        )));
    }
    let data_len = (frame.len() * 3) as u16;
    out.clear();
    out.reserve(HEADER_LEN + data_len as usize);
    out.push(channel);
    out.push(CMD_SET_PIXEL_COLORS);
    out.extend_from_slice(&data_len.to_be_bytes());
    frame.write_rgb_bytes(out);
    Ok(())
}

impl DisplaySink for OpcSink {
    fn connect_probe(&mut self) -> bool {
        match self.connect() {
            Ok(stream) => {
                info!("OpcSink: connected to {}", self.address);
                self.stream = Some(stream);
                true
            }
            Err(e) => {
                warn!("OpcSink: could not connect to {}: {}", self.address, e);
                self.stream = None;
                false
            }
        }
    }

    fn send_frame(&mut self, frame: &Frame) -> Result<(), SinkError> {
        encode_message(self.channel, frame, &mut self.message)?;
        let stream = self.stream.as_mut().ok_or(SinkError::NotConnected)?;
        if let Err(e) = stream.write_all(&self.message) {
            // The link is gone; later sends report NotConnected.
            self.stream = None;
            return Err(SinkError::Io(e));
        }
        trace!("OpcSink: sent {} bytes", self.message.len());
        Ok(())
    }
}
