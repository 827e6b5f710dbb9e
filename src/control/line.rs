// src/control/line.rs

//! Plain-text control lines: `quit`, or `<channel> <speed> <freq>`.
//!
//! Channel names are passed through untouched; the parameter store decides
//! whether they exist.

use crate::control::{ColorUpdate, Command};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// Wrong number of fields for a color update.
    FieldCount(usize),
    /// A numeric field did not parse.
    BadNumber(String),
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::FieldCount(n) => {
                write!(f, "expected '<channel> <speed> <freq>', got {} fields", n)
            }
            LineError::BadNumber(field) => write!(f, "'{}' is not a number", field),
        }
    }
}

impl std::error::Error for LineError {}

/// Parses one control line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_command_line(line: &str) -> Result<Option<Command>, LineError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        [word] if word.eq_ignore_ascii_case("quit") => Ok(Some(Command::Quit)),
        [name, speed, freq] => Ok(Some(Command::ColorUpdate(ColorUpdate::new(
            *name,
            parse_number(speed)?,
            parse_number(freq)?,
        )))),
        other => Err(LineError::FieldCount(other.len())),
    }
}

fn parse_number(field: &str) -> Result<f64, LineError> {
    field
        .parse::<f64>()
        .map_err(|_| LineError::BadNumber(field.to_string()))
}
