//! Status definitions
//!
//! Outcome codes carried in the first data byte of every non-echo response.

use std::fmt;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    Ok = 0,
    TransmitError = 1,
    Busy = 2,
    NotReady = 3,
    BadParameters = 4,
    NoResponse = 5,
    UnknownCommand = 6,
}

impl StatusCode {
    /// Parse a status byte; `None` for values outside 0..=6
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(StatusCode::Ok),
            1 => Some(StatusCode::TransmitError),
            2 => Some(StatusCode::Busy),
            3 => Some(StatusCode::NotReady),
            4 => Some(StatusCode::BadParameters),
            5 => Some(StatusCode::NoResponse),
            6 => Some(StatusCode::UnknownCommand),
            _ => None,
        }
    }

    /// Wire value
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StatusCode::Ok => "ok",
            StatusCode::TransmitError => "transmit error",
            StatusCode::Busy => "device busy",
            StatusCode::NotReady => "device not ready",
            StatusCode::BadParameters => "bad parameters",
            StatusCode::NoResponse => "device not responding",
            StatusCode::UnknownCommand => "unknown command",
        };
        write!(f, "{} ({})", text, self.code())
    }
}
