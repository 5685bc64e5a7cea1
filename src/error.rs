//! Error types for fobos-link
//!
//! Provides a unified error type for all operations.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::StatusCode;

/// Result type alias using FobosError
pub type Result<T> = std::result::Result<T, FobosError>;

/// Unified error type for fobos-link operations
#[derive(Debug, Error)]
pub enum FobosError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    #[error("Truncated frame: expected {expected} bytes, got {available}")]
    Truncated { expected: usize, available: usize },

    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Payload too large: {0} bytes (max 255)")]
    PayloadTooLarge(usize),

    // -------------------------------------------------------------------------
    // Registry / Usage Errors
    // -------------------------------------------------------------------------
    #[error("Unknown command code: {0}")]
    UnknownCommand(u8),

    #[error("Invalid payload for command {command}: {reason}")]
    InvalidPayload { command: u8, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Exchange Errors
    // -------------------------------------------------------------------------
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Echo mismatch: sent {sent:02x?}, received {received:02x?}")]
    EchoMismatch { sent: Vec<u8>, received: Vec<u8> },

    #[error("Device error: {0}")]
    DeviceError(StatusCode),

    #[error("No response to command {command} within {after:?}")]
    Timeout { command: u8, after: Duration },

    #[error("Unexpected response for command {0}")]
    UnexpectedResponse(u8),

    // -------------------------------------------------------------------------
    // Link Errors
    // -------------------------------------------------------------------------
    #[error("Link busy: a request is already awaiting its response")]
    LinkBusy,

    #[error("Link closed")]
    LinkClosed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FobosError {
    /// Whether a caller may reasonably issue the same request again.
    ///
    /// Timeouts and transient device conditions qualify; usage errors,
    /// framing errors and a closed link do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FobosError::Timeout { .. } => true,
            FobosError::DeviceError(status) => matches!(
                status,
                StatusCode::Busy | StatusCode::TransmitError | StatusCode::NoResponse
            ),
            _ => false,
        }
    }
}
