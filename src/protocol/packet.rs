//! Packet definition
//!
//! One owned frame value: command code plus payload bytes.

use bytes::Bytes;

use crate::error::{FobosError, Result};

/// Header size: 1 byte command + 1 byte payload length
pub const HEADER_SIZE: usize = 2;

/// Largest payload the length byte can describe
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Capacity of the controller's receive buffer behind the header
pub const BUFFER_CAPACITY: usize = 256;

/// Hard ceiling for one frame on the wire (header + buffer)
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + BUFFER_CAPACITY;

/// A single protocol packet
///
/// The length byte is never stored; it is always derived from the payload,
/// so a `Packet` cannot disagree with itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    command: u8,
    payload: Bytes,
}

impl Packet {
    /// Create a packet, rejecting payloads longer than 255 bytes
    pub fn new(command: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FobosError::PayloadTooLarge(payload.len()));
        }
        Ok(Self { command, payload })
    }

    /// Create a packet with no payload
    pub fn empty(command: u8) -> Self {
        Self {
            command,
            payload: Bytes::new(),
        }
    }

    /// Command code
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Payload bytes
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Value of the length byte
    pub fn len(&self) -> u8 {
        // Bounded by MAX_PAYLOAD_SIZE at construction
        self.payload.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Size of this packet on the wire
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Split into command code and payload
    pub fn into_parts(self) -> (u8, Bytes) {
        (self.command, self.payload)
    }
}
