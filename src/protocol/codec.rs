//! Frame codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │  N (1)   │        Data (N bytes)       │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! Both directions use the same layout. Multi-byte values inside the data
//! are big-endian. Frame boundaries are found by reading exactly `2 + N`
//! bytes; the stream carries no delimiter or checksum.

use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use super::packet::{Packet, HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
use crate::error::{FobosError, Result};

// =============================================================================
// Buffer Encoding/Decoding
// =============================================================================

/// Encode a command and payload to bytes
///
/// Format: cmd (1) + payload_len (1) + payload
pub fn encode(command: u8, payload: &[u8]) -> Result<Bytes> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FobosError::PayloadTooLarge(payload.len()));
    }

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u8(command);
    frame.put_u8(payload.len() as u8);
    frame.put_slice(payload);

    Ok(frame.freeze())
}

/// Encode an already validated packet
pub fn encode_packet(packet: &Packet) -> Bytes {
    let mut frame = BytesMut::with_capacity(packet.encoded_len());
    frame.put_u8(packet.command());
    frame.put_u8(packet.len());
    frame.put_slice(packet.payload());
    frame.freeze()
}

/// Decode exactly one frame from bytes
///
/// The slice must hold one complete frame and nothing else.
pub fn decode(bytes: &[u8]) -> Result<Packet> {
    if bytes.len() < HEADER_SIZE {
        return Err(FobosError::Truncated {
            expected: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    if bytes.len() > MAX_FRAME_SIZE {
        return Err(FobosError::Malformed(format!(
            "Frame of {} bytes exceeds the {} byte ceiling",
            bytes.len(),
            MAX_FRAME_SIZE
        )));
    }

    let command = bytes[0];
    let payload_len = bytes[1] as usize;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(FobosError::Truncated {
            expected: total_len,
            available: bytes.len(),
        });
    }

    if bytes.len() > total_len {
        return Err(FobosError::Malformed(format!(
            "Declared length {} but {} payload bytes present",
            payload_len,
            bytes.len() - HEADER_SIZE
        )));
    }

    Packet::new(command, Bytes::copy_from_slice(&bytes[HEADER_SIZE..total_len]))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete frame from a stream
///
/// Blocks until a whole frame has arrived. A stream that ends before the
/// first header byte yields an `UnexpectedEof` I/O error; one that ends
/// inside a frame yields `Truncated`.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Packet> {
    let mut header = [0u8; HEADER_SIZE];
    let got = read_full(reader, &mut header)?;
    if got == 0 {
        return Err(FobosError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stream closed",
        )));
    }
    if got < HEADER_SIZE {
        return Err(FobosError::Truncated {
            expected: HEADER_SIZE,
            available: got,
        });
    }

    let payload_len = header[1] as usize;
    let mut payload = vec![0u8; payload_len];
    if payload_len > 0 {
        let got = read_full(reader, &mut payload)?;
        if got < payload_len {
            return Err(FobosError::Truncated {
                expected: HEADER_SIZE + payload_len,
                available: HEADER_SIZE + got,
            });
        }
    }

    Packet::new(header[0], payload)
}

/// Write a frame to a stream
pub fn write_frame<W: Write>(writer: &mut W, packet: &Packet) -> Result<()> {
    writer.write_all(&encode_packet(packet))?;
    writer.flush()?;
    Ok(())
}

/// Fill `buf` unless the stream ends first; returns the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
