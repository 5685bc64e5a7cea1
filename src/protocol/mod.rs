//! Protocol Module
//!
//! Defines the wire protocol between the PC and the Fobos controller.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │  N (1)   │        Data (N bytes)       │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0:      ECHO            - heartbeat, response mirrors the request
//! - 1..=7:  system          - IP, mask, port, DHCP, timeout, reset, MAC
//! - 10..=14: query          - sensors, generator, servo, ready, firmware
//! - 20, 21: execution       - homing, scan start/cancel
//! - 30:     error report    - C-arm barrier
//! - 255:    ACKNOWLEDGE     - generic status from the device
//!
//! ### Status Codes
//! - 0: OK
//! - 1: TRANSMIT_ERROR
//! - 2: BUSY
//! - 3: NOT_READY
//! - 4: BAD_PARAMETERS
//! - 5: NO_RESPONSE
//! - 6: UNKNOWN_COMMAND

mod codec;
mod command;
pub mod defaults;
mod packet;
mod registry;
mod status;

pub use codec::{decode, encode, encode_packet, read_frame, write_frame};
pub use command::CommandCode;
pub use packet::{Packet, BUFFER_CAPACITY, HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use registry::{
    Category, CommandDescriptor, CommandRegistry, CommandShape, PayloadCheck, Shape, REGISTRY,
};
pub use status::StatusCode;
