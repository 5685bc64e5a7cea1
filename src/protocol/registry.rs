//! Command registry
//!
//! Static table mapping every command code to its payload contract.
//!
//! ## Shapes
//! - `Exact(n)`: exactly `n` data bytes
//! - `Variable`: any length 0..=255
//! - `StatusPlusVariable`: a status byte followed by 0..=254 bytes
//!
//! Responses whose status byte is not `ok` are accepted at any length of at
//! least one byte: a failing device may omit the data it would otherwise send.

use super::command::CommandCode;
use super::packet::MAX_PAYLOAD_SIZE;
use super::status::StatusCode;
use crate::error::{FobosError, Result};

/// Payload length contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Exact(usize),
    Variable,
    StatusPlusVariable,
}

impl Shape {
    /// Whether a payload of `len` bytes satisfies this shape
    pub fn accepts(self, len: usize) -> bool {
        match self {
            Shape::Exact(n) => len == n,
            Shape::Variable => len <= MAX_PAYLOAD_SIZE,
            Shape::StatusPlusVariable => (1..=MAX_PAYLOAD_SIZE).contains(&len),
        }
    }
}

/// Command family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Echo,
    System,
    Query,
    Execution,
    ErrorReport,
    Acknowledge,
}

/// Request and response shapes of one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandShape {
    /// `None` for commands only the device originates
    pub request: Option<Shape>,
    pub response: Shape,
}

/// Value-level check on a request payload whose length already matched
pub type PayloadCheck = fn(&[u8]) -> std::result::Result<(), String>;

/// Immutable description of one command
#[derive(Clone, Copy)]
pub struct CommandDescriptor {
    pub command: CommandCode,
    pub category: Category,
    pub shape: CommandShape,
    pub check: Option<PayloadCheck>,
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("command", &self.command)
            .field("category", &self.category)
            .field("shape", &self.shape)
            .field("check", &self.check.is_some())
            .finish()
    }
}

impl CommandDescriptor {
    const fn new(
        command: CommandCode,
        category: Category,
        request: Option<Shape>,
        response: Shape,
        check: Option<PayloadCheck>,
    ) -> Self {
        Self {
            command,
            category,
            shape: CommandShape { request, response },
            check,
        }
    }

    /// Echo responses mirror the request and carry no status byte
    pub fn has_status(&self) -> bool {
        self.category != Category::Echo
    }
}

// =============================================================================
// Value checks
// =============================================================================

fn check_dhcp(payload: &[u8]) -> std::result::Result<(), String> {
    match payload[0] {
        0 | 1 => Ok(()),
        other => Err(format!("DHCP flag must be 0 or 1, got {}", other)),
    }
}

fn check_trigger(payload: &[u8]) -> std::result::Result<(), String> {
    match payload[0] {
        1 => Ok(()),
        other => Err(format!("trigger byte must be 1, got {}", other)),
    }
}

fn check_timeout(payload: &[u8]) -> std::result::Result<(), String> {
    match u16::from_be_bytes([payload[0], payload[1]]) {
        0 => Err("timeout must be at least 1 ms".to_string()),
        _ => Ok(()),
    }
}

fn check_work_control(payload: &[u8]) -> std::result::Result<(), String> {
    if payload[0] > 1 {
        return Err(format!("action must be 0 (cancel) or 1 (start), got {}", payload[0]));
    }
    if !(1..=3).contains(&payload[1]) {
        return Err(format!("scan mode must be 1..=3, got {}", payload[1]));
    }
    Ok(())
}

// =============================================================================
// Registry
// =============================================================================

#[rustfmt::skip]
static DESCRIPTORS: [CommandDescriptor; 17] = [
    CommandDescriptor::new(CommandCode::Echo, Category::Echo, Some(Shape::Variable), Shape::Variable, None),
    CommandDescriptor::new(CommandCode::SetIp, Category::System, Some(Shape::Exact(4)), Shape::Exact(1), None),
    CommandDescriptor::new(CommandCode::SetMask, Category::System, Some(Shape::Exact(4)), Shape::Exact(1), None),
    CommandDescriptor::new(CommandCode::SetPort, Category::System, Some(Shape::Exact(2)), Shape::Exact(1), None),
    CommandDescriptor::new(CommandCode::SetDhcp, Category::System, Some(Shape::Exact(1)), Shape::Exact(1), Some(check_dhcp)),
    CommandDescriptor::new(CommandCode::SetTimeout, Category::System, Some(Shape::Exact(2)), Shape::Exact(1), Some(check_timeout)),
    CommandDescriptor::new(CommandCode::Reset, Category::System, Some(Shape::Exact(1)), Shape::Exact(1), Some(check_trigger)),
    CommandDescriptor::new(CommandCode::GetMac, Category::System, Some(Shape::Exact(0)), Shape::Exact(7), None),
    CommandDescriptor::new(CommandCode::SensorsState, Category::Query, Some(Shape::Exact(0)), Shape::Exact(4), None),
    CommandDescriptor::new(CommandCode::GeneratorState, Category::Query, Some(Shape::Exact(0)), Shape::Exact(2), None),
    CommandDescriptor::new(CommandCode::ServoPlacement, Category::Query, Some(Shape::Exact(0)), Shape::Exact(4), None),
    CommandDescriptor::new(CommandCode::DeviceReady, Category::Query, Some(Shape::Exact(0)), Shape::Exact(2), None),
    CommandDescriptor::new(CommandCode::FirmwareVersion, Category::Query, Some(Shape::Exact(0)), Shape::StatusPlusVariable, None),
    CommandDescriptor::new(CommandCode::BasingServo, Category::Execution, Some(Shape::Exact(1)), Shape::Exact(1), Some(check_trigger)),
    CommandDescriptor::new(CommandCode::WorkControl, Category::Execution, Some(Shape::Exact(2)), Shape::Exact(1), Some(check_work_control)),
    CommandDescriptor::new(CommandCode::BarrierError, Category::ErrorReport, Some(Shape::Exact(0)), Shape::Exact(2), None),
    CommandDescriptor::new(CommandCode::Acknowledge, Category::Acknowledge, None, Shape::Exact(1), None),
];

/// Lookup table for command contracts
pub struct CommandRegistry {
    descriptors: &'static [CommandDescriptor],
}

/// The registry of the controller's command set
pub static REGISTRY: CommandRegistry = CommandRegistry {
    descriptors: &DESCRIPTORS,
};

impl CommandRegistry {
    /// Look up the descriptor for a wire code
    pub fn descriptor(&self, code: u8) -> Result<&'static CommandDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.command.code() == code)
            .ok_or(FobosError::UnknownCommand(code))
    }

    /// Request and response shapes for a wire code
    pub fn shape_of(&self, code: u8) -> Result<CommandShape> {
        self.descriptor(code).map(|d| d.shape)
    }

    /// Validate an outbound payload before any byte is written
    pub fn validate_request(&self, code: u8, payload: &[u8]) -> Result<&'static CommandDescriptor> {
        let descriptor = self.descriptor(code)?;

        let shape = descriptor.shape.request.ok_or_else(|| FobosError::InvalidPayload {
            command: code,
            reason: format!("{} is only sent by the device", descriptor.command.name()),
        })?;

        if !shape.accepts(payload.len()) {
            return Err(FobosError::InvalidPayload {
                command: code,
                reason: format!(
                    "{} expects {:?}, got {} bytes",
                    descriptor.command.name(),
                    shape,
                    payload.len()
                ),
            });
        }

        if let Some(check) = descriptor.check {
            check(payload).map_err(|reason| FobosError::InvalidPayload {
                command: code,
                reason,
            })?;
        }

        Ok(descriptor)
    }

    /// Validate an inbound payload against the response contract
    ///
    /// Returns the decoded status, or `None` for echo responses.
    pub fn validate_response(
        &self,
        descriptor: &CommandDescriptor,
        payload: &[u8],
    ) -> Result<Option<StatusCode>> {
        let name = descriptor.command.name();

        if !descriptor.has_status() {
            return if descriptor.shape.response.accepts(payload.len()) {
                Ok(None)
            } else {
                Err(FobosError::ProtocolViolation(format!(
                    "{} response of {} bytes",
                    name,
                    payload.len()
                )))
            };
        }

        let Some(&status_byte) = payload.first() else {
            return Err(FobosError::ProtocolViolation(format!(
                "{} response is missing its status byte",
                name
            )));
        };

        let status = StatusCode::from_byte(status_byte).ok_or_else(|| {
            FobosError::ProtocolViolation(format!(
                "{} response carries unknown status {}",
                name, status_byte
            ))
        })?;

        if status.is_ok() && !descriptor.shape.response.accepts(payload.len()) {
            return Err(FobosError::ProtocolViolation(format!(
                "{} response expects {:?}, got {} bytes",
                name,
                descriptor.shape.response,
                payload.len()
            )));
        }

        Ok(Some(status))
    }
}
