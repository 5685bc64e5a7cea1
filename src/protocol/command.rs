//! Command definitions
//!
//! Command codes understood by the controller.

use std::fmt;

use crate::error::FobosError;

/// Command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    Echo = 0,

    // System
    SetIp = 1,
    SetMask = 2,
    SetPort = 3,
    SetDhcp = 4,
    SetTimeout = 5,
    Reset = 6,
    GetMac = 7,

    // Query
    SensorsState = 10,
    GeneratorState = 11,
    ServoPlacement = 12,
    DeviceReady = 13,
    FirmwareVersion = 14,

    // Execution
    BasingServo = 20,
    WorkControl = 21,

    // Error reports
    BarrierError = 30,

    Acknowledge = 255,
}

impl CommandCode {
    /// Every defined command, in code order
    pub const ALL: [CommandCode; 17] = [
        CommandCode::Echo,
        CommandCode::SetIp,
        CommandCode::SetMask,
        CommandCode::SetPort,
        CommandCode::SetDhcp,
        CommandCode::SetTimeout,
        CommandCode::Reset,
        CommandCode::GetMac,
        CommandCode::SensorsState,
        CommandCode::GeneratorState,
        CommandCode::ServoPlacement,
        CommandCode::DeviceReady,
        CommandCode::FirmwareVersion,
        CommandCode::BasingServo,
        CommandCode::WorkControl,
        CommandCode::BarrierError,
        CommandCode::Acknowledge,
    ];

    /// Wire value
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human readable name for logs
    pub fn name(self) -> &'static str {
        match self {
            CommandCode::Echo => "echo",
            CommandCode::SetIp => "set-ip",
            CommandCode::SetMask => "set-mask",
            CommandCode::SetPort => "set-port",
            CommandCode::SetDhcp => "set-dhcp",
            CommandCode::SetTimeout => "set-timeout",
            CommandCode::Reset => "reset",
            CommandCode::GetMac => "get-mac",
            CommandCode::SensorsState => "sensors-state",
            CommandCode::GeneratorState => "generator-state",
            CommandCode::ServoPlacement => "servo-placement",
            CommandCode::DeviceReady => "device-ready",
            CommandCode::FirmwareVersion => "firmware-version",
            CommandCode::BasingServo => "basing-servo",
            CommandCode::WorkControl => "work-control",
            CommandCode::BarrierError => "barrier-error",
            CommandCode::Acknowledge => "acknowledge",
        }
    }
}

impl TryFrom<u8> for CommandCode {
    type Error = FobosError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        CommandCode::ALL
            .iter()
            .copied()
            .find(|cmd| cmd.code() == value)
            .ok_or(FobosError::UnknownCommand(value))
    }
}

impl From<CommandCode> for u8 {
    fn from(cmd: CommandCode) -> Self {
        cmd.code()
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
