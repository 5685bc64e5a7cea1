//! Typed payloads
//!
//! Arguments and results of the controller's commands.

use std::fmt;

use crate::error::{FobosError, Result};

/// Copy a fixed number of data bytes out of a response
fn fixed<const N: usize>(what: &str, data: &[u8]) -> Result<[u8; N]> {
    data.try_into().map_err(|_| {
        FobosError::ProtocolViolation(format!(
            "{} needs {} data bytes, got {}",
            what,
            N,
            data.len()
        ))
    })
}

// =============================================================================
// Work control
// =============================================================================

/// Which projections a scan acquires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScanMode {
    Front = 1,
    Side = 2,
    FrontAndSide = 3,
}

impl TryFrom<u8> for ScanMode {
    type Error = FobosError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(ScanMode::Front),
            2 => Ok(ScanMode::Side),
            3 => Ok(ScanMode::FrontAndSide),
            other => Err(FobosError::InvalidArgument(format!(
                "scan mode must be 1..=3, got {}",
                other
            ))),
        }
    }
}

/// First byte of a `WorkControl` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkAction {
    Cancel = 0,
    Start = 1,
}

impl TryFrom<u8> for WorkAction {
    type Error = FobosError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WorkAction::Cancel),
            1 => Ok(WorkAction::Start),
            other => Err(FobosError::InvalidArgument(format!(
                "work action must be 0 or 1, got {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Query results
// =============================================================================

/// Hardware address of the controller's Ethernet interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn from_data(data: &[u8]) -> Result<Self> {
        fixed::<6>("MAC address", data).map(MacAddress)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

/// Generator and door interlocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorState {
    /// Non-zero on the wire: every interlock has tripped
    pub interlocks_tripped: bool,
}

impl GeneratorState {
    pub fn from_data(data: &[u8]) -> Result<Self> {
        let [flag] = fixed::<1>("generator state", data)?;
        Ok(Self {
            interlocks_tripped: flag != 0,
        })
    }
}

/// Servo encoder reading and homing switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoPlacement {
    pub encoder: u16,
    pub homing_switch_pressed: bool,
}

impl ServoPlacement {
    pub fn from_data(data: &[u8]) -> Result<Self> {
        let [high, low, homing] = fixed::<3>("servo placement", data)?;
        Ok(Self {
            encoder: u16::from_be_bytes([high, low]),
            homing_switch_pressed: homing != 0,
        })
    }

    pub fn to_data(self) -> [u8; 3] {
        let [high, low] = self.encoder.to_be_bytes();
        [high, low, u8::from(self.homing_switch_pressed)]
    }
}

/// Firmware identification string
///
/// The controller reports `"Fobos embedded software version X.Y"`; the
/// numbers are extracted when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub text: String,
    pub major: Option<u32>,
    pub minor: Option<u32>,
}

impl FirmwareVersion {
    pub fn from_data(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data)
            .trim_end_matches('\0')
            .trim()
            .to_string();

        let (major, minor) = text
            .split_whitespace()
            .last()
            .and_then(|token| token.split_once('.'))
            .map(|(major, minor)| (major.parse().ok(), minor.parse().ok()))
            .unwrap_or((None, None));

        Self { text, major, minor }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Decode a single boolean data byte (non-zero is true)
pub(crate) fn flag(what: &str, data: &[u8]) -> Result<bool> {
    let [value] = fixed::<1>(what, data)?;
    Ok(value != 0)
}
