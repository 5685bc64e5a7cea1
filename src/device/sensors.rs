//! Sensor bit-fields
//!
//! Decoding of the three status bytes returned by `SensorsState`.
//!
//! ```text
//! DATA1 rotation   bit0 S3 working lower   bit1 S4 working upper
//!                  bit6 S1 emergency lower bit7 S2 emergency upper
//! DATA2 lift table bit0 upper limit        bit1 lower limit
//! DATA3 table      bit1 motor e-stop A     bit2 motor e-stop B
//!                  bit3 position LEFT      bit4 position RIGHT
//! ```
//!
//! Unused bits are kept as received.

use bitflags::bitflags;

use crate::error::{FobosError, Result};

bitflags! {
    /// C-arm rotation limit switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RotationSensors: u8 {
        /// S3
        const WORKING_LOWER = 1 << 0;
        /// S4
        const WORKING_UPPER = 1 << 1;
        /// S1
        const EMERGENCY_LOWER = 1 << 6;
        /// S2
        const EMERGENCY_UPPER = 1 << 7;
    }
}

bitflags! {
    /// Lift table limit switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LiftTableSensors: u8 {
        const UPPER_LIMIT = 1 << 0;
        const LOWER_LIMIT = 1 << 1;
    }
}

bitflags! {
    /// Linear motor and table position switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TableSensors: u8 {
        const MOTOR_EMERGENCY_A = 1 << 1;
        const MOTOR_EMERGENCY_B = 1 << 2;
        const POSITION_LEFT = 1 << 3;
        const POSITION_RIGHT = 1 << 4;
    }
}

/// Snapshot of all limit switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorState {
    pub rotation: RotationSensors,
    pub lift_table: LiftTableSensors,
    pub table: TableSensors,
}

impl SensorState {
    /// Decode the three data bytes that follow the status byte
    pub fn from_data(data: &[u8]) -> Result<Self> {
        let [rotation, lift_table, table] = data else {
            return Err(FobosError::ProtocolViolation(format!(
                "sensor state needs 3 data bytes, got {}",
                data.len()
            )));
        };

        Ok(Self {
            rotation: RotationSensors::from_bits_retain(*rotation),
            lift_table: LiftTableSensors::from_bits_retain(*lift_table),
            table: TableSensors::from_bits_retain(*table),
        })
    }

    /// Encode back to the three data bytes
    pub fn to_data(self) -> [u8; 3] {
        [self.rotation.bits(), self.lift_table.bits(), self.table.bits()]
    }

    /// Any emergency switch tripped
    pub fn emergency(&self) -> bool {
        self.rotation
            .intersects(RotationSensors::EMERGENCY_LOWER | RotationSensors::EMERGENCY_UPPER)
            || self
                .table
                .intersects(TableSensors::MOTOR_EMERGENCY_A | TableSensors::MOTOR_EMERGENCY_B)
    }
}

impl Default for SensorState {
    fn default() -> Self {
        Self {
            rotation: RotationSensors::empty(),
            lift_table: LiftTableSensors::empty(),
            table: TableSensors::empty(),
        }
    }
}
