//! Device Module
//!
//! Typed operations on the Fobos controller.
//!
//! ## Command Families
//! - System: network settings, device timeout, reset, MAC address
//! - Query: sensors, generator interlocks, servo placement, readiness,
//!   firmware version
//! - Execution: servo homing, scan start/cancel
//! - Error reports: C-arm barrier
//!
//! Arguments are checked before anything reaches the link; results are
//! decoded from the data bytes that follow the status byte.

mod retry;
mod sensors;
mod types;

pub use retry::RetryPolicy;
pub use sensors::{LiftTableSensors, RotationSensors, SensorState, TableSensors};
pub use types::{
    FirmwareVersion, GeneratorState, MacAddress, ScanMode, ServoPlacement, WorkAction,
};

use std::net::{Ipv4Addr, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::Receiver;

use crate::config::LinkConfig;
use crate::error::{FobosError, Result};
use crate::link::{Link, LinkEvent, Liveness};
use crate::protocol::{CommandCode, REGISTRY};

/// Typed facade over one controller link
pub struct Device {
    link: Link,
    retry: RetryPolicy,
}

impl Device {
    /// Wrap an open link
    pub fn new(link: Link) -> Self {
        Self {
            link,
            retry: RetryPolicy::none(),
        }
    }

    /// Connect over TCP with the given link configuration
    pub fn connect<A: ToSocketAddrs>(addr: A, config: LinkConfig) -> Result<Self> {
        Link::connect(addr, config).map(Self::new)
    }

    /// Retry repeatable commands according to `policy`
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Issue one command through the link, honoring the retry policy
    fn call(&self, command: CommandCode, payload: &[u8]) -> Result<Bytes> {
        let category = REGISTRY.descriptor(command.code())?.category;
        self.retry
            .run(category, || self.link.request(command, payload))
    }

    // =========================================================================
    // System
    // =========================================================================

    /// Change the controller's IPv4 address
    pub fn set_ip(&self, ip: Ipv4Addr) -> Result<()> {
        if ip.is_unspecified() || ip.is_broadcast() || ip.is_multicast() {
            return Err(FobosError::InvalidArgument(format!(
                "{} is not a usable host address",
                ip
            )));
        }
        self.call(CommandCode::SetIp, &ip.octets()).map(drop)
    }

    /// Change the subnet mask; the ones must be contiguous
    pub fn set_mask(&self, mask: Ipv4Addr) -> Result<()> {
        let bits = u32::from(mask);
        if bits.leading_ones() + bits.trailing_zeros() != 32 {
            return Err(FobosError::InvalidArgument(format!(
                "{} is not a contiguous subnet mask",
                mask
            )));
        }
        self.call(CommandCode::SetMask, &mask.octets()).map(drop)
    }

    /// Change the TCP port
    pub fn set_port(&self, port: u16) -> Result<()> {
        if port == 0 {
            return Err(FobosError::InvalidArgument("port 0 is not listenable".to_string()));
        }
        self.call(CommandCode::SetPort, &port.to_be_bytes()).map(drop)
    }

    /// Switch between static addressing and DHCP
    pub fn set_dhcp(&self, enabled: bool) -> Result<()> {
        self.call(CommandCode::SetDhcp, &[u8::from(enabled)]).map(drop)
    }

    /// Change the device-side exchange timeout (1..=65535 ms)
    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        let ms = u16::try_from(timeout.as_millis())
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| {
                FobosError::InvalidArgument(format!(
                    "timeout must be 1..=65535 ms, got {:?}",
                    timeout
                ))
            })?;
        self.call(CommandCode::SetTimeout, &ms.to_be_bytes()).map(drop)
    }

    /// Restore the network interface to factory defaults
    pub fn reset(&self) -> Result<()> {
        self.call(CommandCode::Reset, &[1]).map(drop)
    }

    pub fn mac_address(&self) -> Result<MacAddress> {
        let data = self.call(CommandCode::GetMac, &[])?;
        MacAddress::from_data(&data)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn sensors(&self) -> Result<SensorState> {
        let data = self.call(CommandCode::SensorsState, &[])?;
        SensorState::from_data(&data)
    }

    pub fn generator(&self) -> Result<GeneratorState> {
        let data = self.call(CommandCode::GeneratorState, &[])?;
        GeneratorState::from_data(&data)
    }

    pub fn servo_placement(&self) -> Result<ServoPlacement> {
        let data = self.call(CommandCode::ServoPlacement, &[])?;
        ServoPlacement::from_data(&data)
    }

    /// Whether the controller reports itself ready for work
    pub fn is_ready(&self) -> Result<bool> {
        let data = self.call(CommandCode::DeviceReady, &[])?;
        types::flag("device ready", &data)
    }

    pub fn firmware_version(&self) -> Result<FirmwareVersion> {
        let data = self.call(CommandCode::FirmwareVersion, &[])?;
        Ok(FirmwareVersion::from_data(&data))
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Home the servo and rotate the C-arm to its start position
    pub fn home_servo(&self) -> Result<()> {
        self.call(CommandCode::BasingServo, &[1]).map(drop)
    }

    pub fn start_scan(&self, mode: ScanMode) -> Result<()> {
        self.work_control(WorkAction::Start, mode)
    }

    pub fn cancel_scan(&self, mode: ScanMode) -> Result<()> {
        self.work_control(WorkAction::Cancel, mode)
    }

    fn work_control(&self, action: WorkAction, mode: ScanMode) -> Result<()> {
        self.call(CommandCode::WorkControl, &[action as u8, mode as u8])
            .map(drop)
    }

    // =========================================================================
    // Error reports
    // =========================================================================

    /// Whether an obstacle blocks the C-arm
    pub fn barrier_detected(&self) -> Result<bool> {
        let data = self.call(CommandCode::BarrierError, &[])?;
        types::flag("barrier", &data)
    }

    // =========================================================================
    // Link
    // =========================================================================

    /// Round-trip `payload` through the controller
    pub fn echo(&self, payload: &[u8]) -> Result<Bytes> {
        self.call(CommandCode::Echo, payload)
    }

    pub fn liveness(&self) -> Liveness {
        self.link.liveness()
    }

    /// Link loss, restoration and stray frames
    pub fn events(&self) -> Receiver<LinkEvent> {
        self.link.events()
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn close(&mut self) {
        self.link.close();
    }
}
