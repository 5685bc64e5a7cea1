//! Factory defaults of the controller's network interface

use std::net::Ipv4Addr;
use std::time::Duration;

/// Address after reset
pub const IP: Ipv4Addr = Ipv4Addr::new(192, 168, 100, 1);

/// Subnet mask after reset
pub const MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// TCP port after reset
pub const PORT: u16 = 15000;

/// DHCP client is off after reset
pub const DHCP: bool = false;

/// Device-side exchange timeout after reset
pub const TIMEOUT: Duration = Duration::from_millis(100);

/// Echo cadence the controller expects from the PC
pub const ECHO_INTERVAL: Duration = Duration::from_millis(250);
