//! Controller emulator
//!
//! Device-side model of the protocol: keeps the state a real controller
//! would report and answers each request frame with the frame the
//! controller would send back.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::device::{GeneratorState, ScanMode, SensorState, ServoPlacement, WorkAction};
use crate::protocol::{defaults, CommandCode, Packet, StatusCode, REGISTRY};

/// Firmware string reported when none is configured
pub const DEFAULT_FIRMWARE: &str = "Fobos embedded software version 1.0";

/// Emulated Fobos controller
#[derive(Debug, Clone)]
pub struct ControllerEmulator {
    // Network interface
    ip: Ipv4Addr,
    mask: Ipv4Addr,
    port: u16,
    dhcp: bool,
    timeout_ms: u16,
    mac: [u8; 6],

    // Machine state
    sensors: SensorState,
    generator: GeneratorState,
    servo: ServoPlacement,
    ready: bool,
    firmware: String,
    barrier: bool,
    scanning: Option<ScanMode>,

    // Fault injection
    muted: bool,
    forced_status: Option<StatusCode>,

    requests: u64,
}

impl Default for ControllerEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerEmulator {
    pub fn new() -> Self {
        Self {
            ip: defaults::IP,
            mask: defaults::MASK,
            port: defaults::PORT,
            dhcp: defaults::DHCP,
            timeout_ms: defaults::TIMEOUT.as_millis() as u16,
            mac: [0x02, 0x00, 0x00, 0xF0, 0xB0, 0x50],
            sensors: SensorState::default(),
            generator: GeneratorState {
                interlocks_tripped: false,
            },
            servo: ServoPlacement {
                encoder: 0,
                homing_switch_pressed: false,
            },
            ready: true,
            firmware: DEFAULT_FIRMWARE.to_string(),
            barrier: false,
            scanning: None,
            muted: false,
            forced_status: None,
            requests: 0,
        }
    }

    // =========================================================================
    // Request handling
    // =========================================================================

    /// Answer one request; `None` means the controller stays silent
    pub fn handle(&mut self, request: &Packet) -> Option<Packet> {
        self.requests += 1;

        if self.muted {
            tracing::trace!("Emulator muted, dropping command {}", request.command());
            return None;
        }

        let code = request.command();
        let payload = request.payload();

        let Ok(command) = CommandCode::try_from(code) else {
            return Some(status_frame(CommandCode::Acknowledge.code(), StatusCode::UnknownCommand));
        };

        if command == CommandCode::Echo {
            return Some(request.clone());
        }

        if let Err(e) = REGISTRY.validate_request(code, payload) {
            tracing::debug!("Emulator rejecting request: {}", e);
            return Some(status_frame(code, StatusCode::BadParameters));
        }

        if let Some(status) = self.forced_status {
            return Some(status_frame(code, status));
        }

        let response = match command {
            CommandCode::SetIp => {
                self.ip = Ipv4Addr::new(payload[0], payload[1], payload[2], payload[3]);
                ok(code, &[])
            }
            CommandCode::SetMask => {
                self.mask = Ipv4Addr::new(payload[0], payload[1], payload[2], payload[3]);
                ok(code, &[])
            }
            CommandCode::SetPort => match u16::from_be_bytes([payload[0], payload[1]]) {
                0 => status_frame(code, StatusCode::BadParameters),
                port => {
                    self.port = port;
                    ok(code, &[])
                }
            },
            CommandCode::SetDhcp => {
                self.dhcp = payload[0] != 0;
                ok(code, &[])
            }
            CommandCode::SetTimeout => {
                self.timeout_ms = u16::from_be_bytes([payload[0], payload[1]]);
                ok(code, &[])
            }
            CommandCode::Reset => {
                self.reset_network();
                ok(code, &[])
            }
            CommandCode::GetMac => ok(code, &self.mac),
            CommandCode::SensorsState => ok(code, &self.sensors.to_data()),
            CommandCode::GeneratorState => {
                ok(code, &[u8::from(self.generator.interlocks_tripped)])
            }
            CommandCode::ServoPlacement => ok(code, &self.servo.to_data()),
            CommandCode::DeviceReady => ok(code, &[u8::from(self.ready)]),
            CommandCode::FirmwareVersion => {
                // Status byte plus string must fit the length byte
                let text = self.firmware.as_bytes();
                let text = &text[..text.len().min(254)];
                ok(code, text)
            }
            CommandCode::BasingServo => {
                if self.scanning.is_some() {
                    status_frame(code, StatusCode::Busy)
                } else {
                    self.servo = ServoPlacement {
                        encoder: 0,
                        homing_switch_pressed: true,
                    };
                    ok(code, &[])
                }
            }
            CommandCode::WorkControl => self.work_control(code, payload[0], payload[1]),
            CommandCode::BarrierError => ok(code, &[u8::from(self.barrier)]),
            CommandCode::Echo | CommandCode::Acknowledge => {
                status_frame(CommandCode::Acknowledge.code(), StatusCode::UnknownCommand)
            }
        };

        Some(response)
    }

    fn work_control(&mut self, code: u8, action: u8, mode: u8) -> Packet {
        let (Ok(action), Ok(mode)) = (WorkAction::try_from(action), ScanMode::try_from(mode)) else {
            return status_frame(code, StatusCode::BadParameters);
        };

        match action {
            WorkAction::Start if !self.ready => status_frame(code, StatusCode::NotReady),
            WorkAction::Start if self.barrier => status_frame(code, StatusCode::NotReady),
            WorkAction::Start if self.scanning.is_some() => status_frame(code, StatusCode::Busy),
            WorkAction::Start => {
                tracing::debug!("Emulator scan started: {:?}", mode);
                self.scanning = Some(mode);
                ok(code, &[])
            }
            WorkAction::Cancel => {
                self.scanning = None;
                ok(code, &[])
            }
        }
    }

    fn reset_network(&mut self) {
        self.ip = defaults::IP;
        self.mask = defaults::MASK;
        self.port = defaults::PORT;
        self.dhcp = defaults::DHCP;
        self.timeout_ms = defaults::TIMEOUT.as_millis() as u16;
    }

    // =========================================================================
    // Machine state
    // =========================================================================

    pub fn set_sensors(&mut self, sensors: SensorState) {
        self.sensors = sensors;
    }

    pub fn set_generator(&mut self, state: GeneratorState) {
        self.generator = state;
    }

    pub fn set_servo(&mut self, placement: ServoPlacement) {
        self.servo = placement;
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn set_firmware(&mut self, text: impl Into<String>) {
        self.firmware = text.into();
    }

    pub fn set_barrier(&mut self, blocked: bool) {
        self.barrier = blocked;
    }

    pub fn set_mac(&mut self, mac: [u8; 6]) {
        self.mac = mac;
    }

    // =========================================================================
    // Fault injection
    // =========================================================================

    /// Stop answering requests
    pub fn mute(&mut self) {
        self.muted = true;
    }

    pub fn unmute(&mut self) {
        self.muted = false;
    }

    /// Answer every non-echo request with `status` until cleared
    pub fn force_status(&mut self, status: Option<StatusCode>) {
        self.forced_status = status;
    }

    // =========================================================================
    // Observers
    // =========================================================================

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn mask(&self) -> Ipv4Addr {
        self.mask
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn dhcp(&self) -> bool {
        self.dhcp
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.timeout_ms))
    }

    pub fn scanning(&self) -> Option<ScanMode> {
        self.scanning
    }

    /// Requests received, including ones dropped while muted
    pub fn request_count(&self) -> u64 {
        self.requests
    }
}

/// Response carrying only a status byte
fn status_frame(code: u8, status: StatusCode) -> Packet {
    Packet::new(code, vec![status.code()]).unwrap_or_else(|_| Packet::empty(code))
}

/// Successful response: status ok followed by `data`
fn ok(code: u8, data: &[u8]) -> Packet {
    let mut payload = Vec::with_capacity(1 + data.len());
    payload.push(StatusCode::Ok.code());
    payload.extend_from_slice(data);
    Packet::new(code, payload).unwrap_or_else(|_| status_frame(code, StatusCode::TransmitError))
}
