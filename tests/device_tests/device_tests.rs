//! Tests for the Device facade
//!
//! These tests drive every typed operation against the emulator:
//! - System commands change the emulated network settings
//! - Queries decode machine state
//! - Execution commands respect readiness and barrier state
//! - Arguments are rejected before anything is sent
//! - Retry applies to repeatable commands only

use std::net::Ipv4Addr;
use std::time::Duration;

use fobos_link::device::{
    GeneratorState, LiftTableSensors, RetryPolicy, RotationSensors, ScanMode, SensorState,
    ServoPlacement, TableSensors,
};
use fobos_link::emulator::{ControllerEmulator, EmulatorServer, DEFAULT_FIRMWARE};
use fobos_link::protocol::{defaults, StatusCode};
use fobos_link::{Device, FobosError, LinkConfig};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (EmulatorServer, Device) {
    setup_with(ControllerEmulator::new())
}

fn setup_with(emulator: ControllerEmulator) -> (EmulatorServer, Device) {
    let server = EmulatorServer::bind("127.0.0.1:0", emulator).unwrap();
    let config = LinkConfig::builder()
        .response_timeout(Duration::from_millis(200))
        .supervise(false)
        .build();
    let device = Device::connect(server.local_addr(), config).unwrap();
    (server, device)
}

fn requests(server: &EmulatorServer) -> u64 {
    server.with_emulator(|emu| emu.request_count())
}

// =============================================================================
// System Command Tests
// =============================================================================

#[test]
fn test_network_settings() {
    let (server, device) = setup();

    device.set_ip(Ipv4Addr::new(10, 0, 0, 42)).unwrap();
    device.set_mask(Ipv4Addr::new(255, 255, 0, 0)).unwrap();
    device.set_port(8080).unwrap();
    device.set_dhcp(true).unwrap();
    device.set_timeout(Duration::from_millis(500)).unwrap();

    server.with_emulator(|emu| {
        assert_eq!(emu.ip(), Ipv4Addr::new(10, 0, 0, 42));
        assert_eq!(emu.mask(), Ipv4Addr::new(255, 255, 0, 0));
        assert_eq!(emu.port(), 8080);
        assert!(emu.dhcp());
        assert_eq!(emu.timeout(), Duration::from_millis(500));
    });
}

#[test]
fn test_reset_restores_factory_settings() {
    let (server, device) = setup();

    device.set_ip(Ipv4Addr::new(10, 0, 0, 42)).unwrap();
    device.set_port(8080).unwrap();
    device.reset().unwrap();

    server.with_emulator(|emu| {
        assert_eq!(emu.ip(), defaults::IP);
        assert_eq!(emu.mask(), defaults::MASK);
        assert_eq!(emu.port(), defaults::PORT);
        assert_eq!(emu.dhcp(), defaults::DHCP);
        assert_eq!(emu.timeout(), defaults::TIMEOUT);
    });
}

#[test]
fn test_mac_address() {
    let mut emulator = ControllerEmulator::new();
    emulator.set_mac([0x00, 0x1A, 0x2B, 0x3C, 0x4D, 0x5E]);
    let (_server, device) = setup_with(emulator);

    let mac = device.mac_address().unwrap();
    assert_eq!(mac.octets(), [0x00, 0x1A, 0x2B, 0x3C, 0x4D, 0x5E]);
    assert_eq!(mac.to_string(), "00:1a:2b:3c:4d:5e");
}

#[test]
fn test_invalid_arguments_are_not_sent() {
    let (server, device) = setup();
    let before = requests(&server);

    assert!(matches!(
        device.set_ip(Ipv4Addr::UNSPECIFIED),
        Err(FobosError::InvalidArgument(_))
    ));
    assert!(matches!(
        device.set_ip(Ipv4Addr::BROADCAST),
        Err(FobosError::InvalidArgument(_))
    ));
    assert!(matches!(
        device.set_mask(Ipv4Addr::new(255, 0, 255, 0)),
        Err(FobosError::InvalidArgument(_))
    ));
    assert!(matches!(device.set_port(0), Err(FobosError::InvalidArgument(_))));
    assert!(matches!(
        device.set_timeout(Duration::ZERO),
        Err(FobosError::InvalidArgument(_))
    ));
    assert!(matches!(
        device.set_timeout(Duration::from_secs(70)),
        Err(FobosError::InvalidArgument(_))
    ));

    assert_eq!(requests(&server), before);
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_sensor_state() {
    let mut emulator = ControllerEmulator::new();
    emulator.set_sensors(SensorState {
        rotation: RotationSensors::WORKING_UPPER | RotationSensors::EMERGENCY_LOWER,
        lift_table: LiftTableSensors::LOWER_LIMIT,
        table: TableSensors::POSITION_LEFT,
    });
    let (_server, device) = setup_with(emulator);

    let sensors = device.sensors().unwrap();
    assert!(sensors.rotation.contains(RotationSensors::WORKING_UPPER));
    assert!(sensors.rotation.contains(RotationSensors::EMERGENCY_LOWER));
    assert!(!sensors.rotation.contains(RotationSensors::WORKING_LOWER));
    assert_eq!(sensors.lift_table, LiftTableSensors::LOWER_LIMIT);
    assert_eq!(sensors.table, TableSensors::POSITION_LEFT);
    assert!(sensors.emergency());
}

#[test]
fn test_generator_servo_and_readiness() {
    let mut emulator = ControllerEmulator::new();
    emulator.set_generator(GeneratorState {
        interlocks_tripped: true,
    });
    emulator.set_servo(ServoPlacement {
        encoder: 0x1234,
        homing_switch_pressed: false,
    });
    emulator.set_ready(false);
    let (_server, device) = setup_with(emulator);

    assert!(device.generator().unwrap().interlocks_tripped);
    assert_eq!(
        device.servo_placement().unwrap(),
        ServoPlacement {
            encoder: 0x1234,
            homing_switch_pressed: false,
        }
    );
    assert!(!device.is_ready().unwrap());
}

#[test]
fn test_firmware_version() {
    let (server, device) = setup();

    let version = device.firmware_version().unwrap();
    assert_eq!(version.text, DEFAULT_FIRMWARE);
    assert_eq!((version.major, version.minor), (Some(1), Some(0)));

    server.with_emulator(|emu| emu.set_firmware("Fobos embedded software version 3.7"));
    let version = device.firmware_version().unwrap();
    assert_eq!((version.major, version.minor), (Some(3), Some(7)));
}

#[test]
fn test_barrier_report() {
    let (server, device) = setup();
    assert!(!device.barrier_detected().unwrap());

    server.with_emulator(|emu| emu.set_barrier(true));
    assert!(device.barrier_detected().unwrap());
}

// =============================================================================
// Execution Tests
// =============================================================================

#[test]
fn test_scan_lifecycle() {
    let (server, device) = setup();

    device.home_servo().unwrap();
    assert!(device.servo_placement().unwrap().homing_switch_pressed);

    device.start_scan(ScanMode::FrontAndSide).unwrap();
    assert_eq!(
        server.with_emulator(|emu| emu.scanning()),
        Some(ScanMode::FrontAndSide)
    );

    // A second start while scanning is refused
    assert!(matches!(
        device.start_scan(ScanMode::Front),
        Err(FobosError::DeviceError(StatusCode::Busy))
    ));

    device.cancel_scan(ScanMode::FrontAndSide).unwrap();
    assert_eq!(server.with_emulator(|emu| emu.scanning()), None);
}

#[test]
fn test_scan_refused_when_not_ready_or_blocked() {
    let (server, device) = setup();

    server.with_emulator(|emu| emu.set_ready(false));
    assert!(matches!(
        device.start_scan(ScanMode::Side),
        Err(FobosError::DeviceError(StatusCode::NotReady))
    ));

    server.with_emulator(|emu| {
        emu.set_ready(true);
        emu.set_barrier(true);
    });
    assert!(matches!(
        device.start_scan(ScanMode::Side),
        Err(FobosError::DeviceError(StatusCode::NotReady))
    ));
}

// =============================================================================
// Retry Tests
// =============================================================================

#[test]
fn test_retry_repeats_queries() {
    let (server, device) = setup();
    let device = device.with_retry(RetryPolicy::new(3, Duration::ZERO));

    server.with_emulator(|emu| emu.force_status(Some(StatusCode::Busy)));
    let before = requests(&server);

    assert!(matches!(
        device.is_ready(),
        Err(FobosError::DeviceError(StatusCode::Busy))
    ));
    assert_eq!(requests(&server) - before, 3);
}

#[test]
fn test_retry_never_repeats_execution() {
    let (server, device) = setup();
    let device = device.with_retry(RetryPolicy::new(3, Duration::ZERO));

    server.with_emulator(|emu| emu.force_status(Some(StatusCode::Busy)));
    let before = requests(&server);

    assert!(matches!(
        device.home_servo(),
        Err(FobosError::DeviceError(StatusCode::Busy))
    ));
    assert_eq!(requests(&server) - before, 1);
}

#[test]
fn test_retry_skips_permanent_errors() {
    let (server, device) = setup();
    let device = device.with_retry(RetryPolicy::new(3, Duration::ZERO));

    server.with_emulator(|emu| emu.force_status(Some(StatusCode::BadParameters)));
    let before = requests(&server);

    assert!(matches!(
        device.sensors(),
        Err(FobosError::DeviceError(StatusCode::BadParameters))
    ));
    assert_eq!(requests(&server) - before, 1);
}

#[test]
fn test_retry_repeats_timeouts() {
    let (server, device) = setup();
    let device = device.with_retry(RetryPolicy::new(3, Duration::ZERO));

    server.with_emulator(|emu| emu.mute());
    let before = requests(&server);

    assert!(matches!(device.is_ready(), Err(FobosError::Timeout { command: 13, .. })));
    assert_eq!(requests(&server) - before, 3);

    server.with_emulator(|emu| emu.unmute());
    assert!(device.is_ready().unwrap());
}

// =============================================================================
// Link Tests
// =============================================================================

#[test]
fn test_echo_through_facade() {
    let (_server, mut device) = setup();

    let data = device.echo(b"ping").unwrap();
    assert_eq!(data.as_ref(), b"ping");
    assert_eq!(device.liveness(), fobos_link::Liveness::Alive);

    device.close();
    assert!(device.link().is_closed());
    assert!(matches!(device.is_ready(), Err(FobosError::LinkClosed)));
}
