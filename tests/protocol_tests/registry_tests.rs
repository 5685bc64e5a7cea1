//! Registry Tests
//!
//! Tests verify:
//! - Lookup by code and unknown codes
//! - Request shape and value checks
//! - Response shape and status decoding

use fobos_link::protocol::{Category, CommandCode, Shape, StatusCode, REGISTRY};
use fobos_link::FobosError;

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_every_command_has_descriptor() {
    for cmd in CommandCode::ALL {
        let descriptor = REGISTRY.descriptor(cmd.code()).unwrap();
        assert_eq!(descriptor.command, cmd);
    }
}

#[test]
fn test_unknown_code() {
    for code in [8u8, 9, 15, 22, 31, 100, 254] {
        assert!(matches!(
            REGISTRY.shape_of(code),
            Err(FobosError::UnknownCommand(c)) if c == code
        ));
    }
}

#[test]
fn test_categories() {
    let category = |cmd: CommandCode| REGISTRY.descriptor(cmd.code()).unwrap().category;
    assert_eq!(category(CommandCode::Echo), Category::Echo);
    assert_eq!(category(CommandCode::SetDhcp), Category::System);
    assert_eq!(category(CommandCode::ServoPlacement), Category::Query);
    assert_eq!(category(CommandCode::WorkControl), Category::Execution);
    assert_eq!(category(CommandCode::BarrierError), Category::ErrorReport);
    assert_eq!(category(CommandCode::Acknowledge), Category::Acknowledge);
}

#[test]
fn test_shapes() {
    let shape = REGISTRY.shape_of(CommandCode::SetIp.code()).unwrap();
    assert_eq!(shape.request, Some(Shape::Exact(4)));
    assert_eq!(shape.response, Shape::Exact(1));

    let shape = REGISTRY.shape_of(CommandCode::FirmwareVersion.code()).unwrap();
    assert_eq!(shape.request, Some(Shape::Exact(0)));
    assert_eq!(shape.response, Shape::StatusPlusVariable);

    let shape = REGISTRY.shape_of(CommandCode::Echo.code()).unwrap();
    assert_eq!(shape.request, Some(Shape::Variable));
}

// =============================================================================
// Request Validation Tests
// =============================================================================

#[test]
fn test_request_length_mismatch() {
    let result = REGISTRY.validate_request(CommandCode::SetIp.code(), &[192, 168, 1]);
    assert!(matches!(result, Err(FobosError::InvalidPayload { command: 1, .. })));

    let result = REGISTRY.validate_request(CommandCode::SensorsState.code(), &[0]);
    assert!(matches!(result, Err(FobosError::InvalidPayload { command: 10, .. })));
}

#[test]
fn test_work_control_mode_range() {
    let code = CommandCode::WorkControl.code();
    assert!(REGISTRY.validate_request(code, &[1, 1]).is_ok());
    assert!(REGISTRY.validate_request(code, &[1, 3]).is_ok());
    assert!(REGISTRY.validate_request(code, &[0, 2]).is_ok());

    for bad in [[1u8, 0], [1, 4], [1, 255], [2, 1]] {
        assert!(
            matches!(
                REGISTRY.validate_request(code, &bad),
                Err(FobosError::InvalidPayload { command: 21, .. })
            ),
            "{:?} should be rejected",
            bad
        );
    }
}

#[test]
fn test_flag_and_trigger_values() {
    assert!(REGISTRY.validate_request(CommandCode::SetDhcp.code(), &[1]).is_ok());
    assert!(REGISTRY.validate_request(CommandCode::SetDhcp.code(), &[2]).is_err());
    assert!(REGISTRY.validate_request(CommandCode::Reset.code(), &[1]).is_ok());
    assert!(REGISTRY.validate_request(CommandCode::Reset.code(), &[0]).is_err());
    assert!(REGISTRY.validate_request(CommandCode::BasingServo.code(), &[1]).is_ok());
    assert!(REGISTRY.validate_request(CommandCode::SetTimeout.code(), &[0, 0]).is_err());
    assert!(REGISTRY.validate_request(CommandCode::SetTimeout.code(), &[0, 100]).is_ok());
}

#[test]
fn test_acknowledge_cannot_be_sent() {
    let result = REGISTRY.validate_request(CommandCode::Acknowledge.code(), &[0]);
    assert!(matches!(result, Err(FobosError::InvalidPayload { command: 255, .. })));
}

#[test]
fn test_echo_accepts_any_length() {
    let code = CommandCode::Echo.code();
    assert!(REGISTRY.validate_request(code, &[]).is_ok());
    assert!(REGISTRY.validate_request(code, &[0u8; 255]).is_ok());
}

// =============================================================================
// Response Validation Tests
// =============================================================================

#[test]
fn test_response_status_decoding() {
    let descriptor = REGISTRY.descriptor(CommandCode::SetPort.code()).unwrap();
    assert_eq!(
        REGISTRY.validate_response(descriptor, &[0]).unwrap(),
        Some(StatusCode::Ok)
    );
    assert_eq!(
        REGISTRY.validate_response(descriptor, &[4]).unwrap(),
        Some(StatusCode::BadParameters)
    );
}

#[test]
fn test_response_without_status_byte() {
    let descriptor = REGISTRY.descriptor(CommandCode::DeviceReady.code()).unwrap();
    assert!(matches!(
        REGISTRY.validate_response(descriptor, &[]),
        Err(FobosError::ProtocolViolation(_))
    ));
}

#[test]
fn test_response_unknown_status() {
    let descriptor = REGISTRY.descriptor(CommandCode::DeviceReady.code()).unwrap();
    assert!(matches!(
        REGISTRY.validate_response(descriptor, &[7, 1]),
        Err(FobosError::ProtocolViolation(_))
    ));
}

#[test]
fn test_ok_response_must_match_shape() {
    let descriptor = REGISTRY.descriptor(CommandCode::SensorsState.code()).unwrap();
    assert!(REGISTRY.validate_response(descriptor, &[0, 1, 2, 3]).is_ok());
    assert!(matches!(
        REGISTRY.validate_response(descriptor, &[0, 1, 2]),
        Err(FobosError::ProtocolViolation(_))
    ));
}

#[test]
fn test_error_response_may_omit_data() {
    let descriptor = REGISTRY.descriptor(CommandCode::SensorsState.code()).unwrap();
    assert_eq!(
        REGISTRY.validate_response(descriptor, &[3]).unwrap(),
        Some(StatusCode::NotReady)
    );
}

#[test]
fn test_echo_response_has_no_status() {
    let descriptor = REGISTRY.descriptor(CommandCode::Echo.code()).unwrap();
    assert_eq!(REGISTRY.validate_response(descriptor, &[9, 9, 9]).unwrap(), None);
    assert_eq!(REGISTRY.validate_response(descriptor, &[]).unwrap(), None);
}

#[test]
fn test_firmware_response_variable_length() {
    let descriptor = REGISTRY.descriptor(CommandCode::FirmwareVersion.code()).unwrap();
    assert!(REGISTRY.validate_response(descriptor, &[0]).is_ok());
    assert!(REGISTRY.validate_response(descriptor, b"\x00version 1.0").is_ok());
}
