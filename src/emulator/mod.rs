//! Emulator Module
//!
//! Software stand-in for the Fobos controller.
//!
//! ## Responsibilities
//! - Answer every command with the frame layout the controller uses
//! - Hold machine state tests can set (sensors, readiness, barrier, ...)
//! - Inject faults: silence, forced status codes, delayed replies,
//!   dropped connections

mod controller;
mod server;

pub use controller::{ControllerEmulator, DEFAULT_FIRMWARE};
pub use server::EmulatorServer;
