//! # fobos-link
//!
//! PC-side protocol engine for the Fobos motion and scanning controller:
//! - Fixed-layout `[CMD][N][DATA]` frames over a TCP byte stream
//! - Per-command payload contracts checked before anything is sent
//! - One request in flight per link, matched to its response by command code
//! - Mandatory 250 ms echo heartbeat with staleness detection
//! - Typed device operations on top
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Device Facade                           │
//! │          (typed commands, argument checks, retry)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Request/Response Engine                      │◄── Link Supervisor
//! │            (single slot: Idle / Awaiting)                    │    (echo every 250 ms)
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Registry   │          │    Codec    │
//!   │  (shapes)   │          │  (frames)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Transport  │
//!                           │    (TCP)    │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod link;
pub mod device;
pub mod emulator;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FobosError, Result};
pub use config::LinkConfig;
pub use link::{Link, LinkEvent, Liveness};
pub use device::Device;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of fobos-link
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
