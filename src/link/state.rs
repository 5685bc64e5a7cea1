//! Link state
//!
//! Liveness bookkeeping shared by the engine and the supervisor.
//!
//! ```text
//!  Disconnected ──(echo ok)──► Alive ──(misses ≥ threshold)──► Stale
//!                                ▲                               │
//!                                └────────(any exchange ok)──────┘
//! ```

use std::fmt;
use std::time::Instant;

use crate::protocol::{CommandCode, Packet};

/// Current liveness of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Liveness {
    /// No echo round-trip has completed yet, or the link was torn down
    #[default]
    Disconnected,
    Alive,
    Stale,
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Liveness::Disconnected => write!(f, "Disconnected"),
            Liveness::Alive => write!(f, "Alive"),
            Liveness::Stale => write!(f, "Stale"),
        }
    }
}

/// Notifications published by a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// First echo round-trip succeeded
    Up,
    /// Consecutive timeouts crossed the staleness threshold
    Lost { missed: u32 },
    /// A stale link exchanged successfully again
    Restored,
    /// A frame arrived that matched no pending request
    UnexpectedFrame(Packet),
    /// The link was torn down
    Closed,
}

/// Liveness state machine of one connection
#[derive(Debug, Clone)]
pub struct LinkState {
    liveness: Liveness,
    last_exchange: Option<Instant>,
    consecutive_misses: u32,
    stale_after_misses: u32,
    closed: bool,
}

impl LinkState {
    pub fn new(stale_after_misses: u32) -> Self {
        Self {
            liveness: Liveness::Disconnected,
            last_exchange: None,
            consecutive_misses: 0,
            stale_after_misses: stale_after_misses.max(1),
            closed: false,
        }
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    /// When the last matched response arrived
    pub fn last_exchange(&self) -> Option<Instant> {
        self.last_exchange
    }

    pub fn consecutive_misses(&self) -> u32 {
        self.consecutive_misses
    }

    /// A matched response arrived for `command`
    pub fn record_success(&mut self, command: CommandCode, at: Instant) -> Option<LinkEvent> {
        if self.closed {
            return None;
        }

        self.last_exchange = Some(at);
        self.consecutive_misses = 0;

        match self.liveness {
            Liveness::Disconnected if command == CommandCode::Echo => {
                self.liveness = Liveness::Alive;
                Some(LinkEvent::Up)
            }
            Liveness::Stale => {
                self.liveness = Liveness::Alive;
                Some(LinkEvent::Restored)
            }
            _ => None,
        }
    }

    /// A request timed out
    pub fn record_miss(&mut self) -> Option<LinkEvent> {
        if self.closed {
            return None;
        }

        self.consecutive_misses = self.consecutive_misses.saturating_add(1);

        if self.liveness == Liveness::Alive && self.consecutive_misses >= self.stale_after_misses {
            self.liveness = Liveness::Stale;
            return Some(LinkEvent::Lost {
                missed: self.consecutive_misses,
            });
        }
        None
    }

    /// The link was torn down; returns `Closed` the first time only
    pub fn mark_closed(&mut self) -> Option<LinkEvent> {
        if self.closed {
            return None;
        }
        self.closed = true;
        self.liveness = Liveness::Disconnected;
        Some(LinkEvent::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
