//! Link supervisor
//!
//! Drives the controller's mandatory echo cadence on its own thread.
//!
//! Each tick sends one empty echo through the engine. A tick is skipped
//! when a caller already holds the request turn: that exchange proves
//! liveness on its own, and waiting would let echoes pile up behind it.
//! Timeouts are counted by the engine; the supervisor only keeps the
//! cadence and stops when the link closes.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, select, tick, Receiver, Sender};

use super::engine::Engine;
use crate::error::{FobosError, Result};
use crate::protocol::CommandCode;

/// Outcome of one heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    Answered,
    Missed,
    Skipped,
    Stopped,
}

/// Handle to a running supervisor thread
pub struct Supervisor {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Supervisor {
    /// Start echoing every `interval`
    pub fn spawn(engine: Arc<Engine>, interval: Duration) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("fobos-supervisor".to_string())
            .spawn(move || run(&engine, interval, shutdown_rx))?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(&mut self) {
        // Dropping the sender wakes the select below
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Supervisor thread panicked");
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(engine: &Engine, interval: Duration, shutdown: Receiver<()>) {
    tracing::debug!("Supervisor started, echo every {:?}", interval);
    let ticker = tick(interval);

    loop {
        if heartbeat(engine) == Beat::Stopped {
            break;
        }

        select! {
            recv(ticker) -> _ => {}
            recv(shutdown) -> _ => break,
        }
    }

    tracing::debug!("Supervisor stopped");
}

/// Issue one echo if the request turn is free
pub fn heartbeat(engine: &Engine) -> Beat {
    let Some(_turn) = engine.try_turn() else {
        tracing::trace!("Echo skipped: request in flight");
        return Beat::Skipped;
    };

    match engine.send(CommandCode::Echo.code(), &[]) {
        Ok(_) => Beat::Answered,
        Err(FobosError::Timeout { .. }) => Beat::Missed,
        Err(FobosError::LinkBusy) => {
            tracing::trace!("Echo skipped: slot taken outside the turn");
            Beat::Skipped
        }
        Err(FobosError::LinkClosed) => Beat::Stopped,
        Err(e) if engine.is_closed() => {
            tracing::debug!("Echo aborted by teardown: {}", e);
            Beat::Stopped
        }
        Err(e) => {
            tracing::warn!("Echo failed: {}", e);
            Beat::Missed
        }
    }
}
