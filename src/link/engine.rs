//! Request/response engine
//!
//! Matches outgoing requests to incoming responses on one link.
//!
//! ## Slot Model
//! - `Idle`: no request outstanding, `send` may proceed
//! - `Awaiting`: exactly one request is on the wire; another `send` fails
//!   with `LinkBusy` without writing anything
//! - `Closed`: terminal; every call fails with `LinkClosed`
//!
//! The wire carries no request identifier, so a response matches the
//! pending request when its command code is the same. Anything else is
//! logged and dropped.
//!
//! ## Lock Order
//! `gate` → `slot` → `state`. The writer lock is only taken while the slot
//! lock is held, so frames never interleave on the stream.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, MutexGuard};

use super::state::{LinkEvent, LinkState, Liveness};
use crate::config::LinkConfig;
use crate::error::{FobosError, Result};
use crate::network::StreamCloser;
use crate::protocol::{encode, CommandCode, CommandDescriptor, Packet, REGISTRY};

/// The single outstanding request
struct PendingRequest {
    id: u64,
    descriptor: &'static CommandDescriptor,
    request: Bytes,
    submitted: Instant,
    completion: Sender<Result<Bytes>>,
}

enum Slot {
    Idle,
    Awaiting(PendingRequest),
    Closed,
}

impl Slot {
    /// Take the pending request out if `accept` approves it
    fn take_if(&mut self, accept: impl Fn(&PendingRequest) -> bool) -> Option<PendingRequest> {
        if !matches!(&*self, Slot::Awaiting(pending) if accept(pending)) {
            return None;
        }
        match std::mem::replace(self, Slot::Idle) {
            Slot::Awaiting(pending) => Some(pending),
            other => {
                *self = other;
                None
            }
        }
    }
}

/// Request/response engine for one link
pub struct Engine {
    /// Serializes callers that prefer to wait for their turn
    gate: Mutex<()>,

    /// Idle / Awaiting / Closed
    slot: Mutex<Slot>,

    /// Write half of the transport
    writer: Mutex<Box<dyn Write + Send>>,

    /// Shuts the transport down on teardown
    closer: Box<dyn StreamCloser>,

    /// Liveness bookkeeping
    state: Mutex<LinkState>,

    /// Link event publisher
    events: Sender<LinkEvent>,

    response_timeout: Duration,
    acquire_timeout: Duration,
    next_id: AtomicU64,
}

impl Engine {
    /// Create an engine over the write half of a transport
    pub fn new(
        writer: Box<dyn Write + Send>,
        closer: Box<dyn StreamCloser>,
        config: &LinkConfig,
        events: Sender<LinkEvent>,
    ) -> Self {
        Self {
            gate: Mutex::new(()),
            slot: Mutex::new(Slot::Idle),
            writer: Mutex::new(writer),
            closer,
            state: Mutex::new(LinkState::new(config.stale_after_misses)),
            events,
            response_timeout: config.response_timeout,
            acquire_timeout: config.acquire_timeout,
            next_id: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Send a request and wait for its response with the configured timeout
    ///
    /// Fails immediately with `LinkBusy` if another request is outstanding.
    pub fn send(&self, command: u8, payload: &[u8]) -> Result<Bytes> {
        self.send_with_timeout(command, payload, self.response_timeout)
    }

    /// Send a request with an explicit response timeout
    pub fn send_with_timeout(&self, command: u8, payload: &[u8], timeout: Duration) -> Result<Bytes> {
        let (id, completion) = self.submit(command, payload)?;
        self.wait(id, command, timeout, completion)
    }

    /// Wait up to `acquire_timeout` for the slot, then send
    pub fn request(&self, command: u8, payload: &[u8]) -> Result<Bytes> {
        let _turn = self
            .gate
            .try_lock_for(self.acquire_timeout)
            .ok_or(FobosError::LinkBusy)?;
        self.send(command, payload)
    }

    /// Take the turn only if nobody holds it
    pub(crate) fn try_turn(&self) -> Option<MutexGuard<'_, ()>> {
        self.gate.try_lock()
    }

    /// Validate, write and register a request
    fn submit(&self, command: u8, payload: &[u8]) -> Result<(u64, Receiver<Result<Bytes>>)> {
        let mut slot = self.slot.lock();
        match *slot {
            Slot::Closed => return Err(FobosError::LinkClosed),
            Slot::Awaiting(_) => return Err(FobosError::LinkBusy),
            Slot::Idle => {}
        }

        let descriptor = REGISTRY.validate_request(command, payload)?;
        let frame = encode(command, payload)?;

        let (completion_tx, completion_rx) = bounded(1);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let written = {
            let mut writer = self.writer.lock();
            writer.write_all(&frame).and_then(|_| writer.flush())
        };
        if let Err(e) = written {
            drop(slot);
            tracing::error!("Failed to write {}: {}", descriptor.command, e);
            self.close();
            return Err(FobosError::Io(e));
        }

        tracing::trace!("Sent {} with {} data bytes", descriptor.command, payload.len());

        *slot = Slot::Awaiting(PendingRequest {
            id,
            descriptor,
            request: Bytes::copy_from_slice(payload),
            submitted: Instant::now(),
            completion: completion_tx,
        });

        Ok((id, completion_rx))
    }

    /// Block the caller until the request resolves or its deadline passes
    fn wait(
        &self,
        id: u64,
        command: u8,
        timeout: Duration,
        completion: Receiver<Result<Bytes>>,
    ) -> Result<Bytes> {
        match completion.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Disconnected) => Err(FobosError::LinkClosed),
            Err(RecvTimeoutError::Timeout) => {
                let expired = self.slot.lock().take_if(|pending| pending.id == id);
                if expired.is_none() {
                    // Resolved between the deadline and the lock
                    return completion.try_recv().unwrap_or(Err(FobosError::LinkClosed));
                }

                tracing::warn!("No response to command {} within {:?}", command, timeout);
                let event = self.state.lock().record_miss();
                self.publish(event);

                Err(FobosError::Timeout {
                    command,
                    after: timeout,
                })
            }
        }
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Route one inbound frame to the pending request, if it matches
    pub fn dispatch(&self, packet: Packet) {
        let code = packet.command();
        tracing::trace!("Received command {} with {} data bytes", code, packet.len());

        if code == CommandCode::Acknowledge.code() && self.dispatch_acknowledge(&packet) {
            return;
        }

        let pending = self
            .slot
            .lock()
            .take_if(|pending| pending.descriptor.command.code() == code);

        let Some(pending) = pending else {
            self.discard(packet);
            return;
        };

        let result = resolve(&pending, packet.payload());
        self.complete(pending, result);
    }

    /// Handle a generic acknowledge; returns true if it was consumed
    fn dispatch_acknowledge(&self, packet: &Packet) -> bool {
        let Ok(descriptor) = REGISTRY.descriptor(CommandCode::Acknowledge.code()) else {
            return false;
        };

        let status = match REGISTRY.validate_response(descriptor, packet.payload()) {
            Ok(Some(status)) => status,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!("Malformed acknowledge: {}", e);
                return false;
            }
        };

        if status.is_ok() {
            if self.is_idle() || self.is_closed() {
                return false;
            }
            tracing::debug!("Acknowledge ok; still awaiting the command response");
            return true;
        }

        match self.slot.lock().take_if(|_| true) {
            Some(pending) => {
                self.complete(pending, Err(FobosError::DeviceError(status)));
                true
            }
            None => false,
        }
    }

    /// Resolve a matched request and update liveness
    fn complete(&self, pending: PendingRequest, result: Result<Bytes>) {
        let elapsed = pending.submitted.elapsed();
        match &result {
            Ok(data) => tracing::debug!(
                "{} completed in {:?} with {} data bytes",
                pending.descriptor.command,
                elapsed,
                data.len()
            ),
            Err(e) => tracing::debug!("{} failed in {:?}: {}", pending.descriptor.command, elapsed, e),
        }

        // Only a well-formed answer counts as an exchange; a device-reported
        // status is one, a mismatched echo or a bad shape is not
        if matches!(result, Ok(_) | Err(FobosError::DeviceError(_))) {
            let event = self
                .state
                .lock()
                .record_success(pending.descriptor.command, Instant::now());
            self.publish(event);
        }

        // The caller may have given up; nothing to do then
        let _ = pending.completion.send(result);
    }

    fn discard(&self, packet: Packet) {
        match REGISTRY.descriptor(packet.command()) {
            Ok(_) => {
                let err = FobosError::UnexpectedResponse(packet.command());
                tracing::warn!("Discarding frame: {}", err);
            }
            Err(e) => tracing::warn!("Discarding frame: {}", e),
        }
        self.publish(Some(LinkEvent::UnexpectedFrame(packet)));
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Tear the link down; any pending request resolves with `LinkClosed`
    ///
    /// Safe to call more than once.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.slot.lock(), Slot::Closed);
        if let Slot::Awaiting(pending) = previous {
            tracing::debug!("Cancelling pending {}", pending.descriptor.command);
            let _ = pending.completion.send(Err(FobosError::LinkClosed));
        }

        let event = self.state.lock().mark_closed();
        if event.is_some() {
            tracing::info!("Link closed");
            if let Err(e) = self.closer.close() {
                tracing::debug!("Transport shutdown: {}", e);
            }
        }
        self.publish(event);
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Closed)
    }

    /// True when no request is outstanding
    pub fn is_idle(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Idle)
    }

    pub fn liveness(&self) -> Liveness {
        self.state.lock().liveness()
    }

    pub fn last_exchange(&self) -> Option<Instant> {
        self.state.lock().last_exchange()
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    fn publish(&self, event: Option<LinkEvent>) {
        let Some(event) = event else {
            return;
        };
        match &event {
            LinkEvent::Up => tracing::info!("Link alive"),
            LinkEvent::Lost { missed } => {
                tracing::warn!("Link stale after {} missed response(s)", missed)
            }
            LinkEvent::Restored => tracing::info!("Link restored"),
            LinkEvent::UnexpectedFrame(_) | LinkEvent::Closed => {}
        }
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}

/// Decode the response payload for a matched request
fn resolve(pending: &PendingRequest, payload: &Bytes) -> Result<Bytes> {
    match REGISTRY.validate_response(pending.descriptor, payload)? {
        None if payload[..] == pending.request[..] => Ok(payload.clone()),
        None => Err(FobosError::EchoMismatch {
            sent: pending.request.to_vec(),
            received: payload.to_vec(),
        }),
        Some(status) if status.is_ok() => Ok(payload.slice(1..)),
        Some(status) => Err(FobosError::DeviceError(status)),
    }
}
