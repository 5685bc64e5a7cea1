//! Link Module
//!
//! One protocol session over one byte stream.
//!
//! ## Threads
//! - Reader: reads frames and hands them to the engine
//! - Supervisor: sends the periodic echo (optional)
//! - Callers: block in `send`/`request` until their response resolves
//!
//! A `Link` is built per connection. Closing it resolves any pending
//! request with `LinkClosed`; reconnecting means opening a new `Link`.

mod engine;
mod state;
mod supervisor;

pub use engine::Engine;
pub use state::{LinkEvent, LinkState, Liveness};
pub use supervisor::{heartbeat, Beat, Supervisor};

use std::io::Read;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::{unbounded, Receiver};

use crate::config::LinkConfig;
use crate::error::{FobosError, Result};
use crate::network::{connect_tcp, Transport};
use crate::protocol::{read_frame, CommandCode};

/// An open link to one controller
pub struct Link {
    engine: Arc<Engine>,
    events: Receiver<LinkEvent>,
    reader: Option<JoinHandle<()>>,
    supervisor: Option<Supervisor>,
    config: LinkConfig,
    peer: String,
}

impl Link {
    /// Open a link over an already connected transport
    pub fn open<T: Transport>(transport: T, config: LinkConfig) -> Result<Self> {
        config.validate()?;

        let parts = transport.into_parts(&config)?;
        let (events_tx, events_rx) = unbounded();
        let engine = Arc::new(Engine::new(parts.writer, parts.closer, &config, events_tx));

        let reader = {
            let engine = Arc::clone(&engine);
            let peer = parts.peer.clone();
            let stream = parts.reader;
            thread::Builder::new()
                .name("fobos-reader".to_string())
                .spawn(move || reader_loop(&engine, stream, &peer))?
        };

        let supervisor = if config.supervise {
            match Supervisor::spawn(Arc::clone(&engine), config.echo_interval) {
                Ok(supervisor) => Some(supervisor),
                Err(e) => {
                    engine.close();
                    return Err(e);
                }
            }
        } else {
            None
        };

        tracing::info!("Link open to {}", parts.peer);

        Ok(Self {
            engine,
            events: events_rx,
            reader: Some(reader),
            supervisor,
            config,
            peer: parts.peer,
        })
    }

    /// Connect over TCP and open a link
    pub fn connect<A: ToSocketAddrs>(addr: A, config: LinkConfig) -> Result<Self> {
        config.validate()?;
        let stream = connect_tcp(addr, config.connect_timeout)?;
        Self::open(stream, config)
    }

    // =========================================================================
    // Exchanges
    // =========================================================================

    /// Send one request; fails with `LinkBusy` if another is outstanding
    pub fn send(&self, command: impl Into<u8>, payload: &[u8]) -> Result<Bytes> {
        self.engine.send(command.into(), payload)
    }

    /// Send one request with its own response timeout
    pub fn send_with_timeout(
        &self,
        command: impl Into<u8>,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Bytes> {
        self.engine.send_with_timeout(command.into(), payload, timeout)
    }

    /// Wait for the request turn, then send
    pub fn request(&self, command: impl Into<u8>, payload: &[u8]) -> Result<Bytes> {
        self.engine.request(command.into(), payload)
    }

    /// Echo `payload` and return what the device mirrored
    pub fn echo(&self, payload: &[u8]) -> Result<Bytes> {
        self.request(CommandCode::Echo, payload)
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub fn liveness(&self) -> Liveness {
        self.engine.liveness()
    }

    pub fn last_exchange(&self) -> Option<Instant> {
        self.engine.last_exchange()
    }

    /// Link event stream; every clone sees each event once between them
    pub fn events(&self) -> Receiver<LinkEvent> {
        self.events.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_closed()
    }

    pub fn is_idle(&self) -> bool {
        self.engine.is_idle()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Tear the link down without waiting for its threads
    ///
    /// A pending request resolves with `LinkClosed`.
    pub fn shutdown(&self) {
        self.engine.close();
    }

    /// Tear the link down and join its threads
    pub fn close(&mut self) {
        self.engine.close();

        if let Some(mut supervisor) = self.supervisor.take() {
            supervisor.stop();
        }

        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                tracing::error!("Reader thread panicked");
            }
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read frames until the stream ends, then close the engine
fn reader_loop(engine: &Engine, mut stream: Box<dyn Read + Send>, peer: &str) {
    loop {
        match read_frame(&mut stream) {
            Ok(packet) => engine.dispatch(packet),
            Err(_) if engine.is_closed() => break,
            Err(FobosError::Io(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::info!("Controller {} closed the connection", peer);
                break;
            }
            Err(e @ FobosError::Truncated { .. }) => {
                tracing::warn!("Stream from {} ended mid-frame: {}", peer, e);
                break;
            }
            Err(e) => {
                tracing::error!("Error reading from {}: {}", peer, e);
                break;
            }
        }
    }

    engine.close();
}
