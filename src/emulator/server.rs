//! Emulator server
//!
//! Serves a `ControllerEmulator` over TCP so a `Link` can talk to it
//! exactly as it would to hardware.
//!
//! ## Architecture
//! - Accept thread polling a non-blocking listener so shutdown is prompt
//! - One thread per connection, reading frames and writing replies
//! - Emulator state shared behind a mutex; tests may change it while
//!   connections are live

use std::collections::HashMap;
use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use super::controller::ControllerEmulator;
use crate::error::{FobosError, Result};
use crate::network::StreamCloser;
use crate::protocol::{read_frame, write_frame};

const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// State shared between the server handle and its threads
struct Shared {
    emulator: Mutex<ControllerEmulator>,
    /// Live connections by id; each entry is removed when its thread exits
    connections: Mutex<HashMap<u64, TcpStream>>,
    next_connection: AtomicU64,
    response_delay: Mutex<Duration>,
    shutdown: AtomicBool,
}

/// TCP front end for a `ControllerEmulator`
pub struct EmulatorServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    acceptor: Option<JoinHandle<()>>,
}

impl EmulatorServer {
    /// Bind and start accepting connections
    pub fn bind<A: ToSocketAddrs>(addr: A, emulator: ControllerEmulator) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let shared = Arc::new(Shared {
            emulator: Mutex::new(emulator),
            connections: Mutex::new(HashMap::new()),
            next_connection: AtomicU64::new(0),
            response_delay: Mutex::new(Duration::ZERO),
            shutdown: AtomicBool::new(false),
        });

        let acceptor = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("fobos-emulator-accept".to_string())
                .spawn(move || accept_loop(listener, shared))?
        };

        tracing::info!("Emulator listening on {}", addr);

        Ok(Self {
            addr,
            shared,
            acceptor: Some(acceptor),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Inspect or change the emulated controller
    pub fn with_emulator<R>(&self, f: impl FnOnce(&mut ControllerEmulator) -> R) -> R {
        f(&mut self.shared.emulator.lock())
    }

    /// Delay every reply by `delay`
    pub fn set_response_delay(&self, delay: Duration) {
        *self.shared.response_delay.lock() = delay;
    }

    /// Close every open connection, as a rebooting controller would
    pub fn drop_connections(&self) {
        for (_, stream) in self.shared.connections.lock().drain() {
            if let Err(e) = stream.close() {
                tracing::debug!("Closing emulator connection: {}", e);
            }
        }
    }

    /// Number of client connections currently being served
    pub fn connection_count(&self) -> usize {
        self.shared.connections.lock().len()
    }

    /// Block until the accept loop exits
    pub fn wait(mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            if acceptor.join().is_err() {
                tracing::error!("Emulator accept thread panicked");
            }
        }
    }

    /// Stop accepting and close all connections
    pub fn shutdown(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        self.drop_connections();
        if let Some(acceptor) = self.acceptor.take() {
            if acceptor.join().is_err() {
                tracing::error!("Emulator accept thread panicked");
            }
        }
    }
}

impl Drop for EmulatorServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    while !shared.shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = spawn_connection(stream, peer, Arc::clone(&shared)) {
                    tracing::warn!("Failed to start connection for {}: {}", peer, e);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                tracing::error!("Emulator accept failed: {}", e);
                break;
            }
        }
    }
    tracing::debug!("Emulator accept loop stopped");
}

fn spawn_connection(stream: TcpStream, peer: SocketAddr, shared: Arc<Shared>) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    let id = shared.next_connection.fetch_add(1, Ordering::Relaxed);
    shared.connections.lock().insert(id, stream.try_clone()?);

    let spawned = {
        let shared = Arc::clone(&shared);
        thread::Builder::new()
            .name(format!("fobos-emulator-{}", peer))
            .spawn(move || {
                if let Err(e) = serve_connection(stream, &shared) {
                    tracing::warn!("Emulator connection {} ended: {}", peer, e);
                }
                shared.connections.lock().remove(&id);
            })
    };

    if let Err(e) = spawned {
        shared.connections.lock().remove(&id);
        return Err(e.into());
    }
    Ok(())
}

/// Answer frames until the peer disconnects
fn serve_connection(stream: TcpStream, shared: &Shared) -> Result<()> {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::debug!("Emulator connection from {}", peer);

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    loop {
        let request = match read_frame(&mut reader) {
            Ok(packet) => packet,
            Err(FobosError::Io(ref e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::UnexpectedEof
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionAborted
                ) =>
            {
                tracing::debug!("Client {} disconnected", peer);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let reply = shared.emulator.lock().handle(&request);
        let Some(reply) = reply else {
            continue;
        };

        let delay = *shared.response_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        if let Err(e) = write_frame(&mut writer, &reply) {
            if let FobosError::Io(ref io_err) = e {
                if matches!(
                    io_err.kind(),
                    std::io::ErrorKind::BrokenPipe
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionAborted
                ) {
                    tracing::debug!("Client {} disconnected before reply: {}", peer, e);
                    return Ok(());
                }
            }
            return Err(e);
        }
    }
}
