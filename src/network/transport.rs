//! Transport binding
//!
//! The protocol engine only needs a duplex byte stream that can be split
//! into an independent reader and writer and shut down from either side.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::LinkConfig;
use crate::error::{FobosError, Result};

/// Closes the underlying stream so blocked reads return
pub trait StreamCloser: Send + Sync {
    fn close(&self) -> std::io::Result<()>;
}

/// The halves of a split transport
pub struct StreamParts {
    pub reader: Box<dyn Read + Send>,
    pub writer: Box<dyn Write + Send>,
    pub closer: Box<dyn StreamCloser>,
    /// Peer description for logging
    pub peer: String,
}

/// A duplex byte stream the link can run over
pub trait Transport: Send + 'static {
    /// Split into reader, writer and closer
    fn into_parts(self, config: &LinkConfig) -> Result<StreamParts>;
}

impl StreamCloser for TcpStream {
    fn close(&self) -> std::io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            // Already closed by the peer
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

impl Transport for TcpStream {
    fn into_parts(self, config: &LinkConfig) -> Result<StreamParts> {
        let peer = self
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Frames are tiny; Nagle would add latency to every exchange
        self.set_nodelay(true)?;
        self.set_write_timeout(Some(config.write_timeout))?;

        let reader = self.try_clone()?;
        let closer = self.try_clone()?;

        Ok(StreamParts {
            reader: Box::new(reader),
            writer: Box::new(self),
            closer: Box::new(closer),
            peer,
        })
    }
}

/// Open a TCP stream to the controller, trying each resolved address
pub fn connect_tcp<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<TcpStream> {
    let mut last_err = None;

    for candidate in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => {
                tracing::debug!("Connected to controller at {}", candidate);
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", candidate, e);
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(e) => FobosError::Io(e),
        None => FobosError::Config("address resolved to nothing".to_string()),
    })
}
