//! Network Module
//!
//! Byte-stream transport beneath the protocol engine.
//!
//! ## Architecture
//! - `Transport` splits a duplex stream into reader, writer and closer
//! - `TcpStream` is the production binding
//! - Socket reconnection stays with the caller; a new `Link` is opened
//!   per connection

mod transport;

pub use transport::{connect_tcp, StreamCloser, StreamParts, Transport};
