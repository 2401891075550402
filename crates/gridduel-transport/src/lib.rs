//! Transport abstraction layer for Gridduel.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! byte-stream connections. The wire protocol has no framing of its own:
//! a message's length is implied by its first byte, so connections expose
//! "read exactly N bytes" rather than "read the next message".
//!
//! # Implementations
//!
//! - [`TcpTransport`] / [`TcpConnection`]: plain TCP, the default
//! - [`MemoryConnection`]: in-process duplex pipes, see [`memory_pair`]
//! - `WebSocketTransport`: binary WebSocket frames (`websocket` feature)
//!
//! # Feature Flags
//!
//! - `websocket`: WebSocket transport via `tokio-tungstenite`

mod error;
mod stream;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use stream::{
    connect, memory_pair, MemoryConnection, StreamConnection, TcpConnection,
    TcpTransport,
};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport, HANDSHAKE_TIMEOUT};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs across all transports.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique ID.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// The returned futures are `Send` so that generic code (the pairing loop,
/// match sessions) can run on Tokio's multi-threaded scheduler.
pub trait Transport: Send + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A single connection that can send and receive bytes.
pub trait Connection: Send + Sync + 'static {
    /// Sends all of `data` to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives exactly `len` bytes from the remote peer.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly
    /// before sending any byte of this read. A close partway through the
    /// read is an error: the peer sent a truncated message.
    fn recv_exact(
        &self,
        len: usize,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the sending half of the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
