//! Byte-stream connections: TCP sockets and in-memory duplex pipes.

use std::net::SocketAddr;

use tokio::io::{
    AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream,
    ReadHalf, WriteHalf,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// A [`Connection`] over any Tokio byte stream.
///
/// The stream is split so a read in progress never blocks a write. Each
/// half sits behind its own async mutex; callers are expected to use a
/// connection sequentially, the locks only keep the type `Sync`.
pub struct StreamConnection<S> {
    id: ConnectionId,
    reader: Mutex<ReadHalf<S>>,
    writer: Mutex<WriteHalf<S>>,
}

impl<S> StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wraps a stream, assigning it a fresh [`ConnectionId`].
    pub fn new(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            id: ConnectionId::next(),
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }
}

impl<S> Connection for StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv_exact(
        &self,
        len: usize,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        let mut reader = self.reader.lock().await;

        while filled < len {
            let n = reader
                .read(&mut buf[filled..])
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(TransportError::ConnectionClosed(format!(
                    "peer closed after {filled} of {len} bytes"
                )));
            }
            filled += n;
        }

        Ok(Some(buf))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// A TCP connection.
pub type TcpConnection = StreamConnection<TcpStream>;

/// One end of an in-memory duplex pipe.
pub type MemoryConnection = StreamConnection<DuplexStream>;

/// Creates two connected in-memory connections.
///
/// Bytes sent on one end are received on the other. `capacity` is the
/// buffer size of each direction; writers wait when it is full.
pub fn memory_pair(capacity: usize) -> (MemoryConnection, MemoryConnection) {
    let (a, b) = tokio::io::duplex(capacity);
    (StreamConnection::new(a), StreamConnection::new(b))
}

/// Opens a client TCP connection to `addr`.
pub async fn connect(addr: &str) -> Result<TcpConnection, TransportError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(TransportError::SendFailed)?;
    stream.set_nodelay(true).map_err(TransportError::SendFailed)?;
    Ok(StreamConnection::new(stream))
}

/// A TCP [`Transport`] that listens for incoming connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;

    async fn accept(&mut self) -> Result<TcpConnection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        // Messages are a handful of bytes; don't let Nagle hold them back.
        stream.set_nodelay(true).map_err(TransportError::AcceptFailed)?;

        let conn = StreamConnection::new(stream);
        tracing::debug!(conn_id = %conn.id(), %addr, "accepted TCP connection");
        Ok(conn)
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
