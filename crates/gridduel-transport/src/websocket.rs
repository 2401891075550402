//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Browser clients cannot open raw TCP sockets, so the same protocol bytes
//! are carried in binary WebSocket frames. Frame boundaries are ignored:
//! incoming payloads are appended to a buffer and [`Connection::recv_exact`]
//! draws from it, so framing still comes from the message tag.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// How long a new socket gets to complete the WebSocket handshake.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Handshaken connections waiting for [`Transport::accept`].
const READY_QUEUE: usize = 16;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
///
/// A background task owns the listener and runs each handshake in its own
/// task, so a client that never finishes its handshake holds up nobody
/// else. `accept` only takes finished connections off a channel, which
/// makes it safe to drop mid-wait.
pub struct WebSocketTransport {
    local_addr: SocketAddr,
    ready: mpsc::Receiver<Result<WebSocketConnection, TransportError>>,
    acceptor: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::bind_with_timeout(addr, HANDSHAKE_TIMEOUT).await
    }

    /// Binds with a custom handshake timeout.
    pub async fn bind_with_timeout(
        addr: &str,
        handshake_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let local_addr =
            listener.local_addr().map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");

        let (tx, ready) = mpsc::channel(READY_QUEUE);
        let acceptor = tokio::spawn(run_acceptor(listener, tx, handshake_timeout));
        Ok(Self {
            local_addr,
            ready,
            acceptor,
        })
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        match self.ready.recv().await {
            Some(accepted) => accepted,
            None => Err(TransportError::AcceptFailed(std::io::Error::other(
                "WebSocket acceptor stopped",
            ))),
        }
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        Ok(self.local_addr)
    }
}

async fn run_acceptor(
    listener: TcpListener,
    ready: mpsc::Sender<Result<WebSocketConnection, TransportError>>,
    handshake_timeout: Duration,
) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                if ready.send(Err(TransportError::AcceptFailed(e))).await.is_err() {
                    return;
                }
                continue;
            }
        };
        if ready.is_closed() {
            return;
        }

        let ready = ready.clone();
        tokio::spawn(async move {
            let handshake = tokio_tungstenite::accept_async(stream);
            let ws = match tokio::time::timeout(handshake_timeout, handshake).await {
                Ok(Ok(ws)) => ws,
                Ok(Err(e)) => {
                    tracing::debug!(%addr, error = %e, "WebSocket handshake failed");
                    return;
                }
                Err(_) => {
                    tracing::debug!(%addr, "WebSocket handshake timed out");
                    return;
                }
            };

            let conn = WebSocketConnection::new(ws);
            tracing::debug!(conn_id = %conn.id, %addr, "accepted WebSocket connection");
            // The transport is gone if this fails; the connection just drops.
            let _ = ready.send(Ok(conn)).await;
        });
    }
}

struct Inbound {
    stream: SplitStream<WsStream>,
    /// Bytes received but not yet handed out by `recv_exact`.
    buffered: Vec<u8>,
}

/// A single WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    outbound: Mutex<SplitSink<WsStream, Message>>,
    inbound: Mutex<Inbound>,
}

impl WebSocketConnection {
    fn new(ws: WsStream) -> Self {
        let (sink, stream) = ws.split();
        Self {
            id: ConnectionId::next(),
            outbound: Mutex::new(sink),
            inbound: Mutex::new(Inbound {
                stream,
                buffered: Vec::new(),
            }),
        }
    }
}

impl Connection for WebSocketConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let msg = Message::Binary(data.to_vec().into());
        self.outbound.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv_exact(
        &self,
        len: usize,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let mut guard = self.inbound.lock().await;
        let Inbound { stream, buffered } = &mut *guard;

        while buffered.len() < len {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    buffered.extend_from_slice(&data);
                }
                Some(Ok(Message::Text(text))) => {
                    buffered.extend_from_slice(text.as_bytes());
                }
                Some(Ok(Message::Close(_))) | None => {
                    if buffered.is_empty() {
                        return Ok(None);
                    }
                    return Err(TransportError::ConnectionClosed(format!(
                        "peer closed after {} of {len} bytes",
                        buffered.len()
                    )));
                }
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }

        let rest = buffered.split_off(len);
        Ok(Some(std::mem::replace(buffered, rest)))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.outbound.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
