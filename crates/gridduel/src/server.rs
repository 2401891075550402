//! `GridduelServer` builder and accept loop.
//!
//! This is the entry point for running a Gridduel server. It ties the
//! layers together: transport → protocol → match sessions → record store.
//!
//! Pairing is first-come, first-served. The first connection is told to
//! WAIT and held; the next one is paired with it and both are handed to a
//! [`MatchSession`] task. The accept loop never plays a game itself.
//!
//! A waiting client should stay silent until it is paired. The loop reads
//! from it while it waits, so one that hangs up (or talks out of turn) is
//! dropped and the next arrival waits in its place.

use std::future::Future;
use std::sync::Arc;

use gridduel_match::{MatchError, MatchReport, MatchSession};
use gridduel_protocol::{send_message, ServerMessage};
use gridduel_records::{FileStorage, RecordStorage, RecordStore};
use gridduel_transport::{Connection, TcpTransport, Transport, TransportError};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::{GridduelError, ServerConfig};

type SessionResult = Result<MatchReport, MatchError>;

/// Counts of what happened to the matches a server ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    /// Matches handed to a session task.
    pub started: usize,
    /// Matches that reached a result and updated records.
    pub completed: usize,
    /// Matches that ended early (disconnect, protocol violation, timeout
    /// during login).
    pub failed: usize,
    /// Session tasks that panicked.
    pub panicked: usize,
    /// Matches still running when the shutdown grace period ran out.
    pub aborted: usize,
}

/// Builder for configuring and starting a Gridduel server.
///
/// # Example
///
/// ```rust,ignore
/// use gridduel::prelude::*;
///
/// let server = GridduelServer::builder()
///     .bind("0.0.0.0:4444")
///     .records_path("players.dat")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct GridduelServerBuilder {
    config: ServerConfig,
}

impl GridduelServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the records file used by [`build`](Self::build).
    pub fn records_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config.records_path = path.into();
        self
    }

    /// Binds a TCP listener and loads records from the configured file.
    pub async fn build(
        self,
    ) -> Result<GridduelServer<TcpTransport, FileStorage>, GridduelError> {
        let transport = TcpTransport::bind(&self.config.bind_addr).await?;
        let storage = FileStorage::new(&self.config.records_path);
        self.build_with(transport, storage).await
    }

    /// Uses an already bound transport and any record storage.
    pub async fn build_with<T: Transport, S: RecordStorage>(
        self,
        transport: T,
        storage: S,
    ) -> Result<GridduelServer<T, S>, GridduelError> {
        let store = RecordStore::default();
        let report = store.load_all(&storage).await?;
        if report.rejected > 0 {
            tracing::warn!(rejected = report.rejected, "some stored records were not loaded");
        }
        for record in store.records().await {
            tracing::info!("{record}");
        }

        Ok(GridduelServer {
            transport,
            storage,
            store,
            config: self.config,
        })
    }
}

impl Default for GridduelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Gridduel server with its records loaded.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct GridduelServer<T: Transport, S: RecordStorage> {
    transport: T,
    storage: S,
    store: RecordStore,
    config: ServerConfig,
}

impl GridduelServer<TcpTransport, FileStorage> {
    /// Creates a new builder.
    pub fn builder() -> GridduelServerBuilder {
        GridduelServerBuilder::new()
    }
}

impl<T: Transport, S: RecordStorage> GridduelServer<T, S> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the shared record store.
    pub fn store(&self) -> RecordStore {
        self.store.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<ServeSummary, GridduelError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops
    /// accepting, lets running matches finish within the configured grace
    /// period, aborts the rest, and saves all records.
    pub async fn run_until<F>(self, shutdown: F) -> Result<ServeSummary, GridduelError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            mut transport,
            storage,
            store,
            config,
        } = self;
        let storage = Arc::new(storage);
        let checkpoints = config
            .checkpoint_after_match
            .then(|| Checkpointer::spawn(store.clone(), Arc::clone(&storage)));

        tracing::info!(addr = ?transport.local_addr().ok(), "Gridduel server running");

        let mut sessions: JoinSet<SessionResult> = JoinSet::new();
        let mut pending: Option<T::Connection> = None;
        let mut summary = ServeSummary::default();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting");
                    break;
                }
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    let concluded = tally(joined, &mut summary);
                    if let (true, Some(checkpoints)) = (concluded, &checkpoints) {
                        checkpoints.request();
                    }
                }
                stirred = watch_waiting(pending.as_ref()) => {
                    if let Some(conn) = pending.take() {
                        drop_waiting(conn, stirred).await;
                    }
                }
                accepted = transport.accept() => {
                    let conn = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::error!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    match pending.take() {
                        None => {
                            if let Err(e) = send_message(&conn, &ServerMessage::Wait).await {
                                tracing::warn!(conn_id = %conn.id(), error = %e, "could not send WAIT, dropping connection");
                                continue;
                            }
                            tracing::debug!(conn_id = %conn.id(), "waiting for an opponent");
                            pending = Some(conn);
                        }
                        Some(first) => {
                            tracing::info!(player1 = %first.id(), player2 = %conn.id(), "paired");
                            let session = MatchSession::new(
                                first,
                                conn,
                                store.clone(),
                                config.match_config.clone(),
                            );
                            sessions.spawn(session.run());
                            summary.started += 1;
                        }
                    }
                }
            }
        }

        drop(transport);
        if let Some(conn) = pending.take() {
            if let Err(e) = conn.close().await {
                tracing::debug!(conn_id = %conn.id(), error = %e, "close failed");
            }
        }

        if !sessions.is_empty() {
            tracing::info!(active = sessions.len(), "waiting for running matches");
            let drain = async {
                while let Some(joined) = sessions.join_next().await {
                    tally(joined, &mut summary);
                }
            };
            let drained = tokio::time::timeout(config.shutdown_grace(), drain).await;
            if drained.is_err() {
                tracing::warn!(remaining = sessions.len(), "grace period over, aborting matches");
                summary.aborted = sessions.len();
                sessions.shutdown().await;
            }
        }

        if let Some(checkpoints) = checkpoints {
            checkpoints.finish().await;
        }
        store.save_all(&storage).await?;
        tracing::info!(?summary, "server stopped");
        Ok(summary)
    }
}

/// Resolves when the waiting connection, if any, hangs up or sends data.
///
/// Reads a single byte, so dropping the future part way loses nothing.
async fn watch_waiting<C: Connection>(
    waiting: Option<&C>,
) -> Result<Option<Vec<u8>>, TransportError> {
    match waiting {
        Some(conn) => conn.recv_exact(1).await,
        None => std::future::pending().await,
    }
}

async fn drop_waiting<C: Connection>(
    conn: C,
    stirred: Result<Option<Vec<u8>>, TransportError>,
) {
    match stirred {
        Ok(None) => tracing::info!(conn_id = %conn.id(), "waiting player left"),
        Ok(Some(bytes)) => tracing::warn!(
            conn_id = %conn.id(),
            ?bytes,
            "waiting player sent data before being paired, dropping"
        ),
        Err(e) => tracing::info!(conn_id = %conn.id(), error = %e, "waiting player lost"),
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(conn_id = %conn.id(), error = %e, "close failed");
    }
}

/// Saves records in the background after matches conclude.
///
/// Requests that arrive while a save is running are folded into one
/// follow-up save, which encodes the table as it is by then.
struct Checkpointer {
    requests: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl Checkpointer {
    fn spawn<S: RecordStorage>(store: RecordStore, storage: Arc<S>) -> Self {
        let (requests, mut rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                match store.save_all(&storage).await {
                    Ok(()) => tracing::debug!("checkpoint saved"),
                    Err(e) => tracing::error!(error = %e, "checkpoint failed"),
                }
            }
        });
        Self { requests, task }
    }

    fn request(&self) {
        // Full means a save is already queued.
        let _ = self.requests.try_send(());
    }

    /// Waits for queued saves so none lands after the final one.
    async fn finish(self) {
        drop(self.requests);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "checkpoint task failed");
        }
    }
}

/// Folds one finished session into the summary. Returns `true` if the
/// match reached a result.
fn tally(joined: Result<SessionResult, JoinError>, summary: &mut ServeSummary) -> bool {
    match joined {
        Ok(Ok(_)) => {
            summary.completed += 1;
            true
        }
        // The session already logged why it ended.
        Ok(Err(_)) => {
            summary.failed += 1;
            false
        }
        Err(e) if e.is_panic() => {
            tracing::error!(error = %e, "match task panicked");
            summary.panicked += 1;
            false
        }
        Err(e) => {
            tracing::debug!(error = %e, "match task cancelled");
            false
        }
    }
}
