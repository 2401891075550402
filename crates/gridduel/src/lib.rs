//! # Gridduel
//!
//! A referee server for two-player, networked tic-tac-toe.
//!
//! Gridduel pairs incoming connections two at a time, runs each pair as an
//! isolated match task (login, turns, GAME_OVER), and keeps every player's
//! win/loss/tie record in one shared table that is loaded at startup and
//! saved at shutdown.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridduel::prelude::*;
//!
//! # async fn start() -> Result<(), GridduelError> {
//! let server = GridduelServer::builder()
//!     .bind("0.0.0.0:4444")
//!     .records_path("players.dat")
//!     .build()
//!     .await?;
//! let summary = server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! println!("{} matches completed", summary.completed);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod logging;
mod server;

pub use config::ServerConfig;
pub use error::GridduelError;
pub use logging::{init_logging, log_filter};
pub use server::{GridduelServer, GridduelServerBuilder, ServeSummary};

pub mod prelude {
    pub use crate::{
        GridduelError, GridduelServer, GridduelServerBuilder, ServeSummary,
        ServerConfig,
    };
    pub use gridduel_match::{Conclusion, MatchConfig, MatchReport, Side};
    pub use gridduel_protocol::{
        ClientMessage, Outcome, PlayerId, PlayerRecord, ServerMessage,
    };
    pub use gridduel_records::{
        FileStorage, MemoryStorage, RecordStorage, RecordStore,
    };
    pub use gridduel_transport::{Connection, TcpTransport, Transport};
}
