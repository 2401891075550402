//! Match sessions for Gridduel.
//!
//! Each match runs as one Tokio task that owns both player connections,
//! a private [`Board`], and a clone of the shared [`RecordStore`](gridduel_records::RecordStore).
//!
//! # Key types
//!
//! - [`MatchSession`]: login, turn loop and conclusion for one game
//! - [`Board`]: placement rules and win detection
//! - [`MatchState`]: lifecycle state machine
//! - [`MatchConfig`]: optional read timeout and login attempt limit

mod board;
mod config;
mod error;
mod session;

pub use board::{Board, InvalidMove, Side};
pub use config::{Conclusion, MatchConfig, MatchState};
pub use error::MatchError;
pub use session::{MatchId, MatchReport, MatchSession};
