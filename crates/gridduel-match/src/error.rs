//! Error types for the match layer.
//!
//! Every variant ends the match without touching player records. Problems
//! a player can fix (a bad move, an unknown ID) are not errors at this
//! level; they are answered on the wire and the player tries again.

use gridduel_records::RecordError;
use gridduel_transport::TransportError;

use crate::Side;

/// Errors that end a match before it concludes.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Sending to or receiving from a player failed.
    #[error("transport failure with {side}: {source}")]
    Transport {
        side: Side,
        #[source]
        source: TransportError,
    },

    /// A player closed the connection cleanly between messages.
    #[error("{0} disconnected")]
    Disconnected(Side),

    /// A player sent something that is not valid in the current state:
    /// an undecodable message, a server-only tag, or a well-formed message
    /// of the wrong kind (e.g. MOVE while logging in).
    #[error("protocol violation by {side}: {detail}")]
    ProtocolViolation { side: Side, detail: String },

    /// A player did not answer REQUEST_ID in time.
    #[error("{0} timed out during login")]
    LoginTimedOut(Side),

    /// A player used up every login attempt without a known, free ID.
    #[error("{side} gave no usable player ID in {attempts} attempts")]
    LoginAttemptsExhausted { side: Side, attempts: u32 },

    /// The record store refused a lookup or update.
    #[error(transparent)]
    Records(#[from] RecordError),
}
