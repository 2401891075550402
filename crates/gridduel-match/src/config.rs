//! Match configuration and state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Side;

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Per-match limits.
///
/// The defaults impose none: a silent client stalls only its own match,
/// and an unknown ID is asked for again as often as it takes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// How long to wait for any single client message.
    ///
    /// During login a timeout ends the match with no record changes;
    /// during play the silent player forfeits.
    pub read_timeout_secs: Option<u64>,

    /// How many REQUEST_ID prompts a player gets before the match is
    /// abandoned.
    pub max_login_attempts: Option<u32>,
}

impl MatchConfig {
    pub fn with_read_timeout(mut self, secs: u64) -> Self {
        self.read_timeout_secs = Some(secs);
        self
    }

    pub fn with_max_login_attempts(mut self, attempts: u32) -> Self {
        self.max_login_attempts = Some(attempts);
        self
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}

// ---------------------------------------------------------------------------
// MatchState
// ---------------------------------------------------------------------------

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conclusion {
    /// Three in a row.
    Win(Side),
    /// Nine moves, no line.
    Draw,
    /// The other side stopped answering on its turn.
    Forfeit { winner: Side },
}

impl Conclusion {
    /// The side credited with the win, if any.
    pub fn winner(self) -> Option<Side> {
        match self {
            Self::Win(side) | Self::Forfeit { winner: side } => Some(side),
            Self::Draw => None,
        }
    }
}

/// The lifecycle state of a match.
///
/// Transitions only move forward:
///
/// ```text
/// AwaitingPlayer1Id → AwaitingPlayer2Id → InProgress(turn owner) → Concluded
/// ```
///
/// `InProgress` flips its turn owner after every accepted move. A match
/// that ends because of a transport failure or a protocol violation never
/// reaches `Concluded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    AwaitingPlayer1Id,
    AwaitingPlayer2Id,
    InProgress(Side),
    Concluded(Conclusion),
}

impl MatchState {
    /// Returns `true` while a login is still outstanding.
    pub fn is_login(&self) -> bool {
        matches!(self, Self::AwaitingPlayer1Id | Self::AwaitingPlayer2Id)
    }

    /// The side allowed to move, if the game is running.
    pub fn turn_owner(&self) -> Option<Side> {
        match self {
            Self::InProgress(side) => Some(*side),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingPlayer1Id => write!(f, "AwaitingPlayer1Id"),
            Self::AwaitingPlayer2Id => write!(f, "AwaitingPlayer2Id"),
            Self::InProgress(side) => write!(f, "InProgress({side})"),
            Self::Concluded(conclusion) => write!(f, "Concluded({conclusion:?})"),
        }
    }
}
