//! A match session: one task that owns two connections and referees one
//! game between them from login to GAME_OVER.
//!
//! The session talks to each player strictly in turn. It touches shared
//! state only through the [`RecordStore`], and never while it is waiting
//! on the network.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use gridduel_protocol::{
    recv_message, send_message, BoardSnapshot, ClientMessage, Outcome,
    PlayerId, ProtocolError, ServerMessage,
};
use gridduel_records::{GameResult, RecordError, RecordStore, SlotIndex};
use gridduel_transport::Connection;

use crate::{Board, Conclusion, MatchConfig, MatchError, MatchState, Side};

static NEXT_MATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a match, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchId(u64);

impl MatchId {
    fn next() -> Self {
        Self(NEXT_MATCH_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match-{}", self.0)
    }
}

/// What a concluded match looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport {
    pub match_id: MatchId,
    pub conclusion: Conclusion,
    /// Player IDs in seat order.
    pub players: [PlayerId; 2],
    pub moves_played: u8,
    pub board: BoardSnapshot,
}

/// A logged-in player: the ID they gave and where their record lives.
#[derive(Debug, Clone, Copy)]
struct Seat {
    player_id: PlayerId,
    slot: SlotIndex,
}

/// The referee for one game between two connections.
pub struct MatchSession<C: Connection> {
    id: MatchId,
    connections: [C; 2],
    store: RecordStore,
    config: MatchConfig,
    board: Board,
    state: MatchState,
}

impl<C: Connection> MatchSession<C> {
    /// Pairs two connections. `first` plays X and moves first.
    pub fn new(first: C, second: C, store: RecordStore, config: MatchConfig) -> Self {
        Self {
            id: MatchId::next(),
            connections: [first, second],
            store,
            config,
            board: Board::new(),
            state: MatchState::AwaitingPlayer1Id,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    /// Plays the match to its end and closes both connections.
    ///
    /// Records are updated only when the game concludes (win, draw or
    /// forfeit). Any error return means the records were left untouched.
    pub async fn run(mut self) -> Result<MatchReport, MatchError> {
        tracing::info!(
            match_id = %self.id,
            player1 = %self.connections[0].id(),
            player2 = %self.connections[1].id(),
            "match started"
        );

        let result = self.play().await;

        for conn in &self.connections {
            if let Err(e) = conn.close().await {
                tracing::debug!(match_id = %self.id, conn_id = %conn.id(), error = %e, "close failed");
            }
        }

        match &result {
            Ok(report) => tracing::info!(
                match_id = %self.id,
                conclusion = ?report.conclusion,
                moves = report.moves_played,
                "match concluded"
            ),
            Err(e) => tracing::warn!(
                match_id = %self.id,
                state = %self.state,
                error = %e,
                "match ended without a result"
            ),
        }
        result
    }

    async fn play(&mut self) -> Result<MatchReport, MatchError> {
        let first = self.login(Side::One, None).await?;
        self.state = MatchState::AwaitingPlayer2Id;
        let second = self.login(Side::Two, Some(first.slot)).await?;

        let conclusion = self.take_turns().await?;
        self.state = MatchState::Concluded(conclusion);

        let seats = [first, second];
        let seat = |side: Side| match side {
            Side::One => seats[0],
            Side::Two => seats[1],
        };
        let result = match conclusion.winner() {
            Some(winner) => GameResult::Decisive {
                winner: seat(winner).slot,
                loser: seat(winner.other()).slot,
            },
            None => GameResult::Draw(first.slot, second.slot),
        };
        // Record first: if a final send fails the result is still kept.
        self.store.record_result(result).await?;

        let board = self.board.snapshot();
        let announcements = match conclusion.winner() {
            Some(winner) => [(winner, Outcome::Won), (winner.other(), Outcome::Lost)],
            None => [(Side::One, Outcome::Draw), (Side::Two, Outcome::Draw)],
        };
        for (side, outcome) in announcements {
            if let Err(e) = self.send(side, &ServerMessage::GameOver { outcome, board }).await {
                tracing::warn!(match_id = %self.id, %side, error = %e, "could not deliver GAME_OVER");
            }
        }

        Ok(MatchReport {
            match_id: self.id,
            conclusion,
            players: [first.player_id, second.player_id],
            moves_played: self.board.moves_played(),
            board,
        })
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    /// Asks `side` for an ID until it names a record that exists and is not
    /// already seated at `taken`, then sends that record back.
    async fn login(
        &mut self,
        side: Side,
        taken: Option<SlotIndex>,
    ) -> Result<Seat, MatchError> {
        let mut attempts = 0u32;
        loop {
            if let Some(max) = self.config.max_login_attempts {
                if attempts >= max {
                    return Err(MatchError::LoginAttemptsExhausted { side, attempts });
                }
            }
            attempts += 1;

            self.send(side, &ServerMessage::RequestId).await?;
            let player_id = match self.receive(side).await? {
                Some(ClientMessage::IdReply(id)) => id,
                Some(other) => return Err(unexpected(side, &other)),
                None => return Err(MatchError::LoginTimedOut(side)),
            };

            let slot = match self.store.lookup(player_id).await {
                Ok(slot) if Some(slot) == taken => {
                    tracing::debug!(match_id = %self.id, %side, %player_id, "player already seated, asking again");
                    continue;
                }
                Ok(slot) => slot,
                Err(RecordError::NotFound(_)) => {
                    tracing::debug!(match_id = %self.id, %side, %player_id, "unknown player, asking again");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let record = self.store.snapshot(slot).await?;
            self.send(side, &ServerMessage::Record(record)).await?;
            tracing::info!(match_id = %self.id, %side, %player_id, "player logged in");
            return Ok(Seat { player_id, slot });
        }
    }

    // -----------------------------------------------------------------------
    // Turn loop
    // -----------------------------------------------------------------------

    async fn take_turns(&mut self) -> Result<Conclusion, MatchError> {
        let mut active = Side::One;
        loop {
            self.state = MatchState::InProgress(active);
            self.send(active.other(), &ServerMessage::Wait).await?;
            self.send(active, &ServerMessage::YourTurn(self.board.snapshot()))
                .await?;

            let (row, col) = match self.receive(active).await? {
                Some(ClientMessage::Move { row, col }) => (row, col),
                Some(other) => return Err(unexpected(active, &other)),
                None => {
                    tracing::warn!(match_id = %self.id, side = %active, "no move before timeout, forfeiting");
                    return Ok(Conclusion::Forfeit { winner: active.other() });
                }
            };

            if let Err(invalid) = self.board.place(row, col, active) {
                tracing::debug!(match_id = %self.id, side = %active, row, col, %invalid, "move refused");
                self.send(active, &ServerMessage::Invalid(invalid.reason()))
                    .await?;
                continue;
            }
            tracing::debug!(
                match_id = %self.id,
                side = %active,
                row,
                col,
                moves = self.board.moves_played(),
                "move accepted\n{}",
                self.board
            );

            if let Some(winner) = self.board.winner() {
                return Ok(Conclusion::Win(winner));
            }
            if self.board.is_full() {
                return Ok(Conclusion::Draw);
            }
            active = active.other();
        }
    }

    // -----------------------------------------------------------------------
    // I/O
    // -----------------------------------------------------------------------

    fn connection(&self, side: Side) -> &C {
        match side {
            Side::One => &self.connections[0],
            Side::Two => &self.connections[1],
        }
    }

    async fn send(&self, side: Side, msg: &ServerMessage) -> Result<(), MatchError> {
        send_message(self.connection(side), msg)
            .await
            .map_err(|e| classify(side, e))
    }

    /// Reads one client message. `Ok(None)` means the configured read
    /// timeout elapsed first.
    async fn receive(&self, side: Side) -> Result<Option<ClientMessage>, MatchError> {
        let read = recv_message::<ClientMessage, C>(self.connection(side));
        let received = match self.config.read_timeout() {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(received) => received,
                Err(_) => return Ok(None),
            },
            None => read.await,
        };
        match received {
            Ok(Some(msg)) => Ok(Some(msg)),
            Ok(None) => Err(MatchError::Disconnected(side)),
            Err(e) => Err(classify(side, e)),
        }
    }
}

/// Splits protocol-layer failures into "the wire broke" and "the peer
/// misbehaved".
fn classify(side: Side, err: ProtocolError) -> MatchError {
    match err {
        ProtocolError::Transport(source) => MatchError::Transport { side, source },
        other => MatchError::ProtocolViolation {
            side,
            detail: other.to_string(),
        },
    }
}

fn unexpected(side: Side, msg: &ClientMessage) -> MatchError {
    MatchError::ProtocolViolation {
        side,
        detail: format!("unexpected {} message", msg.tag()),
    }
}
