//! Core protocol types for Gridduel's wire format.
//!
//! Every type in this module travels "on the wire": it is encoded into a
//! fixed number of bytes, sent over a connection, and decoded on the other
//! side. The byte layouts live in the codec module; this
//! module only defines the values and their byte codes.

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's identifier.
///
/// Newtype over `u8` because the wire carries exactly one byte for it
/// (in both the RECORD message and the client's ID reply). You can't
/// accidentally pass a slot index or a stat where a `PlayerId` is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PlayerId(pub u8);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A first or last name as stored in a player record.
///
/// The wire reserves 10 bytes per name: up to 9 bytes of text followed by
/// NUL padding. The constructor enforces that limit so that encoding can
/// never truncate, which keeps encode/decode exact inverses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Name(String);

impl Name {
    /// Maximum length of a name in bytes (the tenth byte is the terminator).
    pub const MAX_LEN: usize = 9;

    /// Validates and wraps a name.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidField`] if the name is longer than
    /// [`Self::MAX_LEN`] bytes or contains a NUL byte.
    pub fn new(name: &str) -> Result<Self, ProtocolError> {
        if name.len() > Self::MAX_LEN {
            return Err(ProtocolError::InvalidField(format!(
                "name {name:?} is {} bytes, max {}",
                name.len(),
                Self::MAX_LEN
            )));
        }
        if name.contains('\0') {
            return Err(ProtocolError::InvalidField(format!(
                "name {name:?} contains a NUL byte"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A player's identity and cumulative statistics.
///
/// Identity is `player_id`; the three counters are the only fields that
/// change after loading. Counters are `u32` in memory; the RECORD message
/// has one byte per counter, so values above 255 are sent as 255.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerRecord {
    pub player_id: PlayerId,
    pub first_name: Name,
    pub last_name: Name,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl PlayerRecord {
    /// Creates a record with zeroed statistics.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidField`] if either name is invalid.
    pub fn new(
        player_id: PlayerId,
        first_name: &str,
        last_name: &str,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            player_id,
            first_name: Name::new(first_name)?,
            last_name: Name::new(last_name)?,
            wins: 0,
            losses: 0,
            ties: 0,
        })
    }
}

impl fmt::Display for PlayerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({}W/{}L/{}T)",
            self.player_id,
            self.first_name,
            self.last_name,
            self.wins,
            self.losses,
            self.ties
        )
    }
}

// ---------------------------------------------------------------------------
// Board cells
// ---------------------------------------------------------------------------

/// The content of one board cell.
///
/// Byte codes are the printable marks so a client can print a cell
/// directly; an empty cell is `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    /// Player 1's mark.
    X,
    /// Player 2's mark.
    O,
}

impl Cell {
    /// Returns the byte used for this cell on the wire.
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::X => b'X',
            Self::O => b'O',
        }
    }

    /// Parses a wire byte.
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0 => Ok(Self::Empty),
            b'X' => Ok(Self::X),
            b'O' => Ok(Self::O),
            other => Err(ProtocolError::MalformedMessage(format!(
                "unknown cell code {other:#04x}"
            ))),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("_"),
            Self::X => f.write_str("X"),
            Self::O => f.write_str("O"),
        }
    }
}

/// The nine cells of a board in row-major order, as carried by
/// YOUR_TURN and GAME_OVER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoardSnapshot(pub [Cell; 9]);

impl BoardSnapshot {
    /// Returns the cell at `(row, col)`. Both must be below 3.
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.0[row * 3 + col]
    }

    /// Returns the three rows of the board.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.0.chunks(3)
    }
}

impl fmt::Display for BoardSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            write!(f, "{} {} {}", row[0], row[1], row[2])?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reason and outcome codes
// ---------------------------------------------------------------------------

/// Why a move was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    /// Row or column outside `0..=2`.
    OutOfRange,
    /// The target cell already holds a mark.
    LocationTaken,
}

impl InvalidReason {
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::OutOfRange => 1,
            Self::LocationTaken => 2,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            1 => Ok(Self::OutOfRange),
            2 => Ok(Self::LocationTaken),
            other => Err(ProtocolError::MalformedMessage(format!(
                "unknown invalid-move reason {other}"
            ))),
        }
    }
}

/// How a game ended, from the point of view of the receiving player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Draw,
    Won,
    Lost,
}

impl Outcome {
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Draw => 1,
            Self::Won => 2,
            Self::Lost => 3,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            1 => Ok(Self::Draw),
            2 => Ok(Self::Won),
            3 => Ok(Self::Lost),
            other => Err(ProtocolError::MalformedMessage(format!(
                "unknown game outcome {other}"
            ))),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draw => f.write_str("draw"),
            Self::Won => f.write_str("won"),
            Self::Lost => f.write_str("lost"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// The first byte of every message. It selects both the message type and
/// its fixed total length; there is no other framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Wait = 1,
    RequestId = 2,
    Record = 3,
    YourTurn = 4,
    Invalid = 5,
    GameOver = 6,
    Move = 7,
    IdReply = 8,
}

impl Tag {
    /// Parses a tag byte.
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            1 => Ok(Self::Wait),
            2 => Ok(Self::RequestId),
            3 => Ok(Self::Record),
            4 => Ok(Self::YourTurn),
            5 => Ok(Self::Invalid),
            6 => Ok(Self::GameOver),
            7 => Ok(Self::Move),
            8 => Ok(Self::IdReply),
            other => Err(ProtocolError::MalformedMessage(format!(
                "unknown tag {other}"
            ))),
        }
    }

    /// Returns the tag byte.
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    /// Total encoded size of a message with this tag, tag byte included.
    pub const fn frame_len(self) -> usize {
        match self {
            Self::Wait | Self::RequestId => 1,
            Self::Record => 26,
            Self::YourTurn => 10,
            Self::Invalid => 2,
            Self::GameOver => 11,
            Self::Move => 3,
            Self::IdReply => 2,
        }
    }

    /// Returns `true` for tags the server sends.
    pub const fn is_server_tag(self) -> bool {
        !self.is_client_tag()
    }

    /// Returns `true` for tags a client sends.
    pub const fn is_client_tag(self) -> bool {
        matches!(self, Self::Move | Self::IdReply)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wait => "WAIT",
            Self::RequestId => "REQUEST_ID",
            Self::Record => "RECORD",
            Self::YourTurn => "YOUR_TURN",
            Self::Invalid => "INVALID",
            Self::GameOver => "GAME_OVER",
            Self::Move => "MOVE",
            Self::IdReply => "ID_REPLY",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Messages the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Hold on: either no opponent yet, or it's the opponent's turn.
    Wait,
    /// Identify yourself with an [`ClientMessage::IdReply`].
    RequestId,
    /// Login succeeded; here is your record.
    Record(PlayerRecord),
    /// Your move. Carries the current board.
    YourTurn(BoardSnapshot),
    /// Your last move was rejected; you will be prompted again.
    Invalid(InvalidReason),
    /// The game has ended.
    GameOver {
        outcome: Outcome,
        board: BoardSnapshot,
    },
}

impl ServerMessage {
    /// Returns this message's tag.
    pub fn tag(&self) -> Tag {
        match self {
            Self::Wait => Tag::Wait,
            Self::RequestId => Tag::RequestId,
            Self::Record(_) => Tag::Record,
            Self::YourTurn(_) => Tag::YourTurn,
            Self::Invalid(_) => Tag::Invalid,
            Self::GameOver { .. } => Tag::GameOver,
        }
    }
}

/// Messages a client sends to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    /// Place my mark at `(row, col)`. Values are not range-checked by the
    /// codec; the match session answers out-of-range moves with INVALID.
    Move { row: u8, col: u8 },
    /// Answer to REQUEST_ID.
    IdReply(PlayerId),
}

impl ClientMessage {
    /// Returns this message's tag.
    pub fn tag(&self) -> Tag {
        match self {
            Self::Move { .. } => Tag::Move,
            Self::IdReply(_) => Tag::IdReply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_accepts_nine_bytes() {
        let name = Name::new("Abcdefghi").expect("9 bytes fits");
        assert_eq!(name.as_str(), "Abcdefghi");
    }

    #[test]
    fn test_name_rejects_ten_bytes() {
        assert!(matches!(
            Name::new("Abcdefghij"),
            Err(ProtocolError::InvalidField(_))
        ));
    }

    #[test]
    fn test_name_rejects_nul() {
        assert!(Name::new("ab\0c").is_err());
    }

    #[test]
    fn test_tag_byte_round_trip_and_unknown() {
        for byte in 1..=8u8 {
            let tag = Tag::from_byte(byte).expect("known tag");
            assert_eq!(tag.to_byte(), byte);
        }
        assert!(Tag::from_byte(0).is_err());
        assert!(Tag::from_byte(9).is_err());
    }

    #[test]
    fn test_tag_direction_split() {
        assert!(Tag::Move.is_client_tag());
        assert!(Tag::IdReply.is_client_tag());
        assert!(Tag::Wait.is_server_tag());
        assert!(Tag::GameOver.is_server_tag());
        assert!(!Tag::Record.is_client_tag());
    }

    #[test]
    fn test_board_snapshot_display() {
        let mut cells = [Cell::Empty; 9];
        cells[0] = Cell::X;
        cells[4] = Cell::O;
        let board = BoardSnapshot(cells);
        assert_eq!(board.to_string(), "X _ _ / _ O _ / _ _ _");
        assert_eq!(board.get(1, 1), Cell::O);
    }

    #[test]
    fn test_player_record_display() {
        let mut record = PlayerRecord::new(PlayerId(3), "Ada", "Lovelace").unwrap();
        record.wins = 2;
        assert_eq!(record.to_string(), "P-3 Ada Lovelace (2W/0L/0T)");
    }
}
