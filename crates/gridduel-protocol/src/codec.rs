//! Encoding, decoding, and framing of wire messages.
//!
//! Every message has a fixed layout selected by its first byte (the
//! [`Tag`]). Encoding is a pure function of the message; decoding checks
//! the buffer length against the tag's declared size before touching any
//! payload byte. Neither does I/O.
//!
//! [`recv_message`] and [`send_message`] add the framing on top of a
//! [`Connection`]: read one tag byte, then exactly the rest of that tag's
//! frame.
//!
//! ```text
//! RECORD     [3][id][first x10][last x10][0][wins][losses][ties]   26
//! YOUR_TURN  [4][cell x9]                                          10
//! INVALID    [5][reason]                                            2
//! GAME_OVER  [6][outcome][cell x9]                                 11
//! MOVE       [7][row][col]                                          3
//! ID_REPLY   [8][id]                                                2
//! WAIT [1], REQUEST_ID [2]                                          1
//! ```

use gridduel_transport::{Connection, TransportError};

use crate::{
    BoardSnapshot, Cell, ClientMessage, InvalidReason, Name, Outcome,
    PlayerId, PlayerRecord, ProtocolError, ServerMessage, Tag,
};

/// Size of a name field on the wire, terminator included.
const NAME_FIELD_LEN: usize = 10;

const RECORD_FIRST_NAME: usize = 2;
const RECORD_LAST_NAME: usize = 12;
const RECORD_WINS: usize = 23;
const RECORD_LOSSES: usize = 24;
const RECORD_TIES: usize = 25;

/// A message type that can be put on the wire.
///
/// Implemented by [`ServerMessage`] and [`ClientMessage`]. `accepts`
/// lets the framing layer reject a tag from the wrong direction before
/// reading its payload.
pub trait WireMessage: Sized {
    /// Encodes the message into exactly `self.tag().frame_len()` bytes.
    fn encode(&self) -> Vec<u8>;

    /// Decodes a message from the front of `buf`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::MalformedMessage`] for a short buffer or
    /// bad field codes, and [`ProtocolError::UnexpectedTag`] for a tag
    /// belonging to the other direction.
    fn decode(buf: &[u8]) -> Result<Self, ProtocolError>;

    /// Returns `true` if messages of this type can carry `tag`.
    fn accepts(tag: Tag) -> bool;
}

impl WireMessage for ServerMessage {
    fn encode(&self) -> Vec<u8> {
        let tag = self.tag();
        let mut buf = Vec::with_capacity(tag.frame_len());
        buf.push(tag.to_byte());

        match self {
            Self::Wait | Self::RequestId => {}
            Self::Record(record) => {
                buf.push(record.player_id.0);
                buf.extend_from_slice(&encode_name(&record.first_name));
                buf.extend_from_slice(&encode_name(&record.last_name));
                buf.push(0); // reserved
                buf.push(saturate(record.wins));
                buf.push(saturate(record.losses));
                buf.push(saturate(record.ties));
            }
            Self::YourTurn(board) => encode_board(&mut buf, board),
            Self::Invalid(reason) => buf.push(reason.to_byte()),
            Self::GameOver { outcome, board } => {
                buf.push(outcome.to_byte());
                encode_board(&mut buf, board);
            }
        }

        debug_assert_eq!(buf.len(), tag.frame_len());
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let tag = checked_tag::<Self>(buf)?;
        match tag {
            Tag::Wait => Ok(Self::Wait),
            Tag::RequestId => Ok(Self::RequestId),
            Tag::Record => {
                let record = PlayerRecord {
                    player_id: PlayerId(buf[1]),
                    first_name: decode_name(
                        &buf[RECORD_FIRST_NAME..RECORD_FIRST_NAME + NAME_FIELD_LEN],
                    )?,
                    last_name: decode_name(
                        &buf[RECORD_LAST_NAME..RECORD_LAST_NAME + NAME_FIELD_LEN],
                    )?,
                    wins: u32::from(buf[RECORD_WINS]),
                    losses: u32::from(buf[RECORD_LOSSES]),
                    ties: u32::from(buf[RECORD_TIES]),
                };
                Ok(Self::Record(record))
            }
            Tag::YourTurn => Ok(Self::YourTurn(decode_board(&buf[1..10])?)),
            Tag::Invalid => Ok(Self::Invalid(InvalidReason::from_byte(buf[1])?)),
            Tag::GameOver => Ok(Self::GameOver {
                outcome: Outcome::from_byte(buf[1])?,
                board: decode_board(&buf[2..11])?,
            }),
            Tag::Move | Tag::IdReply => Err(ProtocolError::UnexpectedTag(tag)),
        }
    }

    fn accepts(tag: Tag) -> bool {
        tag.is_server_tag()
    }
}

impl WireMessage for ClientMessage {
    fn encode(&self) -> Vec<u8> {
        match *self {
            Self::Move { row, col } => vec![Tag::Move.to_byte(), row, col],
            Self::IdReply(id) => vec![Tag::IdReply.to_byte(), id.0],
        }
    }

    fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let tag = checked_tag::<Self>(buf)?;
        match tag {
            Tag::Move => Ok(Self::Move {
                row: buf[1],
                col: buf[2],
            }),
            Tag::IdReply => Ok(Self::IdReply(PlayerId(buf[1]))),
            other => Err(ProtocolError::UnexpectedTag(other)),
        }
    }

    fn accepts(tag: Tag) -> bool {
        tag.is_client_tag()
    }
}

/// Reads the tag, checks direction, and checks the buffer is long enough.
fn checked_tag<M: WireMessage>(buf: &[u8]) -> Result<Tag, ProtocolError> {
    let Some(&first) = buf.first() else {
        return Err(ProtocolError::MalformedMessage("empty buffer".into()));
    };
    let tag = Tag::from_byte(first)?;
    if !M::accepts(tag) {
        return Err(ProtocolError::UnexpectedTag(tag));
    }
    if buf.len() < tag.frame_len() {
        return Err(ProtocolError::MalformedMessage(format!(
            "{tag} needs {} bytes, got {}",
            tag.frame_len(),
            buf.len()
        )));
    }
    Ok(tag)
}

fn saturate(value: u32) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

fn encode_name(name: &Name) -> [u8; NAME_FIELD_LEN] {
    let mut field = [0u8; NAME_FIELD_LEN];
    let bytes = name.as_str().as_bytes();
    // Name guarantees at most 9 bytes, leaving room for the terminator.
    field[..bytes.len()].copy_from_slice(bytes);
    field
}

fn decode_name(field: &[u8]) -> Result<Name, ProtocolError> {
    let end = field.iter().position(|&b| b == 0).ok_or_else(|| {
        ProtocolError::MalformedMessage("name is not NUL-terminated".into())
    })?;
    let text = std::str::from_utf8(&field[..end]).map_err(|e| {
        ProtocolError::MalformedMessage(format!("name is not UTF-8: {e}"))
    })?;
    Name::new(text).map_err(|e| ProtocolError::MalformedMessage(e.to_string()))
}

fn encode_board(buf: &mut Vec<u8>, board: &BoardSnapshot) {
    buf.extend(board.0.iter().map(|cell| cell.to_byte()));
}

fn decode_board(bytes: &[u8]) -> Result<BoardSnapshot, ProtocolError> {
    let mut cells = [Cell::Empty; 9];
    for (cell, &byte) in cells.iter_mut().zip(bytes) {
        *cell = Cell::from_byte(byte)?;
    }
    Ok(BoardSnapshot(cells))
}

// ---------------------------------------------------------------------------
// Framing over a connection
// ---------------------------------------------------------------------------

/// Receives one message: the tag byte, then exactly the rest of its frame.
///
/// Returns `Ok(None)` if the peer closed the connection cleanly between
/// messages. A tag from the wrong direction is rejected before its payload
/// is read.
pub async fn recv_message<M, C>(conn: &C) -> Result<Option<M>, ProtocolError>
where
    M: WireMessage,
    C: Connection,
{
    let Some(mut frame) = conn.recv_exact(1).await? else {
        return Ok(None);
    };
    let tag = Tag::from_byte(frame[0])?;
    if !M::accepts(tag) {
        return Err(ProtocolError::UnexpectedTag(tag));
    }

    let remaining = tag.frame_len() - 1;
    if remaining > 0 {
        let rest = conn.recv_exact(remaining).await?.ok_or_else(|| {
            TransportError::ConnectionClosed(format!(
                "peer closed after the {tag} tag byte"
            ))
        })?;
        frame.extend_from_slice(&rest);
    }

    M::decode(&frame).map(Some)
}

/// Encodes and sends one message.
pub async fn send_message<M, C>(conn: &C, msg: &M) -> Result<(), ProtocolError>
where
    M: WireMessage,
    C: Connection,
{
    conn.send(&msg.encode()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_board() -> BoardSnapshot {
        use Cell::{Empty as E, O, X};
        BoardSnapshot([X, X, X, O, O, E, E, E, E])
    }

    fn round_trip_server(msg: ServerMessage) {
        let bytes = msg.encode();
        assert_eq!(bytes.len(), msg.tag().frame_len(), "{msg:?}");
        let decoded = ServerMessage::decode(&bytes).expect("decode");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_server_messages_round_trip() {
        round_trip_server(ServerMessage::Wait);
        round_trip_server(ServerMessage::RequestId);
        round_trip_server(ServerMessage::YourTurn(sample_board()));
        round_trip_server(ServerMessage::YourTurn(BoardSnapshot::default()));
        round_trip_server(ServerMessage::Invalid(InvalidReason::OutOfRange));
        round_trip_server(ServerMessage::Invalid(InvalidReason::LocationTaken));
        for outcome in [Outcome::Draw, Outcome::Won, Outcome::Lost] {
            round_trip_server(ServerMessage::GameOver {
                outcome,
                board: sample_board(),
            });
        }
    }

    #[test]
    fn test_record_round_trip_boundary_values() {
        // playerID 0, names at the 9-byte limit, stats at the byte limit.
        let mut record = PlayerRecord::new(PlayerId(0), "Alexandra", "Smithsonx").unwrap();
        record.wins = 255;
        record.losses = 0;
        record.ties = 1;
        round_trip_server(ServerMessage::Record(record));

        let empty_names = PlayerRecord::new(PlayerId(255), "", "").unwrap();
        round_trip_server(ServerMessage::Record(empty_names));
    }

    #[test]
    fn test_record_layout_matches_wire_offsets() {
        let mut record = PlayerRecord::new(PlayerId(7), "Ann", "Lee").unwrap();
        record.wins = 1;
        record.losses = 2;
        record.ties = 3;
        let bytes = ServerMessage::Record(record).encode();

        assert_eq!(bytes[0], Tag::Record.to_byte());
        assert_eq!(bytes[1], 7);
        assert_eq!(&bytes[2..6], b"Ann\0");
        assert_eq!(&bytes[12..16], b"Lee\0");
        assert_eq!(bytes[22], 0);
        assert_eq!(&bytes[23..26], &[1, 2, 3]);
    }

    #[test]
    fn test_record_stats_saturate_on_wire() {
        let mut record = PlayerRecord::new(PlayerId(1), "A", "B").unwrap();
        record.wins = 1000;
        let bytes = ServerMessage::Record(record).encode();
        assert_eq!(bytes[RECORD_WINS], 255);
    }

    #[test]
    fn test_client_messages_round_trip() {
        for msg in [
            ClientMessage::Move { row: 0, col: 0 },
            ClientMessage::Move { row: 2, col: 2 },
            ClientMessage::Move { row: 3, col: 255 },
            ClientMessage::IdReply(PlayerId(0)),
            ClientMessage::IdReply(PlayerId(255)),
        ] {
            let bytes = msg.encode();
            assert_eq!(bytes.len(), msg.tag().frame_len());
            assert_eq!(ClientMessage::decode(&bytes).unwrap(), msg);
        }
    }

    #[test]
    fn test_decode_short_buffer_is_malformed() {
        let full = ServerMessage::GameOver {
            outcome: Outcome::Won,
            board: sample_board(),
        }
        .encode();
        for len in 1..full.len() {
            assert!(
                matches!(
                    ServerMessage::decode(&full[..len]),
                    Err(ProtocolError::MalformedMessage(_))
                ),
                "length {len} should be rejected"
            );
        }
        assert!(matches!(
            ClientMessage::decode(&[Tag::Move.to_byte(), 1]),
            Err(ProtocolError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_decode_empty_and_unknown_tag() {
        assert!(matches!(
            ServerMessage::decode(&[]),
            Err(ProtocolError::MalformedMessage(_))
        ));
        assert!(matches!(
            ClientMessage::decode(&[42, 0, 0]),
            Err(ProtocolError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_decode_wrong_direction_is_unexpected_tag() {
        assert!(matches!(
            ClientMessage::decode(&[Tag::Wait.to_byte()]),
            Err(ProtocolError::UnexpectedTag(Tag::Wait))
        ));
        assert!(matches!(
            ServerMessage::decode(&[Tag::Move.to_byte(), 0, 0]),
            Err(ProtocolError::UnexpectedTag(Tag::Move))
        ));
    }

    #[test]
    fn test_decode_bad_codes_are_malformed() {
        // Unknown reason.
        assert!(ServerMessage::decode(&[Tag::Invalid.to_byte(), 9]).is_err());
        // Unknown outcome.
        let mut game_over = vec![Tag::GameOver.to_byte(), 0];
        game_over.extend([0; 9]);
        assert!(ServerMessage::decode(&game_over).is_err());
        // Unknown cell code.
        let mut turn = vec![Tag::YourTurn.to_byte()];
        turn.extend([0, 0, 0, 0, b'Z', 0, 0, 0, 0]);
        assert!(ServerMessage::decode(&turn).is_err());
    }

    #[test]
    fn test_decode_unterminated_name_is_malformed() {
        let mut bytes = ServerMessage::Record(
            PlayerRecord::new(PlayerId(1), "A", "B").unwrap(),
        )
        .encode();
        bytes[2..12].copy_from_slice(b"ABCDEFGHIJ");
        assert!(matches!(
            ServerMessage::decode(&bytes),
            Err(ProtocolError::MalformedMessage(_))
        ));
    }

    #[tokio::test]
    async fn test_recv_message_reads_exactly_one_frame() {
        let (a, b) = gridduel_transport::memory_pair(256);

        send_message(&a, &ServerMessage::Wait).await.unwrap();
        send_message(&a, &ServerMessage::YourTurn(sample_board()))
            .await
            .unwrap();

        let first: Option<ServerMessage> = recv_message(&b).await.unwrap();
        let second: Option<ServerMessage> = recv_message(&b).await.unwrap();
        assert_eq!(first, Some(ServerMessage::Wait));
        assert_eq!(second, Some(ServerMessage::YourTurn(sample_board())));
    }

    #[tokio::test]
    async fn test_recv_message_clean_close_is_none() {
        let (a, b) = gridduel_transport::memory_pair(16);
        a.close().await.unwrap();
        let got: Option<ClientMessage> = recv_message(&b).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_recv_message_wrong_direction_rejected_before_payload() {
        let (a, b) = gridduel_transport::memory_pair(16);
        a.send(&[Tag::YourTurn.to_byte()]).await.unwrap();
        let got: Result<Option<ClientMessage>, _> = recv_message(&b).await;
        assert!(matches!(got, Err(ProtocolError::UnexpectedTag(Tag::YourTurn))));
    }

    #[tokio::test]
    async fn test_recv_message_truncated_frame_is_transport_error() {
        let (a, b) = gridduel_transport::memory_pair(16);
        a.send(&[Tag::Move.to_byte(), 1]).await.unwrap();
        a.close().await.unwrap();
        let got: Result<Option<ClientMessage>, _> = recv_message(&b).await;
        assert!(matches!(got, Err(ProtocolError::Transport(_))));
    }
}
