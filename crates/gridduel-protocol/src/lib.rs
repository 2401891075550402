//! Wire protocol for Gridduel.
//!
//! This crate defines the "language" that the referee server and game
//! clients speak:
//!
//! - **Types** ([`ServerMessage`], [`ClientMessage`], [`PlayerRecord`],
//!   [`BoardSnapshot`], etc.): the values that travel on the wire.
//! - **Codec** ([`WireMessage`], [`recv_message`], [`send_message`]):
//!   fixed-layout encoding plus tag-based framing over a connection.
//! - **Errors** ([`ProtocolError`]): what can go wrong.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (messages) → Match session (game rules)
//! ```
//!
//! The protocol layer knows nothing about turns or records; it only knows
//! how to turn messages into bytes and back.

mod codec;
mod error;
mod types;

pub use codec::{recv_message, send_message, WireMessage};
pub use error::ProtocolError;
pub use types::{
    BoardSnapshot, Cell, ClientMessage, InvalidReason, Name, Outcome,
    PlayerId, PlayerRecord, ServerMessage, Tag,
};
