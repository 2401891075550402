//! Error types for the protocol layer.
//!
//! Each crate in Gridduel defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the bytes themselves (or in moving
//! them), not in game rules or record keeping.

use gridduel_transport::TransportError;

use crate::Tag;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The bytes do not form a valid message.
    ///
    /// Covers buffers shorter than the tag's declared size, unknown tags,
    /// unknown reason/outcome/cell codes, and names that are not UTF-8.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A well-formed message arrived where it is not allowed, e.g. a
    /// server-only tag sent by a client.
    #[error("unexpected {0} message")]
    UnexpectedTag(Tag),

    /// A field value cannot be represented on the wire.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// Moving bytes failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
