//! Unified error type for Gridduel.

use gridduel_match::MatchError;
use gridduel_protocol::ProtocolError;
use gridduel_records::RecordError;
use gridduel_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GridduelError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, framing).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A record store or storage error (load, save, capacity).
    #[error(transparent)]
    Records(#[from] RecordError),

    /// A match that ended without a result.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The config file could not be read.
    #[error("cannot read config file: {0}")]
    ConfigIo(#[source] std::io::Error),

    /// The config file is not valid JSON for [`ServerConfig`](crate::ServerConfig).
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let gridduel_err: GridduelError = err.into();
        assert!(matches!(gridduel_err, GridduelError::Transport(_)));
        assert!(gridduel_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::MalformedMessage("bad".into());
        let gridduel_err: GridduelError = err.into();
        assert!(matches!(gridduel_err, GridduelError::Protocol(_)));
    }

    #[test]
    fn test_from_record_error() {
        let err = RecordError::CapacityExceeded(10);
        let gridduel_err: GridduelError = err.into();
        assert!(matches!(gridduel_err, GridduelError::Records(_)));
        assert!(gridduel_err.to_string().contains("10 slots"));
    }

    #[test]
    fn test_from_match_error() {
        let err = MatchError::Disconnected(gridduel_match::Side::Two);
        let gridduel_err: GridduelError = err.into();
        assert!(matches!(gridduel_err, GridduelError::Match(_)));
    }
}
