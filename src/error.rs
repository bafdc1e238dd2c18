use thiserror::Error;

use crate::role::Role;
use crate::signaling::TokenKind;

/// Everything a session operation can fail with. No variant is retried
/// automatically; recovery is an explicit `stop()` + `start()` cycle.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The token is not well-formed structured text (bad JSON, bad armor,
    /// missing `kind` field).
    #[error("malformed token: {0}")]
    InvalidTokenFormat(String),

    /// The token kind does not match what this role may consume: an
    /// initiator only accepts answers, a receiver only accepts offers.
    #[error("{role} session cannot accept an {kind} token")]
    InvalidTokenKind { role: Role, kind: TokenKind },

    /// Operation requires a started, non-failed session.
    #[error("no active connection")]
    NoActiveConnection,

    /// `send` called before the data channel opened.
    #[error("not connected")]
    NotConnected,

    /// Rejected ICE server entry in the session configuration.
    #[error("invalid ice server configuration: {0}")]
    InvalidIceServer(String),

    /// Opaque failure surfaced by the underlying engine.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<webrtc::Error> for SessionError {
    fn from(err: webrtc::Error) -> Self {
        SessionError::Transport(err.to_string())
    }
}
