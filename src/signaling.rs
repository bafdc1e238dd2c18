//! Description token codec.
//!
//! A token is JSON with a required `kind` field and an opaque `payload`
//! carrying the engine's session description. For copy-paste channels a
//! full-candidate SDP is bulky, so an armored `base64(gzip(json))` form is
//! offered as well; `decode` accepts either.

use std::fmt;
use std::io::{Read, Write};

use base64::{engine::general_purpose, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Whether a token was produced by the offering or the answering side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Offer,
    Answer,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Offer => f.write_str("offer"),
            TokenKind::Answer => f.write_str("answer"),
        }
    }
}

/// A connection-setup message in transportable form.
///
/// `id` correlates an answer with the offer it responds to and `ts` records
/// when the description was produced; both are optional so that minimal
/// tokens from other tooling still decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub kind: TokenKind,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

/// Serializes a description into its plain JSON token form.
pub fn encode(description: &Description) -> String {
    serde_json::to_string(description).expect("description is always serializable")
}

/// Parses a token in either form. Any malformed input is a hard failure;
/// there is no partial-decode recovery.
pub fn decode(token: &str) -> Result<Description, SessionError> {
    let token = token.trim();
    if token.starts_with('{') {
        serde_json::from_str(token).map_err(|err| SessionError::InvalidTokenFormat(err.to_string()))
    } else {
        unpack(token)
    }
}

/// Serializes a description into the armored compact form.
pub fn pack(description: &Description) -> String {
    let json = serde_json::to_vec(description).expect("description is always serializable");
    let mut gz = GzEncoder::new(Vec::new(), Compression::fast());
    gz.write_all(&json).expect("gzip into memory");
    let compressed = gz.finish().expect("gzip into memory");
    general_purpose::STANDARD.encode(compressed)
}

/// Parses an armored compact token.
pub fn unpack(token: &str) -> Result<Description, SessionError> {
    let compressed = general_purpose::STANDARD
        .decode(token.trim())
        .map_err(|err| SessionError::InvalidTokenFormat(format!("base64: {err}")))?;
    let mut json = Vec::new();
    GzDecoder::new(&compressed[..])
        .read_to_end(&mut json)
        .map_err(|err| SessionError::InvalidTokenFormat(format!("gzip: {err}")))?;
    serde_json::from_slice(&json).map_err(|err| SessionError::InvalidTokenFormat(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Description {
        Description {
            kind: TokenKind::Offer,
            payload: "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\n".into(),
            id: Some("c0ffee00c0ffee00".into()),
            ts: Some(1_756_300_000),
        }
    }

    #[test]
    fn json_round_trip_is_exact() {
        let description = sample();
        assert_eq!(decode(&encode(&description)).unwrap(), description);
    }

    #[test]
    fn armored_round_trip_is_exact() {
        let description = sample();
        assert_eq!(decode(&pack(&description)).unwrap(), description);
    }

    #[test]
    fn minimal_token_decodes_without_metadata() {
        let description = decode(r#"{"kind":"offer","payload":"A"}"#).unwrap();
        assert_eq!(description.kind, TokenKind::Offer);
        assert_eq!(description.payload, "A");
        assert_eq!(description.id, None);
        assert_eq!(description.ts, None);
    }

    #[test]
    fn absent_metadata_is_omitted_from_the_wire() {
        let token = encode(&Description {
            kind: TokenKind::Answer,
            payload: "B".into(),
            id: None,
            ts: None,
        });
        assert_eq!(token, r#"{"kind":"answer","payload":"B"}"#);
    }

    #[test]
    fn missing_kind_is_rejected() {
        let err = decode(r#"{"payload":"A"}"#).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTokenFormat(_)));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = decode(r#"{"kind":"renegotiate","payload":"A"}"#).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTokenFormat(_)));
    }

    #[test]
    fn garbage_is_rejected_in_both_forms() {
        assert!(matches!(
            decode("{not json"),
            Err(SessionError::InvalidTokenFormat(_))
        ));
        assert!(matches!(
            decode("@@ not base64 @@"),
            Err(SessionError::InvalidTokenFormat(_))
        ));
        // valid base64, but not gzip underneath
        let err = decode(&general_purpose::STANDARD.encode(b"plain bytes")).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTokenFormat(_)));
    }
}
