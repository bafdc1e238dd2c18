//! Session configuration and compile-time logging switches.

use webrtc::ice_transport::ice_server::RTCIceServer;

use crate::error::SessionError;

#[cfg(debug_assertions)]
pub const LOGGING_ENABLED: bool = true;

#[cfg(not(debug_assertions))]
pub const LOGGING_ENABLED: bool = false;

#[cfg(debug_assertions)]
pub mod dev {
    // Flip to false to silence logging in debug builds.
    pub const ENABLE_LOGGING: bool = true;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceServerKind {
    Stun,
    Turn,
}

/// One ICE server entry. TURN entries must carry credentials.
#[derive(Debug, Clone)]
pub struct IceServerConfig {
    pub kind: IceServerKind,
    pub url: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        IceServerConfig {
            kind: IceServerKind::Stun,
            url: url.into(),
            username: None,
            credential: None,
        }
    }

    pub fn turn(
        url: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        IceServerConfig {
            kind: IceServerKind::Turn,
            url: url.into(),
            username: Some(username.into()),
            credential: Some(credential.into()),
        }
    }

    /// Returns the url with its `stun:`/`turn:` scheme, adding the scheme
    /// matching the server kind when it is missing.
    pub fn url_with_scheme(&self) -> String {
        if self.url.starts_with("stun:") || self.url.starts_with("turn:") {
            self.url.clone()
        } else {
            let scheme = match self.kind {
                IceServerKind::Stun => "stun:",
                IceServerKind::Turn => "turn:",
            };
            format!("{}{}", scheme, self.url)
        }
    }

    pub(crate) fn to_rtc(&self) -> RTCIceServer {
        RTCIceServer {
            urls: vec![self.url_with_scheme()],
            username: self.username.clone().unwrap_or_default(),
            credential: self.credential.clone().unwrap_or_default(),
        }
    }
}

/// Configuration applied to every connection handle a session creates.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Label of the data channel the initiator creates.
    pub channel_label: String,
    /// Emit armored `base64(gzip(json))` tokens instead of plain JSON.
    pub compact_tokens: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            ice_servers: vec![
                IceServerConfig::stun("stun:stun.l.google.com:19302"),
                IceServerConfig::stun("stun:stun1.l.google.com:19302"),
            ],
            channel_label: "pastewire-data".into(),
            compact_tokens: false,
        }
    }
}

impl SessionConfig {
    pub(crate) fn validate(&self) -> Result<(), SessionError> {
        for server in &self.ice_servers {
            if server.url.is_empty() {
                return Err(SessionError::InvalidIceServer(
                    "server url cannot be empty".into(),
                ));
            }
            if server.kind == IceServerKind::Turn
                && (server.username.is_none() || server.credential.is_none())
            {
                return Err(SessionError::InvalidIceServer(
                    "turn servers require username and credential".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn scheme_is_added_when_missing() {
        let stun = IceServerConfig::stun("stun.example.org:3478");
        assert_eq!(stun.url_with_scheme(), "stun:stun.example.org:3478");

        let turn = IceServerConfig::turn("turn.example.org:3478", "user", "pass");
        assert_eq!(turn.url_with_scheme(), "turn:turn.example.org:3478");

        let already = IceServerConfig::stun("stun:stun.example.org:3478");
        assert_eq!(already.url_with_scheme(), "stun:stun.example.org:3478");
    }

    #[test]
    fn turn_without_credentials_is_rejected() {
        let config = SessionConfig {
            ice_servers: vec![IceServerConfig {
                kind: IceServerKind::Turn,
                url: "turn.example.org:3478".into(),
                username: None,
                credential: None,
            }],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidIceServer(_))
        ));
    }

    #[test]
    fn empty_url_is_rejected() {
        let config = SessionConfig {
            ice_servers: vec![IceServerConfig::stun("")],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidIceServer(_))
        ));
    }
}
