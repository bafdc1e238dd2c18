use std::fmt;

use crate::logger::log;
use crate::signaling::TokenKind;

/// The two fixed endpoint roles. Resolved once per session start and
/// immutable until the session is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Receiver,
}

impl Role {
    /// Resolves the role from a one-time bootstrap signal (a launch flag or
    /// query string). Absence of the signal defaults to `Receiver`.
    pub fn resolve(bootstrap: Option<&str>) -> Role {
        let role = match bootstrap {
            Some(flag) if flag.contains("init") => Role::Initiator,
            _ => Role::Receiver,
        };
        log(&format!("resolved role: {role}"));
        role
    }

    /// The token kind this role generates locally.
    pub fn produces(self) -> TokenKind {
        match self {
            Role::Initiator => TokenKind::Offer,
            Role::Receiver => TokenKind::Answer,
        }
    }

    /// The token kind this role accepts from the remote side.
    pub fn consumes(self) -> TokenKind {
        match self {
            Role::Initiator => TokenKind::Answer,
            Role::Receiver => TokenKind::Offer,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Receiver => f.write_str("receiver"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_bootstrap_defaults_to_receiver() {
        assert_eq!(Role::resolve(None), Role::Receiver);
        assert_eq!(Role::resolve(Some("")), Role::Receiver);
    }

    #[test]
    fn init_flag_resolves_initiator() {
        assert_eq!(Role::resolve(Some("init")), Role::Initiator);
        assert_eq!(Role::resolve(Some("?init=1")), Role::Initiator);
    }

    #[test]
    fn produced_and_consumed_kinds_mirror() {
        assert_eq!(Role::Initiator.produces(), TokenKind::Offer);
        assert_eq!(Role::Initiator.consumes(), TokenKind::Answer);
        assert_eq!(Role::Receiver.produces(), TokenKind::Answer);
        assert_eq!(Role::Receiver.consumes(), TokenKind::Offer);
    }
}
