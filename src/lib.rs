//! Peer-to-peer data sessions negotiated over a manual, out-of-band
//! signaling exchange — no signaling server.
//!
//! One endpoint starts as [`Role::Initiator`], the other as
//! [`Role::Receiver`]. Each side generates a description token once the
//! engine finishes candidate gathering (trickling is disabled, so the token
//! carries the complete candidate set); the tokens are carried between the
//! two parties by any external channel — clipboard, chat, voice — and fed
//! back in with [`Session::apply_remote_token`]. When the data channel
//! opens, each side sends a greeting identifying its role and the session
//! is ready for [`Session::send`].
//!
//! ```no_run
//! use pastewire::{Role, Session, SessionConfig, SessionEvent};
//!
//! # async fn run() -> Result<(), pastewire::SessionError> {
//! let session = Session::new(SessionConfig::default());
//! let mut events = session.start(Role::Initiator).await?;
//! while let Some(event) = events.recv().await {
//!     match event {
//!         // hand the token to the other party, e.g. via clipboard
//!         SessionEvent::LocalToken(token) => println!("{token}"),
//!         SessionEvent::Connected => session.send("hello").await?,
//!         SessionEvent::Message(text) => println!("peer: {text}"),
//!         SessionEvent::Error(detail) => eprintln!("{detail}"),
//!         SessionEvent::Closed => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod role;
pub mod session;
pub mod signaling;

mod logger;
mod peer;
mod utils;

pub use config::{IceServerConfig, IceServerKind, SessionConfig};
pub use error::SessionError;
pub use events::{SessionEvent, SessionEvents};
pub use role::Role;
pub use session::{Session, SessionState};
pub use signaling::{Description, TokenKind};
