//! The session: owner of the single live connection handle and of the
//! lifecycle state machine.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::RTCDataChannel;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::events::{self, EngineEvent, SessionEvents};
use crate::logger::log;
use crate::peer::{connection, data_channel};
use crate::role::Role;
use crate::signaling::{self, Description, TokenKind};
use crate::utils::random_id;

/// Lifecycle states of a session.
///
/// `Created → Gathering → LocalReady → Handshaking → Connected`, with
/// `Error` reachable from any non-terminal state and `Closed` on teardown.
/// A remote token may be applied from `Gathering` or `LocalReady`; the two
/// orderings of local readiness vs. remote arrival are both valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Gathering,
    LocalReady,
    Handshaking,
    Connected,
    Error,
    Closed,
}

/// The live transport-engine instance bound to a session. At most one
/// exists per session; replacing it releases the old one first, router
/// before engine, so no event is delivered against a stale session.
pub(crate) struct Handle {
    pub(crate) pc: Arc<RTCPeerConnection>,
    pub(crate) dc: Option<Arc<RTCDataChannel>>,
    pub(crate) router: JoinHandle<()>,
    pub(crate) engine_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.router.abort();
    }
}

pub(crate) struct Shared {
    pub(crate) generation: u64,
    pub(crate) role: Option<Role>,
    pub(crate) state: SessionState,
    pub(crate) exchange_id: Option<String>,
    pub(crate) local_token: Option<String>,
    pub(crate) remote_token: Option<String>,
    pub(crate) handle: Option<Handle>,
}

pub(crate) struct SessionInner {
    pub(crate) config: SessionConfig,
    pub(crate) shared: Mutex<Shared>,
}

impl SessionInner {
    /// Encodes and records the local description once gathering completed.
    /// Returns `None` when the event belongs to a released handle or a token
    /// was already produced; a handle emits its token exactly once.
    pub(crate) fn record_local_description(
        &self,
        generation: u64,
        desc: RTCSessionDescription,
    ) -> Option<String> {
        let mut shared = self.shared.lock().unwrap();
        if shared.generation != generation || shared.handle.is_none() {
            return None;
        }
        if shared.local_token.is_some() {
            return None;
        }
        let role = shared.role?;
        let id = shared.exchange_id.get_or_insert_with(random_id).clone();
        let description = Description {
            kind: role.produces(),
            payload: desc.sdp,
            id: Some(id),
            ts: Some(chrono::Utc::now().timestamp()),
        };
        let token = if self.config.compact_tokens {
            signaling::pack(&description)
        } else {
            signaling::encode(&description)
        };
        shared.local_token = Some(token.clone());
        if shared.state == SessionState::Gathering {
            shared.state = SessionState::LocalReady;
        }
        Some(token)
    }

    /// Records the consumed remote token and moves the session to
    /// `Handshaking`. Skipped entirely when the handle changed while the
    /// engine call was in flight or the session failed or closed meanwhile;
    /// a session that already connected keeps its state and only records
    /// the token.
    pub(crate) fn mark_handshaking(&self, generation: u64, token: &str) -> bool {
        let mut shared = self.shared.lock().unwrap();
        if shared.generation != generation
            || matches!(shared.state, SessionState::Error | SessionState::Closed)
        {
            return false;
        }
        shared.remote_token = Some(token.to_string());
        if matches!(
            shared.state,
            SessionState::Gathering | SessionState::LocalReady
        ) {
            shared.state = SessionState::Handshaking;
        }
        true
    }

    /// Adopts the open data channel and moves the session to `Connected`,
    /// returning the role for the greeting. A failed or closed session is
    /// never revived.
    pub(crate) fn mark_connected(
        &self,
        generation: u64,
        dc: &Arc<RTCDataChannel>,
    ) -> Option<Role> {
        let mut shared = self.shared.lock().unwrap();
        if shared.generation != generation
            || matches!(shared.state, SessionState::Error | SessionState::Closed)
        {
            return None;
        }
        let handle = shared.handle.as_mut()?;
        handle.dc = Some(dc.clone());
        shared.state = SessionState::Connected;
        shared.role
    }

    /// Moves the session to `Error`. Returns whether the transition
    /// happened, so the router emits at most one error event per handle.
    pub(crate) fn mark_errored(&self, generation: u64) -> bool {
        let mut shared = self.shared.lock().unwrap();
        if shared.generation != generation
            || matches!(shared.state, SessionState::Error | SessionState::Closed)
        {
            return false;
        }
        shared.state = SessionState::Error;
        true
    }

    /// Moves the session to `Closed` on an engine-initiated teardown.
    pub(crate) fn mark_closed(&self, generation: u64) -> bool {
        let mut shared = self.shared.lock().unwrap();
        if shared.generation != generation
            || matches!(shared.state, SessionState::Error | SessionState::Closed)
        {
            return false;
        }
        shared.state = SessionState::Closed;
        true
    }
}

/// A single logical peer-to-peer attempt, driven through manual signaling.
///
/// `start` creates the engine instance and begins candidate gathering; the
/// local token arrives on the returned event stream once gathering
/// completes. The remote token obtained out of band is fed back through
/// [`Session::apply_remote_token`], in either order relative to local
/// readiness.
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Session {
            inner: Arc::new(SessionInner {
                config,
                shared: Mutex::new(Shared {
                    generation: 0,
                    role: None,
                    state: SessionState::Created,
                    exchange_id: None,
                    local_token: None,
                    remote_token: None,
                    handle: None,
                }),
            }),
        }
    }

    /// Creates a fresh connection handle for `role` and starts candidate
    /// gathering. Any previous handle is released first; nothing carries
    /// over. Returns the event stream for the new handle.
    pub async fn start(&self, role: Role) -> Result<SessionEvents, SessionError> {
        self.inner.config.validate()?;

        let stale = {
            let mut shared = self.inner.shared.lock().unwrap();
            shared.handle.take()
        };
        if let Some(handle) = stale {
            release(handle).await;
        }

        let generation = {
            let mut shared = self.inner.shared.lock().unwrap();
            shared.generation += 1;
            shared.role = None;
            shared.state = SessionState::Created;
            shared.exchange_id = None;
            shared.local_token = None;
            shared.remote_token = None;
            shared.generation
        };

        let (engine_tx, engine_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let pc = connection::create_peer(&self.inner.config, role, engine_tx.clone()).await?;

        // The initiator creates the channel and produces the offer; the
        // receiver's description (the answer) is produced only after the
        // remote offer has been applied.
        let mut dc = None;
        if role == Role::Initiator {
            let channel = pc
                .create_data_channel(
                    &self.inner.config.channel_label,
                    Some(RTCDataChannelInit::default()),
                )
                .await?;
            data_channel::attach(&channel, &engine_tx);
            dc = Some(channel);

            let offer = pc.create_offer(None).await?;
            let gathered = pc.gathering_complete_promise().await;
            pc.set_local_description(offer).await?;
            connection::forward_local_description(pc.clone(), gathered, engine_tx.clone());
        }

        let router = events::spawn_router(self.inner.clone(), generation, engine_rx, event_tx);

        {
            let mut shared = self.inner.shared.lock().unwrap();
            shared.role = Some(role);
            shared.state = SessionState::Gathering;
            shared.handle = Some(Handle {
                pc,
                dc,
                router,
                engine_tx,
            });
        }

        log(&format!("session started as {role}"));
        Ok(SessionEvents::new(event_rx))
    }

    /// Ingests a description token obtained out of band from the peer.
    ///
    /// The token kind is validated against the role before it reaches the
    /// engine: an initiator only consumes answers, a receiver only offers.
    /// May be called before or after local gathering completes.
    pub async fn apply_remote_token(&self, token: &str) -> Result<(), SessionError> {
        let desc = signaling::decode(token)?;

        let (role, pc, engine_tx, generation) = {
            let mut shared = self.inner.shared.lock().unwrap();
            if matches!(shared.state, SessionState::Error | SessionState::Closed) {
                return Err(SessionError::NoActiveConnection);
            }
            let role = shared.role.ok_or(SessionError::NoActiveConnection)?;
            let handle = shared.handle.as_ref().ok_or(SessionError::NoActiveConnection)?;
            if desc.kind != role.consumes() {
                return Err(SessionError::InvalidTokenKind {
                    role,
                    kind: desc.kind,
                });
            }
            if shared.remote_token.is_some() {
                return Err(SessionError::Transport(
                    "remote description already applied".into(),
                ));
            }
            let pc = handle.pc.clone();
            let engine_tx = handle.engine_tx.clone();
            if shared.exchange_id.is_none() {
                shared.exchange_id = desc.id.clone();
            }
            (role, pc, engine_tx, shared.generation)
        };

        let remote = match desc.kind {
            TokenKind::Offer => RTCSessionDescription::offer(desc.payload)?,
            TokenKind::Answer => RTCSessionDescription::answer(desc.payload)?,
        };
        pc.set_remote_description(remote).await?;

        if role == Role::Receiver {
            let answer = pc.create_answer(None).await?;
            let gathered = pc.gathering_complete_promise().await;
            pc.set_local_description(answer).await?;
            connection::forward_local_description(pc.clone(), gathered, engine_tx);
        }

        // the handle may have been replaced or torn down while the engine
        // call was in flight; the stale token is then discarded
        if self.inner.mark_handshaking(generation, token) {
            log(&format!("remote {} applied", desc.kind));
        }
        Ok(())
    }

    /// Sends a text message to the peer over the open data channel.
    pub async fn send(&self, text: &str) -> Result<(), SessionError> {
        let dc = self.open_channel()?;
        dc.send_text(text.to_string()).await?;
        Ok(())
    }

    /// Sends raw bytes to the peer over the open data channel.
    pub async fn send_bytes(&self, data: &[u8]) -> Result<(), SessionError> {
        let dc = self.open_channel()?;
        dc.send(&Bytes::copy_from_slice(data)).await?;
        Ok(())
    }

    /// The open data channel, or the error matching the current state: a
    /// failed session needs an explicit reset, anything else simply is not
    /// connected yet (or anymore).
    fn open_channel(&self) -> Result<Arc<RTCDataChannel>, SessionError> {
        let shared = self.inner.shared.lock().unwrap();
        if shared.state == SessionState::Error {
            return Err(SessionError::NoActiveConnection);
        }
        if shared.state != SessionState::Connected {
            return Err(SessionError::NotConnected);
        }
        shared
            .handle
            .as_ref()
            .and_then(|handle| handle.dc.clone())
            .ok_or(SessionError::NotConnected)
    }

    /// Tears everything down. Idempotent; the session ends in `Closed` and
    /// can be restarted with [`Session::start`].
    pub async fn stop(&self) {
        let handle = {
            let mut shared = self.inner.shared.lock().unwrap();
            shared.state = SessionState::Closed;
            shared.handle.take()
        };
        if let Some(handle) = handle {
            release(handle).await;
            log("session stopped");
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.shared.lock().unwrap().state
    }

    pub fn role(&self) -> Option<Role> {
        self.inner.shared.lock().unwrap().role
    }

    pub fn local_token(&self) -> Option<String> {
        self.inner.shared.lock().unwrap().local_token.clone()
    }

    pub fn remote_token(&self) -> Option<String> {
        self.inner.shared.lock().unwrap().remote_token.clone()
    }
}

/// Releases a handle: the router is stopped before the engine instance is
/// closed, so nothing it still emits can reach the session.
async fn release(handle: Handle) {
    handle.router.abort();
    if let Some(dc) = &handle.dc {
        let _ = dc.close().await;
    }
    let _ = handle.pc.close().await;
}
