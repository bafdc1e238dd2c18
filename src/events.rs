//! Event routing between the transport engine and the session.
//!
//! Each connection handle gets exactly one router task and one public event
//! receiver. Engine callbacks push [`EngineEvent`]s into an ordered channel;
//! the router drives the session state machine, performs the on-connect side
//! effects and forwards the externally observable [`SessionEvent`]s. Events
//! are tagged with the handle's generation, so a router outliving its handle
//! (replaced on restart or role change) never touches the fresh session
//! state.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use webrtc::data_channel::RTCDataChannel;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::logger::log;
use crate::session::SessionInner;

/// Externally observable session events, delivered in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The local description token is ready for out-of-band transport.
    /// Fired exactly once per connection handle.
    LocalToken(String),
    /// The data channel is open; the session reached `Connected`.
    Connected,
    /// A data-channel message arrived from the peer.
    Message(String),
    /// The transport failed; the session moved to `Error`.
    Error(String),
    /// The connection was torn down, locally or by the peer.
    Closed,
}

/// The receiving end of a handle's event stream. `start` hands out one per
/// connection handle, which is also the subscription contract: at most one
/// subscriber, subscribed exactly once.
pub struct SessionEvents {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        SessionEvents { rx }
    }

    /// Waits for the next event. Returns `None` once the handle is released
    /// and all pending events were drained.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }
}

/// Raw engine notifications, one ordered channel per connection handle.
pub(crate) enum EngineEvent {
    /// Candidate gathering finished and the complete local description is
    /// available.
    LocalReady(RTCSessionDescription),
    /// The data channel opened (carries the channel so the receiver side,
    /// which never creates one itself, can adopt it).
    ChannelOpen(Arc<RTCDataChannel>),
    Message(String),
    ChannelClosed,
    PeerState(RTCPeerConnectionState),
    /// Engine-side failure detected outside the state-change callback.
    Fault(String),
}

pub(crate) fn spawn_router(
    inner: Arc<SessionInner>,
    generation: u64,
    mut engine_rx: mpsc::UnboundedReceiver<EngineEvent>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = engine_rx.recv().await {
            match event {
                EngineEvent::LocalReady(desc) => {
                    if let Some(token) = inner.record_local_description(generation, desc) {
                        log("local description token ready");
                        let _ = event_tx.send(SessionEvent::LocalToken(token));
                    }
                }
                EngineEvent::ChannelOpen(dc) => {
                    let Some(role) = inner.mark_connected(generation, &dc) else {
                        continue;
                    };
                    let greeting = format!("Hello from the {role}");
                    if let Err(err) = dc.send_text(greeting).await {
                        log(&format!("failed to send greeting: {err}"));
                    }
                    let _ = event_tx.send(SessionEvent::Connected);
                }
                EngineEvent::Message(text) => {
                    let _ = event_tx.send(SessionEvent::Message(text));
                }
                EngineEvent::ChannelClosed => {
                    if inner.mark_closed(generation) {
                        let _ = event_tx.send(SessionEvent::Closed);
                    }
                }
                EngineEvent::PeerState(state) => match state {
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Disconnected => {
                        let detail = format!("peer connection {state:?}");
                        log(&detail);
                        if inner.mark_errored(generation) {
                            let _ = event_tx.send(SessionEvent::Error(detail));
                        }
                    }
                    RTCPeerConnectionState::Closed => {
                        if inner.mark_closed(generation) {
                            let _ = event_tx.send(SessionEvent::Closed);
                        }
                    }
                    other => {
                        log(&format!("peer connection state: {other:?}"));
                    }
                },
                EngineEvent::Fault(detail) => {
                    log(&detail);
                    if inner.mark_errored(generation) {
                        let _ = event_tx.send(SessionEvent::Error(detail));
                    }
                }
            }
        }
    })
}
