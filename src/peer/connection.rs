//! Transport-engine instance construction and callback wiring.

use std::sync::Arc;

use tokio::sync::mpsc;
use webrtc::api::APIBuilder;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::RTCPeerConnection;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::events::EngineEvent;
use crate::logger::log;
use crate::peer::data_channel;
use crate::role::Role;

/// Builds a peer connection with its lifecycle callbacks feeding the
/// router channel. For a receiver the remote side creates the data channel,
/// so the `on_data_channel` hook is registered here, before any remote
/// description can be applied.
pub(crate) async fn create_peer(
    config: &SessionConfig,
    role: Role,
    events: mpsc::UnboundedSender<EngineEvent>,
) -> Result<Arc<RTCPeerConnection>, SessionError> {
    let api = APIBuilder::new().build();
    let pc = Arc::new(api.new_peer_connection(rtc_config(config)).await?);

    pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
        match candidate {
            Some(c) => {
                if let Ok(init) = c.to_json() {
                    log(&format!("local candidate: {}", init.candidate));
                }
            }
            // a null candidate marks the end of gathering
            None => log("candidate gathering finished"),
        }
        Box::pin(async {})
    }));

    pc.on_ice_gathering_state_change(Box::new(move |state| {
        log(&format!("ice gathering state: {state:?}"));
        Box::pin(async {})
    }));

    let state_events = events.clone();
    pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
        let _ = state_events.send(EngineEvent::PeerState(state));
        Box::pin(async {})
    }));

    if role == Role::Receiver {
        let dc_events = events.clone();
        pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            log(&format!("remote data channel: {}", dc.label()));
            data_channel::attach(&dc, &dc_events);
            Box::pin(async {})
        }));
    }

    Ok(pc)
}

/// Forwards the complete local description to the router once the engine
/// finishes candidate gathering. With trickling disabled this is the one
/// signal event a handle produces.
pub(crate) fn forward_local_description(
    pc: Arc<RTCPeerConnection>,
    mut gathered: mpsc::Receiver<()>,
    events: mpsc::UnboundedSender<EngineEvent>,
) {
    tokio::spawn(async move {
        let _ = gathered.recv().await;
        match pc.local_description().await {
            Some(desc) => {
                let _ = events.send(EngineEvent::LocalReady(desc));
            }
            None => {
                let _ = events.send(EngineEvent::Fault(
                    "no local description after candidate gathering".into(),
                ));
            }
        }
    });
}

fn rtc_config(config: &SessionConfig) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: config.ice_servers.iter().map(|s| s.to_rtc()).collect(),
        ice_candidate_pool_size: 10,
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}
