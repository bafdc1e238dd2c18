//! Data-channel callback wiring, shared between the channel the initiator
//! creates and the one the receiver adopts from the engine.

use std::sync::Arc;

use tokio::sync::mpsc;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;

use crate::events::EngineEvent;
use crate::logger::log;

pub(crate) fn attach(dc: &Arc<RTCDataChannel>, events: &mpsc::UnboundedSender<EngineEvent>) {
    dc.on_open(Box::new({
        let dc = dc.clone();
        let events = events.clone();
        move || {
            log(&format!("data channel '{}' open", dc.label()));
            let _ = events.send(EngineEvent::ChannelOpen(dc.clone()));
            Box::pin(async {})
        }
    }));

    dc.on_message(Box::new({
        let events = events.clone();
        move |msg: DataChannelMessage| {
            let text = String::from_utf8_lossy(&msg.data).to_string();
            let _ = events.send(EngineEvent::Message(text));
            Box::pin(async {})
        }
    }));

    dc.on_close(Box::new({
        let events = events.clone();
        move || {
            log("data channel closed");
            let _ = events.send(EngineEvent::ChannelClosed);
            Box::pin(async {})
        }
    }));
}
