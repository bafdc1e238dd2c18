//! Two in-process sessions performing the full manual signaling exchange
//! over loopback host candidates.

use std::time::Duration;

use tokio::time::timeout;

use pastewire::{Role, Session, SessionConfig, SessionError, SessionEvent, SessionEvents, SessionState};

const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

fn offline_config() -> SessionConfig {
    SessionConfig {
        ice_servers: vec![],
        ..Default::default()
    }
}

async fn next_local_token(events: &mut SessionEvents) -> String {
    timeout(EXCHANGE_TIMEOUT, async {
        loop {
            match events.recv().await {
                Some(SessionEvent::LocalToken(token)) => break token,
                Some(SessionEvent::Error(detail)) => panic!("transport error: {detail}"),
                Some(_) => continue,
                None => panic!("event stream ended before a local token"),
            }
        }
    })
    .await
    .expect("no local token in time")
}

async fn wait_connected(events: &mut SessionEvents) {
    timeout(EXCHANGE_TIMEOUT, async {
        loop {
            match events.recv().await {
                Some(SessionEvent::Connected) => break,
                Some(SessionEvent::Error(detail)) => panic!("transport error: {detail}"),
                Some(_) => continue,
                None => panic!("event stream ended before connecting"),
            }
        }
    })
    .await
    .expect("handshake did not complete in time")
}

async fn next_message(events: &mut SessionEvents) -> String {
    timeout(EXCHANGE_TIMEOUT, async {
        loop {
            match events.recv().await {
                Some(SessionEvent::Message(text)) => break text,
                Some(SessionEvent::Error(detail)) => panic!("transport error: {detail}"),
                Some(_) => continue,
                None => panic!("event stream ended before a message"),
            }
        }
    })
    .await
    .expect("no message in time")
}

#[tokio::test]
async fn manual_exchange_reaches_connected_and_delivers_messages() {
    let initiator = Session::new(offline_config());
    let mut initiator_events = initiator.start(Role::Initiator).await.unwrap();

    // The initiator's offer is ready before the receiver even exists; the
    // receiver applies it while its own description is still pending. Both
    // orderings of local readiness vs. remote arrival are exercised here.
    let offer = next_local_token(&mut initiator_events).await;

    let receiver = Session::new(offline_config());
    let mut receiver_events = receiver.start(Role::Receiver).await.unwrap();
    receiver.apply_remote_token(&offer).await.unwrap();
    assert_eq!(receiver.state(), SessionState::Handshaking);

    let answer = next_local_token(&mut receiver_events).await;
    initiator.apply_remote_token(&answer).await.unwrap();

    wait_connected(&mut initiator_events).await;
    wait_connected(&mut receiver_events).await;
    assert_eq!(initiator.state(), SessionState::Connected);
    assert_eq!(receiver.state(), SessionState::Connected);

    // each side greets the other with its role on connect
    assert_eq!(
        next_message(&mut initiator_events).await,
        "Hello from the receiver"
    );
    assert_eq!(
        next_message(&mut receiver_events).await,
        "Hello from the initiator"
    );

    initiator.send("over-the-wire payload ✓").await.unwrap();
    assert_eq!(
        next_message(&mut receiver_events).await,
        "over-the-wire payload ✓"
    );

    receiver.send("right back at you").await.unwrap();
    assert_eq!(
        next_message(&mut initiator_events).await,
        "right back at you"
    );

    initiator.send_bytes(b"raw frame").await.unwrap();
    assert_eq!(next_message(&mut receiver_events).await, "raw frame");

    // teardown is idempotent
    initiator.stop().await;
    initiator.stop().await;
    receiver.stop().await;
    assert_eq!(initiator.state(), SessionState::Closed);
    assert_eq!(receiver.state(), SessionState::Closed);

    let err = initiator.send("after close").await.unwrap_err();
    assert!(matches!(err, SessionError::NotConnected));
}

#[tokio::test]
async fn armored_tokens_negotiate_end_to_end() {
    let compact = SessionConfig {
        compact_tokens: true,
        ..offline_config()
    };

    let initiator = Session::new(compact.clone());
    let mut initiator_events = initiator.start(Role::Initiator).await.unwrap();
    let offer = next_local_token(&mut initiator_events).await;
    assert!(!offer.trim_start().starts_with('{'));

    let receiver = Session::new(compact);
    let mut receiver_events = receiver.start(Role::Receiver).await.unwrap();
    receiver.apply_remote_token(&offer).await.unwrap();
    let answer = next_local_token(&mut receiver_events).await;
    initiator.apply_remote_token(&answer).await.unwrap();

    wait_connected(&mut initiator_events).await;
    wait_connected(&mut receiver_events).await;

    initiator.stop().await;
    receiver.stop().await;
}

#[tokio::test]
async fn restart_replaces_the_handle_and_discards_tokens() {
    let session = Session::new(offline_config());
    let mut events = session.start(Role::Initiator).await.unwrap();
    let first = next_local_token(&mut events).await;
    assert_eq!(session.local_token(), Some(first));

    // Role change: the old handle is released and gathering restarts from
    // scratch; no state carries over.
    let _events = session.start(Role::Receiver).await.unwrap();
    assert_eq!(session.role(), Some(Role::Receiver));
    assert_eq!(session.state(), SessionState::Gathering);
    assert_eq!(session.local_token(), None);
    assert_eq!(session.remote_token(), None);

    session.stop().await;
}
