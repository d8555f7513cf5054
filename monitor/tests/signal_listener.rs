//! Integration tests: signal listener against an in-process WebSocket source
//!
//! Run with: cargo test --test signal_listener

mod helpers;

use code_pulse_lib::session::listener::{ListenerState, SignalListener};
use code_pulse_lib::session::protocol::HANDSHAKE_PAYLOAD;
use code_pulse_lib::test_utils::assert_eventually_bool;
use code_pulse_lib::MonitorError;
use helpers::signal_server::{unused_port, SignalServer};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

async fn wait_for_state(listener: &SignalListener, expected: ListenerState) {
    assert_eventually_bool(
        &format!("listener to reach {}", expected),
        WAIT,
        Duration::from_millis(10),
        || {
            let state = listener.state();
            async move { state == expected }
        },
    )
    .await;
}

#[tokio::test]
async fn sends_handshake_once_on_open() {
    let mut server = SignalServer::start().await;
    let mut listener = SignalListener::new(server.url(), HANDSHAKE_PAYLOAD);

    let _signals = listener.set_up().unwrap();
    assert_eq!(
        server.next_inbound(WAIT).await.as_deref(),
        Some(HANDSHAKE_PAYLOAD)
    );
    wait_for_state(&listener, ListenerState::Open).await;
    assert_eq!(server.next_inbound(Duration::from_millis(100)).await, None);

    listener.close().await;
    assert_eq!(listener.state(), ListenerState::Closed);
}

#[tokio::test]
async fn delivers_signals_in_order_and_skips_bad_payloads() {
    let mut server = SignalServer::start().await;
    let mut listener = SignalListener::new(server.url(), HANDSHAKE_PAYLOAD);
    let mut signals = listener.set_up().unwrap();
    server.next_inbound(WAIT).await.expect("handshake");

    server.send_text(r#"{"Need help": "True", "load": 0.9}"#);
    server.send_text("this is not json");
    server.send_text(r#"{"Need help": "sometimes"}"#);
    server.send_binary(br#"{"Need help": "False", "Is stressed": "True"}"#);

    let first = tokio::time::timeout(WAIT, signals.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(first.need_help.is_set());
    assert_eq!(first.extra.get("load"), Some(&serde_json::json!(0.9)));

    let second = tokio::time::timeout(WAIT, signals.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(!second.need_help.is_set());
    assert!(second.is_stressed.is_set());

    // Bad payloads did not take the connection down
    assert_eq!(listener.state(), ListenerState::Open);
    listener.close().await;
}

#[tokio::test]
async fn server_close_is_terminal() {
    let mut server = SignalServer::start().await;
    let mut listener = SignalListener::new(server.url(), HANDSHAKE_PAYLOAD);
    let mut signals = listener.set_up().unwrap();
    server.next_inbound(WAIT).await.expect("handshake");

    server.close();
    wait_for_state(&listener, ListenerState::Closed).await;

    // The signal channel ends with the connection
    let end = tokio::time::timeout(WAIT, signals.recv()).await.unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn set_up_is_rejected_while_connected() {
    let mut server = SignalServer::start().await;
    let mut listener = SignalListener::new(server.url(), HANDSHAKE_PAYLOAD);
    let _signals = listener.set_up().unwrap();
    server.next_inbound(WAIT).await.expect("handshake");
    wait_for_state(&listener, ListenerState::Open).await;

    match listener.set_up() {
        Err(MonitorError::AlreadyConnected) => {}
        Err(other) => panic!("expected AlreadyConnected, got {}", other),
        Ok(_) => panic!("second set_up should be rejected"),
    }
    assert_eq!(listener.state(), ListenerState::Open);
    listener.close().await;
}

#[tokio::test]
async fn unreachable_source_errors_without_retry() {
    let mut listener = SignalListener::new(format!("ws://127.0.0.1:{}", unused_port()), "hello");
    let mut signals = listener.set_up().unwrap();

    wait_for_state(&listener, ListenerState::Errored).await;
    let end = tokio::time::timeout(WAIT, signals.recv()).await.unwrap();
    assert!(end.is_none());

    // Stays terminal; nothing reconnects behind our back
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(listener.state(), ListenerState::Errored);
}
