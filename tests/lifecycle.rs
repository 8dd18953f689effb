//! Integration tests for the connection lifecycle: connect, disconnect, and
//! their preconditions.

use std::sync::Arc;

use nebula::ClientError;
use serde_json::json;
use tokio::sync::mpsc;

mod common;
use common::{ScriptedGateway, TestResult, scripted_client};

#[tokio::test]
async fn connect_resolves_on_ready_and_captures_the_session_id() -> TestResult {
    let gateway = ScriptedGateway::new();
    let mut server = gateway.accept();
    server.hello(45_000);
    server.ready("session-123", 1);

    let client = scripted_client(&gateway).build()?;
    client.connect().await?;

    assert_eq!(client.session_id().as_deref(), Some("session-123"));

    let identify = server.expect_op(2).await;
    assert_eq!(identify["d"]["token"], "test-token");
    assert_eq!(identify["d"]["shard"], json!([0, 1]));
    assert_eq!(identify["d"]["properties"]["$browser"], "nebula");

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn dispatch_events_are_forwarded_with_name_and_payload() -> TestResult {
    let gateway = ScriptedGateway::new();
    let server = gateway.accept();
    server.hello(45_000);
    // An event arriving before the ready marker is still forwarded, and in
    // order.
    server.dispatch("GUILD_CREATE", 1, json!({"id": "g1"}));
    server.ready("session-123", 2);

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let client = scripted_client(&gateway)
        .on_dispatch(move |event, payload| {
            let _ = events_tx.send((event.to_owned(), payload.clone()));
        })
        .build()?;
    client.connect().await?;

    let (first, payload) = events_rx.recv().await.expect("dispatch event");
    assert_eq!(first, "GUILD_CREATE");
    assert_eq!(payload["id"], "g1");
    let (second, _) = events_rx.recv().await.expect("ready event");
    assert_eq!(second, "READY");

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn send_before_connect_fails_synchronously() -> TestResult {
    let gateway = ScriptedGateway::new();
    let client = scripted_client(&gateway).build()?;

    let result = client.send(&json!({"op": 3}));
    assert!(matches!(result, Err(ClientError::NotConnected)));
    assert_eq!(gateway.attempts(), 0);
    Ok(())
}

#[tokio::test]
async fn connecting_twice_without_disconnect_fails_fast() -> TestResult {
    let gateway = ScriptedGateway::new();
    let server = gateway.accept();
    server.hello(45_000);
    server.ready("session-123", 1);

    let client = scripted_client(&gateway).build()?;
    client.connect().await?;

    let second = client.connect().await;
    assert!(matches!(second, Err(ClientError::AlreadyConnected)));
    assert_eq!(gateway.attempts(), 1);

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn sent_frames_reach_the_server_in_order() -> TestResult {
    let gateway = ScriptedGateway::new();
    let mut server = gateway.accept();
    server.hello(45_000);
    server.ready("session-123", 1);

    let client = scripted_client(&gateway).build()?;
    client.connect().await?;
    server.expect_op(2).await;

    client.send(&json!({"op": 3, "n": 0}))?;
    client.send(&json!({"op": 3, "n": 1}))?;
    for n in 0..2 {
        let frame = server.next_frame().await;
        assert_eq!(frame["n"], n);
    }

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn disconnect_abandons_a_pending_connect() -> TestResult {
    let gateway = ScriptedGateway::new();
    // The server accepts but never sends hello, so connect() stays pending.
    let _server = gateway.accept();

    let client = Arc::new(scripted_client(&gateway).build()?);
    let pending = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.connect().await }
    });
    tokio::task::yield_now().await;

    client.disconnect().await;
    let outcome = pending.await?;
    assert!(matches!(outcome, Err(ClientError::Disconnected)));
    Ok(())
}

#[tokio::test]
async fn disconnect_is_idempotent() -> TestResult {
    let gateway = ScriptedGateway::new();
    let server = gateway.accept();
    server.hello(45_000);
    server.ready("session-123", 1);

    let client = scripted_client(&gateway).build()?;
    client.connect().await?;

    client.disconnect().await;
    client.disconnect().await;
    assert!(matches!(
        client.send(&json!({"op": 3})),
        Err(ClientError::NotConnected)
    ));
    Ok(())
}

#[tokio::test]
async fn session_state_is_cleared_on_teardown() -> TestResult {
    let gateway = ScriptedGateway::new();
    let server = gateway.accept();
    server.hello(45_000);
    server.ready("session-123", 1);

    let client = scripted_client(&gateway).build()?;
    client.connect().await?;
    assert!(client.session_id().is_some());

    client.disconnect().await;
    assert_eq!(client.session_id(), None);
    Ok(())
}

#[tokio::test]
async fn connect_can_be_called_again_after_disconnect() -> TestResult {
    let gateway = ScriptedGateway::new();
    let first = gateway.accept();
    first.hello(45_000);
    first.ready("session-1", 1);
    let second = gateway.accept();
    second.hello(45_000);
    second.ready("session-2", 1);

    let client = scripted_client(&gateway).build()?;
    client.connect().await?;
    client.disconnect().await;

    client.connect().await?;
    assert_eq!(client.session_id().as_deref(), Some("session-2"));
    assert_eq!(gateway.attempts(), 2);

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn unparseable_frame_rejects_connect_with_invalid_content() -> TestResult {
    let gateway = ScriptedGateway::new();
    let server = gateway.accept();
    server.text("{ this is not json");

    let client = scripted_client(&gateway).no_reconnect().build()?;
    let outcome = client.connect().await;
    assert!(matches!(outcome, Err(ClientError::InvalidContent)));
    Ok(())
}
