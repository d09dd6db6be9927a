//! End-to-end lifecycle tests over the facade: a link connection driving a
//! scripted transport, and the message channel adapter on top of it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use uavlink::{LinkConnection, LinkEvent, LinkMessageChannel, LinkStatus, MessageChannel};
use uavlink_test_harness::MockTransport;

fn drain(rx: &mut broadcast::Receiver<LinkEvent>) -> Vec<LinkEvent> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}

#[tokio::test]
async fn full_lifecycle_over_mock_transport() {
    let mock = MockTransport::new();
    let link = LinkConnection::new(mock.clone());
    let mut rx = link.subscribe();

    link.open().await.unwrap();
    assert_eq!(link.status(), LinkStatus::Connected);
    assert_eq!(mock.open_count(), 1);

    mock.push_read(b"heartbeat".to_vec());
    mock.push_read(b"attitude".to_vec());

    let mut received = Vec::new();
    while received.len() < 2 {
        if let LinkEvent::DataReceived(block) = rx.recv().await.unwrap() {
            received.push(block);
        }
    }
    assert_eq!(received[0], b"heartbeat");
    assert_eq!(received[1], b"attitude");

    link.send(b"request data streams").await.unwrap();
    assert_eq!(mock.sent_data(), vec![b"request data streams".to_vec()]);

    link.close().await.unwrap();
    assert_eq!(link.status(), LinkStatus::Disconnected);
    assert!(mock.close_count() >= 1);
}

#[tokio::test]
async fn stream_error_tears_down_and_allows_reopen() {
    let mock = MockTransport::new();
    let link = LinkConnection::new(mock.clone());
    let mut rx = link.subscribe();

    link.open().await.unwrap();
    drain(&mut rx);

    mock.push_read_error("radio out of range");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(link.status(), LinkStatus::Disconnected);
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, LinkEvent::StreamError { .. })));
    assert!(events.iter().any(|e| matches!(e, LinkEvent::Disconnected)));

    // The same connection can be opened again after a teardown.
    link.open().await.unwrap();
    assert_eq!(link.status(), LinkStatus::Connected);
    assert_eq!(mock.open_count(), 2);

    link.close().await.unwrap();
}

#[tokio::test]
async fn message_channel_completion_fires_exactly_once() {
    let mock = MockTransport::new();
    let link = Arc::new(LinkConnection::new(mock.clone()));
    let channel = LinkMessageChannel::new(link);

    channel.open().await.unwrap();
    assert!(channel.is_connected());

    let completions: Arc<Mutex<Vec<Result<(), String>>>> = Arc::new(Mutex::new(Vec::new()));

    let recorder = Arc::clone(&completions);
    channel
        .send(
            b"heartbeat",
            Box::new(move |result| recorder.lock().unwrap().push(result)),
        )
        .await;

    // A failing transport reports through the completion, not a panic or
    // a return value.
    mock.set_fail_sends(true);
    let recorder = Arc::clone(&completions);
    channel
        .send(
            b"dropped",
            Box::new(move |result| recorder.lock().unwrap().push(result)),
        )
        .await;

    let recorded = completions.lock().unwrap();
    assert_eq!(recorded.len(), 2);
    assert!(recorded[0].is_ok());
    assert!(recorded[1].is_err());
    drop(recorded);

    channel.close().await.unwrap();
    assert!(!channel.is_connected());
}
