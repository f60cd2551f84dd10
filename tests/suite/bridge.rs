//! Bridged legacy calls, including calls made from inside ordered units.

use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use ordo_bridge::{
    BridgeError, ContinuationSlot, LoopbackConnection, TransportError, bridge,
    bridge_with_timeout, with_continuation,
};
use ordo_queue::{OrderedTaskQueue, TaskError};

use crate::common::ScriptedService;

#[derive(Debug, Deserialize, PartialEq)]
struct Status {
    healthy: bool,
    version: u32,
}

async fn fetch_status(connection: &LoopbackConnection<ScriptedService>) -> Result<Status, BridgeError> {
    bridge(connection, |service: ScriptedService, slot: ContinuationSlot<Status>| {
        service.fetch_status(slot.decoding_reply());
    })
    .await
}

#[tokio::test]
async fn structured_reply_is_decoded() {
    let service = ScriptedService::default();
    let connection = Arc::new(LoopbackConnection::new(service.clone()));

    let call = tokio::spawn({
        let connection = connection.clone();
        async move { fetch_status(&connection).await }
    });
    service.wait_for_calls(1).await;
    service.reply_next(Some(br#"{"healthy":true,"version":7}"#), None);

    assert_eq!(
        call.await.unwrap().unwrap(),
        Status {
            healthy: true,
            version: 7
        }
    );
}

#[tokio::test]
async fn malformed_payload_and_transport_failure_are_distinguishable() {
    let service = ScriptedService::default();
    let connection = Arc::new(LoopbackConnection::new(service.clone()));

    let malformed = tokio::spawn({
        let connection = connection.clone();
        async move { fetch_status(&connection).await }
    });
    service.wait_for_calls(1).await;
    service.reply_next(Some(b"{\"healthy\":\"maybe\"}"), None);
    let malformed = malformed.await.unwrap().unwrap_err();
    assert!(matches!(malformed, BridgeError::Decode(_)));
    assert!(!malformed.is_retryable());

    let stalled = tokio::spawn({
        let connection = connection.clone();
        async move { fetch_status(&connection).await }
    });
    service.wait_for_calls(1).await;
    connection.invalidate();
    let stalled = stalled.await.unwrap().unwrap_err();
    assert!(matches!(
        stalled,
        BridgeError::Transport(TransportError::Invalidated)
    ));
    assert!(stalled.is_retryable());

    // The parked callback still fires eventually; it must be dropped quietly.
    service.reply_next(Some(br#"{"healthy":false,"version":1}"#), None);
}

#[tokio::test]
async fn remote_error_wins_over_payload() {
    let service = ScriptedService::default();
    let connection = Arc::new(LoopbackConnection::new(service.clone()));

    let call = tokio::spawn({
        let connection = connection.clone();
        async move { fetch_status(&connection).await }
    });
    service.wait_for_calls(1).await;
    service.reply_next(
        Some(br#"{"healthy":true,"version":7}"#),
        Some(io::Error::other("quota exceeded")),
    );

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, BridgeError::Remote(_)));
    assert!(err.to_string().contains("quota exceeded"));
}

#[tokio::test]
async fn empty_reply_is_a_failure_not_a_hang() {
    let service = ScriptedService::default();
    let connection = Arc::new(LoopbackConnection::new(service.clone()));

    let call = tokio::spawn({
        let connection = connection.clone();
        async move { fetch_status(&connection).await }
    });
    service.wait_for_calls(1).await;
    service.reply_next(None, None);

    assert!(matches!(
        call.await.unwrap(),
        Err(BridgeError::EmptyReply)
    ));
}

#[tokio::test]
async fn timeout_releases_the_caller() {
    let service = ScriptedService::default();
    let connection = LoopbackConnection::new(service.clone());

    let result = bridge_with_timeout(
        &connection,
        Duration::from_millis(25),
        |service: ScriptedService, slot: ContinuationSlot<Status>| {
            service.fetch_status(slot.decoding_reply());
        },
    )
    .await;
    assert!(matches!(result, Err(BridgeError::TimedOut(_))));

    service.reply_next(None, Some(io::Error::other("too late")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bridged_calls_inside_ordered_units_keep_their_order() {
    let queue = OrderedTaskQueue::with_label("bridged");
    let service = ScriptedService::default();
    let connection = Arc::new(LoopbackConnection::new(service.clone()));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let connection = connection.clone();
            queue.submit(None, move || async move { fetch_status(&connection).await })
        })
        .collect();

    // Only the head of the chain has reached the service; the rest are queued.
    for version in 0..3u32 {
        service.wait_for_calls(1).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(service.parked(), 1);
        let payload = format!(r#"{{"healthy":true,"version":{version}}}"#);
        service.reply_next(Some(payload.as_bytes()), None);
    }

    for (version, handle) in handles.into_iter().enumerate() {
        let status = handle.await.unwrap();
        assert_eq!(status.version, version as u32);
    }
}

#[tokio::test]
async fn bridge_error_flows_through_task_error() {
    let queue = OrderedTaskQueue::new();
    let handle = queue.submit(None, || async {
        with_continuation(|slot: ContinuationSlot<()>| {
            let reply = slot.error_reply::<io::Error>();
            reply(Some(io::Error::other("denied")));
        })
        .await
    });

    match handle.await {
        Err(TaskError::Failed(BridgeError::Remote(source))) => {
            assert_eq!(source.to_string(), "denied");
        }
        other => panic!("expected a remote failure, got {other:?}"),
    }

    let ok = queue.submit(None, || async { Ok::<_, Infallible>(()) });
    ok.await.unwrap();
}
