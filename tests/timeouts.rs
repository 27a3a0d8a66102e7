//! Two-stage call timeouts.

mod common;

use std::time::Duration;

use chainwire::{ApiName, ClientError, ConnectionOptions, ErrorKind, ProtocolError};
use common::Harness;
use serde_json::json;
use tokio::time::Instant;

const SOFT: Duration = Duration::from_secs(1);
const GRACE: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn reply_inside_grace_window_resolves() {
    let mut harness = Harness::database_only().await;
    let database = harness.client.api(ApiName::Database);
    let call = tokio::spawn(async move {
        database
            .exec_with_timeout("get_block", vec![json!(1)], SOFT)
            .await
    });
    let sent = harness.node.next_call().await;

    tokio::time::sleep(SOFT + GRACE / 2).await;
    harness.node.reply(sent.id, json!("late but accepted"));
    assert_eq!(
        call.await.expect("task").expect("grace window reply"),
        json!("late but accepted")
    );
}

#[tokio::test(start_paused = true)]
async fn silent_node_times_out_after_grace() {
    let mut harness = Harness::database_only().await;
    let database = harness.client.api(ApiName::Database);
    let start = Instant::now();
    let call = tokio::spawn(async move {
        database
            .exec_with_timeout("get_block", vec![json!(1)], SOFT)
            .await
    });
    let sent = harness.node.next_call().await;

    let err = call.await.expect("task").expect_err("no reply was sent");
    assert!(start.elapsed() >= SOFT + GRACE);
    assert_eq!(err.kind(), ErrorKind::Timeout);
    match err {
        ClientError::Timeout {
            id,
            method,
            timeout,
        } => {
            assert_eq!(id, sent.id);
            assert_eq!(method, "get_block");
            assert_eq!(timeout, SOFT);
        }
        other => panic!("expected a timeout, got {other:?}"),
    }

    harness.node.reply(sent.id, json!("too late"));
    assert!(matches!(
        harness.next_error().await,
        ClientError::Protocol(ProtocolError::UnexpectedResponseId(id)) if id == sent.id
    ));
}

#[tokio::test(start_paused = true)]
async fn connection_timeout_is_the_default_call_timeout() {
    let default_timeout = Duration::from_secs(2);
    let mut harness = Harness::connected(
        ConnectionOptions::default()
            .apis([ApiName::Database])
            .connection_timeout(default_timeout),
    )
    .await;
    let database = harness.client.api(ApiName::Database);
    let start = Instant::now();
    let call = tokio::spawn(async move { database.exec("get_block", vec![json!(1)]).await });
    let _sent = harness.node.next_call().await;

    match call.await.expect("task") {
        Err(ClientError::Timeout { timeout, .. }) => assert_eq!(timeout, default_timeout),
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(start.elapsed() >= default_timeout + GRACE);
}

#[tokio::test(start_paused = true)]
async fn a_timed_out_call_does_not_affect_others() {
    let mut harness = Harness::database_only().await;
    let slow = harness.client.api(ApiName::Database);
    let fast = slow.clone();
    let slow_call =
        tokio::spawn(async move { slow.exec_with_timeout("get_block", vec![json!(1)], SOFT).await });
    let _slow_sent = harness.node.next_call().await;
    let fast_call = tokio::spawn(async move {
        fast.exec_with_timeout("get_block", vec![json!(2)], SOFT * 10)
            .await
    });
    let fast_sent = harness.node.next_call().await;

    assert_eq!(
        slow_call.await.expect("task").expect_err("timed out").kind(),
        ErrorKind::Timeout
    );
    harness.node.reply(fast_sent.id, json!(2));
    assert_eq!(fast_call.await.expect("task").expect("reply"), json!(2));
}
