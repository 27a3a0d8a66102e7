//! Silent recovery after abnormal closures.

mod common;

use std::time::Duration;

use chainwire::{
    ApiName,
    ClientError,
    ConnectionOptions,
    ConnectionState,
    ProtocolError,
    SubscriptionMethod,
};
use chainwire_testing::HandshakeReply;
use common::{Harness, HookEvent, settle};
use serde_json::json;
use tokio::sync::mpsc;

#[tokio::test]
async fn pending_call_is_replayed_under_a_new_id() {
    let mut harness = Harness::database_only().await;
    let database = harness.client.api(ApiName::Database);
    let call = tokio::spawn(async move { database.exec("get_block", vec![json!(7)]).await });
    let before = harness.node.next_call().await;
    assert_eq!(before.link, 1);

    harness.node.drop_connection();
    assert_eq!(harness.node.next_open().await, 2);
    let replayed = harness.node.next_call().await;
    assert_eq!(replayed.link, 2);
    assert_eq!(replayed.method, before.method);
    assert_eq!(replayed.params, before.params);
    assert!(
        replayed.id > before.id,
        "replay must not reuse id {}",
        before.id
    );

    // A reply addressed to the attempt on the dead link settles nothing.
    harness.node.reply(before.id, json!("stale"));
    assert!(matches!(
        harness.next_error().await,
        ClientError::Protocol(ProtocolError::UnexpectedResponseId(id)) if id == before.id
    ));

    harness.node.reply(replayed.id, json!("fresh"));
    assert_eq!(call.await.expect("task").expect("reply"), json!("fresh"));

    let hooks = harness.drain_hooks().await;
    assert!(
        !hooks
            .iter()
            .any(|event| matches!(event, HookEvent::Open | HookEvent::Close(_))),
        "recovery must stay silent: {hooks:?}"
    );
}

#[tokio::test]
async fn armed_subscription_is_rearmed_after_recovery() {
    let mut harness = Harness::database_only().await;
    let (tx, mut notices) = mpsc::unbounded_channel();
    let database = harness.client.api(ApiName::Database);
    let subscribe = tokio::spawn(async move {
        database
            .subscribe(
                SubscriptionMethod::SetSubscribeCallback,
                move |payload| {
                    let _ = tx.send(payload);
                },
                vec![json!(true)],
            )
            .await
    });
    let original = harness.node.next_call().await;
    harness.node.reply(original.id, json!(null));
    subscribe.await.expect("task").expect("subscribed");

    harness.node.drop_connection();
    let rearm = harness.node.next_call_to("set_subscribe_callback").await;
    assert_eq!(rearm.link, 2);
    assert_ne!(rearm.id, original.id);
    assert_eq!(rearm.params, vec![json!(rearm.id), json!(true)]);
    harness.node.reply(rearm.id, json!(null));

    harness.node.notice(rearm.id, json!("after recovery"));
    assert_eq!(notices.recv().await, Some(json!("after recovery")));

    harness.node.notice(original.id, json!("old id"));
    assert!(matches!(
        harness.next_error().await,
        ClientError::Protocol(ProtocolError::UnknownSubscriber(id)) if id == original.id
    ));
}

#[tokio::test]
async fn unconfirmed_subscription_is_replayed_as_a_call() {
    let mut harness = Harness::database_only().await;
    let (tx, mut notices) = mpsc::unbounded_channel();
    let database = harness.client.api(ApiName::Database);
    let subscribe = tokio::spawn(async move {
        database
            .subscribe(
                SubscriptionMethod::SetBlockAppliedCallback,
                move |payload| {
                    let _ = tx.send(payload);
                },
                vec![],
            )
            .await
    });
    let original = harness.node.next_call().await;

    harness.node.drop_connection();
    let replayed = harness.node.next_call_to("set_block_applied_callback").await;
    assert_eq!(replayed.params, vec![json!(replayed.id)]);
    harness.node.reply(replayed.id, json!(null));
    subscribe.await.expect("task").expect("subscribed after replay");

    harness.node.notice(replayed.id, json!("block"));
    assert_eq!(notices.recv().await, Some(json!("block")));
    assert_ne!(replayed.id, original.id);
}

#[tokio::test]
async fn calls_made_while_recovering_wait_for_the_new_link() {
    let mut harness = Harness::database_only().await;
    harness.node.handshake(ApiName::Database, HandshakeReply::Manual);
    harness.node.drop_connection();

    let handshake = harness.node.next_call_to("database").await;
    assert_eq!(handshake.link, 2);
    let status = harness.client.status();
    assert!(status.recovering);
    assert!(status.accepts_calls());

    let database = harness.client.api(ApiName::Database);
    let call = tokio::spawn(async move { database.exec("get_block", vec![json!(9)]).await });
    settle().await;
    assert_eq!(harness.node.try_next_event(), None);

    harness.node.reply(handshake.id, json!(2));
    let sent = harness.node.next_call_to("get_block").await;
    assert_eq!(sent.link, 2);
    harness.node.reply(sent.id, json!(9));
    assert_eq!(call.await.expect("task").expect("reply"), json!(9));

    settle().await;
    let status = harness.client.status();
    assert_eq!(status.state, ConnectionState::Open);
    assert!(!status.recovering);
}

#[tokio::test(start_paused = true)]
async fn failed_recovery_falls_back_to_a_normal_close() {
    let mut harness = Harness::connected(
        ConnectionOptions::default()
            .apis([ApiName::Database])
            .connection_timeout(Duration::from_secs(1)),
    )
    .await;
    let database = harness.client.api(ApiName::Database);
    let call = tokio::spawn(async move { database.exec("get_block", vec![json!(1)]).await });
    let _sent = harness.node.next_call().await;

    harness.node.refuse_opens(1);
    harness.node.drop_connection();

    let err = call.await.expect("task").expect_err("recovery failed");
    assert!(matches!(err, ClientError::ConnectionClosed));
    loop {
        match harness.next_hook().await {
            HookEvent::Close(info) => {
                assert!(info.is_abnormal());
                break;
            }
            HookEvent::Open => panic!("no open before the close"),
            HookEvent::Error(_) => {}
        }
    }

    // The scheduled retry opens a third link and reports it.
    loop {
        if matches!(harness.next_hook().await, HookEvent::Open) {
            break;
        }
    }
    assert_eq!(harness.node.opens(), 3);
    assert_eq!(harness.client.status().state, ConnectionState::Open);
}

#[tokio::test]
async fn normal_close_from_node_does_not_recover() {
    let mut harness = Harness::database_only().await;
    let database = harness.client.api(ApiName::Database);
    let call = tokio::spawn(async move { database.exec("get_block", vec![json!(1)]).await });
    let _sent = harness.node.next_call().await;

    harness.node.close(1001, "going away");
    assert!(matches!(
        call.await.expect("task"),
        Err(ClientError::ConnectionClosed)
    ));
    match harness.next_hook().await {
        HookEvent::Close(info) => {
            assert_eq!(info.code, 1001);
            assert_eq!(info.reason, "going away");
        }
        other => panic!("expected close hook, got {other:?}"),
    }
    assert_eq!(harness.node.opens(), 1);
}
