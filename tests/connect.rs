//! Connection establishment and the API handshake.

mod common;

use std::time::Duration;

use chainwire::{
    ApiName,
    ClientError,
    ConnectionOptions,
    ConnectionState,
    ErrorKind,
    OptionsError,
};
use chainwire_testing::{HandshakeReply, NodeEvent, default_api_id};
use common::{Harness, URL, settle};
use rstest::rstest;
use serde_json::json;

#[tokio::test]
async fn connect_registers_every_requested_api() {
    let harness = Harness::connected(ConnectionOptions::default()).await;

    for api in ApiName::ALL.into_iter().filter(|api| !api.is_meta()) {
        assert_eq!(
            harness.client.api_id(api).await.expect("engine running"),
            Some(default_api_id(api)),
            "{api} should be registered"
        );
    }
    assert_eq!(
        harness.client.api_id(ApiName::Login).await.expect("engine running"),
        Some(1)
    );
    let status = harness.client.status();
    assert_eq!(status.state, ConnectionState::Open);
    assert!(!status.recovering);
    assert!(status.accepts_calls());
}

#[tokio::test]
async fn handshake_ids_are_taken_from_the_node() {
    let mut harness = Harness::new();
    harness.node.handshake(ApiName::Database, HandshakeReply::Grant(42));
    harness
        .client
        .connect(URL, ConnectionOptions::default().apis([ApiName::Database]))
        .await
        .expect("connect");

    let exec = harness.client.api(ApiName::Database);
    let call = tokio::spawn(async move { exec.exec("get_block", vec![json!(1)]).await });
    let sent = harness.node.next_call().await;
    assert_eq!(sent.api_id, 42);
    harness.node.reply(sent.id, json!({"previous": "00"}));
    assert_eq!(
        call.await.expect("task").expect("reply"),
        json!({"previous": "00"})
    );
}

#[tokio::test]
async fn denied_api_fails_locally_without_traffic() {
    let mut harness = Harness::new();
    harness.node.handshake(ApiName::History, HandshakeReply::Deny);
    harness
        .client
        .connect(
            URL,
            ConnectionOptions::default().apis([ApiName::Database, ApiName::History]),
        )
        .await
        .expect("a null grant does not fail the connection");

    assert_eq!(
        harness.client.api_id(ApiName::History).await.expect("engine"),
        None
    );
    let err = harness
        .client
        .api(ApiName::History)
        .exec("get_account_history", vec![])
        .await
        .expect_err("history was not granted");
    assert!(matches!(err, ClientError::ApiNotGranted { api: ApiName::History }));
    assert_eq!(err.kind(), ErrorKind::Capability);

    settle().await;
    assert_eq!(harness.node.next_event().await, NodeEvent::Opened(1));
    assert_eq!(harness.node.try_next_event(), None);
}

#[tokio::test]
async fn api_missing_from_options_is_not_granted() {
    let harness = Harness::database_only().await;
    let err = harness
        .client
        .api(ApiName::Asset)
        .exec("get_asset_holders", vec![])
        .await
        .expect_err("asset was never requested");
    assert_eq!(err.kind(), ErrorKind::Capability);
}

#[tokio::test]
async fn rejected_handshake_fails_connect_and_closes_the_link() {
    let mut harness = Harness::new();
    harness.node.handshake(
        ApiName::Database,
        HandshakeReply::Reject(json!({"message": "forbidden"})),
    );

    let err = harness
        .client
        .connect(URL, ConnectionOptions::default().apis([ApiName::Database]))
        .await
        .expect_err("the node rejected the handshake");
    assert!(
        matches!(&err, ClientError::HandshakeRejected { api: ApiName::Database, detail } if detail.contains("forbidden")),
        "unexpected error: {err:?}"
    );

    assert_eq!(harness.node.next_event().await, NodeEvent::Opened(1));
    assert_eq!(harness.node.next_event().await, NodeEvent::ClientClosed(1));
    assert_eq!(harness.client.status().state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn non_integer_handshake_result_is_rejected() {
    let mut harness = Harness::new();
    harness.node.handshake(ApiName::Database, HandshakeReply::Manual);
    let client = harness.client.clone();
    let connect = tokio::spawn(async move {
        client
            .connect(URL, ConnectionOptions::default().apis([ApiName::Database]))
            .await
    });

    let handshake = harness.node.next_call_to("database").await;
    assert_eq!(handshake.api_id, 1);
    assert!(handshake.params.is_empty());
    harness.node.reply(handshake.id, json!("two"));

    let err = connect.await.expect("task").expect_err("bad handshake result");
    assert_eq!(err.kind(), ErrorKind::Capability);
}

#[tokio::test]
async fn connect_twice_is_refused() {
    let harness = Harness::database_only().await;
    let err = harness
        .client
        .connect(URL, ConnectionOptions::default())
        .await
        .expect_err("already open");
    assert!(matches!(err, ClientError::AlreadyConnected));
    assert_eq!(harness.node.opens(), 1);
}

#[rstest]
#[case("http://node.test", ConnectionOptions::default(), "url")]
#[case("not a url", ConnectionOptions::default(), "url")]
#[case(URL, ConnectionOptions::default().ping_delay(Duration::ZERO), "pingDelay")]
#[case(URL, ConnectionOptions::default().connection_timeout(Duration::ZERO), "connectionTimeout")]
#[tokio::test]
async fn invalid_options_reject_before_opening(
    #[case] url: &str,
    #[case] options: ConnectionOptions,
    #[case] param: &str,
) {
    let harness = Harness::new();
    let err = harness
        .client
        .connect(url, options)
        .await
        .expect_err("options are invalid");
    assert_eq!(err.kind(), ErrorKind::InvalidOption);
    match err {
        ClientError::InvalidOption(OptionsError::Invalid { param: actual, .. }) => {
            assert_eq!(actual, param);
        }
        other => panic!("expected invalid {param}, got {other:?}"),
    }
    assert_eq!(harness.node.opens(), 0);
}

#[tokio::test]
async fn unknown_api_name_is_an_option_error() {
    let harness = Harness::new();
    let err = harness
        .client
        .connect(URL, ConnectionOptions::default().api_names(["database", "wallet"]))
        .await
        .expect_err("wallet is not an api");
    assert!(matches!(
        err,
        ClientError::InvalidOption(OptionsError::UnknownApi(ref name)) if name == "wallet"
    ));
    assert_eq!(harness.node.opens(), 0);
}

#[tokio::test]
async fn refused_open_fails_connect() {
    let harness = Harness::new();
    harness.node.refuse_opens(1);
    let err = harness
        .client
        .connect(URL, ConnectionOptions::default())
        .await
        .expect_err("node refused");
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(harness.client.status().state, ConnectionState::Disconnected);

    harness
        .client
        .connect(URL, ConnectionOptions::default())
        .await
        .expect("second attempt is accepted");
}

#[tokio::test]
async fn calls_before_connect_are_rejected() {
    let harness = Harness::new();
    let err = harness
        .client
        .api(ApiName::Database)
        .exec("get_block", vec![json!(1)])
        .await
        .expect_err("not connected");
    assert!(matches!(err, ClientError::NotConnected));
}
