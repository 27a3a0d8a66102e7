#![cfg(feature = "metrics")]
//! Tests for `chainwire` metrics.
//!
//! Helpers are checked directly, and a full connection is driven on a
//! current-thread runtime so the engine task records into the same
//! thread-local `DebuggingRecorder`.

mod common;

use chainwire::{ApiName, metrics as cw_metrics};
use common::Harness;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;
use serde_json::json;

fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn counter(snapshotter: &Snapshotter, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(k, _, _, _)| {
            k.key().name() == name
                && label.is_none_or(|(key, value)| {
                    k.key()
                        .labels()
                        .any(|l| l.key() == key && l.value() == value)
                })
        })
        .map(|(_, _, _, v)| match v {
            DebugValue::Counter(c) => c,
            _ => 0,
        })
        .sum()
}

fn run_on_current_thread<F: std::future::Future<Output = ()>>(recorder: &DebuggingRecorder, f: F) {
    metrics::with_local_recorder(recorder, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("build runtime")
            .block_on(f);
    });
}

#[rstest]
#[case(cw_metrics::Direction::Inbound, "inbound")]
#[case(cw_metrics::Direction::Outbound, "outbound")]
fn frame_metric_is_labelled_by_direction(
    #[case] direction: cw_metrics::Direction,
    #[case] label: &str,
) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || cw_metrics::inc_frames(direction));
    assert_eq!(
        counter(&snapshotter, cw_metrics::FRAMES_TOTAL, Some(("direction", label))),
        1
    );
}

#[test]
fn a_completed_call_is_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    run_on_current_thread(&recorder, async {
        let mut harness = Harness::database_only().await;
        let database = harness.client.api(ApiName::Database);
        let call = tokio::spawn(async move { database.exec("get_block", vec![json!(1)]).await });
        let sent = harness.node.next_call().await;
        harness.node.reply(sent.id, json!(1));
        call.await.expect("task").expect("reply");
    });

    assert_eq!(
        counter(&snapshotter, cw_metrics::CALLS_TOTAL, Some(("outcome", "ok"))),
        1
    );
    // Handshake plus one call in each direction.
    assert_eq!(
        counter(&snapshotter, cw_metrics::FRAMES_TOTAL, Some(("direction", "outbound"))),
        2
    );
    assert_eq!(
        counter(&snapshotter, cw_metrics::FRAMES_TOTAL, Some(("direction", "inbound"))),
        2
    );
}

#[test]
fn protocol_errors_and_recoveries_are_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    run_on_current_thread(&recorder, async {
        let mut harness = Harness::database_only().await;
        harness.node.send_raw("[]");
        let _ = harness.next_error().await;
        harness.node.drop_connection();
        assert_eq!(harness.node.next_open().await, 2);
    });

    assert_eq!(counter(&snapshotter, cw_metrics::PROTOCOL_ERRORS_TOTAL, None), 1);
    assert_eq!(counter(&snapshotter, cw_metrics::RECOVERIES_TOTAL, None), 1);
}
