//! Unit tests for the JSON envelope codec.

use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::api::ApiName;

fn parse(text: &str) -> Value { serde_json::from_str(text).expect("encoder emits valid JSON") }

#[test]
fn plain_call_keeps_params_verbatim() {
    let request = Request::call(ApiName::Database, "get_block", vec![json!(1)]);
    let encoded = encode_call(7, 2, &request).expect("encode call");
    assert_eq!(
        parse(&encoded),
        json!({"method": "call", "id": 7, "params": [2, "get_block", [1]]})
    );
}

#[test]
fn subscribing_call_substitutes_its_id_for_the_handler() {
    let request = Request::subscribe(2u32, "set_subscribe_callback", |_| {}, vec![json!(true)]);
    let encoded = encode_call(11, 2, &request).expect("encode call");
    assert_eq!(
        parse(&encoded),
        json!({"method": "call", "id": 11, "params": [2, "set_subscribe_callback", [11, true]]})
    );
}

#[rstest]
#[case(r#"{"id": 3, "result": {"head": 10}}"#, 3, Ok(json!({"head": 10})))]
#[case(r#"{"id": 4, "result": null}"#, 4, Ok(Value::Null))]
#[case(r#"{"id": 5, "error": {"message": "unknown method"}}"#, 5, Err(json!({"message": "unknown method"})))]
#[case(r#"{"jsonrpc": "2.0", "id": 6, "result": 1}"#, 6, Ok(json!(1)))]
fn decodes_replies(
    #[case] text: &str,
    #[case] expected_id: u64,
    #[case] expected: Result<Value, Value>,
) {
    assert_eq!(
        decode_frame(text),
        Ok(InboundFrame::Reply {
            id: expected_id,
            outcome: expected,
        })
    );
}

#[test]
fn decodes_notices() {
    let frame = decode_frame(r#"{"method": "notice", "params": [9, [{"id": "2.1.0"}]]}"#);
    assert_eq!(
        frame,
        Ok(InboundFrame::Notice {
            subscriber: 9,
            payload: json!([{"id": "2.1.0"}]),
        })
    );
}

#[rstest]
#[case("not json")]
#[case("[1, 2]")]
#[case(r#"{"id": 1}"#)]
fn rejects_malformed_frames(#[case] text: &str) {
    assert!(matches!(
        decode_frame(text),
        Err(ProtocolError::MalformedFrame(_))
    ));
}

#[rstest]
#[case(r#"{"id": "7", "result": 1}"#)]
#[case(r#"{"id": -1, "result": 1}"#)]
#[case(r#"{"result": 1}"#)]
fn rejects_non_numeric_ids(#[case] text: &str) {
    assert!(matches!(decode_frame(text), Err(ProtocolError::InvalidId(_))));
}

#[rstest]
#[case(r#"{"method": "notice", "params": {"id": 1}}"#)]
#[case(r#"{"method": "notice", "params": ["x", 1]}"#)]
#[case(r#"{"method": "notice", "params": [1]}"#)]
fn rejects_malformed_notices(#[case] text: &str) {
    assert!(matches!(
        decode_frame(text),
        Err(ProtocolError::MalformedNotice(_))
    ));
}
