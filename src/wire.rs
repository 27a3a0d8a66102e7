//! JSON envelope codec.
//!
//! Outbound calls are encoded as
//! `{"method":"call","id":N,"params":[apiId,"method",[...]]}`. Inbound text
//! frames decode into either a reply matched by id or a notice addressed to a
//! subscriber.

use serde::{Serialize, Serializer, ser::SerializeSeq};
use serde_json::{Map, Value};

use crate::{error::ProtocolError, request::Request};

const CALL_METHOD: &str = "call";
const NOTICE_METHOD: &str = "notice";

/// A decoded inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum InboundFrame {
    /// Reply to the call with the given id.
    Reply {
        id: u64,
        outcome: Result<Value, Value>,
    },
    /// Push addressed to a subscriber.
    Notice { subscriber: u64, payload: Value },
}

#[derive(Serialize)]
struct CallEnvelope<'a> {
    method: &'static str,
    id: u64,
    params: CallParams<'a>,
}

#[derive(Serialize)]
struct CallParams<'a>(u32, &'a str, MethodParams<'a>);

/// Method params with the handler slot replaced by the subscriber id.
struct MethodParams<'a> {
    subscriber: Option<u64>,
    params: &'a [Value],
}

impl Serialize for MethodParams<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.params.len() + usize::from(self.subscriber.is_some());
        let mut seq = serializer.serialize_seq(Some(len))?;
        if let Some(id) = self.subscriber {
            seq.serialize_element(&id)?;
        }
        for param in self.params {
            seq.serialize_element(param)?;
        }
        seq.end()
    }
}

/// Encode `request` as a call envelope with wire id `id` against `api_id`.
///
/// Subscribing requests get `id` prepended to their params, which is how the
/// node learns which subscriber its notices address.
pub(crate) fn encode_call(
    id: u64,
    api_id: u32,
    request: &Request,
) -> Result<String, serde_json::Error> {
    let envelope = CallEnvelope {
        method: CALL_METHOD,
        id,
        params: CallParams(
            api_id,
            request.method(),
            MethodParams {
                subscriber: request.is_subscription().then_some(id),
                params: request.params(),
            },
        ),
    };
    serde_json::to_string(&envelope)
}

/// Decode an inbound text frame.
///
/// # Errors
///
/// Returns a [`ProtocolError`] describing the first violation found.
pub(crate) fn decode_frame(text: &str) -> Result<InboundFrame, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?;
    let Value::Object(mut map) = value else {
        return Err(ProtocolError::MalformedFrame(
            "frame is not a JSON object".to_owned(),
        ));
    };
    if map.get("method").and_then(Value::as_str) == Some(NOTICE_METHOD) {
        return decode_notice(&mut map);
    }
    let id = match map.remove("id") {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or(ProtocolError::InvalidId(Value::Number(n)))?,
        Some(other) => return Err(ProtocolError::InvalidId(other)),
        None => return Err(ProtocolError::InvalidId(Value::Null)),
    };
    let outcome = if let Some(error) = map.remove("error") {
        Err(error)
    } else if let Some(result) = map.remove("result") {
        Ok(result)
    } else {
        return Err(ProtocolError::MalformedFrame(format!(
            "reply {id} carries neither result nor error"
        )));
    };
    Ok(InboundFrame::Reply { id, outcome })
}

fn decode_notice(map: &mut Map<String, Value>) -> Result<InboundFrame, ProtocolError> {
    let Some(Value::Array(params)) = map.remove("params") else {
        return Err(ProtocolError::MalformedNotice(
            "params is not an array".to_owned(),
        ));
    };
    let mut params = params.into_iter();
    let subscriber = params
        .next()
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ProtocolError::MalformedNotice("missing subscriber id".to_owned()))?;
    let payload = params
        .next()
        .ok_or_else(|| ProtocolError::MalformedNotice("missing payload".to_owned()))?;
    Ok(InboundFrame::Notice {
        subscriber,
        payload,
    })
}

#[cfg(test)]
mod tests;
