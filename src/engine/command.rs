//! Commands sent from client handles to the engine.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;

use super::state::Reply;
use crate::{api::ApiName, options::ConnectionOptions, request::Request};

/// Requests handled by the engine task.
#[derive(Debug)]
pub(crate) enum Command {
    Connect {
        url: String,
        options: ConnectionOptions,
        reply: Reply<()>,
    },
    Call {
        request: Request,
        timeout: Option<Duration>,
        reply: Reply<Value>,
    },
    Close {
        reply: Reply<()>,
    },
    Reconnect {
        reply: Reply<()>,
    },
    ApiId {
        api: ApiName,
        reply: oneshot::Sender<Option<u32>>,
    },
}
