//! Requests issued through the connection engine.
//!
//! A [`Request`] is either a plain call or a subscribing call carrying a
//! notice handler. The handler never appears in the params list; the wire
//! codec substitutes the subscriber id for it when the request is encoded.

use std::{fmt, sync::Arc};

use serde_json::Value;

use crate::api::{ApiName, SubscriptionMethod};

/// Handler invoked with the payload of every notice addressed to a
/// subscription.
///
/// Handlers run on the engine task and must not block.
pub type NoticeHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// API a request is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiTarget {
    /// A numeric API id, sent verbatim.
    Id(u32),
    /// A named API, resolved against the connection's registry when the
    /// request is dispatched.
    Named(ApiName),
}

impl From<u32> for ApiTarget {
    fn from(id: u32) -> Self { Self::Id(id) }
}

impl From<ApiName> for ApiTarget {
    fn from(api: ApiName) -> Self { Self::Named(api) }
}

/// A request to run on the node.
#[derive(Clone)]
pub enum Request {
    /// A call answered by exactly one reply.
    Call {
        /// Target API.
        api: ApiTarget,
        /// Method name.
        method: String,
        /// Method parameters.
        params: Vec<Value>,
    },
    /// A call that also registers a handler for future notices.
    Subscribe {
        /// Target API.
        api: ApiTarget,
        /// Method name.
        method: String,
        /// Method parameters, excluding the handler slot.
        params: Vec<Value>,
        /// Handler receiving notice payloads.
        handler: NoticeHandler,
    },
}

impl Request {
    /// Build a plain call.
    ///
    /// # Examples
    ///
    /// ```
    /// use chainwire::Request;
    /// use serde_json::json;
    ///
    /// let request = Request::call(2u32, "get_block", vec![json!(1)]);
    /// assert_eq!(request.method(), "get_block");
    /// ```
    #[must_use]
    pub fn call(api: impl Into<ApiTarget>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Call {
            api: api.into(),
            method: method.into(),
            params,
        }
    }

    /// Build a subscribing call for an arbitrary method.
    ///
    /// The caller decides that `method` takes a handler as its first
    /// parameter.
    #[must_use]
    pub fn subscribe<H>(
        api: impl Into<ApiTarget>,
        method: impl Into<String>,
        handler: H,
        params: Vec<Value>,
    ) -> Self
    where
        H: Fn(Value) + Send + Sync + 'static,
    {
        Self::Subscribe {
            api: api.into(),
            method: method.into(),
            params,
            handler: Arc::new(handler),
        }
    }

    /// Build a subscribing call for one of the known subscription methods.
    #[must_use]
    pub fn subscription<H>(method: SubscriptionMethod, handler: H, params: Vec<Value>) -> Self
    where
        H: Fn(Value) + Send + Sync + 'static,
    {
        Self::subscribe(method.api(), method.as_str(), handler, params)
    }

    /// Target API.
    #[must_use]
    pub fn api(&self) -> ApiTarget {
        match self {
            Self::Call { api, .. } | Self::Subscribe { api, .. } => *api,
        }
    }

    /// Method name.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Call { method, .. } | Self::Subscribe { method, .. } => method,
        }
    }

    /// Method parameters, excluding any handler slot.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        match self {
            Self::Call { params, .. } | Self::Subscribe { params, .. } => params,
        }
    }

    /// Notice handler for subscribing calls.
    #[must_use]
    pub fn handler(&self) -> Option<&NoticeHandler> {
        match self {
            Self::Call { .. } => None,
            Self::Subscribe { handler, .. } => Some(handler),
        }
    }

    /// Returns `true` for subscribing calls.
    #[must_use]
    pub fn is_subscription(&self) -> bool { matches!(self, Self::Subscribe { .. }) }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_subscription() {
            "Subscribe"
        } else {
            "Call"
        };
        f.debug_struct(kind)
            .field("api", &self.api())
            .field("method", &self.method())
            .field("params", &self.params())
            .finish_non_exhaustive()
    }
}
