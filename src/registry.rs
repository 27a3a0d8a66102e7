//! Per-connection API registry and the capability-gated executor.

use std::{collections::HashMap, time::Duration};

use serde_json::Value;

use crate::{
    api::{ApiName, META_API_ID, SubscriptionMethod},
    client::Client,
    error::ClientError,
    request::Request,
};

/// Numeric API identifiers granted on the current connection.
///
/// Owned by the engine and rebuilt on every open. An entry with no id means
/// the API was requested but not granted.
#[derive(Debug, Default)]
pub(crate) struct ApiRegistry {
    entries: HashMap<ApiName, Option<u32>>,
}

impl ApiRegistry {
    /// Forget every entry.
    pub(crate) fn clear(&mut self) { self.entries.clear(); }

    /// Record the handshake outcome for `api`.
    pub(crate) fn register(&mut self, api: ApiName, id: Option<u32>) { self.entries.insert(api, id); }

    /// Numeric id for `api`, if granted.
    pub(crate) fn id(&self, api: ApiName) -> Option<u32> {
        if api.is_meta() {
            return Some(META_API_ID);
        }
        self.entries.get(&api).copied().flatten()
    }

    /// Resolve `api` or fail with a capability error.
    pub(crate) fn resolve(&self, api: ApiName) -> Result<u32, ClientError> {
        self.id(api).ok_or(ClientError::ApiNotGranted { api })
    }
}

/// Executor bound to one logical API.
///
/// The numeric id is looked up on every call, so an executor survives
/// reconnects that renumber the API. Calls to an API the connection was not
/// granted fail with [`ClientError::ApiNotGranted`] without touching the
/// network.
///
/// # Examples
///
/// ```no_run
/// use chainwire::{ApiName, Client, ConnectionOptions};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), chainwire::ClientError> {
/// let client = Client::new();
/// client
///     .connect(
///         "ws://127.0.0.1:8090",
///         ConnectionOptions::default().apis([ApiName::Database]),
///     )
///     .await?;
/// let block = client.api(ApiName::Database).exec("get_block", vec![json!(1)]).await?;
/// # let _ = block;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ApiExecutor {
    client: Client,
    api: ApiName,
}

impl ApiExecutor {
    pub(crate) fn new(client: Client, api: ApiName) -> Self { Self { client, api } }

    /// API this executor is bound to.
    #[must_use]
    pub fn api(&self) -> ApiName { self.api }

    /// Run `method` with the connection's default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the API is not granted, the node replies
    /// with an error, or the call times out or loses its connection.
    pub async fn exec(
        &self,
        method: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<Value, ClientError> {
        self.client
            .call(Request::call(self.api, method, params), None)
            .await
    }

    /// Run `method` with an explicit soft timeout.
    ///
    /// # Errors
    ///
    /// See [`exec`](Self::exec).
    pub async fn exec_with_timeout(
        &self,
        method: impl Into<String>,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value, ClientError> {
        self.client
            .call(Request::call(self.api, method, params), Some(timeout))
            .await
    }

    /// Register `handler` through a subscription-style method.
    ///
    /// The subscription is armed once this call returns `Ok`; the handler
    /// then receives the payload of every notice the node pushes for it,
    /// including after transparent reconnects.
    ///
    /// # Errors
    ///
    /// See [`exec`](Self::exec).
    pub async fn subscribe<H>(
        &self,
        method: SubscriptionMethod,
        handler: H,
        params: Vec<Value>,
    ) -> Result<Value, ClientError>
    where
        H: Fn(Value) + Send + Sync + 'static,
    {
        let request = Request::subscribe(self.api, method.as_str(), handler, params);
        self.client.call(request, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_always_resolves_to_meta_id() {
        let registry = ApiRegistry::default();
        assert_eq!(registry.id(ApiName::Login), Some(META_API_ID));
    }

    #[test]
    fn absent_entries_fail_with_capability_error() {
        let mut registry = ApiRegistry::default();
        registry.register(ApiName::Database, Some(2));
        registry.register(ApiName::History, None);

        assert_eq!(registry.resolve(ApiName::Database).ok(), Some(2));
        assert!(matches!(
            registry.resolve(ApiName::History),
            Err(ClientError::ApiNotGranted {
                api: ApiName::History
            })
        ));
        assert!(matches!(
            registry.resolve(ApiName::Asset),
            Err(ClientError::ApiNotGranted { api: ApiName::Asset })
        ));
    }

    #[test]
    fn clear_forgets_granted_ids() {
        let mut registry = ApiRegistry::default();
        registry.register(ApiName::Database, Some(2));
        registry.clear();
        assert_eq!(registry.id(ApiName::Database), None);
    }
}
