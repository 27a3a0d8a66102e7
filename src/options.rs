//! Connection options and their validation.
//!
//! [`ConnectionOptions`] is immutable once handed to
//! [`Client::connect`](crate::Client::connect). It is validated exactly once
//! per connect call; any invalid value rejects the call before a socket is
//! opened.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::api::ApiName;

pub(crate) const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_PING_DELAY: Duration = Duration::from_secs(10);
const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Errors returned when connection options fail validation.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum OptionsError {
    /// An entry of `apis` does not name a known API.
    #[error("invalid parameter `apis`: unknown api `{0}`")]
    UnknownApi(String),
    /// A parameter holds an unusable value.
    #[error("invalid parameter `{param}`: {reason}")]
    Invalid {
        /// Name of the offending parameter.
        param: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl OptionsError {
    fn invalid(param: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            param,
            reason: reason.into(),
        }
    }
}

/// Options controlling a single connection attempt.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use chainwire::{ApiName, ConnectionOptions};
///
/// let options = ConnectionOptions::default()
///     .apis([ApiName::Database, ApiName::NetworkBroadcast])
///     .connection_timeout(Duration::from_secs(2))
///     .max_retries(3);
/// assert_eq!(options.max_retries_value(), 3);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionOptions {
    apis: Vec<String>,
    connection_timeout: Duration,
    max_retries: u32,
    ping_delay: Duration,
    ping_timeout: Duration,
    debug: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            apis: ApiName::ALL
                .into_iter()
                .filter(|api| !api.is_meta())
                .map(|api| api.as_str().to_owned())
                .collect(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            ping_delay: DEFAULT_PING_DELAY,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            debug: false,
        }
    }
}

impl ConnectionOptions {
    /// Request the given APIs during the handshake.
    #[must_use]
    pub fn apis<I>(mut self, apis: I) -> Self
    where
        I: IntoIterator<Item = ApiName>,
    {
        self.apis = apis.into_iter().map(|api| api.as_str().to_owned()).collect();
        self
    }

    /// Request APIs by wire name.
    ///
    /// Names are checked when the options are validated at connect time, so
    /// this is the entry point for names read from configuration or the
    /// command line.
    #[must_use]
    pub fn api_names<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.apis = names.into_iter().map(Into::into).collect();
        self
    }

    /// Timeout for opening the socket, for each call by default, and the
    /// delay between reconnect attempts.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Number of reconnect attempts after the server closes the connection.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Idle period after which a keepalive call is issued.
    #[must_use]
    pub fn ping_delay(mut self, delay: Duration) -> Self {
        self.ping_delay = delay;
        self
    }

    /// Timeout applied to each keepalive call.
    #[must_use]
    pub fn ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    /// Log every inbound and outbound frame.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Configured retry budget.
    #[must_use]
    pub const fn max_retries_value(&self) -> u32 { self.max_retries }

    /// Configured connection timeout.
    #[must_use]
    pub const fn connection_timeout_value(&self) -> Duration { self.connection_timeout }

    /// Check every option and resolve API names.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError`] naming the first invalid parameter.
    pub(crate) fn validate(&self) -> Result<ValidatedOptions, OptionsError> {
        let mut apis = Vec::with_capacity(self.apis.len());
        for name in &self.apis {
            let api: ApiName = name
                .parse()
                .map_err(|_| OptionsError::UnknownApi(name.clone()))?;
            if !api.is_meta() && !apis.contains(&api) {
                apis.push(api);
            }
        }
        non_zero("connectionTimeout", self.connection_timeout)?;
        non_zero("pingDelay", self.ping_delay)?;
        non_zero("pingTimeout", self.ping_timeout)?;
        Ok(ValidatedOptions {
            apis,
            connection_timeout: self.connection_timeout,
            max_retries: self.max_retries,
            ping_delay: self.ping_delay,
            ping_timeout: self.ping_timeout,
            debug: self.debug,
        })
    }
}

fn non_zero(param: &'static str, value: Duration) -> Result<(), OptionsError> {
    if value.is_zero() {
        return Err(OptionsError::invalid(param, "must be greater than zero"));
    }
    Ok(())
}

/// Parse a node address, accepting only websocket schemes.
pub(crate) fn parse_url(raw: &str) -> Result<Url, OptionsError> {
    let url = Url::parse(raw).map_err(|e| OptionsError::invalid("url", e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(OptionsError::invalid(
            "url",
            format!("unsupported scheme `{other}`; expected ws or wss"),
        )),
    }
}

/// Options after validation, with API names resolved and deduplicated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ValidatedOptions {
    pub(crate) apis: Vec<ApiName>,
    pub(crate) connection_timeout: Duration,
    pub(crate) max_retries: u32,
    pub(crate) ping_delay: Duration,
    pub(crate) ping_timeout: Duration,
    pub(crate) debug: bool,
}
