//! Tracing configuration for chainwire client operations.
//!
//! [`TracingConfig`] controls the level of the span each client operation
//! emits and whether per-command elapsed-time events are recorded.

use tracing::Level;

/// Controls tracing span levels and per-command timing for client operations.
///
/// By default, lifecycle operations (`connect`, `reconnect`, `close`) emit
/// spans at `INFO` level and `call` emits spans at `DEBUG` level. Per-command
/// timing is disabled for all operations by default.
///
/// When no `tracing` subscriber is installed, span creation is a no-op. When
/// timing is enabled for an operation, an event recording `elapsed_us` is
/// emitted at `DEBUG` level when the operation completes.
///
/// # Examples
///
/// ```
/// use chainwire::client::TracingConfig;
/// use tracing::Level;
///
/// let config = TracingConfig::default()
///     .with_connect_timing(true)
///     .with_call_level(Level::TRACE);
/// let _ = config;
/// ```
#[expect(
    clippy::struct_excessive_bools,
    reason = "four independent on/off timing flags, one per operation"
)]
#[derive(Clone, Debug)]
pub struct TracingConfig {
    pub(crate) connect_level: Level,
    pub(crate) call_level: Level,
    pub(crate) close_level: Level,
    pub(crate) reconnect_level: Level,
    pub(crate) connect_timing: bool,
    pub(crate) call_timing: bool,
    pub(crate) close_timing: bool,
    pub(crate) reconnect_timing: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            connect_level: Level::INFO,
            call_level: Level::DEBUG,
            close_level: Level::INFO,
            reconnect_level: Level::INFO,
            connect_timing: false,
            call_timing: false,
            close_timing: false,
            reconnect_timing: false,
        }
    }
}

impl TracingConfig {
    /// Set the tracing level for the `connect` operation.
    #[must_use]
    pub fn with_connect_level(mut self, level: Level) -> Self {
        self.connect_level = level;
        self
    }

    /// Enable or disable per-command timing for the `connect` operation.
    ///
    /// # Examples
    ///
    /// ```
    /// use chainwire::client::TracingConfig;
    ///
    /// let config = TracingConfig::default().with_connect_timing(true);
    /// let _ = config;
    /// ```
    #[must_use]
    pub fn with_connect_timing(mut self, enabled: bool) -> Self {
        self.connect_timing = enabled;
        self
    }

    /// Set the tracing level for `call` and executor operations.
    #[must_use]
    pub fn with_call_level(mut self, level: Level) -> Self {
        self.call_level = level;
        self
    }

    /// Enable or disable per-command timing for `call`.
    #[must_use]
    pub fn with_call_timing(mut self, enabled: bool) -> Self {
        self.call_timing = enabled;
        self
    }

    /// Set the tracing level for the `close` operation.
    #[must_use]
    pub fn with_close_level(mut self, level: Level) -> Self {
        self.close_level = level;
        self
    }

    /// Enable or disable per-command timing for the `close` operation.
    #[must_use]
    pub fn with_close_timing(mut self, enabled: bool) -> Self {
        self.close_timing = enabled;
        self
    }

    /// Set the tracing level for the `reconnect` operation.
    #[must_use]
    pub fn with_reconnect_level(mut self, level: Level) -> Self {
        self.reconnect_level = level;
        self
    }

    /// Enable or disable per-command timing for the `reconnect` operation.
    #[must_use]
    pub fn with_reconnect_timing(mut self, enabled: bool) -> Self {
        self.reconnect_timing = enabled;
        self
    }

    /// Set the tracing level for all operations at once.
    ///
    /// # Examples
    ///
    /// ```
    /// use chainwire::client::TracingConfig;
    /// use tracing::Level;
    ///
    /// let config = TracingConfig::default().with_all_levels(Level::TRACE);
    /// let _ = config;
    /// ```
    #[must_use]
    pub fn with_all_levels(mut self, level: Level) -> Self {
        self.connect_level = level;
        self.call_level = level;
        self.close_level = level;
        self.reconnect_level = level;
        self
    }

    /// Enable or disable per-command timing for all operations at once.
    #[must_use]
    pub fn with_all_timing(mut self, enabled: bool) -> Self {
        self.connect_timing = enabled;
        self.call_timing = enabled;
        self.close_timing = enabled;
        self.reconnect_timing = enabled;
        self
    }
}
