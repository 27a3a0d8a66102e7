//! Lifecycle hook methods for `ClientBuilder`.

use std::{future::Future, sync::Arc};

use super::ClientBuilder;
use crate::{error::ClientError, transport::CloseInfo};

impl ClientBuilder {
    /// Register a callback invoked when a connection opens.
    ///
    /// # Examples
    ///
    /// ```
    /// use chainwire::ClientBuilder;
    ///
    /// let builder = ClientBuilder::new().on_open(|| async { println!("open") });
    /// let _ = builder;
    /// ```
    #[must_use]
    pub fn on_open<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.lifecycle_hooks.on_open = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// Register a callback invoked when a connection closes.
    ///
    /// # Examples
    ///
    /// ```
    /// use chainwire::ClientBuilder;
    ///
    /// let builder = ClientBuilder::new().on_close(|info| async move {
    ///     println!("closed with {info}");
    /// });
    /// let _ = builder;
    /// ```
    #[must_use]
    pub fn on_close<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CloseInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.lifecycle_hooks.on_close = Some(Arc::new(move |info| Box::pin(f(info))));
        self
    }

    /// Register a callback invoked for errors no pending call owns.
    ///
    /// # Examples
    ///
    /// ```
    /// use chainwire::ClientBuilder;
    ///
    /// let builder = ClientBuilder::new().on_error(|err| async move {
    ///     eprintln!("client error: {err}");
    /// });
    /// let _ = builder;
    /// ```
    #[must_use]
    pub fn on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ClientError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.lifecycle_hooks.on_error = Some(Arc::new(move |e| Box::pin(f(e))));
        self
    }
}
