//! Client handle for chainwire connections.
//!
//! A [`Client`] is a cheap, cloneable handle to a connection engine running
//! on its own task. Every clone drives the same engine; dropping the last one
//! shuts it down and closes the socket. Lifecycle hooks and tracing are
//! configured on [`ClientBuilder`].

mod builder;
pub(crate) mod hooks;
mod runtime;
mod tracing_config;
mod tracing_helpers;

pub use builder::ClientBuilder;
pub use hooks::{BoxFuture, CloseHandler, ErrorHandler, OpenHandler};
pub use runtime::Client;
pub use tracing_config::TracingConfig;
