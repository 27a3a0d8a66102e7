//! Builder for configuring a chainwire client.

mod core;
mod lifecycle;
mod tracing;

pub use self::core::ClientBuilder;
