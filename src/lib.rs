#![doc(html_root_url = "https://docs.rs/chainwire/latest")]
//! Public API for the `chainwire` library.
//!
//! `chainwire` is an asynchronous JSON-RPC client for Graphene-style
//! blockchain nodes. One connection engine owns the websocket, multiplexes
//! concurrent calls and push subscriptions over it, negotiates numeric API
//! identifiers, and silently recovers from dropped sockets by replaying
//! outstanding work.
//!
//! # Examples
//!
//! ```no_run
//! use chainwire::{ApiName, Client, ConnectionOptions, SubscriptionMethod};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), chainwire::ClientError> {
//! let client = Client::new();
//! client
//!     .connect(
//!         "wss://node.example.com/ws",
//!         ConnectionOptions::default().apis([ApiName::Database, ApiName::NetworkBroadcast]),
//!     )
//!     .await?;
//!
//! let database = client.api(ApiName::Database);
//! let block = database.exec("get_block", vec![json!(1)]).await?;
//! println!("{block}");
//!
//! database
//!     .subscribe(
//!         SubscriptionMethod::SetBlockAppliedCallback,
//!         |notice| println!("block applied: {notice}"),
//!         vec![],
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
mod engine;
pub mod error;
pub mod metrics;
pub mod options;
mod panic;
pub mod registry;
pub mod request;
pub mod transport;
mod wire;

pub use api::{ApiName, META_API_ID, SubscriptionMethod, UnknownApi};
pub use client::{Client, ClientBuilder};
pub use engine::{ConnectionState, ConnectionStatus};
pub use error::{ClientError, ErrorKind, ProtocolError};
pub use options::{ConnectionOptions, OptionsError};
pub use registry::ApiExecutor;
pub use request::{ApiTarget, NoticeHandler, Request};
pub use transport::CloseInfo;
