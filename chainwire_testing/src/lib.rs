//! Utilities for driving a [`chainwire::Client`] against a scripted node
//! during tests.
//!
//! [`mock_node`] returns a transport to hand to
//! [`ClientBuilder::transport`](chainwire::ClientBuilder::transport) and a
//! [`MockNode`] that observes what the client sends and plays the node's
//! side of the conversation.
//!
//! ```rust
//! use chainwire::{Client, ConnectionOptions};
//! use chainwire_testing::mock_node;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (transport, mut node) = mock_node();
//! let client = Client::builder().transport(transport).build();
//! client
//!     .connect("ws://node.test", ConnectionOptions::default())
//!     .await
//!     .expect("handshake is answered by the mock");
//! assert_eq!(node.opens(), 1);
//! # let _ = &mut node;
//! # }
//! ```

pub mod logging;
pub mod mock_node;

pub use logging::{LoggerHandle, logger};
pub use mock_node::{
    HandshakeReply,
    MockNode,
    MockTransport,
    NodeEvent,
    SentCall,
    default_api_id,
    mock_node,
};
