//! Websocket transport built on `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream,
    WebSocketStream,
    connect_async,
    tungstenite::{Error as WsError, Message, protocol::CloseFrame},
};
use tracing::debug;
use url::Url;

use super::{CloseInfo, Link, NO_STATUS_RECEIVED, Transport, TransportEvent};
use crate::error::ClientError;

/// Opens websocket links with `tokio-tungstenite`, with TLS for `wss://`.
///
/// # Examples
///
/// ```no_run
/// use chainwire::{Client, ConnectionOptions, transport::WebSocketTransport};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), chainwire::ClientError> {
/// let client = Client::builder().transport(WebSocketTransport).build();
/// client
///     .connect("ws://127.0.0.1:8090", ConnectionOptions::default())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &Url) -> Result<Box<dyn Link>, ClientError> {
        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(ClientError::transport)?;
        debug!(url = %url, status = %response.status(), "websocket upgrade complete");
        Ok(Box::new(WebSocketLink {
            stream,
            closed: false,
        }))
    }
}

struct WebSocketLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl Link for WebSocketLink {
    async fn send(&mut self, text: String) -> Result<(), ClientError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(ClientError::transport)
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        loop {
            let event = match self.stream.next().await {
                Some(Ok(Message::Text(text))) => TransportEvent::Message(text),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => TransportEvent::Message(text),
                    Err(_) => TransportEvent::Error("binary frame is not valid UTF-8".to_owned()),
                },
                // tungstenite answers pings itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    self.closed = true;
                    TransportEvent::Closed(close_info(frame))
                }
                Some(Err(e)) => {
                    self.closed = true;
                    TransportEvent::Closed(CloseInfo::abnormal(e.to_string()))
                }
                None => {
                    self.closed = true;
                    TransportEvent::Closed(CloseInfo::abnormal(
                        "stream ended without a close frame",
                    ))
                }
            };
            return Some(event);
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(ClientError::transport(e)),
        }
    }
}

fn close_info(frame: Option<CloseFrame<'_>>) -> CloseInfo {
    match frame {
        Some(frame) => CloseInfo::new(u16::from(frame.code), frame.reason.into_owned()),
        None => CloseInfo::new(NO_STATUS_RECEIVED, ""),
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    use super::*;
    use crate::transport::NORMAL_CLOSURE;

    #[test]
    fn close_frame_maps_code_and_reason() {
        let info = close_info(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: Cow::Borrowed("bye"),
        }));
        assert_eq!(info, CloseInfo::new(NORMAL_CLOSURE, "bye"));
        assert!(!info.is_abnormal());
    }

    #[test]
    fn missing_close_frame_is_not_abnormal() {
        let info = close_info(None);
        assert_eq!(info.code, NO_STATUS_RECEIVED);
        assert!(!info.is_abnormal());
    }
}
