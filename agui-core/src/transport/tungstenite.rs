//! [`Connector`] backed by `tokio-tungstenite`.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt, future};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

use super::connector::{CloseReason, Connection, Connector, Frame};
use super::TransportError;

/// Opens `ws://` and `wss://` connections (rustls with native roots).
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<Connection, TransportError> {
        let (socket, response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        tracing::debug!(%url, status = %response.status(), "WebSocket handshake complete");

        let (sink, stream) = socket.split();
        let sink = sink
            .sink_map_err(TransportError::from)
            .with(|frame: Frame| future::ready(Ok::<_, TransportError>(into_message(frame))));
        let stream = stream.filter_map(|message| {
            future::ready(match message {
                Ok(message) => from_message(message).map(Ok),
                Err(e) => Some(Err(TransportError::from(e))),
            })
        });

        Ok(Connection {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Close(reason) => Message::Close(reason.map(|reason| CloseFrame {
            code: CloseCode::from(reason.code),
            reason: reason.reason.into(),
        })),
    }
}

fn from_message(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text)),
        // Some servers send JSON as binary frames.
        Message::Binary(bytes) => String::from_utf8(bytes).ok().map(Frame::Text),
        Message::Close(frame) => Some(Frame::Close(frame.map(|frame| CloseReason {
            code: u16::from(frame.code),
            reason: frame.reason.into_owned(),
        }))),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}
