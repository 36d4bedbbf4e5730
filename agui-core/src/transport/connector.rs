//! The seam between the transport actor and a concrete socket library.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, Stream};
use url::Url;

use super::TransportError;

/// Close code and reason carried by a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

/// The frames the transport exchanges with a socket.
///
/// Protocol-level ping/pong frames are handled by the socket library and
/// never surface here; AG-UI heartbeats travel as [`Frame::Text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// `None` when the peer sent a close frame without a status code.
    Close(Option<CloseReason>),
}

pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// One open socket, split into its write and read halves.
///
/// The stream ending (`None`) means the connection is gone.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens connections for the transport.
///
/// The transport bounds each call with its configured timeout, so
/// implementations do not need their own.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &Url) -> Result<Connection, TransportError>;
}
