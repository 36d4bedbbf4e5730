//! In-memory [`Connector`] for transport and bus tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::sink;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use url::Url;

use super::connector::{CloseReason, Connection, Connector, Frame};
use super::TransportError;

struct Shared {
    accepting: AtomicBool,
    hang: AtomicBool,
    attempts: AtomicUsize,
    peers: mpsc::UnboundedSender<MockPeer>,
}

/// Opens in-memory connections and hands the far end to [`MockRemote`].
pub(crate) struct MockConnector {
    shared: Arc<Shared>,
}

/// Test-side controls for a [`MockConnector`].
pub(crate) struct MockRemote {
    shared: Arc<Shared>,
    peers: Mutex<mpsc::UnboundedReceiver<MockPeer>>,
}

/// The server end of one mock connection.
///
/// Dropping it ends the client's stream, which the transport sees as an
/// abnormal closure.
pub(crate) struct MockPeer {
    pub sent: mpsc::UnboundedReceiver<Frame>,
    pub inbound: mpsc::UnboundedSender<Result<Frame, TransportError>>,
}

impl MockConnector {
    pub fn new(accepting: bool) -> (Self, MockRemote) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            accepting: AtomicBool::new(accepting),
            hang: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            peers: peers_tx,
        });
        let remote = MockRemote {
            shared: shared.clone(),
            peers: Mutex::new(peers_rx),
        };
        (Self { shared }, remote)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &Url) -> Result<Connection, TransportError> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);
        if self.shared.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if !self.shared.accepting.load(Ordering::SeqCst) {
            return Err(TransportError::Refused("mock refused".into()));
        }

        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let sink = sink::unfold(sent_tx, |sent_tx, frame: Frame| async move {
            sent_tx.send(frame).map_err(|_| TransportError::Closed)?;
            Ok::<_, TransportError>(sent_tx)
        });
        let stream = UnboundedReceiverStream::new(inbound_rx);

        let _ = self.shared.peers.send(MockPeer {
            sent: sent_rx,
            inbound: inbound_tx,
        });
        Ok(Connection {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

impl MockRemote {
    pub fn set_accepting(&self, accepting: bool) {
        self.shared.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Make connection attempts never complete.
    pub fn set_hang(&self, hang: bool) {
        self.shared.hang.store(hang, Ordering::SeqCst);
    }

    /// Number of connection attempts so far, successful or not.
    pub fn attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub async fn next_peer(&self) -> MockPeer {
        match self.peers.lock().await.recv().await {
            Some(peer) => peer,
            None => unreachable!("connector keeps the peer channel open"),
        }
    }
}

impl MockPeer {
    pub fn push_text(&self, text: String) {
        let _ = self.inbound.send(Ok(Frame::Text(text)));
    }

    pub fn push_close(&self, code: u16, reason: &str) {
        let _ = self.inbound.send(Ok(Frame::Close(Some(CloseReason {
            code,
            reason: reason.to_string(),
        }))));
    }
}
