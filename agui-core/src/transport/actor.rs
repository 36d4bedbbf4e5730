//! The transport actor and its command handle.

use std::collections::VecDeque;
use std::sync::Arc;

use agui_sdk::config::TransportConfig;
use agui_sdk::objects::{CloseCode, ControlFrame, EventRecord, InboundFrame, now_millis};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::connector::{CloseReason, Connection, Connector, Frame};
use super::metrics::{MetricsRecorder, PerformanceMetrics};
use super::{
    ConnectionState, TransportError, TransportNotice, TransportOutput, TransportOutputReceiver,
    TransportOutputSender, transport_output_channel,
};
use crate::utils::backoff::reconnect_delay;

const CLIENT_DISCONNECT: &str = "client disconnect";

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

enum Command {
    Connect(oneshot::Sender<ConnectionState>),
    Send(EventRecord),
    Disconnect(oneshot::Sender<()>),
}

/// Cheap cloneable handle to a running transport actor.
///
/// The actor stops once every handle is dropped, closing the socket first.
#[derive(Clone)]
pub struct TransportHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    metrics: Arc<MetricsRecorder>,
}

impl TransportHandle {
    /// Open the connection unless it is already open.
    ///
    /// Resolves once the attempt finished, with the state it left behind:
    /// `Connected` on success, `Reconnecting` or `Failed` otherwise.
    pub async fn connect(&self) -> ConnectionState {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(Command::Connect(reply_tx)).is_err() {
            return self.state();
        }
        reply_rx.await.unwrap_or_else(|_| self.state())
    }

    /// Transmit `record`, or queue it until the next connection opens.
    pub fn send(&self, record: EventRecord) {
        if self.commands.send(Command::Send(record)).is_err() {
            warn!("Transport stopped, dropping outbound event");
        }
    }

    /// Close the connection with code 1000. Never reconnects afterwards.
    pub async fn disconnect(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(Command::Disconnect(reply_tx)).is_ok() {
            let _ = reply_rx.await;
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Start a transport actor on the current tokio runtime.
///
/// The transport starts `Disconnected`; nothing is opened until
/// [`TransportHandle::connect`] or [`TransportHandle::send`] is called.
pub fn spawn_transport(
    config: TransportConfig,
    connector: impl Connector,
) -> (TransportHandle, TransportOutputReceiver) {
    if let Err(e) = config.validate() {
        warn!(error = %e, "Transport config failed validation");
    }
    if config.compression {
        warn!("compression is not supported by the WebSocket client and will be ignored");
    }
    if config.encryption {
        warn!("encryption is not supported beyond wss:// and will be ignored");
    }

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
    let (output_tx, output_rx) = transport_output_channel();
    let metrics = Arc::new(MetricsRecorder::default());

    let actor = TransportActor {
        config,
        connector: Arc::new(connector),
        connection: None,
        queue: OutboundQueue::default(),
        attempts: 0,
        retry_at: None,
        heartbeat: None,
        state: state_tx,
        output: output_tx,
        metrics: metrics.clone(),
    };
    tokio::spawn(actor.run(commands_rx));

    let handle = TransportHandle {
        commands: commands_tx,
        state: state_rx,
        metrics,
    };
    (handle, output_rx)
}

// ---------------------------------------------------------------------------
// Outbound queue
// ---------------------------------------------------------------------------

/// Serialized frames waiting for a connection, oldest first.
#[derive(Default)]
struct OutboundQueue {
    frames: VecDeque<String>,
    bytes: usize,
}

impl OutboundQueue {
    fn push_back(&mut self, frame: String) {
        self.bytes += frame.len();
        self.frames.push_back(frame);
    }

    fn push_front(&mut self, frame: String) {
        self.bytes += frame.len();
        self.frames.push_front(frame);
    }

    fn pop_front(&mut self) -> Option<String> {
        let frame = self.frames.pop_front()?;
        self.bytes -= frame.len();
        Some(frame)
    }

    fn len(&self) -> usize {
        self.frames.len()
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct TransportActor {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    connection: Option<Connection>,
    queue: OutboundQueue,
    /// Reconnection attempts since the last successful open.
    attempts: u32,
    retry_at: Option<Instant>,
    heartbeat: Option<Interval>,
    state: watch::Sender<ConnectionState>,
    output: TransportOutputSender,
    metrics: Arc<MetricsRecorder>,
}

impl TransportActor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        debug!(url = %self.config.url, "Transport started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => {
                        self.disconnect().await;
                        break;
                    }
                },
                frame = next_frame(&mut self.connection) => self.on_frame(frame).await,
                _ = next_heartbeat(&mut self.heartbeat) => self.send_heartbeat().await,
                _ = retry_due(self.retry_at) => {
                    self.retry_at = None;
                    self.connect().await;
                }
            }
        }
        debug!(url = %self.config.url, "Transport stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Connect(reply) => {
                self.connect().await;
                let _ = reply.send(self.current_state());
            }
            Command::Send(record) => self.send(record).await,
            Command::Disconnect(reply) => {
                self.disconnect().await;
                let _ = reply.send(());
            }
        }
    }

    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Transport state changed");
        }
    }

    fn notify(&self, notice: TransportNotice) {
        let _ = self.output.send(TransportOutput::Notice(notice));
    }

    fn sync_queue_metrics(&self) {
        self.metrics.set_queue(self.queue.len(), self.queue.bytes);
    }

    // -- Connection lifecycle ----------------------------------------------

    async fn connect(&mut self) {
        if self.connection.is_some() {
            return;
        }
        self.retry_at = None;
        self.set_state(ConnectionState::Connecting);

        let url = self.config.url.clone();
        let result =
            match tokio::time::timeout(self.config.timeout, self.connector.connect(&url)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(self.config.timeout)),
            };

        match result {
            Ok(connection) => self.on_open(connection).await,
            Err(e) => {
                self.metrics.record_error();
                warn!(%url, error = %e, "Connection attempt failed");
                self.notify(TransportNotice::Error {
                    message: e.to_string(),
                });
                self.schedule_reconnect();
            }
        }
    }

    async fn on_open(&mut self, connection: Connection) {
        info!(url = %self.config.url, "Connected");
        self.connection = Some(connection);
        self.attempts = 0;
        self.metrics.connection_opened();
        self.set_state(ConnectionState::Connected);
        self.notify(TransportNotice::Connected {
            url: self.config.url.to_string(),
        });
        self.start_heartbeat();
        self.flush_queue().await;
    }

    /// Replaces any running heartbeat, so there is never more than one.
    fn start_heartbeat(&mut self) {
        let period = self.config.heartbeat_interval;
        if period.is_zero() {
            self.heartbeat = None;
            return;
        }
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.heartbeat = Some(interval);
    }

    fn schedule_reconnect(&mut self) {
        if self.attempts >= self.config.reconnect_attempts {
            warn!(
                attempts = self.attempts,
                url = %self.config.url,
                "Reconnection attempts exhausted"
            );
            self.retry_at = None;
            self.set_state(ConnectionState::Failed);
            self.notify(TransportNotice::ConnectionFailed {
                attempts: self.attempts,
            });
            return;
        }

        self.attempts += 1;
        let delay = reconnect_delay(self.config.reconnect_delay, self.attempts);
        info!(
            attempt = self.attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        self.set_state(ConnectionState::Reconnecting);
        self.notify(TransportNotice::Reconnecting {
            attempt: self.attempts,
            delay,
        });
        self.retry_at = Instant::now().checked_add(delay);
    }

    /// The connection went away without the client asking for it.
    fn on_closed(&mut self, code: u16, reason: String) {
        self.connection = None;
        self.heartbeat = None;
        self.metrics.connection_closed();
        info!(code, %reason, "Connection closed");
        self.notify(TransportNotice::Disconnected { code, reason });
        self.schedule_reconnect();
    }

    async fn disconnect(&mut self) {
        self.retry_at = None;
        self.heartbeat = None;
        self.attempts = 0;

        if let Some(mut connection) = self.connection.take() {
            let close = Frame::Close(Some(CloseReason {
                code: CloseCode::NORMAL,
                reason: CLIENT_DISCONNECT.to_string(),
            }));
            if let Err(e) = connection.sink.send(close).await {
                debug!(error = %e, "Close frame not delivered");
            }
            self.metrics.connection_closed();
            info!(url = %self.config.url, "Disconnected");
            self.notify(TransportNotice::Disconnected {
                code: CloseCode::NORMAL,
                reason: CLIENT_DISCONNECT.to_string(),
            });
        }
        self.set_state(ConnectionState::Disconnected);
    }

    // -- Outbound ----------------------------------------------------------

    async fn send(&mut self, record: EventRecord) {
        let text = match record.to_json() {
            Ok(text) => text,
            Err(e) => {
                self.metrics.record_error();
                warn!(id = record.id(), error = %e, "Failed to serialize outbound event");
                return;
            }
        };

        if self.connection.is_some() {
            self.transmit(text).await;
            return;
        }

        self.queue.push_back(text);
        self.sync_queue_metrics();
        debug!(id = record.id(), queued = self.queue.len(), "Queued outbound event");

        // A pending backoff timer flushes the queue when it fires.
        if matches!(
            self.current_state(),
            ConnectionState::Disconnected | ConnectionState::Failed
        ) {
            self.connect().await;
        }
    }

    /// Write one event frame. On failure the frame goes back to the front of
    /// the queue and the connection is treated as lost.
    async fn transmit(&mut self, text: String) -> bool {
        match self.write(Frame::Text(text.clone())).await {
            Ok(()) => {
                self.metrics.record_sent();
                true
            }
            Err(e) => {
                self.metrics.record_error();
                warn!(error = %e, "Failed to send event");
                self.queue.push_front(text);
                self.sync_queue_metrics();
                self.on_closed(CloseCode::ABNORMAL, e.to_string());
                false
            }
        }
    }

    async fn flush_queue(&mut self) {
        if self.queue.len() == 0 {
            return;
        }
        debug!(queued = self.queue.len(), "Flushing outbound queue");
        while let Some(text) = self.queue.pop_front() {
            if !self.transmit(text).await {
                break;
            }
        }
        self.sync_queue_metrics();
    }

    async fn write(&mut self, frame: Frame) -> Result<(), TransportError> {
        match self.connection.as_mut() {
            Some(connection) => connection.sink.send(frame).await,
            None => Err(TransportError::Closed),
        }
    }

    async fn send_control(&mut self, frame: ControlFrame) {
        let text = match frame.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize control frame");
                return;
            }
        };
        if let Err(e) = self.write(Frame::Text(text)).await {
            self.metrics.record_error();
            warn!(error = %e, "Failed to send control frame");
            self.on_closed(CloseCode::ABNORMAL, e.to_string());
        }
    }

    async fn send_heartbeat(&mut self) {
        debug!("Sending heartbeat");
        self.send_control(ControlFrame::ping()).await;
    }

    // -- Inbound -----------------------------------------------------------

    async fn on_frame(&mut self, frame: Option<Result<Frame, TransportError>>) {
        match frame {
            Some(Ok(Frame::Text(text))) => self.on_text(&text).await,
            Some(Ok(Frame::Close(reason))) => {
                let (code, reason) = match reason {
                    Some(reason) => (reason.code, reason.reason),
                    None => (CloseCode::NO_STATUS, String::new()),
                };
                self.on_closed(code, reason);
            }
            Some(Err(e)) => {
                self.metrics.record_error();
                warn!(error = %e, "Connection error");
                self.on_closed(CloseCode::ABNORMAL, e.to_string());
            }
            None => self.on_closed(CloseCode::ABNORMAL, "connection lost".to_string()),
        }
    }

    async fn on_text(&mut self, text: &str) {
        match InboundFrame::decode(text) {
            Ok(InboundFrame::Event(record)) => {
                self.metrics
                    .record_inbound(now_millis().saturating_sub(record.timestamp()));
                let _ = self.output.send(TransportOutput::Event(record));
            }
            Ok(InboundFrame::Control(ControlFrame::Ping { .. })) => {
                self.send_control(ControlFrame::pong()).await;
            }
            Ok(InboundFrame::Control(ControlFrame::Pong { timestamp })) => {
                debug!(timestamp, "Pong received");
            }
            Err(e) => {
                self.metrics.record_error();
                warn!(error = %e, "Dropping malformed inbound frame");
            }
        }
    }
}

async fn next_frame(connection: &mut Option<Connection>) -> Option<Result<Frame, TransportError>> {
    match connection {
        Some(connection) => connection.stream.next().await,
        None => std::future::pending().await,
    }
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn retry_due(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use agui_sdk::objects::events::{ButtonClicked, EventKind};
    use url::Url;

    use super::*;
    use crate::transport::testing::{MockConnector, MockPeer};

    fn config(attempts: u32, delay_ms: u64) -> TransportConfig {
        TransportConfig {
            reconnect_attempts: attempts,
            reconnect_delay: Duration::from_millis(delay_ms),
            ..TransportConfig::new(Url::parse("ws://agui.test/ws/agui").unwrap())
        }
    }

    fn click(button_id: &str) -> EventRecord {
        EventRecord::new(
            ButtonClicked {
                button_id: button_id.into(),
                action: None,
            },
            "test",
        )
    }

    fn drain_notices(output: &mut TransportOutputReceiver) -> Vec<TransportNotice> {
        let mut notices = Vec::new();
        while let Ok(item) = output.try_recv() {
            if let TransportOutput::Notice(notice) = item {
                notices.push(notice);
            }
        }
        notices
    }

    fn decode_sent(peer: &mut MockPeer) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = peer.sent.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_then_failed() {
        let (connector, remote) = MockConnector::new(true);
        let (transport, mut output) = spawn_transport(config(3, 100), connector);

        assert_eq!(transport.connect().await, ConnectionState::Connected);
        let peer = remote.next_peer().await;

        let mut states = transport.watch_state();
        remote.set_accepting(false);
        drop(peer);
        states
            .wait_for(|state| *state == ConnectionState::Failed)
            .await
            .unwrap();

        let notices = drain_notices(&mut output);
        let delays: Vec<_> = notices
            .iter()
            .filter_map(|notice| match notice {
                TransportNotice::Reconnecting { attempt, delay } => Some((*attempt, *delay)),
                _ => None,
            })
            .collect();
        assert_eq!(
            delays,
            vec![
                (1, Duration::from_millis(100)),
                (2, Duration::from_millis(200)),
                (3, Duration::from_millis(400)),
            ]
        );
        let failed: Vec<_> = notices
            .iter()
            .filter(|notice| matches!(notice, TransportNotice::ConnectionFailed { .. }))
            .collect();
        assert_eq!(failed, vec![&TransportNotice::ConnectionFailed { attempts: 3 }]);
        assert!(matches!(
            notices.last(),
            Some(TransportNotice::ConnectionFailed { .. })
        ));
        assert_eq!(transport.state(), ConnectionState::Failed);
        assert_eq!(remote.attempts(), 4);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(remote.attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_events_flush_in_order() {
        let (connector, remote) = MockConnector::new(false);
        let (transport, _output) = spawn_transport(config(0, 100), connector);

        let records: Vec<_> = (0..5).map(|i| click(&format!("b{i}"))).collect();
        for record in &records {
            transport.send(record.clone());
        }
        // Commands are handled in order, so this observes all five sends.
        assert_eq!(transport.connect().await, ConnectionState::Failed);
        let metrics = transport.metrics();
        assert_eq!(metrics.queued, 5);
        assert!(metrics.memory_usage > 0);
        assert_eq!(metrics.throughput, 0);

        remote.set_accepting(true);
        assert_eq!(transport.connect().await, ConnectionState::Connected);
        let mut peer = remote.next_peer().await;

        let sent = decode_sent(&mut peer);
        let ids: Vec<String> = sent
            .iter()
            .map(|frame| match frame {
                Frame::Text(text) => serde_json::from_str::<EventRecord>(text)
                    .unwrap()
                    .id()
                    .to_string(),
                other => panic!("unexpected frame {other:?}"),
            })
            .collect();
        let expected: Vec<String> = records.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, expected);

        let metrics = transport.metrics();
        assert_eq!(metrics.throughput, 5);
        assert_eq!(metrics.queued, 0);
        assert_eq!(metrics.memory_usage, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_connected_is_immediate() {
        let (connector, remote) = MockConnector::new(true);
        let (transport, _output) = spawn_transport(config(3, 100), connector);
        transport.connect().await;
        let mut peer = remote.next_peer().await;

        transport.send(click("buy"));
        let Some(Frame::Text(text)) = peer.sent.recv().await else {
            panic!("expected a text frame");
        };
        let record: EventRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(record.kind(), EventKind::ButtonClicked);
        assert_eq!(transport.metrics().throughput, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_until_disconnect() {
        let (connector, remote) = MockConnector::new(true);
        let (transport, _output) = spawn_transport(config(3, 100), connector);
        transport.connect().await;
        let mut peer = remote.next_peer().await;

        tokio::time::sleep(Duration::from_secs(95)).await;
        let pings = decode_sent(&mut peer)
            .into_iter()
            .filter(|frame| match frame {
                Frame::Text(text) => matches!(
                    serde_json::from_str::<ControlFrame>(text),
                    Ok(ControlFrame::Ping { .. })
                ),
                Frame::Close(_) => false,
            })
            .count();
        assert_eq!(pings, 3);

        transport.disconnect().await;
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert_eq!(
            peer.sent.recv().await,
            Some(Frame::Close(Some(CloseReason {
                code: CloseCode::NORMAL,
                reason: CLIENT_DISCONNECT.into(),
            })))
        );

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(peer.sent.recv().await, None);
        assert_eq!(remote.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_events_and_malformed_frames() {
        let (connector, remote) = MockConnector::new(true);
        let (transport, mut output) = spawn_transport(config(3, 100), connector);
        transport.connect().await;
        let peer = remote.next_peer().await;

        let first = click("first");
        let second = click("second");
        peer.push_text(first.to_json().unwrap());
        peer.push_text("{not json".to_string());
        peer.push_text(r#"{"id":"x","type":"nope.nothing","data":{},"timestamp":1}"#.to_string());
        peer.push_text(second.to_json().unwrap());

        let mut events = Vec::new();
        while events.len() < 2 {
            match output.recv().await {
                Some(TransportOutput::Event(record)) => events.push(record),
                Some(TransportOutput::Notice(_)) => {}
                None => break,
            }
        }
        assert_eq!(events, vec![first, second]);

        let metrics = transport.metrics();
        assert_eq!(metrics.events_processed, 2);
        assert_eq!(metrics.errors, 2);
        assert_eq!(transport.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extreme_timestamps_do_not_stop_the_transport() {
        let (connector, remote) = MockConnector::new(true);
        let (transport, mut output) = spawn_transport(config(3, 100), connector);
        transport.connect().await;
        let mut peer = remote.next_peer().await;

        for timestamp in [i64::MIN, i64::MAX] {
            let mut frame = serde_json::to_value(click("clock-skew")).unwrap();
            frame["timestamp"] = serde_json::json!(timestamp);
            peer.push_text(frame.to_string());
        }
        peer.push_text(ControlFrame::Ping { timestamp: 1 }.to_json().unwrap());

        let Some(Frame::Text(text)) = peer.sent.recv().await else {
            panic!("expected a pong");
        };
        assert!(matches!(
            serde_json::from_str::<ControlFrame>(&text),
            Ok(ControlFrame::Pong { .. })
        ));

        let mut timestamps = Vec::new();
        while let Ok(item) = output.try_recv() {
            if let TransportOutput::Event(record) = item {
                timestamps.push(record.timestamp());
            }
        }
        assert_eq!(timestamps, vec![i64::MIN, i64::MAX]);
        assert_eq!(transport.metrics().events_processed, 2);
        assert_eq!(transport.state(), ConnectionState::Connected);

        transport.send(click("after"));
        assert!(matches!(peer.sent.recv().await, Some(Frame::Text(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_is_answered_with_pong() {
        let (connector, remote) = MockConnector::new(true);
        let (transport, _output) = spawn_transport(config(3, 100), connector);
        transport.connect().await;
        let mut peer = remote.next_peer().await;

        peer.push_text(ControlFrame::Ping { timestamp: 1 }.to_json().unwrap());
        let Some(Frame::Text(text)) = peer.sent.recv().await else {
            panic!("expected a pong");
        };
        assert!(matches!(
            serde_json::from_str::<ControlFrame>(&text),
            Ok(ControlFrame::Pong { .. })
        ));
        assert_eq!(transport.metrics().events_processed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_close_reconnects() {
        let (connector, remote) = MockConnector::new(true);
        let (transport, mut output) = spawn_transport(config(3, 100), connector);
        transport.connect().await;
        let peer = remote.next_peer().await;

        peer.push_close(CloseCode::GOING_AWAY, "restart");
        let _peer = remote.next_peer().await;
        tokio::task::yield_now().await;

        let notices = drain_notices(&mut output);
        assert!(notices.contains(&TransportNotice::Disconnected {
            code: CloseCode::GOING_AWAY,
            reason: "restart".into(),
        }));
        assert!(notices.contains(&TransportNotice::Reconnecting {
            attempt: 1,
            delay: Duration::from_millis(100),
        }));
        assert_eq!(remote.attempts(), 2);
        assert_eq!(transport.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_times_out() {
        let (connector, remote) = MockConnector::new(true);
        remote.set_hang(true);
        let mut config = config(0, 100);
        config.timeout = Duration::from_secs(2);
        let (transport, mut output) = spawn_transport(config, connector);

        let started = Instant::now();
        assert_eq!(transport.connect().await, ConnectionState::Failed);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
        assert_eq!(transport.metrics().errors, 1);

        let notices = drain_notices(&mut output);
        assert!(matches!(
            notices.first(),
            Some(TransportNotice::Error { message }) if message.contains("timed out")
        ));
        assert_eq!(
            notices.last(),
            Some(&TransportNotice::ConnectionFailed { attempts: 0 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_closes_socket() {
        let (connector, remote) = MockConnector::new(true);
        let (transport, _output) = spawn_transport(config(3, 100), connector);
        transport.connect().await;
        let mut peer = remote.next_peer().await;

        drop(transport);
        assert!(matches!(peer.sent.recv().await, Some(Frame::Close(_))));
        assert_eq!(peer.sent.recv().await, None);
    }
}
