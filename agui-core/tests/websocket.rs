use std::time::Duration;

use agui_core::bus::{EmitOptions, EventBus, SubscriptionOptions};
use agui_core::config::BusConfig;
use agui_core::transport::ConnectionState;
use agui_sdk::config::TransportConfig;
use agui_sdk::objects::events::{ButtonClicked, EventKind};
use agui_sdk::objects::{CloseCode, EventRecord};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

fn bus_config(url: &str, attempts: u32) -> BusConfig {
    BusConfig {
        transport: TransportConfig {
            reconnect_attempts: attempts,
            reconnect_delay: Duration::from_millis(10),
            timeout: Duration::from_secs(2),
            ..TransportConfig::new(Url::parse(url).unwrap())
        },
        ..BusConfig::default()
    }
}

#[tokio::test]
async fn test_round_trip_over_real_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();

        let received = loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    break serde_json::from_str::<EventRecord>(&text).unwrap();
                }
                Some(Ok(_)) => continue,
                other => panic!("client went away: {other:?}"),
            }
        };
        let reply = EventRecord::new(
            ButtonClicked {
                button_id: "confirm".into(),
                action: Some("ack".into()),
            },
            "server",
        )
        .with_correlation_id(received.id());
        socket
            .send(Message::Text(reply.to_json().unwrap()))
            .await
            .unwrap();

        while let Some(Ok(message)) = socket.next().await {
            if let Message::Close(frame) = message {
                return frame.map(|frame| u16::from(frame.code));
            }
        }
        None
    });

    let bus = EventBus::with_websocket(bus_config(&format!("ws://{addr}/ws/agui"), 3));
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(
        EventKind::ButtonClicked,
        move |record: &EventRecord| {
            tx.send(record.clone())?;
            Ok(())
        },
        SubscriptionOptions::default(),
    );

    assert_eq!(bus.initialize().await, ConnectionState::Connected);
    let sent = bus.emit(
        ButtonClicked {
            button_id: "buy".into(),
            action: None,
        },
        EmitOptions::default(),
    );

    let local = rx.recv().await.unwrap();
    assert_eq!(local.id(), sent.id());

    let remote = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(remote.source(), "server");
    assert_eq!(remote.correlation_id(), Some(sent.id()));
    assert_eq!(bus.transport().metrics().events_processed, 1);
    assert_eq!(bus.transport().metrics().throughput, 1);

    bus.destroy().await;
    let close_code = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(close_code, Some(CloseCode::NORMAL));
}

#[tokio::test]
async fn test_unreachable_endpoint_fails_after_retries() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let bus = EventBus::with_websocket(bus_config(&format!("ws://{addr}/ws/agui"), 2));
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(
        EventKind::SystemConnectionFailed,
        move |record: &EventRecord| {
            tx.send(record.clone())?;
            Ok(())
        },
        SubscriptionOptions::default(),
    );
    assert_eq!(bus.initialize().await, ConnectionState::Reconnecting);

    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bus.transport().state(), ConnectionState::Failed);
    assert_eq!(bus.transport().metrics().errors, 3);
    assert_eq!(
        bus.event_history(Some(EventKind::SystemReconnecting), None)
            .len(),
        2
    );
}
