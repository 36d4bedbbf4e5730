use agui_sdk::objects::events::SystemError;
use agui_sdk::objects::{ControlFrame, EventRecord, InboundFrame, Priority};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::SERVER_SOURCE;
use crate::state::{AppState, RelayMessage};

/// `GET /ws/agui` - AG-UI event relay.
///
/// Every event frame a client sends is forwarded verbatim to every other
/// connected client (and back to the sender when `relay.echo` is set).
/// `ping` frames are answered with `pong`. Frames that are neither get a
/// `system.error` event in reply and are otherwise ignored.
pub(super) async fn agui_ws(state: State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let app_state = state.0.clone();
    ws.on_upgrade(move |socket| handle_relay_ws(socket, app_state))
}

/// Background task that drives a single WebSocket connection.
async fn handle_relay_ws(mut socket: WebSocket, state: AppState) {
    // Subscribe before the client is counted so anyone waiting on the
    // client count never publishes into a gap.
    let mut relay_rx = state.relay_tx.subscribe();
    let client = state.register_client();
    let client_id = client.id();
    tracing::info!(
        client = client_id,
        clients = state.connected_clients(),
        "AG-UI client connected"
    );

    loop {
        tokio::select! {
            result = relay_rx.recv() => {
                match result {
                    Ok(message) => {
                        if message.origin == client_id && !state.echo().await {
                            continue;
                        }
                        if socket
                            .send(Message::Text(message.payload.to_string().into()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(
                            client = client_id,
                            skipped = n,
                            "WS: relay receiver lagged, events skipped"
                        );
                    }
                    Err(RecvError::Closed) => {
                        break;
                    }
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if handle_frame(&mut socket, &state, client_id, text.as_str())
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(client = client_id, error = %e, "WS: receive failed");
                        break;
                    }
                }
            }
        }
    }

    drop(client);
    tracing::info!(
        client = client_id,
        clients = state.connected_clients(),
        "AG-UI client disconnected"
    );
}

/// Handle one text frame from a client.
///
/// Returns `Err` only when writing to the socket failed.
async fn handle_frame(
    socket: &mut WebSocket,
    state: &AppState,
    client_id: u64,
    text: &str,
) -> Result<(), axum::Error> {
    match InboundFrame::decode(text) {
        Ok(InboundFrame::Event(record)) => {
            tracing::debug!(
                client = client_id,
                id = record.id(),
                kind = %record.kind(),
                "Relaying event"
            );
            // Only fails when nobody is subscribed, which cannot happen
            // while this client's own receiver is alive.
            let _ = state.relay_tx.send(RelayMessage {
                origin: client_id,
                payload: Arc::from(text),
            });
            Ok(())
        }
        Ok(InboundFrame::Control(ControlFrame::Ping { .. })) => {
            send_json(socket, &ControlFrame::pong()).await
        }
        Ok(InboundFrame::Control(ControlFrame::Pong { .. })) => Ok(()),
        Err(e) => {
            tracing::warn!(client = client_id, error = %e, "WS: malformed frame");
            let reply = EventRecord::new(
                SystemError {
                    message: format!("malformed frame: {e}"),
                },
                SERVER_SOURCE,
            )
            .with_priority(Priority::High);
            send_json(socket, &reply).await
        }
    }
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
async fn send_json<T: serde::Serialize>(
    socket: &mut WebSocket,
    value: &T,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(value).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}
