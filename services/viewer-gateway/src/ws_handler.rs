//! WebSocket handler for real-time updates to browser clients

use crate::AppState;
use adsb_viewer::geo::BoundingBox;
use adsb_viewer::snapshot::Address;
use adsb_viewer::TrackerHandle;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Messages a browser may send
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Viewport {
        #[serde(default)]
        bounds: Option<BoundingBox>,
        #[serde(default)]
        only_in_view: Option<bool>,
    },
    Click {
        #[serde(default)]
        hex: Option<String>,
    },
    DoubleClick {
        hex: String,
    },
    Ping,
}

/// Handle WebSocket upgrade request
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the initial table so no frame falls in between
    let mut broadcast_rx = state.tracker.subscribe();

    info!("New WebSocket client connected");

    // Send the current table and status
    match state.tracker.table().await {
        Ok(table) => {
            let initial_msg = serde_json::json!({
                "type": "initial",
                "table": table,
            });
            if let Ok(json) = serde_json::to_string(&initial_msg) {
                if sender.send(Message::Text(json)).await.is_err() {
                    return;
                }
            }
        }
        Err(e) => {
            error!("Failed to get initial table: {}", e);
            return;
        }
    }

    if let Ok(status) = state.tracker.status().await {
        let status_msg = serde_json::json!({
            "type": "status",
            "status": status,
        });
        if let Ok(json) = serde_json::to_string(&status_msg) {
            if sender.send(Message::Text(json)).await.is_err() {
                return;
            }
        }
    }

    // Spawn task to forward update frames to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("WebSocket client lagged by {} frames", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    });

    // Handle incoming messages from client
    let tracker = state.tracker.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => {
                        if !apply(&tracker, msg).await {
                            break;
                        }
                    }
                    Err(e) => debug!("Ignoring client message {:?}: {}", text, e),
                },
                Ok(Message::Close(_)) => {
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    info!("WebSocket client disconnected");
}

/// Forward one client message to the tracker; false once the tracker is gone
async fn apply(tracker: &TrackerHandle, msg: ClientMessage) -> bool {
    let result = match msg {
        ClientMessage::Viewport {
            bounds,
            only_in_view,
        } => tracker.set_viewport(bounds, only_in_view).await,
        ClientMessage::Click { hex } => {
            let address = hex.as_deref().and_then(Address::parse);
            tracker.click(address).await.map(|_| ())
        }
        ClientMessage::DoubleClick { hex } => match Address::parse(&hex) {
            Some(address) => tracker.double_click(address).await.map(|_| ()),
            None => {
                debug!("Ignoring double click on invalid address {:?}", hex);
                Ok(())
            }
        },
        ClientMessage::Ping => {
            debug!("Client ping");
            Ok(())
        }
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Client request failed: {}", e);
            false
        }
    }
}
