//! WebSocket handler for the tracking namespace.
//!
//! DESIGN
//! ======
//! The credential is verified before the upgrade; a rejected handshake gets
//! an HTTP error and never reaches the hub. After the upgrade the connection
//! is admitted and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch to the tracking services
//! - Frames queued by fan-out → forward to the socket
//!
//! Dispatch returns the frames meant for the sender only (errors). Location
//! events always travel through the connection's queue, including ones
//! triggered by this connection's own updates.
//!
//! LIFECYCLE
//! =========
//! 1. Handshake → verify credential (bounded wait)
//! 2. Upgrade → admit → send `connected` with `client_id`
//! 3. Client frames → dispatch; queued events → socket
//! 4. Close or error → remove from registry and every room

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::frame::{ClientFrame, E_INVALID_FRAME, ServerFrame};
use crate::routes::auth::Authenticated;
use crate::services::auth::Identity;
use crate::services::rooms::ClientId;
use crate::services::{location, tracking};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state, identity))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, identity: Identity) {
    let subject = identity.subject.clone();
    let (client_id, mut client_rx) = tracking::admit_client(&state, identity).await;

    let welcome = ServerFrame::Connected { client_id, subject: subject.clone() };
    if send_frame(&mut socket, &welcome).await.is_ok() {
        info!(%client_id, %subject, "ws: client connected");
        serve_connection(&mut socket, &state, client_id, &mut client_rx).await;
    }

    tracking::remove_client(&state, client_id).await;
    info!(%client_id, %subject, "ws: client disconnected");
}

async fn serve_connection(
    socket: &mut WebSocket,
    state: &AppState,
    client_id: ClientId,
    client_rx: &mut mpsc::Receiver<ServerFrame>,
) {
    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for frame in process_inbound_text(state, client_id, text.as_str()).await {
                            if send_frame(socket, &frame).await.is_err() {
                                return;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
async fn process_inbound_text(state: &AppState, client_id: ClientId, text: &str) -> Vec<ServerFrame> {
    let frame = match ClientFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            return vec![ServerFrame::error(E_INVALID_FRAME, format!("invalid frame: {e}"))];
        }
    };

    debug!(%client_id, event = frame.event(), "ws: recv frame");

    let result = match frame {
        ClientFrame::TrackVehicle(target) => tracking::track_vehicle(state, client_id, &target.vehicle_id)
            .await
            .map(|_| ())
            .map_err(|e| ServerFrame::error_from(&e)),
        ClientFrame::StopTracking(target) => tracking::stop_tracking(state, client_id, &target.vehicle_id)
            .await
            .map(|_| ())
            .map_err(|e| ServerFrame::error_from(&e)),
        ClientFrame::UpdateLocation(raw) => location::process_update(state, client_id, &raw.unwrap_or_default())
            .await
            .map(|_| ())
            .map_err(|e| ServerFrame::error_from(&e)),
    };

    match result {
        Ok(()) => Vec::new(),
        Err(err) => vec![err],
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &ServerFrame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };

    if let ServerFrame::Error(body) = frame {
        warn!(code = %body.code, message = %body.message, "ws: send error frame");
    } else {
        debug!(event = frame.event(), "ws: send frame");
    }

    socket.send(Message::Text(json.into())).await.map_err(|e| {
        debug!(error = %e, "ws: send failed");
    })
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
