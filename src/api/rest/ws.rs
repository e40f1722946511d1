use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::api::rest::parcels::is_admin;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TrackingFeedQuery {
    pub tracking_id: Option<String>,
}

/// Streams tracking events as they are appended.
///
/// Any signed-in caller may follow one `tracking_id`; the unfiltered feed of
/// every parcel is admin only.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<TrackingFeedQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let tracking_id = query
        .tracking_id
        .map(|tracking_id| tracking_id.trim().to_string())
        .filter(|tracking_id| !tracking_id.is_empty());

    if tracking_id.is_none() && !is_admin(&state, &user.email) {
        warn!(email = %user.email, "unfiltered tracking feed refused");
        return AppError::Forbidden("Forbidden access".to_string()).into_response();
    }

    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_socket(socket, state, tracking_id))
            .into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, tracking_id: Option<String>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.tracking_events_tx.subscribe();

    info!(tracking_id = ?tracking_id, "tracking feed client connected");

    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "tracking feed client lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if tracking_id
                .as_ref()
                .is_some_and(|wanted| wanted != &event.tracking_id)
            {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize tracking event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("tracking feed client disconnected");
}
