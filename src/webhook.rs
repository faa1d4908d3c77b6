//! Validates, normalizes, and dispatches provider webhook notifications, and
//! exposes the operator's dev endpoint for kicking off a prank session.
//!
//! The webhook handler is a hard boundary: it always answers HTTP 200. A
//! malformed envelope, an unknown event name, an undecodable `client_state`,
//! or an orchestrator error are all logged and acknowledged rather than
//! surfaced, so the provider never retries a delivery the core has already
//! seen.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::orchestrator::{EventType, Orchestrator};
use crate::session::{Leg, SessionState};
use crate::telephony::decode_client_state;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Caller-ID the provider dials the sender leg from in `/dev/start-prank`.
    pub telnyx_number: String,
}

pub fn create_router(orchestrator: Arc<Orchestrator>, telnyx_number: String) -> Router {
    Router::new()
        .route("/webhooks/telnyx", post(telnyx_webhook))
        .route("/dev/start-prank", post(start_prank))
        .with_state(AppState {
            orchestrator,
            telnyx_number,
        })
}

#[derive(Debug, Deserialize)]
struct TelnyxEnvelope {
    data: TelnyxEventData,
}

#[derive(Debug, Deserialize)]
struct TelnyxEventData {
    event_type: String,
    payload: TelnyxPayload,
}

#[derive(Debug, Deserialize)]
struct TelnyxPayload {
    call_control_id: Option<String>,
    client_state: Option<String>,
}

#[derive(Debug, Serialize)]
struct WebhookAck {
    status: &'static str,
}

fn ok() -> Json<WebhookAck> {
    Json(WebhookAck { status: "ok" })
}

fn ignored() -> Json<WebhookAck> {
    Json(WebhookAck { status: "ignored" })
}

fn map_event_type(provider_event: &str) -> Option<EventType> {
    match provider_event {
        "call.answered" => Some(EventType::LegAnswered),
        "call.hangup" => Some(EventType::LegHangup),
        "call.failed" => Some(EventType::LegFailed),
        _ => None,
    }
}

async fn telnyx_webhook(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let envelope: TelnyxEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(error = %e, "malformed webhook envelope, ignoring");
            return ignored();
        }
    };

    let Some(event_type) = map_event_type(&envelope.data.event_type) else {
        tracing::debug!(event_type = %envelope.data.event_type, "unknown webhook event, ignoring");
        return ignored();
    };

    let Some(client_state) = envelope.data.payload.client_state else {
        tracing::debug!("webhook missing client_state, ignoring");
        return ignored();
    };

    let Some((session_id, leg)) = decode_client_state(&client_state) else {
        tracing::warn!("failed to decode client_state, ignoring");
        return ignored();
    };

    let leg_id = envelope.data.payload.call_control_id;

    match state
        .orchestrator
        .handle_event(session_id, event_type, leg.as_str(), leg_id)
        .await
    {
        Ok(()) => ok(),
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "event handling failed, acknowledging anyway");
            ignored()
        }
    }
}

#[derive(Debug, Deserialize)]
struct StartPrankRequest {
    sender_phone: String,
    recipient_phone: String,
}

#[derive(Debug, Serialize)]
struct StartPrankResponse {
    session_id: Uuid,
}

async fn start_prank(
    State(state): State<AppState>,
    Json(req): Json<StartPrankRequest>,
) -> Result<Json<StartPrankResponse>, (StatusCode, String)> {
    let service = state.orchestrator.session_service();

    let mut session = service
        .create_session(req.sender_phone, req.recipient_phone)
        .await
        .map_err(internal_error)?;

    service
        .transition_state(&mut session, SessionState::CallingSender)
        .await
        .map_err(internal_error)?;

    state
        .orchestrator
        .telephony()
        .create_outbound_call(
            &session.sender_number,
            &state.telnyx_number,
            session.id,
            Leg::Sender,
        )
        .await
        .map_err(|e| internal_error(e.into()))?;

    Ok(Json(StartPrankResponse {
        session_id: session.id,
    }))
}

fn internal_error(e: crate::error::PrankError) -> (StatusCode, String) {
    tracing::error!(error = %e, "dev/start-prank failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
