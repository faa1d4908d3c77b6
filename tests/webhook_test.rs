//! End-to-end exercise of the webhook ingress and dev endpoint against an
//! in-memory store and a recording telephony fake, with no real HTTP
//! connections and no real provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use prank_call_orchestrator::error::{ProviderError, Result as PrankResult};
use prank_call_orchestrator::orchestrator::Orchestrator;
use prank_call_orchestrator::session::{Leg, PrankSession, SessionStore};
use prank_call_orchestrator::telephony::TelephonyAdapter;
use prank_call_orchestrator::webhook::create_router;

#[derive(Default)]
struct InMemoryStore {
    rows: Mutex<HashMap<Uuid, PrankSession>>,
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn insert(&self, session: &PrankSession) -> PrankResult<()> {
        self.rows.lock().unwrap().insert(session.id, session.clone());
        Ok(())
    }
    async fn get(&self, id: Uuid) -> PrankResult<Option<PrankSession>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }
    async fn update(&self, session: &PrankSession) -> PrankResult<()> {
        self.rows.lock().unwrap().insert(session.id, session.clone());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingAdapter {
    created: Mutex<Vec<(String, String)>>,
    bridged: Mutex<Vec<(String, String)>>,
    played: Mutex<Vec<String>>,
}

#[async_trait]
impl TelephonyAdapter for RecordingAdapter {
    async fn create_outbound_call(
        &self,
        to: &str,
        from: &str,
        _session_id: Uuid,
        _leg: Leg,
    ) -> Result<(), ProviderError> {
        self.created.lock().unwrap().push((to.to_string(), from.to_string()));
        Ok(())
    }
    async fn bridge_legs(&self, primary: &str, secondary: &str) -> Result<(), ProviderError> {
        self.bridged.lock().unwrap().push((primary.to_string(), secondary.to_string()));
        Ok(())
    }
    async fn start_playback(&self, leg_id: &str) -> Result<(), ProviderError> {
        self.played.lock().unwrap().push(leg_id.to_string());
        Ok(())
    }
    async fn hangup_leg(&self, _leg_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

fn client_state(session_id: Uuid, leg: &str) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    STANDARD.encode(json!({ "session_id": session_id, "leg": leg }).to_string())
}

fn webhook_body(event_type: &str, call_control_id: &str, client_state: &str) -> Body {
    Body::from(
        json!({
            "data": {
                "event_type": event_type,
                "payload": {
                    "call_control_id": call_control_id,
                    "client_state": client_state,
                },
            },
        })
        .to_string(),
    )
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn happy_path_bridges_and_plays_then_completes_on_hangup() {
    let store: Arc<dyn SessionStore> = Arc::new(InMemoryStore::default());
    let adapter = Arc::new(RecordingAdapter::default());
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), adapter.clone(), 60));
    let app = create_router(orchestrator.clone(), "+10000".to_string());

    let start_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/dev/start-prank")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"sender_phone": "+1111", "recipient_phone": "+2222"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(start_response.status(), StatusCode::OK);
    let body = json_body(start_response).await;
    let session_id: Uuid = body["session_id"].as_str().unwrap().parse().unwrap();

    let session = orchestrator.session_service().get_session(session_id).await.unwrap();
    assert_eq!(session.state.as_str(), "CALLING_SENDER");

    let sender_answered = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/telnyx")
                .header("content-type", "application/json")
                .body(webhook_body(
                    "call.answered",
                    "s-ccid",
                    &client_state(session_id, "sender"),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(sender_answered.status(), StatusCode::OK);
    assert_eq!(json_body(sender_answered).await["status"], "ok");

    let recipient_answered = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/telnyx")
                .header("content-type", "application/json")
                .body(webhook_body(
                    "call.answered",
                    "r-ccid",
                    &client_state(session_id, "recipient"),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(recipient_answered.status(), StatusCode::OK);

    let session = orchestrator.session_service().get_session(session_id).await.unwrap();
    assert_eq!(session.state.as_str(), "PLAYING_AUDIO");
    assert_eq!(adapter.bridged.lock().unwrap().len(), 1);
    assert_eq!(adapter.played.lock().unwrap().len(), 1);

    let hangup = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/telnyx")
                .header("content-type", "application/json")
                .body(webhook_body(
                    "call.hangup",
                    "s-ccid",
                    &client_state(session_id, "sender"),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(hangup.status(), StatusCode::OK);

    let session = orchestrator.session_service().get_session(session_id).await.unwrap();
    assert_eq!(session.state.as_str(), "COMPLETED");
}

#[tokio::test]
async fn terminal_session_events_always_ack_200_and_never_mutate() {
    let store: Arc<dyn SessionStore> = Arc::new(InMemoryStore::default());
    let adapter = Arc::new(RecordingAdapter::default());
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), adapter, 60));

    let mut session = orchestrator
        .session_service()
        .create_session("+1111".into(), "+2222".into())
        .await
        .unwrap();
    session.sender_call_control_id = Some("s".into());
    session.recipient_call_control_id = Some("r".into());
    for target in [
        prank_call_orchestrator::session::SessionState::CallingSender,
        prank_call_orchestrator::session::SessionState::CallingRecipient,
        prank_call_orchestrator::session::SessionState::Bridged,
        prank_call_orchestrator::session::SessionState::PlayingAudio,
        prank_call_orchestrator::session::SessionState::Completed,
    ] {
        orchestrator
            .session_service()
            .transition_state(&mut session, target)
            .await
            .unwrap();
    }
    assert_eq!(session.state.as_str(), "COMPLETED");
    let before = orchestrator.session_service().get_session(session.id).await.unwrap();

    let app = create_router(orchestrator.clone(), "+10000".to_string());
    for (event, leg) in [
        ("call.hangup", "sender"),
        ("call.failed", "recipient"),
        ("call.answered", "sender"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/telnyx")
                    .header("content-type", "application/json")
                    .body(webhook_body(event, "whatever", &client_state(session.id, leg)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let after = orchestrator.session_service().get_session(session.id).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn malformed_webhook_body_is_acknowledged_not_errored() {
    let store: Arc<dyn SessionStore> = Arc::new(InMemoryStore::default());
    let adapter = Arc::new(RecordingAdapter::default());
    let orchestrator = Arc::new(Orchestrator::new(store, adapter, 60));
    let app = create_router(orchestrator, "+10000".to_string());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/telnyx")
                .header("content-type", "application/json")
                .body(Body::from("not json at all"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ignored");
}
