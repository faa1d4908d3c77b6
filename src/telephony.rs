//! Speaks the telephony provider's call-control protocol. Stateless; every
//! operation is a single outbound HTTP request with no retries — partial
//! failure is recovered by the orchestrator's state machine, never by
//! resending.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ProviderError;
use crate::session::Leg;

const BASE_URL: &str = "https://api.telnyx.com/v2";

/// Opaque per-leg correlation state handed to `CreateOutboundCall` and
/// echoed back by the provider on every subsequent webhook for that leg.
#[derive(Serialize)]
struct ClientState {
    session_id: Uuid,
    leg: &'static str,
}

/// Encodes `(session_id, leg)` into the blob the provider round-trips.
pub fn encode_client_state(session_id: Uuid, leg: Leg) -> String {
    let payload = ClientState {
        session_id,
        leg: leg.as_str(),
    };
    STANDARD.encode(serde_json::to_vec(&payload).expect("ClientState always serializes"))
}

/// Decodes a `client_state` blob back into `(session_id, leg)`. Malformed
/// input is a caller-visible error; the webhook ingress logs and ignores it
/// rather than propagating.
pub fn decode_client_state(blob: &str) -> Option<(Uuid, Leg)> {
    let bytes = STANDARD.decode(blob).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let session_id = Uuid::parse_str(value.get("session_id")?.as_str()?).ok()?;
    let leg = Leg::parse(value.get("leg")?.as_str()?)?;
    Some((session_id, leg))
}

/// Outbound adapter contract. A trait so tests can substitute a recording
/// fake instead of talking to a real provider.
#[async_trait]
pub trait TelephonyAdapter: Send + Sync {
    async fn create_outbound_call(
        &self,
        to: &str,
        from: &str,
        session_id: Uuid,
        leg: Leg,
    ) -> Result<(), ProviderError>;

    async fn bridge_legs(&self, primary: &str, secondary: &str) -> Result<(), ProviderError>;

    async fn start_playback(&self, leg_id: &str) -> Result<(), ProviderError>;

    async fn hangup_leg(&self, leg_id: &str) -> Result<(), ProviderError>;
}

/// Production adapter for Telnyx Call Control.
pub struct TelnyxAdapter {
    client: reqwest::Client,
    api_key: String,
    connection_id: String,
    audio_url: String,
}

impl TelnyxAdapter {
    pub fn new(api_key: String, connection_id: String, audio_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_key,
            connection_id,
            audio_url,
        }
    }

    async fn post(
        &self,
        operation: &'static str,
        leg: &str,
        path: &str,
        body: serde_json::Value,
    ) -> Result<(), ProviderError> {
        let response = self
            .client
            .post(format!("{BASE_URL}{path}"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::BadResponse {
                operation,
                leg: leg.to_string(),
                status,
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TelephonyAdapter for TelnyxAdapter {
    async fn create_outbound_call(
        &self,
        to: &str,
        from: &str,
        session_id: Uuid,
        leg: Leg,
    ) -> Result<(), ProviderError> {
        let client_state = encode_client_state(session_id, leg);
        self.post(
            "create_outbound_call",
            leg.as_str(),
            "/calls",
            json!({
                "to": to,
                "from": from,
                "connection_id": self.connection_id,
                "client_state": client_state,
            }),
        )
        .await
    }

    async fn bridge_legs(&self, primary: &str, secondary: &str) -> Result<(), ProviderError> {
        self.post(
            "bridge_legs",
            primary,
            &format!("/calls/{primary}/actions/bridge"),
            json!({ "call_control_id": secondary }),
        )
        .await
    }

    async fn start_playback(&self, leg_id: &str) -> Result<(), ProviderError> {
        self.post(
            "start_playback",
            leg_id,
            &format!("/calls/{leg_id}/actions/playback_start"),
            json!({ "audio_url": self.audio_url }),
        )
        .await
    }

    async fn hangup_leg(&self, leg_id: &str) -> Result<(), ProviderError> {
        self.post(
            "hangup_leg",
            leg_id,
            &format!("/calls/{leg_id}/actions/hangup"),
            json!({}),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_state_round_trips() {
        let session_id = Uuid::new_v4();
        let blob = encode_client_state(session_id, Leg::Recipient);
        let (decoded_id, decoded_leg) = decode_client_state(&blob).unwrap();
        assert_eq!(decoded_id, session_id);
        assert_eq!(decoded_leg, Leg::Recipient);
    }

    #[test]
    fn malformed_client_state_decodes_to_none() {
        assert!(decode_client_state("not base64 json").is_none());
        assert!(decode_client_state(&STANDARD.encode("{}")).is_none());
    }
}
