//! Per-session background task that forcibly ends a call after
//! `MAX_CALL_DURATION_SECONDS` if it is still active.
//!
//! Runs detached from the request that spawned it — it owns its own
//! [`SessionService`] rather than sharing the caller's, since it can
//! outlive the HTTP request entirely. Every fallible step here is matched
//! and logged rather than propagated: a panic would be contained by the
//! task boundary regardless, but nothing in this function can panic, so the
//! "never propagate" requirement falls out of ordinary error handling.

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;
use uuid::Uuid;

use crate::session::{SessionService, SessionState};
use crate::telephony::TelephonyAdapter;

#[instrument(skip(telephony, service))]
pub async fn run(
    session_id: Uuid,
    sender_call_control_id: String,
    recipient_call_control_id: String,
    duration_seconds: u64,
    telephony: Arc<dyn TelephonyAdapter>,
    service: SessionService,
) {
    tokio::time::sleep(Duration::from_secs(duration_seconds)).await;

    for leg_id in [&sender_call_control_id, &recipient_call_control_id] {
        if let Err(e) = telephony.hangup_leg(leg_id).await {
            tracing::warn!(session_id = %session_id, leg_id, error = %e, "timeout hangup failed, continuing");
        }
    }

    let mut session = match service.get_session(session_id).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "timeout worker could not reload session");
            return;
        }
    };

    if session.state != SessionState::PlayingAudio {
        tracing::debug!(session_id = %session_id, state = session.state.as_str(), "timeout fired but session already left PLAYING_AUDIO, skipping");
        return;
    }

    if let Err(e) = service
        .transition_state(&mut session, SessionState::Completed)
        .await
    {
        tracing::warn!(session_id = %session_id, error = %e, "timeout worker failed to complete session");
    }
}
