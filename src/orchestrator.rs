//! Receives normalized call events and drives the session state machine:
//! chooses the next state, invokes the Telephony Adapter, and spawns the
//! Timeout Worker once a call is bridged and playing audio.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{PrankError, Result};
use crate::session::{Leg, PrankSession, SessionService, SessionState, SessionStore};
use crate::telephony::TelephonyAdapter;
use crate::timeout_worker;

/// A normalized call event, already mapped from the provider's own event
/// names by the Webhook Ingress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    LegAnswered,
    LegFailed,
    LegHangup,
}

/// Drives the state machine for every session. Holds the one
/// process-wide collection of live Timeout Worker handles so spawned tasks
/// are not dropped (and thus cancelled) by the runtime before they fire.
#[derive(Clone)]
pub struct Orchestrator {
    service: SessionService,
    store: Arc<dyn SessionStore>,
    telephony: Arc<dyn TelephonyAdapter>,
    max_call_duration_seconds: u64,
    timeout_workers: Arc<DashMap<Uuid, JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        telephony: Arc<dyn TelephonyAdapter>,
        max_call_duration_seconds: u64,
    ) -> Self {
        Self {
            service: SessionService::new(store.clone()),
            store,
            telephony,
            max_call_duration_seconds,
            timeout_workers: Arc::new(DashMap::new()),
        }
    }

    pub fn session_service(&self) -> &SessionService {
        &self.service
    }

    pub fn telephony(&self) -> &Arc<dyn TelephonyAdapter> {
        &self.telephony
    }

    /// Number of Timeout Workers currently in flight. Exposed for tests and
    /// operational introspection (P5).
    pub fn active_timeout_worker_count(&self) -> usize {
        self.timeout_workers.len()
    }

    /// `leg` is taken as a raw tag, not a [`Leg`], because the spec requires
    /// this validation to happen here, before the session is ever loaded —
    /// unlike every other leg-shaped parameter in this crate it cannot
    /// already be a closed enum at the call boundary.
    #[instrument(skip(self))]
    pub async fn handle_event(
        &self,
        session_id: Uuid,
        event_type: EventType,
        leg: &str,
        leg_id: Option<String>,
    ) -> Result<()> {
        let leg = Leg::parse(leg).ok_or_else(|| PrankError::invalid_leg(leg.to_string()))?;

        let mut session = self.service.get_session(session_id).await?;

        if session.state.is_terminal() {
            tracing::debug!(session_id = %session_id, state = session.state.as_str(), "event ignored, session already terminal");
            return Ok(());
        }

        match session.state {
            SessionState::CallingSender => {
                self.handle_calling_sender(&mut session, event_type, leg, leg_id)
                    .await
            }
            SessionState::CallingRecipient => {
                self.handle_calling_recipient(&mut session, event_type, leg, leg_id)
                    .await
            }
            SessionState::PlayingAudio => {
                self.handle_playing_audio(&mut session, event_type, leg).await
            }
            SessionState::Bridged | SessionState::Created => {
                Err(self.unexpected_event(&session, event_type, leg))
            }
            SessionState::Completed | SessionState::Failed => unreachable!("terminal states handled above"),
        }
    }

    async fn handle_calling_sender(
        &self,
        session: &mut PrankSession,
        event_type: EventType,
        leg: Leg,
        leg_id: Option<String>,
    ) -> Result<()> {
        match (event_type, leg) {
            (EventType::LegAnswered, Leg::Sender) => {
                let call_control_id = leg_id.ok_or_else(|| {
                    PrankError::invalid_precondition("LEG_ANSWERED requires a leg_id")
                })?;
                self.service
                    .set_call_control_id(session, Leg::Sender, call_control_id)
                    .await?;
                self.service
                    .transition_state(session, SessionState::CallingRecipient)
                    .await?;
                self.telephony
                    .create_outbound_call(
                        &session.recipient_number,
                        &session.sender_number,
                        session.id,
                        Leg::Recipient,
                    )
                    .await?;
                Ok(())
            }
            (EventType::LegFailed, Leg::Sender) => {
                self.service
                    .transition_state(session, SessionState::Failed)
                    .await
            }
            _ => Err(self.unexpected_event(session, event_type, leg)),
        }
    }

    async fn handle_calling_recipient(
        &self,
        session: &mut PrankSession,
        event_type: EventType,
        leg: Leg,
        leg_id: Option<String>,
    ) -> Result<()> {
        match (event_type, leg) {
            (EventType::LegAnswered, Leg::Recipient) => {
                let recipient_call_control_id = leg_id.ok_or_else(|| {
                    PrankError::invalid_precondition("LEG_ANSWERED requires a leg_id")
                })?;
                self.service
                    .set_call_control_id(session, Leg::Recipient, recipient_call_control_id.clone())
                    .await?;

                let sender_call_control_id = session
                    .sender_call_control_id
                    .clone()
                    .expect("sender leg is set before a session reaches CALLING_RECIPIENT");

                self.service
                    .transition_state(session, SessionState::Bridged)
                    .await?;

                if let Err(e) = self
                    .telephony
                    .bridge_legs(&sender_call_control_id, &recipient_call_control_id)
                    .await
                {
                    tracing::warn!(session_id = %session.id, error = %e, "bridge failed, failing session");
                    self.service
                        .transition_state(session, SessionState::Failed)
                        .await?;
                    return Ok(());
                }

                self.service
                    .transition_state(session, SessionState::PlayingAudio)
                    .await?;
                self.telephony.start_playback(&sender_call_control_id).await?;

                self.spawn_timeout_worker(
                    session.id,
                    sender_call_control_id,
                    recipient_call_control_id,
                );
                Ok(())
            }
            (EventType::LegFailed, Leg::Recipient) => {
                self.service
                    .transition_state(session, SessionState::Failed)
                    .await
            }
            (EventType::LegHangup, Leg::Sender) => {
                self.service
                    .transition_state(session, SessionState::Failed)
                    .await
            }
            _ => Err(self.unexpected_event(session, event_type, leg)),
        }
    }

    async fn handle_playing_audio(
        &self,
        session: &mut PrankSession,
        event_type: EventType,
        leg: Leg,
    ) -> Result<()> {
        match event_type {
            EventType::LegHangup | EventType::LegFailed => {
                self.service
                    .transition_state(session, SessionState::Completed)
                    .await
            }
            EventType::LegAnswered => Err(self.unexpected_event(session, event_type, leg)),
        }
    }

    fn unexpected_event(&self, session: &PrankSession, event_type: EventType, leg: Leg) -> PrankError {
        PrankError::UnexpectedEvent {
            session_id: session.id,
            state: session.state.as_str().to_string(),
            event: format!("{event_type:?}+leg={}", leg.as_str()),
        }
    }

    fn spawn_timeout_worker(
        &self,
        session_id: Uuid,
        sender_call_control_id: String,
        recipient_call_control_id: String,
    ) {
        let workers = self.timeout_workers.clone();
        let telephony = self.telephony.clone();
        let service = SessionService::new(self.store.clone());
        let duration = self.max_call_duration_seconds;

        let handle = tokio::spawn(async move {
            timeout_worker::run(
                session_id,
                sender_call_control_id,
                recipient_call_control_id,
                duration,
                telephony,
                service,
            )
            .await;
            workers.remove(&session_id);
        });

        self.timeout_workers.insert(session_id, handle);
    }
}
