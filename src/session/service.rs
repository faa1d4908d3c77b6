//! Guards every mutation of a [`PrankSession`]: the only component allowed
//! to write through to the [`SessionStore`].

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::model::{Leg, PrankSession, SessionState};
use super::store::SessionStore;
use crate::error::{PrankError, Result};

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        sender_number: String,
        recipient_number: String,
    ) -> Result<PrankSession> {
        let now = Utc::now();
        let session = PrankSession {
            id: Uuid::new_v4(),
            sender_number,
            recipient_number,
            sender_call_control_id: None,
            recipient_call_control_id: None,
            state: SessionState::Created,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&session).await?;
        tracing::info!(session_id = %session.id, "session created");
        Ok(session)
    }

    #[instrument(skip(self))]
    pub async fn get_session(&self, id: Uuid) -> Result<PrankSession> {
        self.store.get(id).await?.ok_or(PrankError::NotFound(id))
    }

    /// Applies the forward-only transition graph. `Failed` is reachable from
    /// any non-terminal state; every other target must be the unique
    /// successor of the current state. Entry into `Bridged`, `PlayingAudio`,
    /// or `Completed` additionally requires both leg handles to be set.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn transition_state(
        &self,
        session: &mut PrankSession,
        new_state: SessionState,
    ) -> Result<()> {
        let current = session.state;

        if current.is_terminal() {
            return Err(PrankError::invalid_transition(
                current.as_str(),
                new_state.as_str(),
            ));
        }

        if new_state != SessionState::Failed {
            match current.allowed_successor() {
                Some(expected) if expected == new_state => {}
                _ => {
                    return Err(PrankError::invalid_transition(
                        current.as_str(),
                        new_state.as_str(),
                    ))
                }
            }
        }

        if new_state.requires_both_legs()
            && (session.sender_call_control_id.is_none()
                || session.recipient_call_control_id.is_none())
        {
            return Err(PrankError::invalid_precondition(format!(
                "cannot transition to {} without both call control IDs set",
                new_state.as_str()
            )));
        }

        session.state = new_state;
        session.updated_at = Utc::now();
        self.store.update(session).await?;
        tracing::info!(
            session_id = %session.id,
            from = current.as_str(),
            to = new_state.as_str(),
            "state transition"
        );
        Ok(())
    }

    /// Writes exactly one leg handle. `leg` is a closed enum, so the
    /// "unknown leg tag" failure mode the original service guarded against
    /// is unrepresentable here rather than checked.
    #[instrument(skip(self, session, call_control_id), fields(session_id = %session.id))]
    pub async fn set_call_control_id(
        &self,
        session: &mut PrankSession,
        leg: Leg,
        call_control_id: String,
    ) -> Result<()> {
        match leg {
            Leg::Sender => session.sender_call_control_id = Some(call_control_id),
            Leg::Recipient => session.recipient_call_control_id = Some(call_control_id),
        }
        session.updated_at = Utc::now();
        self.store.update(session).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    #[derive(Default)]
    struct InMemoryStore {
        rows: Mutex<HashMap<Uuid, PrankSession>>,
    }

    #[async_trait]
    impl SessionStore for InMemoryStore {
        async fn insert(&self, session: &PrankSession) -> Result<()> {
            self.rows.lock().unwrap().insert(session.id, session.clone());
            Ok(())
        }

        async fn get(&self, id: Uuid) -> Result<Option<PrankSession>> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn update(&self, session: &PrankSession) -> Result<()> {
            self.rows.lock().unwrap().insert(session.id, session.clone());
            Ok(())
        }
    }

    fn service() -> SessionService {
        SessionService::new(Arc::new(InMemoryStore::default()))
    }

    fn bare_session(state: SessionState) -> PrankSession {
        let now = Utc::now();
        PrankSession {
            id: Uuid::new_v4(),
            sender_number: "+1111".into(),
            recipient_number: "+2222".into(),
            sender_call_control_id: None,
            recipient_call_control_id: None,
            state,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn valid_forward_transitions_succeed() {
        let svc = service();
        let mut session = bare_session(SessionState::Created);
        svc.transition_state(&mut session, SessionState::CallingSender)
            .await
            .unwrap();
        assert_eq!(session.state, SessionState::CallingSender);

        svc.transition_state(&mut session, SessionState::CallingRecipient)
            .await
            .unwrap();
        assert_eq!(session.state, SessionState::CallingRecipient);
    }

    #[tokio::test]
    async fn skipping_a_state_is_rejected() {
        let svc = service();
        let mut session = bare_session(SessionState::CallingSender);
        let err = svc
            .transition_state(&mut session, SessionState::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, PrankError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn backward_transition_is_rejected() {
        let svc = service();
        let mut session = bare_session(SessionState::PlayingAudio);
        session.sender_call_control_id = Some("s".into());
        session.recipient_call_control_id = Some("r".into());
        let err = svc
            .transition_state(&mut session, SessionState::Bridged)
            .await
            .unwrap_err();
        assert!(matches!(err, PrankError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn failed_is_allowed_from_any_non_terminal_state() {
        for state in [
            SessionState::CallingSender,
            SessionState::CallingRecipient,
            SessionState::Bridged,
            SessionState::PlayingAudio,
        ] {
            let svc = service();
            let mut session = bare_session(state);
            svc.transition_state(&mut session, SessionState::Failed)
                .await
                .unwrap();
            assert_eq!(session.state, SessionState::Failed);
        }
    }

    #[tokio::test]
    async fn failed_is_blocked_from_completed() {
        let svc = service();
        let mut session = bare_session(SessionState::Completed);
        let err = svc
            .transition_state(&mut session, SessionState::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, PrankError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn terminal_states_block_any_forward_transition() {
        let svc = service();
        let mut session = bare_session(SessionState::Failed);
        let err = svc
            .transition_state(&mut session, SessionState::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, PrankError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn bridged_playing_completed_require_both_call_ids() {
        let cases = [
            (SessionState::CallingRecipient, SessionState::Bridged),
            (SessionState::Bridged, SessionState::PlayingAudio),
            (SessionState::PlayingAudio, SessionState::Completed),
        ];
        for (from, to) in cases {
            let svc = service();
            let mut session = bare_session(from);
            let err = svc.transition_state(&mut session, to).await.unwrap_err();
            assert!(matches!(err, PrankError::InvalidPrecondition(_)));
        }
    }

    #[tokio::test]
    async fn set_call_control_id_writes_the_right_leg() {
        let svc = service();
        let mut session = bare_session(SessionState::CallingSender);
        svc.set_call_control_id(&mut session, Leg::Sender, "s-ccid".into())
            .await
            .unwrap();
        assert_eq!(session.sender_call_control_id.as_deref(), Some("s-ccid"));
        assert_eq!(session.recipient_call_control_id, None);
    }
}
