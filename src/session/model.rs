//! The sole durable entity: a two-leg prank session and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A call leg: the sender being pranked-from, or the recipient being pranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Leg {
    Sender,
    Recipient,
}

impl Leg {
    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Sender => "sender",
            Leg::Recipient => "recipient",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sender" => Some(Leg::Sender),
            "recipient" => Some(Leg::Recipient),
            _ => None,
        }
    }
}

/// The session's position in the forward-only transition graph. `Completed`
/// and `Failed` are terminal; there are no outgoing edges from either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Created,
    CallingSender,
    CallingRecipient,
    Bridged,
    PlayingAudio,
    Completed,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "CREATED",
            SessionState::CallingSender => "CALLING_SENDER",
            SessionState::CallingRecipient => "CALLING_RECIPIENT",
            SessionState::Bridged => "BRIDGED",
            SessionState::PlayingAudio => "PLAYING_AUDIO",
            SessionState::Completed => "COMPLETED",
            SessionState::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(SessionState::Created),
            "CALLING_SENDER" => Some(SessionState::CallingSender),
            "CALLING_RECIPIENT" => Some(SessionState::CallingRecipient),
            "BRIDGED" => Some(SessionState::Bridged),
            "PLAYING_AUDIO" => Some(SessionState::PlayingAudio),
            "COMPLETED" => Some(SessionState::Completed),
            "FAILED" => Some(SessionState::Failed),
            _ => None,
        }
    }

    /// True once a session can no longer leave this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }

    /// The single allowed forward successor, if any. `Failed` is reachable
    /// from every non-terminal state and is handled separately by the caller.
    pub fn allowed_successor(&self) -> Option<SessionState> {
        match self {
            SessionState::Created => Some(SessionState::CallingSender),
            SessionState::CallingSender => Some(SessionState::CallingRecipient),
            SessionState::CallingRecipient => Some(SessionState::Bridged),
            SessionState::Bridged => Some(SessionState::PlayingAudio),
            SessionState::PlayingAudio => Some(SessionState::Completed),
            SessionState::Completed | SessionState::Failed => None,
        }
    }

    /// States that require both leg handles to be present before entry.
    pub fn requires_both_legs(&self) -> bool {
        matches!(
            self,
            SessionState::Bridged | SessionState::PlayingAudio | SessionState::Completed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrankSession {
    pub id: Uuid,
    pub sender_number: String,
    pub recipient_number: String,
    pub sender_call_control_id: Option<String>,
    pub recipient_call_control_id: Option<String>,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrankSession {
    pub fn leg_id(&self, leg: Leg) -> Option<&str> {
        match leg {
            Leg::Sender => self.sender_call_control_id.as_deref(),
            Leg::Recipient => self.recipient_call_control_id.as_deref(),
        }
    }
}
