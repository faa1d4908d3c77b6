//! Error types shared across the orchestrator.

use thiserror::Error;

/// Errors raised by the session service, orchestrator, and webhook ingress.
#[derive(Debug, Error)]
pub enum PrankError {
    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: String, to: String },

    #[error("precondition not met: {0}")]
    InvalidPrecondition(String),

    #[error("invalid leg: {0}")]
    InvalidLeg(String),

    #[error("session not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("unexpected event for session {session_id} in state {state}: {event}")]
    UnexpectedEvent {
        session_id: uuid::Uuid,
        state: String,
        event: String,
    },

    #[error("telephony provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PrankError {
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn invalid_precondition(msg: impl Into<String>) -> Self {
        Self::InvalidPrecondition(msg.into())
    }

    pub fn invalid_leg(msg: impl Into<String>) -> Self {
        Self::InvalidLeg(msg.into())
    }
}

/// Errors raised by the telephony adapter when talking to the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{operation} failed for leg {leg}: provider returned {status}: {body}")]
    BadResponse {
        operation: &'static str,
        leg: String,
        status: u16,
        body: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, PrankError>;
