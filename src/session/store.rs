//! Durable persistence of [`PrankSession`] rows.
//!
//! `PgSessionStore` is the only [`SessionStore`] backend: it talks to the
//! Postgres schema in `migrations/`. Tests exercise the session service and
//! orchestrator against a hand-rolled in-memory fake behind the same trait
//! instead of a real database.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::model::{PrankSession, SessionState};
use crate::error::{PrankError, Result};

/// Storage boundary for prank sessions. Exists so the Session Service can be
/// exercised against an in-memory backend in tests without a live Postgres
/// instance.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &PrankSession) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<PrankSession>>;
    async fn update(&self, session: &PrankSession) -> Result<()>;
}

/// Postgres-backed store. Talks to the `prank_sessions` table created by
/// `migrations/0001_create_prank_sessions.sql`.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::postgres::PgRow) -> Result<PrankSession> {
        let state_str: String = row.try_get("state")?;
        let state = SessionState::from_str(&state_str).ok_or_else(|| {
            PrankError::Database(sqlx::Error::Decode(
                format!("unknown session state in row: {state_str}").into(),
            ))
        })?;

        Ok(PrankSession {
            id: row.try_get("id")?,
            sender_number: row.try_get("sender_number")?,
            recipient_number: row.try_get("recipient_number")?,
            sender_call_control_id: row.try_get("sender_call_control_id")?,
            recipient_call_control_id: row.try_get("recipient_call_control_id")?,
            state,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &PrankSession) -> Result<()> {
        sqlx::query(
            "INSERT INTO prank_sessions
                (id, sender_number, recipient_number, state, created_at, updated_at)
             VALUES ($1, $2, $3, $4::pranksessionstate, $5, $6)",
        )
        .bind(session.id)
        .bind(&session.sender_number)
        .bind(&session.recipient_number)
        .bind(session.state.as_str())
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PrankSession>> {
        let row = sqlx::query(
            "SELECT id, sender_number, recipient_number, sender_call_control_id,
                    recipient_call_control_id, state::text AS state, created_at, updated_at
             FROM prank_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::from_row).transpose()
    }

    async fn update(&self, session: &PrankSession) -> Result<()> {
        sqlx::query(
            "UPDATE prank_sessions
             SET sender_call_control_id = $1,
                 recipient_call_control_id = $2,
                 state = $3::pranksessionstate,
                 updated_at = $4
             WHERE id = $5",
        )
        .bind(&session.sender_call_control_id)
        .bind(&session.recipient_call_control_id)
        .bind(session.state.as_str())
        .bind(session.updated_at)
        .bind(session.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
