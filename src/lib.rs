//! # Prank Call Orchestrator
//!
//! Coordinates a two-leg "prank call" through a third-party telephony
//! provider's webhook protocol: dial a sender, dial a recipient using the
//! sender's own number as caller ID, bridge the two legs, play a
//! pre-recorded audio resource into the bridge, and tear the call down on
//! hangup, failure, or after a configured maximum duration.
//!
//! The system is organized the way the orchestration is described:
//!
//! - [`session`]: the durable [`session::PrankSession`] entity, the
//!   transition-graph-enforcing [`session::SessionService`], and the
//!   [`session::SessionStore`] persistence boundary.
//! - [`telephony`]: the outbound [`telephony::TelephonyAdapter`] contract and
//!   its Telnyx Call Control realization.
//! - [`orchestrator`]: the event dispatch table driving the state machine.
//! - [`timeout_worker`]: the per-session forced-hangup background task.
//! - [`webhook`]: the HTTP ingress that normalizes provider notifications
//!   and the operator's `/dev/start-prank` endpoint.
//! - [`config`]: environment-sourced process configuration.
//! - [`error`]: the crate-wide error taxonomy.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use prank_call_orchestrator::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     tracing_subscriber::fmt().with_env_filter("info").init();
//!
//!     let config = Config::from_env()?;
//!     let pool = sqlx::postgres::PgPoolOptions::new()
//!         .connect(&config.database_url)
//!         .await?;
//!     sqlx::migrate!("./migrations").run(&pool).await?;
//!
//!     let store: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool));
//!     let telephony: Arc<dyn TelephonyAdapter> = Arc::new(TelnyxAdapter::new(
//!         config.telnyx_api_key.clone(),
//!         config.telnyx_connection_id.clone(),
//!         config.audio_url.clone(),
//!     ));
//!     let orchestrator = Arc::new(Orchestrator::new(
//!         store,
//!         telephony,
//!         config.max_call_duration_seconds,
//!     ));
//!
//!     let app = create_router(orchestrator, config.telnyx_number.clone());
//!     let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod telephony;
pub mod timeout_worker;
pub mod webhook;

pub use config::Config;
pub use error::{PrankError, ProviderError, Result};
pub use orchestrator::{EventType, Orchestrator};
pub use webhook::create_router;

/// Convenience re-exports for binaries wiring the crate together.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{PrankError, ProviderError, Result};
    pub use crate::orchestrator::{EventType, Orchestrator};
    pub use crate::session::{Leg, PgSessionStore, PrankSession, SessionService, SessionState, SessionStore};
    pub use crate::telephony::{TelephonyAdapter, TelnyxAdapter};
    pub use crate::webhook::create_router;
}
