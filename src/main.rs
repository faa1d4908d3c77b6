use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use prank_call_orchestrator::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter("info")
        .init();

    info!("starting prank call orchestrator");

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("database migrations applied");

    let store: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool));
    let telephony: Arc<dyn TelephonyAdapter> = Arc::new(TelnyxAdapter::new(
        config.telnyx_api_key.clone(),
        config.telnyx_connection_id.clone(),
        config.audio_url.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        store,
        telephony,
        config.max_call_duration_seconds,
    ));

    let app = create_router(orchestrator, config.telnyx_number.clone());

    let addr = config.bind_addr.parse::<std::net::SocketAddr>()?;
    info!(%addr, "listening");
    println!("\nEndpoints:");
    println!("  POST /webhooks/telnyx    - provider webhook sink");
    println!("  POST /dev/start-prank    - {{sender_phone, recipient_phone}} -> {{session_id}}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
