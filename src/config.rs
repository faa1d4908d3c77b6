//! Process configuration, loaded once at startup from the environment.

use crate::error::PrankError;

/// Runtime configuration for the orchestrator.
///
/// `JWT_SECRET` / `JWT_ALGORITHM` are part of the external auth surface this
/// crate does not implement; they are intentionally not represented here.
#[derive(Debug, Clone)]
pub struct Config {
    pub telnyx_api_key: String,
    pub telnyx_connection_id: String,
    pub telnyx_number: String,
    pub max_call_duration_seconds: u64,
    pub database_url: String,
    pub audio_url: String,
    pub bind_addr: String,
}

impl Config {
    /// Reads and validates every required variable. Fails fast: a missing or
    /// unparseable value means the process should not start.
    pub fn from_env() -> Result<Self, PrankError> {
        let telnyx_api_key = required("TELNYX_API_KEY")?;
        let telnyx_connection_id = required("TELNYX_CONNECTION_ID")?;
        let telnyx_number = required("TELNYX_NUMBER")?;
        let database_url = required("DATABASE_URL")?;

        let max_call_duration_seconds = required("MAX_CALL_DURATION_SECONDS")?
            .parse::<u64>()
            .map_err(|e| {
                PrankError::Config(format!("MAX_CALL_DURATION_SECONDS must be an integer: {e}"))
            })?;

        let audio_url = std::env::var("AUDIO_URL")
            .unwrap_or_else(|_| "https://example.com/prank-audio.mp3".to_string());

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Self {
            telnyx_api_key,
            telnyx_connection_id,
            telnyx_number,
            max_call_duration_seconds,
            database_url,
            audio_url,
            bind_addr,
        })
    }
}

fn required(name: &str) -> Result<String, PrankError> {
    std::env::var(name).map_err(|_| PrankError::Config(format!("{name} is required")))
}
