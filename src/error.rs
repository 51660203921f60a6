use thiserror::Error;

/// Error taxonomy for the ingestion engine (§7).
///
/// Every leaf error a component can raise is tagged here so the scheduler can decide,
/// without inspecting strings, whether a failure aborts a player (most variants) or the
/// whole process (`Config`).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        transient: bool,
        #[source]
        source: anyhow::Error,
    },

    #[error("parse failed: {reason}")]
    Parse { reason: String },

    #[error("could not resolve player on source site: {query}")]
    Lookup { query: String },

    #[error("write failed: {source}")]
    Write {
        #[source]
        source: anyhow::Error,
    },

    #[error("backfill failed for player {player_id}: {reason}")]
    Backfill { player_id: i64, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn fetch_transient(url: impl Into<String>, source: anyhow::Error) -> Self {
        EngineError::Fetch { url: url.into(), transient: true, source }
    }

    pub fn fetch_permanent(url: impl Into<String>, source: anyhow::Error) -> Self {
        EngineError::Fetch { url: url.into(), transient: false, source }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Fetch { transient: true, .. })
    }
}

/// An error together with the player it happened to, as it propagates out of the
/// orchestrator (§4.5 "Failure modes").
#[derive(Debug, Error)]
#[error("player {player_id} ({player_name}): {source}")]
pub struct PlayerError {
    pub player_id: i64,
    pub player_name: String,
    #[source]
    pub source: EngineError,
}

pub type EngineResult<T> = Result<T, EngineError>;
