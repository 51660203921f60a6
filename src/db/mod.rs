//! Storage layer: pool creation, schema setup, and CRUD access for the four entity tables
//! (E1-E4, §3/§6.4).

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::EngineError;
use crate::models::{CompetitionStat, GoalkeeperStat, Player, PlayerMatch};

pub async fn create_pool(database_url: &str) -> Result<PgPool, EngineError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| EngineError::Write { source: e.into() })
}

/// Creates every table and index this crate needs if they are not already present.
/// Safe to call on every startup.
pub async fn init_schema(pool: &PgPool) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            team TEXT NOT NULL,
            league TEXT NOT NULL,
            position TEXT NOT NULL,
            nationality TEXT NOT NULL,
            is_goalkeeper BOOLEAN NOT NULL DEFAULT FALSE,
            external_id TEXT,
            last_updated DATE
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| EngineError::Write { source: e.into() })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS competition_stats (
            id BIGSERIAL PRIMARY KEY,
            player_id BIGINT NOT NULL REFERENCES players(id) ON DELETE CASCADE,
            season TEXT NOT NULL,
            competition_type TEXT NOT NULL,
            competition_name TEXT NOT NULL,
            games INTEGER NOT NULL DEFAULT 0,
            games_starts INTEGER NOT NULL DEFAULT 0,
            minutes INTEGER NOT NULL DEFAULT 0,
            goals INTEGER NOT NULL DEFAULT 0,
            assists INTEGER NOT NULL DEFAULT 0,
            xg DOUBLE PRECISION NOT NULL DEFAULT 0,
            npxg DOUBLE PRECISION NOT NULL DEFAULT 0,
            xa DOUBLE PRECISION NOT NULL DEFAULT 0,
            penalty_goals INTEGER,
            shots INTEGER NOT NULL DEFAULT 0,
            shots_on_target INTEGER NOT NULL DEFAULT 0,
            yellow_cards INTEGER NOT NULL DEFAULT 0,
            red_cards INTEGER NOT NULL DEFAULT 0,
            UNIQUE (player_id, season, competition_type, competition_name)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| EngineError::Write { source: e.into() })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS goalkeeper_stats (
            id BIGSERIAL PRIMARY KEY,
            player_id BIGINT NOT NULL REFERENCES players(id) ON DELETE CASCADE,
            season TEXT NOT NULL,
            competition_type TEXT NOT NULL,
            competition_name TEXT NOT NULL,
            games INTEGER NOT NULL DEFAULT 0,
            games_starts INTEGER NOT NULL DEFAULT 0,
            minutes INTEGER NOT NULL DEFAULT 0,
            goals_against INTEGER NOT NULL DEFAULT 0,
            goals_against_per90 DOUBLE PRECISION NOT NULL DEFAULT 0,
            shots_on_target_against INTEGER NOT NULL DEFAULT 0,
            saves INTEGER NOT NULL DEFAULT 0,
            save_percentage DOUBLE PRECISION NOT NULL DEFAULT 0,
            clean_sheets INTEGER NOT NULL DEFAULT 0,
            clean_sheet_percentage DOUBLE PRECISION NOT NULL DEFAULT 0,
            wins INTEGER NOT NULL DEFAULT 0,
            draws INTEGER NOT NULL DEFAULT 0,
            losses INTEGER NOT NULL DEFAULT 0,
            penalties_attempted INTEGER NOT NULL DEFAULT 0,
            penalties_allowed INTEGER NOT NULL DEFAULT 0,
            penalties_saved INTEGER NOT NULL DEFAULT 0,
            penalties_missed INTEGER NOT NULL DEFAULT 0,
            UNIQUE (player_id, season, competition_type, competition_name)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| EngineError::Write { source: e.into() })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_matches (
            id BIGSERIAL PRIMARY KEY,
            player_id BIGINT NOT NULL REFERENCES players(id) ON DELETE CASCADE,
            match_date DATE NOT NULL,
            competition TEXT NOT NULL,
            opponent TEXT NOT NULL,
            round TEXT,
            venue TEXT NOT NULL,
            result TEXT,
            minutes_played INTEGER NOT NULL DEFAULT 0,
            goals INTEGER NOT NULL DEFAULT 0,
            assists INTEGER NOT NULL DEFAULT 0,
            shots INTEGER NOT NULL DEFAULT 0,
            shots_on_target INTEGER NOT NULL DEFAULT 0,
            xg DOUBLE PRECISION NOT NULL DEFAULT 0,
            xa DOUBLE PRECISION NOT NULL DEFAULT 0,
            passes_completed INTEGER NOT NULL DEFAULT 0,
            passes_attempted INTEGER NOT NULL DEFAULT 0,
            pass_completion_pct DOUBLE PRECISION,
            key_passes INTEGER NOT NULL DEFAULT 0,
            tackles INTEGER NOT NULL DEFAULT 0,
            interceptions INTEGER NOT NULL DEFAULT 0,
            blocks INTEGER NOT NULL DEFAULT 0,
            touches INTEGER NOT NULL DEFAULT 0,
            dribbles_completed INTEGER NOT NULL DEFAULT 0,
            carries INTEGER NOT NULL DEFAULT 0,
            fouls_committed INTEGER NOT NULL DEFAULT 0,
            fouls_drawn INTEGER NOT NULL DEFAULT 0,
            yellow_cards INTEGER NOT NULL DEFAULT 0,
            red_cards INTEGER NOT NULL DEFAULT 0,
            UNIQUE (player_id, match_date, competition, opponent)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| EngineError::Write { source: e.into() })?;

    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_competition_stats_player_season ON competition_stats (player_id, season)",
        "CREATE INDEX IF NOT EXISTS idx_competition_stats_player_type ON competition_stats (player_id, competition_type)",
        "CREATE INDEX IF NOT EXISTS idx_goalkeeper_stats_player_season ON goalkeeper_stats (player_id, season)",
        "CREATE INDEX IF NOT EXISTS idx_goalkeeper_stats_player_type ON goalkeeper_stats (player_id, competition_type)",
        "CREATE INDEX IF NOT EXISTS idx_player_matches_player_date ON player_matches (player_id, match_date)",
        "CREATE INDEX IF NOT EXISTS idx_player_matches_player_competition ON player_matches (player_id, competition)",
    ] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| EngineError::Write { source: e.into() })?;
    }

    Ok(())
}

pub async fn list_players(pool: &PgPool) -> Result<Vec<Player>, EngineError> {
    sqlx::query_as::<_, Player>("SELECT * FROM players ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(|e| EngineError::Write { source: e.into() })
}

pub async fn get_player(pool: &PgPool, player_id: i64) -> Result<Option<Player>, EngineError> {
    sqlx::query_as::<_, Player>("SELECT * FROM players WHERE id = $1")
        .bind(player_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| EngineError::Write { source: e.into() })
}

pub async fn competition_stats_for_player(
    pool: &PgPool,
    player_id: i64,
) -> Result<Vec<CompetitionStat>, EngineError> {
    sqlx::query_as::<_, CompetitionStat>(
        "SELECT * FROM competition_stats WHERE player_id = $1 ORDER BY season DESC",
    )
    .bind(player_id)
    .fetch_all(pool)
    .await
    .map_err(|e| EngineError::Write { source: e.into() })
}

pub async fn goalkeeper_stats_for_player(
    pool: &PgPool,
    player_id: i64,
) -> Result<Vec<GoalkeeperStat>, EngineError> {
    sqlx::query_as::<_, GoalkeeperStat>(
        "SELECT * FROM goalkeeper_stats WHERE player_id = $1 ORDER BY season DESC",
    )
    .bind(player_id)
    .fetch_all(pool)
    .await
    .map_err(|e| EngineError::Write { source: e.into() })
}

/// `season_start`/`season_end` and `competition` are applied as SQL predicates (not
/// retained in memory afterward) so `limit` — itself applied last, via `ORDER BY ... LIMIT`
/// — caps the filtered result set rather than an unfiltered window across every season.
pub async fn matches_for_player(
    pool: &PgPool,
    player_id: i64,
    season_start: Option<chrono::NaiveDate>,
    season_end: Option<chrono::NaiveDate>,
    competition: Option<&str>,
    limit: i64,
) -> Result<Vec<PlayerMatch>, EngineError> {
    sqlx::query_as::<_, PlayerMatch>(
        "SELECT * FROM player_matches
         WHERE player_id = $1
           AND ($2::date IS NULL OR match_date >= $2)
           AND ($3::date IS NULL OR match_date <= $3)
           AND ($4::text IS NULL OR competition ILIKE $4)
         ORDER BY match_date DESC
         LIMIT $5",
    )
    .bind(player_id)
    .bind(season_start)
    .bind(season_end)
    .bind(competition)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| EngineError::Write { source: e.into() })
}
