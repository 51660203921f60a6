//! Backfill Engine (C7, §4.7).
//!
//! Repairs stat rows where the source site's standard/playing-time tables under-report
//! `minutes` (most commonly `minutes = 0 AND games > 0`) using the match log as ground
//! truth. Read-mostly on `player_matches`, update-only on `competition_stats` /
//! `goalkeeper_stats`.

use sqlx::PgPool;

use crate::competition_map::same_competition;
use crate::error::EngineError;
use crate::models::PlayerMatch;
use crate::season::Season;

/// Rows eligible for a minutes backfill: `minutes = 0 AND games > 0` (§4.7).
async fn needs_backfill_competition(pool: &PgPool, player_id: i64) -> Result<Vec<(i64, String, String)>, EngineError> {
    let rows = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, season, competition_name FROM competition_stats
         WHERE player_id = $1 AND minutes = 0 AND games > 0",
    )
    .bind(player_id)
    .fetch_all(pool)
    .await
    .map_err(|e| EngineError::Backfill { player_id, reason: e.to_string() })?;
    Ok(rows)
}

async fn needs_backfill_goalkeeper(pool: &PgPool, player_id: i64) -> Result<Vec<(i64, String, String)>, EngineError> {
    let rows = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, season, competition_name FROM goalkeeper_stats
         WHERE player_id = $1 AND minutes = 0 AND games > 0",
    )
    .bind(player_id)
    .fetch_all(pool)
    .await
    .map_err(|e| EngineError::Backfill { player_id, reason: e.to_string() })?;
    Ok(rows)
}

/// Sums `minutes_played` across matches within `window` whose competition label
/// canonicalizes to the same competition as `competition_name` (§4.7 step 2-3).
fn sum_minutes(matches: &[PlayerMatch], competition_name: &str, window: (chrono::NaiveDate, chrono::NaiveDate)) -> i32 {
    matches
        .iter()
        .filter(|m| m.match_date >= window.0 && m.match_date <= window.1)
        .filter(|m| same_competition(&m.competition, competition_name))
        .map(|m| m.minutes_played)
        .sum()
}

/// Backfills every eligible row for one player, given that player's full match list
/// (fetched once and reused across every row to avoid a query per row).
pub async fn backfill_player(
    pool: &PgPool,
    player_id: i64,
    is_goalkeeper: bool,
    is_national_team: fn(&str) -> bool,
    matches: &[PlayerMatch],
) -> Result<u32, EngineError> {
    let candidates = if is_goalkeeper {
        needs_backfill_goalkeeper(pool, player_id).await?
    } else {
        needs_backfill_competition(pool, player_id).await?
    };

    let mut repaired = 0u32;
    for (id, season_label, competition_name) in candidates {
        let season = Season::parse(&season_label, is_national_team(&season_label)).map_err(|e| {
            EngineError::Backfill { player_id, reason: format!("unparseable season '{season_label}': {e}") }
        })?;
        let window = season.date_range();
        let summed = sum_minutes(matches, &competition_name, window);
        if summed <= 0 {
            continue;
        }

        let table = if is_goalkeeper { "goalkeeper_stats" } else { "competition_stats" };
        let query = format!("UPDATE {table} SET minutes = $1 WHERE id = $2");
        sqlx::query(&query)
            .bind(summed)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| EngineError::Backfill { player_id, reason: e.to_string() })?;
        repaired += 1;
    }

    Ok(repaired)
}
