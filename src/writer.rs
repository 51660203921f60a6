//! Reconciliation Writer (C6, §4.6).
//!
//! Applies a scraped dossier to the store: deletes the bounded slice the scope covers,
//! inserts the dossier's rows in its place, and updates the player's `external_id` /
//! `last_updated`, all inside one transaction. Never partially writes (§4.5, §7).

use chrono::Utc;
use sqlx::PgPool;

use crate::error::EngineError;
use crate::models::PlayerDossier;
use crate::orchestrator::SeasonScope;

#[derive(Debug, Clone, Default)]
pub struct WriteReport {
    pub competition_stats_written: usize,
    pub goalkeeper_stats_written: usize,
    pub matches_written: usize,
}

/// Which row families a write touches. `SyncMatchlogs` (C8) only refreshes match logs,
/// leaving stat rows in place even though the dossier's stat fields are left empty.
#[derive(Debug, Clone, Copy)]
pub struct ReplaceScope {
    pub stats: bool,
    pub matches: bool,
}

impl ReplaceScope {
    pub fn all() -> Self {
        ReplaceScope { stats: true, matches: true }
    }

    pub fn matches_only() -> Self {
        ReplaceScope { stats: false, matches: true }
    }
}

/// Applies `dossier` for `player_id` within `scope`, deleting the scoped slice and
/// inserting the dossier's rows, all in a single transaction (§4.6).
pub async fn write(
    pool: &PgPool,
    player_id: i64,
    dossier: &PlayerDossier,
    scope: &SeasonScope,
    replace: ReplaceScope,
) -> Result<WriteReport, EngineError> {
    let mut tx = pool.begin().await.map_err(|e| EngineError::Write { source: e.into() })?;

    for season in scope.seasons() {
        if replace.stats {
            for variant in season.variants() {
                sqlx::query("DELETE FROM competition_stats WHERE player_id = $1 AND season = $2")
                    .bind(player_id)
                    .bind(&variant)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| EngineError::Write { source: e.into() })?;
                sqlx::query("DELETE FROM goalkeeper_stats WHERE player_id = $1 AND season = $2")
                    .bind(player_id)
                    .bind(&variant)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| EngineError::Write { source: e.into() })?;
            }
        }

        if replace.matches {
            let (start, end) = season.date_range();
            sqlx::query("DELETE FROM player_matches WHERE player_id = $1 AND match_date BETWEEN $2 AND $3")
                .bind(player_id)
                .bind(start)
                .bind(end)
                .execute(&mut *tx)
                .await
                .map_err(|e| EngineError::Write { source: e.into() })?;
        }
    }

    // Defend against source-side repetition even though the orchestrator already
    // deduplicates matches; stat rows are deduplicated by (season, competition_type,
    // competition_name) here too (I1/P1).
    let mut seen_competition = std::collections::HashSet::new();
    let mut competition_stats_written = 0usize;
    for stat in &dossier.competition_stats {
        let key = (stat.season.clone(), stat.competition_type, stat.competition_name.clone());
        if !seen_competition.insert(key) {
            continue;
        }
        sqlx::query(
            r#"
            INSERT INTO competition_stats
                (player_id, season, competition_type, competition_name, games, games_starts,
                 minutes, goals, assists, xg, npxg, xa, penalty_goals, shots, shots_on_target,
                 yellow_cards, red_cards)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(player_id)
        .bind(&stat.season)
        .bind(stat.competition_type)
        .bind(&stat.competition_name)
        .bind(stat.games)
        .bind(stat.games_starts)
        .bind(stat.minutes)
        .bind(stat.goals)
        .bind(stat.assists)
        .bind(stat.xg)
        .bind(stat.npxg)
        .bind(stat.xa)
        .bind(stat.penalty_goals)
        .bind(stat.shots)
        .bind(stat.shots_on_target)
        .bind(stat.yellow_cards)
        .bind(stat.red_cards)
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Write { source: e.into() })?;
        competition_stats_written += 1;
    }

    let mut seen_goalkeeper = std::collections::HashSet::new();
    let mut goalkeeper_stats_written = 0usize;
    for stat in &dossier.goalkeeper_stats {
        let key = (stat.season.clone(), stat.competition_type, stat.competition_name.clone());
        if !seen_goalkeeper.insert(key) {
            continue;
        }
        sqlx::query(
            r#"
            INSERT INTO goalkeeper_stats
                (player_id, season, competition_type, competition_name, games, games_starts,
                 minutes, goals_against, goals_against_per90, shots_on_target_against, saves,
                 save_percentage, clean_sheets, clean_sheet_percentage, wins, draws, losses,
                 penalties_attempted, penalties_allowed, penalties_saved, penalties_missed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21)
            "#,
        )
        .bind(player_id)
        .bind(&stat.season)
        .bind(stat.competition_type)
        .bind(&stat.competition_name)
        .bind(stat.games)
        .bind(stat.games_starts)
        .bind(stat.minutes)
        .bind(stat.goals_against)
        .bind(stat.goals_against_per90)
        .bind(stat.shots_on_target_against)
        .bind(stat.saves)
        .bind(stat.save_percentage)
        .bind(stat.clean_sheets)
        .bind(stat.clean_sheet_percentage)
        .bind(stat.wins)
        .bind(stat.draws)
        .bind(stat.losses)
        .bind(stat.penalties_attempted)
        .bind(stat.penalties_allowed)
        .bind(stat.penalties_saved)
        .bind(stat.penalties_missed)
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Write { source: e.into() })?;
        goalkeeper_stats_written += 1;
    }

    let mut seen_matches = std::collections::HashSet::new();
    let mut matches_written = 0usize;
    for m in &dossier.matches {
        let key = (m.match_date, m.competition.clone(), m.opponent.clone());
        if !seen_matches.insert(key) {
            continue;
        }
        sqlx::query(
            r#"
            INSERT INTO player_matches
                (player_id, match_date, competition, opponent, round, venue, result,
                 minutes_played, goals, assists, shots, shots_on_target, xg, xa,
                 passes_completed, passes_attempted, pass_completion_pct, key_passes, tackles,
                 interceptions, blocks, touches, dribbles_completed, carries, fouls_committed,
                 fouls_drawn, yellow_cards, red_cards)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)
            "#,
        )
        .bind(player_id)
        .bind(m.match_date)
        .bind(&m.competition)
        .bind(&m.opponent)
        .bind(&m.round)
        .bind(&m.venue)
        .bind(&m.result)
        .bind(m.minutes_played)
        .bind(m.goals)
        .bind(m.assists)
        .bind(m.shots)
        .bind(m.shots_on_target)
        .bind(m.xg)
        .bind(m.xa)
        .bind(m.passes_completed)
        .bind(m.passes_attempted)
        .bind(m.pass_completion_pct)
        .bind(m.key_passes)
        .bind(m.tackles)
        .bind(m.interceptions)
        .bind(m.blocks)
        .bind(m.touches)
        .bind(m.dribbles_completed)
        .bind(m.carries)
        .bind(m.fouls_committed)
        .bind(m.fouls_drawn)
        .bind(m.yellow_cards)
        .bind(m.red_cards)
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Write { source: e.into() })?;
        matches_written += 1;
    }

    if let Some(external_id) = &dossier.external_id {
        sqlx::query("UPDATE players SET external_id = $1, last_updated = $2 WHERE id = $3")
            .bind(external_id)
            .bind(Utc::now().date_naive())
            .bind(player_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| EngineError::Write { source: e.into() })?;
    } else {
        sqlx::query("UPDATE players SET last_updated = $1 WHERE id = $2")
            .bind(Utc::now().date_naive())
            .bind(player_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| EngineError::Write { source: e.into() })?;
    }

    tx.commit().await.map_err(|e| EngineError::Write { source: e.into() })?;

    Ok(WriteReport { competition_stats_written, goalkeeper_stats_written, matches_written })
}

/// Advances Postgres sequences past the highest allocated id, needed after a bulk
/// replacement that may have bypassed default id generation for some rows
/// (§4.6 "reseedSequences hook"). A no-op when the table is empty.
pub async fn reseed_sequences(pool: &PgPool) -> Result<(), EngineError> {
    for (table, sequence) in [
        ("competition_stats", "competition_stats_id_seq"),
        ("goalkeeper_stats", "goalkeeper_stats_id_seq"),
        ("player_matches", "player_matches_id_seq"),
        ("players", "players_id_seq"),
    ] {
        let query = format!(
            "SELECT setval('{sequence}', COALESCE((SELECT MAX(id) FROM {table}), 1))"
        );
        sqlx::query(&query)
            .execute(pool)
            .await
            .map_err(|e| EngineError::Write { source: e.into() })?;
    }
    Ok(())
}
