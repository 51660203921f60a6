//! Exercises the reconciliation writer (C6) against a real Postgres database
//! (one ephemeral database per test, via `#[sqlx::test]`).

use chrono::NaiveDate;
use sqlx::PgPool;

use player_tracker_backend::models::{CompetitionStat, CompetitionType, PlayerDossier, PlayerMatch};
use player_tracker_backend::orchestrator::SeasonScope;
use player_tracker_backend::season::Season;
use player_tracker_backend::writer::{self, ReplaceScope};

async fn insert_player(pool: &PgPool, name: &str, is_goalkeeper: bool) -> i64 {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO players (name, team, league, position, nationality, is_goalkeeper)
         VALUES ($1, 'Test FC', 'Test League', 'FW', 'ES', $2) RETURNING id",
    )
    .bind(name)
    .bind(is_goalkeeper)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

fn stat(season: &str, competition_type: CompetitionType, competition_name: &str, minutes: i32, goals: i32) -> CompetitionStat {
    CompetitionStat {
        id: 0,
        player_id: 0,
        season: season.to_string(),
        competition_type,
        competition_name: competition_name.to_string(),
        games: 1,
        games_starts: 1,
        minutes,
        goals,
        assists: 0,
        xg: 0.0,
        npxg: 0.0,
        xa: 0.0,
        penalty_goals: None,
        shots: 0,
        shots_on_target: 0,
        yellow_cards: 0,
        red_cards: 0,
    }
}

fn sample_match(date: &str, competition: &str, minutes: i32) -> PlayerMatch {
    PlayerMatch {
        id: 0,
        player_id: 0,
        match_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        competition: competition.to_string(),
        opponent: "Opponent".to_string(),
        round: None,
        venue: "Home".to_string(),
        result: None,
        minutes_played: minutes,
        goals: 0,
        assists: 0,
        shots: 0,
        shots_on_target: 0,
        xg: 0.0,
        xa: 0.0,
        passes_completed: 0,
        passes_attempted: 0,
        pass_completion_pct: None,
        key_passes: 0,
        tackles: 0,
        interceptions: 0,
        blocks: 0,
        touches: 0,
        dribbles_completed: 0,
        carries: 0,
        fouls_committed: 0,
        fouls_drawn: 0,
        yellow_cards: 0,
        red_cards: 0,
    }
}

/// Scenario 1 — incremental sync of a striker writes exactly the rows in the dossier,
/// and running the same sync again reproduces the same row count (P6 idempotence).
#[sqlx::test(migrations = "./migrations")]
async fn incremental_sync_is_idempotent(pool: PgPool) {
    let player_id = insert_player(&pool, "Striker", false).await;
    let season = Season::current();
    let scope = SeasonScope::Incremental(season.clone());

    let dossier = PlayerDossier {
        external_id: Some("abc123".to_string()),
        competition_stats: vec![stat(&season.canonical(), CompetitionType::League, "La Liga", 900, 10)],
        goalkeeper_stats: vec![],
        matches: vec![],
    };

    let report = writer::write(&pool, player_id, &dossier, &scope, ReplaceScope::all()).await.unwrap();
    assert_eq!(report.competition_stats_written, 1);

    let report_again = writer::write(&pool, player_id, &dossier, &scope, ReplaceScope::all()).await.unwrap();
    assert_eq!(report_again.competition_stats_written, 1);

    let stored = player_tracker_backend::db::competition_stats_for_player(&pool, player_id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].goals, 10);
}

/// An incremental sync must leave prior seasons' rows untouched (P4) — only the delete
/// scope's own season is replaced.
#[sqlx::test(migrations = "./migrations")]
async fn incremental_sync_preserves_other_seasons(pool: PgPool) {
    let player_id = insert_player(&pool, "Midfielder", false).await;

    let previous_season = Season::seasonal(Season::current().start_year - 1);
    let previous_dossier = PlayerDossier {
        external_id: Some("xyz789".to_string()),
        competition_stats: vec![stat(&previous_season.canonical(), CompetitionType::League, "La Liga", 1800, 5)],
        goalkeeper_stats: vec![],
        matches: vec![],
    };
    writer::write(&pool, player_id, &previous_dossier, &SeasonScope::Incremental(previous_season.clone()), ReplaceScope::all())
        .await
        .unwrap();

    let current_season = Season::current();
    let current_dossier = PlayerDossier {
        external_id: Some("xyz789".to_string()),
        competition_stats: vec![stat(&current_season.canonical(), CompetitionType::League, "La Liga", 450, 2)],
        goalkeeper_stats: vec![],
        matches: vec![],
    };
    writer::write(&pool, player_id, &current_dossier, &SeasonScope::Incremental(current_season), ReplaceScope::all())
        .await
        .unwrap();

    let stored = player_tracker_backend::db::competition_stats_for_player(&pool, player_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().any(|s| s.season == previous_season.canonical() && s.goals == 5));
}

/// Scenario 5 — a `SyncMatchlogs` pass (matches-only replace scope) must not touch
/// previously written stat rows, and re-running it with duplicate source rows must not
/// grow the match table (P2).
#[sqlx::test(migrations = "./migrations")]
async fn matchlogs_only_replace_leaves_stats_untouched_and_dedupes(pool: PgPool) {
    let player_id = insert_player(&pool, "Winger", false).await;
    let season = Season::current();

    let stats_dossier = PlayerDossier {
        external_id: Some("w1".to_string()),
        competition_stats: vec![stat(&season.canonical(), CompetitionType::League, "Premier League", 900, 4)],
        goalkeeper_stats: vec![],
        matches: vec![],
    };
    writer::write(&pool, player_id, &stats_dossier, &SeasonScope::Incremental(season.clone()), ReplaceScope::all())
        .await
        .unwrap();

    let duplicate_match = sample_match("2025-09-10", "Premier League", 90);
    let matchlog_dossier = PlayerDossier {
        external_id: Some("w1".to_string()),
        competition_stats: vec![],
        goalkeeper_stats: vec![],
        matches: vec![duplicate_match.clone(), duplicate_match],
    };
    let report = writer::write(
        &pool,
        player_id,
        &matchlog_dossier,
        &SeasonScope::Incremental(season),
        ReplaceScope::matches_only(),
    )
    .await
    .unwrap();
    assert_eq!(report.matches_written, 1);

    let stats = player_tracker_backend::db::competition_stats_for_player(&pool, player_id).await.unwrap();
    assert_eq!(stats.len(), 1, "SyncMatchlogs must not clear stat rows");

    let matches =
        player_tracker_backend::db::matches_for_player(&pool, player_id, None, None, None, 10).await.unwrap();
    assert_eq!(matches.len(), 1, "duplicate source rows must not create duplicate stored rows");
}

/// A full sync only deletes-then-inserts the seasons named in its resolved scope (I1);
/// a later full sync over a narrower scope must leave the untouched season's row intact.
#[sqlx::test(migrations = "./migrations")]
async fn full_sync_replaces_only_its_resolved_seasons(pool: PgPool) {
    let player_id = insert_player(&pool, "Veteran", false).await;
    let season_a = Season::seasonal(2023);
    let season_b = Season::seasonal(2024);

    let first_pass = PlayerDossier {
        external_id: Some("v1".to_string()),
        competition_stats: vec![
            stat(&season_a.canonical(), CompetitionType::League, "La Liga", 2700, 15),
            stat(&season_b.canonical(), CompetitionType::League, "La Liga", 2000, 8),
        ],
        goalkeeper_stats: vec![],
        matches: vec![],
    };
    writer::write(
        &pool,
        player_id,
        &first_pass,
        &SeasonScope::Full(vec![season_a.clone(), season_b.clone()]),
        ReplaceScope::all(),
    )
    .await
    .unwrap();

    let resynced = PlayerDossier {
        external_id: Some("v1".to_string()),
        competition_stats: vec![stat(&season_a.canonical(), CompetitionType::League, "La Liga", 2700, 16)],
        goalkeeper_stats: vec![],
        matches: vec![],
    };
    writer::write(&pool, player_id, &resynced, &SeasonScope::Full(vec![season_a.clone()]), ReplaceScope::all())
        .await
        .unwrap();

    let stats = player_tracker_backend::db::competition_stats_for_player(&pool, player_id).await.unwrap();
    assert_eq!(stats.len(), 2, "season_b fell outside the second sync's scope and must survive untouched");
    let a = stats.iter().find(|s| s.season == season_a.canonical()).unwrap();
    let b = stats.iter().find(|s| s.season == season_b.canonical()).unwrap();
    assert_eq!(a.goals, 16, "season_a was in scope and should reflect the resync");
    assert_eq!(b.goals, 8, "season_b was outside scope and should be untouched");
}
