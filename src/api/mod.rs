//! Read API (C10, §4.10, §6.1).
//!
//! Stateless HTTP surface over the store. Every handler opens its own short-lived
//! connection from the pool; there is no shared mutable state between handlers
//! (§4.10 "Concurrency").

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db;
use crate::models::{ApiResponse, CompetitionStat, GoalkeeperStat, Player, PlayerMatch};
use crate::scheduler;
use crate::season::Season;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub started_at: chrono::DateTime<Utc>,
    pub scheduler_enabled: bool,
    pub scheduler_timezone: chrono_tz::Tz,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(root))
        .route("/api/players/", get(list_players))
        .route("/api/players/{id}", get(get_player))
        .route("/api/players/stats/competition", get(all_competition_stats))
        .route("/api/players/stats/goalkeeper", get(all_goalkeeper_stats))
        .route("/api/players/stats/matches", get(all_matches))
        .route("/api/matchlogs/{player_id}", get(matchlogs_for_player))
        .route("/api/matchlogs/{player_id}/stats", get(matchlog_stats_for_player))
        .route("/api/matchlogs/match/{match_id}", get(one_match))
        .route("/api/comparison/players/{id}/stats", get(player_season_stats))
        .route("/api/comparison/compare", get(compare_players))
        .route("/api/comparison/available-stats", get(available_stats))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(Arc::new(state))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: chrono::DateTime<Utc>,
    scheduler_running: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        scheduler_running: state.scheduler_enabled,
    }))
}

#[derive(Serialize)]
struct SchedulerNextRun {
    job: &'static str,
    next_run_at: chrono::DateTime<Utc>,
}

#[derive(Serialize)]
struct MetaResponse {
    name: &'static str,
    version: &'static str,
    uptime_seconds: i64,
    scheduler_enabled: bool,
    scheduler_next_runs: Vec<SchedulerNextRun>,
}

/// API metadata, including scheduler next-run times when the scheduler is enabled
/// (§6.1 "GET / — API metadata including scheduler next-run times").
async fn root(State(state): State<Arc<AppState>>) -> Json<ApiResponse<MetaResponse>> {
    let scheduler_next_runs = if state.scheduler_enabled {
        scheduler::next_run_times(state.scheduler_timezone)
            .into_iter()
            .map(|(job, next_run_at)| SchedulerNextRun { job, next_run_at })
            .collect()
    } else {
        Vec::new()
    };

    Json(ApiResponse::success(MetaResponse {
        name: "player-tracker-backend",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        scheduler_enabled: state.scheduler_enabled,
        scheduler_next_runs,
    }))
}

async fn list_players(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Player>>>, StatusCode> {
    let players = db::list_players(&state.pool).await.map_err(internal_error)?;
    Ok(Json(ApiResponse::success(players)))
}

async fn get_player(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Player>>, StatusCode> {
    match db::get_player(&state.pool, id).await.map_err(internal_error)? {
        Some(player) => Ok(Json(ApiResponse::success(player))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn all_competition_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CompetitionStat>>>, StatusCode> {
    let rows = sqlx::query_as::<_, CompetitionStat>("SELECT * FROM competition_stats")
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(ApiResponse::success(rows.into_iter().map(coerce_penalty_goals).collect())))
}

async fn all_goalkeeper_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<GoalkeeperStat>>>, StatusCode> {
    let rows = sqlx::query_as::<_, GoalkeeperStat>("SELECT * FROM goalkeeper_stats")
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn all_matches(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<PlayerMatch>>>, StatusCode> {
    let rows = sqlx::query_as::<_, PlayerMatch>("SELECT * FROM player_matches")
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(ApiResponse::success(rows)))
}

#[derive(Deserialize)]
struct MatchlogQuery {
    season: Option<String>,
    competition: Option<String>,
    limit: Option<i64>,
}

/// Season filtering here is a date-range filter, never a string filter (P8, §6.1).
async fn matchlogs_for_player(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<i64>,
    Query(query): Query<MatchlogQuery>,
) -> Result<Json<ApiResponse<Vec<PlayerMatch>>>, StatusCode> {
    let limit = query.limit.unwrap_or(100);

    let (season_start, season_end) = match &query.season {
        Some(season_label) => {
            let is_national_team = season_label.len() == 4 && season_label.chars().all(|c| c.is_ascii_digit());
            let season = Season::parse(season_label, is_national_team).map_err(|_| StatusCode::BAD_REQUEST)?;
            let (start, end) = season.date_range();
            (Some(start), Some(end))
        }
        None => (None, None),
    };

    let rows = db::matches_for_player(
        &state.pool,
        player_id,
        season_start,
        season_end,
        query.competition.as_deref(),
        limit,
    )
    .await
    .map_err(internal_error)?;

    Ok(Json(ApiResponse::success(rows)))
}

#[derive(Serialize, Default)]
struct MatchlogSummary {
    matches: i64,
    minutes: i64,
    goals: i64,
    assists: i64,
}

async fn matchlog_stats_for_player(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<i64>,
    Query(query): Query<MatchlogQuery>,
) -> Result<Json<ApiResponse<MatchlogSummary>>, StatusCode> {
    let limit = query.limit.unwrap_or(i64::MAX);

    let (season_start, season_end) = match &query.season {
        Some(season_label) => {
            let is_national_team = season_label.len() == 4 && season_label.chars().all(|c| c.is_ascii_digit());
            let season = Season::parse(season_label, is_national_team).map_err(|_| StatusCode::BAD_REQUEST)?;
            let (start, end) = season.date_range();
            (Some(start), Some(end))
        }
        None => (None, None),
    };

    let rows = db::matches_for_player(
        &state.pool,
        player_id,
        season_start,
        season_end,
        query.competition.as_deref(),
        limit,
    )
    .await
    .map_err(internal_error)?;

    let summary = MatchlogSummary {
        matches: rows.len() as i64,
        minutes: rows.iter().map(|m| m.minutes_played as i64).sum(),
        goals: rows.iter().map(|m| m.goals as i64).sum(),
        assists: rows.iter().map(|m| m.assists as i64).sum(),
    };
    Ok(Json(ApiResponse::success(summary)))
}

async fn one_match(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<i64>,
) -> Result<Json<ApiResponse<PlayerMatch>>, StatusCode> {
    let row = sqlx::query_as::<_, PlayerMatch>("SELECT * FROM player_matches WHERE id = $1")
        .bind(match_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    match row {
        Some(m) => Ok(Json(ApiResponse::success(m))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

#[derive(Serialize, Default, Clone)]
pub struct SeasonAggregate {
    pub games: i32,
    pub games_starts: i32,
    pub minutes: i32,
    pub goals: i32,
    pub assists: i32,
    pub xg: f64,
    pub npxg: f64,
    pub xa: f64,
    pub penalty_goals: i32,
    pub competitions: Vec<String>,
}

/// Goalkeepers carry a disjoint column set (E3); the comparison/season-total endpoints
/// need their own shape rather than forcing zeros into `SeasonAggregate`'s field-player
/// columns (§3 E3, P9).
#[derive(Serialize, Default, Clone)]
pub struct GoalkeeperSeasonAggregate {
    pub games: i32,
    pub games_starts: i32,
    pub minutes: i32,
    pub goals_against: i32,
    pub saves: i32,
    pub save_percentage: f64,
    pub clean_sheets: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub competitions: Vec<String>,
}

/// Dispatches on `Player::is_goalkeeper` since goalkeeper rows live in `goalkeeper_stats`,
/// never `competition_stats` (I1).
#[derive(Serialize, Clone)]
#[serde(untagged)]
pub enum SeasonStats {
    Field(SeasonAggregate),
    Goalkeeper(GoalkeeperSeasonAggregate),
}

#[derive(Deserialize)]
struct SeasonQuery {
    season: Option<String>,
}

/// Sums E2 rows whose `season` matches the full set of acceptable variants for the
/// requested season, never substring matching (§6.1 "Aggregation semantics").
async fn season_aggregate(pool: &PgPool, player_id: i64, season_label: &str) -> Result<SeasonAggregate, StatusCode> {
    let is_national_team = season_label.len() == 4 && season_label.chars().all(|c| c.is_ascii_digit());
    let season = Season::parse(season_label, is_national_team).map_err(|_| StatusCode::BAD_REQUEST)?;
    let variants = season.read_aggregate_variants();

    let stats = db::competition_stats_for_player(pool, player_id).await.map_err(internal_error)?;
    let mut aggregate = SeasonAggregate::default();
    for stat in stats.iter().filter(|s| variants.contains(&s.season)) {
        aggregate.games += stat.games;
        aggregate.games_starts += stat.games_starts;
        aggregate.minutes += stat.minutes;
        aggregate.goals += stat.goals;
        aggregate.assists += stat.assists;
        aggregate.xg += stat.xg;
        aggregate.npxg += stat.npxg;
        aggregate.xa += stat.xa;
        aggregate.penalty_goals += stat.penalty_goals.unwrap_or(0);
        aggregate.competitions.push(stat.competition_name.clone());
    }
    Ok(aggregate)
}

/// Same aggregation rule as `season_aggregate`, over E3 rows (§6.1).
async fn goalkeeper_season_aggregate(
    pool: &PgPool,
    player_id: i64,
    season_label: &str,
) -> Result<GoalkeeperSeasonAggregate, StatusCode> {
    let is_national_team = season_label.len() == 4 && season_label.chars().all(|c| c.is_ascii_digit());
    let season = Season::parse(season_label, is_national_team).map_err(|_| StatusCode::BAD_REQUEST)?;
    let variants = season.read_aggregate_variants();

    let stats = db::goalkeeper_stats_for_player(pool, player_id).await.map_err(internal_error)?;
    let mut aggregate = GoalkeeperSeasonAggregate::default();
    for stat in stats.iter().filter(|s| variants.contains(&s.season)) {
        aggregate.games += stat.games;
        aggregate.games_starts += stat.games_starts;
        aggregate.minutes += stat.minutes;
        aggregate.goals_against += stat.goals_against;
        aggregate.saves += stat.saves;
        aggregate.clean_sheets += stat.clean_sheets;
        aggregate.wins += stat.wins;
        aggregate.draws += stat.draws;
        aggregate.losses += stat.losses;
        aggregate.competitions.push(stat.competition_name.clone());
    }
    if aggregate.minutes > 0 {
        aggregate.save_percentage = (aggregate.saves as f64
            / (aggregate.saves as f64 + aggregate.goals_against as f64).max(1.0))
            * 100.0;
    }
    Ok(aggregate)
}

async fn season_stats_for(pool: &PgPool, player: &Player, season_label: &str) -> Result<SeasonStats, StatusCode> {
    if player.is_goalkeeper {
        Ok(SeasonStats::Goalkeeper(goalkeeper_season_aggregate(pool, player.id, season_label).await?))
    } else {
        Ok(SeasonStats::Field(season_aggregate(pool, player.id, season_label).await?))
    }
}

async fn player_season_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<ApiResponse<SeasonStats>>, StatusCode> {
    let player = db::get_player(&state.pool, id).await.map_err(internal_error)?.ok_or(StatusCode::NOT_FOUND)?;
    let season_label = query.season.unwrap_or_else(|| Season::current().canonical());
    let stats = season_stats_for(&state.pool, &player, &season_label).await?;
    Ok(Json(ApiResponse::success(stats)))
}

#[derive(Deserialize)]
struct CompareQuery {
    player1_id: i64,
    player2_id: i64,
    season: Option<String>,
}

#[derive(Serialize)]
struct CompareResponse {
    player1: Player,
    player2: Player,
    season: String,
    player1_stats: SeasonStats,
    player2_stats: SeasonStats,
}

/// Rejects mixed GK/field-player comparison with 400 before touching aggregate data
/// (P9, §6.1 "Contract").
async fn compare_players(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<ApiResponse<CompareResponse>>, StatusCode> {
    let player1 = db::get_player(&state.pool, query.player1_id).await.map_err(internal_error)?.ok_or(StatusCode::NOT_FOUND)?;
    let player2 = db::get_player(&state.pool, query.player2_id).await.map_err(internal_error)?.ok_or(StatusCode::NOT_FOUND)?;

    if player1.is_goalkeeper != player2.is_goalkeeper {
        return Err(StatusCode::BAD_REQUEST);
    }

    let season_label = query.season.unwrap_or_else(|| Season::current().canonical());
    let player1_stats = season_stats_for(&state.pool, &player1, &season_label).await?;
    let player2_stats = season_stats_for(&state.pool, &player2, &season_label).await?;

    Ok(Json(ApiResponse::success(CompareResponse {
        player1,
        player2,
        season: season_label,
        player1_stats,
        player2_stats,
    })))
}

#[derive(Deserialize)]
struct AvailableStatsQuery {
    player_type: Option<String>,
}

#[derive(Serialize)]
struct StatDescriptor {
    key: &'static str,
    label: &'static str,
}

async fn available_stats(
    Query(query): Query<AvailableStatsQuery>,
) -> Json<ApiResponse<Vec<StatDescriptor>>> {
    let is_goalkeeper = query.player_type.as_deref() == Some("goalkeeper");
    let descriptors = if is_goalkeeper {
        vec![
            StatDescriptor { key: "saves", label: "Saves" },
            StatDescriptor { key: "clean_sheets", label: "Clean sheets" },
            StatDescriptor { key: "goals_against", label: "Goals against" },
            StatDescriptor { key: "save_percentage", label: "Save %" },
        ]
    } else {
        vec![
            StatDescriptor { key: "goals", label: "Goals" },
            StatDescriptor { key: "assists", label: "Assists" },
            StatDescriptor { key: "xg", label: "Expected goals" },
            StatDescriptor { key: "xa", label: "Expected assists" },
            StatDescriptor { key: "minutes", label: "Minutes" },
        ]
    };
    Json(ApiResponse::success(descriptors))
}

/// `penalty_goals` is nullable in storage but coerced to 0 in API responses
/// (§6.1 "Penalty-goal semantics").
fn coerce_penalty_goals(mut stat: CompetitionStat) -> CompetitionStat {
    if stat.penalty_goals.is_none() {
        stat.penalty_goals = Some(0);
    }
    stat
}

fn internal_error(err: crate::error::EngineError) -> StatusCode {
    tracing::error!(error = %err, "internal error serving request");
    StatusCode::INTERNAL_SERVER_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn insert_player(pool: &PgPool, name: &str, is_goalkeeper: bool) -> Player {
        sqlx::query_as::<_, Player>(
            "INSERT INTO players (name, team, league, position, nationality, is_goalkeeper)
             VALUES ($1, 'Test FC', 'Test League', 'GK', 'ES', $2) RETURNING *",
        )
        .bind(name)
        .bind(is_goalkeeper)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    /// A goalkeeper's season totals must come from `goalkeeper_stats`, never the
    /// field-player `competition_stats` table (the bug this dispatch exists to avoid).
    #[sqlx::test(migrations = "./migrations")]
    async fn season_stats_for_dispatches_goalkeepers_to_their_own_table(pool: PgPool) {
        let keeper = insert_player(&pool, "Keeper", true).await;
        sqlx::query(
            "INSERT INTO goalkeeper_stats
                (player_id, season, competition_type, competition_name, games, games_starts,
                 minutes, goals_against, saves, clean_sheets, wins, draws, losses)
             VALUES ($1, $2, 'LEAGUE', 'La Liga', 10, 10, 900, 8, 40, 4, 6, 2, 2)",
        )
        .bind(keeper.id)
        .bind(Season::current().canonical())
        .execute(&pool)
        .await
        .unwrap();

        let stats = season_stats_for(&pool, &keeper, &Season::current().canonical()).await.unwrap();
        match stats {
            SeasonStats::Goalkeeper(gk) => {
                assert_eq!(gk.games, 10);
                assert_eq!(gk.saves, 40);
                assert_eq!(gk.clean_sheets, 4);
            }
            SeasonStats::Field(_) => panic!("goalkeeper must aggregate from goalkeeper_stats"),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn season_stats_for_field_player_uses_competition_stats(pool: PgPool) {
        let striker = insert_player(&pool, "Striker", false).await;
        sqlx::query(
            "INSERT INTO competition_stats
                (player_id, season, competition_type, competition_name, games, games_starts,
                 minutes, goals, assists)
             VALUES ($1, $2, 'LEAGUE', 'La Liga', 10, 9, 810, 7, 3)",
        )
        .bind(striker.id)
        .bind(Season::current().canonical())
        .execute(&pool)
        .await
        .unwrap();

        let stats = season_stats_for(&pool, &striker, &Season::current().canonical()).await.unwrap();
        match stats {
            SeasonStats::Field(agg) => assert_eq!(agg.goals, 7),
            SeasonStats::Goalkeeper(_) => panic!("field player must aggregate from competition_stats"),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn get_player_returns_not_found_for_missing_id(pool: PgPool) {
        let result = db::get_player(&pool, 999_999).await.unwrap();
        assert!(result.is_none());
    }

    /// Scenario 3 — two `EUROPEAN_CUP` rows under distinct competition names in the same
    /// season both contribute to the season aggregate (§6.1, no separation by label).
    #[sqlx::test(migrations = "./migrations")]
    async fn season_aggregate_sums_across_distinct_competition_names(pool: PgPool) {
        let player = insert_player(&pool, "Forward", false).await;
        let season = Season::current().canonical();
        for (competition_name, goals) in [("UEFA Europa League", 4), ("UEFA Europa Conference League", 2)] {
            sqlx::query(
                "INSERT INTO competition_stats
                    (player_id, season, competition_type, competition_name, games, games_starts,
                     minutes, goals, assists)
                 VALUES ($1, $2, 'EUROPEAN_CUP', $3, 3, 3, 270, $4, 0)",
            )
            .bind(player.id)
            .bind(&season)
            .bind(competition_name)
            .bind(goals)
            .execute(&pool)
            .await
            .unwrap();
        }

        let aggregate = season_aggregate(&pool, player.id, &season).await.unwrap();
        assert_eq!(aggregate.goals, 6);
        assert_eq!(aggregate.competitions.len(), 2);
    }

    /// Scenario 4 — a season-span aggregate must include the player's `NATIONAL_TEAM` row
    /// stored under the bare calendar year, never by substring matching on the span (§6.1,
    /// I4, P8).
    #[sqlx::test(migrations = "./migrations")]
    async fn season_aggregate_includes_national_team_calendar_year_row(pool: PgPool) {
        let player = insert_player(&pool, "Winger", false).await;
        let season = Season::current();

        sqlx::query(
            "INSERT INTO competition_stats
                (player_id, season, competition_type, competition_name, games, games_starts,
                 minutes, goals, assists)
             VALUES ($1, $2, 'LEAGUE', 'La Liga', 20, 18, 1620, 9, 5)",
        )
        .bind(player.id)
        .bind(season.canonical())
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO competition_stats
                (player_id, season, competition_type, competition_name, games, games_starts,
                 minutes, goals, assists)
             VALUES ($1, $2, 'NATIONAL_TEAM', 'World Cup Qualifying', 4, 4, 360, 2, 1)",
        )
        .bind(player.id)
        .bind(season.start_year.to_string())
        .execute(&pool)
        .await
        .unwrap();

        let aggregate = season_aggregate(&pool, player.id, &season.canonical()).await.unwrap();
        assert_eq!(aggregate.goals, 11, "club + national-team rows for the overlapping year must both sum in");
        assert_eq!(aggregate.competitions.len(), 2);

        // A year that only shares a digit with the seasonal span (not an actual variant)
        // must not be pulled in by a naive substring match (P8's string-vs-range distinction
        // restated for the season label itself).
        let unrelated_year = (season.start_year + 1).to_string();
        assert!(!season.variants().contains(&unrelated_year));
    }
}
