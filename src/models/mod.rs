use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Competition class a stat/match row belongs to (I3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompetitionType {
    League,
    DomesticCup,
    EuropeanCup,
    NationalTeam,
}

impl CompetitionType {
    pub fn is_national_team(&self) -> bool {
        matches!(self, CompetitionType::NationalTeam)
    }
}

impl std::fmt::Display for CompetitionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompetitionType::League => "LEAGUE",
            CompetitionType::DomesticCup => "DOMESTIC_CUP",
            CompetitionType::EuropeanCup => "EUROPEAN_CUP",
            CompetitionType::NationalTeam => "NATIONAL_TEAM",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CompetitionType {
    type Err = crate::error::EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LEAGUE" => Ok(CompetitionType::League),
            "DOMESTIC_CUP" => Ok(CompetitionType::DomesticCup),
            "EUROPEAN_CUP" => Ok(CompetitionType::EuropeanCup),
            "NATIONAL_TEAM" => Ok(CompetitionType::NationalTeam),
            other => {
                Err(crate::error::EngineError::Parse { reason: format!("unknown competition_type '{other}'") })
            }
        }
    }
}

/// E1 — Player.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub team: String,
    pub league: String,
    pub position: String,
    pub nationality: String,
    pub is_goalkeeper: bool,
    pub external_id: Option<String>,
    pub last_updated: Option<NaiveDate>,
}

/// E2 — CompetitionStat. One row per (player, season, competition_type, competition_name).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompetitionStat {
    pub id: i64,
    pub player_id: i64,
    pub season: String,
    pub competition_type: CompetitionType,
    pub competition_name: String,
    pub games: i32,
    pub games_starts: i32,
    pub minutes: i32,
    pub goals: i32,
    pub assists: i32,
    pub xg: f64,
    pub npxg: f64,
    pub xa: f64,
    pub penalty_goals: Option<i32>,
    pub shots: i32,
    pub shots_on_target: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
}

/// E3 — GoalkeeperStat. Same uniqueness rule as E2, disjoint column set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GoalkeeperStat {
    pub id: i64,
    pub player_id: i64,
    pub season: String,
    pub competition_type: CompetitionType,
    pub competition_name: String,
    pub games: i32,
    pub games_starts: i32,
    pub minutes: i32,
    pub goals_against: i32,
    pub goals_against_per90: f64,
    pub shots_on_target_against: i32,
    pub saves: i32,
    pub save_percentage: f64,
    pub clean_sheets: i32,
    pub clean_sheet_percentage: f64,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub penalties_attempted: i32,
    pub penalties_allowed: i32,
    pub penalties_saved: i32,
    pub penalties_missed: i32,
}

/// E4 — PlayerMatch. One row per (player, match_date, competition, opponent).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlayerMatch {
    pub id: i64,
    pub player_id: i64,
    pub match_date: NaiveDate,
    pub competition: String,
    pub opponent: String,
    pub round: Option<String>,
    pub venue: String, // "Home" | "Away"
    pub result: Option<String>,
    pub minutes_played: i32,
    pub goals: i32,
    pub assists: i32,
    pub shots: i32,
    pub shots_on_target: i32,
    pub xg: f64,
    pub xa: f64,
    pub passes_completed: i32,
    pub passes_attempted: i32,
    pub pass_completion_pct: Option<f64>,
    pub key_passes: i32,
    pub tackles: i32,
    pub interceptions: i32,
    pub blocks: i32,
    pub touches: i32,
    pub dribbles_completed: i32,
    pub carries: i32,
    pub fouls_committed: i32,
    pub fouls_drawn: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
}

/// E5 — SyncReport. Ephemeral; built by the scheduler and handed to the notifier (C9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub job_kind: JobKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub failures: Vec<PlayerFailure>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    Stats,
    Matchlogs,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Stats => write!(f, "stats"),
            JobKind::Matchlogs => write!(f, "matchlogs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerFailure {
    pub player_id: i64,
    pub player_name: String,
    pub reason: String,
}

/// The in-memory artifact the orchestrator (C5) hands to the writer (C6). Not yet classified
/// rows would be a merger bug — by the time a dossier exists, classification has already run.
#[derive(Debug, Clone, Default)]
pub struct PlayerDossier {
    pub external_id: Option<String>,
    pub competition_stats: Vec<CompetitionStat>,
    pub goalkeeper_stats: Vec<GoalkeeperStat>,
    pub matches: Vec<PlayerMatch>,
}

/// Uniform API response envelope; every handler wraps its payload in this.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError { code: code.to_string(), message: message.into() }),
        }
    }
}
