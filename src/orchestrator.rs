//! Scrape Orchestrator (C5, §4.5).
//!
//! Coordinates one player's fetch-parse-merge-classify-matchlog pipeline and assembles
//! the `PlayerDossier` the writer (C6) persists. Errors are tagged with the player's
//! identity on the way out (§7 "Within C5, errors abort the dossier and propagate up
//! with the player identity attached").

use std::collections::HashMap;

use crate::classify::classify_section;
use crate::error::{EngineError, PlayerError};
use crate::fetch::Fetcher;
use crate::merge::{merge_section, MergeInputs};
use crate::models::{CompetitionStat, GoalkeeperStat, Player, PlayerDossier, PlayerMatch};
use crate::parse::{self, Row};
use crate::season::{Season, SeasonKind};
use crate::tables::{self, Section};

const SOURCE_BASE: &str = "https://fbref.com";

/// Builds the source site URLs a scrape needs. Kept as free functions rather than a
/// trait since there is exactly one source site in scope (§6.2).
fn main_page_url(external_id: &str) -> String {
    format!("{SOURCE_BASE}/en/players/{external_id}/all_comps/")
}

fn matchlog_page_url(external_id: &str, season: &Season) -> String {
    format!("{SOURCE_BASE}/en/players/{external_id}/matchlogs/{}/", season.canonical())
}

fn search_url(player_name: &str) -> String {
    format!("{SOURCE_BASE}/en/search/search.fcgi?search={}", urlencode(player_name))
}

fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_string() } else { format!("%{:02X}", c as u32) })
        .collect()
}

/// What the caller asked for, before the source has been consulted (§4.5 "Season scope
/// policy"). A full sync can't name its seasons up front — "every season the source
/// exposes" is only known once the main page has been parsed — so it starts as a bare
/// request and resolves into a concrete `SeasonScope` alongside the dossier.
#[derive(Debug, Clone, Copy)]
pub enum ScrapeRequest {
    Incremental,
    Full,
}

/// The concrete scope a scrape actually touched, returned alongside the dossier so the
/// writer (C6) deletes exactly the slice the orchestrator populated.
#[derive(Debug, Clone)]
pub enum SeasonScope {
    Incremental(Season),
    Full(Vec<Season>),
}

impl SeasonScope {
    pub fn incremental_current() -> Self {
        SeasonScope::Incremental(Season::current())
    }

    pub fn seasons(&self) -> Vec<Season> {
        match self {
            SeasonScope::Incremental(s) => vec![s.clone()],
            SeasonScope::Full(seasons) => seasons.clone(),
        }
    }
}

/// Every distinct season referenced by a set of classified rows, each parsed back into a
/// `Season` using its own row's competition_type to pick calendar-year vs seasonal form
/// (I4). Used to derive "every season the source exposes" for a full sync (§4.5).
fn distinct_seasons(competition_stats: &[CompetitionStat], goalkeeper_stats: &[GoalkeeperStat]) -> Vec<Season> {
    let mut seen = std::collections::HashSet::new();
    let mut seasons = Vec::new();

    let mut note = |label: &str, is_national_team: bool| {
        if let Ok(season) = Season::parse(label, is_national_team) {
            let key = (matches!(season.kind, SeasonKind::CalendarYear), season.start_year);
            if seen.insert(key) {
                seasons.push(season);
            }
        }
    };

    for stat in competition_stats {
        note(&stat.season, stat.competition_type.is_national_team());
    }
    for stat in goalkeeper_stats {
        note(&stat.season, stat.competition_type.is_national_team());
    }

    seasons
}

/// Resolves a player's `external_id`, performing a search if it isn't already known
/// (§4.5 step 1).
async fn resolve_external_id(fetcher: &Fetcher, player: &Player) -> Result<String, EngineError> {
    if let Some(id) = &player.external_id {
        return Ok(id.clone());
    }

    let html = fetcher.fetch_page(&search_url(&player.name)).await?;
    extract_external_id_from_search(&html, &player.name)
        .ok_or_else(|| EngineError::Lookup { query: player.name.clone() })
}

/// The search results page links directly to the resolved player page; extraction is a
/// thin wrapper over the parser's table extraction since search hits render as a table
/// of `(name, id)` pairs under a stable id.
fn extract_external_id_from_search(html: &str, player_name: &str) -> Option<String> {
    let rows = parse::parse_tables(html, &["search_results"]).remove("search_results")?;
    for row in rows {
        let candidate_name = row.get("player")?.as_str();
        if candidate_name.eq_ignore_ascii_case(player_name) {
            return row.get("external_id").map(|v| v.as_str().to_string());
        }
    }
    None
}

async fn fetch_section_tables(
    fetcher: &Fetcher,
    external_id: &str,
) -> Result<HashMap<String, Vec<Row>>, EngineError> {
    let url = main_page_url(external_id);
    let html = fetcher.fetch_page(&url).await?;
    let owned_ids = tables::all_table_ids();
    let borrowed: Vec<&str> = owned_ids.iter().map(String::as_str).collect();
    Ok(parse::parse_tables(&html, &borrowed))
}

fn merge_and_classify_section(
    tables: &HashMap<String, Vec<Row>>,
    section: Section,
    is_goalkeeper: bool,
) -> Result<(Vec<CompetitionStat>, Vec<GoalkeeperStat>), EngineError> {
    let empty: Vec<Row> = Vec::new();
    let standard = tables.get(&tables::table_id(tables::KIND_STANDARD, section)).unwrap_or(&empty);
    let shooting = tables.get(&tables::table_id(tables::KIND_SHOOTING, section)).unwrap_or(&empty);
    let playing_time = tables.get(&tables::table_id(tables::KIND_PLAYING_TIME, section)).unwrap_or(&empty);
    let goalkeeper = tables.get(&tables::table_id(tables::KIND_KEEPER, section)).unwrap_or(&empty);

    let merged = merge_section(
        MergeInputs { standard, shooting, playing_time, goalkeeper },
        is_goalkeeper,
    );
    classify_section(&merged, section, is_goalkeeper)
}

fn parse_matchlog_rows(html: &str, player_id: i64) -> Result<Vec<PlayerMatch>, EngineError> {
    let table_id = "matchlogs_all";
    let rows = parse::parse_tables(html, &[table_id]).remove(table_id).unwrap_or_default();

    let mut matches = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(date_cell) = row.get("date") else { continue };
        let match_date = chrono::NaiveDate::parse_from_str(date_cell.as_str(), "%Y-%m-%d")
            .map_err(|_| EngineError::Parse { reason: format!("bad match date '{}'", date_cell.as_str()) })?;

        matches.push(PlayerMatch {
            id: 0,
            player_id,
            match_date,
            competition: row.get("comp").map(|v| v.as_str().to_string()).unwrap_or_default(),
            opponent: row.get("opponent").map(|v| v.as_str().to_string()).unwrap_or_default(),
            round: row.get("round").map(|v| v.as_str().to_string()).filter(|s| !s.is_empty()),
            venue: row.get("venue").map(|v| v.as_str().to_string()).unwrap_or_default(),
            result: row.get("result").map(|v| v.as_str().to_string()).filter(|s| !s.is_empty()),
            minutes_played: row.get("minutes").map(|v| v.as_i32()).unwrap_or(0),
            goals: row.get("goals").map(|v| v.as_i32()).unwrap_or(0),
            assists: row.get("assists").map(|v| v.as_i32()).unwrap_or(0),
            shots: row.get("shots").map(|v| v.as_i32()).unwrap_or(0),
            shots_on_target: row.get("shots_on_target").map(|v| v.as_i32()).unwrap_or(0),
            xg: row.get("xg").map(|v| v.as_f64()).unwrap_or(0.0),
            xa: row.get("xa").map(|v| v.as_f64()).unwrap_or(0.0),
            passes_completed: row.get("passes_completed").map(|v| v.as_i32()).unwrap_or(0),
            passes_attempted: row.get("passes_attempted").map(|v| v.as_i32()).unwrap_or(0),
            pass_completion_pct: row.get("passes_pct").map(|v| v.as_f64()),
            key_passes: row.get("assisted_shots").map(|v| v.as_i32()).unwrap_or(0),
            tackles: row.get("tackles").map(|v| v.as_i32()).unwrap_or(0),
            interceptions: row.get("interceptions").map(|v| v.as_i32()).unwrap_or(0),
            blocks: row.get("blocks").map(|v| v.as_i32()).unwrap_or(0),
            touches: row.get("touches").map(|v| v.as_i32()).unwrap_or(0),
            dribbles_completed: row.get("dribbles_completed").map(|v| v.as_i32()).unwrap_or(0),
            carries: row.get("carries").map(|v| v.as_i32()).unwrap_or(0),
            fouls_committed: row.get("fouls").map(|v| v.as_i32()).unwrap_or(0),
            fouls_drawn: row.get("fouled").map(|v| v.as_i32()).unwrap_or(0),
            yellow_cards: row.get("cards_yellow").map(|v| v.as_i32()).unwrap_or(0),
            red_cards: row.get("cards_red").map(|v| v.as_i32()).unwrap_or(0),
        });
    }
    Ok(matches)
}

/// In-memory dedup by the E4 uniqueness tuple (§4.5 step 4, P2).
fn dedup_matches(matches: Vec<PlayerMatch>) -> Vec<PlayerMatch> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(matches.len());
    for m in matches {
        let key = (m.match_date, m.competition.clone(), m.opponent.clone());
        if seen.insert(key) {
            out.push(m);
        }
    }
    out
}

/// Runs the full C5 pipeline for one player and returns its dossier together with the
/// concrete scope it populated, or a `PlayerError` tagged with the player's identity on
/// any failure. For `ScrapeRequest::Full` the returned `SeasonScope` is only known after
/// the main page has been parsed (§4.5 "Full sync: seasonScope = every season the source
/// exposes"), so the writer must use the scope this call returns, not one computed ahead
/// of time.
pub async fn scrape_player(
    fetcher: &Fetcher,
    player: &Player,
    request: ScrapeRequest,
) -> Result<(PlayerDossier, SeasonScope), PlayerError> {
    run(fetcher, player, request).await.map_err(|source| PlayerError {
        player_id: player.id,
        player_name: player.name.clone(),
        source,
    })
}

async fn run(
    fetcher: &Fetcher,
    player: &Player,
    request: ScrapeRequest,
) -> Result<(PlayerDossier, SeasonScope), EngineError> {
    let external_id = resolve_external_id(fetcher, player).await?;
    let tables = fetch_section_tables(fetcher, &external_id).await?;

    let mut competition_stats = Vec::new();
    let mut goalkeeper_stats = Vec::new();
    for section in Section::all() {
        let (stats, gk_stats) = merge_and_classify_section(&tables, section, player.is_goalkeeper)?;
        competition_stats.extend(stats);
        goalkeeper_stats.extend(gk_stats);
    }

    let scope = match request {
        ScrapeRequest::Incremental => SeasonScope::Incremental(Season::current()),
        ScrapeRequest::Full => SeasonScope::Full(distinct_seasons(&competition_stats, &goalkeeper_stats)),
    };

    let mut matches = Vec::new();
    for season in scope.seasons() {
        let url = matchlog_page_url(&external_id, &season);
        let html = fetcher.fetch_page(&url).await?;
        matches.extend(parse_matchlog_rows(&html, player.id)?);
    }
    let matches = dedup_matches(matches);

    let dossier = PlayerDossier { external_id: Some(external_id), competition_stats, goalkeeper_stats, matches };
    Ok((dossier, scope))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_one_row_per_uniqueness_tuple() {
        let base = PlayerMatch {
            id: 0,
            player_id: 1,
            match_date: chrono::NaiveDate::from_ymd_opt(2025, 9, 10).unwrap(),
            competition: "La Liga".to_string(),
            opponent: "Villarreal".to_string(),
            round: None,
            venue: "Home".to_string(),
            result: None,
            minutes_played: 90,
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
        };
        let mut duplicate = base.clone();
        duplicate.minutes_played = 91; // differs only in a non-key column

        let deduped = dedup_matches(vec![base, duplicate]);
        assert_eq!(deduped.len(), 1);
    }

    #[test]
    fn incremental_scope_is_exactly_one_season() {
        let scope = SeasonScope::incremental_current();
        assert_eq!(scope.seasons().len(), 1);
    }

    #[test]
    fn distinct_seasons_dedupes_across_club_and_national_team_rows() {
        use crate::models::CompetitionType;

        let mut club = CompetitionStat {
            id: 0,
            player_id: 0,
            season: "2025-2026".to_string(),
            competition_type: CompetitionType::League,
            competition_name: "La Liga".to_string(),
            games: 1,
            games_starts: 1,
            minutes: 90,
            goals: 0,
            assists: 0,
            xg: 0.0,
            npxg: 0.0,
            xa: 0.0,
            penalty_goals: None,
            shots: 0,
            shots_on_target: 0,
            yellow_cards: 0,
            red_cards: 0,
        };
        let cup = CompetitionStat {
            competition_type: CompetitionType::DomesticCup,
            competition_name: "Copa del Rey".to_string(),
            ..club.clone()
        };
        club.season = "2024-2025".to_string();
        let national = CompetitionStat {
            season: "2025".to_string(),
            competition_type: CompetitionType::NationalTeam,
            competition_name: "World Cup Qualifying".to_string(),
            ..club.clone()
        };

        let seasons = distinct_seasons(&[club, cup, national], &[]);
        assert_eq!(seasons.len(), 3);
    }
}
