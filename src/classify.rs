//! Record Classifier (C4, §4.4).
//!
//! Takes the merged, still-untyped rows from C3 and the section they came from, and
//! produces typed `CompetitionStat`/`GoalkeeperStat` rows: section decides
//! `competition_type`, the raw season label gets normalized through `Season`, and the
//! goalkeeper-only fields only survive onto `GoalkeeperStat`.

use crate::competition_map::canonicalize;
use crate::error::EngineError;
use crate::merge::MergedStatRow;
use crate::models::{CompetitionStat, CompetitionType, GoalkeeperStat};
use crate::season::Season;
use crate::tables::Section;

fn competition_type_for(section: Section) -> CompetitionType {
    match section {
        Section::DomesticLeague => CompetitionType::League,
        Section::DomesticCup => CompetitionType::DomesticCup,
        Section::InternationalCup => CompetitionType::EuropeanCup,
        Section::NationalTeam => CompetitionType::NationalTeam,
    }
}

/// Classifies one merged row into a `CompetitionStat`, with `id`/`player_id` left at 0 for
/// the writer to fill in on insert.
pub fn classify_competition_stat(
    row: &MergedStatRow,
    section: Section,
) -> Result<CompetitionStat, EngineError> {
    let competition_type = competition_type_for(section);
    let season = Season::normalize_raw(&row.season_raw, competition_type.is_national_team())?;

    Ok(CompetitionStat {
        id: 0,
        player_id: 0,
        season,
        competition_type,
        competition_name: canonicalize(&row.competition_name),
        games: row.games,
        games_starts: row.games_starts,
        minutes: row.minutes,
        goals: row.goals,
        assists: row.assists,
        xg: row.xg,
        npxg: row.npxg,
        xa: row.xa,
        penalty_goals: row.penalty_goals,
        shots: row.shots,
        shots_on_target: row.shots_on_target,
        yellow_cards: row.yellow_cards,
        red_cards: row.red_cards,
    })
}

/// Classifies one merged goalkeeper row into a `GoalkeeperStat`.
pub fn classify_goalkeeper_stat(
    row: &MergedStatRow,
    section: Section,
) -> Result<GoalkeeperStat, EngineError> {
    let competition_type = competition_type_for(section);
    let season = Season::normalize_raw(&row.season_raw, competition_type.is_national_team())?;

    Ok(GoalkeeperStat {
        id: 0,
        player_id: 0,
        season,
        competition_type,
        competition_name: canonicalize(&row.competition_name),
        games: row.games,
        games_starts: row.games_starts,
        minutes: row.minutes,
        goals_against: row.goals_against,
        goals_against_per90: row.goals_against_per90,
        shots_on_target_against: row.shots_on_target_against,
        saves: row.saves,
        save_percentage: row.save_percentage,
        clean_sheets: row.clean_sheets,
        clean_sheet_percentage: row.clean_sheet_percentage,
        wins: row.gk_wins,
        draws: row.gk_draws,
        losses: row.gk_losses,
        penalties_attempted: row.penalties_attempted,
        penalties_allowed: row.penalties_allowed,
        penalties_saved: row.penalties_saved,
        penalties_missed: row.penalties_missed,
    })
}

/// Classifies a full section's merged rows, routing to the goalkeeper or outfield shape
/// based on whether the player is a goalkeeper (E1.is_goalkeeper).
pub fn classify_section(
    rows: &[MergedStatRow],
    section: Section,
    is_goalkeeper: bool,
) -> Result<(Vec<CompetitionStat>, Vec<GoalkeeperStat>), EngineError> {
    let mut competition_stats = Vec::new();
    let mut goalkeeper_stats = Vec::new();

    for row in rows {
        if is_goalkeeper {
            goalkeeper_stats.push(classify_goalkeeper_stat(row, section)?);
        } else {
            competition_stats.push(classify_competition_stat(row, section)?);
        }
    }

    Ok((competition_stats, goalkeeper_stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(season_raw: &str, competition_name: &str) -> MergedStatRow {
        MergedStatRow {
            season_raw: season_raw.to_string(),
            competition_name: competition_name.to_string(),
            games: 10,
            ..Default::default()
        }
    }

    #[test]
    fn league_section_classifies_as_league() {
        let row = sample_row("2025-2026", "La Liga");
        let stat = classify_competition_stat(&row, Section::DomesticLeague).unwrap();
        assert_eq!(stat.competition_type, CompetitionType::League);
        assert_eq!(stat.season, "2025-2026");
    }

    #[test]
    fn national_team_section_normalizes_to_calendar_year() {
        let row = sample_row("2025", "WCQ");
        let stat = classify_competition_stat(&row, Section::NationalTeam).unwrap();
        assert_eq!(stat.competition_type, CompetitionType::NationalTeam);
        assert_eq!(stat.season, "2025");
        assert_eq!(stat.competition_name, "World Cup Qualifying");
    }

    #[test]
    fn goalkeeper_rows_route_to_goalkeeper_stat() {
        let row = sample_row("2025-2026", "Champions Lg");
        let (competition, goalkeeper) = classify_section(&[row], Section::InternationalCup, true).unwrap();
        assert!(competition.is_empty());
        assert_eq!(goalkeeper.len(), 1);
        assert_eq!(goalkeeper[0].competition_name, "UEFA Champions League");
    }

    #[test]
    fn invalid_season_label_is_rejected() {
        let row = sample_row("not-a-season", "Serie A");
        assert!(classify_competition_stat(&row, Section::DomesticLeague).is_err());
    }
}
