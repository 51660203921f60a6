//! Table Merger (C3, §4.3).
//!
//! The source page publishes up to four parallel tables per competition section —
//! standard, shooting, playing-time, goalkeeper — each keyed by the same (season,
//! competition) tuple. This stitches them into one row per tuple, following a fixed
//! overlay precedence order (§4.3).

use std::collections::HashMap;

use crate::parse::Row;

/// One (season, competition) record after merging, still untyped as to competition class —
/// classification (C4) happens next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedStatRow {
    pub season_raw: String,
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

    // Goalkeeper-only fields, populated only when the goalkeeper table is overlaid.
    pub goals_against: i32,
    pub goals_against_per90: f64,
    pub shots_on_target_against: i32,
    pub saves: i32,
    pub save_percentage: f64,
    pub clean_sheets: i32,
    pub clean_sheet_percentage: f64,
    pub gk_wins: i32,
    pub gk_draws: i32,
    pub gk_losses: i32,
    pub penalties_attempted: i32,
    pub penalties_allowed: i32,
    pub penalties_saved: i32,
    pub penalties_missed: i32,
}

type RowKey = (String, String);

fn row_key(row: &Row) -> Option<RowKey> {
    let season = row.get("season")?.as_str();
    if season.is_empty() {
        return None;
    }
    let comp = row
        .get("comp")
        .or_else(|| row.get("competition"))
        .map(|v| v.as_str())
        .unwrap_or_default();
    Some((season.to_string(), comp.to_string()))
}

fn index_by_key(rows: &[Row]) -> HashMap<RowKey, &Row> {
    rows.iter().filter_map(|r| row_key(r).map(|k| (k, r))).collect()
}

fn base_from_standard(season_raw: String, competition_name: String, row: &Row) -> MergedStatRow {
    MergedStatRow {
        season_raw,
        competition_name,
        games: row.get("games").map(|v| v.as_i32()).unwrap_or(0),
        games_starts: row.get("games_starts").map(|v| v.as_i32()).unwrap_or(0),
        minutes: row.get("minutes").map(|v| v.as_i32()).unwrap_or(0),
        goals: row.get("goals").map(|v| v.as_i32()).unwrap_or(0),
        assists: row.get("assists").map(|v| v.as_i32()).unwrap_or(0),
        xg: row.get("xg").map(|v| v.as_f64()).unwrap_or(0.0),
        npxg: row.get("npxg").map(|v| v.as_f64()).unwrap_or(0.0),
        xa: row.get("xa").map(|v| v.as_f64()).unwrap_or(0.0),
        penalty_goals: row.get("pens_made").map(|v| v.as_i32()),
        shots: row.get("shots").map(|v| v.as_i32()).unwrap_or(0),
        shots_on_target: row.get("shots_on_target").map(|v| v.as_i32()).unwrap_or(0),
        yellow_cards: row.get("cards_yellow").map(|v| v.as_i32()).unwrap_or(0),
        red_cards: row.get("cards_red").map(|v| v.as_i32()).unwrap_or(0),
        ..Default::default()
    }
}

/// Overlays `shots`, `shots_on_target`, `xg`, `npxg` from the shooting table when present
/// and > 0 (rule 2, §4.3).
fn overlay_shooting(target: &mut MergedStatRow, row: &Row) {
    if let Some(v) = row.get("shots") {
        if v.is_present_and_positive() {
            target.shots = v.as_i32();
        }
    }
    if let Some(v) = row.get("shots_on_target") {
        if v.is_present_and_positive() {
            target.shots_on_target = v.as_i32();
        }
    }
    if let Some(v) = row.get("xg") {
        if v.is_present_and_positive() {
            target.xg = v.as_f64();
        }
    }
    if let Some(v) = row.get("npxg") {
        if v.is_present_and_positive() {
            target.npxg = v.as_f64();
        }
    }
}

/// Overlays `minutes`, `games_starts` from the playing-time table when present and > 0
/// (rule 3, §4.3) — the authoritative source for `minutes` in league rows where `standard`
/// omits the column.
fn overlay_playing_time(target: &mut MergedStatRow, row: &Row) {
    if let Some(v) = row.get("minutes") {
        if v.is_present_and_positive() {
            target.minutes = v.as_i32();
        }
    }
    if let Some(v) = row.get("games_starts") {
        if v.is_present_and_positive() {
            target.games_starts = v.as_i32();
        }
    }
}

/// Overlays goalkeeper-specific fields (rule 4, §4.3). Applies the minutes preserve rule:
/// a zero/null minutes value on the goalkeeper table never clobbers a positive value already
/// present on `target` from the standard/playing-time tables.
fn overlay_goalkeeper(target: &mut MergedStatRow, row: &Row) {
    if let Some(v) = row.get("minutes") {
        if v.is_present_and_positive() {
            target.minutes = v.as_i32();
        }
        // else: preserve rule — keep whatever standard/playing_time already set.
    }
    target.goals_against = row.get("goals_against").map(|v| v.as_i32()).unwrap_or(target.goals_against);
    target.goals_against_per90 =
        row.get("goals_against_per90").map(|v| v.as_f64()).unwrap_or(target.goals_against_per90);
    target.shots_on_target_against =
        row.get("shots_on_target_against").map(|v| v.as_i32()).unwrap_or(target.shots_on_target_against);
    target.saves = row.get("saves").map(|v| v.as_i32()).unwrap_or(target.saves);
    target.save_percentage = row.get("save_pct").map(|v| v.as_f64()).unwrap_or(target.save_percentage);
    target.clean_sheets = row.get("clean_sheets").map(|v| v.as_i32()).unwrap_or(target.clean_sheets);
    target.clean_sheet_percentage =
        row.get("clean_sheets_pct").map(|v| v.as_f64()).unwrap_or(target.clean_sheet_percentage);
    target.gk_wins = row.get("gk_wins").map(|v| v.as_i32()).unwrap_or(target.gk_wins);
    target.gk_draws = row.get("gk_ties").map(|v| v.as_i32()).unwrap_or(target.gk_draws);
    target.gk_losses = row.get("gk_losses").map(|v| v.as_i32()).unwrap_or(target.gk_losses);
    target.penalties_attempted =
        row.get("pens_att_gk").map(|v| v.as_i32()).unwrap_or(target.penalties_attempted);
    target.penalties_allowed =
        row.get("pens_allowed").map(|v| v.as_i32()).unwrap_or(target.penalties_allowed);
    target.penalties_saved = row.get("pens_saved").map(|v| v.as_i32()).unwrap_or(target.penalties_saved);
    target.penalties_missed =
        row.get("pens_missed_gk").map(|v| v.as_i32()).unwrap_or(target.penalties_missed);
    // games/games_starts for keepers come from the keeper table too, when present.
    if let Some(v) = row.get("games") {
        if v.is_present_and_positive() {
            target.games = v.as_i32();
        }
    }
    if let Some(v) = row.get("games_starts") {
        if v.is_present_and_positive() {
            target.games_starts = v.as_i32();
        }
    }
}

pub struct MergeInputs<'a> {
    pub standard: &'a [Row],
    pub shooting: &'a [Row],
    pub playing_time: &'a [Row],
    pub goalkeeper: &'a [Row],
}

/// Merges the (up to) four parallel per-section table lists into one row per
/// (season, competition), in standard-table order.
pub fn merge_section(inputs: MergeInputs, is_goalkeeper: bool) -> Vec<MergedStatRow> {
    let shooting_idx = index_by_key(inputs.shooting);
    let playing_time_idx = index_by_key(inputs.playing_time);
    let goalkeeper_idx = index_by_key(inputs.goalkeeper);

    let mut merged = Vec::new();
    for row in inputs.standard {
        let Some(key) = row_key(row) else { continue };
        let mut record = base_from_standard(key.0.clone(), key.1.clone(), row);

        if let Some(shoot_row) = shooting_idx.get(&key) {
            overlay_shooting(&mut record, shoot_row);
        }
        if let Some(pt_row) = playing_time_idx.get(&key) {
            overlay_playing_time(&mut record, pt_row);
        }
        if is_goalkeeper {
            if let Some(gk_row) = goalkeeper_idx.get(&key) {
                overlay_goalkeeper(&mut record, gk_row);
            }
        }

        merged.push(record);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::CellValue;

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn playing_time_is_authoritative_for_minutes() {
        let standard = vec![row(&[
            ("season", CellValue::Str("2025-2026".into())),
            ("comp", CellValue::Str("La Liga".into())),
            ("games", CellValue::Int(10)),
        ])];
        let playing_time = vec![row(&[
            ("season", CellValue::Str("2025-2026".into())),
            ("comp", CellValue::Str("La Liga".into())),
            ("minutes", CellValue::Int(900)),
        ])];

        let merged = merge_section(
            MergeInputs { standard: &standard, shooting: &[], playing_time: &playing_time, goalkeeper: &[] },
            false,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].minutes, 900);
    }

    #[test]
    fn goalkeeper_minutes_preserve_rule() {
        let standard = vec![row(&[
            ("season", CellValue::Str("2025-2026".into())),
            ("comp", CellValue::Str("Serie A".into())),
            ("minutes", CellValue::Int(1260)),
        ])];
        let goalkeeper = vec![row(&[
            ("season", CellValue::Str("2025-2026".into())),
            ("comp", CellValue::Str("Serie A".into())),
            ("minutes", CellValue::Null),
            ("saves", CellValue::Int(40)),
        ])];

        let merged = merge_section(
            MergeInputs { standard: &standard, shooting: &[], playing_time: &[], goalkeeper: &goalkeeper },
            true,
        );
        assert_eq!(merged[0].minutes, 1260);
        assert_eq!(merged[0].saves, 40);
    }

    #[test]
    fn shooting_overlay_only_applies_when_positive() {
        let standard = vec![row(&[
            ("season", CellValue::Str("2025-2026".into())),
            ("comp", CellValue::Str("Ligue 1".into())),
            ("shots", CellValue::Int(5)),
        ])];
        let shooting = vec![row(&[
            ("season", CellValue::Str("2025-2026".into())),
            ("comp", CellValue::Str("Ligue 1".into())),
            ("shots", CellValue::Int(0)),
            ("xg", CellValue::Float(1.4)),
        ])];

        let merged = merge_section(
            MergeInputs { standard: &standard, shooting: &shooting, playing_time: &[], goalkeeper: &[] },
            false,
        );
        assert_eq!(merged[0].shots, 5); // zero overlay ignored
        assert_eq!(merged[0].xg, 1.4); // positive overlay applied
    }

    #[test]
    fn rows_without_a_season_key_are_skipped() {
        let standard = vec![row(&[("games", CellValue::Int(1))])];
        let merged = merge_section(
            MergeInputs { standard: &standard, shooting: &[], playing_time: &[], goalkeeper: &[] },
            false,
        );
        assert!(merged.is_empty());
    }
}
