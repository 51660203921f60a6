//! Structured season values (§9 "String-keyed season filtering → structured season values").
//!
//! Replaces substring logic on season labels with a typed value carrying its kind and its
//! date window, so every filter — the writer's delete scope, the backfill window, the API's
//! aggregation — goes through the same computation instead of re-deriving it ad hoc.

use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::EngineError;

static SEASONAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{4})$").unwrap());
static SEASONAL_SLASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})/(\d{4})$").unwrap());
static CALENDAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonKind {
    /// A split-year interval `YYYY-YYYY`, July 1 through June 30 of the following year.
    Seasonal,
    /// A single calendar year, used exclusively for national-team competitions (I4).
    CalendarYear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Season {
    pub kind: SeasonKind,
    pub start_year: i32,
}

impl Season {
    pub fn seasonal(start_year: i32) -> Self {
        Season { kind: SeasonKind::Seasonal, start_year }
    }

    pub fn calendar_year(year: i32) -> Self {
        Season { kind: SeasonKind::CalendarYear, start_year: year }
    }

    /// Parses a season label as it would appear in a stored stat row. `is_national_team`
    /// selects which form is expected, since the same four digits mean different things
    /// depending on competition_type (I4).
    pub fn parse(label: &str, is_national_team: bool) -> Result<Season, EngineError> {
        let label = label.trim();
        if is_national_team {
            if let Some(c) = CALENDAR_RE.captures(label) {
                let year: i32 = c[1].parse().unwrap();
                return Ok(Season::calendar_year(year));
            }
            // Tolerate a legacy seasonal-form row under NATIONAL_TEAM (OQ1): take the
            // first year as the nominal calendar year so it can still be scoped/cleaned up.
            if let Some(c) = SEASONAL_RE.captures(label) {
                let year: i32 = c[1].parse().unwrap();
                return Ok(Season::calendar_year(year));
            }
            return Err(EngineError::Parse {
                reason: format!("'{label}' is not a valid national-team season label"),
            });
        }

        if let Some(c) = SEASONAL_RE.captures(label) {
            let start: i32 = c[1].parse().unwrap();
            let end: i32 = c[2].parse().unwrap();
            if end != start + 1 {
                return Err(EngineError::Parse {
                    reason: format!("'{label}' does not span contiguous years"),
                });
            }
            return Ok(Season::seasonal(start));
        }
        if let Some(c) = SEASONAL_SLASH_RE.captures(label) {
            let start: i32 = c[1].parse().unwrap();
            let end: i32 = c[2].parse().unwrap();
            if end != start + 1 {
                return Err(EngineError::Parse {
                    reason: format!("'{label}' does not span contiguous years"),
                });
            }
            return Ok(Season::seasonal(start));
        }
        Err(EngineError::Parse { reason: format!("'{label}' is not a recognized season label") })
    }

    /// The canonical, normalized form stored in E2/E3/E4 rows (§4.4): `YYYY-YYYY` for
    /// everything except national-team rows, which store a bare four-digit year.
    pub fn canonical(&self) -> String {
        match self.kind {
            SeasonKind::Seasonal => format!("{}-{}", self.start_year, self.start_year + 1),
            SeasonKind::CalendarYear => self.start_year.to_string(),
        }
    }

    /// Every string form this season is permitted to appear as in historical data
    /// (§4.6 "season variant", §6.1 aggregation rule). Used both for deleting a bounded
    /// slice on write and for summing across classes on read.
    pub fn variants(&self) -> Vec<String> {
        match self.kind {
            SeasonKind::Seasonal => vec![
                format!("{}-{}", self.start_year, self.start_year + 1),
                format!("{}/{}", self.start_year, self.start_year + 1),
            ],
            SeasonKind::CalendarYear => vec![
                self.start_year.to_string(),
                // A national-team row may have been stored under the seasonal form by a
                // pre-I4 writer (OQ1); a full sync's delete step needs to catch it too.
                format!("{}-{}", self.start_year, self.start_year + 1),
            ],
        }
    }

    /// Every string form an E2/E3 row may carry that should fold into this season's read-side
    /// aggregate (§6.1 "Aggregation semantics"). Deliberately broader than `variants()`: a
    /// club season's total also pulls in the player's national-team rows for the season's
    /// first calendar year, since those competitions ran concurrently with the club season.
    /// Never use this to scope a write — an incremental sync of a club season must never
    /// touch national-team rows it doesn't own (I6); `variants()` is the write-scope rule.
    pub fn read_aggregate_variants(&self) -> Vec<String> {
        match self.kind {
            SeasonKind::Seasonal => {
                let mut vs = self.variants();
                vs.push(self.start_year.to_string());
                vs
            }
            SeasonKind::CalendarYear => self.variants(),
        }
    }

    /// `[start, end]` inclusive date window, used for date-range deletion of E4 rows and for
    /// the backfill's match selection — never string matching (P8).
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        match self.kind {
            SeasonKind::Seasonal => (
                NaiveDate::from_ymd_opt(self.start_year, 7, 1).unwrap(),
                NaiveDate::from_ymd_opt(self.start_year + 1, 6, 30).unwrap(),
            ),
            SeasonKind::CalendarYear => (
                NaiveDate::from_ymd_opt(self.start_year, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(self.start_year, 12, 31).unwrap(),
            ),
        }
    }

    /// The current season per the July-1 policy rule (§4.5 "Season scope policy").
    pub fn current() -> Season {
        let now = Utc::now();
        let year = now.year();
        let start_year = if now.month() >= 7 { year } else { year - 1 };
        Season::seasonal(start_year)
    }

    /// Normalizes a raw season label straight off the source page into canonical form
    /// (§4.4): `YYYY/YYYY` collapses to `YYYY-YYYY`; national-team rows become a bare year.
    pub fn normalize_raw(raw: &str, is_national_team: bool) -> Result<String, EngineError> {
        Ok(Season::parse(raw, is_national_team)?.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_seasonal() {
        let s = Season::parse("2025-2026", false).unwrap();
        assert_eq!(s.canonical(), "2025-2026");
    }

    #[test]
    fn parses_slash_seasonal_and_normalizes() {
        let s = Season::parse("2025/2026", false).unwrap();
        assert_eq!(s.canonical(), "2025-2026");
    }

    #[test]
    fn rejects_noncontiguous_seasonal() {
        assert!(Season::parse("2025-2027", false).is_err());
    }

    #[test]
    fn national_team_uses_calendar_year() {
        let s = Season::parse("2025", true).unwrap();
        assert_eq!(s.canonical(), "2025");
        assert_eq!(s.kind, SeasonKind::CalendarYear);
    }

    #[test]
    fn variants_include_slash_and_legacy_forms() {
        let s = Season::seasonal(2025);
        let vs = s.variants();
        assert!(vs.contains(&"2025-2026".to_string()));
        assert!(vs.contains(&"2025/2026".to_string()));

        let nt = Season::calendar_year(2025);
        let nt_vs = nt.variants();
        assert!(nt_vs.contains(&"2025".to_string()));
        assert!(nt_vs.contains(&"2025-2026".to_string()));
    }

    #[test]
    fn date_range_spans_july_to_june() {
        let (start, end) = Season::seasonal(2025).date_range();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());
    }

    #[test]
    fn read_aggregate_variants_folds_in_national_team_calendar_year() {
        let seasonal = Season::seasonal(2025);
        let vs = seasonal.read_aggregate_variants();
        assert!(vs.contains(&"2025-2026".to_string()));
        assert!(vs.contains(&"2025".to_string()), "club season aggregate must include the overlapping national-team year");

        // The write-scope `variants()` must NOT gain the calendar-year form, or an
        // incremental club-season sync would delete national-team rows it doesn't own (I6).
        assert!(!seasonal.variants().contains(&"2025".to_string()));
    }

    #[test]
    fn calendar_year_date_range_is_the_year_itself() {
        let (start, end) = Season::calendar_year(2025).date_range();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }
}
