//! Competition name mapper.
//!
//! The source site abbreviates competition names inconsistently across its own tables
//! (`"Champions Lg"` on one page, `"UEFA Champions League"` on another). The backfill
//! engine needs to match a match-log row's competition label against a stat row's
//! `competition_name` to decide which minutes belong to which row, so both get resolved
//! to the same canonical form before comparing.

/// Canonical short-label -> full-name pairs, lookup is case-insensitive.
const CANONICAL_MAP: &[(&str, &str)] = &[
    ("champions lg", "UEFA Champions League"),
    ("europa lg", "UEFA Europa League"),
    ("conf lg", "UEFA Europa Conference League"),
    ("fa cup", "FA Cup"),
    ("efl cup", "EFL Cup"),
    ("copa del rey", "Copa del Rey"),
    ("coppa italia", "Coppa Italia"),
    ("dfb pokal", "DFB-Pokal"),
    ("coupe de france", "Coupe de France"),
    ("uefa nations league", "UEFA Nations League"),
    ("wcq", "World Cup Qualifying"),
    ("friendlies (m)", "Friendly"),
];

/// Resolves a raw competition label to its canonical full name:
/// case-insensitive exact match against the table first, then a substring fallback in
/// either direction, then the label itself unchanged if nothing matches.
pub fn canonicalize(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() {
        return raw.trim().to_string();
    }

    for (short, full) in CANONICAL_MAP {
        if lower == *short || lower == full.to_lowercase() {
            return full.to_string();
        }
    }

    for (short, full) in CANONICAL_MAP {
        if lower.contains(short) || full.to_lowercase().contains(&lower) {
            return full.to_string();
        }
    }

    raw.trim().to_string()
}

/// True when two raw competition labels refer to the same competition once canonicalized.
pub fn same_competition(a: &str, b: &str) -> bool {
    canonicalize(a) == canonicalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_short_form_maps_to_full_name() {
        assert_eq!(canonicalize("Europa Lg"), "UEFA Europa League");
        assert_eq!(canonicalize("Conf Lg"), "UEFA Europa Conference League");
    }

    #[test]
    fn is_case_insensitive() {
        assert_eq!(canonicalize("CHAMPIONS LG"), "UEFA Champions League");
    }

    #[test]
    fn falls_back_to_substring_match() {
        assert_eq!(canonicalize("UEFA Champions Lg Qualifying"), "UEFA Champions League");
    }

    #[test]
    fn unmapped_label_passes_through_unchanged() {
        assert_eq!(canonicalize("Serie A"), "Serie A");
    }

    #[test]
    fn same_competition_matches_across_forms() {
        assert!(same_competition("Champions Lg", "UEFA Champions League"));
        assert!(!same_competition("Champions Lg", "Europa Lg"));
    }
}
