//! Page Parser.
//!
//! Extracts structured rows from named tables within a rendered page. The source site hides
//! several tables inside HTML comments to suppress default rendering (observed on
//! fbref-style stat pages); browsers materialize them fine, but a naive DOM selector misses
//! them entirely, so every table lookup falls back to scanning comment nodes.

use std::collections::HashMap;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// A leniently-typed cell value parsed from raw page text.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl CellValue {
    pub fn as_i32(&self) -> i32 {
        match self {
            CellValue::Int(v) => *v as i32,
            CellValue::Float(v) => *v as i32,
            _ => 0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            CellValue::Int(v) => *v as f64,
            CellValue::Float(v) => *v,
            _ => 0.0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CellValue::Str(s) => s.as_str(),
            _ => "",
        }
    }

    pub fn is_present_and_positive(&self) -> bool {
        match self {
            CellValue::Int(v) => *v > 0,
            CellValue::Float(v) => *v > 0.0,
            _ => false,
        }
    }

    /// Parses a raw cell string the way the source site renders it: thousands separators
    /// stripped, empty string becomes `Null`, otherwise numeric if it parses as one.
    fn from_raw(raw: &str) -> CellValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Null;
        }
        let stripped: String = trimmed.chars().filter(|c| *c != ',').collect();
        if let Ok(i) = stripped.parse::<i64>() {
            return CellValue::Int(i);
        }
        if let Ok(f) = stripped.parse::<f64>() {
            return CellValue::Float(f);
        }
        CellValue::Str(trimmed.to_string())
    }
}

pub type Row = HashMap<String, CellValue>;

/// Column keys that identify a header or footer aggregate row rather than real data.
const ROW_CLASS_SKIP_MARKERS: [&str; 2] = ["thead", "spacer"];

/// For each requested table id, returns its parsed data rows (empty if the table is absent
/// from the page at all — e.g. a player with no European competition has no
/// `stats_standard_intl_cup` table, which is not an error).
pub fn parse_tables(html: &str, table_ids: &[&str]) -> HashMap<String, Vec<Row>> {
    let document = Html::parse_document(html);
    let mut out = HashMap::new();

    for &id in table_ids {
        if let Some(rows) = extract_table_rows_by_id(&document, id) {
            out.insert(id.to_string(), rows);
            continue;
        }
        if let Some(rows) = extract_table_from_comments(&document, id) {
            out.insert(id.to_string(), rows);
        }
    }

    out
}

fn table_selector(id: &str) -> Selector {
    // Table ids are always simple ASCII identifiers from the source site's own markup
    // (`stats_{kind}_{section}`), so building the selector string is safe.
    Selector::parse(&format!("table#{id}")).expect("table id produces a valid CSS selector")
}

fn extract_table_rows_by_id(document: &Html, id: &str) -> Option<Vec<Row>> {
    let selector = table_selector(id);
    let table = document.select(&selector).next()?;
    Some(extract_rows(table))
}

/// Scans every HTML comment node in the document, and for any comment whose text contains
/// the target table, re-parses that comment's text as its own fragment and extracts from it.
fn extract_table_from_comments(document: &Html, id: &str) -> Option<Vec<Row>> {
    let needle = format!("id=\"{id}\"");
    for node in document.tree.nodes() {
        if let Node::Comment(comment) = node.value() {
            if comment.contains(&needle) {
                let fragment = Html::parse_fragment(comment);
                if let Some(rows) = extract_table_rows_by_id(&fragment, id) {
                    return Some(rows);
                }
            }
        }
    }
    None
}

fn row_selector() -> &'static Selector {
    use std::sync::OnceLock;
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tbody tr").unwrap())
}

fn cell_selector() -> &'static Selector {
    use std::sync::OnceLock;
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td, th").unwrap())
}

fn extract_rows(table: ElementRef) -> Vec<Row> {
    let mut rows = Vec::new();

    for tr in table.select(row_selector()) {
        if is_skippable_row(tr) {
            continue;
        }

        let mut row: Row = HashMap::new();
        for cell in tr.select(cell_selector()) {
            let Some(key) = cell.value().attr("data-stat") else { continue };
            let text: String = cell.text().collect::<Vec<_>>().join("").trim().to_string();
            row.insert(key.to_string(), CellValue::from_raw(&text));
        }

        if !row.is_empty() {
            rows.push(row);
        }
    }

    rows
}

fn is_skippable_row(tr: ElementRef) -> bool {
    if let Some(class) = tr.value().attr("class") {
        if ROW_CLASS_SKIP_MARKERS.iter().any(|marker| class.contains(marker)) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_visible_table() {
        let html = r#"
            <table id="stats_standard_dom_lg">
                <thead><tr class="thead"><th data-stat="season">Season</th></tr></thead>
                <tbody>
                    <tr><td data-stat="season">2025-2026</td><td data-stat="games">10</td></tr>
                    <tr class="thead"><td data-stat="season">Season</td></tr>
                </tbody>
            </table>
        "#;
        let parsed = parse_tables(html, &["stats_standard_dom_lg"]);
        let rows = parsed.get("stats_standard_dom_lg").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("season").unwrap().as_str(), "2025-2026");
        assert_eq!(rows[0].get("games").unwrap().as_i32(), 10);
    }

    #[test]
    fn unwraps_a_table_hidden_inside_a_comment() {
        let html = r#"
            <div id="all_stats_standard_dom_cup">
            <!--
            <table id="stats_standard_dom_cup">
                <tbody>
                    <tr><td data-stat="season">2025-2026</td><td data-stat="goals">3</td></tr>
                </tbody>
            </table>
            -->
            </div>
        "#;
        let parsed = parse_tables(html, &["stats_standard_dom_cup"]);
        let rows = parsed.get("stats_standard_dom_cup").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("goals").unwrap().as_i32(), 3);
    }

    #[test]
    fn absent_table_yields_no_entry_not_an_error() {
        let parsed = parse_tables("<html></html>", &["stats_goalkeeper_intl_cup"]);
        assert!(parsed.get("stats_goalkeeper_intl_cup").is_none());
    }

    #[test]
    fn strips_thousands_separators_and_nulls_empty_cells() {
        let html = r#"
            <table id="t"><tbody>
                <tr>
                    <td data-stat="minutes">1,260</td>
                    <td data-stat="xg"></td>
                </tr>
            </tbody></table>
        "#;
        let rows = parse_tables(html, &["t"]).remove("t").unwrap();
        assert_eq!(rows[0].get("minutes").unwrap().as_i32(), 1260);
        assert_eq!(rows[0].get("xg").unwrap(), &CellValue::Null);
    }

    #[test]
    fn parser_is_pure() {
        let html = r#"<table id="t"><tbody><tr><td data-stat="goals">2</td></tr></tbody></table>"#;
        let a = parse_tables(html, &["t"]);
        let b = parse_tables(html, &["t"]);
        assert_eq!(a, b);
    }
}
