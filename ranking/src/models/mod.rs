//! Domain models for ranking synchronization.
//!
//! - [`CollectionId`] / [`ItemId`] - Host library identifiers
//! - [`CellValue`] - One dynamically typed CSV cell
//! - [`RankingRow`] / [`RankingTable`] - Parsed ranking file
//! - [`CollectionRanking`] - Matched ranks for one collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Identifiers
// =============================================================================

/// Library collection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub u64);

/// Library item identifier (regular items, attachments and notes share one id space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl From<u64> for CollectionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CSV Cells
// =============================================================================

/// A single CSV cell after type coercion.
///
/// Serializes to the matching JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Empty cell.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Numeric literal.
    Number(f64),
    /// Anything else, verbatim.
    Text(String),
}

impl CellValue {
    /// Numeric content, if this cell is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether this cell holds exactly `text`.
    ///
    /// Numbers compare by their rendered form so a numeric identifier column
    /// still matches the item's string field.
    pub fn matches_text(&self, text: &str) -> bool {
        match self {
            CellValue::Text(s) => s == text,
            CellValue::Number(n) => format_number(*n) == text,
            CellValue::Null | CellValue::Bool(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Render a number the way a ranking is displayed (`2`, not `2.0`).
pub fn format_number(n: f64) -> String {
    n.to_string()
}

// =============================================================================
// Ranking Table
// =============================================================================

/// One parsed row, keyed by header name.
///
/// Columns missing from a short row are absent rather than null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankingRow(HashMap<String, CellValue>);

impl RankingRow {
    pub fn new(cells: HashMap<String, CellValue>) -> Self {
        Self(cells)
    }

    /// Cell for `column`, if the row has it.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.0.get(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, CellValue)> for RankingRow {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Every row of one ranking file, in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingTable {
    /// Column names from the header row.
    pub headers: Vec<String>,
    /// Delimiter inferred from the first line.
    pub delimiter: char,
    /// Data rows.
    pub rows: Vec<RankingRow>,
}

impl RankingTable {
    /// A table with no rows, what empty or unreadable input yields.
    pub fn empty() -> Self {
        Self {
            headers: Vec::new(),
            delimiter: ',',
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for RankingTable {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// Collection Ranking
// =============================================================================

/// Matched ranks for one collection, built from one version of its ranking file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionRanking {
    /// Attachment the ranking file belongs to.
    pub source: ItemId,
    /// Modification time of the ranking attachment this was built from.
    pub updated: DateTime<Utc>,
    /// Rank per directly contained, matched item.
    pub rank: HashMap<ItemId, f64>,
}

impl CollectionRanking {
    pub fn new(source: ItemId, updated: DateTime<Utc>, rank: HashMap<ItemId, f64>) -> Self {
        Self { source, updated, rank }
    }

    /// Rank of `item`, if it matched a row.
    pub fn get(&self, item: ItemId) -> Option<f64> {
        self.rank.get(&item).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_numbers_render_without_fraction() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(CellValue::Number(-3.0).to_string(), "-3");
    }

    #[test]
    fn test_matches_text() {
        assert!(CellValue::Text("10.1/a".into()).matches_text("10.1/a"));
        assert!(!CellValue::Text("10.1/a".into()).matches_text("10.1/b"));
        assert!(CellValue::Number(12345678.0).matches_text("12345678"));
        assert!(!CellValue::Null.matches_text(""));
        assert!(!CellValue::Bool(true).matches_text("true"));
    }

    #[test]
    fn test_cell_json_shape() {
        let row: RankingRow = [
            ("doi".to_string(), CellValue::Text("10.1/a".into())),
            ("asreview_ranking".to_string(), CellValue::Number(2.0)),
            ("issn".to_string(), CellValue::Null),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["doi"], "10.1/a");
        assert_eq!(json["asreview_ranking"], 2.0);
        assert!(json["issn"].is_null());
    }

    #[test]
    fn test_collection_ranking_lookup() {
        let mut rank = HashMap::new();
        rank.insert(ItemId(7), 1.0);
        let ranking = CollectionRanking::new(ItemId(20), Utc::now(), rank);

        assert_eq!(ranking.get(ItemId(7)), Some(1.0));
        assert_eq!(ranking.get(ItemId(8)), None);
    }
}
