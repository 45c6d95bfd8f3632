//! Matching library items to ranking rows.
//!
//! A DOI match always beats an ISSN match: the whole table is searched by
//! DOI first, and only an item with no DOI hit falls back to its ISSN.

use std::collections::HashMap;

use crate::config::RankingConfig;
use crate::host::Item;
use crate::identifier::{doi, issn};
use crate::models::{CellValue, ItemId, RankingRow, RankingTable};

/// First row whose `column` cell equals `value`; never matches an empty value.
fn find_row<'a>(table: &'a RankingTable, column: &str, value: &str) -> Option<&'a RankingRow> {
    if value.is_empty() {
        return None;
    }
    table
        .rows
        .iter()
        .find(|row| row.get(column).is_some_and(|cell| cell.matches_text(value)))
}

/// The row `item` matches, if any.
pub fn match_row<'a>(item: &Item, table: &'a RankingTable, config: &RankingConfig) -> Option<&'a RankingRow> {
    find_row(table, &config.doi_column, &doi(item, &config.doi_field))
        .or_else(|| find_row(table, &config.issn_column, &issn(item, &config.issn_field)))
}

/// Rank of every regular item that matches a row with a numeric ranking.
pub fn match_rankings<'a, I>(items: I, table: &RankingTable, config: &RankingConfig) -> HashMap<ItemId, f64>
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut rank = HashMap::new();
    if table.is_empty() {
        return rank;
    }

    for item in items {
        if !item.is_regular() {
            continue;
        }
        let ranking = match_row(item, table, config)
            .and_then(|row| row.get(&config.ranking_column))
            .and_then(CellValue::as_number);
        if let Some(ranking) = ranking {
            rank.insert(item.id, ranking);
        }
    }

    rank
}
