//! REST API types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cache::{CacheStats, RankResult};
use crate::models::{CollectionId, CollectionRanking, ItemId};

/// Lookup state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankStatus {
    Pending,
    Unknown,
    Ranked,
}

/// Response for a single item lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRankResponse {
    pub collection: CollectionId,
    pub item: ItemId,
    pub status: RankStatus,
    pub rank: Option<f64>,
    /// Text for the ranking column
    pub text: String,
}

impl ItemRankResponse {
    pub fn new(collection: CollectionId, item: ItemId, result: RankResult) -> Self {
        let status = match result {
            RankResult::Pending => RankStatus::Pending,
            RankResult::Unknown => RankStatus::Unknown,
            RankResult::Ranked(_) => RankStatus::Ranked,
        };
        Self {
            collection,
            item,
            status,
            rank: result.rank(),
            text: result.text(),
        }
    }
}

/// One ranked item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    pub item: ItemId,
    pub rank: f64,
}

/// Full ranking of a collection, best rank first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRankingResponse {
    pub collection: CollectionId,
    pub updated: DateTime<Utc>,
    pub items: Vec<RankedItem>,
}

impl CollectionRankingResponse {
    pub fn new(collection: CollectionId, ranking: &CollectionRanking) -> Self {
        let mut items: Vec<RankedItem> = ranking
            .rank
            .iter()
            .map(|(&item, &rank)| RankedItem { item, rank })
            .collect();
        items.sort_by(|a, b| {
            a.rank
                .partial_cmp(&b.rank)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.item.cmp(&b.item))
        });

        Self {
            collection,
            updated: ranking.updated,
            items,
        }
    }
}

/// Cache overview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOverview {
    pub ready: bool,
    pub collections: Vec<CollectionId>,
    pub stats: CacheStats,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}
