//! Names the engine matches on.
//!
//! Defaults follow the files ASReview exports and the field names of the
//! reference library; `from_env` lets a deployment override the two that
//! users actually rename.

use serde::{Deserialize, Serialize};
use std::env;

/// Default title of the ranking attachment.
pub const DEFAULT_ATTACHMENT_TITLE: &str = "asreview.csv";

/// Matching configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingConfig {
    /// Exact title of the ranking attachment.
    pub attachment_title: String,
    /// Item field holding the DOI.
    pub doi_field: String,
    /// Item field holding the ISSN.
    pub issn_field: String,
    /// Ranking file column holding the DOI.
    pub doi_column: String,
    /// Ranking file column holding the ISSN.
    pub issn_column: String,
    /// Ranking file column holding the rank.
    pub ranking_column: String,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            attachment_title: DEFAULT_ATTACHMENT_TITLE.to_string(),
            doi_field: "DOI".to_string(),
            issn_field: "ISSN".to_string(),
            doi_column: "doi".to_string(),
            issn_column: "issn".to_string(),
            ranking_column: "asreview_ranking".to_string(),
        }
    }
}

impl RankingConfig {
    /// Defaults, overridden by `ASREVIEW_ATTACHMENT_TITLE` and
    /// `ASREVIEW_RANKING_COLUMN` when set and non-empty.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(title) = non_empty_var("ASREVIEW_ATTACHMENT_TITLE") {
            config.attachment_title = title;
        }
        if let Some(column) = non_empty_var("ASREVIEW_RANKING_COLUMN") {
            config.ranking_column = column;
        }
        config
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RankingConfig::default();
        assert_eq!(config.attachment_title, "asreview.csv");
        assert_eq!(config.ranking_column, "asreview_ranking");
        assert_eq!(config.doi_field, "DOI");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: RankingConfig =
            serde_json::from_str(r#"{"attachmentTitle": "ranking.csv"}"#).unwrap();
        assert_eq!(config.attachment_title, "ranking.csv");
        assert_eq!(config.issn_column, "issn");
    }
}
