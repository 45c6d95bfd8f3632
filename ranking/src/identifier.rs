//! Bibliographic identifier extraction.
//!
//! Many imports leave the DOI or ISSN out of the structured fields and put it
//! in the free-text `extra` field instead, one `Field: value` per line.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::host::Item;

static DOI_RESOLVER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://doi\.org/").expect("valid resolver pattern"));

/// Identifier `field` of `item`.
///
/// The structured field wins; otherwise the first `extra` line starting with
/// `field:` (case-sensitive) supplies the value. Empty when neither exists.
pub fn identifier(item: &Item, field: &str) -> String {
    let value = item.field(field).trim();
    if !value.is_empty() {
        return value.to_string();
    }

    let prefix = format!("{}:", field);
    item.extra()
        .lines()
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// Strip a `http(s)://doi.org/` resolver prefix.
pub fn normalize_doi(doi: &str) -> String {
    DOI_RESOLVER.replace(doi.trim(), "").into_owned()
}

/// The item's DOI from `field`, resolver prefix removed.
pub fn doi(item: &Item, field: &str) -> String {
    normalize_doi(&identifier(item, field))
}

/// The item's ISSN from `field`.
pub fn issn(item: &Item, field: &str) -> String {
    identifier(item, field)
}
