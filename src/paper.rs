//! Paper records: the normalized view of one library item.
//!
//! Raw items arrive in the Zotero API shape:
//!
//! ```json
//! { "key": "ABCD1234", "data": { "title": "...", "DOI": "10.1/x" } }
//! ```

use crate::error::{CitegraphError, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// Label used for items without a usable title.
pub const UNTITLED: &str = "Untitled";

static DOI_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?://(?:dx\.)?doi\.org/|doi:\s*)").expect("valid DOI prefix pattern")
});

/// One bibliographic item known to the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperRecord {
    /// Library-internal item key
    pub key: String,
    /// Display title, `Untitled` if the item has none
    pub title: String,
    /// Normalized DOI, if the item carries one
    pub doi: Option<String>,
}

impl PaperRecord {
    /// Build a record from an already-extracted key, title and DOI.
    pub fn new(key: impl Into<String>, title: Option<&str>, doi: Option<&str>) -> Self {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(UNTITLED)
            .to_string();

        Self {
            key: key.into(),
            title,
            doi: doi.and_then(normalize_doi),
        }
    }

    /// Normalize a raw JSON item as returned by the library API.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawItem = serde_json::from_value(value)
            .map_err(|e| CitegraphError::MalformedItem(e.to_string()))?;
        Self::try_from(raw)
    }
}

/// Raw library item, only the fields we read.
#[derive(Debug, Default, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub data: RawItemData,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawItemData {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,
}

impl TryFrom<RawItem> for PaperRecord {
    type Error = CitegraphError;

    fn try_from(raw: RawItem) -> Result<Self> {
        let key = raw
            .key
            .or(raw.data.key)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CitegraphError::MalformedItem("item has no key".to_string()))?;

        Ok(Self::new(
            key,
            raw.data.title.as_deref(),
            raw.data.doi.as_deref(),
        ))
    }
}

/// Trim a DOI and strip resolver URL or `doi:` prefixes.
///
/// Case is preserved. Returns `None` when nothing is left.
pub fn normalize_doi(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = DOI_PREFIX_REGEX.replace(trimmed, "").trim().to_string();

    (!stripped.is_empty()).then_some(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_full_item() -> Result<()> {
        let paper = PaperRecord::from_value(json!({
            "key": "KEY_A",
            "data": {
                "version": 1,
                "itemType": "journalArticle",
                "title": "Paper A",
                "DOI": "10.1/A"
            }
        }))?;

        assert_eq!(paper.key, "KEY_A");
        assert_eq!(paper.title, "Paper A");
        assert_eq!(paper.doi.as_deref(), Some("10.1/A"));
        Ok(())
    }

    #[test]
    fn test_missing_title_and_doi() -> Result<()> {
        let paper = PaperRecord::from_value(json!({
            "key": "KEY_X",
            "data": { "title": null, "DOI": "   " }
        }))?;

        assert_eq!(paper.title, UNTITLED);
        assert_eq!(paper.doi, None);

        let blank = PaperRecord::from_value(json!({ "key": "K", "data": { "title": "  " } }))?;
        assert_eq!(blank.title, UNTITLED);
        Ok(())
    }

    #[test]
    fn test_key_falls_back_to_data() -> Result<()> {
        let paper = PaperRecord::from_value(json!({ "data": { "key": "INNER", "DOI": "10.2/b" } }))?;
        assert_eq!(paper.key, "INNER");
        Ok(())
    }

    #[test]
    fn test_missing_key_is_malformed() {
        let result = PaperRecord::from_value(json!({ "data": { "title": "No key" } }));
        assert!(matches!(result, Err(CitegraphError::MalformedItem(_))));

        let not_an_object = PaperRecord::from_value(json!("KEY_A"));
        assert!(matches!(not_an_object, Err(CitegraphError::MalformedItem(_))));
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(normalize_doi(" 10.1/A ").as_deref(), Some("10.1/A"));
        assert_eq!(normalize_doi("https://doi.org/10.1/A").as_deref(), Some("10.1/A"));
        assert_eq!(normalize_doi("http://dx.doi.org/10.1/A").as_deref(), Some("10.1/A"));
        assert_eq!(normalize_doi("doi: 10.1/MixedCase").as_deref(), Some("10.1/MixedCase"));
        assert_eq!(normalize_doi(""), None);
        assert_eq!(normalize_doi("https://doi.org/"), None);
    }
}
