//! Typed view of a Custom Search response payload
//!
//! Only the fields used by URL extraction are modelled; everything else in the raw
//! payload is ignored here and kept verbatim in storage.

use serde::Deserialize;
use serde_json::Value;

/// The subset of a search response used for URL extraction
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPayload {
    #[serde(default)]
    pub items: Vec<SearchItem>,

    #[serde(default)]
    pub spelling: Option<Spelling>,

    #[serde(rename = "searchInformation", default)]
    pub search_information: Option<SearchInformation>,
}

/// One result item
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub link: Option<String>,
}

/// Spelling suggestion block
#[derive(Debug, Clone, Deserialize)]
pub struct Spelling {
    #[serde(rename = "correctedQuery", default)]
    pub corrected_query: Option<String>,
}

/// Result-count summary block
#[derive(Debug, Clone, Deserialize)]
pub struct SearchInformation {
    /// The API reports this as a string ("0"), but numbers are accepted too
    #[serde(rename = "totalResults", default)]
    pub total_results: Option<Value>,
}

impl SearchPayload {
    /// Links of all items that carry one, in result order
    pub fn links(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| item.link.as_deref())
            .collect()
    }

    pub fn corrected_query(&self) -> Option<&str> {
        self.spelling.as_ref()?.corrected_query.as_deref()
    }

    /// Reported total result count, if present and numeric
    pub fn total_results(&self) -> Option<u64> {
        match self.search_information.as_ref()?.total_results.as_ref()? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }
}
