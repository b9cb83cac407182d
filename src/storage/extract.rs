//! URL extraction from raw search payloads

use crate::provider::SearchPayload;

/// Separator between links in `urls.urls`
pub const URL_SEPARATOR: &str = "; ";

/// Note for a term the provider found nothing for
pub const NOTE_NO_RESULTS: &str = "no results for this term";

/// Note for a payload without items whose reported total is not zero
pub const NOTE_UNEXPECTED: &str = "unexpected: zero items despite nonzero reported total";

/// Fields derived from one successful payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedUrls {
    pub corrected_term: Option<String>,
    pub urls: Option<String>,
    pub note: Option<String>,
}

/// Derives the url-table fields from a raw JSON payload
///
/// Items without a `link` are ignored; a payload whose items carry no link at all is
/// treated like one without items. A missing or non-numeric total counts as nonzero.
pub fn extract_url_fields(raw: &str) -> Result<ExtractedUrls, serde_json::Error> {
    let payload: SearchPayload = serde_json::from_str(raw)?;
    let links = payload.links();

    let (urls, note) = if !links.is_empty() {
        (Some(links.join(URL_SEPARATOR)), None)
    } else if payload.total_results() == Some(0) {
        (None, Some(NOTE_NO_RESULTS.to_string()))
    } else {
        (None, Some(NOTE_UNEXPECTED.to_string()))
    };

    Ok(ExtractedUrls {
        corrected_term: payload.corrected_query().map(str::to_string),
        urls,
        note,
    })
}
