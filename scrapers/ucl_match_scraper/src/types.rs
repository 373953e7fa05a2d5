use serde::{Deserialize, Serialize};

/// A match identified by its numeric id, together with the one detail URL
/// every input shape for that id is rewritten to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalReference {
    pub match_id: String,
    pub url: String,
}

/// One output row. When `error` is set the text fields are empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub home: String,
    pub away: String,
    pub stadium_info: String,
    pub match_date: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionRecord {
    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
