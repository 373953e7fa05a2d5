use regex::Regex;
use std::sync::LazyLock;

use crate::types::ExtractionRecord;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*").unwrap());

/// Collapses whitespace runs to a single space and trims.
pub fn collapse_whitespace(input: &str) -> String {
    WHITESPACE.replace_all(input, " ").trim().to_string()
}

/// Like [`collapse_whitespace`], plus exactly one space after every comma.
pub fn normalize_date(input: &str) -> String {
    let collapsed = WHITESPACE.replace_all(input, " ");
    COMMA.replace_all(&collapsed, ", ").trim().to_string()
}

/// Team names keep their inner spacing; only the ends are trimmed.
pub fn normalize_record(record: ExtractionRecord) -> ExtractionRecord {
    ExtractionRecord {
        home: record.home.trim().to_string(),
        away: record.away.trim().to_string(),
        stadium_info: collapse_whitespace(&record.stadium_info),
        match_date: normalize_date(&record.match_date),
        ..record
    }
}
