use regex::Regex;
use std::sync::LazyLock;

use crate::types::CanonicalReference;

const DETAIL_URL_PREFIX: &str = "https://de.uefa.com/uefachampionsleague/match/";

// Digits and word boundaries are ASCII only; `\d` and `\b` would also
// accept other scripts' digits and letters.
static MATCH_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/match/([0-9]+)(?:[^A-Za-z0-9_]|$)").unwrap());
static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^A-Za-z0-9_])([0-9]{6,})(?:[^A-Za-z0-9_]|$)").unwrap());

/// Pulls the numeric match id out of any token shape: a `/match/<id>` path
/// segment wins, otherwise the first standalone run of at least six digits.
pub fn extract_match_id(token: &str) -> Option<&str> {
    MATCH_PATH
        .captures(token)
        .or_else(|| BARE_ID.captures(token))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

pub fn detail_url(match_id: &str) -> String {
    format!("{}{}/", DETAIL_URL_PREFIX, match_id)
}

/// Maps a raw token to its canonical reference. The URL is always rebuilt
/// from the id, never copied from the token.
pub fn canonicalize(token: &str) -> Option<CanonicalReference> {
    let match_id = extract_match_id(token.trim())?;
    Some(CanonicalReference {
        match_id: match_id.to_string(),
        url: detail_url(match_id),
    })
}
