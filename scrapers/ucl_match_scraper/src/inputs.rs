use serde_json::Value;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::{canonical::canonicalize, error::ResolveError, types::CanonicalReference};

/// Everything the user pointed us at. All sources are optional.
#[derive(Debug, Clone, Default)]
pub struct InputSources {
    pub tokens: Vec<String>,
    pub from_json: Option<PathBuf>,
    pub from_csv: Option<PathBuf>,
}

/// Gathers tokens from JSON, then CSV, then positional arguments, and
/// returns the distinct canonical references in first-seen order.
pub fn resolve_inputs(sources: &InputSources) -> Result<Vec<CanonicalReference>, ResolveError> {
    let mut raw = Vec::new();

    if let Some(path) = &sources.from_json {
        let tokens = read_json_tokens(path)?;
        info!("Read {} tokens from {:?}", tokens.len(), path);
        raw.extend(tokens);
    }

    if let Some(path) = &sources.from_csv {
        let tokens = read_csv_tokens(path)?;
        info!("Read {} tokens from {:?}", tokens.len(), path);
        raw.extend(tokens);
    }

    raw.extend(sources.tokens.iter().cloned());

    let references = dedup_references(&raw);
    if references.is_empty() {
        return Err(ResolveError::NoReferences);
    }

    info!(
        "Resolved {} unique matches from {} raw inputs",
        references.len(),
        raw.len()
    );
    Ok(references)
}

pub fn dedup_references<S: AsRef<str>>(raw: &[S]) -> Vec<CanonicalReference> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for token in raw {
        match canonicalize(token.as_ref()) {
            Some(reference) => {
                if seen.insert(reference.match_id.clone()) {
                    references.push(reference);
                }
            }
            None => debug!("Dropping input without a match id: {:?}", token.as_ref()),
        }
    }

    references
}

fn read_json_tokens(path: &Path) -> Result<Vec<String>, ResolveError> {
    let data = fs::read_to_string(path).map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&data).map_err(|source| ResolveError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(json_tokens(value))
}

fn json_tokens(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn read_csv_tokens(path: &Path) -> Result<Vec<String>, ResolveError> {
    let data = fs::read_to_string(path).map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    csv_tokens(&data).map_err(|source| ResolveError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the `url` column when the header has one, otherwise treats every
/// line as a raw value.
pub fn csv_tokens(data: &str) -> Result<Vec<String>, csv::Error> {
    let lines: Vec<&str> = data.lines().filter(|line| !line.trim().is_empty()).collect();
    let Some(header) = lines.first() else {
        return Ok(Vec::new());
    };

    let delimiter = if header.contains(';') { b';' } else { b',' };
    let url_column = split_cells(header)
        .iter()
        .position(|cell| cell.eq_ignore_ascii_case("url"));

    let Some(url_column) = url_column else {
        return Ok(lines.iter().map(|line| strip_quotes(line).to_string()).collect());
    };

    let body = lines[1..].join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(body.as_bytes());

    let mut tokens = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(cell) = record.get(url_column).map(str::trim) {
            if !cell.is_empty() {
                tokens.push(cell.to_string());
            }
        }
    }
    Ok(tokens)
}

fn split_cells(line: &str) -> Vec<&str> {
    line.split([';', ','])
        .map(|cell| strip_quotes(cell.trim()))
        .collect()
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}
