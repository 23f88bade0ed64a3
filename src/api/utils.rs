//! API utility functions
//!
//! Pure, stateless helpers for pulling credentials and cursors out of
//! requests, kept apart from the handlers so they can be unit tested.

use axum::extract::Query;
use axum::http::{HeaderMap, Uri};
use serde::Deserialize;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct KeyQuery {
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CursorQuery {
    since: Option<String>,
}

/// Returns the key the caller presented.
///
/// The `x-api-key` header wins; an empty or non-ASCII header falls back to
/// the `api_key` query parameter.
pub fn presented_api_key(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let from_header = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned);

    from_header.or_else(|| {
        Query::<KeyQuery>::try_from_uri(uri)
            .ok()
            .and_then(|Query(query)| query.api_key)
    })
}

/// Starting cursor for a tail stream. Absent or unparsable values mean 0.
pub fn cursor_from_uri(uri: &Uri) -> i64 {
    Query::<CursorQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.since)
        .map(|since| parse_cursor(&since))
        .unwrap_or(0)
}

pub fn parse_cursor(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0)
}
