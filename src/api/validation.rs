//! Coercion of ingestion bodies into [`NewTransaction`].
//!
//! Clients send loosely typed JSON, so numeric fields accept numbers,
//! booleans and numeric strings. Absent or `null` optional fields take their
//! defaults; present values that cannot be read as numbers are rejected.

use serde_json::{Map, Value};
use thiserror::Error;

use super::models::NewTransaction;

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("malformed JSON body: {0}")]
    MalformedJson(String),
    #[error("body must be a JSON object")]
    NotAnObject,
    #[error("Missing 'name'")]
    MissingName,
    #[error("field '{field}' must be a number, got {value}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field '{field}' must be an integer, got {value}")]
    InvalidInteger { field: &'static str, value: String },
}

/// Parses a raw request body into a transaction ready for the store
pub fn parse_transaction(body: &[u8]) -> Result<NewTransaction, PayloadError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| PayloadError::MalformedJson(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(PayloadError::NotAnObject);
    };

    transaction_from_fields(&fields)
}

fn transaction_from_fields(fields: &Map<String, Value>) -> Result<NewTransaction, PayloadError> {
    let name = present(fields, "name")
        .map(text)
        .ok_or(PayloadError::MissingName)?;

    let mut tx = NewTransaction::named(name);

    if let Some(value) = present(fields, "price") {
        tx.price = number("price", value)?;
    }
    if let Some(value) = present(fields, "units") {
        tx.units = text(value);
    }
    if let Some(value) = present(fields, "taken") {
        tx.taken = integer("taken", value)?;
    }
    if let Some(value) = present(fields, "payable") {
        tx.payable = number("payable", value)?;
    }

    Ok(tx)
}

/// A field counts as given only when it is not `null`
fn present<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn number(field: &'static str, value: &Value) -> Result<f64, PayloadError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| PayloadError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn integer(field: &'static str, value: &Value) -> Result<i64, PayloadError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            // Floats truncate toward zero; out-of-range values are rejected.
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| PayloadError::InvalidInteger {
        field,
        value: value.to_string(),
    })
}
