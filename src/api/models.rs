//! API models for the AutoBill transaction log.
//!
//! - `POST /api/transactions` accepts a loose JSON object that is coerced into
//!   a [`NewTransaction`] (see [`crate::api::validation`])
//! - `GET /api/transactions` returns [`TransactionSummary`] rows, newest first
//! - `GET /api/stream` emits full [`Transaction`] rows as server-sent events
//!
//! A complete ingestion payload:
//!
//! ```json
//! {
//!   "name": "bananas",
//!   "price": 1.5,
//!   "units": "kg",
//!   "taken": 2,
//!   "payable": 3.0
//! }
//! ```
//!
//! Only `name` is required. The snapshot view leaves out `units`; the stream
//! view carries every column.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::observability::MetricsSnapshot;

pub const DEFAULT_UNITS: &str = "units";
pub const DEFAULT_TAKEN: i64 = 1;

/// A validated transaction waiting to be appended to the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub name: String,
    pub price: f64,
    pub units: String,
    pub taken: i64,
    pub payable: f64,
}

impl NewTransaction {
    /// A transaction with every optional field at its default
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: 0.0,
            units: DEFAULT_UNITS.to_string(),
            taken: DEFAULT_TAKEN,
            payable: 0.0,
        }
    }
}

/// A stored transaction, as emitted on the stream
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub units: String,
    pub taken: i64,
    pub payable: f64,
    /// RFC 3339, UTC
    pub created_at: String,
}

/// Snapshot view of a stored transaction (no `units`)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TransactionSummary {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub taken: i64,
    pub payable: f64,
    pub created_at: String,
}

impl From<Transaction> for TransactionSummary {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            name: tx.name,
            price: tx.price,
            taken: tx.taken,
            payable: tx.payable,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngestResponse {
    pub status: String,
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
}
