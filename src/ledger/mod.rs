/// SQLite persistence layer for the transaction log
///
/// A single `transactions` table with an `AUTOINCREMENT` id column. The id is
/// the only cursor the stream endpoint uses: rows are appended, never updated
/// or deleted, so `id > cursor` scans observe every row exactly once.
///
/// Connections come from an r2d2 pool. WAL journaling lets the stream
/// endpoint's readers run alongside the ingestion writer; SQLite serializes
/// the writers itself.
///
/// ## Usage
///
/// ```rust,ignore
/// use autobill::ledger::TransactionStore;
///
/// let store = TransactionStore::open("transactions.db", 8, Duration::from_secs(5))?;
/// let tx = store.append(&NewTransaction::named("coffee"))?;
/// let newer = store.since(tx.id - 1, 100)?;
/// ```

pub mod error;
pub mod schema;
pub mod store;

pub use error::{LedgerError, Result};
pub use store::TransactionStore;
