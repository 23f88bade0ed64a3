//! Table layout and per-connection pragmas.

use rusqlite::Connection;
use std::time::Duration;

/// `AUTOINCREMENT` keeps ids from being reused after the highest row is removed.
const CREATE_TRANSACTIONS: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    price REAL,
    units TEXT,
    taken INTEGER,
    payable REAL,
    created_at TEXT
)";

/// Column list shared by every read so row mapping stays positional.
pub const SELECT_COLUMNS: &str = "id, name, price, units, taken, payable, created_at";

/// Applies pragmas to a freshly opened connection.
///
/// `busy_timeout` goes first so the WAL switch waits on other connections
/// instead of failing.
pub fn apply_pragmas(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_TRANSACTIONS)
}
