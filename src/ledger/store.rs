use std::path::Path;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ValueRef;
use rusqlite::{Row, params};
use tracing::{debug, info};

use crate::api::models::{NewTransaction, Transaction};

use super::error::Result;
use super::schema::{SELECT_COLUMNS, apply_pragmas, initialize_schema};

/// SQLite-backed append-only transaction log.
///
/// Ids come from the `AUTOINCREMENT` primary key, so they are strictly
/// increasing in commit order and never reused. Cloning is cheap and shares
/// the underlying connection pool.
#[derive(Clone)]
pub struct TransactionStore {
    pool: Pool<SqliteConnectionManager>,
}

impl TransactionStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening transaction store at: {}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_customizer(Box::new(PragmaCustomizer { busy_timeout }))
            .build(manager)?;

        let conn = pool.get()?;
        initialize_schema(&conn)?;

        info!(pool_size, "Transaction store opened successfully");
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Append one row; `id` and `created_at` are assigned here.
    pub fn append(&self, new: &NewTransaction) -> Result<Transaction> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO transactions (name, price, units, taken, payable, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![new.name, new.price, new.units, new.taken, new.payable, created_at],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, name = %new.name, "Appended transaction");

        Ok(Transaction {
            id,
            name: new.name.clone(),
            price: new.price,
            units: new.units.clone(),
            taken: new.taken,
            payable: new.payable,
            created_at,
        })
    }

    /// Up to `limit` most recent rows, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SELECT_COLUMNS} FROM transactions ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![to_sql_limit(limit)], row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Up to `limit` rows with `id > cursor`, oldest first
    pub fn since(&self, cursor: i64, limit: usize) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SELECT_COLUMNS} FROM transactions WHERE id > ?1 ORDER BY id ASC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![cursor, to_sql_limit(limit)], row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Cheap liveness probe for health checks
    pub fn ping(&self) -> Result<()> {
        self.conn()?.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        name: text_column(row, 1)?,
        price: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
        units: text_column(row, 3)?,
        taken: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        payable: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
        created_at: text_column(row, 6)?,
    })
}

/// Text columns are untyped in SQLite; render whatever is stored.
fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    })
}

#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout: Duration,
}

impl r2d2::CustomizeConnection<rusqlite::Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> std::result::Result<(), rusqlite::Error> {
        apply_pragmas(conn, self.busy_timeout)
    }
}
