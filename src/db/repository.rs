use super::connection::establish_connection;
use super::{TransactionStore, check_snapshot};
use crate::error::Result;
use crate::models::log::TransactionLog;
use crate::models::transaction::{Transaction, TransactionKind};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const NEXT_ID_KEY: &str = "next_id";

fn conversion_error(column: usize, err: impl Into<Box<dyn Error + Send + Sync>>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, err.into())
}

pub fn get_all_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, amount, category, note, timestamp FROM transactions ORDER BY position ASC",
    )?;

    let transaction_iter = stmt.query_map([], |row| {
        let kind_str: String = row.get(1)?;
        let amount_str: String = row.get(2)?;

        Ok(Transaction {
            id: row.get::<_, i64>(0)? as u64,
            kind: TransactionKind::from_str(&kind_str).map_err(|e| conversion_error(1, e))?,
            amount: Decimal::from_str(&amount_str).map_err(|e| conversion_error(2, e))?,
            category: row.get(3)?,
            note: row.get(4)?,
            timestamp: row.get(5)?,
        })
    })?;

    let mut transactions = Vec::new();
    for transaction in transaction_iter {
        transactions.push(transaction?);
    }
    Ok(transactions)
}

pub fn get_categories(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM categories ORDER BY position ASC")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

pub fn load_log(conn: &Connection) -> Result<TransactionLog> {
    let transactions = get_all_transactions(conn)?;
    let categories = get_categories(conn)?;
    let stored_next: Option<i64> = conn
        .query_row("SELECT value FROM meta WHERE key = ?1", [NEXT_ID_KEY], |row| row.get(0))
        .optional()?;
    let next_id = stored_next.map(|v| v as u64).unwrap_or(1);

    Ok(TransactionLog {
        transactions,
        categories,
        next_id,
    })
}

/// Replaces the stored snapshot with `log` inside one SQL transaction.
pub fn save_log(conn: &Connection, log: &TransactionLog) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM transactions", [])?;
    tx.execute("DELETE FROM categories", [])?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO transactions (id, position, kind, amount, category, note, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (position, t) in log.transactions.iter().enumerate() {
            insert.execute(params![
                t.id as i64,
                position as i64,
                t.kind.as_str(),
                t.amount.to_string(),
                &t.category,
                &t.note,
                t.timestamp,
            ])?;
        }

        let mut insert_category =
            tx.prepare("INSERT INTO categories (position, name) VALUES (?1, ?2)")?;
        for (position, name) in log.categories.iter().enumerate() {
            insert_category.execute(params![position as i64, name])?;
        }
    }
    tx.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![NEXT_ID_KEY, log.next_id as i64],
    )?;
    tx.commit()?;
    Ok(())
}

/// SQLite-backed store. One row per transaction, ordered by log position.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: establish_connection(path)?,
            path: path.to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: super::connection::establish_test_connection()?,
            path: PathBuf::from(":memory:"),
        })
    }
}

impl TransactionStore for SqliteStore {
    fn load(&self) -> Result<TransactionLog> {
        check_snapshot(load_log(&self.conn)?)
    }

    fn save(&self, log: &TransactionLog) -> Result<()> {
        save_log(&self.conn, log)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;

    fn create_test_log() -> TransactionLog {
        let mut log = TransactionLog::new();
        log.push(
            TransactionKind::Income,
            Decimal::new(150000, 2),
            "Salary".to_string(),
            "November".to_string(),
            1_731_000_000,
        );
        log.push(
            TransactionKind::Expense,
            Decimal::new(350, 2),
            "Food".to_string(),
            "Coffee".to_string(),
            1_731_100_000,
        );
        log
    }

    #[test]
    fn test_get_all_transactions_empty() {
        let conn = establish_test_connection().unwrap();

        let result = get_all_transactions(&conn);
        assert!(result.is_ok());
        assert_eq!(result.unwrap().len(), 0);
    }

    #[test]
    fn test_load_empty_database_defaults_next_id() {
        let conn = establish_test_connection().unwrap();
        let log = load_log(&conn).unwrap();
        assert!(log.is_empty());
        assert_eq!(log.next_id, 1);
    }

    #[test]
    fn test_save_then_load_keeps_snapshot() {
        let conn = establish_test_connection().unwrap();
        let log = create_test_log();

        save_log(&conn, &log).unwrap();
        let loaded = load_log(&conn).unwrap();

        assert_eq!(loaded, log);
        assert_eq!(loaded.transactions[1].amount, Decimal::from_str("3.50").unwrap());
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let conn = establish_test_connection().unwrap();
        let mut log = create_test_log();
        save_log(&conn, &log).unwrap();

        log.remove(1);
        save_log(&conn, &log).unwrap();

        let loaded = load_log(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.transactions[0].id, 2);
        assert_eq!(loaded.next_id, 3);
    }

    #[test]
    fn test_order_follows_log_position_not_id() {
        let conn = establish_test_connection().unwrap();
        let mut log = create_test_log();
        log.transactions.swap(0, 1);

        save_log(&conn, &log).unwrap();
        let ids: Vec<u64> = get_all_transactions(&conn).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_invalid_kind_rejected_by_schema() {
        let conn = establish_test_connection().unwrap();
        let result = conn.execute(
            "INSERT INTO transactions (id, position, kind, amount, category, note, timestamp)
             VALUES (1, 0, 'transfer', '1', '', '', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unparseable_amount_is_reported() {
        let conn = establish_test_connection().unwrap();
        conn.execute(
            "INSERT INTO transactions (id, position, kind, amount, category, note, timestamp)
             VALUES (1, 0, 'expense', 'lots', '', '', 0)",
            [],
        )
        .unwrap();

        let result = get_all_transactions(&conn);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Database error"));
    }

    #[test]
    fn test_store_trait_roundtrip_in_memory() {
        let store = SqliteStore::in_memory().unwrap();
        let log = create_test_log();
        store.save(&log).unwrap();
        assert_eq!(store.load().unwrap().category_catalog(), vec!["Food", "Salary"]);
    }
}
