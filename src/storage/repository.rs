use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::row::RawRow;

/// Cached sheet metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetMeta {
    pub key: String,
    pub display_name: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub row_count: usize,
}

impl SheetMeta {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.fetched_at
    }
}

fn to_sql_err(e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(e))
}

// ── Sheets ─────────────────────────────────────────────────────────

/// Replace every cached row of a sheet in one transaction.
pub fn replace_sheet_rows(
    conn: &mut Connection,
    key: &str,
    display_name: Option<&str>,
    rows: &[RawRow],
    fetched_at: DateTime<Utc>,
) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO sheets (sheet_key, display_name, fetched_at, row_count)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(sheet_key) DO UPDATE SET
           display_name = COALESCE(excluded.display_name, sheets.display_name),
           fetched_at = excluded.fetched_at,
           row_count = excluded.row_count",
        params![key, display_name, fetched_at.to_rfc3339(), rows.len() as i64],
    )?;
    tx.execute("DELETE FROM sheet_rows WHERE sheet_key = ?1", params![key])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO sheet_rows (sheet_key, row_index, cells_json) VALUES (?1, ?2, ?3)",
        )?;
        for (i, row) in rows.iter().enumerate() {
            let cells = serde_json::to_string(row).map_err(to_sql_err)?;
            stmt.execute(params![key, i as i64, cells])?;
        }
    }
    tx.commit()
}

pub fn load_sheet_rows(conn: &Connection, key: &str) -> Result<Vec<RawRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT cells_json FROM sheet_rows WHERE sheet_key = ?1 ORDER BY row_index",
    )?;
    let rows = stmt.query_map(params![key], |row| {
        let json: String = row.get(0)?;
        serde_json::from_str::<RawRow>(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
    })?;
    rows.collect()
}

fn meta_from_row(row: &rusqlite::Row) -> Result<SheetMeta, rusqlite::Error> {
    let fetched: String = row.get(2)?;
    let fetched_at = DateTime::parse_from_rfc3339(&fetched)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
    let row_count: i64 = row.get(3)?;
    Ok(SheetMeta {
        key: row.get(0)?,
        display_name: row.get(1)?,
        fetched_at,
        row_count: row_count.max(0) as usize,
    })
}

pub fn get_sheet_meta(conn: &Connection, key: &str) -> Result<Option<SheetMeta>, rusqlite::Error> {
    conn.query_row(
        "SELECT sheet_key, display_name, fetched_at, row_count FROM sheets WHERE sheet_key = ?1",
        params![key],
        meta_from_row,
    )
    .optional()
}

pub fn list_sheets(conn: &Connection) -> Result<Vec<SheetMeta>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT sheet_key, display_name, fetched_at, row_count FROM sheets ORDER BY sheet_key",
    )?;
    let rows = stmt.query_map([], meta_from_row)?;
    rows.collect()
}

/// Remove a sheet and its rows. Returns whether anything was deleted.
pub fn delete_sheet(conn: &Connection, key: &str) -> Result<bool, rusqlite::Error> {
    conn.execute("DELETE FROM sheet_rows WHERE sheet_key = ?1", params![key])?;
    let n = conn.execute("DELETE FROM sheets WHERE sheet_key = ?1", params![key])?;
    Ok(n > 0)
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn raw(rows: &[&[&str]]) -> Vec<RawRow> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                set_config(conn, "cache.ttl_seconds", "60")?;
                let val = get_config(conn, "cache.ttl_seconds")?;
                assert_eq!(val, Some("60".to_string()));

                let missing = get_config(conn, "nonexistent")?;
                assert_eq!(missing, None);

                set_config(conn, "department.hr", "HR")?;
                assert_eq!(list_config(conn)?.len(), 2);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sheet_rows_round_trip() {
        let db = Database::open_memory().await.unwrap();
        let now = Utc::now();

        db.writer()
            .call(move |conn| {
                let first = raw(&[&["type", "name"], &["LAG", "Sales"]]);
                replace_sheet_rows(conn, "sales", Some("Sales Dept"), &first, now)?;
                assert_eq!(load_sheet_rows(conn, "sales")?, first);

                // Replacing shrinks the sheet and keeps the display name.
                let second = raw(&[&["LAG", "Revenue"]]);
                replace_sheet_rows(conn, "sales", None, &second, now)?;
                assert_eq!(load_sheet_rows(conn, "sales")?, second);

                let meta = get_sheet_meta(conn, "sales")?.unwrap();
                assert_eq!(meta.display_name.as_deref(), Some("Sales Dept"));
                assert_eq!(meta.row_count, 1);
                assert_eq!(meta.fetched_at.timestamp(), now.timestamp());
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_and_delete_sheets() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let rows = raw(&[&["LAG", "A"]]);
                replace_sheet_rows(conn, "b", None, &rows, Utc::now())?;
                replace_sheet_rows(conn, "a", None, &rows, Utc::now())?;
                let keys: Vec<String> = list_sheets(conn)?.into_iter().map(|m| m.key).collect();
                assert_eq!(keys, vec!["a", "b"]);

                assert!(delete_sheet(conn, "a")?);
                assert!(!delete_sheet(conn, "a")?);
                assert!(load_sheet_rows(conn, "a")?.is_empty());
                assert!(get_sheet_meta(conn, "a")?.is_none());
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }
}
