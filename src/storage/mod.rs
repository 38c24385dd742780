pub mod repository;
pub mod schema;

use std::time::Duration;

use chrono::Utc;

use crate::config::{Config, DEFAULT_CACHE_TTL};
use crate::error::{Error, Result};
use crate::row::RawRow;
use crate::source::RowSource;

pub use repository::SheetMeta;

/// Database wraps two `tokio_rusqlite::Connection` instances (writer + reader)
/// in WAL mode. Writes are serialized through the writer; reads go through
/// the reader without blocking on them.
#[derive(Clone)]
pub struct Database {
    writer: tokio_rusqlite::Connection,
    reader: tokio_rusqlite::Connection,
    ttl: Duration,
}

impl Database {
    /// Open the database at the default path (`~/.wigmetrics/wigmetrics.db`).
    pub async fn open() -> Result<Self> {
        let dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".wigmetrics");
        std::fs::create_dir_all(&dir).map_err(|e| Error::Config(e.to_string()))?;
        Self::open_at(dir.join("wigmetrics.db")).await
    }

    /// Open the database at the given path.
    pub async fn open_at(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("opening database at {}", path.display());

        let writer = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_writer(&writer).await?;

        let reader = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_reader(&reader).await?;

        Ok(Self {
            writer,
            reader,
            ttl: DEFAULT_CACHE_TTL,
        })
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> Result<Self> {
        let writer = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::init_writer(&writer).await?;

        // In-memory databases are per-connection, so both roles share one.
        Ok(Self {
            reader: writer.clone(),
            writer,
            ttl: DEFAULT_CACHE_TTL,
        })
    }

    async fn init_writer(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA foreign_keys=ON;\
                 PRAGMA busy_timeout=5000;",
            )
            .map_err(|e| e.to_string())?;
            schema::migrations()
                .to_latest(conn)
                .map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .map_err(|e| Error::Migration(e.to_string()))
    }

    async fn init_reader(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA foreign_keys=ON;\
                 PRAGMA busy_timeout=5000;",
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await?;
        Ok(())
    }

    pub fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.writer
    }

    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        &self.reader
    }

    /// Lifetime of cached rows before `is_stale` reports true.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn load_config(&self) -> Result<Config> {
        let pairs = self
            .reader
            .call(|conn| repository::list_config(conn))
            .await?;
        Config::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub async fn store_rows(
        &self,
        key: &str,
        display_name: Option<&str>,
        rows: Vec<RawRow>,
    ) -> Result<()> {
        let key = key.to_string();
        let display_name = display_name.map(str::to_string);
        let count = rows.len();
        self.writer
            .call({
                let key = key.clone();
                move |conn| {
                    repository::replace_sheet_rows(
                        conn,
                        &key,
                        display_name.as_deref(),
                        &rows,
                        Utc::now(),
                    )
                }
            })
            .await?;
        log::info!("cached {count} rows for '{key}'");
        Ok(())
    }

    pub async fn sheet_meta(&self, key: &str) -> Result<Option<SheetMeta>> {
        let key = key.to_string();
        Ok(self
            .reader
            .call(move |conn| repository::get_sheet_meta(conn, &key))
            .await?)
    }

    pub async fn list_sheets(&self) -> Result<Vec<SheetMeta>> {
        Ok(self.reader.call(|conn| repository::list_sheets(conn)).await?)
    }

    pub async fn delete_sheet(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        Ok(self
            .writer
            .call(move |conn| repository::delete_sheet(conn, &key))
            .await?)
    }
}

impl RowSource for Database {
    async fn fetch_rows(&self, key: &str) -> Result<Vec<RawRow>> {
        let owned = key.to_string();
        let rows = self
            .reader
            .call(move |conn| repository::load_sheet_rows(conn, &owned))
            .await?;
        if rows.is_empty() && self.sheet_meta(key).await?.is_none() {
            return Err(Error::NotFound(format!("sheet '{key}' is not cached")));
        }
        Ok(rows)
    }

    async fn is_stale(&self, key: &str) -> Result<bool> {
        let Some(meta) = self.sheet_meta(key).await? else {
            return Ok(true);
        };
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        Ok(meta.age(Utc::now()) >= ttl)
    }
}
