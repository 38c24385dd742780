//! Refresh cached sheet rows from an upstream source.

use serde::Serialize;

use crate::error::Result;
use crate::source::RowSource;
use crate::storage::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshStatus {
    /// Rows were fetched and the cache replaced.
    Refreshed,
    /// The cache was still within its TTL; nothing fetched.
    Fresh,
    /// The upstream fetch failed; the previous cache (if any) is kept.
    Failed,
}

/// Report returned after refreshing one sheet.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub key: String,
    pub status: RefreshStatus,
    pub rows: usize,
    pub error: Option<String>,
}

impl RefreshReport {
    fn new(key: &str, status: RefreshStatus, rows: usize) -> Self {
        Self {
            key: key.to_string(),
            status,
            rows,
            error: None,
        }
    }
}

/// Re-fetch `key` from `upstream` into the cache when forced or stale.
///
/// Upstream failures are reported, not returned; only cache errors surface
/// as `Err`.
pub async fn refresh_sheet<S: RowSource>(
    db: &Database,
    upstream: &S,
    key: &str,
    display_name: Option<&str>,
    force: bool,
) -> Result<RefreshReport> {
    if !force && !db.is_stale(key).await? {
        let rows = db.sheet_meta(key).await?.map(|m| m.row_count).unwrap_or(0);
        log::debug!("'{key}' is fresh ({rows} rows cached)");
        return Ok(RefreshReport::new(key, RefreshStatus::Fresh, rows));
    }

    let rows = match upstream.fetch_rows(key).await {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("Failed to refresh '{key}': {e}");
            let mut report = RefreshReport::new(key, RefreshStatus::Failed, 0);
            report.error = Some(e.to_string());
            return Ok(report);
        }
    };

    let count = rows.len();
    db.store_rows(key, display_name, rows).await?;
    Ok(RefreshReport::new(key, RefreshStatus::Refreshed, count))
}

/// Refresh several sheets in order. A cache error on one sheet is recorded
/// in its report and does not stop the rest.
pub async fn refresh_all<S: RowSource>(
    db: &Database,
    upstream: &S,
    keys: &[String],
    force: bool,
) -> Vec<RefreshReport> {
    let mut reports = Vec::with_capacity(keys.len());
    for key in keys {
        let report = match refresh_sheet(db, upstream, key, None, force).await {
            Ok(report) => report,
            Err(e) => {
                log::error!("Cache error while refreshing '{key}': {e}");
                let mut report = RefreshReport::new(key, RefreshStatus::Failed, 0);
                report.error = Some(e.to_string());
                report
            }
        };
        reports.push(report);
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::JsonDirSource;
    use std::time::Duration;

    fn write_sheet(dir: &std::path::Path, key: &str, body: &str) {
        std::fs::write(dir.join(format!("{key}.json")), body).unwrap();
    }

    #[tokio::test]
    async fn test_refresh_stale_then_fresh() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(dir.path(), "sales", r#"[["type"], ["LAG", "Revenue"]]"#);
        let upstream = JsonDirSource::new(dir.path());
        let db = Database::open_memory().await.unwrap();

        let first = refresh_sheet(&db, &upstream, "sales", Some("Sales"), false)
            .await
            .unwrap();
        assert_eq!(first.status, RefreshStatus::Refreshed);
        assert_eq!(first.rows, 2);

        let second = refresh_sheet(&db, &upstream, "sales", None, false)
            .await
            .unwrap();
        assert_eq!(second.status, RefreshStatus::Fresh);
        assert_eq!(second.rows, 2);

        let forced = refresh_sheet(&db, &upstream, "sales", None, true)
            .await
            .unwrap();
        assert_eq!(forced.status, RefreshStatus::Refreshed);
    }

    #[tokio::test]
    async fn test_refresh_expired_ttl() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(dir.path(), "hr", r#"[["LAG", "Hiring"]]"#);
        let upstream = JsonDirSource::new(dir.path());
        let db = Database::open_memory().await.unwrap().with_ttl(Duration::ZERO);

        refresh_sheet(&db, &upstream, "hr", None, false).await.unwrap();
        let again = refresh_sheet(&db, &upstream, "hr", None, false).await.unwrap();
        assert_eq!(again.status, RefreshStatus::Refreshed);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(dir.path(), "it", r#"[["LAG", "Uptime"]]"#);
        let upstream = JsonDirSource::new(dir.path());
        let db = Database::open_memory().await.unwrap();
        refresh_sheet(&db, &upstream, "it", None, false).await.unwrap();

        write_sheet(dir.path(), "it", "broken");
        let report = refresh_sheet(&db, &upstream, "it", None, true).await.unwrap();
        assert_eq!(report.status, RefreshStatus::Failed);
        assert!(report.error.is_some());
        assert_eq!(db.fetch_rows("it").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_all() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(dir.path(), "a", r#"[["LAG", "A"]]"#);
        let upstream = JsonDirSource::new(dir.path());
        let db = Database::open_memory().await.unwrap();

        let reports = refresh_all(&db, &upstream, &["a".to_string(), "missing".to_string()], false).await;
        let statuses: Vec<RefreshStatus> = reports.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![RefreshStatus::Refreshed, RefreshStatus::Failed]);
    }
}
