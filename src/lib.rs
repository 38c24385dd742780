pub mod aggregate;
pub mod config;
pub mod date_util;
pub mod error;
pub mod metrics;
pub mod row;
pub mod source;
pub mod storage;
pub mod sync;
pub mod tree;
pub mod window;

pub use config::Config;
pub use error::{Error, Result};
pub use metrics::display::{CardGroup, Status};
pub use metrics::{DepartmentRows, DepartmentSummary, MeasureNode, NodeKind};
pub use row::{Classification, RawRow, Row, SheetLayout};
pub use source::{JsonDirSource, RowSource};
pub use storage::{Database, SheetMeta};
pub use sync::{RefreshReport, RefreshStatus};
pub use window::{MonthKey, TimeWindow, WindowKind};

use storage::repository;

/// Main entry point: cached plan sheets plus the settings used to read them.
pub struct WigMetrics {
    db: Database,
    config: Config,
}

impl WigMetrics {
    /// Load settings from the database and apply the configured cache TTL.
    pub async fn open(db: Database) -> Result<Self> {
        let config = db.load_config().await?;
        let db = db.with_ttl(config.cache_ttl);
        Ok(Self { db, config })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ── Sheets ───────────────────────────────────────────────────

    /// Store raw rows for `key`, replacing any cached copy.
    pub async fn import_rows(
        &self,
        key: &str,
        display_name: Option<&str>,
        rows: Vec<RawRow>,
    ) -> Result<()> {
        self.db.store_rows(key, display_name, rows).await
    }

    pub async fn refresh<S: RowSource>(
        &self,
        upstream: &S,
        keys: &[String],
        force: bool,
    ) -> Vec<RefreshReport> {
        sync::refresh_all(&self.db, upstream, keys, force).await
    }

    /// Cached rows for `key`, parsed with the configured layout.
    pub async fn rows(&self, key: &str) -> Result<Vec<Row>> {
        let raw = self.db.fetch_rows(key).await?;
        Ok(self.config.layout.rows(&raw))
    }

    pub async fn list_sheets(&self) -> Result<Vec<SheetMeta>> {
        self.db.list_sheets().await
    }

    pub async fn remove_sheet(&self, key: &str) -> Result<()> {
        if !self.db.delete_sheet(key).await? {
            return Err(Error::NotFound(format!("sheet '{key}'")));
        }
        Ok(())
    }

    // ── Measures ─────────────────────────────────────────────────

    pub async fn measures(&self, key: &str, window: &TimeWindow) -> Result<Vec<MeasureNode>> {
        let rows = self.rows(key).await?;
        Ok(metrics::assemble(&rows, window))
    }

    /// LEAD nodes under the card `lag_id`.
    pub async fn leads(
        &self,
        key: &str,
        lag_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<MeasureNode>> {
        let measures = self.measures(key, window).await?;
        metrics::display::find_node(&measures, lag_id)
            .map(|n| n.leads.clone())
            .ok_or_else(|| Error::NotFound(format!("measure '{lag_id}' in sheet '{key}'")))
    }

    /// Rows of one department. The display name comes from the cached sheet,
    /// then from `department.<code>` config, then the upper-cased key.
    pub async fn department(&self, key: &str) -> Result<DepartmentRows> {
        let rows = self.rows(key).await?;
        let display_name = match self.db.sheet_meta(key).await?.and_then(|m| m.display_name) {
            Some(name) => name,
            None => self.config.department_name(key),
        };
        Ok(DepartmentRows {
            code: key.to_string(),
            display_name,
            rows,
        })
    }

    async fn departments(&self, keys: &[String]) -> Result<Vec<DepartmentRows>> {
        let mut departments = Vec::with_capacity(keys.len());
        for key in keys {
            departments.push(self.department(key).await?);
        }
        Ok(departments)
    }

    pub async fn overview(
        &self,
        keys: &[String],
        window: &TimeWindow,
    ) -> Result<Vec<DepartmentSummary>> {
        let departments = self.departments(keys).await?;
        Ok(metrics::department_overview(&departments, window))
    }

    /// Every department's measures in one list, names and ids prefixed.
    pub async fn all_measures(
        &self,
        keys: &[String],
        window: &TimeWindow,
    ) -> Result<Vec<MeasureNode>> {
        let departments = self.departments(keys).await?;
        Ok(metrics::assemble_departments(&departments, window))
    }

    // ── Config ───────────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        Ok(self
            .db
            .reader()
            .call(move |conn| repository::get_config(conn, &key))
            .await?)
    }

    /// Validate and store a setting; it takes effect on the next `open`.
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        self.config.clone().apply(key, value)?;
        let (key, value) = (key.to_string(), value.to_string());
        self.db
            .writer()
            .call(move |conn| repository::set_config(conn, &key, &value))
            .await?;
        Ok(())
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A header row plus plan rows with January (target, achieved) cells.
    fn sheet(rows: &[(&str, &str, &str, &str)]) -> Vec<RawRow> {
        let layout = SheetLayout::default();
        let width = layout.first_month_column + 24;
        let mut header = vec![String::new(); width];
        header[layout.indicator_column] = "المؤشرات".to_string();

        let mut out = vec![header];
        for (marker, name, target, achieved) in rows {
            let mut r = vec![String::new(); width];
            r[layout.type_column] = marker.to_string();
            r[layout.name_column] = name.to_string();
            r[layout.first_month_column] = target.to_string();
            r[layout.first_month_column + 1] = achieved.to_string();
            out.push(r);
        }
        out
    }

    fn january() -> TimeWindow {
        TimeWindow::parse("2025-01").unwrap()
    }

    async fn app() -> WigMetrics {
        WigMetrics::open(Database::open_memory().await.unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_import_and_measures() {
        let app = app().await;
        app.import_rows(
            "ops",
            None,
            sheet(&[("LAG", "Output", "100", "80"), ("LEAD", "Shifts", "10", "10")]),
        )
        .await
        .unwrap();

        let measures = app.measures("ops", &january()).await.unwrap();
        assert_eq!(measures.len(), 1);
        assert_eq!((measures[0].value, measures[0].target), (80.0, 100.0));

        let id = measures[0].id.clone();
        let leads = app.leads("ops", &id, &january()).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].name, "Shifts");

        assert!(matches!(
            app.leads("ops", "lag_99", &january()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_overview_uses_department_names() {
        let db = Database::open_memory().await.unwrap();
        let app = WigMetrics::open(db.clone()).await.unwrap();
        app.config_set("department.hr", "Human Resources").await.unwrap();

        let app = WigMetrics::open(db).await.unwrap();
        app.import_rows("hr", None, sheet(&[("LAG", "Hiring", "10", "5")]))
            .await
            .unwrap();
        app.import_rows("it", Some("Technology"), sheet(&[("LAG", "Uptime", "10", "10")]))
            .await
            .unwrap();

        let keys = vec!["hr".to_string(), "it".to_string()];
        let overview = app.overview(&keys, &january()).await.unwrap();
        assert_eq!(overview[0].display_name, "Human Resources");
        assert_eq!(overview[0].health, 50.0);
        assert_eq!(overview[1].display_name, "Technology");
        assert_eq!(overview[1].health, 100.0);

        let all = app.all_measures(&keys, &january()).await.unwrap();
        assert_eq!(all[0].name, "Human Resources: Hiring");
        assert!(all[1].id.starts_with("it_"));
    }

    #[tokio::test]
    async fn test_config_set_validates() {
        let app = app().await;
        assert!(app.config_set("cache.ttl_seconds", "abc").await.is_err());
        assert_eq!(app.config_get("cache.ttl_seconds").await.unwrap(), None);

        app.config_set("cache.ttl_seconds", "42").await.unwrap();
        assert_eq!(app.config_list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_missing_sheet() {
        let app = app().await;
        assert!(matches!(
            app.remove_sheet("nope").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(app.rows("nope").await, Err(Error::NotFound(_))));
    }
}
