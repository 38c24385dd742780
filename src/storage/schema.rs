use rusqlite_migration::{Migrations, M};

const INITIAL: &str = "
CREATE TABLE IF NOT EXISTS sheets (
    sheet_key    TEXT PRIMARY KEY,
    display_name TEXT,
    fetched_at   TEXT NOT NULL,
    row_count    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS sheet_rows (
    sheet_key  TEXT NOT NULL REFERENCES sheets(sheet_key) ON DELETE CASCADE,
    row_index  INTEGER NOT NULL,
    cells_json TEXT NOT NULL,
    PRIMARY KEY (sheet_key, row_index)
);

CREATE TABLE IF NOT EXISTS app_config (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(INITIAL)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_validate() {
        assert!(migrations().validate().is_ok());
    }
}
