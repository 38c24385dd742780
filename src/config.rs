use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::row::SheetLayout;

/// Default cache lifetime for sheet rows.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

pub const KEY_CACHE_TTL: &str = "cache.ttl_seconds";
pub const KEY_INDICATOR_HEADER: &str = "layout.indicator_header";
const LAYOUT_PREFIX: &str = "layout.";
const DEPARTMENT_PREFIX: &str = "department.";

/// Runtime settings, read from the `app_config` key/value table.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub layout: SheetLayout,
    pub cache_ttl: Duration,
    /// Department code -> display name.
    pub departments: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: SheetLayout::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            departments: BTreeMap::new(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}

impl Config {
    /// Build a config from stored pairs. Unknown keys are ignored.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut config = Config::default();
        for (key, value) in pairs {
            config.apply(key, value)?;
        }
        Ok(config)
    }

    /// Apply a single key. Also used to validate `config set`.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        if key == KEY_CACHE_TTL {
            self.cache_ttl = Duration::from_secs(parse_number(key, value)?);
        } else if key == KEY_INDICATOR_HEADER {
            self.layout.indicator_header = value.trim().to_string();
        } else if let Some(column) = key.strip_prefix(LAYOUT_PREFIX) {
            let slot = match column {
                "type_column" => &mut self.layout.type_column,
                "name_column" => &mut self.layout.name_column,
                "indicator_column" => &mut self.layout.indicator_column,
                "classification_column" => &mut self.layout.classification_column,
                "first_month_column" => &mut self.layout.first_month_column,
                _ => return Err(Error::Config(format!("unknown layout key: {key}"))),
            };
            *slot = parse_number(key, value)?;
        } else if let Some(code) = key.strip_prefix(DEPARTMENT_PREFIX) {
            if code.is_empty() {
                return Err(Error::Config("department code is empty".into()));
            }
            self.departments
                .insert(code.to_string(), value.trim().to_string());
        } else {
            log::debug!("ignoring config key {key}");
        }
        Ok(())
    }

    /// Display name for a department, falling back to the upper-cased code.
    pub fn department_name(&self, code: &str) -> String {
        self.departments
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_pairs(Vec::<(&str, &str)>::new()).unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.layout, SheetLayout::default());
        assert!(config.departments.is_empty());
    }

    #[test]
    fn test_from_pairs() {
        let config = Config::from_pairs([
            ("cache.ttl_seconds", "60"),
            ("layout.first_month_column", "10"),
            ("layout.indicator_header", "Indicators"),
            ("department.hr", "Human Resources"),
            ("user_name", "ignored"),
        ])
        .unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.layout.first_month_column, 10);
        assert_eq!(config.layout.indicator_header, "Indicators");
        assert_eq!(config.department_name("hr"), "Human Resources");
        assert_eq!(config.department_name("it"), "IT");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_pairs([("cache.ttl_seconds", "soon")]),
            Err(Error::Config(_))
        ));
        assert!(Config::from_pairs([("layout.width", "3")]).is_err());
        assert!(Config::from_pairs([("department.", "x")]).is_err());
    }
}
