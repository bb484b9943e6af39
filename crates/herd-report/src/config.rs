use anyhow::{Context, Result};
use herd_core::Category;
use serde::Serialize;
use std::env;

#[derive(Debug, Clone, Serialize)]
pub struct ReportConfig {
    pub database_url: String,
    /// Only this category when set, otherwise all of them
    pub category: Option<Category>,
    /// Restrict the history to one field's counters
    pub field_id: Option<i64>,
    /// Append the monthly financial summary
    pub include_finance: bool,
}

impl ReportConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            database_url: set("DATABASE_URL").unwrap_or_else(|| "sqlite:herdbook.db".to_string()),
            category: set("REPORT_CATEGORY")
                .map(|v| v.parse::<Category>())
                .transpose()
                .context("Invalid REPORT_CATEGORY")?,
            field_id: set("REPORT_FIELD_ID")
                .map(|v| v.trim().parse::<i64>())
                .transpose()
                .context("Invalid REPORT_FIELD_ID")?,
            include_finance: set("REPORT_FINANCE")
                .unwrap_or_else(|| "false".to_string())
                .trim()
                .parse()
                .context("Invalid REPORT_FINANCE")?,
        };

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ReportConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_url, "sqlite:herdbook.db");
        assert_eq!(config.category, None);
        assert_eq!(config.field_id, None);
        assert!(!config.include_finance);
    }

    #[test]
    fn test_overrides() {
        let config = ReportConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("REPORT_CATEGORY", "male_calves"),
            ("REPORT_FIELD_ID", " 4 "),
            ("REPORT_FINANCE", "true"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.category, Some(Category::MaleCalves));
        assert_eq!(config.field_id, Some(4));
        assert!(config.include_finance);
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = ReportConfig::from_lookup(lookup(&[("REPORT_CATEGORY", "  ")])).unwrap();
        assert_eq!(config.category, None);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ReportConfig::from_lookup(lookup(&[("REPORT_CATEGORY", "goats")])).is_err());
        assert!(ReportConfig::from_lookup(lookup(&[("REPORT_FIELD_ID", "north")])).is_err());
        assert!(ReportConfig::from_lookup(lookup(&[("REPORT_FINANCE", "maybe")])).is_err());
    }
}
