//! List screen configuration, loaded from a JSON file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{QueryError, Result};
use crate::manager::default_priority;
use crate::query_variables::Sorting;

fn default_table() -> String {
    "items".to_string()
}

fn default_ancestor_relation_name() -> String {
    "parent".to_string()
}

fn default_page_size() -> u64 {
    5
}

fn default_searchable_columns() -> Vec<String> {
    vec!["name".to_string()]
}

fn default_max_breadcrumb_depth() -> usize {
    64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfig {
    /// Table queried by the SQL backend
    #[serde(default = "default_table")]
    pub table: String,
    /// Relation from a child item to its ancestor
    #[serde(default = "default_ancestor_relation_name")]
    pub ancestor_relation_name: String,
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default)]
    pub default_sorting: Vec<Sorting>,
    /// Fragment names, lowest priority first
    #[serde(default = "default_priority")]
    pub fragment_priority: Vec<String>,
    /// Columns matched by the free-text search
    #[serde(default = "default_searchable_columns")]
    pub searchable_columns: Vec<String>,
    #[serde(default = "default_max_breadcrumb_depth")]
    pub max_breadcrumb_depth: usize,
    /// Whether the list drills down through the ancestor relation
    #[serde(default)]
    pub navigable: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            ancestor_relation_name: default_ancestor_relation_name(),
            default_page_size: default_page_size(),
            default_sorting: Vec::new(),
            fragment_priority: default_priority(),
            searchable_columns: default_searchable_columns(),
            max_breadcrumb_depth: default_max_breadcrumb_depth(),
            navigable: false,
        }
    }
}

impl ListConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(QueryError::Config(format!(
                "configuration file not found: {}",
                path_ref.display()
            )));
        }

        let content = fs::read_to_string(path_ref).map_err(|e| {
            QueryError::Config(format!("cannot read configuration file {}: {}", path_ref.display(), e))
        })?;

        let config = Self::from_json_str(&content).map_err(|e| {
            QueryError::Config(format!("cannot parse configuration file {}: {}", path_ref.display(), e))
        })?;

        info!(path = %path_ref.display(), table = %config.table, "loaded list configuration");
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: ListConfig = serde_json::from_str(content)?;
        if config.default_page_size == 0 {
            return Err(QueryError::Config("defaultPageSize must be positive".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_variables::SortingOrder;
    use std::io::Write;

    #[test]
    fn test_load_valid_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "table": "posts",
                "ancestorRelationName": "folder",
                "defaultPageSize": 25,
                "defaultSorting": [{{"field": "name", "order": "DESC"}}],
                "navigable": true
            }}"#
        )
        .unwrap();

        let config = ListConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.table, "posts");
        assert_eq!(config.ancestor_relation_name, "folder");
        assert_eq!(config.default_page_size, 25);
        assert_eq!(config.default_sorting[0].order, SortingOrder::Desc);
        assert_eq!(config.fragment_priority, default_priority());
        assert!(config.navigable);
    }

    #[test]
    fn test_invalid_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = ListConfig::from_json_file(file.path());
        assert!(matches!(result, Err(QueryError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ListConfig::from_json_file("non_existent_file.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        assert!(ListConfig::from_json_str(r#"{"defaultPageSize": 0}"#).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ListConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ListConfig::default());
        assert_eq!(config.ancestor_relation_name, "parent");
        assert_eq!(config.default_page_size, 5);
    }
}
