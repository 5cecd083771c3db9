use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// One extraction unit: a named source query landing in one destination table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatasetConfig {
    /// Dataset name, used for logging and for deriving default file paths.
    pub name: String,
    /// Path to the GraphQL query template file.
    ///
    /// Defaults to `queries/{name}_query.graphql`.
    #[serde(default)]
    pub query_path: Option<String>,
    /// Path to the destination schema definition file.
    ///
    /// Defaults to `schemas/{name}_schema.json`.
    #[serde(default)]
    pub schema_path: Option<String>,
    /// Destination table identifier.
    ///
    /// Defaults to the dataset name.
    #[serde(default)]
    pub table_id: Option<String>,
    /// Name of the time column the destination table is partitioned by.
    #[serde(default = "default_partition_column")]
    pub partition_column: String,
}

impl DatasetConfig {
    /// Default time partitioning column.
    pub const DEFAULT_PARTITION_COLUMN: &'static str = "block_timestamp";

    /// Returns the query template path, falling back to the conventional location.
    pub fn query_path(&self) -> String {
        self.query_path
            .clone()
            .unwrap_or_else(|| format!("queries/{}_query.graphql", self.name))
    }

    /// Returns the schema definition path, falling back to the conventional location.
    pub fn schema_path(&self) -> String {
        self.schema_path
            .clone()
            .unwrap_or_else(|| format!("schemas/{}_schema.json", self.name))
    }

    /// Returns the destination table id, falling back to the dataset name.
    pub fn table_id(&self) -> &str {
        self.table_id.as_deref().unwrap_or(&self.name)
    }

    /// Validates dataset settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "datasets[].name".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        if self.partition_column.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: format!("datasets[{}].partition_column", self.name),
                constraint: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn default_partition_column() -> String {
    DatasetConfig::DEFAULT_PARTITION_COLUMN.to_string()
}
