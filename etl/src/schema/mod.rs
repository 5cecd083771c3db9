//! Destination table schemas.
//!
//! Schemas are declared per dataset in a JSON file listing column descriptors, in the
//! shape accepted by the warehouse:
//!
//! ```json
//! [
//!   { "name": "block_timestamp", "type": "TIMESTAMP", "mode": "REQUIRED" },
//!   { "name": "amount", "type": "NUMERIC", "description": "Token amount" }
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::etl_error;
use crate::error::{ErrorKind, EtlResult};

/// Logical column type, mapped by each destination to its physical type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    String,
    #[serde(alias = "INT64")]
    Integer,
    #[serde(alias = "FLOAT64")]
    Float,
    Numeric,
    #[serde(alias = "BOOL")]
    Boolean,
    Timestamp,
    Date,
    Json,
}

/// Column nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnMode {
    #[default]
    Nullable,
    Required,
}

/// One column of a destination table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: ColumnType,
    #[serde(default)]
    pub mode: ColumnMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The ordered column set of one destination table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self { columns }
    }

    /// Loads a schema from its JSON definition file.
    pub fn from_json_file(path: impl AsRef<Path>) -> EtlResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            etl_error!(
                ErrorKind::ConfigError,
                "Failed to read schema definition",
                path.display(),
                source: err
            )
        })?;

        Self::from_json(&contents)
    }

    /// Parses a schema from JSON text.
    pub fn from_json(contents: &str) -> EtlResult<Self> {
        let columns: Vec<ColumnSchema> = serde_json::from_str(contents)?;

        if columns.is_empty() {
            return Err(etl_error!(
                ErrorKind::ConfigError,
                "Schema definition must declare at least one column"
            ));
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|column| column.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPOSITS_SCHEMA: &str = r#"[
        { "name": "id", "type": "STRING", "mode": "REQUIRED" },
        { "name": "block_timestamp", "type": "TIMESTAMP", "mode": "REQUIRED" },
        { "name": "amount", "type": "NUMERIC", "description": "Token amount" },
        { "name": "amountUSD", "type": "FLOAT" },
        { "name": "account_id", "type": "STRING" }
    ]"#;

    #[test]
    fn schema_parses_columns_in_order() {
        let schema = TableSchema::from_json(DEPOSITS_SCHEMA).unwrap();

        assert_eq!(schema.columns().len(), 5);
        assert_eq!(schema.columns()[0].name, "id");
        assert_eq!(schema.columns()[1].typ, ColumnType::Timestamp);
        assert_eq!(schema.columns()[1].mode, ColumnMode::Required);
        assert_eq!(schema.columns()[2].mode, ColumnMode::Nullable);
        assert_eq!(
            schema.columns()[2].description.as_deref(),
            Some("Token amount")
        );
    }

    #[test]
    fn type_aliases_are_accepted() {
        let schema = TableSchema::from_json(
            r#"[
                { "name": "a", "type": "INT64" },
                { "name": "b", "type": "FLOAT64" },
                { "name": "c", "type": "BOOL" }
            ]"#,
        )
        .unwrap();

        assert_eq!(schema.columns()[0].typ, ColumnType::Integer);
        assert_eq!(schema.columns()[1].typ, ColumnType::Float);
        assert_eq!(schema.columns()[2].typ, ColumnType::Boolean);
    }

    #[test]
    fn empty_schema_is_rejected() {
        let result = TableSchema::from_json("[]");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn column_lookup_by_name() {
        let schema = TableSchema::from_json(DEPOSITS_SCHEMA).unwrap();

        assert!(schema.column("block_timestamp").is_some());
        assert!(schema.column("missing").is_none());
    }
}
