use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Destination warehouse connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BigQueryConfig {
    /// GCP project id.
    pub project_id: String,
    /// BigQuery dataset id that holds all destination tables.
    pub dataset_id: String,
    /// Path to a service account key file.
    ///
    /// When unset, application default credentials are used.
    #[serde(default)]
    pub sa_key_file: Option<String>,
}

impl BigQueryConfig {
    /// Validates destination connection settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_id.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "bigquery.project_id".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        if self.dataset_id.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "bigquery.dataset_id".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
