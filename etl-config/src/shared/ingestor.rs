use serde::{Deserialize, Serialize};

use crate::shared::{
    BigQueryConfig, DatasetConfig, NormalizeConfig, PageConfig, SourceConfig, ValidationError,
    WindowConfig,
};

/// Top-level configuration for one ingestion run.
///
/// Constructed once at startup, immutable for the duration of the run, and passed
/// explicitly into each pipeline component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IngestorConfig {
    /// GraphQL source endpoint settings.
    pub source: SourceConfig,
    /// Window planning settings.
    #[serde(default)]
    pub window: WindowConfig,
    /// Offset pagination limits.
    #[serde(default)]
    pub page: PageConfig,
    /// Record normalization settings.
    #[serde(default)]
    pub normalize: NormalizeConfig,
    /// Destination warehouse settings.
    pub bigquery: BigQueryConfig,
    /// Datasets processed sequentially by the pipeline.
    pub datasets: Vec<DatasetConfig>,
}

impl IngestorConfig {
    /// Validates the whole configuration tree.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.window.validate()?;
        self.page.validate()?;
        self.bigquery.validate()?;

        if self.datasets.is_empty() {
            return Err(ValidationError::MissingRequired(
                "at least one dataset must be configured".to_string(),
            ));
        }

        for dataset in &self.datasets {
            dataset.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> IngestorConfig {
        IngestorConfig {
            source: SourceConfig {
                endpoint: "https://api.thegraph.com/subgraphs/name/messari/aave-v3-ethereum"
                    .to_string(),
                request_timeout_secs: 30,
            },
            window: WindowConfig::default(),
            page: PageConfig::default(),
            normalize: NormalizeConfig::default(),
            bigquery: BigQueryConfig {
                project_id: "my-project".to_string(),
                dataset_id: "aave".to_string(),
                sa_key_file: None,
            },
            datasets: vec![DatasetConfig {
                name: "aave-v3-deposits".to_string(),
                query_path: None,
                schema_path: None,
                table_id: None,
                partition_column: "block_timestamp".to_string(),
            }],
        }
    }

    #[test]
    fn valid_configuration_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn empty_dataset_list_is_rejected() {
        let mut config = valid_config();
        config.datasets.clear();

        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_window_hours_is_rejected() {
        let mut config = valid_config();
        config.window.hours = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_offset_pages_is_rejected() {
        let mut config = valid_config();
        config.page.max_offset_pages = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn dataset_paths_fall_back_to_conventions() {
        let dataset = DatasetConfig {
            name: "aave-v3-deposits".to_string(),
            query_path: None,
            schema_path: None,
            table_id: None,
            partition_column: "block_timestamp".to_string(),
        };

        assert_eq!(dataset.query_path(), "queries/aave-v3-deposits_query.graphql");
        assert_eq!(dataset.schema_path(), "schemas/aave-v3-deposits_schema.json");
        assert_eq!(dataset.table_id(), "aave-v3-deposits");
    }

    #[test]
    fn max_records_per_window_is_page_product() {
        let page = PageConfig {
            page_size: 1000,
            max_offset_pages: 5,
        };

        assert_eq!(page.max_records_per_window(), 5000);
    }
}
