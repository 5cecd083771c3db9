use etl::destination::Destination;
use etl::error::EtlResult;
use etl::schema::TableSchema;
use etl::types::FlatRecord;
use tracing::info;

use crate::bigquery::client::BigQueryClient;
use crate::bigquery::{BigQueryDatasetId, BigQueryTableId};

/// A BigQuery destination backed by one dataset.
///
/// Tables are created on demand with day-level time partitioning and loaded through
/// streaming inserts. The destination never deduplicates; idempotence is the
/// caller's concern, achieved by choosing non-overlapping time ranges per run.
#[derive(Clone)]
pub struct BigQueryDestination {
    client: BigQueryClient,
    dataset_id: BigQueryDatasetId,
}

impl BigQueryDestination {
    /// Creates a new [`BigQueryDestination`] from a service account key file.
    pub async fn new_with_key_path(
        project_id: String,
        dataset_id: BigQueryDatasetId,
        sa_key_file: &str,
    ) -> EtlResult<Self> {
        let client = BigQueryClient::new_with_key_path(project_id, sa_key_file).await?;

        Ok(Self { client, dataset_id })
    }

    /// Creates a new [`BigQueryDestination`] using Application Default Credentials.
    pub async fn new_with_adc(
        project_id: String,
        dataset_id: BigQueryDatasetId,
    ) -> EtlResult<Self> {
        let client = BigQueryClient::new_with_adc(project_id).await?;

        Ok(Self { client, dataset_id })
    }
}

impl Destination for BigQueryDestination {
    fn name() -> &'static str {
        "bigquery"
    }

    async fn table_exists(&self, table_id: &str) -> EtlResult<bool> {
        let table_id: BigQueryTableId = table_id.to_string();

        self.client.table_exists(&self.dataset_id, &table_id).await
    }

    async fn create_table(
        &self,
        table_id: &str,
        schema: &TableSchema,
        partition_column: &str,
    ) -> EtlResult<()> {
        let table_id: BigQueryTableId = table_id.to_string();

        self.client
            .create_table(&self.dataset_id, &table_id, schema, partition_column)
            .await
    }

    async fn load_rows(&self, table_id: &str, rows: &[FlatRecord]) -> EtlResult<()> {
        if rows.is_empty() {
            info!(table_id, "no rows to load, skipping streaming insert");
            return Ok(());
        }

        let table_id: BigQueryTableId = table_id.to_string();

        self.client
            .insert_rows(&self.dataset_id, &table_id, rows)
            .await?;

        info!(table_id, rows = rows.len(), "loaded batch into bigquery");

        Ok(())
    }
}
