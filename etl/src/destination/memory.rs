use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::destination::base::Destination;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::schema::TableSchema;
use crate::types::FlatRecord;

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, ProvisionedTable>,
    create_calls: usize,
}

#[derive(Debug, Clone)]
struct ProvisionedTable {
    schema: TableSchema,
    partition_column: String,
    rows: Vec<FlatRecord>,
}

/// In-memory destination for testing and development purposes.
///
/// Stores provisioned tables and loaded rows in memory so tests can inspect what the
/// pipeline produced. All data is lost when the process terminates.
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    /// Creates a new empty memory destination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the rows loaded into the given table.
    pub async fn rows(&self, table_id: &str) -> Vec<FlatRecord> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(table_id)
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }

    /// Returns the schema the given table was created with.
    pub async fn table_schema(&self, table_id: &str) -> Option<TableSchema> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(table_id)
            .map(|table| table.schema.clone())
    }

    /// Returns the partition column the given table was created with.
    pub async fn partition_column(&self, table_id: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(table_id)
            .map(|table| table.partition_column.clone())
    }

    /// Returns the total number of table creation calls observed.
    pub async fn create_calls(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.create_calls
    }
}

impl Destination for MemoryDestination {
    fn name() -> &'static str {
        "memory"
    }

    async fn table_exists(&self, table_id: &str) -> EtlResult<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.tables.contains_key(table_id))
    }

    async fn create_table(
        &self,
        table_id: &str,
        schema: &TableSchema,
        partition_column: &str,
    ) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        inner.create_calls += 1;

        if inner.tables.contains_key(table_id) {
            return Err(etl_error!(
                ErrorKind::DestinationProvisionFailed,
                "Table already exists",
                table_id
            ));
        }

        info!(table_id, partition_column, "creating in-memory table");

        inner.tables.insert(
            table_id.to_string(),
            ProvisionedTable {
                schema: schema.clone(),
                partition_column: partition_column.to_string(),
                rows: Vec::new(),
            },
        );

        Ok(())
    }

    async fn load_rows(&self, table_id: &str, rows: &[FlatRecord]) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;

        let Some(table) = inner.tables.get_mut(table_id) else {
            return Err(etl_error!(
                ErrorKind::DestinationLoadFailed,
                "Cannot load into a table that was not provisioned",
                table_id
            ));
        };

        info!(table_id, rows = rows.len(), "loading batch into memory table");

        table.rows.extend_from_slice(rows);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::base::provision_table;
    use crate::schema::TableSchema;

    fn schema() -> TableSchema {
        TableSchema::from_json(
            r#"[
                { "name": "id", "type": "STRING", "mode": "REQUIRED" },
                { "name": "block_timestamp", "type": "TIMESTAMP" }
            ]"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn provisioning_creates_the_table_exactly_once() {
        let destination = MemoryDestination::new();
        let schema = schema();

        let created = provision_table(&destination, "deposits", &schema, "block_timestamp")
            .await
            .unwrap();
        assert!(created);

        let created = provision_table(&destination, "deposits", &schema, "block_timestamp")
            .await
            .unwrap();
        assert!(!created);

        assert_eq!(destination.create_calls().await, 1);
        assert_eq!(
            destination.partition_column("deposits").await.as_deref(),
            Some("block_timestamp")
        );
        // The table keeps the schema it was declared with.
        assert_eq!(destination.table_schema("deposits").await, Some(schema));
    }

    #[test]
    fn destination_exposes_a_static_name() {
        assert_eq!(MemoryDestination::name(), "memory");
    }

    #[tokio::test]
    async fn loading_into_missing_table_fails() {
        let destination = MemoryDestination::new();

        let result = destination.load_rows("missing", &[]).await;
        assert_eq!(
            result.unwrap_err().kind(),
            ErrorKind::DestinationLoadFailed
        );
    }
}
