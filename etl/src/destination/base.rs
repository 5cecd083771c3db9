use std::future::Future;

use tracing::info;

use crate::error::EtlResult;
use crate::schema::TableSchema;
use crate::types::FlatRecord;

/// Trait for warehouses that can receive normalized records.
///
/// Implementations define how destination storage is checked, created, and loaded.
/// The pipeline treats the destination as opaque; retry and backoff live inside the
/// implementation, never in the pipeline.
///
/// Loads are batch-atomic from the caller's perspective: a successful return from
/// [`Destination::load_rows`] means every row is durably visible, a failure means the
/// caller must not assume partial success. Implementations do not deduplicate;
/// re-loading the same logical records produces duplicate rows, and idempotence is
/// achieved by the caller choosing non-overlapping time ranges per run.
pub trait Destination {
    /// Returns the name of the destination.
    fn name() -> &'static str;

    /// Returns whether the destination table already exists.
    fn table_exists(&self, table_id: &str) -> impl Future<Output = EtlResult<bool>> + Send;

    /// Creates the destination table with the given schema, partitioned by the named
    /// time column.
    fn create_table(
        &self,
        table_id: &str,
        schema: &TableSchema,
        partition_column: &str,
    ) -> impl Future<Output = EtlResult<()>> + Send;

    /// Appends a batch of flat records to the table and blocks until the load
    /// reports completion or failure.
    fn load_rows(
        &self,
        table_id: &str,
        rows: &[FlatRecord],
    ) -> impl Future<Output = EtlResult<()>> + Send;
}

/// Ensures destination storage exists before a load.
///
/// Check-then-create: an existing table is trusted as schema-compatible and left
/// untouched; a missing one is created with the declared schema and partitioning.
/// The sequence is not atomic, so concurrent provisioning of the same table must be
/// serialized by the caller. Returns `true` when the table was created.
pub async fn provision_table<D: Destination>(
    destination: &D,
    table_id: &str,
    schema: &TableSchema,
    partition_column: &str,
) -> EtlResult<bool> {
    if destination.table_exists(table_id).await? {
        return Ok(false);
    }

    destination
        .create_table(table_id, schema, partition_column)
        .await?;

    info!(
        destination = D::name(),
        table_id, partition_column, "created destination table"
    );

    Ok(true)
}
