use etl::error::{ErrorKind, EtlError, EtlResult};
use etl::etl_error;
use etl::schema::{ColumnMode, ColumnSchema, ColumnType, TableSchema};
use etl::types::FlatRecord;
use gcp_bigquery_client::client_builder::ClientBuilder;
use gcp_bigquery_client::{
    Client,
    error::BQError,
    model::{
        query_request::QueryRequest, query_response::ResultSet,
        table_data_insert_all_request::TableDataInsertAllRequest,
    },
};
use tracing::{debug, info};

/// Maximum number of rows sent per streaming insert request.
///
/// BigQuery recommends keeping insertAll payloads well under the 10 MB request
/// limit; 500 rows keeps typical subgraph records comfortably below it.
const MAX_ROWS_PER_INSERT: usize = 500;

/// BigQuery project identifier.
pub type BigQueryProjectId = String;
/// BigQuery dataset identifier.
pub type BigQueryDatasetId = String;
/// BigQuery table identifier.
pub type BigQueryTableId = String;

/// Client for interacting with Google BigQuery.
///
/// Provides table management, streaming inserts, and query execution against
/// BigQuery datasets with authentication and error handling.
#[derive(Clone)]
pub struct BigQueryClient {
    project_id: BigQueryProjectId,
    client: Client,
}

impl BigQueryClient {
    /// Creates a new [`BigQueryClient`] from a service account key file.
    pub async fn new_with_key_path(
        project_id: BigQueryProjectId,
        sa_key_file: &str,
    ) -> EtlResult<BigQueryClient> {
        let client = ClientBuilder::new()
            .build_from_service_account_key_file(sa_key_file)
            .await
            .map_err(bq_error_to_etl_error)?;

        Ok(BigQueryClient { project_id, client })
    }

    /// Creates a new [`BigQueryClient`] using Application Default Credentials.
    ///
    /// Returns an error if credentials are missing or invalid.
    pub async fn new_with_adc(project_id: BigQueryProjectId) -> EtlResult<BigQueryClient> {
        let client = ClientBuilder::new()
            .build_from_application_default_credentials()
            .await
            .map_err(bq_error_to_etl_error)?;

        Ok(BigQueryClient { project_id, client })
    }

    /// Returns the fully qualified BigQuery table name.
    ///
    /// Formats the table name as `project_id.dataset_id.table_id` with proper quoting.
    pub fn full_table_name(
        &self,
        dataset_id: &BigQueryDatasetId,
        table_id: &BigQueryTableId,
    ) -> EtlResult<String> {
        let project_id = Self::sanitize_identifier(&self.project_id, "BigQuery project id")?;
        let dataset_id = Self::sanitize_identifier(dataset_id, "BigQuery dataset id")?;
        let table_id = Self::sanitize_identifier(table_id, "BigQuery table id")?;

        Ok(format!("`{project_id}.{dataset_id}.{table_id}`"))
    }

    /// Checks whether a table exists in the BigQuery dataset.
    ///
    /// Returns `true` if the table exists, `false` otherwise.
    pub async fn table_exists(
        &self,
        dataset_id: &BigQueryDatasetId,
        table_id: &BigQueryTableId,
    ) -> EtlResult<bool> {
        let table = self
            .client
            .table()
            .get(&self.project_id, dataset_id, table_id, None)
            .await;

        let exists =
            !matches!(table, Err(BQError::ResponseError { error }) if error.error.code == 404);

        Ok(exists)
    }

    /// Creates a table in BigQuery, partitioned by the named time column.
    ///
    /// The partition column must be declared in the schema with a `TIMESTAMP` or
    /// `DATE` type; a timestamp column is partitioned at day granularity.
    pub async fn create_table(
        &self,
        dataset_id: &BigQueryDatasetId,
        table_id: &BigQueryTableId,
        schema: &TableSchema,
        partition_column: &str,
    ) -> EtlResult<()> {
        let full_table_name = self.full_table_name(dataset_id, table_id)?;

        let columns_spec = Self::create_columns_spec(schema.columns())?;
        let partition_clause = Self::partition_clause(schema, partition_column)?;

        info!(%full_table_name, partition_column, "creating table in bigquery");

        let query = format!("create table {full_table_name} {columns_spec} {partition_clause}");

        let _ = self.query(QueryRequest::new(query)).await?;

        Ok(())
    }

    /// Streams a batch of flat records into the table.
    ///
    /// The batch is split into bounded insert requests; any reported insert error
    /// fails the whole load, and the caller must not assume partial success.
    pub async fn insert_rows(
        &self,
        dataset_id: &BigQueryDatasetId,
        table_id: &BigQueryTableId,
        rows: &[FlatRecord],
    ) -> EtlResult<()> {
        for chunk in rows.chunks(MAX_ROWS_PER_INSERT) {
            let mut request = TableDataInsertAllRequest::new();

            for row in chunk {
                request
                    .add_row(None, row.to_json())
                    .map_err(bq_error_to_etl_error)?;
            }

            let response = self
                .client
                .tabledata()
                .insert_all(&self.project_id, dataset_id, table_id, request)
                .await
                .map_err(bq_error_to_etl_error)?;

            if let Some(errors) = response.insert_errors
                && !errors.is_empty()
            {
                return Err(etl_error!(
                    ErrorKind::DestinationLoadFailed,
                    "BigQuery rejected rows during streaming insert",
                    format!("{} rows failed, first: {:?}", errors.len(), errors[0])
                ));
            }

            debug!(table_id, rows = chunk.len(), "streamed insert chunk");
        }

        Ok(())
    }

    /// Executes a BigQuery SQL query and returns the result set.
    pub async fn query(&self, request: QueryRequest) -> EtlResult<ResultSet> {
        let query_response = self
            .client
            .job()
            .query(&self.project_id, request)
            .await
            .map_err(bq_error_to_etl_error)?;

        Ok(ResultSet::new_from_query_response(query_response))
    }

    /// Sanitizes a BigQuery identifier for safe backtick quoting.
    ///
    /// Rejects empty identifiers and identifiers containing control characters.
    /// Internal backticks and backslashes are escaped so the resulting value can be
    /// wrapped in backticks without altering the identifier or allowing statement
    /// breaks.
    fn sanitize_identifier(identifier: &str, context: &str) -> EtlResult<String> {
        if identifier.is_empty() {
            return Err(etl_error!(
                ErrorKind::DestinationTableNameInvalid,
                "Invalid BigQuery identifier",
                format!("{context} cannot be empty")
            ));
        }

        if identifier.chars().any(char::is_control) {
            return Err(etl_error!(
                ErrorKind::DestinationTableNameInvalid,
                "Invalid BigQuery identifier",
                format!("{context} contains control characters")
            ));
        }

        let mut escaped = String::with_capacity(identifier.len());

        for ch in identifier.chars() {
            match ch {
                // Backticks delimit identifiers in BigQuery; escape with a backslash
                // per GoogleSQL lexical rules to keep the identifier intact.
                '`' => escaped.push_str("\\`"),
                '\\' => escaped.push_str("\\\\"),
                _ => escaped.push(ch),
            }
        }

        Ok(escaped)
    }

    /// Generates the SQL column specification for one column.
    fn column_spec(column: &ColumnSchema) -> EtlResult<String> {
        let column_name = Self::sanitize_identifier(&column.name, "BigQuery column name")?;

        let mut column_spec = format!(
            "`{}` {}",
            column_name,
            Self::column_type_to_bigquery(column.typ)
        );

        if column.mode == ColumnMode::Required {
            column_spec.push_str(" not null");
        }

        Ok(column_spec)
    }

    /// Builds complete column specifications for CREATE TABLE statements.
    fn create_columns_spec(columns: &[ColumnSchema]) -> EtlResult<String> {
        let spec = columns
            .iter()
            .map(Self::column_spec)
            .collect::<EtlResult<Vec<_>>>()?
            .join(",");

        Ok(format!("({spec})"))
    }

    /// Builds the time partitioning clause for CREATE TABLE statements.
    fn partition_clause(schema: &TableSchema, partition_column: &str) -> EtlResult<String> {
        let column = schema.column(partition_column).ok_or_else(|| {
            etl_error!(
                ErrorKind::DestinationProvisionFailed,
                "Partition column is not declared in the table schema",
                partition_column
            )
        })?;

        let name = Self::sanitize_identifier(&column.name, "BigQuery partition column")?;

        match column.typ {
            ColumnType::Timestamp => Ok(format!("partition by date(`{name}`)")),
            ColumnType::Date => Ok(format!("partition by `{name}`")),
            _ => Err(etl_error!(
                ErrorKind::DestinationProvisionFailed,
                "Partition column must be a TIMESTAMP or DATE column",
                format!("{partition_column} is declared as {:?}", column.typ)
            )),
        }
    }

    /// Converts logical column types to BigQuery physical types.
    fn column_type_to_bigquery(typ: ColumnType) -> &'static str {
        match typ {
            ColumnType::String => "string",
            ColumnType::Integer => "int64",
            ColumnType::Float => "float64",
            ColumnType::Numeric => "numeric",
            ColumnType::Boolean => "bool",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Json => "json",
        }
    }
}

/// Converts BigQuery errors to ETL errors with appropriate classification.
fn bq_error_to_etl_error(err: BQError) -> EtlError {
    let (kind, description) = match &err {
        // Authentication related errors
        BQError::InvalidServiceAccountKey(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery service account key",
        ),
        BQError::InvalidServiceAccountAuthenticator(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery service account authenticator",
        ),
        BQError::InvalidApplicationDefaultCredentialsAuthenticator(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery application default credentials",
        ),
        BQError::AuthError(_) => (
            ErrorKind::AuthenticationError,
            "BigQuery authentication error",
        ),
        BQError::YupAuthError(_) => (
            ErrorKind::AuthenticationError,
            "BigQuery OAuth authentication error",
        ),
        BQError::NoToken => (
            ErrorKind::AuthenticationError,
            "BigQuery authentication token missing",
        ),

        // Network and transport errors
        BQError::RequestError(_) => (ErrorKind::IoError, "BigQuery request failed"),

        // Query and data errors
        BQError::ResponseError { .. } => {
            (ErrorKind::DestinationQueryFailed, "BigQuery response error")
        }
        BQError::NoDataAvailable => (
            ErrorKind::DestinationQueryFailed,
            "BigQuery result set positioning error",
        ),
        BQError::InvalidColumnIndex { .. } => {
            (ErrorKind::InvalidData, "BigQuery invalid column index")
        }
        BQError::InvalidColumnName { .. } => {
            (ErrorKind::InvalidData, "BigQuery invalid column name")
        }
        BQError::InvalidColumnType { .. } => {
            (ErrorKind::ConversionError, "BigQuery column type mismatch")
        }

        // Serialization errors
        BQError::SerializationError(_) => (
            ErrorKind::SerializationError,
            "BigQuery JSON serialization error",
        ),

        _ => (ErrorKind::Unknown, "BigQuery client error"),
    };

    etl_error!(kind, description, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        TableSchema::from_json(
            r#"[
                { "name": "id", "type": "STRING", "mode": "REQUIRED" },
                { "name": "amount", "type": "NUMERIC" },
                { "name": "block_timestamp", "type": "TIMESTAMP", "mode": "REQUIRED" },
                { "name": "event_date", "type": "DATE" }
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn column_specs_render_types_and_nullability() {
        let spec = BigQueryClient::create_columns_spec(schema().columns()).unwrap();

        assert_eq!(
            spec,
            "(`id` string not null,`amount` numeric,\
             `block_timestamp` timestamp not null,`event_date` date)"
        );
    }

    #[test]
    fn timestamp_partition_column_uses_day_granularity() {
        let clause = BigQueryClient::partition_clause(&schema(), "block_timestamp").unwrap();
        assert_eq!(clause, "partition by date(`block_timestamp`)");
    }

    #[test]
    fn date_partition_column_is_used_directly() {
        let clause = BigQueryClient::partition_clause(&schema(), "event_date").unwrap();
        assert_eq!(clause, "partition by `event_date`");
    }

    #[test]
    fn partition_column_missing_from_schema_is_rejected() {
        let result = BigQueryClient::partition_clause(&schema(), "missing");
        assert_eq!(
            result.unwrap_err().kind(),
            ErrorKind::DestinationProvisionFailed
        );
    }

    #[test]
    fn non_time_partition_column_is_rejected() {
        let result = BigQueryClient::partition_clause(&schema(), "amount");
        assert_eq!(
            result.unwrap_err().kind(),
            ErrorKind::DestinationProvisionFailed
        );
    }

    #[test]
    fn identifiers_with_backticks_are_escaped() {
        let escaped = BigQueryClient::sanitize_identifier("weird`name", "test").unwrap();
        assert_eq!(escaped, "weird\\`name");
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let result = BigQueryClient::sanitize_identifier("", "test");
        assert_eq!(
            result.unwrap_err().kind(),
            ErrorKind::DestinationTableNameInvalid
        );
    }

    #[test]
    fn identifiers_with_control_characters_are_rejected() {
        let result = BigQueryClient::sanitize_identifier("bad\nname", "test");
        assert_eq!(
            result.unwrap_err().kind(),
            ErrorKind::DestinationTableNameInvalid
        );
    }
}
