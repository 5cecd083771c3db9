use std::future::Future;
use std::time::Duration;

use etl_config::shared::SourceConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::source::query::{QueryBindings, QueryTemplate};

/// Trait for transports that can execute one bound page request against the source.
///
/// The pipeline depends only on this contract; tests script page responses through it
/// without any network involvement. Implementations own retry/backoff policy, the
/// fetch loop itself never retries.
///
/// Records come back as raw JSON values: shape validation belongs to the normalizer,
/// which applies the configured malformed-record policy per record instead of failing
/// a whole page at the transport.
pub trait SubgraphClient {
    /// Executes one page request and returns the raw records under the template's
    /// operation field, in the source's ascending time order.
    fn fetch_page(
        &self,
        template: &QueryTemplate,
        bindings: QueryBindings,
    ) -> impl Future<Output = EtlResult<Vec<serde_json::Value>>> + Send;
}

/// Request body for one GraphQL call.
#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
}

/// Response envelope returned by the source.
#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Production [`SubgraphClient`] posting bound queries over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSubgraphClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSubgraphClient {
    /// Creates a client for the configured endpoint with a per-request timeout.
    pub fn new(config: &SourceConfig) -> EtlResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl SubgraphClient for HttpSubgraphClient {
    async fn fetch_page(
        &self,
        template: &QueryTemplate,
        bindings: QueryBindings,
    ) -> EtlResult<Vec<Value>> {
        let query = template.bind(&bindings);

        debug!(
            operation = template.operation_field(),
            skip = bindings.skip,
            start = bindings.start,
            end = bindings.end,
            "requesting page from source"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&GraphQlRequest { query: &query })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!(
                ErrorKind::SourceTransportFailed,
                "Source returned non-success status",
                status
            );
        }

        let envelope: GraphQlResponse = response.json().await?;

        records_from_envelope(envelope, template.operation_field())
    }
}

/// Applies the envelope rules to one decoded response.
///
/// Any entry in the `errors` array fails the page, even when partial `data` is
/// present: a partially evaluated page cannot be trusted for an append-only load.
/// Otherwise the operation field must exist and hold a sequence of records.
fn records_from_envelope(
    envelope: GraphQlResponse,
    operation_field: &str,
) -> EtlResult<Vec<Value>> {
    if !envelope.errors.is_empty() {
        let messages = envelope
            .errors
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        bail!(
            ErrorKind::SourceQueryFailed,
            "Source reported query errors",
            messages
        );
    }

    let records = envelope
        .data
        .and_then(|mut data| data.get_mut(operation_field).map(Value::take))
        .ok_or_else(|| {
            etl_error!(
                ErrorKind::SourceQueryFailed,
                "Source response is missing the operation field",
                operation_field
            )
        })?;

    let Value::Array(items) = records else {
        bail!(
            ErrorKind::SourceQueryFailed,
            "Operation field did not hold a sequence of records",
            operation_field
        );
    };

    Ok(items)
}
