use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Connection settings for the GraphQL source endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// URL of the subgraph GraphQL endpoint.
    pub endpoint: String,
    /// Timeout, in seconds, applied to each page request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl SourceConfig {
    /// Default per-request timeout in seconds.
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Validates source connection settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.endpoint.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "source.endpoint".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "source.request_timeout_secs".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

fn default_request_timeout_secs() -> u64 {
    SourceConfig::DEFAULT_REQUEST_TIMEOUT_SECS
}
