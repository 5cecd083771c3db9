//! Record normalization: flattening nested records and renaming fields.

use etl_config::shared::{MalformedRecordPolicy, NormalizeConfig, SequencePolicy};
use serde_json::Value;
use tracing::warn;

use crate::error::EtlResult;
use crate::types::{FlatRecord, RawRecord, RecordValue, ScalarValue};

/// Separator joining parent and child keys in flattened field paths.
const PATH_SEPARATOR: char = '_';

/// Converts raw records into flat records.
///
/// Normalization is pure and idempotent: the same raw record always produces the same
/// flat record, and a record that is already flat passes through unchanged apart from
/// the rename mapping. Nested mappings are flattened into composite keys; sequences
/// of mappings are carried or dropped per the configured [`SequencePolicy`], never
/// flattened into columns.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    pub fn new(config: &NormalizeConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Normalizes one raw JSON record into a [`FlatRecord`].
    ///
    /// Fails with a `MalformedRecord` error when the value is not a mapping of the
    /// expected shapes; batch-level handling of that failure is governed by the
    /// configured [`MalformedRecordPolicy`] in [`Normalizer::normalize_batch`].
    pub fn normalize(&self, record: Value) -> EtlResult<FlatRecord> {
        let record = RawRecord::from_json(record)?;

        let mut flat = FlatRecord::new();
        self.flatten_record(None, &record, &mut flat);
        self.apply_renames(&mut flat);

        Ok(flat)
    }

    /// Normalizes a fetched batch, applying the configured malformed-record policy.
    ///
    /// Under [`MalformedRecordPolicy::Skip`] the offending records are logged and
    /// dropped; under [`MalformedRecordPolicy::Fail`] the first malformed record
    /// fails the whole batch.
    pub fn normalize_batch(&self, records: Vec<Value>) -> EtlResult<Vec<FlatRecord>> {
        let mut normalized = Vec::with_capacity(records.len());

        for record in records {
            match self.normalize(record) {
                Ok(flat) => normalized.push(flat),
                Err(error) => match self.config.malformed_policy {
                    MalformedRecordPolicy::Skip => {
                        warn!(%error, "skipping malformed record");
                    }
                    MalformedRecordPolicy::Fail => return Err(error),
                },
            }
        }

        Ok(normalized)
    }

    /// Recursively flattens a record under the given key prefix.
    fn flatten_record(&self, prefix: Option<&str>, record: &RawRecord, flat: &mut FlatRecord) {
        for (key, value) in record.fields() {
            let path = match prefix {
                Some(prefix) => format!("{prefix}{PATH_SEPARATOR}{key}"),
                None => key.clone(),
            };

            match value {
                RecordValue::Scalar(scalar) => {
                    flat.insert(path, scalar.clone());
                }
                RecordValue::Mapping(nested) => {
                    self.flatten_record(Some(&path), nested, flat);
                }
                RecordValue::Sequence(items) => match self.config.sequence_policy {
                    SequencePolicy::Stringify => {
                        let json = Value::Array(items.iter().map(RawRecord::to_json).collect());
                        flat.insert(path, ScalarValue::String(json.to_string()));
                    }
                    SequencePolicy::Drop => {}
                },
            }
        }
    }

    /// Applies the configured field renames to top-level flattened keys.
    ///
    /// A rename whose destination key already exists overwrites it: the renamed value
    /// wins, deterministically.
    fn apply_renames(&self, flat: &mut FlatRecord) {
        for (source, destination) in &self.config.field_renames {
            if let Some(value) = flat.remove(source) {
                flat.insert(destination.clone(), value);
            }
        }
    }
}
