use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How flattened records treat nested sequences of mappings.
///
/// Sequences (sub-list relations) are never flattened into columns; they are either
/// carried as a JSON-encoded string column or dropped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencePolicy {
    /// Serialize the sequence to a JSON string and keep it as a single column.
    Stringify,
    /// Drop the sequence field from the flattened record.
    Drop,
}

/// What to do when a raw record cannot be flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedRecordPolicy {
    /// Skip the offending record and continue with the rest of the batch.
    Skip,
    /// Fail the whole window on the first malformed record.
    Fail,
}

/// Record normalization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NormalizeConfig {
    /// Mapping from flattened source field name to destination column name.
    ///
    /// Applied to top-level keys after flattening; a rename that collides with an
    /// existing key overwrites it.
    #[serde(default)]
    pub field_renames: BTreeMap<String, String>,
    /// Policy for nested sequences of mappings.
    #[serde(default = "default_sequence_policy")]
    pub sequence_policy: SequencePolicy,
    /// Policy for records that cannot be flattened.
    #[serde(default = "default_malformed_policy")]
    pub malformed_policy: MalformedRecordPolicy,
}

impl NormalizeConfig {
    /// Default sequence handling.
    pub const DEFAULT_SEQUENCE_POLICY: SequencePolicy = SequencePolicy::Stringify;

    /// Default malformed record handling.
    pub const DEFAULT_MALFORMED_POLICY: MalformedRecordPolicy = MalformedRecordPolicy::Fail;
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            field_renames: BTreeMap::new(),
            sequence_policy: default_sequence_policy(),
            malformed_policy: default_malformed_policy(),
        }
    }
}

fn default_sequence_policy() -> SequencePolicy {
    NormalizeConfig::DEFAULT_SEQUENCE_POLICY
}

fn default_malformed_policy() -> MalformedRecordPolicy {
    NormalizeConfig::DEFAULT_MALFORMED_POLICY
}
