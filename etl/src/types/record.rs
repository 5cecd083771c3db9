use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::etl_error;
use crate::error::{ErrorKind, EtlResult};

/// A terminal scalar value inside a record.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    /// Converts the scalar back into a JSON value for serialization to the destination.
    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::Null => Value::Null,
            ScalarValue::Bool(value) => Value::Bool(*value),
            ScalarValue::Integer(value) => Value::Number((*value).into()),
            ScalarValue::Float(value) => Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ScalarValue::String(value) => Value::String(value.clone()),
        }
    }
}

/// A single value inside a raw record, tagged by shape.
///
/// Representing the nested structure as a closed set of variants keeps the flattening
/// recursion exhaustively pattern-matched: a shape outside this set fails conversion
/// as a malformed record instead of being silently mis-handled.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A terminal scalar.
    Scalar(ScalarValue),
    /// A nested mapping, flattened into composite keys.
    Mapping(RawRecord),
    /// A sequence of mappings (sub-list relation), never flattened into columns.
    Sequence(Vec<RawRecord>),
}

impl RecordValue {
    /// Builds a [`RecordValue`] from a JSON value returned by the source.
    pub fn from_json(value: Value) -> EtlResult<Self> {
        match value {
            Value::Null => Ok(RecordValue::Scalar(ScalarValue::Null)),
            Value::Bool(value) => Ok(RecordValue::Scalar(ScalarValue::Bool(value))),
            Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Ok(RecordValue::Scalar(ScalarValue::Integer(value)))
                } else if let Some(value) = number.as_f64() {
                    Ok(RecordValue::Scalar(ScalarValue::Float(value)))
                } else {
                    Err(etl_error!(
                        ErrorKind::MalformedRecord,
                        "Record contains an unrepresentable number",
                        number
                    ))
                }
            }
            Value::String(value) => Ok(RecordValue::Scalar(ScalarValue::String(value))),
            Value::Object(fields) => Ok(RecordValue::Mapping(RawRecord::from_fields(fields)?)),
            Value::Array(items) => {
                let mut records = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(fields) => records.push(RawRecord::from_fields(fields)?),
                        other => {
                            return Err(etl_error!(
                                ErrorKind::MalformedRecord,
                                "Record sequences must contain only mappings",
                                other
                            ));
                        }
                    }
                }

                Ok(RecordValue::Sequence(records))
            }
        }
    }

    /// Converts the value back into JSON.
    pub fn to_json(&self) -> Value {
        match self {
            RecordValue::Scalar(scalar) => scalar.to_json(),
            RecordValue::Mapping(record) => record.to_json(),
            RecordValue::Sequence(records) => {
                Value::Array(records.iter().map(RawRecord::to_json).collect())
            }
        }
    }
}

/// An arbitrarily nested record as returned by one page of the source.
///
/// Fields are held in key order. A raw record has no identity beyond its
/// source-assigned opaque id field and only exists within one fetch page's
/// processing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    fields: Vec<(String, RecordValue)>,
}

impl RawRecord {
    /// Builds a [`RawRecord`] from a top-level JSON value, which must be a mapping.
    pub fn from_json(value: Value) -> EtlResult<Self> {
        match value {
            Value::Object(fields) => Self::from_fields(fields),
            other => Err(etl_error!(
                ErrorKind::MalformedRecord,
                "Raw records must be mappings",
                other
            )),
        }
    }

    fn from_fields(fields: Map<String, Value>) -> EtlResult<Self> {
        let fields = fields
            .into_iter()
            .map(|(key, value)| Ok((key, RecordValue::from_json(value)?)))
            .collect::<EtlResult<Vec<_>>>()?;

        Ok(Self { fields })
    }

    /// Returns the record's fields in source order.
    pub fn fields(&self) -> &[(String, RecordValue)] {
        &self.fields
    }

    /// Converts the record back into a JSON object.
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len());
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.to_json());
        }

        Value::Object(map)
    }
}

impl FromIterator<(String, RecordValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, RecordValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A fully flattened record: every key is a composite field path, every value a scalar.
///
/// This is the unit handed to the loader. Keys are kept sorted so output is
/// deterministic regardless of source field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatRecord {
    fields: BTreeMap<String, ScalarValue>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, returning the previous value if the key was already present.
    pub fn insert(&mut self, key: String, value: ScalarValue) -> Option<ScalarValue> {
        self.fields.insert(key, value)
    }

    /// Removes a field by key.
    pub fn remove(&mut self, key: &str) -> Option<ScalarValue> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&ScalarValue> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serializes the record into a JSON object for the batch loader.
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len());
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.to_json());
        }

        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_and_mappings_convert_from_json() {
        let record = RawRecord::from_json(json!({
            "id": "0xabc",
            "amount": 1500,
            "amountUSD": 12.5,
            "account": { "id": "0xdef" },
        }))
        .unwrap();

        assert_eq!(record.fields().len(), 4);
        assert_eq!(
            record.fields()[0],
            (
                "account".to_string(),
                RecordValue::Mapping(RawRecord::from_iter([(
                    "id".to_string(),
                    RecordValue::Scalar(ScalarValue::String("0xdef".to_string()))
                )]))
            )
        );
    }

    #[test]
    fn sequences_of_mappings_are_accepted() {
        let record = RawRecord::from_json(json!({
            "liquidations": [{ "id": "a" }, { "id": "b" }],
        }))
        .unwrap();

        let (_, value) = &record.fields()[0];
        match value {
            RecordValue::Sequence(items) => assert_eq!(items.len(), 2),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn sequences_of_scalars_are_malformed() {
        let result = RawRecord::from_json(json!({ "tags": ["a", "b"] }));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedRecord);
    }

    #[test]
    fn top_level_non_mapping_is_malformed() {
        let result = RawRecord::from_json(json!([1, 2, 3]));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedRecord);
    }

    #[test]
    fn record_round_trips_to_json() {
        let source = json!({
            "id": "0xabc",
            "nested": { "count": 3 },
            "subs": [{ "id": "x" }],
        });
        let record = RawRecord::from_json(source.clone()).unwrap();

        assert_eq!(record.to_json(), source);
    }
}
