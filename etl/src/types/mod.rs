//! Core data types flowing through the pipeline.

mod record;
mod time;

pub use record::{FlatRecord, RawRecord, RecordValue, ScalarValue};
pub use time::{TimeRange, Window};
