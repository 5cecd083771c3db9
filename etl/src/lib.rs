//! Windowed extraction engine for paginated GraphQL sources.
//!
//! The core of this crate is the window/fetch/normalize/load pipeline: a global time
//! range is decomposed into fixed-size windows, each window is drained through offset
//! pagination within the source's paging limits, fetched records are flattened and
//! renamed into flat field sets, and the accumulated batch is loaded into a
//! provisioned, time-partitioned destination table.

pub mod destination;
pub mod error;
pub mod macros;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod types;
pub mod windows;
