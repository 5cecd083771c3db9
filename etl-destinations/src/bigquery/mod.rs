mod client;
mod core;

pub use client::{BigQueryClient, BigQueryDatasetId, BigQueryProjectId, BigQueryTableId};
pub use core::BigQueryDestination;
