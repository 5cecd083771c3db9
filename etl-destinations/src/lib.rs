//! Destination implementations for the extraction pipeline.
//!
//! Provides the BigQuery destination used by the ingestor, implementing the
//! destination trait from the core crate.

pub mod bigquery;
