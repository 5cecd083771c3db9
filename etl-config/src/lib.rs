//! Configuration for the subgraph ingestion pipeline.
//!
//! Configuration is loaded once at process start from layered sources (base file,
//! environment file, environment variables) and passed explicitly into each component.
//! Nothing reads configuration from ambient global state during a run.

pub mod environment;
pub mod load;
pub mod shared;

pub use load::{LoadConfigError, load_config};
