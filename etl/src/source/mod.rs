//! Paginated extraction from the GraphQL source.

mod client;
mod fetch;
mod query;

pub use client::{HttpSubgraphClient, SubgraphClient};
pub use fetch::{WindowFetch, WindowFetcher};
pub use query::{QueryBindings, QueryTemplate};
