// Search-engine results: the ValueSERP client, request pacing and retry,
// and the result types the rest of the pipeline consumes.

pub mod client;
pub mod rate_limit;
pub mod types;

pub use client::{SearchSettings, SerpProvider, ValueSerpClient};
pub use types::{Device, Location, SearchResult};
