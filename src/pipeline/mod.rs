// Clustering pipeline: concurrent fetch, then aggregation.

pub mod fetch;
pub mod run;
