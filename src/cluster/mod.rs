// SERP similarity clustering: domain extraction and co-occurrence aggregation.

pub mod aggregate;
pub mod domain;

pub use aggregate::{aggregate, ClusterRow, ClusterTable, CoOccurrenceMatrix};
pub use domain::extract_domain;
