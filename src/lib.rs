// serpcluster: cluster keywords by the domains they share in search results.
//
// This is the library root. Each module corresponds to a stage of a
// clustering run: load keywords, fetch results, aggregate, display.

pub mod cluster;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod serp;
