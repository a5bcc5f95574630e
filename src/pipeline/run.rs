// One clustering run: fetch every keyword, then aggregate.
//
// A `RunContext` is created fresh for each run and carries the validated
// settings and the cancellation token. Nothing survives between runs: the
// fetch outcome is returned as a value and passed straight into aggregation,
// which only starts after every search has finished.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::fetch::{fetch_all, FetchOutcome};
use crate::cluster::aggregate::{aggregate, ClusterTable};
use crate::config::RunSettings;
use crate::error::InputError;
use crate::serp::client::SerpProvider;

/// Per-run state passed explicitly through every stage.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub settings: RunSettings,
    pub started_at: DateTime<Utc>,
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(settings: RunSettings) -> Self {
        Self {
            settings,
            started_at: Utc::now(),
            cancel: CancellationToken::new(),
        }
    }
}

/// What a run produced.
#[derive(Debug)]
pub struct RunReport {
    pub keywords_submitted: usize,
    pub fetch: FetchOutcome,
    pub table: ClusterTable,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Fetch results for `keywords` and cluster them.
///
/// Duplicate keywords are searched once, at their first position. Only an
/// empty keyword list is an error; failed searches and an empty cluster
/// table are reported in the returned value.
pub async fn execute(
    ctx: &RunContext,
    provider: &dyn SerpProvider,
    keywords: &[String],
    progress: &ProgressBar,
) -> Result<RunReport, InputError> {
    if keywords.is_empty() {
        return Err(InputError::NoKeywords);
    }

    let keywords = unique_keywords(keywords);
    let keywords = keywords.as_slice();

    let settings = &ctx.settings;
    let fetch = fetch_all(
        provider,
        keywords,
        settings.concurrency,
        progress,
        &ctx.cancel,
    )
    .await;

    let table = aggregate(
        keywords,
        &fetch.results,
        settings.domain_filter.as_deref(),
        settings.min_match,
    );

    let finished_at = Utc::now();
    info!(
        keywords = keywords.len(),
        failed = fetch.failures.len(),
        clusters = table.rows.len(),
        "Clustering run complete"
    );

    Ok(RunReport {
        keywords_submitted: keywords.len(),
        fetch,
        table,
        started_at: ctx.started_at,
        finished_at,
    })
}

/// Keep the first occurrence of each keyword.
fn unique_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let unique: Vec<String> = keywords
        .iter()
        .filter(|k| seen.insert(k.as_str()))
        .cloned()
        .collect();

    if unique.len() < keywords.len() {
        debug!(
            duplicates = keywords.len() - unique.len(),
            "Dropped duplicate keywords"
        );
    }
    unique
}
