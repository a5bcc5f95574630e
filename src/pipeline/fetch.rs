// Concurrent fetch stage: one search per keyword across a bounded pool.
//
// Searches run through `buffer_unordered(concurrency)`, so at most
// `concurrency` requests are in flight and completions arrive in any order.
// The fetch loop owns the accumulator; workers never share a mutable
// collection. A failing keyword is recorded and contributes no results.

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::serp::client::SerpProvider;
use crate::serp::types::SearchResult;

/// A keyword whose search failed, and why.
#[derive(Debug)]
pub struct KeywordFailure {
    pub keyword: String,
    pub error: FetchError,
}

/// Everything the fetch stage produced for one run.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Flattened results of every successful keyword, in completion order.
    pub results: Vec<SearchResult>,
    pub failures: Vec<KeywordFailure>,
    /// Keywords that returned successfully (possibly with zero results).
    pub succeeded: usize,
}

impl FetchOutcome {
    /// Total number of keywords that finished, successfully or not.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failures.len()
    }

    pub fn cancelled(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f.error, FetchError::Cancelled))
            .count()
    }
}

/// Search every keyword with up to `concurrency` requests in flight.
///
/// Returns once every keyword has completed, failed or been cancelled.
/// `progress` is advanced once per finished keyword; pass
/// `ProgressBar::hidden()` when no display is wanted.
pub async fn fetch_all(
    provider: &dyn SerpProvider,
    keywords: &[String],
    concurrency: usize,
    progress: &ProgressBar,
    cancel: &CancellationToken,
) -> FetchOutcome {
    let concurrency = concurrency.max(1);
    progress.set_length(keywords.len() as u64);

    info!(
        keywords = keywords.len(),
        concurrency = concurrency,
        "Fetching search results"
    );

    let mut completions = stream::iter(keywords.iter().map(|keyword| async move {
        let result = if cancel.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            tokio::select! {
                result = provider.search(keyword) => result,
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
            }
        };
        (keyword, result)
    }))
    .buffer_unordered(concurrency);

    let mut outcome = FetchOutcome::default();

    while let Some((keyword, result)) = completions.next().await {
        match result {
            Ok(mut results) => {
                // Results are only ever attributed to the keyword that was searched
                let before = results.len();
                results.retain(|r| &r.keyword == keyword);
                if results.len() != before {
                    warn!(
                        keyword = keyword.as_str(),
                        discarded = before - results.len(),
                        "Provider returned results for another keyword"
                    );
                }
                debug!(keyword = keyword.as_str(), results = results.len(), "Keyword fetched");
                outcome.results.extend(results);
                outcome.succeeded += 1;
            }
            Err(error) => {
                if !matches!(error, FetchError::Cancelled) {
                    warn!(keyword = keyword.as_str(), error = %error, "Search failed, skipping keyword");
                }
                outcome.failures.push(KeywordFailure {
                    keyword: keyword.clone(),
                    error,
                });
            }
        }
        progress.inc(1);
    }

    info!(
        succeeded = outcome.succeeded,
        failed = outcome.failures.len(),
        cancelled = outcome.cancelled(),
        results = outcome.results.len(),
        "Fetch complete"
    );

    outcome
}
