// Keyword x domain co-occurrence and cluster ranking.
//
// Every keyword gets a row, every domain seen in any keyword's results gets
// a column, and each cell counts how often that domain ranked for that
// keyword. A keyword's match score is its row sum. Keywords whose match
// reaches the threshold are returned, highest match first.
//
// This is a pure function of its inputs: result arrival order does not
// affect the output.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::domain::extract_nonempty_domain;
use crate::serp::types::SearchResult;

/// Dense keyword x domain count matrix for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoOccurrenceMatrix {
    /// Unique keywords in input order.
    pub keywords: Vec<String>,
    /// Domain columns, most frequent first, ties by name.
    pub domains: Vec<String>,
    /// `counts[keyword_idx][domain_idx]`
    pub counts: Vec<Vec<u32>>,
}

impl CoOccurrenceMatrix {
    /// Left-join `keywords` against the domains in `results`.
    ///
    /// Keywords without results keep an all-zero row. Results for keywords
    /// that were not submitted, and results without a usable URL, are dropped.
    pub fn build(keywords: &[String], results: &[SearchResult]) -> Self {
        let mut row_index: HashMap<&str, usize> = HashMap::new();
        let mut unique_keywords: Vec<String> = Vec::new();
        for keyword in keywords {
            if !row_index.contains_key(keyword.as_str()) {
                row_index.insert(keyword.as_str(), unique_keywords.len());
                unique_keywords.push(keyword.clone());
            }
        }

        let mut row_hits: Vec<HashMap<&str, u32>> = vec![HashMap::new(); unique_keywords.len()];
        let mut totals: HashMap<&str, u32> = HashMap::new();
        let mut dropped = 0usize;
        let mut unmatched = 0usize;

        for result in results {
            let Some(&row) = row_index.get(result.keyword.as_str()) else {
                unmatched += 1;
                continue;
            };
            let Some(url) = result.url.as_deref() else {
                dropped += 1;
                continue;
            };
            match extract_nonempty_domain(url) {
                Ok(domain) => {
                    *row_hits[row].entry(domain).or_insert(0) += 1;
                    *totals.entry(domain).or_insert(0) += 1;
                }
                Err(e) => {
                    debug!(keyword = result.keyword, error = %e, "Dropping result");
                    dropped += 1;
                }
            }
        }

        if dropped > 0 || unmatched > 0 {
            debug!(
                dropped = dropped,
                unmatched = unmatched,
                "Results skipped while building domain matrix"
            );
        }

        let mut ranked: Vec<(&str, u32)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let counts = row_hits
            .iter()
            .map(|hits| {
                ranked
                    .iter()
                    .map(|(domain, _)| hits.get(domain).copied().unwrap_or(0))
                    .collect()
            })
            .collect();

        Self {
            keywords: unique_keywords,
            domains: ranked.into_iter().map(|(d, _)| d.to_string()).collect(),
            counts,
        }
    }

    /// Count for one cell, `None` if the keyword or domain is not in the matrix.
    pub fn count(&self, keyword: &str, domain: &str) -> Option<u32> {
        let row = self.keywords.iter().position(|k| k == keyword)?;
        let col = self.domains.iter().position(|d| d == domain)?;
        Some(self.counts[row][col])
    }

    /// Keep only domain columns containing `filter` (case-sensitive).
    pub fn retain_domains(&mut self, filter: &str) {
        let keep: Vec<usize> = self
            .domains
            .iter()
            .enumerate()
            .filter(|(_, d)| d.contains(filter))
            .map(|(i, _)| i)
            .collect();

        self.domains = keep.iter().map(|&i| self.domains[i].clone()).collect();
        for row in &mut self.counts {
            *row = keep.iter().map(|&i| row[i]).collect();
        }
    }

    /// Sum of each keyword's row, in keyword order.
    pub fn match_scores(&self) -> Vec<u32> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Rank rows by match score (descending, stable) and keep those at or
    /// above `min_match`.
    pub fn into_clusters(self, min_match: u32) -> ClusterTable {
        let mut rows: Vec<ClusterRow> = self
            .keywords
            .into_iter()
            .zip(self.counts)
            .map(|(keyword, counts)| {
                let match_score = counts.iter().sum();
                ClusterRow {
                    keyword,
                    counts,
                    match_score,
                }
            })
            .collect();

        rows.sort_by(|a, b| b.match_score.cmp(&a.match_score));
        rows.retain(|row| row.match_score >= min_match);

        ClusterTable {
            domains: self.domains,
            rows,
        }
    }
}

/// One keyword's row in the output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterRow {
    pub keyword: String,
    /// Aligned with [`ClusterTable::domains`].
    pub counts: Vec<u32>,
    #[serde(rename = "match")]
    pub match_score: u32,
}

/// Final ranked output: Keyword, one column per domain, match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterTable {
    pub domains: Vec<String>,
    pub rows: Vec<ClusterRow>,
}

impl ClusterTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, keyword: &str) -> Option<&ClusterRow> {
        self.rows.iter().find(|r| r.keyword == keyword)
    }

    /// Domains with a non-zero count for `row`, in column order.
    pub fn shared_domains<'a>(&'a self, row: &'a ClusterRow) -> impl Iterator<Item = (&'a str, u32)> + 'a {
        self.domains
            .iter()
            .zip(&row.counts)
            .filter(|&(_, &count)| count > 0)
            .map(|(domain, &count)| (domain.as_str(), count))
    }
}

/// Build the matrix, apply the optional domain filter, score, sort and
/// threshold. An empty table is a valid result.
pub fn aggregate(
    keywords: &[String],
    results: &[SearchResult],
    domain_filter: Option<&str>,
    min_match: u32,
) -> ClusterTable {
    let mut matrix = CoOccurrenceMatrix::build(keywords, results);

    if let Some(filter) = domain_filter.filter(|f| !f.is_empty()) {
        matrix.retain_domains(filter);
    }

    let table = matrix.into_clusters(min_match);
    debug!(
        domains = table.domains.len(),
        clusters = table.rows.len(),
        min_match = min_match,
        "Aggregation complete"
    );
    table
}
