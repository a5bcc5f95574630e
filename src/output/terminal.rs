// Colored terminal output for cluster tables and run summaries.
//
// The full keyword x domain matrix is usually too wide for a terminal, so
// each row lists only the domains that keyword shares. The CSV export has
// the complete matrix.

use colored::Colorize;

use crate::cluster::aggregate::ClusterTable;
use crate::cluster::domain::extract_domain;
use crate::pipeline::run::RunReport;
use crate::serp::types::SearchResult;

/// Display the ranked cluster table.
pub fn display_cluster_table(table: &ClusterTable, min_match: u32) {
    if table.is_empty() {
        println!(
            "No keywords share at least {} ranking domains. Try a lower --min-match.",
            min_match
        );
        return;
    }

    println!(
        "\n{}",
        format!(
            "=== Keyword Clusters ({} keywords, {} domains) ===",
            table.rows.len(),
            table.domains.len()
        )
        .bold()
    );
    println!();

    println!(
        "  {:>4}  {:<40} {:>5}  {}",
        "Rank".dimmed(),
        "Keyword".dimmed(),
        "Match".dimmed(),
        "Shared domains".dimmed(),
    );
    println!("  {}", "-".repeat(90).dimmed());

    for (i, row) in table.rows.iter().enumerate() {
        let domains: Vec<String> = table
            .shared_domains(row)
            .map(|(domain, count)| {
                if count > 1 {
                    format!("{domain} (x{count})")
                } else {
                    domain.to_string()
                }
            })
            .collect();

        println!(
            "  {:>4}. {:<40} {:>5}  {}",
            i + 1,
            super::truncate_chars(&row.keyword, 37),
            colorize_match(row.match_score),
            super::truncate_chars(&domains.join(", "), 120).dimmed(),
        );
    }
    println!();
}

/// Display the fetch summary for a run.
pub fn display_run_summary(report: &RunReport) {
    let fetch = &report.fetch;
    println!(
        "Searched {} keywords in {:.1}s: {} ok, {} failed",
        report.keywords_submitted,
        report.elapsed_secs(),
        fetch.succeeded,
        fetch.failures.len(),
    );

    let cancelled = fetch.cancelled();
    if cancelled > 0 {
        println!(
            "  {} {} keywords were not searched (run cancelled)",
            "!".yellow(),
            cancelled
        );
    }

    let errored: Vec<_> = fetch
        .failures
        .iter()
        .filter(|f| !matches!(f.error, crate::error::FetchError::Cancelled))
        .collect();
    for failure in errored.iter().take(5) {
        println!(
            "  {} {}: {}",
            "!".red(),
            failure.keyword,
            super::truncate_chars(&failure.error.to_string(), 100).dimmed()
        );
    }
    if errored.len() > 5 {
        println!("  ... and {} more (see logs)", errored.len() - 5);
    }
}

/// Display one keyword's raw search results.
pub fn display_search_results(keyword: &str, results: &[SearchResult]) {
    println!(
        "\n{}",
        format!("=== Results for \"{}\" ({}) ===", keyword, results.len()).bold()
    );

    if results.is_empty() {
        println!("  No organic results.");
        return;
    }

    for result in results {
        let position = result
            .position
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string());
        let url = result.url.as_deref().unwrap_or("");
        let domain = extract_domain(url).unwrap_or("-");
        println!(
            "  {:>3}. {:<32} {}",
            position,
            domain.cyan(),
            super::truncate_chars(url, 100).dimmed()
        );
    }
}

fn colorize_match(score: u32) -> colored::ColoredString {
    let text = score.to_string();
    match score {
        s if s >= 8 => text.green().bold(),
        s if s >= 5 => text.green(),
        s if s >= 3 => text.yellow(),
        _ => text.normal(),
    }
}
