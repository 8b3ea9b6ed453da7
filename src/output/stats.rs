//! End-of-crawl report formatting

use crate::crawler::CrawlReport;

/// Formats a report as an indented, human-readable block
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::from("=== Crawl Report ===\n");
    out.push_str(&format!("  Pages fetched: {}\n", report.pages_fetched));
    out.push_str(&format!("  Fetch failures: {}\n", report.fetch_failures));
    out.push_str(&format!("  Duplicates skipped: {}\n", report.already_seen));
    out.push_str(&format!("  Depth limit reached: {}\n", report.depth_exhausted));
    if report.was_cancelled() {
        out.push_str(&format!("  Cancelled tasks: {}\n", report.cancelled));
    }
    out.push_str(&format!(
        "  Tasks: {} registered, {} completed\n",
        report.tasks_registered, report.tasks_completed
    ));

    let success_rate = if report.fetch_attempts() > 0 {
        (report.pages_fetched as f64 / report.fetch_attempts() as f64) * 100.0
    } else {
        0.0
    };
    out.push_str(&format!(
        "  Success rate: {:.1}% in {:.2?}\n",
        success_rate, report.elapsed
    ));
    out
}

/// Prints the report to stderr, keeping stdout for records
pub fn print_report(report: &CrawlReport) {
    eprint!("{}", format_report(report));
}
