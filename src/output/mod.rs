//! Output module for printing crawl results
//!
//! This module handles:
//! - Writing discovery records as text lines or JSON Lines
//! - Printing the end-of-crawl report

pub mod stats;

pub use stats::{format_report, print_report};

use crate::crawler::DiscoveryRecord;
use std::io::{self, Write};

/// Longest body excerpt shown in text output, in characters
const BODY_EXCERPT_CHARS: usize = 60;

/// How records are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RecordFormat {
    /// `found: <url> "<body excerpt>" [children]`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Writes records to an output sink in the chosen format
pub struct RecordWriter<W: Write> {
    out: W,
    format: RecordFormat,
}

impl<W: Write> RecordWriter<W> {
    /// Creates a writer over `out`
    pub fn new(out: W, format: RecordFormat) -> Self {
        Self { out, format }
    }

    /// Writes one record followed by a newline
    pub fn write_record(&mut self, record: &DiscoveryRecord) -> io::Result<()> {
        match self.format {
            RecordFormat::Text => writeln!(self.out, "{}", format_record(record)),
            RecordFormat::Json => {
                serde_json::to_writer(&mut self.out, record)?;
                writeln!(self.out)
            }
        }
    }

    /// Flushes the underlying sink
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Returns the underlying sink
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Formats a record as a single text line
///
/// # Example
///
/// ```
/// use ripple_crawl::crawler::DiscoveryRecord;
/// use ripple_crawl::output::format_record;
///
/// let record = DiscoveryRecord {
///     url: "https://golang.org/".to_string(),
///     body: "The Go Programming Language".to_string(),
///     children: vec!["https://golang.org/pkg/".to_string()],
/// };
/// assert_eq!(
///     format_record(&record),
///     r#"found: https://golang.org/ "The Go Programming Language" [https://golang.org/pkg/]"#
/// );
/// ```
pub fn format_record(record: &DiscoveryRecord) -> String {
    format!(
        "found: {} {:?} [{}]",
        record.url,
        body_excerpt(&record.body),
        record.children.join(" ")
    )
}

/// First line of the body, trimmed and cut to [`BODY_EXCERPT_CHARS`]
fn body_excerpt(body: &str) -> String {
    let line = body.trim().lines().next().unwrap_or("").trim();
    if line.chars().count() > BODY_EXCERPT_CHARS {
        let cut: String = line.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}
