//! The `fetch` and `parse` actions: one document per tracked name variant.

use std::fmt;
use std::fs;
use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use indicatif::ProgressBar;
use owo_colors::{OwoColorize, Stream};
use tracing::{debug, info};

use crate::citation::CitationParser;
use crate::config::Config;
use crate::source::RecordSource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub documents: usize,
    pub articles: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub parsed: usize,
    pub skipped: usize,
}

impl fmt::Display for FetchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents, {} articles",
            self.documents.if_supports_color(Stream::Stderr, |t| t.bold()),
            self.articles.if_supports_color(Stream::Stderr, |t| t.green())
        )
    }
}

impl fmt::Display for ParseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parsed = format!("✓ {}", self.parsed);
        let skipped = format!("✗ {}", self.skipped);
        write!(
            f,
            "{}  {}",
            parsed.if_supports_color(Stream::Stderr, |t| t.green()),
            skipped.if_supports_color(Stream::Stderr, |t| t.red())
        )
    }
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Search every name variant and store the raw documents under `config.data_dir`.
pub fn fetch(config: &Config, source: &impl RecordSource) -> anyhow::Result<FetchSummary> {
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;

    let mut summary = FetchSummary::default();
    for variant in config.variants() {
        info!(user = variant.user, "looking for {}", variant.name);
        let bar = spinner(format!("searching {}", variant.name));
        let ids = source.search(variant.name);
        bar.finish_and_clear();
        let ids = ids?;
        debug!(?ids, "search returned identifiers");
        info!("{} articles found for {}", ids.len(), variant.name);

        let bar = spinner(format!("fetching {} records", ids.len()));
        let document = source.fetch_details(&ids);
        bar.finish_and_clear();
        let document = document?;

        let path = config.document_path(&variant);
        fs::write(&path, document).with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), "stored document");

        summary.documents += 1;
        summary.articles += ids.len();
    }
    Ok(summary)
}

/// Parse every stored document and print its records to `out`.
pub fn parse(config: &Config, format: Format, out: &mut impl Write) -> anyhow::Result<ParseSummary> {
    let parser = CitationParser::new(config.policy);
    let mut summary = ParseSummary::default();
    for variant in config.variants() {
        let path = config.document_path(&variant);
        let document = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {} (run `fetch` first?)", path.display()))?;
        let report = parser
            .parse_report(&document)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!(
            path = %path.display(),
            parsed = report.records.len(),
            skipped = report.skipped.len(),
            "parsed document"
        );

        for record in &report.records {
            match format {
                Format::Text => writeln!(out, "{record}")?,
                Format::Json => writeln!(out, "{}", serde_json::to_string(record)?)?,
            }
        }
        summary.parsed += report.records.len();
        summary.skipped += report.skipped.len();
    }
    Ok(summary)
}
