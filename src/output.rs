//! Output formatting and persistence for analysis results.
//!
//! Supports compact JSON, pretty-printed JSON, and CSV.

use anyhow::Result;
use clap::ValueEnum;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
    Csv,
}

/// Renders a single result object, such as a site summary.
pub fn render_one<T: Serialize>(record: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(record)?),
        OutputFormat::Pretty => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Csv => render_csv(std::slice::from_ref(record)),
    }
}

/// Renders a ranked list. CSV output has one header line and one row per record.
pub fn render_many<T: Serialize>(records: &[T], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::Pretty => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Csv => render_csv(records),
    }
}

fn render_csv<T: Serialize>(records: &[T]) -> Result<String> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(String::from_utf8(writer.into_inner()?)?)
}

/// Writes rendered output to `path`, creating parent directories as needed.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut body = content.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    fs::write(path, body)?;
    debug!(path = %path.display(), bytes = content.len(), "Wrote output file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{QueryAggregate, Summary};

    fn queries() -> Vec<QueryAggregate> {
        vec![
            QueryAggregate {
                query: "gsc report".to_string(),
                clicks: 30.0,
                impressions: 300.0,
                ctr: 0.1,
            },
            QueryAggregate {
                query: "seo audit".to_string(),
                clicks: 10.0,
                impressions: 100.0,
                ctr: 0.1,
            },
        ]
    }

    #[test]
    fn test_render_summary_json() {
        let summary = Summary {
            rows: 3,
            total_clicks: 45.0,
            total_impressions: 600.0,
            weighted_ctr: 0.075,
            weighted_position: 6.5,
        };
        let out = render_one(&summary, OutputFormat::Json).unwrap();
        assert_eq!(
            out,
            r#"{"rows":3,"total_clicks":45.0,"total_impressions":600.0,"weighted_ctr":0.075,"weighted_position":6.5}"#
        );
    }

    #[test]
    fn test_render_csv_header_once() {
        let out = render_many(&queries(), OutputFormat::Csv).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "query,clicks,impressions,ctr");
        assert_eq!(lines[1], "gsc report,30.0,300.0,0.1");
    }

    #[test]
    fn test_render_empty_csv() {
        let out = render_many::<QueryAggregate>(&[], OutputFormat::Csv).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_render_pretty_is_multiline() {
        let out = render_many(&queries(), OutputFormat::Pretty).unwrap();
        assert!(out.lines().count() > 2);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[1]["query"], "seo audit");
    }

    #[test]
    fn test_write_output_creates_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reports/top.json");
        write_output(&path, "[]").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");
    }
}
