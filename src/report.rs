//! Result reporting.
//!
//! Rows are rendered either as a borderless, left-aligned table:
//!
//! ```text
//! ID            IMAGE         COMMAND              TERMINATION      EXIT CODE  DURATION
//! 4f1c2a9e0b7d  nginx:1.27    /docker-entrypoint.  GracefulSuccess  0          0s/10s
//! web-0/app     app:2.1       ./server             ForceKilled      137        30s/30s
//! ```
//!
//! or as a JSON array of the same rows.

use crate::error::Result;
use crate::probe::ProbeResult;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;
use tabwriter::TabWriter;

/// Table header, in column order.
pub const HEADER: [&str; 6] = ["ID", "IMAGE", "COMMAND", "TERMINATION", "EXIT CODE", "DURATION"];

/// One rendered result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub id: String,
    pub image: String,
    pub command: String,
    pub termination: String,
    pub exit_code: i64,
    pub duration: String,
}

impl From<&ProbeResult> for ReportRow {
    fn from(result: &ProbeResult) -> Self {
        Self {
            id: result.config.id.clone(),
            image: result.config.image.clone(),
            command: result.config.command.clone(),
            termination: result.outcome().to_string(),
            exit_code: result.facts.exit_code,
            duration: format_duration(result.facts.stop_duration, result.grace_period),
        }
    }
}

/// Renders `<stop>s/<grace>s` in whole seconds.
pub fn format_duration(stop: Duration, grace: Duration) -> String {
    format!("{}s/{}s", stop.as_secs(), grace.as_secs())
}

/// Converts results to rows, preserving order.
pub fn rows(results: &[ProbeResult]) -> Vec<ReportRow> {
    results.iter().map(ReportRow::from).collect()
}

/// Writes rows as a table.
pub fn write_table<W: Write>(writer: W, rows: &[ReportRow]) -> Result<()> {
    let mut tw = TabWriter::new(writer).padding(2);
    writeln!(tw, "{}", HEADER.join("\t"))?;
    for row in rows {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.id, row.image, row.command, row.termination, row.exit_code, row.duration
        )?;
    }
    tw.flush()?;
    Ok(())
}

/// Writes rows as a pretty-printed JSON array.
pub fn write_json<W: Write>(mut writer: W, rows: &[ReportRow]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writeln!(writer)?;
    Ok(())
}
