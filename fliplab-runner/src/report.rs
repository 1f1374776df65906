//! Report export: interval CSV streams and experiment JSON.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use fliplab_core::{IntervalObserver, IntervalStatus};

use crate::experiment::ExperimentSummary;

/// Writes each interval status as a CSV row.
///
/// Columns: sample, bh_value, wave_value, bh_return, wave_return
///
/// Observers cannot fail mid-simulation, so the first write error is held
/// and returned from [`finish`](Self::finish); later rows are dropped.
pub struct CsvIntervalWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
    error: Option<csv::Error>,
}

impl<W: Write> CsvIntervalWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
            rows: 0,
            error: None,
        }
    }

    /// Flush and return the number of rows written.
    pub fn finish(mut self) -> Result<u64> {
        if let Some(err) = self.error.take() {
            return Err(err).context("failed to write interval CSV row");
        }
        self.writer.flush().context("failed to flush interval CSV")?;
        Ok(self.rows)
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err).context("failed to write interval CSV row");
        }
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush interval CSV: {}", e.error()))
    }
}

impl<W: Write> IntervalObserver for CsvIntervalWriter<W> {
    fn on_interval(&mut self, status: &IntervalStatus) {
        if self.error.is_some() {
            return;
        }
        match self.writer.serialize(status) {
            Ok(()) => self.rows += 1,
            Err(err) => self.error = Some(err),
        }
    }
}

/// Pretty JSON for an experiment summary.
pub fn summary_json(summary: &ExperimentSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize experiment summary")
}

/// Write an experiment summary as pretty JSON, creating parent directories.
pub fn write_summary(path: &Path, summary: &ExperimentSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = summary_json(summary)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write summary to {}", path.display()))?;
    Ok(())
}

/// Read back a summary written by [`write_summary`].
pub fn read_summary(path: &Path) -> Result<ExperimentSummary> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(sample: u64) -> IntervalStatus {
        IntervalStatus {
            sample,
            bh_value: 2.0,
            wave_value: 2.5,
            bh_return: 1.0,
            wave_return: 1.25,
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut writer = CsvIntervalWriter::new(Vec::new());
        writer.on_interval(&status(10));
        writer.on_interval(&status(20));
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "sample,bh_value,wave_value,bh_return,wave_return");
        assert_eq!(lines[1], "10,2.0,2.5,1.0,1.25");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn finish_counts_rows() {
        let mut writer = CsvIntervalWriter::new(Vec::new());
        for s in 1..=5 {
            writer.on_interval(&status(s));
        }
        assert_eq!(writer.finish().unwrap(), 5);
    }
}
