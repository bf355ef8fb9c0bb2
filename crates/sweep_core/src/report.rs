//! Sweep results and export to CSV/JSON.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::SweepError;
use crate::process::StepOutcome;

/// One completed step within the sweep.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Sweep value this step ran under.
    pub value: u64,
    /// 1-based step number within the value's iteration.
    pub step: usize,
    pub description: String,
    pub outcome: StepOutcome,
}

/// Everything a finished sweep produced: completed step records in execution
/// order, plus the failures collected under continue-on-error.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub records: Vec<StepRecord>,
    pub failures: Vec<SweepError>,
}

/// Flat export row shared by the CSV and JSON writers.
#[derive(Serialize)]
struct RecordRow<'a> {
    value: u64,
    step: usize,
    description: &'a str,
    exit_code: i32,
    elapsed_ms: u128,
    max_rss_kib: Option<u64>,
}

impl SweepReport {
    /// True when every step completed with exit code 0 and nothing failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.records.iter().all(|r| r.outcome.success())
    }

    fn rows(&self) -> impl Iterator<Item = RecordRow<'_>> {
        self.records.iter().map(|record| RecordRow {
            value: record.value,
            step: record.step,
            description: &record.description,
            exit_code: record.outcome.exit_code,
            elapsed_ms: record.outcome.elapsed.as_millis(),
            max_rss_kib: record.outcome.max_rss_kib,
        })
    }

    /// Write one CSV row per completed step.
    pub fn export_to_csv(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let file = File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);

        wtr.write_record([
            "value",
            "step",
            "description",
            "exit_code",
            "elapsed_ms",
            "max_rss_kib",
        ])?;
        for row in self.rows() {
            wtr.write_record([
                row.value.to_string(),
                row.step.to_string(),
                row.description.to_string(),
                row.exit_code.to_string(),
                row.elapsed_ms.to_string(),
                row.max_rss_kib.map(|k| k.to_string()).unwrap_or_default(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the records as a JSON array.
    pub fn export_to_json(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let rows: Vec<RecordRow<'_>> = self.rows().collect();
        let mut file = File::create(path)?;
        serde_json::to_writer_pretty(&mut file, &rows)?;
        file.write_all(b"\n")?;
        Ok(())
    }

    /// Human-readable per-step summary for stdout.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&format!(
                "value={} step={} exit={} elapsed={:.1}s maxmem={}\n",
                record.value,
                record.step,
                record.outcome.exit_code,
                record.outcome.elapsed.as_secs_f64(),
                record.outcome.max_rss_display(),
            ));
        }
        for failure in &self.failures {
            out.push_str(&format!("failed: {failure}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(value: u64, step: usize, exit_code: i32) -> StepRecord {
        StepRecord {
            value,
            step,
            description: format!("bench {value}"),
            outcome: StepOutcome {
                exit_code,
                elapsed: Duration::from_millis(1500),
                max_rss_kib: Some(4096),
                stdout: String::new(),
                stderr: String::new(),
            },
        }
    }

    fn sample_report() -> SweepReport {
        SweepReport {
            records: vec![record(2, 1, 0), record(4, 1, 0)],
            failures: Vec::new(),
        }
    }

    #[test]
    fn csv_export_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        sample_report().export_to_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines[0],
            "value,step,description,exit_code,elapsed_ms,max_rss_kib"
        );
        assert_eq!(lines[1], "2,1,bench 2,0,1500,4096");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn json_export_round_trips_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        sample_report().export_to_json(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let rows: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 2);
        assert_eq!(rows[0]["value"], 2);
        assert_eq!(rows[0]["elapsed_ms"], 1500);
        assert_eq!(rows[0]["max_rss_kib"], 4096);
    }

    #[test]
    fn summary_formats_timing_line() {
        let summary = sample_report().summary();
        assert!(summary.contains("value=2 step=1 exit=0 elapsed=1.5s maxmem=4096KB"));
    }

    #[test]
    fn success_requires_no_failures_and_clean_exits() {
        assert!(sample_report().is_success());

        let mut failed = sample_report();
        failed.records.push(record(8, 1, 1));
        assert!(!failed.is_success());

        let mut collected = sample_report();
        collected.failures.push(SweepError::StepExecution {
            value: 4,
            step: 1,
            exit_code: 1,
        });
        assert!(!collected.is_success());
    }
}
