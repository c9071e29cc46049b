//! Split mirrored archive days into per-parameter ndjson files.
//!
//! Every `*.ndjson.gz` of an ingest day is scanned in name order. Lines for
//! the requested parameter are grouped by the measurement date in their
//! `date.utc` field and written to
//! `<output_root>/<parameter>/<YYYY>/<ingest date>/<measurement date>.ndjson`.

use super::day_directory;
use crate::config::ArchiveConfig;
use crate::constants::ARCHIVE_EXTENSION;
use crate::error::Result;
use crate::processor::discovery::{ensure_parent, partial_path};
use chrono::NaiveDate;
use flate2::read::MultiGzDecoder;
use glob::Pattern;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const UTC_TAG: &str = r#""utc":""#;

/// Counts for one or more subset days
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SubsetStats {
    pub archives_read: usize,
    pub lines_read: usize,
    pub lines_kept: usize,
    pub lines_without_date: usize,
    pub files_written: usize,
}

/// Extracts one parameter's records from the local archive mirror
#[derive(Debug, Clone)]
pub struct ArchiveSubsetter {
    archive_root: PathBuf,
    output_root: PathBuf,
    parameter: String,
}

impl ArchiveSubsetter {
    /// Any parameter name is accepted; matching is on the raw JSON text
    pub fn new(config: &ArchiveConfig, parameter: impl Into<String>) -> Self {
        Self {
            archive_root: config.archive_root.clone(),
            output_root: config.output_root.clone(),
            parameter: parameter.into(),
        }
    }

    /// Output file for records of `measured` ingested on `ingest`
    pub fn output_path(&self, ingest: NaiveDate, measured: &str) -> PathBuf {
        self.output_root
            .join(&self.parameter)
            .join(ingest.format("%Y").to_string())
            .join(ingest.format("%Y-%m-%d").to_string())
            .join(format!("{}.ndjson", measured))
    }

    /// Subset each ingest day in order
    pub fn subset_range(&self, dates: &[NaiveDate]) -> Result<SubsetStats> {
        let mut stats = SubsetStats::default();
        for &date in dates {
            let day = self.subset_day(date)?;
            info!(
                "{}: kept {} of {} lines in {} files",
                date, day.lines_kept, day.lines_read, day.files_written
            );
            stats.archives_read += day.archives_read;
            stats.lines_read += day.lines_read;
            stats.lines_kept += day.lines_kept;
            stats.lines_without_date += day.lines_without_date;
            stats.files_written += day.files_written;
        }
        Ok(stats)
    }

    /// Subset one ingest day
    pub fn subset_day(&self, ingest: NaiveDate) -> Result<SubsetStats> {
        let mut stats = SubsetStats::default();
        let needle = format!(r#""parameter":"{}""#, self.parameter);

        let dir = day_directory(&self.archive_root, ingest);
        let pattern = format!(
            "{}/*{}",
            Pattern::escape(&dir.to_string_lossy()),
            ARCHIVE_EXTENSION
        );
        let mut archives = glob::glob(&pattern)?.collect::<std::result::Result<Vec<_>, _>>()?;
        archives.sort();
        if archives.is_empty() {
            warn!("No archive files match {}", pattern);
        }

        let mut by_date: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for path in &archives {
            debug!("Scanning {}", path.display());
            stats.archives_read += 1;
            for line in read_gzip_lines(path)? {
                stats.lines_read += 1;
                if !line.contains(&needle) {
                    continue;
                }
                match measurement_date(&line).map(str::to_string) {
                    Some(date) => {
                        by_date.entry(date).or_default().push(line);
                        stats.lines_kept += 1;
                    }
                    None => stats.lines_without_date += 1,
                }
            }
        }

        if stats.lines_without_date > 0 {
            warn!(
                "{}: skipped {} {} lines without a utc date",
                ingest, stats.lines_without_date, self.parameter
            );
        }

        for (measured, lines) in by_date {
            let path = self.output_path(ingest, &measured);
            write_lines(&path, &lines)?;
            debug!("Wrote {} lines to {}", lines.len(), path.display());
            stats.files_written += 1;
        }

        Ok(stats)
    }
}

/// The `YYYY-MM-DD` that follows the first `"utc":"` in a raw line
pub fn measurement_date(line: &str) -> Option<&str> {
    let start = line.find(UTC_TAG)? + UTC_TAG.len();
    let date = line.get(start..start + 10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(date)
}

/// Every non-empty line of a (possibly multi-member) gzip file
fn read_gzip_lines(path: &Path) -> Result<Vec<String>> {
    let mut reader = BufReader::new(MultiGzDecoder::new(File::open(path)?));
    let mut lines = Vec::new();
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buffer);
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    Ok(lines)
}

fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    ensure_parent(path)?;
    let partial = partial_path(path);
    {
        let mut file = File::create(&partial)?;
        for line in lines {
            writeln!(file, "{}", line)?;
        }
    }
    fs::rename(&partial, path)?;
    Ok(())
}
