//! Upstream archive stages.
//!
//! The public OpenAQ bucket publishes one directory of gzipped ndjson files
//! per ingest day. [`fetch`] mirrors those directories locally and
//! [`subset`] splits them into the per-parameter, per-measurement-day
//! layout the convert stage reads.

pub mod fetch;
pub mod subset;

pub use fetch::{ArchiveFetcher, FetchStats};
pub use subset::{ArchiveSubsetter, SubsetStats};

use crate::constants::ARCHIVE_PREFIX;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Directory holding one ingest day's archive files
pub fn day_directory(archive_root: &Path, date: NaiveDate) -> PathBuf {
    archive_root
        .join(ARCHIVE_PREFIX)
        .join(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_directory() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(
            day_directory(Path::new("mirror"), date),
            PathBuf::from("mirror/realtime-gzipped/2020-01-01")
        );
    }
}
