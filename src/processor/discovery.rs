//! Input discovery and output naming for the day-range driver
//!
//! Inputs live in the subset layout, one file per ingest day and
//! measurement day:
//! ```text
//! input_root/
//!   o3/
//!     2020/
//!       2020-01-01/
//!         2020-01-01.ndjson
//!       2020-01-02/
//!         2020-01-01.ndjson   <- late-arriving records for Jan 1
//!         2020-01-02.ndjson
//! ```
//! Outputs go to `output_root/<kind>/<GDNAM>/OPENAQ.<GDNAM>.<date>.<param>.<H>H.<kind>`.

use crate::config::AveragingPeriod;
use crate::constants::{CSV_KIND, NETCDF_KIND, OUTPUT_PREFIX, PARTIAL_SUFFIX};
use crate::error::Result;
use crate::models::Parameter;
use chrono::NaiveDate;
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Finds the ndjson inputs that hold one measurement day
#[derive(Debug, Clone)]
pub struct InputDiscovery {
    input_root: PathBuf,
    parameter: Parameter,
}

impl InputDiscovery {
    pub fn new(input_root: PathBuf, parameter: Parameter) -> Self {
        Self {
            input_root,
            parameter,
        }
    }

    /// Glob pattern matching every input file for `date`
    pub fn pattern(&self, date: NaiveDate) -> String {
        format!(
            "{}/{}/????/????-??-??/{}.ndjson",
            Pattern::escape(&self.input_root.to_string_lossy()),
            self.parameter.name(),
            date.format("%Y-%m-%d")
        )
    }

    /// Input files for `date`, sorted by path
    pub fn discover(&self, date: NaiveDate) -> Result<Vec<PathBuf>> {
        let pattern = self.pattern(date);
        let mut files = Vec::new();
        for entry in glob::glob(&pattern)? {
            let path = entry?;
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        debug!("Found {} input files matching {}", files.len(), pattern);
        Ok(files)
    }
}

/// Read an input file, replacing invalid UTF-8 rather than failing
pub fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Output file locations for one parameter, grid and averaging period
#[derive(Debug, Clone)]
pub struct OutputPaths {
    output_root: PathBuf,
    grid_name: String,
    parameter: Parameter,
    averaging: AveragingPeriod,
}

impl OutputPaths {
    pub fn new(
        output_root: PathBuf,
        grid_name: impl Into<String>,
        parameter: Parameter,
        averaging: AveragingPeriod,
    ) -> Self {
        Self {
            output_root,
            grid_name: grid_name.into(),
            parameter,
            averaging,
        }
    }

    /// Gridded NetCDF output for `date`
    pub fn netcdf(&self, date: NaiveDate) -> PathBuf {
        self.path(NETCDF_KIND, date)
    }

    /// Tabular CSV output for `date`
    pub fn csv(&self, date: NaiveDate) -> PathBuf {
        self.path(CSV_KIND, date)
    }

    fn path(&self, kind: &str, date: NaiveDate) -> PathBuf {
        self.output_root
            .join(kind)
            .join(&self.grid_name)
            .join(format!(
                "{}.{}.{}.{}.{}H.{}",
                OUTPUT_PREFIX,
                self.grid_name,
                date.format("%Y-%m-%d"),
                self.parameter.name(),
                self.averaging.hours(),
                kind
            ))
    }
}

/// Sibling path a writer fills before renaming into place
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Create the parent directory of an output file
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_output_paths() {
        let paths = OutputPaths::new(
            PathBuf::from("/out"),
            "12US1",
            Parameter::O3,
            AveragingPeriod::OneHour,
        );
        assert_eq!(
            paths.netcdf(day(2020, 1, 1)),
            PathBuf::from("/out/nc/12US1/OPENAQ.12US1.2020-01-01.o3.1H.nc")
        );
        assert_eq!(
            paths.csv(day(2020, 1, 1)),
            PathBuf::from("/out/csv/12US1/OPENAQ.12US1.2020-01-01.o3.1H.csv")
        );

        let daily = OutputPaths::new(
            PathBuf::from("."),
            "108NHEMI2",
            Parameter::Pm25,
            AveragingPeriod::TwentyFourHours,
        );
        assert_eq!(
            daily.csv(day(2021, 6, 30)),
            PathBuf::from("./csv/108NHEMI2/OPENAQ.108NHEMI2.2021-06-30.pm25.24H.csv")
        );
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/out/a.nc")),
            PathBuf::from("/out/a.nc.tmp")
        );
    }

    #[test]
    fn test_discover_collects_late_arrivals_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for ingest in ["2020-01-02", "2020-01-01"] {
            let dir = root.join("o3").join("2020").join(ingest);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("2020-01-01.ndjson"), "").unwrap();
        }
        let other = root.join("o3").join("2020").join("2020-01-02");
        fs::write(other.join("2020-01-02.ndjson"), "").unwrap();
        let pm = root.join("pm25").join("2020").join("2020-01-01");
        fs::create_dir_all(&pm).unwrap();
        fs::write(pm.join("2020-01-01.ndjson"), "").unwrap();

        let discovery = InputDiscovery::new(root.to_path_buf(), Parameter::O3);
        let files = discovery.discover(day(2020, 1, 1)).unwrap();

        assert_eq!(
            files,
            vec![
                root.join("o3/2020/2020-01-01/2020-01-01.ndjson"),
                root.join("o3/2020/2020-01-02/2020-01-01.ndjson"),
            ]
        );
    }

    #[test]
    fn test_discover_missing_root_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let discovery = InputDiscovery::new(temp_dir.path().join("absent"), Parameter::Pm10);
        assert!(discovery.discover(day(2020, 1, 1)).unwrap().is_empty());
    }

    #[test]
    fn test_read_lossy_replaces_invalid_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("latin1.ndjson");
        fs::write(&path, b"caf\xe9\n").unwrap();

        let text = read_lossy(&path).unwrap();
        assert_eq!(text, "caf\u{FFFD}\n");
    }
}
