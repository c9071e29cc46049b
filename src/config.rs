//! Configuration management and validation.
//!
//! Provides configuration structures for the convert run (parameter,
//! grid, date range, averaging period, outputs) and for the upstream
//! archive fetch and subset stages.

use crate::constants::{DEFAULT_BUCKET, DEFAULT_GRIDDESC, DEFAULT_GRID_NAME};
use crate::error::{OpenAqError, Result};
use crate::models::Parameter;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Aggregation granularity, which must match each record's averaging period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AveragingPeriod {
    /// Hourly records, 24 time steps per output day
    #[default]
    OneHour,
    /// Daily records, one time step per output day
    TwentyFourHours,
}

impl AveragingPeriod {
    /// Build from an hour count; only 1 and 24 are supported
    pub fn from_hours(hours: u32) -> Result<Self> {
        match hours {
            1 => Ok(AveragingPeriod::OneHour),
            24 => Ok(AveragingPeriod::TwentyFourHours),
            other => Err(OpenAqError::configuration(format!(
                "averaging hours must be 1 or 24, got {}",
                other
            ))),
        }
    }

    /// Length of the period in hours
    pub fn hours(&self) -> u32 {
        match self {
            AveragingPeriod::OneHour => 1,
            AveragingPeriod::TwentyFourHours => 24,
        }
    }

    /// Number of time steps in one output day
    pub fn steps_per_day(&self) -> usize {
        (24 / self.hours()) as usize
    }
}

/// Configuration for the day-range convert run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Pollutant to process
    pub parameter: Parameter,

    /// First output day (inclusive)
    pub start_date: NaiveDate,

    /// Last output day (inclusive)
    pub end_date: NaiveDate,

    /// Grid name looked up in the GRIDDESC file
    pub grid_name: String,

    /// Path to the GRIDDESC file
    pub griddesc_path: PathBuf,

    /// Averaging period records must match
    pub averaging: AveragingPeriod,

    /// Write the per-observation CSV table
    pub write_csv: bool,

    /// Write the gridded NetCDF file
    pub write_netcdf: bool,

    /// Directory containing `<parameter>/YYYY/YYYY-MM-DD/<date>.ndjson` inputs
    pub input_root: PathBuf,

    /// Directory under which `nc/` and `csv/` outputs are created
    pub output_root: PathBuf,
}

impl ConvertConfig {
    /// Create a configuration with default grid, paths and outputs
    pub fn new(parameter: Parameter, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            parameter,
            start_date,
            end_date,
            grid_name: DEFAULT_GRID_NAME.to_string(),
            griddesc_path: PathBuf::from(DEFAULT_GRIDDESC),
            averaging: AveragingPeriod::default(),
            write_csv: true,
            write_netcdf: true,
            input_root: PathBuf::from("."),
            output_root: PathBuf::from("."),
        }
    }

    /// Use a different grid
    pub fn with_grid(mut self, grid_name: impl Into<String>) -> Self {
        self.grid_name = grid_name.into();
        self
    }

    /// Use a different GRIDDESC file
    pub fn with_griddesc(mut self, path: impl Into<PathBuf>) -> Self {
        self.griddesc_path = path.into();
        self
    }

    /// Set the averaging period
    pub fn with_averaging(mut self, averaging: AveragingPeriod) -> Self {
        self.averaging = averaging;
        self
    }

    /// Suppress the CSV table
    pub fn without_csv(mut self) -> Self {
        self.write_csv = false;
        self
    }

    /// Suppress the NetCDF grid
    pub fn without_netcdf(mut self) -> Self {
        self.write_netcdf = false;
        self
    }

    /// Set the input root directory
    pub fn with_input_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_root = path.into();
        self
    }

    /// Set the output root directory
    pub fn with_output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_root = path.into();
        self
    }

    /// Check the configuration before any data is read
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(OpenAqError::configuration(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }

        if !self.write_csv && !self.write_netcdf {
            return Err(OpenAqError::configuration(
                "both CSV and NetCDF output are disabled; nothing to do",
            ));
        }

        if self.write_netcdf && !cfg!(feature = "netcdf") {
            return Err(OpenAqError::configuration(
                "NetCDF output requested but this build has no NetCDF support; \
                 rebuild with the `netcdf` feature or pass --no-netcdf",
            ));
        }

        debug!(
            "Validated convert configuration: {} {}..={} on {} ({}H)",
            self.parameter,
            self.start_date,
            self.end_date,
            self.grid_name,
            self.averaging.hours()
        );
        Ok(())
    }

    /// Output days in the inclusive range
    pub fn dates(&self) -> Vec<NaiveDate> {
        date_range(self.start_date, self.end_date)
    }
}

/// Configuration for the archive fetch and subset stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Host (and optional path) of the public bucket
    pub bucket: String,

    /// Local mirror root; archive files land under `<root>/realtime-gzipped/`
    pub archive_root: PathBuf,

    /// Root for the per-parameter ndjson layout written by subset
    pub output_root: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            archive_root: PathBuf::from(DEFAULT_BUCKET),
            output_root: PathBuf::from("."),
        }
    }
}

impl ArchiveConfig {
    /// Set the bucket host
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Set the local archive root
    pub fn with_archive_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_root = path.into();
        self
    }

    /// Set the subset output root
    pub fn with_output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_root = path.into();
        self
    }
}

/// Every day from `start` to `end`, inclusive; empty when `start > end`
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        match current.checked_add_days(Days::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_averaging_period_from_hours() {
        assert_eq!(
            AveragingPeriod::from_hours(1).unwrap(),
            AveragingPeriod::OneHour
        );
        assert_eq!(
            AveragingPeriod::from_hours(24).unwrap(),
            AveragingPeriod::TwentyFourHours
        );
        assert!(AveragingPeriod::from_hours(8).is_err());
        assert_eq!(AveragingPeriod::OneHour.steps_per_day(), 24);
        assert_eq!(AveragingPeriod::TwentyFourHours.steps_per_day(), 1);
    }

    #[test]
    fn test_convert_config_defaults() {
        let config = ConvertConfig::new(Parameter::O3, day(2020, 1, 1), day(2020, 1, 3));

        assert_eq!(config.grid_name, "12US1");
        assert_eq!(config.griddesc_path, PathBuf::from("GRIDDESC"));
        assert_eq!(config.averaging, AveragingPeriod::OneHour);
        assert!(config.write_csv);
        assert!(config.write_netcdf);
        assert_eq!(config.dates().len(), 3);
    }

    #[test]
    fn test_convert_config_builders() {
        let config = ConvertConfig::new(Parameter::Pm25, day(2020, 1, 1), day(2020, 1, 1))
            .with_grid("108NHEMI2")
            .with_griddesc("/data/GRIDDESC")
            .with_averaging(AveragingPeriod::TwentyFourHours)
            .without_netcdf()
            .with_input_root("/data/in")
            .with_output_root("/data/out");

        assert_eq!(config.grid_name, "108NHEMI2");
        assert_eq!(config.griddesc_path, PathBuf::from("/data/GRIDDESC"));
        assert_eq!(config.averaging.hours(), 24);
        assert!(!config.write_netcdf);
        assert!(config.write_csv);
        assert_eq!(config.input_root, PathBuf::from("/data/in"));
        assert_eq!(config.output_root, PathBuf::from("/data/out"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_reversed_range() {
        let config =
            ConvertConfig::new(Parameter::O3, day(2020, 1, 5), day(2020, 1, 1)).without_netcdf();
        assert!(matches!(
            config.validate(),
            Err(OpenAqError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_no_outputs() {
        let config = ConvertConfig::new(Parameter::O3, day(2020, 1, 1), day(2020, 1, 1))
            .without_csv()
            .without_netcdf();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_date_range_crosses_month_and_leap_day() {
        let dates = date_range(day(2020, 2, 28), day(2020, 3, 1));
        assert_eq!(dates, vec![day(2020, 2, 28), day(2020, 2, 29), day(2020, 3, 1)]);
        assert!(date_range(day(2020, 3, 2), day(2020, 3, 1)).is_empty());
    }

    #[test]
    fn test_archive_config_defaults() {
        let config = ArchiveConfig::default().with_output_root("/tmp/subset");
        assert_eq!(config.bucket, "openaq-fetches.s3.amazonaws.com");
        assert_eq!(
            config.archive_root,
            PathBuf::from("openaq-fetches.s3.amazonaws.com")
        );
        assert_eq!(config.output_root, PathBuf::from("/tmp/subset"));
    }
}
