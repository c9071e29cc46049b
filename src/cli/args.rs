//! Command-line argument definitions for the OpenAQ processor
//!
//! This module defines the CLI interface using the clap derive API: one
//! subcommand per pipeline stage, with verbosity flags shared by all.

use crate::config::{ArchiveConfig, AveragingPeriod, ConvertConfig};
use crate::constants::{DEFAULT_BUCKET, DEFAULT_GRIDDESC, DEFAULT_GRID_NAME};
use crate::error::{OpenAqError, Result};
use crate::models::Parameter;
use chrono::NaiveDate;
use clap::builder::TypedValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// CLI arguments for the OpenAQ processor
///
/// Mirrors the OpenAQ realtime archive, subsets it by pollutant and grids
/// the observations onto IOAPI model grids as NetCDF and CSV.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "openaq-processor",
    version,
    about = "Grid OpenAQ surface observations onto IOAPI model grids",
    long_about = "Downloads the OpenAQ realtime archive, extracts one pollutant per measurement day \
                  and converts the observations into per-day IOAPI NetCDF grids (mean and count per \
                  cell and time step) and CSV tables of the observations inside the grid."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors. Overrides verbose settings and hides progress bars.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Available subcommands for the OpenAQ processor
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Grid one pollutant over a date range
    Convert(ConvertArgs),
    /// Extract one pollutant from mirrored archive days
    Subset(SubsetArgs),
    /// Mirror archive days from the public bucket
    Fetch(FetchArgs),
}

/// Arguments for the convert command
#[derive(Debug, Clone, Parser)]
pub struct ConvertArgs {
    /// Pollutant parameter (o3, pm25 or pm10)
    #[arg(value_name = "PARAMETER")]
    pub parameter: String,

    /// First day to process (YYYY-MM-DD or YYYYMMDD)
    #[arg(value_name = "STARTDATE", value_parser = parse_date)]
    pub start_date: NaiveDate,

    /// Last day to process, inclusive
    #[arg(value_name = "ENDDATE", value_parser = parse_date)]
    pub end_date: NaiveDate,

    /// Grid name in the GRIDDESC file
    #[arg(value_name = "GDNAM", default_value = DEFAULT_GRID_NAME)]
    pub grid_name: String,

    /// GRIDDESC file describing the grid
    #[arg(
        short = 'g',
        long = "griddesc",
        value_name = "PATH",
        default_value = DEFAULT_GRIDDESC
    )]
    pub griddesc: PathBuf,

    /// Averaging period records must have, in hours
    #[arg(
        long = "averaging-hours",
        value_name = "HOURS",
        default_value_t = 1,
        value_parser = clap::builder::PossibleValuesParser::new(["1", "24"])
            .map(|s| s.parse::<u32>().unwrap_or(1))
    )]
    pub averaging_hours: u32,

    /// Skip the CSV table output
    #[arg(long = "no-csv")]
    pub no_csv: bool,

    /// Skip the NetCDF grid output
    #[arg(long = "no-netcdf")]
    pub no_netcdf: bool,

    /// Root of the <parameter>/YYYY/YYYY-MM-DD/<date>.ndjson input tree
    #[arg(long = "input-root", value_name = "DIR", default_value = ".")]
    pub input_root: PathBuf,

    /// Root under which nc/ and csv/ outputs are written
    #[arg(long = "output-root", value_name = "DIR", default_value = ".")]
    pub output_root: PathBuf,
}

/// Arguments for the subset command
#[derive(Debug, Clone, Parser)]
pub struct SubsetArgs {
    /// Archive parameter name (e.g. o3, pm25, no2)
    #[arg(value_name = "PARAMETER")]
    pub parameter: String,

    /// First ingest day (YYYY-MM-DD or YYYYMMDD)
    #[arg(value_name = "STARTDATE", value_parser = parse_date)]
    pub start_date: NaiveDate,

    /// Last ingest day, inclusive
    #[arg(value_name = "ENDDATE", value_parser = parse_date)]
    pub end_date: NaiveDate,

    /// Local archive mirror
    #[arg(long = "archive-root", value_name = "DIR", default_value = DEFAULT_BUCKET)]
    pub archive_root: PathBuf,

    /// Root for the per-parameter ndjson tree
    #[arg(long = "output-root", value_name = "DIR", default_value = ".")]
    pub output_root: PathBuf,
}

/// Arguments for the fetch command
#[derive(Debug, Clone, Parser)]
pub struct FetchArgs {
    /// First ingest day (YYYY-MM-DD or YYYYMMDD)
    #[arg(value_name = "STARTDATE", value_parser = parse_date)]
    pub start_date: NaiveDate,

    /// Last ingest day, inclusive
    #[arg(value_name = "ENDDATE", value_parser = parse_date)]
    pub end_date: NaiveDate,

    /// Local archive mirror
    #[arg(long = "archive-root", value_name = "DIR", default_value = DEFAULT_BUCKET)]
    pub archive_root: PathBuf,

    /// Bucket host to download from
    #[arg(long = "bucket", value_name = "HOST", default_value = DEFAULT_BUCKET)]
    pub bucket: String,
}

/// Parse `YYYY-MM-DD` or `YYYYMMDD`
pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|_| format!("invalid date '{}': expected YYYY-MM-DD or YYYYMMDD", s))
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(OpenAqError::configuration(format!(
            "start date {} is after end date {}",
            start, end
        )));
    }
    Ok(())
}

impl Args {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

impl ConvertArgs {
    /// Resolve the parameter and build the run configuration
    pub fn to_config(&self) -> Result<ConvertConfig> {
        let parameter = Parameter::from_str(&self.parameter)?;
        let averaging = AveragingPeriod::from_hours(self.averaging_hours)?;

        let mut config = ConvertConfig::new(parameter, self.start_date, self.end_date)
            .with_grid(self.grid_name.clone())
            .with_griddesc(self.griddesc.clone())
            .with_averaging(averaging)
            .with_input_root(self.input_root.clone())
            .with_output_root(self.output_root.clone());
        if self.no_csv {
            config = config.without_csv();
        }
        if self.no_netcdf {
            config = config.without_netcdf();
        }

        config.validate()?;
        Ok(config)
    }
}

impl SubsetArgs {
    pub fn to_config(&self) -> Result<ArchiveConfig> {
        check_range(self.start_date, self.end_date)?;
        Ok(ArchiveConfig::default()
            .with_archive_root(self.archive_root.clone())
            .with_output_root(self.output_root.clone()))
    }
}

impl FetchArgs {
    pub fn to_config(&self) -> Result<ArchiveConfig> {
        check_range(self.start_date, self.end_date)?;
        Ok(ArchiveConfig::default()
            .with_bucket(self.bucket.clone())
            .with_archive_root(self.archive_root.clone()))
    }
}
