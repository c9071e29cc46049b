//! Day-range driver.
//!
//! Walks an inclusive date range one day at a time: decides which outputs
//! are still missing, reads and normalizes that day's inputs, bins them onto
//! the grid and writes the missing artifacts.

pub mod discovery;
#[cfg(feature = "netcdf")]
pub mod grid_writer;
pub mod table_writer;

#[cfg(test)]
pub mod tests;

use self::discovery::{InputDiscovery, OutputPaths, read_lossy};
use self::table_writer::TableWriter;

use crate::aggregate::{DayAggregation, aggregate};
use crate::config::ConvertConfig;
use crate::error::Result;
use crate::grid::{GridDefinition, TimeAxis, load_grid};
use crate::models::ProcessingStats;
use crate::normalize::RecordFilter;

use chrono::NaiveDate;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outputs still to be written for one day
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayPlan {
    pub netcdf: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

impl DayPlan {
    /// Nothing requested is missing, so inputs need not be read
    pub fn is_complete(&self) -> bool {
        self.netcdf.is_none() && self.csv.is_none()
    }
}

/// Converts OpenAQ records to gridded and tabular output over a date range
#[derive(Debug)]
pub struct DayRangeProcessor {
    config: ConvertConfig,
    grid: GridDefinition,
    discovery: InputDiscovery,
    outputs: OutputPaths,
    show_progress: bool,
}

impl DayRangeProcessor {
    /// Validate the configuration and load the grid
    pub fn new(config: ConvertConfig) -> Result<Self> {
        config.validate()?;
        let grid = load_grid(&config.griddesc_path, &config.grid_name)?;
        debug!(
            "Loaded grid {} ({}x{}, GDTYP {}) from {}",
            grid.name,
            grid.ncols,
            grid.nrows,
            grid.params.gdtyp,
            config.griddesc_path.display()
        );

        Ok(Self {
            discovery: InputDiscovery::new(config.input_root.clone(), config.parameter),
            outputs: OutputPaths::new(
                config.output_root.clone(),
                grid.name.clone(),
                config.parameter,
                config.averaging,
            ),
            config,
            grid,
            show_progress: false,
        })
    }

    /// Show a progress bar over days
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn grid(&self) -> &GridDefinition {
        &self.grid
    }

    pub fn outputs(&self) -> &OutputPaths {
        &self.outputs
    }

    /// Which requested outputs for `date` do not exist yet
    pub fn plan_day(&self, date: NaiveDate) -> DayPlan {
        let pending = |requested: bool, path: PathBuf| {
            if !requested {
                None
            } else if path.exists() {
                info!("Keeping cached {}", path.display());
                None
            } else {
                Some(path)
            }
        };

        DayPlan {
            netcdf: pending(self.config.write_netcdf, self.outputs.netcdf(date)),
            csv: pending(self.config.write_csv, self.outputs.csv(date)),
        }
    }

    /// Main processing entry point
    pub fn process(&self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        let dates = self.config.dates();

        println!(
            "{}",
            format!("Gridding OpenAQ {}", self.config.parameter)
                .bright_green()
                .bold()
        );
        println!(
            "  {} {} ({}x{})",
            "Grid:".bright_cyan(),
            self.grid.name,
            self.grid.ncols,
            self.grid.nrows
        );
        println!(
            "  {} {} to {} ({}H)",
            "Days:".bright_cyan(),
            self.config.start_date,
            self.config.end_date,
            self.config.averaging.hours()
        );

        let progress_bar = if self.show_progress {
            let pb = ProgressBar::new(dates.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut stats = ProcessingStats::default();
        for date in dates {
            progress_bar.set_message(date.to_string());

            let plan = self.plan_day(date);
            if plan.is_complete() {
                debug!("{}: all outputs cached, skipping", date);
                stats.days_cached += 1;
            } else {
                self.process_day(date, &plan, &mut stats)?;
            }

            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        stats.processing_time_ms = start_time.elapsed().as_millis();
        print_summary(&stats);

        Ok(stats)
    }

    /// Read, normalize, bin and write one day
    fn process_day(
        &self,
        date: NaiveDate,
        plan: &DayPlan,
        stats: &mut ProcessingStats,
    ) -> Result<()> {
        stats.days_processed += 1;

        let files = self.discovery.discover(date)?;
        if files.is_empty() {
            info!("{}: no input files, skipping", date);
            stats.days_without_data += 1;
            return Ok(());
        }

        let mut filter = RecordFilter::new(self.config.parameter, self.config.averaging);
        let mut observations = Vec::new();
        for path in &files {
            debug!("Reading {}", path.display());
            let text = read_lossy(path)?;
            observations.extend(filter.normalize_text(path, &text)?);
        }
        filter.log_summary(date);

        stats.files_read += files.len();
        stats.records_read += filter.stats().records_read;
        stats.records_accepted += filter.stats().accepted;
        stats.records_dropped += filter.stats().dropped();

        let axis = TimeAxis::for_day(date, self.config.averaging);
        let day = aggregate(&self.grid, &axis, observations);
        stats.observations_inside += day.inside.len();
        stats.observations_outside += day.outside;

        if day.is_empty() {
            warn!("{}: no valid data inside {}", date, self.grid.name);
            stats.days_without_data += 1;
            return Ok(());
        }

        if let Some(path) = &plan.netcdf {
            self.write_grid(path, &axis, &day)?;
            info!("Wrote {}", path.display());
            stats.grids_written += 1;
        }

        if let Some(path) = &plan.csv {
            TableWriter::new(self.config.parameter).write(path, &day.inside)?;
            info!("Wrote {}", path.display());
            stats.tables_written += 1;
        }

        Ok(())
    }

    #[cfg(feature = "netcdf")]
    fn write_grid(&self, path: &std::path::Path, axis: &TimeAxis, day: &DayAggregation) -> Result<()> {
        grid_writer::GridWriter::new(self.config.parameter).write(path, &self.grid, axis, &day.grid)
    }

    #[cfg(not(feature = "netcdf"))]
    fn write_grid(&self, path: &std::path::Path, _axis: &TimeAxis, _day: &DayAggregation) -> Result<()> {
        Err(crate::error::OpenAqError::configuration(format!(
            "cannot write {}: this build has no NetCDF support",
            path.display()
        )))
    }
}

fn print_summary(stats: &ProcessingStats) {
    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time_ms.to_string().bright_white()
    );
    println!(
        "  {} {} processed, {} cached, {} without data",
        "Days:".bright_cyan(),
        stats.days_processed.to_string().bright_white(),
        stats.days_cached.to_string().bright_white(),
        stats.days_without_data.to_string().bright_white()
    );
    println!(
        "  {} {} read, {} accepted, {} dropped",
        "Records:".bright_cyan(),
        stats.records_read.to_string().bright_white(),
        stats.records_accepted.to_string().bright_white(),
        stats.records_dropped.to_string().bright_white()
    );
    if stats.observations_outside > 0 {
        println!(
            "  {} {}",
            "Outside grid:".bright_yellow(),
            stats.observations_outside.to_string().bright_yellow()
        );
    }
    println!(
        "  {} {} grids, {} tables",
        "Written:".bright_cyan(),
        stats.grids_written.to_string().bright_white().bold(),
        stats.tables_written.to_string().bright_white().bold()
    );
}
