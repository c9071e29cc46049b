//! OpenAQ Processor Library
//!
//! A Rust library for turning the OpenAQ realtime archive into gridded
//! surface observations for air-quality model evaluation.
//!
//! This library provides tools for:
//! - Mirroring the daily gzipped ndjson archive from the public bucket
//! - Splitting archive days into per-pollutant, per-measurement-day files
//! - Parsing GRIDDESC files and projecting longitude/latitude onto IOAPI grids
//! - Filtering and unit-normalizing O3, PM2.5 and PM10 records
//! - Writing per-day IOAPI NetCDF grids (mean and count) and CSV tables

pub mod aggregate;
pub mod archive;
pub mod config;
pub mod constants;
pub mod error;
pub mod grid;
pub mod models;
pub mod normalize;
pub mod processor;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{ArchiveConfig, AveragingPeriod, ConvertConfig};
pub use error::{OpenAqError, Result};
pub use grid::{GridDefinition, TimeAxis, load_grid};
pub use models::{NormalizedObservation, Parameter, ProcessingStats};
pub use processor::DayRangeProcessor;
