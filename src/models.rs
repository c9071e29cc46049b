//! Core data structures and types for OpenAQ processing.
//!
//! Defines the supported pollutant parameters, the serde view of archive
//! records, parsed and normalized observations, and run statistics.

use crate::error::{OpenAqError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pollutant parameters with defined unit handling
///
/// The set is closed: every parameter maps to exactly one normalization
/// strategy, and names outside the set are rejected when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parameter {
    O3,
    Pm25,
    Pm10,
}

impl Parameter {
    /// Name used by the archive and in file paths
    pub fn name(&self) -> &'static str {
        match self {
            Parameter::O3 => "o3",
            Parameter::Pm25 => "pm25",
            Parameter::Pm10 => "pm10",
        }
    }

    /// Gridded variable name for the mean field
    pub fn variable_name(&self) -> &'static str {
        match self {
            Parameter::O3 => "O3",
            Parameter::Pm25 => "PM25",
            Parameter::Pm10 => "PM10",
        }
    }

    /// Gridded variable name for the sample count field
    pub fn count_variable_name(&self) -> String {
        format!("{}N", self.variable_name())
    }

    /// Unit every value of this parameter is normalized to
    pub fn canonical_unit(&self) -> CanonicalUnit {
        match self {
            Parameter::O3 => CanonicalUnit::Ppb,
            Parameter::Pm25 | Parameter::Pm10 => CanonicalUnit::MicrogramsPerCubicMeter,
        }
    }

    /// Header of the value column in tabular output, e.g. `O3PPB`
    pub fn table_value_column(&self) -> String {
        format!(
            "{}{}",
            self.variable_name(),
            self.canonical_unit().column_suffix()
        )
    }
}

impl FromStr for Parameter {
    type Err = OpenAqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "o3" => Ok(Parameter::O3),
            "pm25" => Ok(Parameter::Pm25),
            "pm10" => Ok(Parameter::Pm10),
            other => Err(OpenAqError::configuration(format!(
                "unit handling is not defined for parameter '{}'; supported parameters are o3, pm25, pm10",
                other
            ))),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical units values are normalized to before aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanonicalUnit {
    Ppb,
    MicrogramsPerCubicMeter,
}

impl CanonicalUnit {
    /// Units attribute written to gridded output
    pub fn ioapi_units(&self) -> &'static str {
        match self {
            CanonicalUnit::Ppb => "ppb",
            CanonicalUnit::MicrogramsPerCubicMeter => "micrograms/m**3",
        }
    }

    fn column_suffix(&self) -> &'static str {
        match self {
            CanonicalUnit::Ppb => "PPB",
            CanonicalUnit::MicrogramsPerCubicMeter => "UGM3",
        }
    }
}

// =============================================================================
// Archive Records
// =============================================================================

/// One ndjson line of the OpenAQ archive, as published
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub date: RawDate,
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub value: f64,
    pub unit: String,
    #[serde(rename = "averagingPeriod", default)]
    pub averaging_period: Option<RawAveragingPeriod>,
    #[serde(default)]
    pub coordinates: Option<RawCoordinates>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDate {
    pub utc: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAveragingPeriod {
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

// =============================================================================
// Observations
// =============================================================================

/// A record that has coordinates and a parseable timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
    pub averaging_value: f64,
    pub averaging_unit: String,
}

/// An observation converted to its parameter's canonical unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedObservation {
    pub longitude: f64,
    pub latitude: f64,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

// =============================================================================
// Statistics
// =============================================================================

/// Processing statistics for a convert run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProcessingStats {
    pub days_processed: usize,
    pub days_cached: usize,
    pub days_without_data: usize,
    pub files_read: usize,
    pub records_read: usize,
    pub records_accepted: usize,
    pub records_dropped: usize,
    pub observations_inside: usize,
    pub observations_outside: usize,
    pub grids_written: usize,
    pub tables_written: usize,
    pub processing_time_ms: u128,
}
