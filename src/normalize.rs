//! Record filtering and unit normalization.
//!
//! Turns raw archive lines for one output day into observations in their
//! parameter's canonical unit. Bad records are dropped or warned about;
//! only malformed JSON stops the run.

use crate::config::AveragingPeriod;
use crate::constants::{
    AVERAGING_UNIT_HOURS, INVALID_VALUE_THRESHOLD, O3_UGM3_TO_PPB, PPM_TO_PPB, UGM3_ENCODINGS,
};
use crate::error::{OpenAqError, Result};
use crate::models::{NormalizedObservation, Observation, Parameter, RawRecord};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Why a record was left out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    MissingCoordinates,
    AveragingMismatch,
    InvalidTimestamp,
    BelowSentinel,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DropReason::MissingCoordinates => "missing coordinates",
            DropReason::AveragingMismatch => "averaging period mismatch",
            DropReason::InvalidTimestamp => "unparseable timestamp",
            DropReason::BelowSentinel => "value below invalid-data sentinel",
        };
        f.write_str(text)
    }
}

/// Record counts for one day
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FilterStats {
    pub records_read: usize,
    pub accepted: usize,
    pub missing_coordinates: usize,
    pub averaging_mismatch: usize,
    pub invalid_timestamp: usize,
    pub below_sentinel: usize,
    pub unit_warnings: usize,
}

impl FilterStats {
    pub fn dropped(&self) -> usize {
        self.missing_coordinates + self.averaging_mismatch + self.invalid_timestamp + self.below_sentinel
    }

    fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingCoordinates => self.missing_coordinates += 1,
            DropReason::AveragingMismatch => self.averaging_mismatch += 1,
            DropReason::InvalidTimestamp => self.invalid_timestamp += 1,
            DropReason::BelowSentinel => self.below_sentinel += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum WarningKey {
    Drop(DropReason),
    Unit(String),
}

/// Filters and normalizes the records of one output day
///
/// Create one per day: the warn-once bookkeeping and the counts are scoped
/// to the filter's lifetime.
#[derive(Debug)]
pub struct RecordFilter {
    parameter: Parameter,
    averaging: AveragingPeriod,
    warned: HashSet<WarningKey>,
    stats: FilterStats,
}

impl RecordFilter {
    pub fn new(parameter: Parameter, averaging: AveragingPeriod) -> Self {
        Self {
            parameter,
            averaging,
            warned: HashSet::new(),
            stats: FilterStats::default(),
        }
    }

    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }

    /// Normalize every non-blank line of one input file
    ///
    /// A line that is not a valid record fails with its path and 1-based
    /// line number.
    pub fn normalize_text(&mut self, path: &Path, text: &str) -> Result<Vec<NormalizedObservation>> {
        let mut observations = Vec::new();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let record = parse_line(line).map_err(|source| OpenAqError::MalformedRecord {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })?;

            if let Some(observation) = self.normalize_record(record) {
                observations.push(observation);
            }
        }

        Ok(observations)
    }

    /// Apply the filters and unit conversion to one record
    pub fn normalize_record(&mut self, record: RawRecord) -> Option<NormalizedObservation> {
        self.stats.records_read += 1;

        let observation = match self.screen(record) {
            Ok(observation) => observation,
            Err((reason, detail)) => {
                self.drop_record(reason, &detail);
                return None;
            }
        };

        if observation.value < INVALID_VALUE_THRESHOLD {
            self.drop_record(
                DropReason::BelowSentinel,
                &format!("value {} < {}", observation.value, INVALID_VALUE_THRESHOLD),
            );
            return None;
        }

        let value = self.to_canonical_unit(observation.value, &observation.unit);
        self.stats.accepted += 1;

        Some(NormalizedObservation {
            longitude: observation.longitude,
            latitude: observation.latitude,
            timestamp: observation.timestamp,
            value,
        })
    }

    /// Log the day's counts
    pub fn log_summary(&self, date: NaiveDate) {
        let stats = &self.stats;
        info!(
            "{} {}: {} records read, {} accepted, {} dropped \
             ({} missing coordinates, {} averaging mismatch, {} bad timestamp, {} below sentinel), \
             {} unit warnings",
            date,
            self.parameter,
            stats.records_read,
            stats.accepted,
            stats.dropped(),
            stats.missing_coordinates,
            stats.averaging_mismatch,
            stats.invalid_timestamp,
            stats.below_sentinel,
            stats.unit_warnings
        );
    }

    /// Checks that need nothing but the record: coordinates, averaging
    /// period and timestamp
    fn screen(&self, record: RawRecord) -> std::result::Result<Observation, (DropReason, String)> {
        let coordinates = record.coordinates.ok_or_else(|| {
            (
                DropReason::MissingCoordinates,
                format!("location {}", record.location.as_deref().unwrap_or("unknown")),
            )
        })?;

        let (averaging_value, averaging_unit) = match record.averaging_period {
            Some(period) => (period.value, period.unit),
            None => (0.0, "unknown".to_string()),
        };
        if averaging_value != self.averaging.hours() as f64
            || averaging_unit.trim().to_lowercase() != AVERAGING_UNIT_HOURS
        {
            return Err((
                DropReason::AveragingMismatch,
                format!(
                    "got {} {}, expected {} {}",
                    averaging_value,
                    averaging_unit,
                    self.averaging.hours(),
                    AVERAGING_UNIT_HOURS
                ),
            ));
        }

        let timestamp = DateTime::parse_from_rfc3339(record.date.utc.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                (
                    DropReason::InvalidTimestamp,
                    format!("'{}': {}", record.date.utc, e),
                )
            })?;

        Ok(Observation {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            timestamp,
            value: record.value,
            unit: record.unit,
            averaging_value,
            averaging_unit,
        })
    }

    fn to_canonical_unit(&mut self, value: f64, unit: &str) -> f64 {
        let unit = unit.trim();
        match self.parameter {
            Parameter::O3 => {
                if is_ugm3(unit) {
                    value * O3_UGM3_TO_PPB
                } else if unit == "ppm" {
                    value * PPM_TO_PPB
                } else {
                    if unit != "ppb" {
                        self.warn_unit(unit, "treating as ppb");
                    }
                    value
                }
            }
            Parameter::Pm25 | Parameter::Pm10 => {
                if !is_ugm3(unit) {
                    self.warn_unit(unit, "keeping value as µg/m³");
                }
                value
            }
        }
    }

    fn drop_record(&mut self, reason: DropReason, detail: &str) {
        self.stats.record_drop(reason);
        if self.warned.insert(WarningKey::Drop(reason)) {
            warn!("Dropping {} record: {} ({})", self.parameter, reason, detail);
        } else {
            debug!("Dropping {} record: {} ({})", self.parameter, reason, detail);
        }
    }

    fn warn_unit(&mut self, unit: &str, action: &str) {
        self.stats.unit_warnings += 1;
        if self.warned.insert(WarningKey::Unit(unit.to_string())) {
            warn!("Unexpected {} unit '{}'; {}", self.parameter, unit, action);
        } else {
            debug!("Unexpected {} unit '{}'; {}", self.parameter, unit, action);
        }
    }
}

/// Decode one ndjson line
pub fn parse_line(line: &str) -> std::result::Result<RawRecord, serde_json::Error> {
    serde_json::from_str(line)
}

/// Whether a unit string is one of the archive's µg/m³ spellings
pub fn is_ugm3(unit: &str) -> bool {
    UGM3_ENCODINGS.contains(&unit.trim())
}
