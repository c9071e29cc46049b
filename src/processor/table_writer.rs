//! Per-observation CSV output
//!
//! One row per in-domain observation, in input order, with columns
//! `longitude,latitude,date,<VAR><UNIT>`.

use super::discovery::{ensure_parent, partial_path};
use crate::error::Result;
use crate::models::{NormalizedObservation, Parameter};
use polars::prelude::{Column, CsvWriter, DataFrame, SerWriter};
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

/// Timestamp layout of the `date` column, e.g. `2020-01-01 13:00:00+0000`
pub const TABLE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Writes the observation table for one day
#[derive(Debug, Clone, Copy)]
pub struct TableWriter {
    parameter: Parameter,
}

impl TableWriter {
    pub fn new(parameter: Parameter) -> Self {
        Self { parameter }
    }

    /// Build the table as a DataFrame
    pub fn to_dataframe(&self, observations: &[NormalizedObservation]) -> Result<DataFrame> {
        let longitudes: Vec<f64> = observations.iter().map(|o| o.longitude).collect();
        let latitudes: Vec<f64> = observations.iter().map(|o| o.latitude).collect();
        let dates: Vec<String> = observations
            .iter()
            .map(|o| o.timestamp.format(TABLE_DATE_FORMAT).to_string())
            .collect();
        let values: Vec<f64> = observations.iter().map(|o| o.value).collect();

        let df = DataFrame::new(vec![
            Column::new("longitude".into(), longitudes),
            Column::new("latitude".into(), latitudes),
            Column::new("date".into(), dates),
            Column::new(self.parameter.table_value_column().into(), values),
        ])?;
        Ok(df)
    }

    /// Write the table to `path` via a partial file
    pub fn write(&self, path: &Path, observations: &[NormalizedObservation]) -> Result<()> {
        let mut df = self.to_dataframe(observations)?;
        ensure_parent(path)?;

        let partial = partial_path(path);
        {
            let mut file = File::create(&partial)?;
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut df)?;
        }
        fs::rename(&partial, path)?;

        debug!("Wrote {} rows to {}", df.height(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn observation(value: f64) -> NormalizedObservation {
        NormalizedObservation {
            longitude: -97.25,
            latitude: 40.5,
            timestamp: Utc.with_ymd_and_hms(2020, 1, 1, 13, 0, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn test_dataframe_columns() {
        let df = TableWriter::new(Parameter::Pm25)
            .to_dataframe(&[observation(8.0), observation(9.0)])
            .unwrap();

        assert_eq!(df.height(), 2);
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(names, vec!["longitude", "latitude", "date", "PM25UGM3"]);
    }

    #[test]
    fn test_write_csv() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("csv").join("12US1").join("day.csv");

        TableWriter::new(Parameter::O3)
            .write(&path, &[observation(31.0)])
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("longitude,latitude,date,O3PPB"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("-97.25,40.5,2020-01-01 13:00:00+0000,31"));
        assert!(lines.next().is_none());
        assert!(!partial_path(&path).exists());
    }
}
