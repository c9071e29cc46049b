//! Shared input trees for processor tests

use crate::config::ConvertConfig;
use crate::models::Parameter;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const GRIDDESC: &str = "' '
'LAM_40N97W'
  2        33.000        45.000       -97.000       -97.000        40.000
' '
'12US1'
'LAM_40N97W'  -2556000.000  -1728000.000  12000.000  12000.000 459 299 1
' '
";

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One archive line for an hourly record
pub fn record(lon: f64, lat: f64, utc: &str, value: f64, unit: &str) -> String {
    format!(
        r#"{{"location":"Test Site","parameter":"o3","date":{{"utc":"{}"}},"value":{},"unit":"{}","coordinates":{{"latitude":{},"longitude":{}}},"country":"US","averagingPeriod":{{"value":1,"unit":"hours"}}}}"#,
        utc, value, unit, lat, lon
    )
}

/// Write `lines` as the inputs ingested on `ingest` for measurement day `measured`
pub fn write_input(
    input_root: &Path,
    parameter: &str,
    ingest: &str,
    measured: &str,
    lines: &[String],
) -> PathBuf {
    let dir = input_root.join(parameter).join(&ingest[..4]).join(ingest);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{}.ndjson", measured));
    fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

/// Temporary workspace with a GRIDDESC file and empty input/output roots
pub struct Workspace {
    pub temp_dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("GRIDDESC"), GRIDDESC).unwrap();
        fs::create_dir_all(temp_dir.path().join("input")).unwrap();
        Self { temp_dir }
    }

    pub fn input_root(&self) -> PathBuf {
        self.temp_dir.path().join("input")
    }

    pub fn output_root(&self) -> PathBuf {
        self.temp_dir.path().join("output")
    }

    pub fn config(&self, start: NaiveDate, end: NaiveDate) -> ConvertConfig {
        ConvertConfig::new(Parameter::O3, start, end)
            .with_griddesc(self.temp_dir.path().join("GRIDDESC"))
            .with_input_root(self.input_root())
            .with_output_root(self.output_root())
    }
}
