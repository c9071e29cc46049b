//! IOAPI-style NetCDF output
//!
//! Each day becomes a NetCDF-4 classic-model file laid out the way IOAPI
//! tools expect:
//! ```text
//! dimensions:  TSTEP = UNLIMITED, DATE-TIME = 2, LAY = 1, VAR = 2, ROW, COL
//! variables:   int   TFLAG(TSTEP, VAR, DATE-TIME)
//!              float <VAR>(TSTEP, LAY, ROW, COL)     mean
//!              float <VAR>N(TSTEP, LAY, ROW, COL)    sample count
//! ```

use super::discovery::{ensure_parent, partial_path};
use crate::aggregate::GridAggregate;
use crate::constants::{
    IOAPI_BADVAL, IOAPI_DESC_WIDTH, IOAPI_NAME_WIDTH, NETCDF_COMPRESSION_LEVEL, OUTPUT_PREFIX,
};
use crate::error::Result;
use crate::grid::{GridDefinition, TimeAxis};
use crate::models::Parameter;
use chrono::{Datelike, Timelike, Utc};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Number of variables besides TFLAG
const NVARS: usize = 2;

/// Writes the gridded mean and count for one day
#[derive(Debug, Clone, Copy)]
pub struct GridWriter {
    parameter: Parameter,
}

impl GridWriter {
    pub fn new(parameter: Parameter) -> Self {
        Self { parameter }
    }

    /// Write `aggregate` to `path` via a partial file
    pub fn write(
        &self,
        path: &Path,
        grid: &GridDefinition,
        axis: &TimeAxis,
        aggregate: &GridAggregate,
    ) -> Result<()> {
        ensure_parent(path)?;
        let partial = partial_path(path);
        // A crashed earlier run may have left a partial file behind
        if partial.exists() {
            fs::remove_file(&partial)?;
        }

        {
            let mut file =
                netcdf::create_with(&partial, netcdf::Options::NETCDF4 | netcdf::Options::CLASSIC)?;
            self.define(&mut file, grid, axis)?;
            self.write_variables(&mut file, axis, aggregate)?;
        }
        fs::rename(&partial, path)?;

        debug!(
            "Wrote {} grid ({} steps, {}x{}) to {}",
            self.parameter,
            aggregate.n_steps(),
            aggregate.nrows(),
            aggregate.ncols(),
            path.display()
        );
        Ok(())
    }

    fn define(
        &self,
        file: &mut netcdf::FileMut,
        grid: &GridDefinition,
        axis: &TimeAxis,
    ) -> Result<()> {
        file.add_unlimited_dimension("TSTEP")?;
        file.add_dimension("DATE-TIME", 2)?;
        file.add_dimension("LAY", 1)?;
        file.add_dimension("VAR", NVARS)?;
        file.add_dimension("ROW", grid.nrows)?;
        file.add_dimension("COL", grid.ncols)?;

        let var_name = self.parameter.variable_name();
        let count_name = self.parameter.count_variable_name();
        let now = Utc::now();
        let cdate = now.year() * 1000 + now.ordinal() as i32;
        let ctime = (now.hour() * 10000 + now.minute() * 100 + now.second()) as i32;

        file.add_attribute("IOAPI_VERSION", pad("ioapi-3.2", IOAPI_DESC_WIDTH))?;
        file.add_attribute("EXEC_ID", pad(env!("CARGO_PKG_NAME"), IOAPI_DESC_WIDTH))?;
        file.add_attribute("FTYPE", 1i32)?;
        file.add_attribute("CDATE", cdate)?;
        file.add_attribute("CTIME", ctime)?;
        file.add_attribute("WDATE", cdate)?;
        file.add_attribute("WTIME", ctime)?;
        file.add_attribute("SDATE", axis.sdate())?;
        file.add_attribute("STIME", axis.stime())?;
        file.add_attribute("TSTEP", axis.tstep())?;
        file.add_attribute("NTHIK", grid.nthik)?;
        file.add_attribute("NCOLS", grid.ncols as i32)?;
        file.add_attribute("NROWS", grid.nrows as i32)?;
        file.add_attribute("NLAYS", 1i32)?;
        file.add_attribute("NVARS", NVARS as i32)?;
        file.add_attribute("GDTYP", grid.params.gdtyp)?;
        file.add_attribute("P_ALP", grid.params.p_alp)?;
        file.add_attribute("P_BET", grid.params.p_bet)?;
        file.add_attribute("P_GAM", grid.params.p_gam)?;
        file.add_attribute("XCENT", grid.params.xcent)?;
        file.add_attribute("YCENT", grid.params.ycent)?;
        file.add_attribute("XORIG", grid.xorig)?;
        file.add_attribute("YORIG", grid.yorig)?;
        file.add_attribute("XCELL", grid.xcell)?;
        file.add_attribute("YCELL", grid.ycell)?;
        file.add_attribute("VGTYP", IOAPI_BADVAL)?;
        file.add_attribute("VGTOP", 0f32)?;
        file.add_attribute("VGLVLS", vec![0f32, 0f32])?;
        file.add_attribute("GDNAM", pad(&grid.name, IOAPI_NAME_WIDTH))?;
        file.add_attribute("UPNAM", pad(OUTPUT_PREFIX, IOAPI_NAME_WIDTH))?;
        file.add_attribute(
            "VAR-LIST",
            format!(
                "{}{}",
                pad(var_name, IOAPI_NAME_WIDTH),
                pad(&count_name, IOAPI_NAME_WIDTH)
            ),
        )?;
        file.add_attribute(
            "FILEDESC",
            pad(
                &format!("OpenAQ {} gridded to {}", self.parameter, grid.name),
                IOAPI_DESC_WIDTH,
            ),
        )?;
        file.add_attribute(
            "HISTORY",
            format!(
                "{} {}: {}H mean and count of OpenAQ {} observations",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                axis.step_duration().num_hours(),
                self.parameter
            ),
        )?;

        Ok(())
    }

    fn write_variables(
        &self,
        file: &mut netcdf::FileMut,
        axis: &TimeAxis,
        aggregate: &GridAggregate,
    ) -> Result<()> {
        let (n_steps, nrows, ncols) = (aggregate.n_steps(), aggregate.nrows(), aggregate.ncols());
        let var_name = self.parameter.variable_name();
        let count_name = self.parameter.count_variable_name();
        let units = self.parameter.canonical_unit().ioapi_units();

        let tflags: Vec<i32> = axis
            .tflags()
            .into_iter()
            .flat_map(|(date, time)| std::iter::repeat_n([date, time], NVARS).flatten())
            .collect();

        // Mask: cells without samples carry 0 regardless of the mean buffer
        let means: Vec<f32> = aggregate
            .mean()
            .iter()
            .zip(aggregate.count())
            .map(|(&mean, &count)| if count == 0 { 0.0 } else { mean as f32 })
            .collect();
        let counts: Vec<f32> = aggregate.count().iter().map(|&n| n as f32).collect();

        let mut tflag = file.add_variable::<i32>("TFLAG", &["TSTEP", "VAR", "DATE-TIME"])?;
        tflag.put_attribute("units", pad("<YYYYDDD,HHMMSS>", IOAPI_NAME_WIDTH))?;
        tflag.put_attribute("long_name", pad("TFLAG", IOAPI_NAME_WIDTH))?;
        tflag.put_attribute(
            "var_desc",
            pad(
                "Timestep-valid flags:  (1) YYYYDDD or (2) HHMMSS",
                IOAPI_DESC_WIDTH,
            ),
        )?;
        tflag.put_values(&tflags, (0..n_steps, 0..NVARS, 0..2))?;

        let data_dims = ["TSTEP", "LAY", "ROW", "COL"];
        let mut mean = file.add_variable::<f32>(var_name, &data_dims)?;
        mean.set_compression(NETCDF_COMPRESSION_LEVEL, false)?;
        mean.put_attribute("long_name", pad(var_name, IOAPI_NAME_WIDTH))?;
        mean.put_attribute("units", pad(units, IOAPI_NAME_WIDTH))?;
        mean.put_attribute(
            "var_desc",
            pad(&format!("{} mean", var_name), IOAPI_DESC_WIDTH),
        )?;
        mean.put_values(&means, (0..n_steps, 0..1, 0..nrows, 0..ncols))?;

        let mut count = file.add_variable::<f32>(&count_name, &data_dims)?;
        count.set_compression(NETCDF_COMPRESSION_LEVEL, false)?;
        count.put_attribute("long_name", pad(&count_name, IOAPI_NAME_WIDTH))?;
        count.put_attribute("units", pad("1", IOAPI_NAME_WIDTH))?;
        count.put_attribute(
            "var_desc",
            pad(&format!("{} count", var_name), IOAPI_DESC_WIDTH),
        )?;
        count.put_values(&counts, (0..n_steps, 0..1, 0..nrows, 0..ncols))?;

        Ok(())
    }
}

/// Left-justify `text` in a field of `width` characters
fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}
