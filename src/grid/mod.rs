//! Grid definitions and coordinate mapping.
//!
//! A [`GridDefinition`] is loaded from a GRIDDESC file and maps longitude and
//! latitude to fractional column and row indices on the grid.

pub mod griddesc;
pub mod projection;
pub mod time;

pub use griddesc::{GridDesc, load_grid};
pub use projection::{Projection, ProjectionParams};
pub use time::TimeAxis;

/// A named IOAPI grid and its coordinate system
#[derive(Debug, Clone)]
pub struct GridDefinition {
    pub name: String,
    pub coord_name: String,
    pub params: ProjectionParams,
    pub projection: Projection,
    pub xorig: f64,
    pub yorig: f64,
    pub xcell: f64,
    pub ycell: f64,
    pub ncols: usize,
    pub nrows: usize,
    pub nthik: i32,
}

impl GridDefinition {
    /// Column and row index of each point
    ///
    /// Indices count whole cells from the lower-left grid corner and are
    /// truncated toward zero, so points just outside the west or south edge
    /// (within one cell) land on index 0. Points outside the domain give
    /// indices outside `0..ncols` / `0..nrows`; non-finite inputs give NaN.
    pub fn lonlat_to_index(&self, longitudes: &[f64], latitudes: &[f64]) -> (Vec<f64>, Vec<f64>) {
        longitudes
            .iter()
            .zip(latitudes)
            .map(|(&lon, &lat)| {
                let (x, y) = self.projection.forward(lon, lat);
                (
                    ((x - self.xorig) / self.xcell).trunc(),
                    ((y - self.yorig) / self.ycell).trunc(),
                )
            })
            .unzip()
    }

    /// Number of cells in one layer
    pub fn cell_count(&self) -> usize {
        self.ncols * self.nrows
    }
}
