//! Spatial-temporal binning of observations onto a grid.

use crate::grid::{GridDefinition, TimeAxis};
use crate::models::NormalizedObservation;
use tracing::debug;

/// Mean and sample count per `(step, row, col)` cell
///
/// Both buffers are laid out step-major then row then column, matching the
/// `(TSTEP, ROW, COL)` order of gridded output. Empty cells hold mean 0 and
/// count 0.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAggregate {
    n_steps: usize,
    nrows: usize,
    ncols: usize,
    mean: Vec<f64>,
    count: Vec<u32>,
}

impl GridAggregate {
    fn zeros(n_steps: usize, nrows: usize, ncols: usize) -> Self {
        let size = n_steps * nrows * ncols;
        Self {
            n_steps,
            nrows,
            ncols,
            mean: vec![0.0; size],
            count: vec![0; size],
        }
    }

    fn offset(&self, step: usize, row: usize, col: usize) -> usize {
        (step * self.nrows + row) * self.ncols + col
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn count(&self) -> &[u32] {
        &self.count
    }

    /// Mean and count of one cell
    pub fn cell(&self, step: usize, row: usize, col: usize) -> (f64, u32) {
        let offset = self.offset(step, row, col);
        (self.mean[offset], self.count[offset])
    }

    /// Number of cells holding at least one observation
    pub fn occupied_cells(&self) -> usize {
        self.count.iter().filter(|&&n| n > 0).count()
    }
}

/// Result of binning one day's observations
#[derive(Debug, Clone)]
pub struct DayAggregation {
    /// Observations inside the grid and time axis, in input order
    pub inside: Vec<NormalizedObservation>,
    pub grid: GridAggregate,
    /// Number of observations outside the domain
    pub outside: usize,
}

impl DayAggregation {
    pub fn is_empty(&self) -> bool {
        self.inside.is_empty()
    }
}

/// Bin observations onto the grid for one day
pub fn aggregate(
    grid: &GridDefinition,
    axis: &TimeAxis,
    observations: Vec<NormalizedObservation>,
) -> DayAggregation {
    let longitudes: Vec<f64> = observations.iter().map(|o| o.longitude).collect();
    let latitudes: Vec<f64> = observations.iter().map(|o| o.latitude).collect();
    let timestamps: Vec<_> = observations.iter().map(|o| o.timestamp).collect();

    let (cols, rows) = grid.lonlat_to_index(&longitudes, &latitudes);
    let steps = axis.time_to_step(&timestamps);

    let mut aggregate = GridAggregate::zeros(axis.n_steps(), grid.nrows, grid.ncols);
    let mut sums = vec![0.0; aggregate.mean.len()];
    let mut inside = Vec::new();
    let mut outside = 0;

    for (index, observation) in observations.into_iter().enumerate() {
        let (col, row, step) = (cols[index], rows[index], steps[index]);
        let in_domain = (0.0..grid.ncols as f64).contains(&col)
            && (0.0..grid.nrows as f64).contains(&row)
            && (0.0..axis.n_steps() as f64).contains(&step);
        if !in_domain {
            outside += 1;
            continue;
        }

        let (Some(col), Some(row), Some(step)) = (
            nearest_bin(col, grid.ncols),
            nearest_bin(row, grid.nrows),
            nearest_bin(step, axis.n_steps()),
        ) else {
            outside += 1;
            continue;
        };

        let offset = aggregate.offset(step, row, col);
        sums[offset] += observation.value;
        aggregate.count[offset] += 1;
        inside.push(observation);
    }

    for ((mean, sum), &count) in aggregate.mean.iter_mut().zip(&sums).zip(&aggregate.count) {
        if count > 0 {
            *mean = sum / count as f64;
        }
    }

    debug!(
        "Binned {} observations into {} cells, {} outside the domain",
        inside.len(),
        aggregate.occupied_cells(),
        outside
    );

    DayAggregation {
        inside,
        grid: aggregate,
        outside,
    }
}

/// Bin index of a raw index using half-open bins `[k-0.5, k+0.5)`
///
/// Returns `None` when the bin falls outside `0..len`.
fn nearest_bin(raw: f64, len: usize) -> Option<usize> {
    let bin = (raw + 0.5).floor();
    if bin >= 0.0 && bin < len as f64 {
        Some(bin as usize)
    } else {
        None
    }
}
