//! Application constants for the OpenAQ processor
//!
//! Unit conversion factors, record filter thresholds, file layout
//! templates and IOAPI metadata defaults used throughout the crate.

// =============================================================================
// Record Filtering and Unit Conversion
// =============================================================================

/// Values below this are sensor sentinels for invalid or missing readings
pub const INVALID_VALUE_THRESHOLD: f64 = -100.0;

/// Ideal-gas factor converting ozone from µg/m³ to ppb at 20°C and 1 atm
///
/// 293.15 K * 8.314 J/(mol K) / 101325 Pa / 0.048 kg/mol
pub const O3_UGM3_TO_PPB: f64 = 293.15 * 8.314 / 101325.0 / 0.048;

/// Multiplier from ppm to ppb
pub const PPM_TO_PPB: f64 = 1000.0;

/// Unit strings the archive uses for micrograms per cubic meter
///
/// Compared byte-for-byte after trimming surrounding whitespace.
pub const UGM3_ENCODINGS: &[&str] = &["µg/m³", "<C2><B5>m<C3><B4>", "ug/m3"];

/// Averaging period unit accepted by the filter (compared case-insensitively)
pub const AVERAGING_UNIT_HOURS: &str = "hours";

// =============================================================================
// File Layout
// =============================================================================

/// Default grid name when none is given on the command line
pub const DEFAULT_GRID_NAME: &str = "12US1";

/// Default grid description file name
pub const DEFAULT_GRIDDESC: &str = "GRIDDESC";

/// Prefix for every output artifact
pub const OUTPUT_PREFIX: &str = "OPENAQ";

/// Extension and directory name for gridded output
pub const NETCDF_KIND: &str = "nc";

/// Extension and directory name for tabular output
pub const CSV_KIND: &str = "csv";

/// Suffix for files that are still being written
pub const PARTIAL_SUFFIX: &str = "tmp";

// =============================================================================
// Upstream Archive
// =============================================================================

/// Public bucket holding the daily gzipped ndjson archive
pub const DEFAULT_BUCKET: &str = "openaq-fetches.s3.amazonaws.com";

/// Prefix under which each ingest day's archive files live
pub const ARCHIVE_PREFIX: &str = "realtime-gzipped";

/// Extension of the archived record files
pub const ARCHIVE_EXTENSION: &str = ".ndjson.gz";

// =============================================================================
// IOAPI Metadata
// =============================================================================

/// Earth radius in meters for IOAPI spherical projections
pub const EARTH_RADIUS_M: f64 = 6_370_000.0;

/// Width IOAPI pads variable names, long names and units to
pub const IOAPI_NAME_WIDTH: usize = 16;

/// Width IOAPI pads variable descriptions to
pub const IOAPI_DESC_WIDTH: usize = 80;

/// IOAPI missing value used for unset vertical grid attributes
pub const IOAPI_BADVAL: i32 = -9999;

/// Deflate level applied to gridded data variables
pub const NETCDF_COMPRESSION_LEVEL: i32 = 1;
