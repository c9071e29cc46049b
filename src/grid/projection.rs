//! Map projections for IOAPI coordinate systems.
//!
//! Each projection maps geographic coordinates (degrees) to plane
//! coordinates measured from the projection origin `(XCENT, YCENT)`.
//! Plane units are meters on the IOAPI sphere, or degrees for lat-lon grids.
//!
//! Supported IOAPI grid types:
//! - `GDTYP = 1`: geographic lat-lon
//! - `GDTYP = 2`: Lambert conformal conic
//! - `GDTYP = 6`: polar stereographic
//! - `GDTYP = 7`: equatorial Mercator

use crate::constants::EARTH_RADIUS_M;
use crate::error::{OpenAqError, Result};
use std::f64::consts::{FRAC_PI_4, PI};

/// IOAPI coordinate-system parameters as listed in a GRIDDESC file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    pub gdtyp: i32,
    pub p_alp: f64,
    pub p_bet: f64,
    pub p_gam: f64,
    pub xcent: f64,
    pub ycent: f64,
}

/// A forward map projection with its origin offset applied
#[derive(Debug, Clone)]
pub enum Projection {
    LatLon,
    LambertConformal(LambertConformal),
    PolarStereographic(PolarStereographic),
    Mercator(Mercator),
}

impl Projection {
    /// Build the projection described by a coordinate system entry
    pub fn from_params(name: &str, params: &ProjectionParams) -> Result<Self> {
        match params.gdtyp {
            1 => Ok(Projection::LatLon),
            2 => Ok(Projection::LambertConformal(LambertConformal::new(
                params.p_alp,
                params.p_bet,
                params.p_gam,
                params.xcent,
                params.ycent,
            ))),
            6 => Ok(Projection::PolarStereographic(PolarStereographic::new(
                params.p_alp,
                params.p_bet,
                params.p_gam,
                params.xcent,
                params.ycent,
            ))),
            7 => Ok(Projection::Mercator(Mercator::new(
                params.p_alp,
                params.p_gam,
                params.xcent,
                params.ycent,
            ))),
            gdtyp => Err(OpenAqError::UnsupportedProjection {
                name: name.to_string(),
                gdtyp,
            }),
        }
    }

    /// Project a point to plane coordinates relative to the projection origin
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        match self {
            Projection::LatLon => (lon_deg, lat_deg),
            Projection::LambertConformal(p) => p.forward(lon_deg, lat_deg),
            Projection::PolarStereographic(p) => p.forward(lon_deg, lat_deg),
            Projection::Mercator(p) => p.forward(lon_deg, lat_deg),
        }
    }
}

/// Normalize a longitude difference to [-π, π]
fn wrap_longitude(mut dlon: f64) -> f64 {
    while dlon > PI {
        dlon -= 2.0 * PI;
    }
    while dlon < -PI {
        dlon += 2.0 * PI;
    }
    dlon
}

/// Lambert Conformal Conic projection on the IOAPI sphere.
///
/// The cone is secant at the two standard parallels (or tangent when they
/// coincide). Plane coordinates are shifted so the projection origin
/// `(xcent, ycent)` maps to `(0, 0)`.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian in radians
    lon0: f64,
    /// Cone constant
    n: f64,
    /// F constant (already scaled by the earth radius)
    rf: f64,
    /// Rho at the reference latitude
    rho0: f64,
    /// Plane coordinates of the projection origin
    origin: (f64, f64),
}

impl LambertConformal {
    /// Create from IOAPI `P_ALP`, `P_BET` (standard parallels), `P_GAM`
    /// (central meridian) and the projection origin, all in degrees.
    pub fn new(p_alp: f64, p_bet: f64, p_gam: f64, xcent: f64, ycent: f64) -> Self {
        let latin1 = p_alp.to_radians();
        let latin2 = p_bet.to_radians();

        let n = if (latin1 - latin2).abs() < 1e-10 {
            latin1.sin()
        } else {
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio =
                ((FRAC_PI_4 + latin2 / 2.0).tan() / (FRAC_PI_4 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };

        let f = (latin1.cos() * (FRAC_PI_4 + latin1 / 2.0).tan().powf(n)) / n;
        let rf = EARTH_RADIUS_M * f;
        let rho0 = rf / (FRAC_PI_4 + ycent.to_radians() / 2.0).tan().powf(n);

        let mut projection = Self {
            lon0: p_gam.to_radians(),
            n,
            rf,
            rho0,
            origin: (0.0, 0.0),
        };
        projection.origin = projection.project(xcent, ycent);
        projection
    }

    fn project(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let dlon = wrap_longitude(lon_deg.to_radians() - self.lon0);

        let rho = self.rf / (FRAC_PI_4 + lat / 2.0).tan().powf(self.n);
        let theta = self.n * dlon;

        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let (x, y) = self.project(lon_deg, lat_deg);
        (x - self.origin.0, y - self.origin.1)
    }
}

/// Polar stereographic projection on the IOAPI sphere.
#[derive(Debug, Clone)]
pub struct PolarStereographic {
    /// +1 for the north pole, -1 for the south pole
    hemisphere: f64,
    lon0: f64,
    /// Radius scale giving true scale at the secant latitude
    scale: f64,
    origin: (f64, f64),
}

impl PolarStereographic {
    /// `p_alp` selects the hemisphere, `p_bet` is the latitude of true scale
    /// and `p_gam` the central meridian.
    pub fn new(p_alp: f64, p_bet: f64, p_gam: f64, xcent: f64, ycent: f64) -> Self {
        let hemisphere = if p_alp < 0.0 { -1.0 } else { 1.0 };
        let lat_ts = (hemisphere * p_bet).to_radians();
        let scale = EARTH_RADIUS_M * (1.0 + lat_ts.sin());

        let mut projection = Self {
            hemisphere,
            lon0: p_gam.to_radians(),
            scale,
            origin: (0.0, 0.0),
        };
        projection.origin = projection.project(xcent, ycent);
        projection
    }

    fn project(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = self.hemisphere * lat_deg.to_radians();
        let dlon = wrap_longitude(lon_deg.to_radians() - self.lon0);

        let rho = self.scale * (FRAC_PI_4 - lat / 2.0).tan();
        (rho * dlon.sin(), -self.hemisphere * rho * dlon.cos())
    }

    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let (x, y) = self.project(lon_deg, lat_deg);
        (x - self.origin.0, y - self.origin.1)
    }
}

/// Equatorial Mercator projection on the IOAPI sphere.
#[derive(Debug, Clone)]
pub struct Mercator {
    lon0: f64,
    /// Earth radius scaled to true scale at the secant latitude
    scale: f64,
    origin: (f64, f64),
}

impl Mercator {
    /// `p_alp` is the latitude of true scale and `p_gam` the central meridian.
    pub fn new(p_alp: f64, p_gam: f64, xcent: f64, ycent: f64) -> Self {
        let mut projection = Self {
            lon0: p_gam.to_radians(),
            scale: EARTH_RADIUS_M * p_alp.to_radians().cos(),
            origin: (0.0, 0.0),
        };
        projection.origin = projection.project(xcent, ycent);
        projection
    }

    fn project(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let dlon = wrap_longitude(lon_deg.to_radians() - self.lon0);
        (
            self.scale * dlon,
            self.scale * (FRAC_PI_4 + lat / 2.0).tan().ln(),
        )
    }

    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let (x, y) = self.project(lon_deg, lat_deg);
        (x - self.origin.0, y - self.origin.1)
    }
}
