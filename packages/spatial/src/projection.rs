//! Spherical azimuthal equidistant projection.
//!
//! Distances and azimuths measured from the projection centre are exact on
//! the sphere, which makes it the natural planar frame for buffering a
//! single point: a circle of radius `r` in projected metres is the set of
//! points `r` metres away on the ground, at any latitude.

use geo::Coord;

use crate::SpatialError;

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Below this angular distance (radians) the scale factor is taken as 1.
const SMALL_ANGLE: f64 = 1e-12;

/// An azimuthal equidistant projection centred on a geographic point.
///
/// Projected coordinates are metres east (`x`) and north (`y`) of the
/// centre.
#[derive(Debug, Clone, Copy)]
pub struct AzimuthalEquidistant {
    center_lon: f64,
    center_lat: f64,
    sin_lat0: f64,
    cos_lat0: f64,
}

impl AzimuthalEquidistant {
    /// Creates a projection centred on `center` (`x` = longitude, `y` =
    /// latitude, degrees).
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidCoordinate`] if the centre is not a
    /// valid WGS84 position.
    pub fn new(center: Coord<f64>) -> Result<Self, SpatialError> {
        validate_lon_lat(center.x, center.y)?;
        let phi0 = center.y.to_radians();
        Ok(Self {
            center_lon: center.x,
            center_lat: center.y,
            sin_lat0: phi0.sin(),
            cos_lat0: phi0.cos(),
        })
    }

    /// Returns the projection centre as `(lon, lat)`.
    #[must_use]
    pub const fn center(&self) -> Coord<f64> {
        Coord {
            x: self.center_lon,
            y: self.center_lat,
        }
    }

    /// Projects a geographic coordinate to planar metres.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidCoordinate`] for non-finite or
    /// out-of-range input and [`SpatialError::Projection`] for the antipode
    /// of the centre, where the projection is undefined.
    pub fn project(&self, coord: Coord<f64>) -> Result<Coord<f64>, SpatialError> {
        if !coord.x.is_finite() || !coord.y.is_finite() || coord.y.abs() > 90.0 {
            return Err(SpatialError::InvalidCoordinate {
                lon: coord.x,
                lat: coord.y,
            });
        }

        let phi = coord.y.to_radians();
        let d_lambda = (coord.x - self.center_lon).to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let cos_d_lambda = d_lambda.cos();

        let cos_c = self
            .sin_lat0
            .mul_add(sin_phi, self.cos_lat0 * cos_phi * cos_d_lambda)
            .clamp(-1.0, 1.0);
        let c = cos_c.acos();

        if (std::f64::consts::PI - c).abs() < SMALL_ANGLE {
            return Err(SpatialError::Projection {
                message: format!(
                    "({}, {}) is antipodal to the projection centre",
                    coord.x, coord.y
                ),
            });
        }

        let k = if c < SMALL_ANGLE { 1.0 } else { c / c.sin() };

        let x = EARTH_RADIUS_M * k * cos_phi * d_lambda.sin();
        let y = EARTH_RADIUS_M
            * k
            * self
                .cos_lat0
                .mul_add(sin_phi, -(self.sin_lat0 * cos_phi * cos_d_lambda));

        Ok(Coord { x, y })
    }

    /// Converts planar metres back to a geographic coordinate.
    ///
    /// The returned longitude is continuous around the centre: it may fall
    /// outside `[-180, 180]` when the point lies across the antimeridian
    /// from the centre. Use [`wrap_longitude`] to normalise it.
    #[must_use]
    pub fn unproject(&self, coord: Coord<f64>) -> Coord<f64> {
        let rho = coord.x.hypot(coord.y);
        if rho < SMALL_ANGLE {
            return self.center();
        }

        let c = rho / EARTH_RADIUS_M;
        let (sin_c, cos_c) = c.sin_cos();

        let phi = cos_c
            .mul_add(self.sin_lat0, coord.y * sin_c * self.cos_lat0 / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let d_lambda = (coord.x * sin_c).atan2(
            (rho * self.cos_lat0).mul_add(cos_c, -(coord.y * self.sin_lat0 * sin_c)),
        );

        Coord {
            x: self.center_lon + d_lambda.to_degrees(),
            y: phi.to_degrees(),
        }
    }
}

/// Wraps a longitude into `[-180, 180]`.
#[must_use]
pub fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Checks that a longitude/latitude pair is a finite WGS84 position.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidCoordinate`] otherwise.
pub fn validate_lon_lat(lon: f64, lat: f64) -> Result<(), SpatialError> {
    if lon.is_finite() && lat.is_finite() && (-180.0..=180.0).contains(&lon) && lat.abs() <= 90.0
    {
        Ok(())
    } else {
        Err(SpatialError::InvalidCoordinate { lon, lat })
    }
}
