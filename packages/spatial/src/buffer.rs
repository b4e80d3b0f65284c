//! Fixed-radius hazard buffers around volcanoes.

use geo::{BoundingRect, Coord, Intersects, LineString, Point, Polygon};
use volcano_risk_volcano_models::BoundingBox;

use crate::SpatialError;
use crate::projection::{AzimuthalEquidistant, validate_lon_lat, wrap_longitude};

/// Default hazard radius around an active volcano, in metres.
pub const DEFAULT_BUFFER_RADIUS_M: f64 = 30_000.0;

/// Default number of polygon vertices approximating the buffer circle.
pub const DEFAULT_BUFFER_SEGMENTS: usize = 64;

/// A near-circular polygon of fixed ground radius around a point.
///
/// The polygon is built in an azimuthal equidistant projection centred on
/// the point, so its radius is the same number of metres at every
/// latitude. Vertex longitudes are continuous around the centre and may
/// exceed `±180` for buffers that cross the antimeridian.
#[derive(Debug, Clone)]
pub struct HazardBuffer {
    center: Coord<f64>,
    radius_m: f64,
    polygon: Polygon<f64>,
}

impl HazardBuffer {
    /// Buffers `(lon, lat)` by `radius_m` metres using `segments` vertices.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the coordinate is not a valid WGS84
    /// position, the radius is not a positive finite number, or fewer than
    /// three segments are requested.
    pub fn new(lon: f64, lat: f64, radius_m: f64, segments: usize) -> Result<Self, SpatialError> {
        validate_lon_lat(lon, lat)?;
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(SpatialError::InvalidRadius { radius_m });
        }
        if segments < 3 {
            return Err(SpatialError::InvalidSegments { segments });
        }

        let center = Coord { x: lon, y: lat };
        let projection = AzimuthalEquidistant::new(center)?;

        #[allow(clippy::cast_precision_loss)]
        let step = std::f64::consts::TAU / segments as f64;
        let ring: Vec<Coord<f64>> = (0..segments)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let theta = step * i as f64;
                projection.unproject(Coord {
                    x: radius_m * theta.cos(),
                    y: radius_m * theta.sin(),
                })
            })
            .collect();

        if ring.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(SpatialError::Projection {
                message: format!("buffer of ({lon}, {lat}) produced non-finite vertices"),
            });
        }

        Ok(Self {
            center,
            radius_m,
            polygon: Polygon::new(LineString::new(ring), vec![]),
        })
    }

    /// Buffers with the default radius and segment count.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the coordinate is invalid.
    pub fn with_defaults(lon: f64, lat: f64) -> Result<Self, SpatialError> {
        Self::new(lon, lat, DEFAULT_BUFFER_RADIUS_M, DEFAULT_BUFFER_SEGMENTS)
    }

    /// Buffer centre as `(lon, lat)`.
    #[must_use]
    pub const fn center(&self) -> Coord<f64> {
        self.center
    }

    /// Buffer radius in metres.
    #[must_use]
    pub const fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// The buffer polygon in geographic coordinates.
    #[must_use]
    pub const fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Longitude/latitude extent of the polygon without wrapping, as
    /// `(min, max)` corners.
    #[must_use]
    pub fn extent(&self) -> (Coord<f64>, Coord<f64>) {
        self.polygon.bounding_rect().map_or_else(
            || (self.center, self.center),
            |rect| (rect.min(), rect.max()),
        )
    }

    /// Bounding box of the buffer with longitudes wrapped into
    /// `[-180, 180]`.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let (min, max) = self.extent();
        let min_lat = min.y.max(-90.0);
        let max_lat = max.y.min(90.0);

        if max.x - min.x >= 360.0 {
            return BoundingBox::new(-180.0, min_lat, 180.0, max_lat);
        }

        BoundingBox::new(wrap_longitude(min.x), min_lat, wrap_longitude(max.x), max_lat)
    }

    /// Whether the point lies inside or on the boundary of the buffer.
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if !lon.is_finite() || !lat.is_finite() {
            return false;
        }
        let (min, max) = self.extent();
        [lon, lon + 360.0, lon - 360.0]
            .into_iter()
            .filter(|x| *x >= min.x && *x <= max.x)
            .any(|x| self.polygon.intersects(&Point::new(x, lat)))
    }

    /// Well-known-text rendering of the polygon.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        let coords = self
            .polygon
            .exterior()
            .coords()
            .map(|c| format!("{} {}", c.x, c.y))
            .collect::<Vec<_>>()
            .join(", ");
        format!("POLYGON(({coords}))")
    }
}
