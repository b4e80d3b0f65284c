#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Volcano, population and risk record types.
//!
//! These are the records exchanged with the storage collaborator (volcano
//! lists and population centroids) and the tabular risk summaries written
//! back out after the buffer/population analysis.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Current activity status reported for a volcano.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActivityStatus {
    /// Listed in the weekly report as erupting.
    Erupting,
    /// Listed in the weekly report as showing unrest.
    Unrest,
    /// Known volcano with no current activity report.
    Dormant,
}

impl ActivityStatus {
    /// Whether volcanoes with this status are part of the risk analysis.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Erupting | Self::Unrest)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Erupting, Self::Unrest, Self::Dormant]
    }
}

/// A volcano record as provided by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volcano {
    /// Unique volcano identifier (GVP volcano number).
    pub id: String,
    /// Human-readable volcano name.
    pub name: String,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Current activity status.
    pub status: ActivityStatus,
    /// Region name (e.g. "Indonesia").
    pub region: String,
    /// Subregion name, if known.
    #[serde(default)]
    pub subregion: Option<String>,
}

/// A population centroid derived from a gridded population raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationPoint {
    /// Source raster cell identifier.
    pub id: String,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Population count for the cell. Fractional after resampling.
    pub population: f64,
}

/// Axis-aligned bounding box in geographic coordinates.
///
/// Longitudes are wrapped into `[-180, 180]`. A box whose `min_lon` is
/// greater than its `max_lon` crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its four edges.
    #[must_use]
    pub const fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Whether the box wraps around the antimeridian.
    #[must_use]
    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lon > self.max_lon
    }

    /// Whether the point lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        if self.crosses_antimeridian() {
            lon >= self.min_lon || lon <= self.max_lon
        } else {
            lon >= self.min_lon && lon <= self.max_lon
        }
    }

    /// Geographic centre of the box, as `(lon, lat)`.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        let lat = f64::midpoint(self.min_lat, self.max_lat);
        if self.crosses_antimeridian() {
            let lon = f64::midpoint(self.min_lon, self.max_lon + 360.0);
            (if lon > 180.0 { lon - 360.0 } else { lon }, lat)
        } else {
            (f64::midpoint(self.min_lon, self.max_lon), lat)
        }
    }
}

/// A single population centre contributing to a volcano's exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationContributor {
    /// Source raster cell identifier.
    pub id: String,
    /// Population count.
    pub population: f64,
}

/// Population exposure summary for one volcano.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    /// Volcano identifier.
    pub volcano_id: String,
    /// Volcano name.
    pub volcano_name: String,
    /// Volcano region.
    pub region: String,
    /// Sum of population inside the hazard buffer.
    pub total_population: f64,
    /// Number of population centres inside the hazard buffer.
    pub centers_affected: usize,
    /// Largest contributors, in descending population order.
    pub top_contributors: Vec<PopulationContributor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(
            "Erupting".parse::<ActivityStatus>().unwrap(),
            ActivityStatus::Erupting
        );
        assert_eq!(
            "unrest".parse::<ActivityStatus>().unwrap(),
            ActivityStatus::Unrest
        );
        assert!("asleep".parse::<ActivityStatus>().is_err());
    }

    #[test]
    fn only_erupting_and_unrest_are_active() {
        let active: Vec<_> = ActivityStatus::all()
            .iter()
            .filter(|s| s.is_active())
            .collect();
        assert_eq!(active.len(), 2);
        assert!(!ActivityStatus::Dormant.is_active());
    }

    #[test]
    fn bbox_contains_regular() {
        let bbox = BoundingBox::new(10.0, 40.0, 11.0, 41.0);
        assert!(bbox.contains(10.5, 40.5));
        assert!(bbox.contains(10.0, 41.0));
        assert!(!bbox.contains(9.9, 40.5));
        assert!(!bbox.contains(10.5, 41.1));
    }

    #[test]
    fn bbox_contains_across_antimeridian() {
        let bbox = BoundingBox::new(179.5, -20.0, -179.5, -19.0);
        assert!(bbox.crosses_antimeridian());
        assert!(bbox.contains(179.9, -19.5));
        assert!(bbox.contains(-179.9, -19.5));
        assert!(!bbox.contains(0.0, -19.5));

        let (lon, lat) = bbox.center();
        assert!((lon.abs() - 180.0).abs() < 1e-9);
        assert!((lat - -19.5).abs() < 1e-9);
    }
}
