#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! OpenStreetMap road network and point-of-interest types.
//!
//! The road network is the simplified drivable graph fetched for a single
//! volcano's bounding box: intersections and dead ends become nodes, the
//! road segments between them become edges carrying their full geometry.
//! Points of interest are grouped into the three service families used by
//! the evacuation dashboards.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use volcano_risk_volcano_models::BoundingBox;

/// Road classes kept in the centrality graph by default.
pub const DEFAULT_ROAD_CLASSES: &[&str] =
    &["motorway", "trunk", "primary", "secondary", "tertiary"];

/// OSM `highway` functional class of a road segment.
///
/// The set is open-ended: values not listed here are kept verbatim in
/// [`RoadClass::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoadClass {
    /// `highway=motorway`
    Motorway,
    /// `highway=motorway_link`
    MotorwayLink,
    /// `highway=trunk`
    Trunk,
    /// `highway=trunk_link`
    TrunkLink,
    /// `highway=primary`
    Primary,
    /// `highway=primary_link`
    PrimaryLink,
    /// `highway=secondary`
    Secondary,
    /// `highway=secondary_link`
    SecondaryLink,
    /// `highway=tertiary`
    Tertiary,
    /// `highway=tertiary_link`
    TertiaryLink,
    /// `highway=unclassified`
    Unclassified,
    /// `highway=residential`
    Residential,
    /// `highway=service`
    Service,
    /// Any other tag value.
    Other(String),
}

impl RoadClass {
    /// Returns the OSM tag value for this class.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Motorway => "motorway",
            Self::MotorwayLink => "motorway_link",
            Self::Trunk => "trunk",
            Self::TrunkLink => "trunk_link",
            Self::Primary => "primary",
            Self::PrimaryLink => "primary_link",
            Self::Secondary => "secondary",
            Self::SecondaryLink => "secondary_link",
            Self::Tertiary => "tertiary",
            Self::TertiaryLink => "tertiary_link",
            Self::Unclassified => "unclassified",
            Self::Residential => "residential",
            Self::Service => "service",
            Self::Other(value) => value,
        }
    }

    /// Whether this is one of the five main functional classes
    /// (motorway through tertiary, links excluded).
    #[must_use]
    pub const fn is_main_class(&self) -> bool {
        matches!(
            self,
            Self::Motorway | Self::Trunk | Self::Primary | Self::Secondary | Self::Tertiary
        )
    }
}

impl From<&str> for RoadClass {
    fn from(value: &str) -> Self {
        match value {
            "motorway" => Self::Motorway,
            "motorway_link" => Self::MotorwayLink,
            "trunk" => Self::Trunk,
            "trunk_link" => Self::TrunkLink,
            "primary" => Self::Primary,
            "primary_link" => Self::PrimaryLink,
            "secondary" => Self::Secondary,
            "secondary_link" => Self::SecondaryLink,
            "tertiary" => Self::Tertiary,
            "tertiary_link" => Self::TertiaryLink,
            "unclassified" => Self::Unclassified,
            "residential" => Self::Residential,
            "service" => Self::Service,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for RoadClass {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<RoadClass> for String {
    fn from(value: RoadClass) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for RoadClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A graph node: an intersection or a dead end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadNode {
    /// OSM node id, unique within a network.
    pub id: i64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
}

/// A directed road segment between two graph nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadEdge {
    /// Id of the source node.
    pub from: i64,
    /// Id of the target node.
    pub to: i64,
    /// OSM way the segment was cut from.
    pub way_id: i64,
    /// Functional class.
    pub class: RoadClass,
    /// Street name, if tagged.
    pub name: Option<String>,
    /// Whether the way is only drivable from `from` to `to`.
    pub oneway: bool,
    /// `(lon, lat)` vertices from `from` to `to`, both ends included.
    pub geometry: Vec<[f64; 2]>,
}

/// The drivable road network inside one bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadNetwork {
    /// Bounding box the network was fetched for.
    pub bbox: BoundingBox,
    /// Graph nodes.
    pub nodes: Vec<RoadNode>,
    /// Road segments. Two-way roads appear once with `oneway = false`.
    pub edges: Vec<RoadEdge>,
}

impl RoadNetwork {
    /// Whether the network has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Point-of-interest service family.
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
#[strum(serialize_all = "snake_case")]
pub enum ServiceCategory {
    /// Fire, police, hospitals and ambulances.
    Emergency,
    /// Supplies, health care and administration.
    Essential,
    /// Schools, care homes and other vulnerable sites.
    Amenity,
}

impl ServiceCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Emergency, Self::Essential, Self::Amenity]
    }

    /// OSM `amenity` tag values belonging to this family.
    #[must_use]
    pub const fn amenity_tags(self) -> &'static [&'static str] {
        match self {
            Self::Emergency => &["fire_station", "police", "hospital", "ambulance_station"],
            Self::Essential => &[
                "supermarket",
                "fuel",
                "chemist",
                "shelter",
                "pharmacy",
                "dentist",
                "doctors",
                "embassy",
                "townhall",
                "courthouse",
                "veterinary",
            ],
            Self::Amenity => &[
                "kindergarten",
                "school",
                "library",
                "college",
                "university",
                "prison",
                "social_facility",
                "nursing_home",
            ],
        }
    }
}

/// A located point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePoint {
    /// OSM element id.
    pub osm_id: i64,
    /// Service family the element was queried for.
    pub category: ServiceCategory,
    /// Raw `amenity` tag value.
    pub amenity: String,
    /// `name` tag, if any.
    pub name: Option<String>,
    /// Longitude (WGS84). Centroid for ways and relations.
    pub longitude: f64,
    /// Latitude (WGS84). Centroid for ways and relations.
    pub latitude: f64,
}
