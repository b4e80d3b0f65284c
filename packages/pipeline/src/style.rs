//! Map styling for exported features.
//!
//! Colours are RGB or RGBA byte arrays, as consumed by deck.gl-style
//! layers.

use volcano_risk_osm_models::{RoadClass, ServiceCategory};

/// Lookup from a tag value to a colour, with a fallback.
#[derive(Debug)]
pub struct StyleTable {
    entries: &'static [(&'static str, &'static [u8])],
    default: &'static [u8],
}

impl StyleTable {
    /// Colour for `key`, or the table's default.
    #[must_use]
    pub fn color(&self, key: &str) -> &'static [u8] {
        self.entries
            .iter()
            .find(|(tag, _)| *tag == key)
            .map_or(self.default, |(_, color)| *color)
    }

    /// Colour used for unlisted keys.
    #[must_use]
    pub const fn default_color(&self) -> &'static [u8] {
        self.default
    }
}

/// Default colour for unlisted services.
const SERVICE_DEFAULT: &[u8] = &[200, 200, 200];

/// Road colours by `highway` value.
pub static ROADS: StyleTable = StyleTable {
    entries: &[
        ("motorway", &[255, 0, 0]),
        ("trunk", &[255, 128, 0]),
        ("primary", &[255, 255, 0]),
        ("secondary", &[128, 255, 0]),
        ("tertiary", &[200, 200, 200, 128]),
        ("unclassified", &[255, 255, 255]),
        ("residential", &[220, 220, 220]),
        ("service", &[192, 192, 192]),
    ],
    default: &[128, 128, 128],
};

/// Emergency service colours.
pub static EMERGENCY: StyleTable = StyleTable {
    entries: &[
        ("fire_station", &[255, 0, 0]),
        ("police", &[0, 0, 255]),
        ("hospital", &[0, 255, 0]),
        ("ambulance_station", &[255, 165, 0]),
    ],
    default: SERVICE_DEFAULT,
};

/// Essential service colours.
pub static ESSENTIAL: StyleTable = StyleTable {
    entries: &[
        ("supermarket", &[75, 0, 130]),
        ("fuel", &[255, 140, 0]),
        ("chemist", &[147, 112, 219]),
        ("pharmacy", &[147, 112, 219]),
        ("bank", &[0, 191, 255]),
        ("shelter", &[128, 0, 0]),
        ("dentist", &[0, 255, 255]),
        ("doctors", &[30, 144, 255]),
        ("embassy", &[218, 112, 214]),
        ("townhall", &[192, 192, 192]),
        ("courthouse", &[138, 43, 226]),
        ("veterinary", &[34, 139, 34]),
    ],
    default: SERVICE_DEFAULT,
};

/// Vulnerable-site colours.
pub static AMENITY: StyleTable = StyleTable {
    entries: &[
        ("kindergarten", &[255, 182, 193]),
        ("school", &[255, 218, 185]),
        ("library", &[173, 216, 230]),
        ("college", &[144, 238, 144]),
        ("university", &[30, 144, 255]),
        ("social_facility", &[255, 192, 203]),
        ("prison", &[100, 100, 100]),
        ("nursing_home", &[255, 215, 0]),
    ],
    default: SERVICE_DEFAULT,
};

/// Style table for a service family.
#[must_use]
pub const fn services(category: ServiceCategory) -> &'static StyleTable {
    match category {
        ServiceCategory::Emergency => &EMERGENCY,
        ServiceCategory::Essential => &ESSENTIAL,
        ServiceCategory::Amenity => &AMENITY,
    }
}

/// Line width in pixels for a road class.
#[must_use]
pub const fn road_width(class: &RoadClass) -> u8 {
    match class {
        RoadClass::Motorway => 8,
        RoadClass::Trunk => 7,
        RoadClass::Primary => 6,
        RoadClass::Secondary => 5,
        RoadClass::Tertiary => 4,
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_keys() {
        assert_eq!(ROADS.color("motorway"), &[255, 0, 0]);
        assert_eq!(ROADS.color("tertiary"), &[200, 200, 200, 128]);
        assert_eq!(ROADS.color("primary_link"), &[128, 128, 128]);
        assert_eq!(services(ServiceCategory::Emergency).color("police"), &[0, 0, 255]);
        assert_eq!(services(ServiceCategory::Amenity).color("zoo"), &[200, 200, 200]);
    }

    #[test]
    fn every_queried_amenity_has_a_colour() {
        for category in ServiceCategory::all() {
            let table = services(*category);
            for tag in category.amenity_tags() {
                assert_ne!(
                    table.color(tag),
                    table.default_color(),
                    "{category} {tag} falls back to the default"
                );
            }
        }
    }

    #[test]
    fn widths_follow_importance() {
        assert_eq!(road_width(&RoadClass::Motorway), 8);
        assert_eq!(road_width(&RoadClass::Tertiary), 4);
        assert_eq!(road_width(&RoadClass::Residential), 3);
    }
}
