//! Path-coordinate encoding of road geometry for path layers.
//!
//! A `LineString` becomes `[[x, y], ...]` and a `MultiLineString`
//! becomes `[[[x, y], ...], ...]`.

use geo::{Coord, Geometry, LineString, MultiLineString};
use serde::{Deserialize, Serialize};

/// Vertex list of a line or multi-line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathCoords {
    /// A single line.
    Line(Vec<[f64; 2]>),
    /// Several lines.
    Multi(Vec<Vec<[f64; 2]>>),
}

fn vertices(line: &LineString<f64>) -> Vec<[f64; 2]> {
    line.coords().map(|c| [c.x, c.y]).collect()
}

fn line(vertices: &[[f64; 2]]) -> LineString<f64> {
    vertices.iter().map(|[x, y]| Coord { x: *x, y: *y }).collect()
}

impl PathCoords {
    /// Encodes a line geometry. Other geometry types have no path form.
    #[must_use]
    pub fn from_geometry(geometry: &Geometry<f64>) -> Option<Self> {
        match geometry {
            Geometry::LineString(ls) => Some(Self::Line(vertices(ls))),
            Geometry::MultiLineString(mls) => Some(Self::Multi(mls.iter().map(vertices).collect())),
            _ => None,
        }
    }

    /// Decodes back into a geometry.
    #[must_use]
    pub fn to_geometry(&self) -> Geometry<f64> {
        match self {
            Self::Line(points) => Geometry::LineString(line(points)),
            Self::Multi(lines) => Geometry::MultiLineString(MultiLineString::new(
                lines.iter().map(|points| line(points)).collect(),
            )),
        }
    }
}
