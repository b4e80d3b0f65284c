//! Point-of-interest lookup by service family.
//!
//! Buildings and sites mapped as ways or relations are reduced to the
//! centroid of their geometry so every service is a single point.

use geo::{Centroid, Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use volcano_risk_osm_models::{ServiceCategory, ServicePoint};
use volcano_risk_volcano_models::BoundingBox;

use crate::OsmError;
use crate::overpass::{Element, LatLon, Member, OverpassResponse, OverpassSource, bbox_filter};

/// Fetches the points of interest of one service family inside `bbox`.
///
/// # Errors
///
/// Returns [`OsmError`] if the query fails after retries.
pub async fn locate_services(
    source: &OverpassSource,
    bbox: &BoundingBox,
    category: ServiceCategory,
) -> Result<Vec<ServicePoint>, OsmError> {
    let query = service_query(bbox, category, source.config().timeout_secs);
    let response = source.query(&query).await?;
    let services = parse_services(&response, category);
    log::debug!("Found {} {category} services", services.len());
    Ok(services)
}

/// Builds the Overpass query for every node, way and relation whose
/// `amenity` tag is one of the category's values.
#[must_use]
pub fn service_query(bbox: &BoundingBox, category: ServiceCategory, timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{timeout_secs}];\
         nwr[\"amenity\"~\"^({})$\"]{};\
         out geom;",
        category.amenity_tags().join("|"),
        bbox_filter(bbox),
    )
}

/// Converts an Overpass response into service points for `category`.
///
/// Elements whose `amenity` is not one of the category's values, or whose
/// geometry is missing, are skipped.
#[must_use]
pub fn parse_services(response: &OverpassResponse, category: ServiceCategory) -> Vec<ServicePoint> {
    let allowed = category.amenity_tags();

    response
        .elements
        .iter()
        .filter_map(|element| {
            let (osm_id, tags, location) = match element {
                Element::Node { id, lat, lon, tags } => {
                    (*id, tags, Some(Coord { x: *lon, y: *lat }))
                }
                Element::Way {
                    id,
                    tags,
                    geometry,
                    center,
                    ..
                } => (*id, tags, way_centroid(geometry).or_else(|| center.map(to_coord))),
                Element::Relation {
                    id,
                    tags,
                    members,
                    center,
                } => (
                    *id,
                    tags,
                    relation_centroid(members).or_else(|| center.map(to_coord)),
                ),
            };

            let amenity = tags.get("amenity")?;
            if !allowed.contains(&amenity.as_str()) {
                return None;
            }
            let Some(location) = location else {
                log::debug!("Skipping {amenity} {osm_id}: no geometry");
                return None;
            };

            Some(ServicePoint {
                osm_id,
                category,
                amenity: amenity.clone(),
                name: tags.get("name").cloned(),
                longitude: location.x,
                latitude: location.y,
            })
        })
        .collect()
}

const fn to_coord(p: LatLon) -> Coord<f64> {
    Coord { x: p.lon, y: p.lat }
}

fn line(points: &[LatLon]) -> LineString<f64> {
    points.iter().copied().map(to_coord).collect()
}

/// Closed ways are treated as areas, open ways as lines.
fn way_centroid(geometry: &[LatLon]) -> Option<Coord<f64>> {
    let ring = line(geometry);
    if ring.0.len() >= 4 && ring.is_closed() {
        Polygon::new(ring, vec![]).centroid().map(|p| p.0)
    } else {
        ring.centroid().map(|p| p.0)
    }
}

/// Centroid of the closed `outer` members if there are any, otherwise of
/// all member geometry.
fn relation_centroid(members: &[Member]) -> Option<Coord<f64>> {
    let outers: Vec<Polygon<f64>> = members
        .iter()
        .filter(|m| m.kind == "way" && m.role == "outer")
        .map(|m| line(&m.geometry))
        .filter(|ring| ring.0.len() >= 4 && ring.is_closed())
        .map(|ring| Polygon::new(ring, vec![]))
        .collect();
    if !outers.is_empty() {
        return MultiPolygon::new(outers).centroid().map(|p| p.0);
    }

    let lines: Vec<LineString<f64>> = members
        .iter()
        .filter(|m| !m.geometry.is_empty())
        .map(|m| line(&m.geometry))
        .collect();
    if !lines.is_empty() {
        return MultiLineString::new(lines).centroid().map(|p| p.0);
    }

    let nodes: Vec<Coord<f64>> = members
        .iter()
        .filter_map(|m| Some(Coord { x: m.lon?, y: m.lat? }))
        .collect();
    if nodes.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = nodes.len() as f64;
    Some(Coord {
        x: nodes.iter().map(|c| c.x).sum::<f64>() / n,
        y: nodes.iter().map(|c| c.y).sum::<f64>() / n,
    })
}
