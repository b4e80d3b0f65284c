//! Output files.
//!
//! Tabular summaries are CSV. Map layers are a JSON array of path
//! features for roads and GeoJSON `FeatureCollection`s for point layers.
//! Every feature carries the id, name and region of the volcano it was
//! found for; a feature near two volcanoes appears twice. `id` is always
//! the OSM id of the feature itself.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geo::{Geometry, LineString, MultiLineString};
use geojson::{Feature, FeatureCollection, JsonObject};
use serde::Serialize;
use volcano_risk_osm_models::{RoadEdge, ServiceCategory};
use volcano_risk_volcano_models::ActivityStatus;

use crate::analysis::{StageStatus, VolcanoAnalysis};
use crate::path::PathCoords;
use crate::{PipelineConfig, PipelineError, style};

/// Analysed volcanoes with their buffer.
pub const VOLCANOES_FILE: &str = "erupting_unrest_volcanoes_latest.csv";
/// Every (population centre, volcano) pair.
pub const POPULATION_AT_RISK_FILE: &str = "population_at_risk.csv";
/// Exposure per volcano.
pub const RISK_BY_VOLCANO_FILE: &str = "risk_by_volcano.csv";
/// Grand total.
pub const TOTAL_AFFECTED_FILE: &str = "total_affected.csv";
/// Largest centres per volcano.
pub const TOP_CONTRIBUTORS_FILE: &str = "top_contributors.csv";
/// Road path layer.
pub const HIGHWAYS_FILE: &str = "osm_highways_features.json";
/// Scored road nodes.
pub const NODES_FILE: &str = "all_nodes.geojson";
/// Service lookup status per volcano and family.
pub const SERVICE_STATUS_FILE: &str = "service_status.json";

/// Point layer file for a service family.
#[must_use]
pub const fn services_file(category: ServiceCategory) -> &'static str {
    match category {
        ServiceCategory::Emergency => "all_emergency_services.geojson",
        ServiceCategory::Essential => "all_essential_services.geojson",
        ServiceCategory::Amenity => "all_amenities.geojson",
    }
}

#[derive(Serialize)]
struct VolcanoRow<'a> {
    id: &'a str,
    name: &'a str,
    longitude: f64,
    latitude: f64,
    status: ActivityStatus,
    region: &'a str,
    subregion: Option<&'a str>,
    buffer_km: f64,
    geom_buffer: String,
}

#[derive(Serialize)]
struct PopulationRow<'a> {
    volcano_id: &'a str,
    volcano_name: &'a str,
    id: &'a str,
    longitude: f64,
    latitude: f64,
    population: f64,
}

#[derive(Serialize)]
struct RiskRow<'a> {
    volcano_id: &'a str,
    volcano_name: &'a str,
    region: &'a str,
    centers_affected: usize,
    total_population: f64,
}

#[derive(Serialize)]
struct ContributorRow<'a> {
    volcano_id: &'a str,
    volcano_name: &'a str,
    rank: usize,
    id: &'a str,
    population: f64,
}

#[derive(Serialize)]
struct HighwayFeature<'a> {
    path: PathCoords,
    color: &'static [u8],
    width: u8,
    highway_type: &'a str,
    name: Option<&'a str>,
    id: i64,
    volcano_id: &'a str,
    volcano_name: &'a str,
    region: &'a str,
}

#[derive(Serialize)]
struct ServiceStatusRow<'a> {
    volcano_id: &'a str,
    volcano_name: &'a str,
    category: ServiceCategory,
    #[serde(flatten)]
    status: StageStatus,
}

fn write_csv<S: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = S>,
) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Writes the CSV summaries.
///
/// # Errors
///
/// Returns [`PipelineError`] if a file cannot be written.
pub fn write_tabular(
    analyses: &[VolcanoAnalysis],
    dir: &Path,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    let buffer_km = config.buffer.radius_m / 1_000.0;
    write_csv(
        &dir.join(VOLCANOES_FILE),
        analyses.iter().map(|a| VolcanoRow {
            id: &a.volcano.id,
            name: &a.volcano.name,
            longitude: a.volcano.longitude,
            latitude: a.volcano.latitude,
            status: a.volcano.status,
            region: &a.volcano.region,
            subregion: a.volcano.subregion.as_deref(),
            buffer_km,
            geom_buffer: a.buffer.to_wkt(),
        }),
    )?;

    write_csv(
        &dir.join(POPULATION_AT_RISK_FILE),
        analyses.iter().flat_map(|a| {
            a.intersection.points.iter().map(|p| PopulationRow {
                volcano_id: &a.volcano.id,
                volcano_name: &a.volcano.name,
                id: &p.id,
                longitude: p.longitude,
                latitude: p.latitude,
                population: p.population,
            })
        }),
    )?;

    write_csv(
        &dir.join(RISK_BY_VOLCANO_FILE),
        analyses.iter().map(|a| RiskRow {
            volcano_id: &a.volcano.id,
            volcano_name: &a.volcano.name,
            region: &a.volcano.region,
            centers_affected: a.intersection.count,
            total_population: a.intersection.total_population,
        }),
    )?;

    let total: f64 = analyses.iter().map(|a| a.intersection.total_population).sum();
    let mut writer = csv::Writer::from_path(dir.join(TOTAL_AFFECTED_FILE))?;
    writer.write_record(["total_affected"])?;
    writer.write_record([total.to_string()])?;
    writer.flush()?;

    let top_n = config.report.top_contributors;
    let contributors: Vec<(&VolcanoAnalysis, usize, _)> = analyses
        .iter()
        .flat_map(|a| {
            a.intersection
                .top_contributors(top_n)
                .into_iter()
                .enumerate()
                .map(move |(i, c)| (a, i + 1, c))
        })
        .collect();
    write_csv(
        &dir.join(TOP_CONTRIBUTORS_FILE),
        contributors.iter().map(|(a, rank, c)| ContributorRow {
            volcano_id: &a.volcano.id,
            volcano_name: &a.volcano.name,
            rank: *rank,
            id: &c.id,
            population: c.population,
        }),
    )?;

    log::info!("Wrote tabular exports for {} volcanoes to {}", analyses.len(), dir.display());
    Ok(())
}

/// Merges the segments of each main-class way into one line or
/// multi-line, in first-seen order.
fn highway_features(analysis: &VolcanoAnalysis) -> Vec<HighwayFeature<'_>> {
    let Some(network) = &analysis.roads else {
        return Vec::new();
    };

    let mut ways: BTreeMap<i64, Vec<&RoadEdge>> = BTreeMap::new();
    let mut order = Vec::new();
    for edge in network.edges.iter().filter(|e| e.class.is_main_class()) {
        let segments = ways.entry(edge.way_id).or_default();
        if segments.is_empty() {
            order.push(edge.way_id);
        }
        segments.push(edge);
    }

    order
        .into_iter()
        .filter_map(|way_id| {
            let segments = ways.remove(&way_id)?;
            let first = *segments.first()?;
            let lines: Vec<LineString<f64>> = segments
                .iter()
                .map(|e| e.geometry.iter().map(|[x, y]| (*x, *y)).collect())
                .collect();
            let geometry = if lines.len() == 1 {
                Geometry::LineString(lines.into_iter().next()?)
            } else {
                Geometry::MultiLineString(MultiLineString::new(lines))
            };

            Some(HighwayFeature {
                path: PathCoords::from_geometry(&geometry)?,
                color: style::ROADS.color(first.class.as_str()),
                width: style::road_width(&first.class),
                highway_type: first.class.as_str(),
                name: first.name.as_deref(),
                id: way_id,
                volcano_id: &analysis.volcano.id,
                volcano_name: &analysis.volcano.name,
                region: &analysis.volcano.region,
            })
        })
        .collect()
}

fn point_feature(longitude: f64, latitude: f64, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![
            longitude, latitude,
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn properties<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> JsonObject {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Writes the road, node and service map layers and the service status.
///
/// # Errors
///
/// Returns [`PipelineError`] if a file cannot be written.
pub fn write_map_layers(analyses: &[VolcanoAnalysis], dir: &Path) -> Result<(), PipelineError> {
    let highways: Vec<HighwayFeature<'_>> = analyses.iter().flat_map(highway_features).collect();
    write_json(&dir.join(HIGHWAYS_FILE), &highways)?;

    let nodes: Vec<Feature> = analyses
        .iter()
        .flat_map(|a| {
            a.nodes.iter().map(|node| {
                point_feature(
                    node.longitude,
                    node.latitude,
                    properties([
                        ("id", node.id.into()),
                        ("score", node.score.into()),
                        ("volcano_id", a.volcano.id.clone().into()),
                        ("volcano_name", a.volcano.name.clone().into()),
                        ("region", a.volcano.region.clone().into()),
                    ]),
                )
            })
        })
        .collect();
    let node_count = nodes.len();
    write_json(&dir.join(NODES_FILE), &collection(nodes))?;

    for category in ServiceCategory::all() {
        let table = style::services(*category);
        let features: Vec<Feature> = analyses
            .iter()
            .filter_map(|a| Some((a, a.services.get(category)?.ready()?)))
            .flat_map(|(a, points)| {
                points.iter().map(|point| {
                    point_feature(
                        point.longitude,
                        point.latitude,
                        properties([
                            ("id", point.osm_id.into()),
                            ("amenity", point.amenity.clone().into()),
                            ("color", table.color(&point.amenity).into()),
                            ("volcano_id", a.volcano.id.clone().into()),
                            ("volcano_name", a.volcano.name.clone().into()),
                            ("region", a.volcano.region.clone().into()),
                        ]),
                    )
                })
            })
            .collect();
        log::debug!("{} {category} services", features.len());
        write_json(&dir.join(services_file(*category)), &collection(features))?;
    }

    let statuses: Vec<ServiceStatusRow<'_>> = analyses
        .iter()
        .flat_map(|a| {
            a.services.iter().map(|(category, outcome)| ServiceStatusRow {
                volcano_id: &a.volcano.id,
                volcano_name: &a.volcano.name,
                category: *category,
                status: outcome.status(),
            })
        })
        .collect();
    write_json(&dir.join(SERVICE_STATUS_FILE), &statuses)?;

    log::info!(
        "Wrote map layers ({} road features, {node_count} nodes) to {}",
        highways.len(),
        dir.display()
    );
    Ok(())
}
