//! CSV inputs: the volcano list and the population centroids.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use volcano_risk_volcano_models::{ActivityStatus, PopulationPoint, Volcano};

use crate::PipelineError;

/// Raw `volcanoes.csv` row. `status` is parsed separately so that one
/// unknown value does not fail the whole file.
#[derive(Debug, Deserialize)]
struct VolcanoRow {
    id: String,
    name: String,
    longitude: f64,
    latitude: f64,
    status: String,
    region: String,
    #[serde(default)]
    subregion: Option<String>,
}

/// Reads `volcanoes.csv` (`id,name,longitude,latitude,status,region,subregion`).
///
/// Rows with an unrecognized status are skipped with a warning.
///
/// # Errors
///
/// Returns [`PipelineError::Csv`] if the file cannot be opened or a row
/// is malformed.
pub fn read_volcanoes(path: &Path) -> Result<Vec<Volcano>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;

    let mut volcanoes = Vec::new();
    for result in reader.deserialize::<VolcanoRow>() {
        let row = result?;
        let Ok(status) = ActivityStatus::from_str(&row.status) else {
            log::warn!(
                "Skipping volcano {} ({}): unknown status '{}'",
                row.id,
                row.name,
                row.status
            );
            continue;
        };
        volcanoes.push(Volcano {
            id: row.id,
            name: row.name,
            longitude: row.longitude,
            latitude: row.latitude,
            status,
            region: row.region,
            subregion: row.subregion.filter(|s| !s.is_empty()),
        });
    }

    log::info!("Read {} volcanoes from {}", volcanoes.len(), path.display());
    Ok(volcanoes)
}

/// Reads `population.csv` (`id,longitude,latitude,population`).
///
/// # Errors
///
/// Returns [`PipelineError::Csv`] if the file cannot be opened or a row
/// is malformed.
pub fn read_population(path: &Path) -> Result<Vec<PopulationPoint>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let points = reader
        .deserialize::<PopulationPoint>()
        .collect::<Result<Vec<_>, _>>()?;

    log::info!("Read {} population points from {}", points.len(), path.display());
    Ok(points)
}

/// Keeps erupting and restless volcanoes, optionally restricted to the ids
/// or names (case-insensitive) in `filter`.
#[must_use]
pub fn active_volcanoes(volcanoes: Vec<Volcano>, filter: Option<&[String]>) -> Vec<Volcano> {
    volcanoes
        .into_iter()
        .filter(|v| v.status.is_active())
        .filter(|v| {
            filter.is_none_or(|wanted| {
                wanted
                    .iter()
                    .any(|w| w == &v.id || w.eq_ignore_ascii_case(&v.name))
            })
        })
        .collect()
}

/// Splits a comma-separated CLI list, dropping empty entries.
#[must_use]
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
