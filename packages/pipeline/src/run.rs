//! Pipeline entry points.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use volcano_risk_osm::OsmSource;
use volcano_risk_spatial::PopulationIndex;
use volcano_risk_volcano_models::{RiskRecord, Volcano};

use crate::analysis::{VolcanoAnalysis, analyze_volcano, hazard_buffer};
use crate::progress::ProgressCallback;
use crate::{PipelineConfig, PipelineError, export, store};

/// Input and output locations for a run.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    /// `volcanoes.csv`
    pub volcanoes: PathBuf,
    /// `population.csv`
    pub population: PathBuf,
    /// Directory receiving the exports; created if missing.
    pub output_dir: PathBuf,
    /// Restrict the run to these volcano ids or names.
    pub volcano_filter: Option<Vec<String>>,
}

/// A volcano dropped from the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolcanoFailure {
    /// Volcano id.
    pub volcano_id: String,
    /// Volcano name.
    pub volcano_name: String,
    /// Why it was dropped.
    pub error: String,
}

/// Outcome of analysing a batch of volcanoes.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Completed analyses, in input order.
    pub analyses: Vec<VolcanoAnalysis>,
    /// Volcanoes that failed, in input order.
    pub failures: Vec<VolcanoFailure>,
}

impl RunSummary {
    /// Population exposure per analysed volcano.
    #[must_use]
    pub fn risk_records(&self, top_n: usize) -> Vec<RiskRecord> {
        self.analyses
            .iter()
            .map(|a| RiskRecord {
                volcano_id: a.volcano.id.clone(),
                volcano_name: a.volcano.name.clone(),
                region: a.volcano.region.clone(),
                total_population: a.intersection.total_population,
                centers_affected: a.intersection.count,
                top_contributors: a.intersection.top_contributors(top_n),
            })
            .collect()
    }

    /// Sum of population over every (population centre, volcano) pair.
    #[must_use]
    pub fn total_affected(&self) -> f64 {
        self.analyses
            .iter()
            .map(|a| a.intersection.total_population)
            .sum()
    }
}

/// Per-volcano result tagged with its input position.
type Indexed = (usize, Volcano, Result<VolcanoAnalysis, PipelineError>);

/// Analyses every volcano through a bounded concurrent stream.
///
/// Failures are logged with the volcano id and collected in
/// [`RunSummary::failures`]; they never stop the run.
pub async fn analyze_all(
    source: &dyn OsmSource,
    volcanoes: Vec<Volcano>,
    population: Arc<PopulationIndex>,
    config: &PipelineConfig,
    progress: Arc<dyn ProgressCallback>,
) -> RunSummary {
    progress.set_total(volcanoes.len() as u64);

    let results: Vec<Indexed> = futures::stream::iter(volcanoes.into_iter().enumerate())
        .map(|(index, volcano)| {
            let population = Arc::clone(&population);
            let progress = Arc::clone(&progress);
            async move {
                progress.volcano_started(&volcano);
                let result = match hazard_buffer(&volcano, config) {
                    Ok(buffer) => {
                        analyze_volcano(source, &volcano, buffer, population, config).await
                    }
                    Err(e) => Err(e),
                };
                progress.volcano_finished(&volcano, result.is_ok());
                (index, volcano, result)
            }
        })
        .buffer_unordered(config.run.concurrency.max(1))
        .collect()
        .await;

    let summary = fold_results(results);
    progress.finish(format!(
        "Analysed {} volcanoes, {} failed",
        summary.analyses.len(),
        summary.failures.len()
    ));
    summary
}

/// Restores input order and splits successes from failures.
fn fold_results(mut results: Vec<Indexed>) -> RunSummary {
    results.sort_by_key(|(index, ..)| *index);

    results
        .into_iter()
        .fold(RunSummary::default(), |mut summary, (_, volcano, result)| {
            match result {
                Ok(analysis) => summary.analyses.push(analysis),
                Err(e) => {
                    log::error!("Volcano {} ({}) failed: {e}", volcano.id, volcano.name);
                    summary.failures.push(VolcanoFailure {
                        volcano_id: volcano.id,
                        volcano_name: volcano.name,
                        error: e.to_string(),
                    });
                }
            }
            summary
        })
}

/// Reads the inputs and selects the volcanoes to analyse.
fn load_inputs(
    inputs: &PipelineInputs,
) -> Result<(Vec<Volcano>, Arc<PopulationIndex>), PipelineError> {
    let volcanoes = store::active_volcanoes(
        store::read_volcanoes(&inputs.volcanoes)?,
        inputs.volcano_filter.as_deref(),
    );
    let population = Arc::new(PopulationIndex::new(store::read_population(&inputs.population)?));
    log::info!(
        "{} active volcanoes, {} indexed population points",
        volcanoes.len(),
        population.len()
    );
    Ok((volcanoes, population))
}

/// Runs the full pipeline and writes every export.
///
/// # Errors
///
/// Returns [`PipelineError`] if the inputs cannot be read or the exports
/// cannot be written. Individual volcano failures are reported in the
/// returned [`RunSummary`] instead.
pub async fn run_pipeline(
    source: &dyn OsmSource,
    inputs: &PipelineInputs,
    config: &PipelineConfig,
    progress: Arc<dyn ProgressCallback>,
) -> Result<RunSummary, PipelineError> {
    let start = Instant::now();
    config.validate()?;

    let (volcanoes, population) = load_inputs(inputs)?;
    std::fs::create_dir_all(&inputs.output_dir)?;

    let summary = analyze_all(source, volcanoes, population, config, progress).await;

    export::write_tabular(&summary.analyses, &inputs.output_dir, config)?;
    export::write_map_layers(&summary.analyses, &inputs.output_dir)?;

    log::info!(
        "Pipeline finished in {:.1?}: {} volcanoes analysed, {} failed",
        start.elapsed(),
        summary.analyses.len(),
        summary.failures.len()
    );
    Ok(summary)
}

/// Runs only the buffer and population stages and writes the tabular
/// exports. No network access.
///
/// # Errors
///
/// Returns [`PipelineError`] if the inputs cannot be read or the exports
/// cannot be written.
pub fn run_buffers(
    inputs: &PipelineInputs,
    config: &PipelineConfig,
) -> Result<RunSummary, PipelineError> {
    config.validate()?;

    let (volcanoes, population) = load_inputs(inputs)?;
    std::fs::create_dir_all(&inputs.output_dir)?;

    let results: Vec<Indexed> = volcanoes
        .into_iter()
        .enumerate()
        .map(|(index, volcano)| {
            let result = hazard_buffer(&volcano, config).map(|buffer| VolcanoAnalysis {
                intersection: population.intersect(&buffer),
                volcano: volcano.clone(),
                buffer,
                roads: None,
                nodes: Vec::new(),
                services: std::collections::BTreeMap::new(),
            });
            (index, volcano, result)
        })
        .collect();

    let summary = fold_results(results);
    export::write_tabular(&summary.analyses, &inputs.output_dir, config)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use volcano_risk_osm::OsmError;
    use volcano_risk_osm_models::{
        RoadClass, RoadEdge, RoadNetwork, RoadNode, ServiceCategory, ServicePoint,
    };
    use volcano_risk_volcano_models::{ActivityStatus, BoundingBox, PopulationPoint};

    use crate::analysis::StageOutcome;
    use crate::progress::null_progress;

    /// Serves a small road network around any bbox, except for the boxes
    /// containing one of `failing_roads` (error) or `empty_roads` (no
    /// graph), and fails every amenity lookup. Emergency lookups take
    /// `emergency_delay` to answer.
    struct MockSource {
        failing_roads: Vec<(f64, f64)>,
        empty_roads: Vec<(f64, f64)>,
        emergency_delay: Duration,
        road_calls: Mutex<Vec<BoundingBox>>,
    }

    impl MockSource {
        fn new(failing_roads: Vec<(f64, f64)>) -> Self {
            Self {
                failing_roads,
                empty_roads: Vec::new(),
                emergency_delay: Duration::ZERO,
                road_calls: Mutex::new(Vec::new()),
            }
        }
    }

    fn inside(bbox: &BoundingBox, points: &[(f64, f64)]) -> bool {
        points.iter().any(|(lon, lat)| bbox.contains(*lon, *lat))
    }

    fn road_network(bbox: &BoundingBox) -> RoadNetwork {
        let (lon, lat) = bbox.center();
        let node = |id, dx: f64| RoadNode {
            id,
            longitude: lon + dx,
            latitude: lat,
        };
        let edge = |from, to, a: f64, b: f64| RoadEdge {
            from,
            to,
            way_id: 100,
            class: RoadClass::Primary,
            name: Some("Ring Road".to_string()),
            oneway: false,
            geometry: vec![[lon + a, lat], [lon + b, lat]],
        };
        RoadNetwork {
            bbox: *bbox,
            nodes: vec![node(1, -0.01), node(2, 0.0), node(3, 0.01)],
            edges: vec![edge(1, 2, -0.01, 0.0), edge(2, 3, 0.0, 0.01)],
        }
    }

    #[async_trait]
    impl OsmSource for MockSource {
        async fn road_network(
            &self,
            bbox: &BoundingBox,
            _classes: &[String],
        ) -> Result<Option<RoadNetwork>, OsmError> {
            self.road_calls.lock().unwrap().push(*bbox);
            if inside(bbox, &self.failing_roads) {
                return Err(OsmError::Status {
                    status: 504,
                    message: "Gateway Timeout".to_string(),
                });
            }
            if inside(bbox, &self.empty_roads) {
                return Ok(None);
            }
            Ok(Some(road_network(bbox)))
        }

        async fn services(
            &self,
            bbox: &BoundingBox,
            category: ServiceCategory,
        ) -> Result<Vec<ServicePoint>, OsmError> {
            let (lon, lat) = bbox.center();
            match category {
                ServiceCategory::Emergency => {
                    tokio::time::sleep(self.emergency_delay).await;
                    Ok(vec![ServicePoint {
                        osm_id: 9,
                        category,
                        amenity: "hospital".to_string(),
                        name: None,
                        longitude: lon,
                        latitude: lat,
                    }])
                }
                ServiceCategory::Essential => Ok(Vec::new()),
                ServiceCategory::Amenity => Err(OsmError::Remote {
                    message: "runtime error".to_string(),
                }),
            }
        }
    }

    fn volcano(id: &str, lon: f64, lat: f64) -> Volcano {
        Volcano {
            id: id.to_string(),
            name: format!("Volcano {id}"),
            longitude: lon,
            latitude: lat,
            status: ActivityStatus::Erupting,
            region: "Test".to_string(),
            subregion: None,
        }
    }

    fn population() -> Arc<PopulationIndex> {
        Arc::new(PopulationIndex::new(vec![
            PopulationPoint {
                id: "a".to_string(),
                longitude: 10.05,
                latitude: 0.0,
                population: 500.0,
            },
            PopulationPoint {
                id: "b".to_string(),
                longitude: 20.0,
                latitude: 0.1,
                population: 250.0,
            },
        ]))
    }

    fn volcanoes() -> Vec<Volcano> {
        vec![
            volcano("1", 10.0, 0.0),
            volcano("2", 20.0, 0.0),
            volcano("3", 30.0, 0.0),
        ]
    }

    #[tokio::test]
    async fn failing_volcano_does_not_stop_the_run() {
        let source = MockSource::new(vec![(20.0, 0.0)]);
        let summary = analyze_all(
            &source,
            volcanoes(),
            population(),
            &PipelineConfig::default(),
            null_progress(),
        )
        .await;

        let analysed: Vec<&str> = summary.analyses.iter().map(|a| a.volcano.id.as_str()).collect();
        assert_eq!(analysed, vec!["1", "3"]);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].volcano_id, "2");
        assert!(summary.failures[0].error.contains("504"));

        // The volcano after the failing one was still fetched.
        assert_eq!(source.road_calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn concurrent_runs_keep_input_order() {
        let source = MockSource::new(vec![]);
        let mut config = PipelineConfig::default();
        config.run.concurrency = 3;

        let summary =
            analyze_all(&source, volcanoes(), population(), &config, null_progress()).await;
        let analysed: Vec<&str> = summary.analyses.iter().map(|a| a.volcano.id.as_str()).collect();
        assert_eq!(analysed, vec!["1", "2", "3"]);
        assert!(summary.failures.is_empty());
    }

    #[tokio::test]
    async fn service_outcomes_are_kept_per_category() {
        let source = MockSource::new(vec![]);
        let summary = analyze_all(
            &source,
            vec![volcano("1", 10.0, 0.0)],
            population(),
            &PipelineConfig::default(),
            null_progress(),
        )
        .await;

        let analysis = &summary.analyses[0];
        assert!(matches!(
            analysis.services[&ServiceCategory::Emergency],
            StageOutcome::Ready(ref points) if points.len() == 1
        ));
        assert_eq!(analysis.services[&ServiceCategory::Essential], StageOutcome::Empty);
        assert!(matches!(
            analysis.services[&ServiceCategory::Amenity],
            StageOutcome::Failed(_)
        ));

        assert_eq!(analysis.nodes.len(), 3);
        assert!(analysis.nodes.iter().all(|n| (0.0..=1.0).contains(&n.score)));
        assert_eq!(analysis.intersection.count, 1);

        let ids: BTreeSet<i64> = analysis.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, BTreeSet::from([1, 2, 3]));
    }

    #[tokio::test]
    async fn empty_road_network_keeps_the_volcano() {
        let mut source = MockSource::new(vec![]);
        source.empty_roads = vec![(30.0, 0.0)];
        let summary = analyze_all(
            &source,
            volcanoes(),
            population(),
            &PipelineConfig::default(),
            null_progress(),
        )
        .await;

        assert!(summary.failures.is_empty());
        assert_eq!(summary.analyses.len(), 3);
        let empty = &summary.analyses[2];
        assert_eq!(empty.volcano.id, "3");
        assert!(empty.roads.is_none());
        assert!(empty.nodes.is_empty());
        assert_eq!(empty.services.len(), 3);
        assert!(empty.services[&ServiceCategory::Emergency].ready().is_some());

        let dir = std::env::temp_dir().join(format!(
            "volcano_risk_run_empty_roads_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        export::write_map_layers(std::slice::from_ref(empty), &dir).unwrap();

        let read = |name: &str| -> serde_json::Value {
            serde_json::from_str(&std::fs::read_to_string(dir.join(name)).unwrap()).unwrap()
        };
        assert!(read(export::NODES_FILE)["features"].as_array().unwrap().is_empty());
        assert!(read(export::HIGHWAYS_FILE).as_array().unwrap().is_empty());
        let emergency = read(export::services_file(ServiceCategory::Emergency));
        assert_eq!(emergency["features"][0]["properties"]["volcano_id"], "3");
    }

    #[tokio::test]
    async fn slow_service_lookup_only_fails_its_family() {
        let mut source = MockSource::new(vec![]);
        source.emergency_delay = Duration::from_secs(5);
        let mut config = PipelineConfig::default();
        config.run.service_timeout_secs = 1;

        let summary = analyze_all(
            &source,
            vec![volcano("1", 10.0, 0.0)],
            population(),
            &config,
            null_progress(),
        )
        .await;

        assert!(summary.failures.is_empty());
        let analysis = &summary.analyses[0];
        assert_eq!(analysis.nodes.len(), 3);
        assert!(matches!(
            analysis.services[&ServiceCategory::Emergency],
            StageOutcome::Failed(ref message) if message.contains("timed out")
        ));
        assert_eq!(analysis.services[&ServiceCategory::Essential], StageOutcome::Empty);
    }

    #[test]
    fn summary_totals() {
        let population = population();
        let config = PipelineConfig::default();
        let analyses = volcanoes()
            .into_iter()
            .map(|v| {
                let buffer = hazard_buffer(&v, &config).unwrap();
                VolcanoAnalysis {
                    intersection: population.intersect(&buffer),
                    volcano: v,
                    buffer,
                    roads: None,
                    nodes: Vec::new(),
                    services: std::collections::BTreeMap::new(),
                }
            })
            .collect();
        let summary = RunSummary {
            analyses,
            failures: Vec::new(),
        };

        assert!((summary.total_affected() - 750.0).abs() < f64::EPSILON);
        let records = summary.risk_records(5);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].centers_affected, 1);
        assert_eq!(records[2].centers_affected, 0);
        assert_eq!(records[1].top_contributors[0].id, "b");
    }
}
