//! Pipeline configuration.
//!
//! Loaded from TOML. Every section and key is optional in a user file; the
//! annotated defaults are embedded in the binary and can be printed with
//! `volcano_risk config --default`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use volcano_risk_network::ScoreWeights;
use volcano_risk_osm::OverpassConfig;
use volcano_risk_osm_models::DEFAULT_ROAD_CLASSES;
use volcano_risk_spatial::{DEFAULT_BUFFER_RADIUS_M, DEFAULT_BUFFER_SEGMENTS};

use crate::PipelineError;

/// The annotated default configuration file.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Environment variable overriding [`OverpassConfig::url`].
pub const OVERPASS_URL_ENV: &str = "VOLCANO_RISK_OVERPASS_URL";

/// Hazard buffer geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Radius in metres.
    pub radius_m: f64,
    /// Polygon vertex count.
    pub segments: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_BUFFER_RADIUS_M,
            segments: DEFAULT_BUFFER_SEGMENTS,
        }
    }
}

/// Road network acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadConfig {
    /// `highway` class filter.
    pub classes: Vec<String>,
    /// Keep every weakly connected component.
    pub retain_all: bool,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            classes: DEFAULT_ROAD_CLASSES.iter().map(ToString::to_string).collect(),
            retain_all: false,
        }
    }
}

/// Tabular report options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Population centres listed per volcano.
    pub top_contributors: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_contributors: 5,
        }
    }
}

/// Scheduling of per-volcano work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Volcanoes analysed concurrently.
    pub concurrency: usize,
    /// Upper bound on fetching and scoring one volcano's road network.
    pub volcano_timeout_secs: u64,
    /// Upper bound on one service lookup; exceeding it marks only that
    /// service family as failed.
    pub service_timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            volcano_timeout_secs: 600,
            service_timeout_secs: 300,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// `[buffer]`
    pub buffer: BufferConfig,
    /// `[roads]`
    pub roads: RoadConfig,
    /// `[score]`
    pub score: ScoreWeights,
    /// `[report]`
    pub report: ReportConfig,
    /// `[overpass]`
    pub overpass: OverpassConfig,
    /// `[run]`
    pub run: RunConfig,
}

impl PipelineConfig {
    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TomlDe`] on malformed TOML and
    /// [`PipelineError::Config`] if a value is out of range.
    pub fn from_toml(text: &str) -> Result<Self, PipelineError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from `path`, or the defaults when `None`,
    /// then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the file cannot be read or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut config = match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_toml(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(OVERPASS_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                log::info!("Using Overpass endpoint from {OVERPASS_URL_ENV}: {url}");
                config.overpass.url = url.to_string();
            }
        }

        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] describing the first bad value.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |message: String| Err(PipelineError::Config { message });

        if !(self.buffer.radius_m.is_finite() && self.buffer.radius_m > 0.0) {
            return invalid(format!(
                "buffer.radius_m must be positive, got {}",
                self.buffer.radius_m
            ));
        }
        if self.buffer.segments < 3 {
            return invalid(format!(
                "buffer.segments must be at least 3, got {}",
                self.buffer.segments
            ));
        }
        if self.roads.classes.is_empty() {
            return invalid("roads.classes must name at least one class".to_string());
        }
        if self.roads.classes.iter().any(|c| c.trim().is_empty()) {
            return invalid(format!(
                "roads.classes must not contain blank entries, got {:?}",
                self.roads.classes
            ));
        }
        if self.run.concurrency == 0 {
            return invalid("run.concurrency must be at least 1".to_string());
        }
        if self.run.volcano_timeout_secs == 0 {
            return invalid("run.volcano_timeout_secs must be at least 1".to_string());
        }
        if self.run.service_timeout_secs == 0 {
            return invalid("run.service_timeout_secs must be at least 1".to_string());
        }
        self.score.validate().map_err(|e| PipelineError::Config {
            message: e.to_string(),
        })
    }

    /// Serializes the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TomlSer`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, PipelineError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_match_code_defaults() {
        let embedded = PipelineConfig::from_toml(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(embedded, PipelineConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = PipelineConfig::from_toml(
            r"
            [buffer]
            radius_m = 10000.0

            [run]
            concurrency = 3
            ",
        )
        .unwrap();
        assert!((config.buffer.radius_m - 10_000.0).abs() < f64::EPSILON);
        assert_eq!(config.buffer.segments, 64);
        assert_eq!(config.run.concurrency, 3);
        assert_eq!(config.run.volcano_timeout_secs, 600);
        assert_eq!(config.roads.classes.len(), 5);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for text in [
            "[buffer]\nradius_m = 0.0",
            "[buffer]\nsegments = 2",
            "[run]\nconcurrency = 0",
            "[run]\nservice_timeout_secs = 0",
            "[roads]\nclasses = []",
            "[roads]\nclasses = [\"primary\", \"\"]",
            "[roads]\nclasses = [\"  \"]",
            "[score]\ncentrality = 0.0\npopulation = 0.0",
        ] {
            assert!(
                matches!(PipelineConfig::from_toml(text), Err(PipelineError::Config { .. })),
                "accepted: {text}"
            );
        }
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            PipelineConfig::from_toml("[buffer\nradius_m = 1"),
            Err(PipelineError::TomlDe(_))
        ));
    }

    #[test]
    fn effective_config_round_trips() {
        let config = PipelineConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(PipelineConfig::from_toml(&text).unwrap(), config);
    }
}
