//! Overpass API client.
//!
//! Queries are sent as `POST data=<query>` to the configured interpreter
//! endpoint. Requests from one [`OverpassSource`] are spaced by
//! `request_delay_ms` to stay within the public instances' rate limits.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use volcano_risk_osm_models::{RoadNetwork, ServiceCategory, ServicePoint};
use volcano_risk_volcano_models::BoundingBox;

use crate::retry::{self, RetryPolicy};
use crate::{OsmError, OsmSource, roads, services};

/// Public Overpass interpreter endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Connection settings for the Overpass API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverpassConfig {
    /// Interpreter endpoint.
    pub url: String,
    /// Server-side query timeout, also used as the HTTP timeout.
    pub timeout_secs: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Minimum spacing between two requests.
    pub request_delay_ms: u64,
    /// Retries for transient failures.
    pub max_retries: u32,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OVERPASS_URL.to_string(),
            timeout_secs: 180,
            user_agent: concat!("volcano-risk/", env!("CARGO_PKG_VERSION")).to_string(),
            request_delay_ms: 1_000,
            max_retries: 4,
        }
    }
}

/// Formats a bounding box as an Overpass `(south,west,north,east)` filter.
#[must_use]
pub fn bbox_filter(bbox: &BoundingBox) -> String {
    format!(
        "({},{},{},{})",
        bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon
    )
}

/// Top-level Overpass JSON response.
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassResponse {
    /// Returned elements.
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Server remark, set when the query hit a runtime error or timeout.
    #[serde(default)]
    pub remark: Option<String>,
}

impl OverpassResponse {
    /// Deserializes a response, turning runtime-error remarks into errors.
    ///
    /// # Errors
    ///
    /// Returns [`OsmError::Json`] if the value does not match the Overpass
    /// schema and [`OsmError::Remote`] if the server reported a runtime
    /// error (a partial result is never returned as data).
    pub fn from_value(value: serde_json::Value) -> Result<Self, OsmError> {
        let response: Self = serde_json::from_value(value)?;
        if let Some(remark) = response.remark.as_deref().filter(|r| r.contains("error")) {
            return Err(OsmError::Remote {
                message: remark.to_string(),
            });
        }
        Ok(response)
    }
}

/// A latitude/longitude pair as emitted by `out geom`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLon {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// A relation member with its geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    /// Member element type (`node`, `way`, `relation`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Member role (`outer`, `inner`, ...).
    #[serde(default)]
    pub role: String,
    /// Way geometry, for way members.
    #[serde(default)]
    pub geometry: Vec<LatLon>,
    /// Latitude, for node members.
    pub lat: Option<f64>,
    /// Longitude, for node members.
    pub lon: Option<f64>,
}

/// One OSM element.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    /// A node.
    Node {
        /// Node id.
        id: i64,
        /// Latitude.
        lat: f64,
        /// Longitude.
        lon: f64,
        /// Tags.
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    /// A way.
    Way {
        /// Way id.
        id: i64,
        /// Node references, in order.
        #[serde(default)]
        nodes: Vec<i64>,
        /// Tags.
        #[serde(default)]
        tags: BTreeMap<String, String>,
        /// Vertex coordinates (`out geom` only).
        #[serde(default)]
        geometry: Vec<LatLon>,
        /// Bounding-box centre (`out center` only).
        center: Option<LatLon>,
    },
    /// A relation.
    Relation {
        /// Relation id.
        id: i64,
        /// Members (with geometry under `out geom`).
        #[serde(default)]
        members: Vec<Member>,
        /// Tags.
        #[serde(default)]
        tags: BTreeMap<String, String>,
        /// Bounding-box centre (`out center` only).
        center: Option<LatLon>,
    },
}

/// [`OsmSource`] backed by a live Overpass endpoint.
pub struct OverpassSource {
    client: reqwest::Client,
    config: OverpassConfig,
    last_request: Mutex<Option<Instant>>,
}

impl OverpassSource {
    /// Builds a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OsmError::Http`] if the HTTP client cannot be built.
    pub fn new(config: OverpassConfig) -> Result<Self, OsmError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs + 30))
            .build()?;

        Ok(Self {
            client,
            config,
            last_request: Mutex::new(None),
        })
    }

    /// The configuration this source was built with.
    #[must_use]
    pub const fn config(&self) -> &OverpassConfig {
        &self.config
    }

    /// Runs an Overpass QL query and returns the parsed response.
    ///
    /// # Errors
    ///
    /// Returns [`OsmError`] if the request fails after retries or the
    /// response reports a runtime error.
    pub async fn query(&self, query: &str) -> Result<OverpassResponse, OsmError> {
        self.throttle().await;

        log::debug!("Overpass query: {query}");
        let policy = RetryPolicy {
            max_retries: self.config.max_retries,
            ..RetryPolicy::default()
        };
        let value = retry::send_json(
            || {
                self.client
                    .post(&self.config.url)
                    .form(&[("data", query)])
            },
            policy,
        )
        .await?;

        OverpassResponse::from_value(value)
    }

    /// Waits until `request_delay_ms` has passed since the previous
    /// request from this source.
    async fn throttle(&self) {
        let spacing = Duration::from_millis(self.config.request_delay_ms);
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < spacing {
                tokio::time::sleep(spacing - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl OsmSource for OverpassSource {
    async fn road_network(
        &self,
        bbox: &BoundingBox,
        classes: &[String],
    ) -> Result<Option<RoadNetwork>, OsmError> {
        roads::fetch_road_network(self, bbox, classes).await
    }

    async fn services(
        &self,
        bbox: &BoundingBox,
        category: ServiceCategory,
    ) -> Result<Vec<ServicePoint>, OsmError> {
        services::locate_services(self, bbox, category).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_filter_is_south_west_north_east() {
        let bbox = BoundingBox::new(14.7, 37.5, 15.2, 38.0);
        assert_eq!(bbox_filter(&bbox), "(37.5,14.7,38,15.2)");
    }

    #[test]
    fn parses_elements_of_every_type() {
        let value = serde_json::json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 1.0, "lon": 2.0},
                {"type": "way", "id": 2, "nodes": [1, 3], "tags": {"highway": "primary"}},
                {"type": "relation", "id": 3, "members": [
                    {"type": "way", "ref": 2, "role": "outer",
                     "geometry": [{"lat": 1.0, "lon": 2.0}, {"lat": 1.5, "lon": 2.5}]}
                ]}
            ]
        });
        let response = OverpassResponse::from_value(value).unwrap();
        assert_eq!(response.elements.len(), 3);
        assert!(matches!(response.elements[1], Element::Way { id: 2, .. }));
    }

    #[test]
    fn runtime_error_remark_is_an_error() {
        let value = serde_json::json!({
            "elements": [],
            "remark": "runtime error: Query timed out in \"query\" at line 1 after 181 seconds."
        });
        assert!(matches!(
            OverpassResponse::from_value(value),
            Err(OsmError::Remote { .. })
        ));
    }

    #[test]
    fn empty_response_is_not_an_error() {
        let response = OverpassResponse::from_value(serde_json::json!({"elements": []})).unwrap();
        assert!(response.elements.is_empty());
    }
}
