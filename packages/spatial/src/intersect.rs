//! Population-in-buffer selection.
//!
//! [`PopulationIndex`] holds every population centroid of a run in an
//! R-tree so that each volcano's buffer only tests the candidates inside
//! its envelope.

use std::collections::BTreeSet;

use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};
use volcano_risk_volcano_models::{BoundingBox, PopulationContributor, PopulationPoint};

use crate::buffer::HazardBuffer;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Population centres selected inside one hazard buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intersection {
    /// Selected points, in input order.
    pub points: Vec<PopulationPoint>,
    /// Sum of the selected points' population.
    pub total_population: f64,
    /// Number of selected points.
    pub count: usize,
}

impl Intersection {
    fn from_points(points: Vec<PopulationPoint>) -> Self {
        let total_population = points.iter().map(|p| p.population).sum();
        let count = points.len();
        Self {
            points,
            total_population,
            count,
        }
    }

    /// Whether no population centre falls inside the buffer.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The `n` most populated centres, largest first.
    #[must_use]
    pub fn top_contributors(&self, n: usize) -> Vec<PopulationContributor> {
        let mut sorted: Vec<&PopulationPoint> = self.points.iter().collect();
        sorted.sort_by(|a, b| b.population.total_cmp(&a.population));
        sorted
            .into_iter()
            .take(n)
            .map(|p| PopulationContributor {
                id: p.id.clone(),
                population: p.population,
            })
            .collect()
    }
}

/// Selects every point of `points` inside or on the boundary of `buffer`.
///
/// Linear scan; use [`PopulationIndex`] when intersecting many buffers
/// with the same population set.
#[must_use]
pub fn intersect(points: &[PopulationPoint], buffer: &HazardBuffer) -> Intersection {
    Intersection::from_points(
        points
            .iter()
            .filter(|p| buffer.contains(p.longitude, p.latitude))
            .cloned()
            .collect(),
    )
}

/// R-tree over a run's population centroids.
pub struct PopulationIndex {
    points: Vec<PopulationPoint>,
    tree: RTree<IndexedPoint>,
}

impl PopulationIndex {
    /// Builds the index. Points with non-finite coordinates are skipped.
    #[must_use]
    pub fn new(points: Vec<PopulationPoint>) -> Self {
        let entries: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.longitude.is_finite() && p.latitude.is_finite())
            .map(|(i, p)| GeomWithData::new([p.longitude, p.latitude], i))
            .collect();

        let skipped = points.len() - entries.len();
        if skipped > 0 {
            log::warn!("Skipped {skipped} population points with invalid coordinates");
        }

        Self {
            tree: RTree::bulk_load(entries),
            points,
        }
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// All points given to [`PopulationIndex::new`].
    #[must_use]
    pub fn points(&self) -> &[PopulationPoint] {
        &self.points
    }

    /// Selects every point inside or on the boundary of `buffer`.
    #[must_use]
    pub fn intersect(&self, buffer: &HazardBuffer) -> Intersection {
        let (min, max) = buffer.extent();

        // The buffer extent is continuous around its centre; look up the
        // shifted copies as well so points across the antimeridian are
        // found.
        let mut shifts = vec![0.0];
        if max.x > 180.0 {
            shifts.push(-360.0);
        }
        if min.x < -180.0 {
            shifts.push(360.0);
        }

        let mut selected = BTreeSet::new();
        for shift in shifts {
            let envelope = AABB::from_corners([min.x + shift, min.y], [max.x + shift, max.y]);
            for entry in self.tree.locate_in_envelope(&envelope) {
                let point = &self.points[entry.data];
                if buffer.contains(point.longitude, point.latitude) {
                    selected.insert(entry.data);
                }
            }
        }

        Intersection::from_points(
            selected
                .into_iter()
                .map(|i| self.points[i].clone())
                .collect(),
        )
    }

    /// Every point inside `bbox` (edges inclusive), in input order.
    #[must_use]
    pub fn within_bbox(&self, bbox: &BoundingBox) -> Vec<PopulationPoint> {
        let envelopes = if bbox.crosses_antimeridian() {
            vec![
                AABB::from_corners([bbox.min_lon, bbox.min_lat], [180.0, bbox.max_lat]),
                AABB::from_corners([-180.0, bbox.min_lat], [bbox.max_lon, bbox.max_lat]),
            ]
        } else {
            vec![AABB::from_corners(
                [bbox.min_lon, bbox.min_lat],
                [bbox.max_lon, bbox.max_lat],
            )]
        };

        let selected: BTreeSet<usize> = envelopes
            .iter()
            .flat_map(|env| self.tree.locate_in_envelope(env))
            .map(|entry| entry.data)
            .collect();

        selected
            .into_iter()
            .map(|i| self.points[i].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, lon: f64, lat: f64, population: f64) -> PopulationPoint {
        PopulationPoint {
            id: id.to_string(),
            longitude: lon,
            latitude: lat,
            population,
        }
    }

    fn sample() -> Vec<PopulationPoint> {
        vec![
            point("near", 0.0, 0.1, 1_500.0),
            point("mid", 0.0, 5.0, 20_000.5),
            point("far", 10.0, 10.0, 3_000_000.0),
        ]
    }

    #[test]
    fn selects_only_points_inside_buffer() {
        // 600 km reaches the point 5 degrees north but not (10, 10).
        let buffer = HazardBuffer::new(0.0, 0.0, 600_000.0, 64).unwrap();
        let index = PopulationIndex::new(sample());

        let result = index.intersect(&buffer);
        let ids: Vec<&str> = result.points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert_eq!(result.count, 2);
        assert!((result.total_population - 21_500.5).abs() < 1e-9);

        for p in &result.points {
            assert!(buffer.contains(p.longitude, p.latitude));
        }
    }

    #[test]
    fn default_buffer_keeps_only_nearest_point() {
        let buffer = HazardBuffer::with_defaults(0.0, 0.0).unwrap();
        let result = intersect(&sample(), &buffer);
        assert_eq!(result.count, 1);
        assert_eq!(result.points[0].id, "near");
    }

    #[test]
    fn index_and_linear_scan_agree() {
        let buffer = HazardBuffer::new(0.0, 0.0, 600_000.0, 64).unwrap();
        let index = PopulationIndex::new(sample());
        assert_eq!(index.intersect(&buffer), intersect(&sample(), &buffer));
    }

    #[test]
    fn points_outside_give_empty_result() {
        let buffer = HazardBuffer::with_defaults(120.0, -45.0).unwrap();
        let result = PopulationIndex::new(sample()).intersect(&buffer);
        assert!(result.is_empty());
        assert_eq!(result.count, 0);
        assert!(result.total_population.abs() < f64::EPSILON);
    }

    #[test]
    fn finds_points_across_antimeridian() {
        let points = vec![
            point("west", -179.95, -16.0, 10.0),
            point("east", 179.95, -16.0, 20.0),
        ];
        let buffer = HazardBuffer::with_defaults(179.99, -16.0).unwrap();
        let result = PopulationIndex::new(points).intersect(&buffer);
        assert_eq!(result.count, 2);
    }

    #[test]
    fn top_contributors_are_sorted_and_truncated() {
        let intersection = intersect(
            &sample(),
            &HazardBuffer::new(0.0, 0.0, 2_000_000.0, 64).unwrap(),
        );
        let top = intersection.top_contributors(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, "far");
        assert_eq!(top[1].id, "mid");
    }

    #[test]
    fn within_bbox_clips() {
        let index = PopulationIndex::new(sample());
        let clipped = index.within_bbox(&BoundingBox::new(-1.0, -1.0, 1.0, 6.0));
        assert_eq!(clipped.len(), 2);
        let across = index.within_bbox(&BoundingBox::new(170.0, -1.0, -170.0, 1.0));
        assert!(across.is_empty());
    }
}
