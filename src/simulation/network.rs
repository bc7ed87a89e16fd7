use super::{Location, Point, Vec2};
use std::collections::HashMap;
use thiserror::Error;

/// Index of a street in [`NetworkModel::streets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreetId(pub usize);

/// Index of a synthetic connector path in [`NetworkModel::paths`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(pub usize);

/// Producer-assigned intersection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntersectionId(pub u32);

#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    #[error("street {street} leads into unknown intersection {intersection}")]
    UnknownIntersection { street: usize, intersection: u32 },
    #[error("intersection {intersection} references unknown street {street}")]
    UnknownStreet { intersection: u32, street: usize },
    #[error("intersection {intersection} references unknown path {path}")]
    UnknownPath { intersection: u32, path: usize },
    #[error("path {path} leads into unknown street {street}")]
    UnknownPathTarget { path: usize, street: usize },
    #[error("intersection {intersection} has {found} probabilities for inbound street {street}, expected {expected}")]
    ProbabilityMismatch {
        intersection: u32,
        street: usize,
        found: usize,
        expected: usize,
    },
    #[error("start street {0} does not exist")]
    UnknownStartStreet(usize),
    #[error("{streets} start streets but {probabilities} start probabilities")]
    StartTableMismatch { streets: usize, probabilities: usize },
}

/// Polyline geometry shared by streets and connector paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub points: Vec<Point>,
    /// Length of each segment, one entry per consecutive pair of points.
    pub distance: Vec<f32>,
    pub total_distance: f32,
    pub speed_limit: f32,
}

impl Track {
    pub fn from_points(points: Vec<Point>, speed_limit: f32) -> Self {
        let distance: Vec<f32> = points
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).norm())
            .collect();
        let total_distance = distance.iter().sum();

        Self {
            points,
            distance,
            total_distance,
            speed_limit,
        }
    }

    pub fn segment_count(&self) -> usize {
        self.distance.len()
    }

    /// A track without segments cannot be driven along.
    pub fn is_degenerate(&self) -> bool {
        self.distance.is_empty() || self.points.len() < 2
    }

    pub fn origin(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn terminal(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Splits a distance from the track origin into a segment index and the
    /// progress within that segment. Offsets past the end land on the end of
    /// the last segment.
    pub fn locate(&self, offset: f32) -> (usize, f32) {
        let mut remaining = offset.max(0.0);
        for (segment, &length) in self.distance.iter().enumerate() {
            if remaining < length {
                return (segment, remaining);
            }
            remaining -= length;
        }
        match self.distance.last() {
            Some(&length) => (self.distance.len() - 1, length),
            None => (0, 0.0),
        }
    }

    /// Linear interpolation between the endpoints of `segment`.
    pub fn point_at(&self, segment: usize, segment_dist: f32) -> Point {
        let (start, end) = match (self.points.get(segment), self.points.get(segment + 1)) {
            (Some(start), Some(end)) => (*start, *end),
            (Some(start), None) => return *start,
            _ => return self.terminal().unwrap_or_else(Point::origin),
        };
        let length = self.distance.get(segment).copied().unwrap_or(0.0);
        if length <= 0.0 {
            return start;
        }
        start + (end - start) * (segment_dist / length).clamp(0.0, 1.0)
    }

    /// Direction of `segment` in render-plane convention. The final segment
    /// and anything past it use the last two points.
    pub fn heading(&self, segment: usize) -> Option<Vec2> {
        let count = self.points.len();
        if count < 2 {
            return None;
        }
        let start = segment.min(count - 2);
        let delta = self.points[start + 1] - self.points[start];
        Some(Vec2::new(delta.x, -delta.y))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Street {
    pub track: Track,
    /// Intersection at the terminal end, `None` at the network edge.
    pub in_to: Option<IntersectionId>,
}

/// Short connector geometry carrying a particle through an intersection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorPath {
    pub track: Track,
    /// The real street this path leads into.
    pub in_to: StreetId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intersection {
    pub outbound: Vec<StreetId>,
    /// Cumulative probabilities per inbound street, aligned with `outbound`.
    pub probabilities: HashMap<StreetId, Vec<f32>>,
    /// Connector paths available to each inbound street.
    pub paths: HashMap<StreetId, Vec<PathId>>,
    pub stop: bool,
}

impl Intersection {
    /// First outbound street whose cumulative probability exceeds `r`.
    /// `None` when the inbound street has no table or the draw misses
    /// every bucket.
    pub fn choose_outbound(&self, inbound: StreetId, r: f32) -> Option<StreetId> {
        let cumulative = self.probabilities.get(&inbound)?;
        let index = cumulative.iter().position(|&p| p > r)?;
        self.outbound.get(index).copied()
    }

    pub fn find_path(
        &self,
        paths: &[ConnectorPath],
        inbound: StreetId,
        outbound: StreetId,
    ) -> Option<PathId> {
        self.paths
            .get(&inbound)?
            .iter()
            .copied()
            .find(|id| paths.get(id.0).is_some_and(|path| path.in_to == outbound))
    }

    pub fn is_dead_end(&self) -> bool {
        self.outbound.is_empty()
    }
}

/// Converts non-negative weights into a cumulative table ending at 1.0.
/// Returns `None` when the weights do not sum to a positive value.
pub fn cumulative_probabilities(weights: &[f32]) -> Option<Vec<f32>> {
    let total: f64 = weights.iter().map(|&w| f64::from(w.max(0.0))).sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }

    let mut running = 0.0;
    Some(
        weights
            .iter()
            .map(|&w| {
                running += f64::from(w.max(0.0));
                (running / total) as f32
            })
            .collect(),
    )
}

/// Static street network. Built once by a producer and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct NetworkModel {
    streets: Vec<Street>,
    paths: Vec<ConnectorPath>,
    intersections: HashMap<IntersectionId, Intersection>,
    start_street_indices: Vec<StreetId>,
    start_street_probabilities: Vec<f32>,
}

impl NetworkModel {
    /// Checks that every id referenced by the producer resolves. An empty
    /// start table makes every street an entry with uniform weight.
    pub fn new(
        streets: Vec<Street>,
        paths: Vec<ConnectorPath>,
        intersections: HashMap<IntersectionId, Intersection>,
        start_street_indices: Vec<StreetId>,
        start_street_probabilities: Vec<f32>,
    ) -> Result<Self, NetworkError> {
        for (index, street) in streets.iter().enumerate() {
            if let Some(id) = street.in_to {
                if !intersections.contains_key(&id) {
                    return Err(NetworkError::UnknownIntersection {
                        street: index,
                        intersection: id.0,
                    });
                }
            }
        }

        for (index, path) in paths.iter().enumerate() {
            if path.in_to.0 >= streets.len() {
                return Err(NetworkError::UnknownPathTarget {
                    path: index,
                    street: path.in_to.0,
                });
            }
        }

        for (id, intersection) in &intersections {
            let unknown_street = intersection
                .outbound
                .iter()
                .chain(intersection.probabilities.keys())
                .chain(intersection.paths.keys())
                .find(|street| street.0 >= streets.len());
            if let Some(street) = unknown_street {
                return Err(NetworkError::UnknownStreet {
                    intersection: id.0,
                    street: street.0,
                });
            }

            if let Some(path) = intersection
                .paths
                .values()
                .flatten()
                .find(|path| path.0 >= paths.len())
            {
                return Err(NetworkError::UnknownPath {
                    intersection: id.0,
                    path: path.0,
                });
            }

            for (inbound, cumulative) in &intersection.probabilities {
                if cumulative.len() != intersection.outbound.len() {
                    return Err(NetworkError::ProbabilityMismatch {
                        intersection: id.0,
                        street: inbound.0,
                        found: cumulative.len(),
                        expected: intersection.outbound.len(),
                    });
                }
            }
        }

        if let Some(street) = start_street_indices.iter().find(|s| s.0 >= streets.len()) {
            return Err(NetworkError::UnknownStartStreet(street.0));
        }

        if start_street_indices.len() != start_street_probabilities.len() {
            return Err(NetworkError::StartTableMismatch {
                streets: start_street_indices.len(),
                probabilities: start_street_probabilities.len(),
            });
        }

        let (start_street_indices, start_street_probabilities) = if start_street_indices.is_empty() {
            let indices: Vec<StreetId> = (0..streets.len()).map(StreetId).collect();
            let probabilities = cumulative_probabilities(&vec![1.0; indices.len()]).unwrap_or_default();
            (indices, probabilities)
        } else {
            (start_street_indices, start_street_probabilities)
        };

        log::debug!(
            "Network built: {} streets, {} paths, {} intersections, {} entry streets",
            streets.len(),
            paths.len(),
            intersections.len(),
            start_street_indices.len()
        );

        Ok(Self {
            streets,
            paths,
            intersections,
            start_street_indices,
            start_street_probabilities,
        })
    }

    pub fn streets(&self) -> &[Street] {
        &self.streets
    }

    pub fn paths(&self) -> &[ConnectorPath] {
        &self.paths
    }

    pub fn intersections(&self) -> &HashMap<IntersectionId, Intersection> {
        &self.intersections
    }

    pub fn start_street_indices(&self) -> &[StreetId] {
        &self.start_street_indices
    }

    pub fn start_street_probabilities(&self) -> &[f32] {
        &self.start_street_probabilities
    }

    pub fn street(&self, id: StreetId) -> Option<&Street> {
        self.streets.get(id.0)
    }

    pub fn path(&self, id: PathId) -> Option<&ConnectorPath> {
        self.paths.get(id.0)
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.streets.is_empty()
    }

    /// Geometry a particle at `location` is travelling along.
    pub fn track(&self, location: Location) -> Option<&Track> {
        match location {
            Location::Street(id) => self.street(id).map(|street| &street.track),
            Location::Intersection { path, .. } => self.path(path).map(|path| &path.track),
        }
    }

    pub fn find_path(
        &self,
        intersection: IntersectionId,
        inbound: StreetId,
        outbound: StreetId,
    ) -> Option<PathId> {
        self.intersection(intersection)?
            .find_path(&self.paths, inbound, outbound)
    }

    /// Weighted entry street for draw `r`. A draw past the last bucket falls
    /// back to the last entry street.
    pub fn pick_start_street(&self, r: f32) -> Option<StreetId> {
        self.start_street_probabilities
            .iter()
            .position(|&p| p > r)
            .and_then(|index| self.start_street_indices.get(index))
            .or_else(|| self.start_street_indices.last())
            .copied()
    }

    /// Minimum and maximum corner over every street point.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let mut points = self.streets.iter().flat_map(|street| street.track.points.iter());
        let first = *points.next()?;
        Some(points.fold((first, first), |(min, max), p| {
            (min.inf(p), max.sup(p))
        }))
    }
}
