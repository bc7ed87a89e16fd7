use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};
use crate::simulation::{
    cumulative_probabilities, ConnectorPath, Intersection, IntersectionId, NetworkModel, PathId,
    Point, Street, StreetId, Track,
};
use super::Validate;

/// Street network description, as handed over by whatever converted the
/// map data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    pub network: NetworkInfo,
    #[serde(default)]
    pub streets: Vec<StreetConfig>,
    #[serde(default)]
    pub intersections: Vec<IntersectionConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreetConfig {
    pub points: Vec<[f32; 3]>,
    pub speed_limit: f32,
    /// Intersection at the terminal end; absent at the network edge.
    #[serde(default)]
    pub in_to: Option<u32>,
    /// Relative weight for spawning on this street.
    #[serde(default)]
    pub entry_weight: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntersectionConfig {
    pub id: u32,
    #[serde(default)]
    pub outbound: Vec<usize>,
    #[serde(default)]
    pub stop: bool,
    #[serde(default)]
    pub turns: Vec<TurnConfig>,
}

/// Turning weights and connector paths for one inbound street.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TurnConfig {
    pub inbound: usize,
    /// One weight per outbound street, in `outbound` order.
    pub weights: Vec<f32>,
    #[serde(default)]
    pub paths: Vec<PathConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathConfig {
    pub to: usize,
    pub points: Vec<[f32; 3]>,
    /// Defaults to the inbound street's speed limit.
    #[serde(default)]
    pub speed_limit: Option<f32>,
}

fn to_points(points: &[[f32; 3]]) -> Vec<Point> {
    points.iter().map(|&[x, y, z]| Point::new(x, y, z)).collect()
}

impl NetworkConfig {
    pub fn build(&self) -> Result<NetworkModel> {
        let streets: Vec<Street> = self
            .streets
            .iter()
            .map(|street| Street {
                track: Track::from_points(to_points(&street.points), street.speed_limit),
                in_to: street.in_to.map(IntersectionId),
            })
            .collect();

        let mut paths = Vec::new();
        let mut intersections = HashMap::new();

        for config in &self.intersections {
            let mut intersection = Intersection {
                outbound: config.outbound.iter().copied().map(StreetId).collect(),
                stop: config.stop,
                ..Default::default()
            };

            for turn in &config.turns {
                let inbound = StreetId(turn.inbound);
                let cumulative = cumulative_probabilities(&turn.weights).ok_or_else(|| {
                    anyhow!(
                        "Intersection {} turn weights for street {} must sum to a positive value",
                        config.id,
                        turn.inbound
                    )
                })?;
                intersection.probabilities.insert(inbound, cumulative);

                let inbound_limit = self
                    .streets
                    .get(turn.inbound)
                    .map(|street| street.speed_limit)
                    .unwrap_or_default();
                for path in &turn.paths {
                    let id = PathId(paths.len());
                    paths.push(ConnectorPath {
                        track: Track::from_points(
                            to_points(&path.points),
                            path.speed_limit.unwrap_or(inbound_limit),
                        ),
                        in_to: StreetId(path.to),
                    });
                    intersection.paths.entry(inbound).or_insert_with(Vec::new).push(id);
                }
            }

            intersections.insert(IntersectionId(config.id), intersection);
        }

        let (start_streets, weights): (Vec<StreetId>, Vec<f32>) = self
            .streets
            .iter()
            .enumerate()
            .filter_map(|(index, street)| {
                street
                    .entry_weight
                    .filter(|weight| *weight > 0.0)
                    .map(|weight| (StreetId(index), weight))
            })
            .unzip();
        let start_probabilities = cumulative_probabilities(&weights).unwrap_or_default();

        let model = NetworkModel::new(
            streets,
            paths,
            intersections,
            start_streets,
            start_probabilities,
        )?;
        Ok(model)
    }
}

impl Validate for NetworkConfig {
    fn validate(&self) -> Result<()> {
        if self.streets.is_empty() {
            return Err(anyhow!("Network '{}' has no streets", self.network.name));
        }

        let intersection_ids: HashSet<u32> = self.intersections.iter().map(|i| i.id).collect();
        if intersection_ids.len() != self.intersections.len() {
            return Err(anyhow!("Intersection ids must be unique"));
        }

        for (index, street) in self.streets.iter().enumerate() {
            if street.points.len() < 2 {
                return Err(anyhow!("Street {} needs at least two points", index));
            }

            if street.speed_limit <= 0.0 {
                return Err(anyhow!("Street {} speed limit must be positive", index));
            }

            if let Some(id) = street.in_to {
                if !intersection_ids.contains(&id) {
                    return Err(anyhow!("Street {} leads into unknown intersection {}", index, id));
                }
            }

            if let Some(weight) = street.entry_weight {
                if weight < 0.0 {
                    return Err(anyhow!("Street {} entry weight must be non-negative", index));
                }
            }
        }

        let street_count = self.streets.len();
        for intersection in &self.intersections {
            for &street in &intersection.outbound {
                if street >= street_count {
                    return Err(anyhow!("Intersection {} has unknown outbound street {}", intersection.id, street));
                }
            }

            for turn in &intersection.turns {
                if turn.inbound >= street_count {
                    return Err(anyhow!("Intersection {} has unknown inbound street {}", intersection.id, turn.inbound));
                }

                if turn.weights.len() != intersection.outbound.len() {
                    return Err(anyhow!(
                        "Intersection {} lists {} weights for street {}, expected {}",
                        intersection.id, turn.weights.len(), turn.inbound, intersection.outbound.len()
                    ));
                }

                if turn.weights.iter().any(|w| *w < 0.0) {
                    return Err(anyhow!("Intersection {} turn weights must be non-negative", intersection.id));
                }

                for path in &turn.paths {
                    if !intersection.outbound.contains(&path.to) {
                        return Err(anyhow!(
                            "Intersection {} path from street {} leads to {}, which is not outbound",
                            intersection.id, turn.inbound, path.to
                        ));
                    }

                    if path.points.len() < 2 {
                        return Err(anyhow!("Intersection {} path geometry needs at least two points", intersection.id));
                    }
                }
            }
        }

        Ok(())
    }
}
