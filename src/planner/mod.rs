//! Point to point route planning over a [`TransitGraph`] snapshot.
//!
//! The planner never touches shared state: it works on a [`PlanningSnapshot`]
//! taken from the network engine, so any number of plans can run while the
//! density simulator and the duty scheduler keep mutating the live records.

use crate::errors::BusNetError;
use crate::models::{Stop, StopId};
use crate::network::{DEFAULT_AVERAGE_SPEED_KMH, NetworkModel};
use crate::network::transit_graph::TransitGraph;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Congestion weight `k` in `1 + k * normalized_density(destination)`.
    /// Zero plans purely by distance.
    pub congestion_k: f64,
    pub average_speed_kmh: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            congestion_k: 0.0,
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), BusNetError> {
        if !self.congestion_k.is_finite() || self.congestion_k < 0.0 {
            return Err(BusNetError::InvalidParameter {
                name: "congestion_k",
                value: self.congestion_k,
            });
        }
        if !self.average_speed_kmh.is_finite() || self.average_speed_kmh <= 0.0 {
            return Err(BusNetError::InvalidParameter {
                name: "average_speed_kmh",
                value: self.average_speed_kmh,
            });
        }
        Ok(())
    }
}

/// Immutable view of the graph plus the stop records at the time it was taken.
/// `stops[i]` is the stop at node index `i` of `graph`.
#[derive(Clone, Debug)]
pub struct PlanningSnapshot {
    pub graph: Arc<TransitGraph>,
    pub stops: Arc<Vec<Stop>>,
}

impl PlanningSnapshot {
    /// Pairs an already built graph with the model's current stop records.
    pub fn new(graph: Arc<TransitGraph>, model: &NetworkModel) -> Result<Self, BusNetError> {
        let stops = (0..graph.node_count())
            .map(|idx| model.get_stop(graph.stop_id(idx)).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            graph,
            stops: Arc::new(stops),
        })
    }

    pub fn from_model(model: &NetworkModel) -> Result<Self, BusNetError> {
        Self::new(Arc::new(model.build_graph()?), model)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlannedRoute {
    pub stops: Vec<Stop>,
    /// Kilometres, never scaled by congestion.
    pub total_distance: f64,
    /// Minutes.
    pub estimated_time: f64,
}

#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: OrderedFloat<f64>,
    id_sum: u64,
    node_idx: usize,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so BinaryHeap pops the cheapest state first
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.id_sum.cmp(&self.id_sum))
            .then_with(|| other.node_idx.cmp(&self.node_idx))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct RoutePlanner<'a> {
    snapshot: &'a PlanningSnapshot,
    config: PlannerConfig,
}

impl<'a> RoutePlanner<'a> {
    pub fn new(snapshot: &'a PlanningSnapshot, config: PlannerConfig) -> Self {
        Self { snapshot, config }
    }

    /// Least-cost path between two stops (Dijkstra). Equal-cost paths are
    /// resolved towards the lower sum of stop ids along the path.
    pub fn find_route(&self, from: StopId, to: StopId) -> Result<PlannedRoute, BusNetError> {
        let graph = &self.snapshot.graph;

        let start = graph
            .node_index(from)
            .ok_or_else(|| BusNetError::stop_not_found(from))?;
        let goal = graph
            .node_index(to)
            .ok_or_else(|| BusNetError::stop_not_found(to))?;

        let weights = self.density_penalties();
        let node_count = graph.node_count();

        let mut best: Vec<Option<(OrderedFloat<f64>, u64)>> = vec![None; node_count];
        let mut predecessors: Vec<Option<usize>> = vec![None; node_count];
        let mut heap = BinaryHeap::new();

        let start_sum = from as u64;
        best[start] = Some((OrderedFloat(0.0), start_sum));
        heap.push(State {
            cost: OrderedFloat(0.0),
            id_sum: start_sum,
            node_idx: start,
        });

        while let Some(State {
            cost,
            id_sum,
            node_idx,
        }) = heap.pop()
        {
            if best[node_idx].is_some_and(|settled| (cost, id_sum) > settled) {
                continue;
            }

            if node_idx == goal {
                break;
            }

            for edge in graph.neighbors(node_idx) {
                let next_cost = cost + OrderedFloat(edge.distance_km * weights[edge.target]);
                let next_sum = id_sum + graph.stop_id(edge.target) as u64;
                let candidate = (next_cost, next_sum);

                let improves = match best[edge.target] {
                    None => true,
                    Some(current) => candidate < current,
                };

                if improves {
                    best[edge.target] = Some(candidate);
                    predecessors[edge.target] = Some(node_idx);
                    heap.push(State {
                        cost: next_cost,
                        id_sum: next_sum,
                        node_idx: edge.target,
                    });
                }
            }
        }

        if best[goal].is_none() {
            return Err(BusNetError::NoRouteFound { from, to });
        }

        let path = reconstruct_path(start, goal, &predecessors);

        let total_distance = path
            .windows(2)
            .map(|pair| {
                graph
                    .neighbors(pair[0])
                    .iter()
                    .find(|e| e.target == pair[1])
                    .map_or(0.0, |e| e.distance_km)
            })
            .sum::<f64>();

        Ok(PlannedRoute {
            stops: path
                .iter()
                .map(|&idx| self.snapshot.stops[idx].clone())
                .collect(),
            total_distance,
            estimated_time: total_distance / self.config.average_speed_kmh * 60.0,
        })
    }

    /// Multiplier applied to an edge entering each node.
    fn density_penalties(&self) -> Vec<f64> {
        let stops = &self.snapshot.stops;

        if self.config.congestion_k == 0.0 {
            return vec![1.0; stops.len()];
        }

        let max_density = stops
            .iter()
            .map(|s| s.current_density)
            .fold(0.0_f64, f64::max);

        stops
            .iter()
            .map(|s| {
                let normalized = if max_density > 0.0 {
                    s.current_density / max_density
                } else {
                    0.0
                };
                1.0 + self.config.congestion_k * normalized
            })
            .collect()
    }
}

fn reconstruct_path(start: usize, goal: usize, predecessors: &[Option<usize>]) -> Vec<usize> {
    let mut path = vec![goal];
    let mut current = goal;

    while current != start {
        match predecessors[current] {
            Some(prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }

    path.reverse();
    path
}

#[cfg(test)]
mod tests;
