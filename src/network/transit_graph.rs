// Undirected stop graph derived from the network's routes.
//
// Nodes are stops, indexed densely in ascending stop id order so that two
// builds from the same records produce the same graph. An edge exists for
// every consecutive pair of stops in any route; parallel edges contributed
// by several routes collapse into one since their length is identical.

use crate::haversine_distance_km;
use crate::models::StopId;
use ahash::AHashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphEdge {
    /// Dense node index of the neighbouring stop.
    pub target: usize,
    /// Unscaled haversine length in kilometres.
    pub distance_km: f64,
}

#[derive(Clone, Debug, Default)]
pub struct TransitGraph {
    stop_ids: Vec<StopId>,
    index: AHashMap<StopId, usize>,
    coords: Vec<(f64, f64)>,
    adjacency: Vec<Vec<GraphEdge>>,
}

impl TransitGraph {
    /// `nodes` must be sorted by stop id and free of duplicates.
    pub(crate) fn with_nodes(nodes: Vec<(StopId, f64, f64)>) -> Self {
        let mut graph = TransitGraph {
            stop_ids: Vec::with_capacity(nodes.len()),
            index: AHashMap::with_capacity(nodes.len()),
            coords: Vec::with_capacity(nodes.len()),
            adjacency: vec![Vec::new(); nodes.len()],
        };

        for (idx, (id, lat, lon)) in nodes.into_iter().enumerate() {
            graph.stop_ids.push(id);
            graph.index.insert(id, idx);
            graph.coords.push((lat, lon));
        }

        graph
    }

    /// Adds the undirected edge `a <-> b` unless it already exists.
    pub(crate) fn connect(&mut self, a: StopId, b: StopId) {
        let (Some(&a_idx), Some(&b_idx)) = (self.index.get(&a), self.index.get(&b)) else {
            return;
        };

        if self.adjacency[a_idx].iter().any(|e| e.target == b_idx) {
            return;
        }

        let (lat1, lon1) = self.coords[a_idx];
        let (lat2, lon2) = self.coords[b_idx];
        let distance_km = haversine_distance_km(lat1, lon1, lat2, lon2);

        self.adjacency[a_idx].push(GraphEdge {
            target: b_idx,
            distance_km,
        });
        self.adjacency[b_idx].push(GraphEdge {
            target: a_idx,
            distance_km,
        });
    }

    pub fn node_index(&self, stop_id: StopId) -> Option<usize> {
        self.index.get(&stop_id).copied()
    }

    pub fn stop_id(&self, node_idx: usize) -> StopId {
        self.stop_ids[node_idx]
    }

    pub fn neighbors(&self, node_idx: usize) -> &[GraphEdge] {
        &self.adjacency[node_idx]
    }

    pub fn node_count(&self) -> usize {
        self.stop_ids.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(|edges| edges.len()).sum::<usize>() / 2
    }

    /// Length of the direct edge between two stops, if they are adjacent.
    pub fn edge_distance(&self, a: StopId, b: StopId) -> Option<f64> {
        let a_idx = self.node_index(a)?;
        let b_idx = self.node_index(b)?;
        self.adjacency[a_idx]
            .iter()
            .find(|e| e.target == b_idx)
            .map(|e| e.distance_km)
    }
}
