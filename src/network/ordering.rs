// Demand-weighted stop ordering for a single route.
//
// Moving from stop `i` to stop `j` costs `distance(i, j) / (demand(j) + 1)`,
// so busy stops are cheap to reach and end up served earlier. The first and
// last stop of the route are terminals and keep their place; every order of
// the stops in between is searched exactly (Held-Karp), which bounds the
// route length the optimiser accepts.

use crate::errors::BusNetError;
use crate::haversine_distance_km;
use crate::models::{RouteId, Stop, StopId};
use serde::{Deserialize, Serialize};

/// Longest route, in stops, that [`optimal_order`] will search.
pub const MAX_ORDERED_STOPS: usize = 16;

/// Proposed stop order for a route, next to the order it has now.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteOrdering {
    pub route_id: RouteId,
    pub current_stops: Vec<StopId>,
    pub optimized_stops: Vec<StopId>,
    pub current_cost: f64,
    pub optimized_cost: f64,
    /// Kilometres along the proposed order.
    pub optimized_distance: f64,
    /// Whether the route now uses the proposed order.
    pub applied: bool,
}

fn leg_cost(from: &Stop, to: &Stop) -> f64 {
    haversine_distance_km(from.latitude, from.longitude, to.latitude, to.longitude)
        / (to.current_density + 1.0)
}

/// Demand-weighted cost of visiting `stops` in the given order.
pub fn demand_weighted_cost(stops: &[&Stop]) -> f64 {
    stops.windows(2).map(|pair| leg_cost(pair[0], pair[1])).sum()
}

/// Plain haversine length of visiting `stops` in the given order, in km.
pub fn path_distance_km(stops: &[&Stop]) -> f64 {
    stops
        .windows(2)
        .map(|pair| {
            haversine_distance_km(
                pair[0].latitude,
                pair[0].longitude,
                pair[1].latitude,
                pair[1].longitude,
            )
        })
        .sum()
}

/// Cheapest order of `stops` with both terminals fixed.
///
/// Among equally cheap orders the first one found in index order wins, so
/// the result only depends on the input.
pub fn optimal_order(stops: &[&Stop]) -> Result<Vec<StopId>, BusNetError> {
    let n = stops.len();

    if n > MAX_ORDERED_STOPS {
        return Err(BusNetError::InvalidParameter {
            name: "route_stop_count",
            value: n as f64,
        });
    }

    if n <= 3 {
        return Ok(stops.iter().map(|s| s.id).collect());
    }

    let last = n - 1;
    let full = (1usize << n) - 1;

    let costs = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| if i == j { 0.0 } else { leg_cost(stops[i], stops[j]) })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    // best[mask][j]: cheapest path from stop 0 through `mask`, ending at `j`
    let mut best = vec![vec![f64::INFINITY; n]; 1 << n];
    let mut parent = vec![vec![usize::MAX; n]; 1 << n];
    best[1][0] = 0.0;

    for mask in 1..=full {
        if mask & 1 == 0 {
            continue;
        }

        for j in 0..n {
            if mask & (1 << j) == 0 || !best[mask][j].is_finite() {
                continue;
            }

            for k in 1..n {
                if mask & (1 << k) != 0 {
                    continue;
                }

                let next = mask | (1 << k);
                // the far terminal can only close the path
                if k == last && next != full {
                    continue;
                }

                let candidate = best[mask][j] + costs[j][k];
                if candidate < best[next][k] {
                    best[next][k] = candidate;
                    parent[next][k] = j;
                }
            }
        }
    }

    let mut order = Vec::with_capacity(n);
    let mut mask = full;
    let mut current = last;

    while current != usize::MAX {
        order.push(stops[current].id);
        let previous = parent[mask][current];
        mask ^= 1 << current;
        current = previous;
    }

    order.reverse();
    Ok(order)
}
