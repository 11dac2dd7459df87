pub mod ordering;
pub mod seed;
pub mod transit_graph;


use crate::errors::BusNetError;
use crate::haversine_distance_km;
use crate::models::{NewRoute, NewStop, Route, RouteId, Stop, StopId};
use ordering::RouteOrdering;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use transit_graph::TransitGraph;

pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 20.0;

/// Stops and routes of the bus network.
///
/// Records are kept ordered by id so that every projection of the model
/// (the graph, listings, scheduler inputs) is deterministic.
#[derive(Clone, Debug)]
pub struct NetworkModel {
    stops: BTreeMap<StopId, Stop>,
    routes: BTreeMap<RouteId, Route>,
    average_speed_kmh: f64,
}

impl NetworkModel {
    /// Builds the model and checks that the routes form a valid topology.
    ///
    /// Route `total_distance` is always recomputed from stop coordinates;
    /// `estimated_time` is derived from it unless it was configured (> 0).
    pub fn new(
        stops: Vec<Stop>,
        routes: Vec<Route>,
        average_speed_kmh: f64,
    ) -> Result<Self, BusNetError> {
        if !average_speed_kmh.is_finite() || average_speed_kmh <= 0.0 {
            return Err(BusNetError::InvalidParameter {
                name: "average_speed_kmh",
                value: average_speed_kmh,
            });
        }

        let mut stop_map = BTreeMap::new();
        for stop in stops {
            Stop::validate_coordinates(stop.latitude, stop.longitude)?;
            if stop.current_density < 0.0 || !stop.current_density.is_finite() {
                return Err(BusNetError::InvalidDensity(stop.current_density));
            }
            if stop_map.insert(stop.id, stop).is_some() {
                return Err(BusNetError::InvalidTopology(String::from(
                    "duplicate stop id in network",
                )));
            }
        }

        let mut model = NetworkModel {
            stops: stop_map,
            routes: BTreeMap::new(),
            average_speed_kmh,
        };

        for mut route in routes {
            model.validate_route_stops(&route.name, &route.stops)?;
            if model.routes.contains_key(&route.id) {
                return Err(BusNetError::InvalidTopology(format!(
                    "duplicate route id {}",
                    route.id
                )));
            }
            model.derive_route_metrics(&mut route);
            model.routes.insert(route.id, route);
        }

        Ok(model)
    }

    pub fn get_stop(&self, id: StopId) -> Result<&Stop, BusNetError> {
        self.stops
            .get(&id)
            .ok_or_else(|| BusNetError::stop_not_found(id))
    }

    pub fn get_route(&self, id: RouteId) -> Result<&Route, BusNetError> {
        self.routes
            .get(&id)
            .ok_or_else(|| BusNetError::route_not_found(id))
    }

    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.values()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub(crate) fn stops_mut(&mut self) -> impl Iterator<Item = &mut Stop> {
        self.stops.values_mut()
    }

    pub(crate) fn stop_mut(&mut self, id: StopId) -> Result<&mut Stop, BusNetError> {
        self.stops
            .get_mut(&id)
            .ok_or_else(|| BusNetError::stop_not_found(id))
    }

    /// Density of every stop, keyed by stop id.
    pub fn densities(&self) -> BTreeMap<StopId, f64> {
        self.stops
            .values()
            .map(|stop| (stop.id, stop.current_density))
            .collect()
    }

    /// Projects the current stops and routes into a [`TransitGraph`].
    pub fn build_graph(&self) -> Result<TransitGraph, BusNetError> {
        let nodes = self
            .stops
            .values()
            .map(|stop| (stop.id, stop.latitude, stop.longitude))
            .collect::<Vec<_>>();

        let mut graph = TransitGraph::with_nodes(nodes);

        for route in self.routes.values() {
            self.validate_route_stops(&route.name, &route.stops)?;
            for pair in route.stops.windows(2) {
                graph.connect(pair[0], pair[1]);
            }
        }

        Ok(graph)
    }

    pub fn add_stop(&mut self, new_stop: NewStop, now: DateTime<Utc>) -> Result<Stop, BusNetError> {
        Stop::validate_coordinates(new_stop.latitude, new_stop.longitude)?;
        if new_stop.current_density < 0.0 || !new_stop.current_density.is_finite() {
            return Err(BusNetError::InvalidDensity(new_stop.current_density));
        }

        let id = self.stops.keys().next_back().map_or(1, |last| last + 1);
        let stop = Stop {
            id,
            name: new_stop.name,
            latitude: new_stop.latitude,
            longitude: new_stop.longitude,
            current_density: new_stop.current_density,
            last_updated: now,
        };

        self.stops.insert(id, stop.clone());
        Ok(stop)
    }

    pub fn add_route(&mut self, new_route: NewRoute) -> Result<Route, BusNetError> {
        self.validate_route_stops(&new_route.name, &new_route.stops)?;

        let id = self.routes.keys().next_back().map_or(1, |last| last + 1);
        let mut route = Route {
            id,
            name: new_route.name,
            stops: new_route.stops,
            is_active: new_route.is_active,
            total_distance: 0.0,
            estimated_time: new_route.estimated_time.unwrap_or(0.0),
        };
        self.derive_route_metrics(&mut route);

        self.routes.insert(id, route.clone());
        Ok(route)
    }

    /// Demand-weighted stop order for a route, from current stop densities.
    /// The route itself is left as it is.
    pub fn optimize_route_order(&self, route_id: RouteId) -> Result<RouteOrdering, BusNetError> {
        let route = self.get_route(route_id)?;
        let current = route
            .stops
            .iter()
            .map(|id| self.get_stop(*id))
            .collect::<Result<Vec<_>, _>>()?;

        let optimized_stops = ordering::optimal_order(&current)?;
        let optimized = optimized_stops
            .iter()
            .map(|id| self.get_stop(*id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RouteOrdering {
            route_id,
            current_stops: route.stops.clone(),
            current_cost: ordering::demand_weighted_cost(&current),
            optimized_cost: ordering::demand_weighted_cost(&optimized),
            optimized_distance: ordering::path_distance_km(&optimized),
            optimized_stops,
            applied: false,
        })
    }

    /// Replaces the stop sequence of a route with a permutation of it.
    ///
    /// Distance is recomputed and the estimated time derived again from it.
    pub fn reorder_route(&mut self, route_id: RouteId, stops: &[StopId]) -> Result<Route, BusNetError> {
        let route = self.get_route(route_id)?;

        let mut expected = route.stops.clone();
        let mut proposed = stops.to_vec();
        expected.sort_unstable();
        proposed.sort_unstable();
        if expected != proposed {
            return Err(BusNetError::InvalidTopology(format!(
                "new order for route {} does not visit the same stops",
                route.name
            )));
        }

        let mut route = route.clone();
        route.stops = stops.to_vec();
        route.estimated_time = 0.0;
        self.derive_route_metrics(&mut route);

        self.routes.insert(route_id, route.clone());
        Ok(route)
    }

    fn validate_route_stops(&self, name: &str, stops: &[StopId]) -> Result<(), BusNetError> {
        if stops.len() < 2 {
            return Err(BusNetError::InvalidTopology(format!(
                "route {} has {} stop(s), at least 2 are required",
                name,
                stops.len()
            )));
        }

        let mut seen = BTreeSet::new();
        for stop_id in stops {
            if !self.stops.contains_key(stop_id) {
                return Err(BusNetError::InvalidTopology(format!(
                    "route {} references unknown stop {}",
                    name, stop_id
                )));
            }
            if !seen.insert(*stop_id) {
                return Err(BusNetError::InvalidTopology(format!(
                    "route {} visits stop {} more than once",
                    name, stop_id
                )));
            }
        }

        Ok(())
    }

    fn derive_route_metrics(&self, route: &mut Route) {
        route.total_distance = route
            .stops
            .windows(2)
            .filter_map(|pair| {
                let a = self.stops.get(&pair[0])?;
                let b = self.stops.get(&pair[1])?;
                Some(haversine_distance_km(
                    a.latitude,
                    a.longitude,
                    b.latitude,
                    b.longitude,
                ))
            })
            .sum();

        if !(route.estimated_time.is_finite() && route.estimated_time > 0.0) {
            route.estimated_time = route.total_distance / self.average_speed_kmh * 60.0;
        }
    }
}
