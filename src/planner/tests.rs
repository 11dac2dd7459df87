use super::*;
use crate::haversine_distance_km;
use crate::models::Route;
use crate::network::NetworkModel;
use crate::network::seed::NetworkSeed;
use chrono::Utc;

fn stop(id: u32, lat: f64, lon: f64, density: f64) -> Stop {
    Stop {
        id,
        name: format!("Stop {}", id),
        latitude: lat,
        longitude: lon,
        current_density: density,
        last_updated: Utc::now(),
    }
}

fn route(id: u32, stops: Vec<u32>) -> Route {
    Route {
        id,
        name: format!("Route {}", id),
        stops,
        is_active: true,
        total_distance: 0.0,
        estimated_time: 0.0,
    }
}

fn snapshot(stops: Vec<Stop>, routes: Vec<Route>) -> PlanningSnapshot {
    let model = NetworkModel::new(stops, routes, 20.0).unwrap();
    PlanningSnapshot::from_model(&model).unwrap()
}

fn path_ids(planned: &PlannedRoute) -> Vec<u32> {
    planned.stops.iter().map(|s| s.id).collect()
}

fn haversine_along(stops: &[Stop]) -> f64 {
    stops
        .windows(2)
        .map(|p| haversine_distance_km(p[0].latitude, p[0].longitude, p[1].latitude, p[1].longitude))
        .sum()
}

/// Five stops spaced around a loop and served by one route in order.
fn loop_snapshot() -> PlanningSnapshot {
    snapshot(
        vec![
            stop(1, 18.50, 73.80, 0.0),
            stop(2, 18.50, 73.82, 0.0),
            stop(3, 18.52, 73.84, 0.0),
            stop(4, 18.54, 73.82, 0.0),
            stop(5, 18.54, 73.80, 0.0),
        ],
        vec![route(1, vec![1, 2, 3, 4, 5])],
    )
}

#[test]
fn test_loop_route_follows_sequence() {
    let snapshot = loop_snapshot();
    let planner = RoutePlanner::new(&snapshot, PlannerConfig::default());

    let planned = planner.find_route(1, 4).unwrap();

    assert_eq!(path_ids(&planned), vec![1, 2, 3, 4]);
    let expected = snapshot.graph.edge_distance(1, 2).unwrap()
        + snapshot.graph.edge_distance(2, 3).unwrap()
        + snapshot.graph.edge_distance(3, 4).unwrap();
    assert!((planned.total_distance - expected).abs() < 1e-9);
    assert!((planned.estimated_time - expected / 20.0 * 60.0).abs() < 1e-9);
}

#[test]
fn test_every_reachable_pair_reports_haversine_sum() {
    let (model, _) = NetworkSeed::pune_default()
        .into_parts(Utc::now(), 20.0)
        .unwrap();
    let snapshot = PlanningSnapshot::from_model(&model).unwrap();
    let planner = RoutePlanner::new(&snapshot, PlannerConfig::default());

    for route in model.routes() {
        for &from in &route.stops {
            for &to in &route.stops {
                let planned = planner.find_route(from, to).unwrap();
                assert_eq!(planned.stops.first().unwrap().id, from);
                assert_eq!(planned.stops.last().unwrap().id, to);
                assert!((planned.total_distance - haversine_along(&planned.stops)).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn test_find_route_is_idempotent() {
    let snapshot = loop_snapshot();
    let planner = RoutePlanner::new(&snapshot, PlannerConfig::default());

    let first = planner.find_route(5, 1).unwrap();
    let second = planner.find_route(5, 1).unwrap();

    assert_eq!(first, second);
    assert_eq!(path_ids(&first), vec![5, 4, 3, 2, 1]);
}

#[test]
fn test_same_stop_is_a_trivial_route() {
    let snapshot = loop_snapshot();
    let planner = RoutePlanner::new(&snapshot, PlannerConfig::default());

    let planned = planner.find_route(3, 3).unwrap();
    assert_eq!(path_ids(&planned), vec![3]);
    assert_eq!(planned.total_distance, 0.0);
    assert_eq!(planned.estimated_time, 0.0);
}

#[test]
fn test_disconnected_stops_have_no_route() {
    let snapshot = snapshot(
        vec![
            stop(1, 0.0, 0.0, 0.0),
            stop(2, 0.0, 0.01, 0.0),
            stop(3, 1.0, 0.0, 0.0),
            stop(4, 1.0, 0.01, 0.0),
        ],
        vec![route(1, vec![1, 2]), route(2, vec![3, 4])],
    );
    let planner = RoutePlanner::new(&snapshot, PlannerConfig::default());

    assert_eq!(
        planner.find_route(1, 4),
        Err(BusNetError::NoRouteFound { from: 1, to: 4 })
    );
}

#[test]
fn test_unknown_stop_is_not_found() {
    let snapshot = loop_snapshot();
    let planner = RoutePlanner::new(&snapshot, PlannerConfig::default());

    assert!(matches!(
        planner.find_route(1, 99),
        Err(BusNetError::NotFound { kind: "stop", id: 99 })
    ));
    assert!(matches!(
        planner.find_route(99, 1),
        Err(BusNetError::NotFound { kind: "stop", id: 99 })
    ));
}

#[test]
fn test_equal_cost_paths_prefer_lower_stop_ids() {
    // stops 2 and 3 share a location so both branches cost exactly the same
    let snapshot = snapshot(
        vec![
            stop(1, 0.0, 0.0, 0.0),
            stop(2, 0.01, 0.01, 0.0),
            stop(3, 0.01, 0.01, 0.0),
            stop(4, 0.0, 0.02, 0.0),
        ],
        vec![route(1, vec![1, 3, 4]), route(2, vec![1, 2, 4])],
    );
    let planner = RoutePlanner::new(&snapshot, PlannerConfig::default());

    assert_eq!(path_ids(&planner.find_route(1, 4).unwrap()), vec![1, 2, 4]);
    assert_eq!(path_ids(&planner.find_route(4, 1).unwrap()), vec![4, 2, 1]);
}

#[test]
fn test_congestion_changes_choice_but_not_distance() {
    let stops = vec![
        stop(1, 0.0, 0.0, 0.0),
        stop(2, 0.01, 0.01, 100.0),
        stop(3, -0.012, 0.01, 0.0),
        stop(4, 0.0, 0.02, 0.0),
    ];
    let snapshot = snapshot(
        stops,
        vec![route(1, vec![1, 2, 4]), route(2, vec![1, 3, 4])],
    );

    let plain = RoutePlanner::new(&snapshot, PlannerConfig::default())
        .find_route(1, 4)
        .unwrap();
    assert_eq!(path_ids(&plain), vec![1, 2, 4]);

    let congested = RoutePlanner::new(
        &snapshot,
        PlannerConfig {
            congestion_k: 5.0,
            average_speed_kmh: 20.0,
        },
    )
    .find_route(1, 4)
    .unwrap();

    assert_eq!(path_ids(&congested), vec![1, 3, 4]);
    assert!((congested.total_distance - haversine_along(&congested.stops)).abs() < 1e-9);
    assert!(congested.total_distance > plain.total_distance);
}

#[test]
fn test_planner_config_validation() {
    assert!(PlannerConfig::default().validate().is_ok());
    assert!(
        PlannerConfig {
            congestion_k: -1.0,
            average_speed_kmh: 20.0
        }
        .validate()
        .is_err()
    );
    assert!(
        PlannerConfig {
            congestion_k: 0.0,
            average_speed_kmh: 0.0
        }
        .validate()
        .is_err()
    );
}
