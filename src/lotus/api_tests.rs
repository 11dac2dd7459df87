use crate::api_error::ErrorBody;
use crate::configure_api;
use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use busnet::density::TickSummary;
use busnet::duty::DutyTransitions;
use busnet::engine::{EngineConfig, EngineHandle, SimulationStatus};
use busnet::models::{Driver, DriverStatus, Route, Stop};
use busnet::network::ordering::RouteOrdering;
use busnet::network::seed::NetworkSeed;
use busnet::planner::PlannedRoute;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

fn pune_engine() -> Arc<EngineHandle> {
    let (model, drivers) = NetworkSeed::pune_default()
        .into_parts(Utc::now(), 20.0)
        .unwrap();
    Arc::new(EngineHandle::spawn(model, drivers, EngineConfig::default()).unwrap())
}

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(pune_engine()))
                .configure(configure_api),
        )
        .await
    };
}

#[actix_web::test]
async fn test_welcome() {
    let app = app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_listings() {
    let app = app!();

    let stops: Vec<Stop> =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/stops").to_request())
            .await;
    assert_eq!(stops.len(), 10);

    let routes: Vec<Route> =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/routes").to_request())
            .await;
    assert_eq!(routes.len(), 3);
    assert!(routes.iter().all(|r| r.is_active && r.total_distance > 0.0));

    let drivers: Vec<Driver> =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/drivers").to_request())
            .await;
    assert_eq!(drivers.len(), 5);
}

#[actix_web::test]
async fn test_plan_route() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/route")
        .set_json(json!({"from_stop": 4, "to_stop": 6}))
        .to_request();
    let planned: PlannedRoute = test::call_and_read_body_json(&app, req).await;

    let ids = planned.stops.iter().map(|s| s.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![4, 5, 6]);
    assert!(planned.total_distance > 0.0);
    assert!((planned.estimated_time - planned.total_distance / 20.0 * 60.0).abs() < 1e-9);
}

#[actix_web::test]
async fn test_plan_route_errors() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/route")
        .set_json(json!({"from_stop": 1, "to_stop": 9}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "NoRouteFound");

    let req = test::TestRequest::post()
        .uri("/route")
        .set_json(json!({"from_stop": 1, "to_stop": 404}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "NotFound");
}

#[actix_web::test]
async fn test_update_density() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/update-density")
        .set_json(json!({"stop_id": 3, "new_density": 42.5}))
        .to_request();
    let stop: Stop = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stop.id, 3);
    assert_eq!(stop.current_density, 42.5);

    let req = test::TestRequest::post()
        .uri("/update-density")
        .set_json(json!({"stop_id": 3, "new_density": -1.0}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "InvalidDensity");
}

#[actix_web::test]
async fn test_assign_drivers() {
    let app = app!();

    let req = test::TestRequest::post().uri("/assign-drivers").to_request();
    let drivers: Vec<Driver> = test::call_and_read_body_json(&app, req).await;

    let on_route = drivers
        .iter()
        .filter(|d| d.current_route_id.is_some())
        .collect::<Vec<_>>();
    assert_eq!(on_route.len(), 3);
    assert!(on_route.iter().all(|d| d.status == DriverStatus::Active));
    assert!(on_route.iter().all(|d| d.next_break.is_some()));

    let req = test::TestRequest::post().uri("/drivers/advance").to_request();
    let transitions: DutyTransitions = test::call_and_read_body_json(&app, req).await;
    assert!(transitions.started_break.is_empty());
}

#[actix_web::test]
async fn test_create_records() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/stops")
        .set_json(json!({"name": "Viman Nagar", "latitude": 18.5679, "longitude": 73.9143}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let stop: Stop = test::read_body_json(resp).await;
    assert_eq!(stop.id, 11);

    let req = test::TestRequest::post()
        .uri("/routes")
        .set_json(json!({"name": "Airport Link", "stops": [3, 11]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let route: Route = test::read_body_json(resp).await;
    assert_eq!(route.stops, vec![3, 11]);
    assert!(route.estimated_time > 0.0);

    let req = test::TestRequest::post()
        .uri("/route")
        .set_json(json!({"from_stop": 1, "to_stop": 11}))
        .to_request();
    let planned: PlannedRoute = test::call_and_read_body_json(&app, req).await;
    let ids = planned.stops.iter().map(|s| s.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 2, 3, 11]);

    let req = test::TestRequest::post()
        .uri("/routes")
        .set_json(json!({"name": "Loop", "stops": [5, 5]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/stops")
        .set_json(json!({"name": "Nowhere", "latitude": 123.0, "longitude": 0.0}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/drivers")
        .set_json(json!({"name": "Kavita Rao"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let driver: Driver = test::read_body_json(resp).await;
    assert_eq!(driver.status, DriverStatus::OffDuty);
}

#[actix_web::test]
async fn test_simulation_control() {
    let app = app!();

    let status: SimulationStatus = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/simulation").to_request(),
    )
    .await;
    assert!(!status.running);

    let req = test::TestRequest::put()
        .uri("/simulation/parameters")
        .set_json(json!({"base_density": 60.0, "time_multiplier": 1.5}))
        .to_request();
    let status: SimulationStatus = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status.parameters.base_density, 60.0);

    let req = test::TestRequest::put()
        .uri("/simulation/parameters")
        .set_json(json!({"base_density": 60.0, "time_multiplier": 0.05}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post().uri("/simulation/tick").to_request();
    let summary: TickSummary = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary.stops_updated, 10);
    assert!(summary.mean_density <= 60.0 * 1.5 * 1.2);

    let req = test::TestRequest::post().uri("/simulation/start").to_request();
    let status: SimulationStatus = test::call_and_read_body_json(&app, req).await;
    assert!(status.running);

    let req = test::TestRequest::post().uri("/simulation/stop").to_request();
    let status: SimulationStatus = test::call_and_read_body_json(&app, req).await;
    assert!(!status.running);
}

#[actix_web::test]
async fn test_optimize_route() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/routes/1/optimize")
        .to_request();
    let ordering: RouteOrdering = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ordering.current_stops, vec![1, 2, 3]);
    assert_eq!(ordering.optimized_stops, vec![1, 2, 3]);
    assert!(!ordering.applied);

    let req = test::TestRequest::post()
        .uri("/routes")
        .set_json(json!({"name": "Wakad Express", "stops": [1, 9, 8, 10]}))
        .to_request();
    let route: Route = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/routes/{}/optimize?apply=true", route.id))
        .to_request();
    let ordering: RouteOrdering = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ordering.optimized_stops, vec![1, 8, 9, 10]);
    assert!(ordering.applied);

    let routes: Vec<Route> =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/routes").to_request())
            .await;
    let reordered = routes.iter().find(|r| r.id == route.id).unwrap();
    assert_eq!(reordered.stops, vec![1, 8, 9, 10]);

    let req = test::TestRequest::post()
        .uri("/routes/77/optimize")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "NotFound");
}
