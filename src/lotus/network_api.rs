use crate::api_error::ApiError;
use actix_web::{HttpResponse, web};
use busnet::engine::EngineHandle;
use busnet::models::{NewRoute, NewStop, RouteId, StopId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Serialize, Deserialize, Debug)]
pub struct PlanRequest {
    pub from_stop: StopId,
    pub to_stop: StopId,
}

#[actix_web::get("/stops")]
pub async fn list_stops(engine: web::Data<Arc<EngineHandle>>) -> Result<HttpResponse, ApiError> {
    let stops = engine.list_stops().await?;
    Ok(HttpResponse::Ok().json(stops))
}

#[actix_web::post("/stops")]
pub async fn create_stop(
    engine: web::Data<Arc<EngineHandle>>,
    body: web::Json<NewStop>,
) -> Result<HttpResponse, ApiError> {
    let stop = engine.add_stop(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(stop))
}

#[actix_web::get("/routes")]
pub async fn list_routes(
    engine: web::Data<Arc<EngineHandle>>,
) -> Result<HttpResponse, ApiError> {
    let routes = engine.list_routes().await?;
    Ok(HttpResponse::Ok().json(routes))
}

#[actix_web::post("/routes")]
pub async fn create_route(
    engine: web::Data<Arc<EngineHandle>>,
    body: web::Json<NewRoute>,
) -> Result<HttpResponse, ApiError> {
    let route = engine.add_route(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(route))
}

#[derive(Deserialize, Debug)]
pub struct OptimizeQuery {
    #[serde(default)]
    pub apply: bool,
}

#[actix_web::post("/routes/{route_id}/optimize")]
pub async fn optimize_route(
    engine: web::Data<Arc<EngineHandle>>,
    path: web::Path<RouteId>,
    query: web::Query<OptimizeQuery>,
) -> Result<HttpResponse, ApiError> {
    let ordering = engine
        .optimize_route(path.into_inner(), query.apply)
        .await?;

    debug!(
        "route {} ordering cost {:.3} -> {:.3}, applied: {}",
        ordering.route_id, ordering.current_cost, ordering.optimized_cost, ordering.applied
    );

    Ok(HttpResponse::Ok().json(ordering))
}

#[actix_web::post("/route")]
pub async fn plan_route(
    engine: web::Data<Arc<EngineHandle>>,
    body: web::Json<PlanRequest>,
) -> Result<HttpResponse, ApiError> {
    let PlanRequest { from_stop, to_stop } = body.into_inner();
    let planned = engine.plan_route(from_stop, to_stop).await?;

    debug!(
        "planned {} -> {}: {} stops, {:.2} km",
        from_stop,
        to_stop,
        planned.stops.len(),
        planned.total_distance
    );

    Ok(HttpResponse::Ok().json(planned))
}
