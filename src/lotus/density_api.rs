use crate::api_error::ApiError;
use actix_web::{HttpResponse, web};
use busnet::density::SimulationParameters;
use busnet::engine::EngineHandle;
use busnet::models::StopId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize, Deserialize, Debug)]
pub struct DensityUpdate {
    pub stop_id: StopId,
    pub new_density: f64,
}

#[actix_web::post("/update-density")]
pub async fn update_density(
    engine: web::Data<Arc<EngineHandle>>,
    body: web::Json<DensityUpdate>,
) -> Result<HttpResponse, ApiError> {
    let stop = engine.set_density(body.stop_id, body.new_density).await?;
    Ok(HttpResponse::Ok().json(stop))
}

#[actix_web::get("/simulation")]
pub async fn simulation_status(
    engine: web::Data<Arc<EngineHandle>>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(engine.simulation_status().await?))
}

#[actix_web::put("/simulation/parameters")]
pub async fn set_parameters(
    engine: web::Data<Arc<EngineHandle>>,
    body: web::Json<SimulationParameters>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(engine.set_parameters(body.into_inner()).await?))
}

#[actix_web::post("/simulation/start")]
pub async fn start_simulation(
    engine: web::Data<Arc<EngineHandle>>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(engine.start_simulation().await?))
}

#[actix_web::post("/simulation/stop")]
pub async fn stop_simulation(
    engine: web::Data<Arc<EngineHandle>>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(engine.stop_simulation().await?))
}

/// One tick at the server's local hour, outside the cadence.
#[actix_web::post("/simulation/tick")]
pub async fn manual_tick(engine: web::Data<Arc<EngineHandle>>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(engine.tick_now().await?))
}
