use crate::api_error::ApiError;
use actix_web::{HttpResponse, web};
use busnet::engine::EngineHandle;
use busnet::models::NewDriver;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

#[actix_web::get("/drivers")]
pub async fn list_drivers(
    engine: web::Data<Arc<EngineHandle>>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(engine.list_drivers().await?))
}

#[actix_web::post("/drivers")]
pub async fn create_driver(
    engine: web::Data<Arc<EngineHandle>>,
    body: web::Json<NewDriver>,
) -> Result<HttpResponse, ApiError> {
    let driver = engine.add_driver(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(driver))
}

#[actix_web::post("/drivers/advance")]
pub async fn advance_duty(
    engine: web::Data<Arc<EngineHandle>>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(engine.advance_duty(Utc::now()).await?))
}

#[actix_web::post("/assign-drivers")]
pub async fn assign_drivers(
    engine: web::Data<Arc<EngineHandle>>,
) -> Result<HttpResponse, ApiError> {
    let drivers = engine.assign_drivers(Utc::now()).await?;
    info!(
        "assignment pass requested, {} drivers on a route",
        drivers.iter().filter(|d| d.current_route_id.is_some()).count()
    );
    Ok(HttpResponse::Ok().json(drivers))
}
