// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

mod api_error;
mod density_api;
mod duty_api;
mod network_api;

#[cfg(test)]
mod api_tests;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use busnet::config::BusNetConfig;
use busnet::engine::EngineHandle;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Bus network backend: route planning, crowd simulation and driver duty.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    address: Option<String>,
    #[arg(short, long)]
    port: Option<u16>,
    #[arg(long)]
    workers: Option<usize>,
    /// JSON file with stops, routes and drivers
    #[arg(long)]
    network_file: Option<PathBuf>,
    #[arg(long)]
    tick_seconds: Option<f64>,
    #[arg(long)]
    congestion_k: Option<f64>,
    /// Leave the density cadence stopped until POST /simulation/start
    #[arg(long)]
    no_simulation: bool,
}

impl Args {
    fn apply(self, config: &mut BusNetConfig) {
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(network_file) = self.network_file {
            config.network_file = Some(network_file);
        }
        if let Some(tick_seconds) = self.tick_seconds {
            config.tick_seconds = tick_seconds;
        }
        if let Some(congestion_k) = self.congestion_k {
            config.congestion_k = congestion_k;
        }
        if self.no_simulation {
            config.autostart_simulation = false;
        }
    }
}

async fn index() -> impl Responder {
    HttpResponse::Ok()
        .insert_header(("Content-Type", "text/plain"))
        .body("Welcome to the Lotus bus network API")
}

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .service(network_api::list_stops)
        .service(network_api::create_stop)
        .service(network_api::list_routes)
        .service(network_api::create_route)
        .service(network_api::optimize_route)
        .service(network_api::plan_route)
        .service(density_api::update_density)
        .service(density_api::simulation_status)
        .service(density_api::set_parameters)
        .service(density_api::start_simulation)
        .service(density_api::stop_simulation)
        .service(density_api::manual_tick)
        .service(duty_api::list_drivers)
        .service(duty_api::create_driver)
        .service(duty_api::advance_duty)
        .service(duty_api::assign_drivers);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = BusNetConfig::from_env()?;
    Args::parse().apply(&mut config);
    config.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level()?)
        .init();

    let (model, drivers) = config.load_network(Utc::now())?;
    info!(
        "loaded network: {} stops, {} routes, {} drivers",
        model.stops().count(),
        model.routes().count(),
        drivers.len()
    );

    let engine = Arc::new(EngineHandle::spawn(
        model,
        drivers,
        config.engine_config()?,
    )?);

    if config.autostart_simulation {
        engine.start_simulation().await?;
    }

    let bind = config.bind_address();
    info!("lotus listening on {}:{}", bind.0, bind.1);

    let server_engine = Arc::clone(&engine);
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(web::Data::new(Arc::clone(&server_engine)))
            .configure(configure_api)
    })
    .workers(config.workers)
    .bind(bind)?
    .run()
    .await?;

    engine.stop_simulation().await?;
    info!("lotus shut down");

    Ok(())
}
