#![warn(clippy::all, clippy::pedantic)]

use std::env;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing::info;

mod error;
mod routes;
mod state;

use error::AppError;
use logger::init_tracing;
use state::AppState;
use uptime_service::config::Config;
use uptime_service::events::BroadcastRegistry;
use uptime_service::orchestrator::Engine;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_config(env::var_os("UPTIME_CONFIG"))?;
    info!("{}", config);

    let registry = Arc::new(BroadcastRegistry::default());
    let engine = Engine::open(&config, registry.clone()).await?;
    engine.start().await;

    let state = AppState::new(engine.queries(), registry);
    let served = run_server(&config.server.bind, config.server.port, state).await;

    engine.stop().await;
    served
}

async fn run_server(bind: &str, port: u16, state: AppState) -> Result<(), AppError> {
    let state = web::Data::new(state);
    info!("Listening on {}:{}", bind, port);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes::routes))
        .bind((bind, port))?
        .run()
        .await?;

    Ok(())
}
