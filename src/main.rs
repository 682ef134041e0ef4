use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod state;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::state::AppState;
use crate::store::{HrStore, MemoryStore, MySqlStore};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::presence_tracker::{PresenceTracker, spawn_sweeper};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "workhub-hr.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let max_level: tracing::Level = config
        .log_level
        .parse()
        .with_context(|| format!("LOG_LEVEL has an invalid value: {:?}", config.log_level))?;

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(max_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let store: Arc<dyn HrStore> = match &config.database_url {
        Some(url) => Arc::new(MySqlStore::new(init_db(url).await?)),
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let presence = PresenceTracker::new(config.presence_session_ttl());
    spawn_sweeper(presence.clone(), clock.clone(), config.presence_sweep_interval());

    let state = Data::new(AppState::new(store, presence, clock, config.utc_offset()?));
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("binding {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
