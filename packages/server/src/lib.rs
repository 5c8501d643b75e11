#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the parking and vehicle dashboard.
//!
//! Serves read-only JSON endpoints backed by parameterized `MySQL` queries:
//! parking bay markers (latest snapshot or filtered history), filter
//! metadata, street/zone existence checks, and the quarterly vehicle
//! registration index. Browser access is limited to an allow-list of origin
//! prefixes.

pub mod config;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use curbside_database::db::DatabaseGateway;
use curbside_database::queries;

use crate::config::ServerConfig;

/// Shared application state.
pub struct AppState {
    /// Bounded database gateway.
    pub gateway: Arc<DatabaseGateway>,
}

/// Long-lived resources created at start-up and released at shutdown.
pub struct AppResources {
    /// Bounded database gateway.
    pub gateway: Arc<DatabaseGateway>,
    /// Origin prefixes allowed for cross-origin requests.
    pub allowed_origins: Arc<[String]>,
}

impl AppResources {
    /// Prepares the resources described by `config`. The database
    /// connection is opened by the first query, so an unreachable database
    /// surfaces as `DB_ERROR` responses instead of a failed start.
    #[must_use]
    pub fn init(config: &ServerConfig) -> Self {
        Self::from_parts(
            DatabaseGateway::connecting_to(config.database.clone()),
            config.allowed_origins.clone(),
        )
    }

    /// Builds resources around an existing gateway.
    #[must_use]
    pub fn from_parts(gateway: DatabaseGateway, allowed_origins: Vec<String>) -> Self {
        Self {
            gateway: Arc::new(gateway),
            allowed_origins: allowed_origins.into(),
        }
    }

    /// Application state handed to the handlers.
    #[must_use]
    pub fn state(&self) -> web::Data<AppState> {
        web::Data::new(AppState {
            gateway: Arc::clone(&self.gateway),
        })
    }

    /// Closes the gateway. The connection pool is released once the last
    /// handle is dropped.
    pub fn shutdown(self) {
        self.gateway.close();
        log::info!("Resources released");
    }
}

/// Whether `origin` starts with one of the allowed prefixes.
#[must_use]
pub fn is_origin_allowed(allowed: &[String], origin: &str) -> bool {
    allowed.iter().any(|prefix| origin.starts_with(prefix.as_str()))
}

/// CORS policy: GET only, from allow-listed origin prefixes. Requests
/// without an `Origin` header are not subject to CORS and always pass.
#[must_use]
pub fn cors(allowed_origins: Arc<[String]>) -> Cors {
    Cors::default()
        .allowed_origin_fn(move |origin, _req_head| {
            origin
                .to_str()
                .is_ok_and(|origin| is_origin_allowed(&allowed_origins, origin))
        })
        .allowed_methods(vec!["GET"])
        .allow_any_header()
        .max_age(3600)
}

/// Registers the API routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/api")
                .route("/vehicle/quarterly", web::get().to(handlers::quarterly))
                .route("/parking/markers", web::get().to(handlers::markers))
                .route("/parking/meta", web::get().to(handlers::meta))
                .route("/parking/exists", web::get().to(handlers::exists)),
        );
}

/// Starts the dashboard API server.
///
/// Checks the database once, serves until the server is stopped (e.g. by
/// `SIGINT`), then closes the database gateway. An unreachable database is
/// logged and does not prevent the server from starting. The caller
/// provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let resources = AppResources::init(&config);

    log::info!("Connecting to database...");
    match queries::ping(&resources.gateway).await {
        Ok(_) => log::info!("Database is reachable"),
        Err(e) => log::warn!("Database is not reachable yet: {e}"),
    }

    let state = resources.state();
    let allowed_origins = Arc::clone(&resources.allowed_origins);

    log::info!(
        "Starting server on {}:{} (pool size {})",
        config.bind_addr,
        config.port,
        resources.gateway.pool_size()
    );

    let result = HttpServer::new(move || {
        App::new()
            .wrap(cors(Arc::clone(&allowed_origins)))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await;

    log::info!("Server stopped, shutting down");
    resources.shutdown();

    result
}
