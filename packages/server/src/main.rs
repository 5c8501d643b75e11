#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entry point for the dashboard API server.

use curbside_server::config::ServerConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {e}");
        std::io::Error::other(e)
    })?;

    curbside_server::run_server(config).await
}
