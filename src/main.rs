use std::{net::SocketAddr, sync::Arc};

use crate::{config::*, state::AppState};

mod address;
mod backend;
mod config;
mod error;
mod json_api;
mod receipt;
mod records;
mod state;
mod translator;
mod tx;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::init().expect("Failed to load config");
    tracing::info!("{config:#?}");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    let ctx = Arc::new(AppState::init(config).expect("Failed to initialize app state"));

    tracing::info!("Starting server on {addr}");

    let routes = json_api::routes(ctx);
    let server_handle = axum::Server::bind(&addr).serve(routes.into_make_service());

    if let Err(err) = server_handle.await {
        tracing::error!("JSON-RPC server critical error: {err:?}");
    }
}
