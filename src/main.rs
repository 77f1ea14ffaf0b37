//! Main entry point for the game server.
//!
//! Initializes logging and configuration, starts the room registry, and launches
//! the HTTP server with the player WebSocket endpoint.

use std::time::Duration;

use actix::Actor;
use actix_web::{App, HttpServer, web};
use clap::Parser;
use log::{info, warn};

use config::server::ServerConfig;
use game::grid::MapLibrary;
use server::room::messages::ShutdownAll;
use server::room::server::RoomManager;

pub mod config;
mod game;
mod server;


#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger from environment variable (default to info level).
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    let library = match &config.map_dir {
        Some(dir) => MapLibrary::load_dir(dir),
        None => MapLibrary::new(),
    };

    // Start the RoomManager actor (creates, resolves and sweeps rooms).
    let manager = RoomManager::new(library, config.turn_duration_ms, config.room_workers)
        .with_reconnect_timeout(Duration::from_secs(config.reconnect_timeout_secs))
        .start();

    // Shared application state for HTTP/WebSocket handlers.
    let state = web::Data::new(server::state::AppState::new(manager.clone()));

    info!("[Server] Listening on {}:{}", config.bind_addr, config.port);
    let result = HttpServer::new(move || {
        App::new()
            .wrap(
                actix_web::middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Headers", "*")),
            )
            .app_data(state.clone())
            .configure(crate::server::router::config)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await;

    // End running games so connected players get a final gameEnd.
    if let Err(e) = manager.send(ShutdownAll).await {
        warn!("[Server] Room shutdown failed: {}", e);
    }
    result
}
