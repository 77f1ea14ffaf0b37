//! HTTP and WebSocket routing configuration.

use actix_web::web;

use crate::server::room::session::ws_connect;

/// Configure the application's routes. Every player talks over one WebSocket.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").to(ws_connect));
}
