//! Centralized helpers for WebSocket and HTTP error responses.
//!
//! Every error leaves the server in the same `error {error, code}` shape.

use actix_web::{HttpResponse, http::StatusCode};
use log::error;

use crate::server::error::{ErrorCode, RoomError};
use crate::server::protocol::ServerMessage;

/// Serialize a server message, falling back to a fixed error frame.
pub fn ws_text(msg: &ServerMessage) -> String {
    serde_json::to_string(msg).unwrap_or_else(|e| {
        error!("[Gateway] Failed to serialize {}: {}", msg.kind(), e);
        r#"{"type":"error","payload":{"error":"internal server error","code":"STATE_ERROR"}}"#.to_string()
    })
}

/// Formats an error reply for a WebSocket client.
pub fn ws_error_message(err: &RoomError) -> String {
    ws_text(&ServerMessage::error(err))
}

/// Notice sent right before a banned connection is closed.
pub fn ws_banned_message(ban_remaining_secs: u64) -> String {
    let message = format!("banned for spamming, try again in {ban_remaining_secs}s");
    ws_text(&ServerMessage::connection("banned", Some(&message)))
}

/// Returns an HTTP error response with a JSON body.
pub fn http_error_response(code: ErrorCode, message: &str, status: StatusCode) -> HttpResponse {
    let body = serde_json::json!({ "error": message, "code": code });
    HttpResponse::build(status).content_type("application/json").body(body.to_string())
}
