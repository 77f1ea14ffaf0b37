//! Gateway codec: JSON envelopes from clients in, server messages out.
//!
//! Client envelope: `{"type": ..., "gameId": "<uuid>"?, "payload": {...}}`.
//! Server envelope: `{"type": ..., "payload": {...}}`.

use actix::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::game::entities::Block;
use crate::game::grid::BlockInfo;
use crate::game::mode::GameMode;
use crate::game::systems::MoveCommand;
use crate::game::types::{PlayerId, TeamId};
use crate::server::error::{ErrorCode, ProtocolError, RoomError};
use crate::server::room::room::{Player, RoomId, RoomStatus};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    game_id: Option<String>,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateGamePayload {
    pub player_id: Option<PlayerId>,
    pub player_name: Option<String>,
    pub mode: Option<String>,
    pub map_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub player_id: PlayerId,
    #[serde(default)]
    pub player_name: String,
    #[serde(default)]
    pub team_id: Option<TeamId>,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceStartPayload {
    pub player_id: PlayerId,
    #[serde(default = "yes")]
    pub status: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurrenderPayload {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    CreateGame(CreateGamePayload),
    Join(JoinPayload),
    Move(MoveCommand),
    ForceStart(ForceStartPayload),
    Surrender(SurrenderPayload),
}

/// A decoded client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub game_id: Option<RoomId>,
    pub command: ClientCommand,
}

impl Envelope {
    /// The target room, required by every command except `createGame`.
    pub fn room_id(&self) -> Result<RoomId, ProtocolError> {
        self.game_id.ok_or_else(|| ProtocolError::MissingGameId(self.kind().to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self.command {
            ClientCommand::CreateGame(_) => "createGame",
            ClientCommand::Join(_) => "join",
            ClientCommand::Move(_) => "move",
            ClientCommand::ForceStart(_) => "forceStart",
            ClientCommand::Surrender(_) => "surrender",
        }
    }
}

fn payload<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::BadPayload { kind: kind.to_string(), reason: e.to_string() })
}

/// Decode one text frame.
pub fn decode(text: &str) -> Result<Envelope, ProtocolError> {
    let raw: RawEnvelope = serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let game_id = match raw.game_id.as_deref() {
        None | Some("") => None,
        Some(id) => Some(Uuid::parse_str(id).map_err(|_| ProtocolError::BadGameId(id.to_string()))?),
    };
    let body = if raw.payload.is_null() { Value::Object(Default::default()) } else { raw.payload };
    let command = match raw.kind.as_str() {
        "createGame" => ClientCommand::CreateGame(payload(&raw.kind, body)?),
        "join" => ClientCommand::Join(payload(&raw.kind, body)?),
        "move" => ClientCommand::Move(payload(&raw.kind, body)?),
        "forceStart" => ClientCommand::ForceStart(payload(&raw.kind, body)?),
        "surrender" => ClientCommand::Surrender(payload(&raw.kind, body)?),
        _ => return Err(ProtocolError::UnknownType(raw.kind)),
    };
    Ok(Envelope { game_id, command })
}

/// Wire form of a (possibly fogged) map.
pub fn wire_map(view: &[Vec<Block>]) -> Vec<Vec<BlockInfo>> {
    view.iter().map(|row| row.iter().map(BlockInfo::from).collect()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub state: RoomStatus,
    pub players: Vec<Player>,
    pub game_mode: GameMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingInfo {
    pub room_id: RoomId,
    pub online: usize,
    pub ready: usize,
    pub min_players: usize,
    pub max_players: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartInfo {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub map_width: u16,
    pub map_height: u16,
    pub map: Vec<Vec<BlockInfo>>,
    pub turn_number: u32,
    pub current_player: Option<PlayerId>,
    pub turn_time_left: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnInfo {
    pub map: Vec<Vec<BlockInfo>>,
    pub turn_number: u32,
    pub current_player: Option<PlayerId>,
    pub turn_time_left: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    pub map: Vec<Vec<BlockInfo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEndInfo {
    pub winner: Option<TeamId>,
    pub winners: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub error: String,
    pub code: ErrorCode,
}

/// Server -> client messages. Also the actix message delivered to connections.
#[derive(Message, Debug, Clone, PartialEq, Serialize)]
#[rtype(result = "()")]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage {
    RoomInfo(RoomInfo),
    Waiting(WaitingInfo),
    GameStart(GameStartInfo),
    NewTurn(TurnInfo),
    GameStateUpdate(StateUpdate),
    GameEnd(GameEndInfo),
    Connection(ConnectionInfo),
    Error(ErrorInfo),
}

impl ServerMessage {
    pub fn error(err: &RoomError) -> Self {
        ServerMessage::Error(ErrorInfo { error: err.to_string(), code: err.code() })
    }

    pub fn connection(status: &str, message: Option<&str>) -> Self {
        ServerMessage::Connection(ConnectionInfo {
            status: status.to_string(),
            message: message.map(str::to_string),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::RoomInfo(_) => "roomInfo",
            ServerMessage::Waiting(_) => "waiting",
            ServerMessage::GameStart(_) => "gameStart",
            ServerMessage::NewTurn(_) => "newTurn",
            ServerMessage::GameStateUpdate(_) => "gameStateUpdate",
            ServerMessage::GameEnd(_) => "gameEnd",
            ServerMessage::Connection(_) => "connection",
            ServerMessage::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::{Direction, Position};
    use serde_json::json;

    #[test]
    fn decodes_a_move() {
        let text = json!({
            "type": "move",
            "gameId": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "payload": {"playerId": 1, "from": {"x": 1, "y": 1}, "direction": "down", "troops": 9}
        })
        .to_string();
        let envelope = decode(&text).unwrap();
        assert!(envelope.game_id.is_some());
        assert_eq!(
            envelope.command,
            ClientCommand::Move(MoveCommand {
                player_id: 1,
                from: Position::new(1, 1),
                direction: Direction::Down,
                troops: 9
            })
        );
    }

    #[test]
    fn create_game_accepts_missing_payload() {
        let envelope = decode(r#"{"type":"createGame"}"#).unwrap();
        assert_eq!(envelope.command, ClientCommand::CreateGame(CreateGamePayload::default()));
        assert_eq!(envelope.room_id(), Err(ProtocolError::MissingGameId("createGame".into())));
    }

    #[test]
    fn force_start_defaults_to_a_yes_vote() {
        let envelope = decode(r#"{"type":"forceStart","payload":{"playerId":4}}"#).unwrap();
        assert_eq!(envelope.command, ClientCommand::ForceStart(ForceStartPayload { player_id: 4, status: true }));
    }

    #[test]
    fn protocol_failures_are_distinguished() {
        assert!(matches!(decode("{not json"), Err(ProtocolError::Malformed(_))));
        assert_eq!(decode(r#"{"type":"teleport"}"#), Err(ProtocolError::UnknownType("teleport".into())));
        assert!(matches!(
            decode(r#"{"type":"move","payload":{"playerId":1,"direction":"sideways"}}"#),
            Err(ProtocolError::BadPayload { .. })
        ));
        assert_eq!(
            decode(r#"{"type":"join","gameId":"room-1","payload":{"playerId":1}}"#),
            Err(ProtocolError::BadGameId("room-1".into()))
        );
    }

    #[test]
    fn server_messages_use_type_and_payload() {
        let msg = ServerMessage::GameEnd(GameEndInfo { winner: Some(2), winners: vec!["bob".into()] });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "gameEnd", "payload": {"winner": 2, "winners": ["bob"]}}));

        let err = ServerMessage::error(&RoomError::Full);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value, json!({"type": "error", "payload": {"error": "room is full", "code": "CAPACITY_ERROR"}}));
        assert_eq!(err.kind(), "error");
    }

    #[test]
    fn fogged_tiles_hide_owner_and_troops() {
        let row = vec![Block::fogged(crate::game::entities::BlockKind::Castle), Block::soldier(2, 5)];
        let wire = serde_json::to_value(wire_map(&[row])).unwrap();
        assert_eq!(
            wire,
            json!([[{"type": "fog", "terrain": "castle"}, {"type": "soldier", "owner": 2, "troops": 5}]])
        );
    }
}
