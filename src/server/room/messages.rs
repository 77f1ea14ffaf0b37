use std::time::Instant;

use actix::prelude::*;
use uuid::Uuid;

use super::room::{RoomId, RoomStatus};
use super::server::RoomActor;
use crate::game::systems::MoveCommand;
use crate::game::types::{PlayerId, TeamId};
use crate::server::error::RoomError;
use crate::server::protocol::ServerMessage;

pub type ConnId = Uuid;

/// A live client connection as seen by a room.
#[derive(Clone)]
pub struct Connection {
    pub id: ConnId,
    pub addr: Recipient<ServerMessage>,
}

// Connection -> room

#[derive(Message)]
#[rtype(result = "Result<(), RoomError>")]
pub struct Join {
    pub player_id: PlayerId,
    pub username: String,
    pub team_id: Option<TeamId>,
    pub conn: Connection,
}

#[derive(Message)]
#[rtype(result = "Result<(), RoomError>")]
pub struct ForceStart {
    pub player_id: PlayerId,
    pub conn_id: ConnId,
    pub vote: bool,
}

#[derive(Message)]
#[rtype(result = "Result<(), RoomError>")]
pub struct SubmitMove {
    pub cmd: MoveCommand,
    pub conn_id: ConnId,
}

#[derive(Message)]
#[rtype(result = "Result<(), RoomError>")]
pub struct Surrender {
    pub player_id: PlayerId,
    pub conn_id: ConnId,
}

/// Ignored unless `conn_id` is the player's current connection.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub player_id: PlayerId,
    pub conn_id: ConnId,
}

/// Advance one round now. The only clock of event-driven rooms.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Tick;

/// End the game without a winner. The room stays readable.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Shutdown;

/// End the game if needed and stop the room actor.
#[derive(Message)]
#[rtype(result = "()")]
pub struct CloseRoom;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub status: RoomStatus,
    pub online: usize,
    pub turn: Option<u32>,
}

#[derive(Message)]
#[rtype(result = "RoomSummary")]
pub struct GetSummary;

// Room -> manager

#[derive(Message)]
#[rtype(result = "()")]
pub struct RoomActivity {
    pub room_id: RoomId,
    pub status: RoomStatus,
    pub online: usize,
}

// Manager API

#[derive(Message)]
#[rtype(result = "Result<(RoomId, Addr<RoomActor>), RoomError>")]
pub struct CreateRoom {
    pub mode: Option<String>,
    pub map_id: Option<String>,
}

#[derive(Message)]
#[rtype(result = "Result<Addr<RoomActor>, RoomError>")]
pub struct GetRoom {
    pub room_id: RoomId,
}

/// Sweep the registry as if the clock read `now`. Returns how many rooms were removed.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct RunJanitor {
    pub now: Instant,
}

#[derive(Message)]
#[rtype(result = "usize")]
pub struct CountRooms;

#[derive(Message)]
#[rtype(result = "()")]
pub struct ShutdownAll;
