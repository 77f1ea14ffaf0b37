//! WebSocket session of one player.
//!
//! Decodes client envelopes, binds the connection to a player id, and forwards
//! commands to the room actor. Commands are awaited one at a time so a player's
//! commands reach the room in the order they were sent. Room broadcasts arrive
//! as `ServerMessage`s and are written straight to the socket.

use std::borrow::Cow;

use actix::prelude::*;
use actix_web::http::StatusCode;
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use log::{debug, info, warn};
use uuid::Uuid;

use super::messages::{
    ConnId, Connection, CreateRoom, Disconnect, ForceStart, GetRoom, Join, SubmitMove, Surrender,
};
use super::room::RoomId;
use super::server::{RoomActor, RoomManager};
use crate::game::types::{NEUTRAL, PlayerId, TeamId};
use crate::server::anti_spam::AntiSpamState;
use crate::server::error::{ErrorCode, ProtocolError, RoomError};
use crate::server::protocol::{ClientCommand, Envelope, ServerMessage, decode};
use crate::server::ws_actor_utils::WsActorUtils;
use crate::server::ws_error::{http_error_response, ws_text};

pub struct PlayerConnection {
    id: ConnId,
    /// Identity supplied on the connection URL, if any.
    identity: Option<PlayerId>,
    username: String,
    /// Player this connection acts for, fixed by the first successful join.
    bound: Option<PlayerId>,
    room: Option<(RoomId, Addr<RoomActor>)>,
    manager: Addr<RoomManager>,
    anti_spam: AntiSpamState,
}

impl PlayerConnection {
    pub fn new(identity: Option<PlayerId>, username: String, manager: Addr<RoomManager>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            username,
            bound: None,
            room: None,
            manager,
            anti_spam: AntiSpamState::new(),
        }
    }

    fn connection(&self, ctx: &mut ws::WebsocketContext<Self>) -> Connection {
        Connection { id: self.id, addr: ctx.address().recipient() }
    }

    /// Player id for a join: the payload's, else the bound or URL identity.
    fn resolve_identity(&self, claimed: Option<PlayerId>) -> Result<PlayerId, ProtocolError> {
        let id = claimed.or(self.bound).or(self.identity).ok_or(ProtocolError::MissingIdentity)?;
        match self.bound {
            Some(bound) if bound != id => Err(ProtocolError::IdentityMismatch { bound, claimed: id }),
            _ => Ok(id),
        }
    }

    /// Check a gameplay command against the binding and return the target room.
    fn bound_room(&self, room_id: RoomId, claimed: PlayerId) -> Result<Addr<RoomActor>, RoomError> {
        let bound = self.bound.ok_or(ProtocolError::NotBound)?;
        if bound != claimed {
            return Err(ProtocolError::IdentityMismatch { bound, claimed }.into());
        }
        match &self.room {
            Some((id, addr)) if *id == room_id => Ok(addr.clone()),
            _ => Err(RoomError::NotInRoom(room_id)),
        }
    }

    fn on_text(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let label = self.label();
        if self.anti_spam.record_request(&label) {
            self.send_ban_and_close(ctx);
            return;
        }
        let envelope = match decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("[Gateway] {} sent an invalid message: {}", label, e);
                self.send_error_and_maybe_ban(ctx, &e.into());
                return;
            }
        };
        debug!("[Gateway] {} -> {}", label, envelope.kind());
        if let Err(e) = self.dispatch(envelope, ctx) {
            warn!("[Gateway] {} command refused: {}", label, e);
            self.send_error_and_maybe_ban(ctx, &e);
        }
    }

    fn dispatch(&mut self, envelope: Envelope, ctx: &mut ws::WebsocketContext<Self>) -> Result<(), RoomError> {
        let target = envelope.room_id();
        match envelope.command {
            ClientCommand::CreateGame(p) => {
                let player_id = self.resolve_identity(p.player_id)?;
                let username = p.player_name.unwrap_or_else(|| self.username.clone());
                let create = CreateRoom { mode: p.mode, map_id: p.map_id };
                self.create_and_join(create, player_id, username, ctx);
            }
            ClientCommand::Join(p) => {
                let room_id = target?;
                let player_id = self.resolve_identity(Some(p.player_id))?;
                let username = if p.player_name.is_empty() { self.username.clone() } else { p.player_name };
                self.join(room_id, player_id, username, p.team_id, ctx);
            }
            ClientCommand::Move(cmd) => {
                let room = self.bound_room(target?, cmd.player_id)?;
                self.forward(room, SubmitMove { cmd, conn_id: self.id }, ctx);
            }
            ClientCommand::ForceStart(p) => {
                let room = self.bound_room(target?, p.player_id)?;
                self.forward(room, ForceStart { player_id: p.player_id, conn_id: self.id, vote: p.status }, ctx);
            }
            ClientCommand::Surrender(p) => {
                let room = self.bound_room(target?, p.player_id)?;
                self.forward(room, Surrender { player_id: p.player_id, conn_id: self.id }, ctx);
            }
        }
        Ok(())
    }

    fn create_and_join(
        &mut self,
        create: CreateRoom,
        player_id: PlayerId,
        username: String,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        let manager = self.manager.clone();
        let conn = self.connection(ctx);
        async move {
            let (room_id, room) = manager.send(create).await??;
            room.send(Join { player_id, username, team_id: None, conn }).await??;
            Ok::<_, RoomError>((room_id, room))
        }
        .into_actor(self)
        .map(move |res, act, ctx| act.on_joined(res, player_id, ctx))
        .wait(ctx);
    }

    fn join(
        &mut self,
        room_id: RoomId,
        player_id: PlayerId,
        username: String,
        team_id: Option<TeamId>,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        let manager = self.manager.clone();
        let conn = self.connection(ctx);
        async move {
            let room = manager.send(GetRoom { room_id }).await??;
            room.send(Join { player_id, username, team_id, conn }).await??;
            Ok::<_, RoomError>((room_id, room))
        }
        .into_actor(self)
        .map(move |res, act, ctx| act.on_joined(res, player_id, ctx))
        .wait(ctx);
    }

    fn on_joined(
        &mut self,
        res: Result<(RoomId, Addr<RoomActor>), RoomError>,
        player_id: PlayerId,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        match res {
            Ok((room_id, room)) => {
                if let Some((old_id, old)) = self.room.take() {
                    if old_id != room_id {
                        old.do_send(Disconnect { player_id, conn_id: self.id });
                    }
                }
                self.room = Some((room_id, room));
                self.bound = Some(player_id);
                self.anti_spam.reset_on_valid_action();
                info!("[Gateway] conn={} bound to player={} in room_id={}", self.id, player_id, room_id);
            }
            Err(e) => self.send_error_and_maybe_ban(ctx, &e),
        }
    }

    /// Send a command to the room and report its rejection, in order.
    fn forward<M>(&mut self, room: Addr<RoomActor>, msg: M, ctx: &mut ws::WebsocketContext<Self>)
    where
        M: Message<Result = Result<(), RoomError>> + Send + 'static,
        RoomActor: Handler<M>,
    {
        room.send(msg)
            .into_actor(self)
            .map(|res, act, ctx| match res.map_err(RoomError::from).and_then(|r| r) {
                Ok(()) => act.anti_spam.reset_on_valid_action(),
                Err(e) => act.send_error_and_maybe_ban(ctx, &e),
            })
            .wait(ctx);
    }
}

impl WsActorUtils for PlayerConnection {
    fn anti_spam(&mut self) -> &mut AntiSpamState {
        &mut self.anti_spam
    }

    fn label(&self) -> String {
        match self.bound.or(self.identity) {
            Some(player) => format!("player={} conn={}", player, self.id),
            None => format!("conn={}", self.id),
        }
    }
}

impl Actor for PlayerConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        debug!("[Gateway] {} connected", self.label());
        ctx.text(ws_text(&ServerMessage::connection("connected", None)));
    }

    /// Leaves the room as offline; the map is not touched.
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let (Some(player_id), Some((_, room))) = (self.bound, &self.room) {
            room.do_send(Disconnect { player_id, conn_id: self.id });
        }
        debug!("[Gateway] {} disconnected", self.label());
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PlayerConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => self.on_text(&text, ctx),
            Ok(ws::Message::Binary(_)) => {
                let err = ProtocolError::Malformed("binary frames are not supported".into());
                self.send_error_and_maybe_ban(ctx, &err.into());
            }
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => (),
            Err(e) => {
                warn!("[Gateway] {} protocol error: {}", self.label(), e);
                ctx.stop();
            }
        }
    }
}

impl Handler<ServerMessage> for PlayerConnection {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, ctx: &mut Self::Context) {
        ctx.text(ws_text(&msg));
    }
}

/// WebSocket endpoint.
///
/// Optional query parameters: `playerId` (positive integer) and `playerName`
/// (url-encoded). Both can also be given later in `createGame`/`join`.
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<crate::server::state::AppState>,
) -> Result<HttpResponse, Error> {
    let mut identity: Option<PlayerId> = None;
    let mut username = String::new();

    for kv in req.query_string().split('&') {
        let mut split = kv.splitn(2, '=');
        match (split.next(), split.next()) {
            (Some("playerId"), Some(raw)) => match raw.parse::<PlayerId>() {
                Ok(id) if id != NEUTRAL => identity = Some(id),
                _ => {
                    return Ok(http_error_response(
                        ErrorCode::ProtocolError,
                        "playerId must be a positive integer",
                        StatusCode::BAD_REQUEST,
                    ));
                }
            },
            (Some("playerName"), Some(name)) => {
                username = urlencoding::decode(name).unwrap_or_else(|_| Cow::Borrowed("")).into_owned();
            }
            _ => {}
        }
    }
    if username.is_empty() {
        if let Some(id) = identity {
            username = format!("Player {id}");
        }
    }

    ws::start(PlayerConnection::new(identity, username, data.manager.clone()), &req, stream)
}
