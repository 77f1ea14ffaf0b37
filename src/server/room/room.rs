//! Room state machine: `waiting -> active -> ended`.
//!
//! A `Room` is plain data with no actor or timer inside. Every operation
//! returns the messages it produced as an [`Outbox`] addressed by player; the
//! owning actor routes them to connections. Only online players are addressed.

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use uuid::Uuid;

use crate::game::grid::{Map, MapGenerator};
use crate::game::mode::GameMode;
use crate::game::state::GameState;
use crate::game::systems::MoveCommand;
use crate::game::types::{NEUTRAL, PlayerId, TeamId};
use crate::server::error::{ProtocolError, RoomError};
use crate::server::protocol::{
    GameEndInfo, GameStartInfo, RoomInfo, ServerMessage, StateUpdate, TurnInfo, WaitingInfo, wire_map,
};
use crate::server::room::lobby::{Lobby, StartDecision};

pub type RoomId = Uuid;

/// Messages produced by one room operation, addressed by player.
pub type Outbox = Vec<(PlayerId, ServerMessage)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Online,
    Offline,
}

/// Roster entry. `is_ready` is derived: online and voted to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub team_id: TeamId,
    pub status: PlayerStatus,
    pub force_start: bool,
    pub is_ready: bool,
}

impl Player {
    pub fn new(id: PlayerId, username: String, team_id: TeamId) -> Self {
        Self { id, username, team_id, status: PlayerStatus::Online, force_start: false, is_ready: false }
    }

    pub fn set_force_start(&mut self, vote: bool) {
        self.force_start = vote;
        self.refresh_ready();
    }

    pub fn set_status(&mut self, status: PlayerStatus) {
        self.status = status;
        self.refresh_ready();
    }

    pub fn is_online(&self) -> bool {
        self.status == PlayerStatus::Online
    }

    fn refresh_ready(&mut self) {
        self.is_ready = self.is_online() && self.force_start;
    }
}

pub struct Room {
    id: RoomId,
    mode: GameMode,
    /// Map to play on; a fresh one is generated at start when `None`.
    template: Option<Map>,
    players: Vec<Player>,
    status: RoomStatus,
    game: Option<GameState>,
    rng: StdRng,
}

impl Room {
    pub fn new(id: RoomId, mode: GameMode, template: Option<Map>) -> Self {
        Self::with_rng(id, mode, template, StdRng::from_rng(&mut rand::rng()))
    }

    pub fn with_rng(id: RoomId, mode: GameMode, template: Option<Map>, rng: StdRng) -> Self {
        Self { id, mode, template, players: Vec::new(), status: RoomStatus::Waiting, game: None, rng }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn mode(&self) -> &GameMode {
        &self.mode
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    pub fn online_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_online()).count()
    }

    pub fn room_info(&self) -> ServerMessage {
        ServerMessage::RoomInfo(RoomInfo {
            room_id: self.id,
            state: self.status,
            players: self.players.clone(),
            game_mode: self.mode.clone(),
        })
    }

    /// Add a player, or bring a known one back online.
    pub fn join(
        &mut self,
        id: PlayerId,
        username: &str,
        team: Option<TeamId>,
        turn_time_left: u64,
    ) -> Result<Outbox, RoomError> {
        if id == NEUTRAL {
            return Err(ProtocolError::BadPayload { kind: "join".into(), reason: "playerId 0 is reserved".into() }.into());
        }
        if self.player(id).is_some() {
            return self.rejoin(id, team, turn_time_left);
        }
        match self.status {
            RoomStatus::Ended => return Err(RoomError::Ended),
            RoomStatus::Active => return Err(RoomError::AlreadyStarted),
            RoomStatus::Waiting => {}
        }
        if Lobby::new(&self.mode).is_full(&self.players) {
            return Err(RoomError::Full);
        }
        let team_id = team.unwrap_or_else(|| self.free_team());
        let username = match username.trim() {
            "" => format!("Player {id}"),
            name => name.to_string(),
        };
        info!("[Room] room_id={} player={} joined as '{}' (team {})", self.id, id, username, team_id);
        self.players.push(Player::new(id, username, team_id));

        let mut outbox = self.roster_update();
        outbox.extend(self.try_start().inspect_err(|_| {
            self.players.pop();
        })?);
        Ok(outbox)
    }

    /// Bring a known player back online. While waiting, a given team replaces
    /// the old one.
    fn rejoin(&mut self, id: PlayerId, team: Option<TeamId>, turn_time_left: u64) -> Result<Outbox, RoomError> {
        let waiting = self.status == RoomStatus::Waiting;
        let Some(p) = self.players.iter_mut().find(|p| p.id == id) else {
            return Err(RoomError::UnknownPlayer(id));
        };
        let previous = (p.status, p.team_id);
        p.set_status(PlayerStatus::Online);
        if let (true, Some(team)) = (waiting, team) {
            p.team_id = team;
        }
        info!("[Room] room_id={} player={} reconnected ({:?})", self.id, id, self.status);
        match self.status {
            RoomStatus::Waiting => {
                let mut outbox = self.roster_update();
                outbox.extend(self.try_start().inspect_err(|_| {
                    if let Some(p) = self.players.iter_mut().find(|p| p.id == id) {
                        p.set_status(previous.0);
                        p.team_id = previous.1;
                    }
                })?);
                Ok(outbox)
            }
            RoomStatus::Active => {
                let mut outbox = self.roster_update();
                outbox.extend(self.game_start_for(id, turn_time_left).map(|m| (id, m)));
                Ok(outbox)
            }
            RoomStatus::Ended => {
                // Late read of the final snapshot.
                let mut outbox = vec![(id, self.room_info())];
                outbox.extend(self.game_start_for(id, 0).map(|m| (id, m)));
                outbox.push((id, self.game_end()));
                Ok(outbox)
            }
        }
    }

    /// Cast or withdraw a start vote.
    pub fn force_start(&mut self, id: PlayerId, vote: bool) -> Result<Outbox, RoomError> {
        match self.status {
            RoomStatus::Ended => return Err(RoomError::Ended),
            RoomStatus::Active => return Err(RoomError::NotWaiting),
            RoomStatus::Waiting => {}
        }
        let player = self.players.iter_mut().find(|p| p.id == id).ok_or(RoomError::UnknownPlayer(id))?;
        let previous = player.force_start;
        player.set_force_start(vote);
        debug!("[Room] room_id={} player={} forceStart={}", self.id, id, vote);

        let mut outbox = self.roster_update();
        outbox.extend(self.try_start().inspect_err(|_| {
            if let Some(p) = self.players.iter_mut().find(|p| p.id == id) {
                p.set_force_start(previous);
            }
        })?);
        Ok(outbox)
    }

    pub fn submit_move(&mut self, cmd: &MoveCommand) -> Result<Outbox, RoomError> {
        self.active_game()?;
        if self.player(cmd.player_id).is_none() {
            return Err(RoomError::UnknownPlayer(cmd.player_id));
        }
        let outcome = self.active_game()?.apply_move(cmd)?;
        debug!(
            "[Room] room_id={} player={} moved {} from ({}, {}) to ({}, {})",
            self.id, cmd.player_id, outcome.moved, outcome.from.x, outcome.from.y, outcome.to.x, outcome.to.y
        );
        Ok(self.after_game_change())
    }

    /// Leave a waiting room, or concede an active game.
    pub fn surrender(&mut self, id: PlayerId) -> Result<Outbox, RoomError> {
        match self.status {
            RoomStatus::Ended => Err(RoomError::Ended),
            RoomStatus::Waiting => {
                let index = self.players.iter().position(|p| p.id == id).ok_or(RoomError::UnknownPlayer(id))?;
                let leaving = self.players.remove(index);
                info!("[Room] room_id={} player={} left the lobby", self.id, id);
                let mut outbox = self.roster_update();
                outbox.extend(self.try_start().inspect_err(|_| {
                    self.players.insert(index, leaving);
                })?);
                Ok(outbox)
            }
            RoomStatus::Active => {
                if self.player(id).is_none() {
                    return Err(RoomError::UnknownPlayer(id));
                }
                self.active_game()?.surrender(id)?;
                Ok(self.after_game_change())
            }
        }
    }

    /// Concede for a player whose reconnect window ran out. Does nothing if
    /// they came back, are already out, or the game is not running.
    pub fn forfeit(&mut self, id: PlayerId) -> Result<Outbox, RoomError> {
        let offline = self.player(id).is_some_and(|p| !p.is_online());
        let alive = self.game.as_ref().is_some_and(|g| g.is_alive(id));
        if !offline || !alive || self.status != RoomStatus::Active {
            return Ok(Vec::new());
        }
        info!("[Room] room_id={} player={} did not reconnect in time, forfeiting", self.id, id);
        self.active_game()?.surrender(id)?;
        Ok(self.after_game_change())
    }

    /// Mark a player offline. Never touches the map.
    pub fn disconnect(&mut self, id: PlayerId) -> Outbox {
        let Some(player) = self.players.iter_mut().find(|p| p.id == id) else {
            return Vec::new();
        };
        player.set_status(PlayerStatus::Offline);
        info!("[Room] room_id={} player={} went offline", self.id, id);
        if self.status == RoomStatus::Ended {
            return Vec::new();
        }
        let mut outbox = self.roster_update();
        match self.try_start() {
            Ok(started) => outbox.extend(started),
            Err(e) => warn!("[Room] room_id={} could not start after disconnect: {}", self.id, e),
        }
        outbox
    }

    /// Advance one round and push the new fogged view to everybody.
    pub fn tick(&mut self, turn_time_left: u64) -> Outbox {
        if self.status != RoomStatus::Active {
            return Vec::new();
        }
        let online: Vec<PlayerId> = self.online_ids();
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        game.next_turn();
        let turn_number = game.turn();
        let current_player = game.current_player();
        debug!("[Room] room_id={} turn={}", self.id, turn_number);
        let views = game.views_for(&online);
        online
            .into_iter()
            .zip(views)
            .map(|(id, view)| {
                let map = wire_map(&view);
                (id, ServerMessage::NewTurn(TurnInfo { map, turn_number, current_player, turn_time_left }))
            })
            .collect()
    }

    /// End the room from outside, without a winner.
    pub fn shutdown(&mut self) -> Outbox {
        if self.status == RoomStatus::Ended {
            return Vec::new();
        }
        if let Some(game) = self.game.as_mut() {
            game.abort();
        }
        self.status = RoomStatus::Ended;
        info!("[Room] room_id={} shut down", self.id);
        let end = self.game_end();
        self.to_online(end)
    }

    fn active_game(&mut self) -> Result<&mut GameState, RoomError> {
        match self.status {
            RoomStatus::Waiting => Err(RoomError::NotActive),
            RoomStatus::Ended => Err(RoomError::Ended),
            RoomStatus::Active => self.game.as_mut().ok_or(RoomError::NotActive),
        }
    }

    /// Push the new state after a move or surrender, and close the game if decided.
    fn after_game_change(&mut self) -> Outbox {
        let over = self.game.as_ref().is_some_and(GameState::is_over);
        if over {
            self.status = RoomStatus::Ended;
            info!(
                "[Room] room_id={} game ended, winner team {:?}",
                self.id,
                self.game.as_ref().and_then(GameState::winner)
            );
        }
        let mut outbox = self.state_updates();
        if over {
            let end = self.game_end();
            outbox.extend(self.to_online(end));
        }
        outbox
    }

    fn try_start(&mut self) -> Result<Outbox, RoomError> {
        if self.status != RoomStatus::Waiting {
            return Ok(Vec::new());
        }
        let tally = match Lobby::new(&self.mode).decide(&self.players) {
            StartDecision::Wait(_) => return Ok(Vec::new()),
            StartDecision::Start(tally) => tally,
        };
        let roster: Vec<(PlayerId, TeamId)> =
            self.players.iter().filter(|p| p.is_online()).map(|p| (p.id, p.team_id)).collect();
        let map = match &self.template {
            Some(map) => map.clone(),
            None => MapGenerator::default()
                .generate(roster.len(), &mut self.rng)
                .map_err(|e| RoomError::Setup(e.to_string()))?,
        };
        let game = GameState::start(map, self.mode.rules.clone(), &roster, &mut self.rng)
            .map_err(|e| RoomError::Setup(e.to_string()))?;

        self.players.retain(|p| p.is_online());
        self.game = Some(game);
        self.status = RoomStatus::Active;
        info!("[Room] room_id={} game started with {} players ({} voted)", self.id, tally.online, tally.ready);

        let mut outbox = self.roster_update();
        let turn_time_left = self.mode.turn_interval_ms();
        for id in self.online_ids() {
            outbox.extend(self.game_start_for(id, turn_time_left).map(|m| (id, m)));
        }
        Ok(outbox)
    }

    fn game_start_for(&mut self, id: PlayerId, turn_time_left: u64) -> Option<ServerMessage> {
        let room_id = self.id;
        let game = self.game.as_mut()?;
        let size = game.map().size();
        let map = wire_map(&game.view_for(id));
        Some(ServerMessage::GameStart(GameStartInfo {
            room_id,
            player_id: id,
            map_width: size.width,
            map_height: size.height,
            map,
            turn_number: game.turn(),
            current_player: game.current_player(),
            turn_time_left,
        }))
    }

    fn state_updates(&mut self) -> Outbox {
        let online = self.online_ids();
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        let views = game.views_for(&online);
        online
            .into_iter()
            .zip(views)
            .map(|(id, view)| (id, ServerMessage::GameStateUpdate(StateUpdate { map: wire_map(&view) })))
            .collect()
    }

    fn game_end(&self) -> ServerMessage {
        let winner = self.game.as_ref().and_then(GameState::winner);
        let winners = self
            .players
            .iter()
            .filter(|p| winner == Some(p.team_id))
            .map(|p| p.username.clone())
            .collect();
        ServerMessage::GameEnd(GameEndInfo { winner, winners })
    }

    /// `roomInfo` to everybody, plus `waiting` while the roster assembles.
    fn roster_update(&self) -> Outbox {
        let mut outbox = self.to_online(self.room_info());
        if self.status == RoomStatus::Waiting {
            let tally = Lobby::new(&self.mode).tally(&self.players);
            let waiting = ServerMessage::Waiting(WaitingInfo {
                room_id: self.id,
                online: tally.online,
                ready: tally.ready,
                min_players: self.mode.min_players,
                max_players: self.mode.max_players,
            });
            outbox.extend(self.to_online(waiting));
        }
        outbox
    }

    fn to_online(&self, msg: ServerMessage) -> Outbox {
        self.online_ids().into_iter().map(|id| (id, msg.clone())).collect()
    }

    fn online_ids(&self) -> Vec<PlayerId> {
        self.players.iter().filter(|p| p.is_online()).map(|p| p.id).collect()
    }

    /// Smallest team number nobody uses yet.
    fn free_team(&self) -> TeamId {
        (1..=TeamId::MAX).find(|t| self.players.iter().all(|p| p.team_id != *t)).unwrap_or(TeamId::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Block;
    use crate::game::types::{Direction, MapInfo, MapSize, Position};
    use crate::server::error::ErrorCode;

    /// 3x3 map with two unowned kings in opposite corners.
    fn arena() -> Map {
        let mut map = Map::filled(MapSize::new(3, 3), MapInfo::default(), Block::blank());
        map.set_block(Position::new(1, 1), Block::king(NEUTRAL, 0)).unwrap();
        map.set_block(Position::new(3, 3), Block::king(NEUTRAL, 0)).unwrap();
        map
    }

    fn room(mode: GameMode) -> Room {
        Room::with_rng(Uuid::new_v4(), mode, Some(arena()), StdRng::seed_from_u64(42))
    }

    fn kinds(outbox: &Outbox, to: PlayerId) -> Vec<&'static str> {
        outbox.iter().filter(|(id, _)| *id == to).map(|(_, m)| m.kind()).collect()
    }

    fn king_of(room: &Room, id: PlayerId) -> Position {
        let map = room.game().unwrap().map();
        map.owned_by(id).into_iter().next().unwrap()
    }

    fn started_duel() -> Room {
        let mut room = room(GameMode::one_vs_one());
        room.join(1, "alice", None, 0).unwrap();
        room.join(2, "bob", None, 0).unwrap();
        room
    }

    #[test]
    fn waiting_room_announces_roster() {
        let mut room = room(GameMode::free_for_all());
        let outbox = room.join(1, "alice", None, 0).unwrap();
        assert_eq!(kinds(&outbox, 1), vec!["roomInfo", "waiting"]);
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert_eq!(room.player(1).unwrap().team_id, 1);
    }

    #[test]
    fn reaching_capacity_starts_the_game() {
        let mut room = room(GameMode::one_vs_one());
        room.join(1, "alice", None, 0).unwrap();
        let outbox = room.join(2, "bob", None, 0).unwrap();
        assert_eq!(room.status(), RoomStatus::Active);
        assert!(kinds(&outbox, 1).contains(&"gameStart"));
        assert!(kinds(&outbox, 2).contains(&"gameStart"));
        assert_eq!(room.player(2).unwrap().team_id, 2);
        assert_ne!(king_of(&room, 1), king_of(&room, 2));
    }

    #[test]
    fn force_start_needs_every_online_vote() {
        let mut room = room(GameMode::free_for_all());
        room.join(1, "alice", None, 0).unwrap();
        room.join(2, "bob", None, 0).unwrap();
        room.join(3, "carol", None, 0).unwrap();
        room.disconnect(3);
        room.force_start(1, true).unwrap();
        assert_eq!(room.status(), RoomStatus::Waiting);
        room.force_start(2, true).unwrap();
        assert_eq!(room.status(), RoomStatus::Active);
        // offline players are dropped from the roster at start
        assert!(room.player(3).is_none());
        assert_eq!(room.game().unwrap().participants().len(), 2);
    }

    #[test]
    fn joining_a_full_or_running_room_is_refused() {
        let mut room = started_duel();
        let err = room.join(3, "carol", None, 0).unwrap_err();
        assert_eq!(err, RoomError::AlreadyStarted);
        assert_eq!(err.code(), ErrorCode::CapacityError);

        let mut waiting = room_with_capacity(1);
        waiting.join(1, "alice", None, 0).unwrap();
        assert_eq!(waiting.join(2, "bob", None, 0), Err(RoomError::Full));
    }

    fn room_with_capacity(max: usize) -> Room {
        let mode = GameMode { max_players: max, min_players: 2, ..GameMode::free_for_all() };
        room(mode)
    }

    #[test]
    fn moves_are_refused_outside_active_state() {
        let mut room = room(GameMode::free_for_all());
        room.join(1, "alice", None, 0).unwrap();
        let cmd = MoveCommand { player_id: 1, from: Position::new(1, 1), direction: Direction::Right, troops: 1 };
        assert_eq!(room.submit_move(&cmd), Err(RoomError::NotActive));
    }

    #[test]
    fn invalid_move_is_reported_and_changes_nothing() {
        let mut room = started_duel();
        let before = room.game().unwrap().map().clone();
        let from = king_of(&room, 1);
        let cmd = MoveCommand { player_id: 1, from, direction: Direction::Up, troops: 5 };
        let err = room.submit_move(&cmd).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(room.game().unwrap().map(), &before);
    }

    #[test]
    fn ticks_push_new_turns() {
        let mut room = started_duel();
        let outbox = room.tick(500);
        assert_eq!(kinds(&outbox, 1), vec!["newTurn"]);
        assert_eq!(room.game().unwrap().turn(), 2);
        match &outbox[0].1 {
            ServerMessage::NewTurn(info) => {
                assert_eq!(info.turn_number, 2);
                assert_eq!(info.turn_time_left, 500);
                assert_eq!(info.current_player, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn surrender_ends_a_duel() {
        let mut room = started_duel();
        let outbox = room.surrender(2).unwrap();
        assert_eq!(room.status(), RoomStatus::Ended);
        assert!(kinds(&outbox, 1).contains(&"gameEnd"));
        let end = outbox.iter().find(|(_, m)| m.kind() == "gameEnd").unwrap();
        assert_eq!(end.1, ServerMessage::GameEnd(GameEndInfo { winner: Some(1), winners: vec!["alice".into()] }));
        assert_eq!(room.tick(500), Vec::new());
        assert_eq!(room.force_start(1, true), Err(RoomError::Ended));
    }

    #[test]
    fn disconnect_keeps_the_map_and_rejoin_resends_snapshot() {
        let mut room = started_duel();
        let before = room.game().unwrap().map().clone();
        room.disconnect(2);
        assert_eq!(room.player(2).unwrap().status, PlayerStatus::Offline);
        assert_eq!(room.game().unwrap().map(), &before);

        let outbox = room.join(2, "bob", None, 120).unwrap();
        assert!(kinds(&outbox, 2).contains(&"gameStart"));
        assert!(room.player(2).unwrap().is_online());
    }

    #[test]
    fn late_read_after_the_end() {
        let mut room = started_duel();
        room.surrender(1).unwrap();
        room.disconnect(2);
        let outbox = room.join(2, "bob", None, 0).unwrap();
        assert_eq!(kinds(&outbox, 2), vec!["roomInfo", "gameStart", "gameEnd"]);
        assert_eq!(room.join(7, "late", None, 0), Err(RoomError::Ended));
    }

    #[test]
    fn shutdown_ends_without_winner() {
        let mut room = started_duel();
        let outbox = room.shutdown();
        assert_eq!(room.status(), RoomStatus::Ended);
        assert!(outbox.iter().all(|(_, m)| *m == ServerMessage::GameEnd(GameEndInfo { winner: None, winners: vec![] })));
        assert!(room.shutdown().is_empty());
    }

    #[test]
    fn leaving_the_lobby_removes_the_player() {
        let mut room = room(GameMode::free_for_all());
        room.join(1, "alice", None, 0).unwrap();
        room.join(2, "bob", None, 0).unwrap();
        room.surrender(2).unwrap();
        assert!(room.player(2).is_none());
        assert_eq!(room.surrender(2), Err(RoomError::UnknownPlayer(2)));
    }

    #[test]
    fn teams_can_be_chosen() {
        let mut room = room(GameMode::free_for_all());
        room.join(1, "alice", Some(5), 0).unwrap();
        room.join(2, "bob", None, 0).unwrap();
        assert_eq!(room.player(1).unwrap().team_id, 5);
        assert_eq!(room.player(2).unwrap().team_id, 1);
    }

    /// A room whose map has no tile a king could stand on.
    fn unplayable(mode: GameMode) -> Room {
        let walls = Map::filled(MapSize::new(1, 1), MapInfo::default(), Block::mountain());
        Room::with_rng(Uuid::new_v4(), mode, Some(walls), StdRng::seed_from_u64(1))
    }

    #[test]
    fn failed_start_rolls_back_the_join() {
        let mut room = unplayable(GameMode::one_vs_one());
        room.join(1, "alice", None, 0).unwrap();
        assert!(matches!(room.join(2, "bob", None, 0), Err(RoomError::Setup(_))));
        assert_eq!(room.players().iter().map(|p| p.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert!(room.game().is_none());
    }

    #[test]
    fn failed_start_rolls_back_votes_and_departures() {
        let mut room = unplayable(GameMode::free_for_all());
        room.join(1, "alice", None, 0).unwrap();
        room.join(2, "bob", None, 0).unwrap();
        room.force_start(1, true).unwrap();
        assert!(matches!(room.force_start(2, true), Err(RoomError::Setup(_))));
        assert!(!room.player(2).unwrap().force_start);

        room.join(3, "carol", None, 0).unwrap();
        room.force_start(3, true).unwrap();
        // bob leaving would leave only voters behind
        assert!(matches!(room.surrender(2), Err(RoomError::Setup(_))));
        assert_eq!(room.players().iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(room.status(), RoomStatus::Waiting);
    }

    #[test]
    fn failed_start_keeps_a_returning_player_offline() {
        let mut room = unplayable(GameMode::free_for_all());
        room.join(1, "alice", None, 0).unwrap();
        room.join(2, "bob", None, 0).unwrap();
        room.force_start(1, true).unwrap();
        room.force_start(2, true).unwrap_err();
        room.disconnect(2);
        room.force_start(2, true).unwrap();
        assert!(matches!(room.join(2, "bob", Some(7), 0), Err(RoomError::Setup(_))));
        let bob = room.player(2).unwrap();
        assert_eq!((bob.status, bob.team_id), (PlayerStatus::Offline, 2));
    }

    #[test]
    fn one_team_waits_until_someone_switches() {
        let mut room = room(GameMode::one_vs_one());
        room.join(1, "alice", Some(3), 0).unwrap();
        room.join(2, "bob", Some(3), 0).unwrap();
        assert_eq!(room.status(), RoomStatus::Waiting);

        let outbox = room.join(2, "bob", Some(4), 0).unwrap();
        assert_eq!(room.status(), RoomStatus::Active);
        assert!(kinds(&outbox, 2).contains(&"gameStart"));
        assert_eq!(room.player(2).unwrap().team_id, 4);
        assert!(!room.game().unwrap().is_over());
    }

    #[test]
    fn forfeit_concedes_only_for_absent_players() {
        let mut room = started_duel();
        assert_eq!(room.forfeit(2), Ok(Vec::new()));
        assert_eq!(room.status(), RoomStatus::Active);

        room.disconnect(2);
        let outbox = room.forfeit(2).unwrap();
        assert_eq!(room.status(), RoomStatus::Ended);
        let end = ServerMessage::GameEnd(GameEndInfo { winner: Some(1), winners: vec!["alice".into()] });
        assert!(outbox.contains(&(1, end)));
        assert!(room.game().unwrap().map().owned_by(2).is_empty());
        assert_eq!(room.forfeit(2), Ok(Vec::new()));
    }

    #[test]
    fn duel_moves_are_limited_per_turn() {
        let mut room = started_duel();
        for _ in 0..5 {
            room.tick(0);
        }
        let king = king_of(&room, 1);
        let direction = if king.x == 1 { Direction::Right } else { Direction::Left };
        let cmd = MoveCommand { player_id: 1, from: king, direction, troops: 1 };
        room.submit_move(&cmd).unwrap();
        room.submit_move(&cmd).unwrap();
        let err = room.submit_move(&cmd).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateError);
        room.tick(0);
        room.submit_move(&cmd).unwrap();
    }

    #[test]
    fn reserved_player_id_is_a_protocol_error() {
        let mut room = room(GameMode::free_for_all());
        assert_eq!(room.join(NEUTRAL, "ghost", None, 0).unwrap_err().code(), ErrorCode::ProtocolError);
    }
}
