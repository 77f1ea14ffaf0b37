//! Room actors and the registry that owns them.
//!
//! Each room runs in its own `RoomActor`; the actor mailbox is the single point
//! through which every command and tick for that room passes. Players who drop
//! out of a running game get a reconnect window on the same actor; when it
//! runs out they forfeit. `RoomManager`
//! creates rooms, resolves them by id and sweeps out abandoned or finished ones.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix::{Arbiter, ArbiterHandle, SpawnHandle};
use log::{debug, info, warn};
use uuid::Uuid;

use super::messages::{
    CloseRoom, Connection, CountRooms, CreateRoom, Disconnect, ForceStart, GetRoom, GetSummary, Join, RoomActivity,
    RoomSummary, RunJanitor, Shutdown, ShutdownAll, SubmitMove, Surrender, Tick,
};
use super::room::{Outbox, Room, RoomId, RoomStatus};
use super::scheduler::RoundScheduler;
use crate::config::room::{
    ENDED_ROOM_RETENTION_SECS, JANITOR_INTERVAL_SECS, RECONNECT_TIMEOUT_SECS, ROOM_IDLE_TIMEOUT_SECS,
};
use crate::game::grid::MapLibrary;
use crate::game::mode::GameMode;
use crate::game::types::PlayerId;
use crate::server::error::RoomError;
use crate::server::protocol::ServerMessage;
use crate::server::session_utils::is_current_connection;

pub struct RoomActor {
    room: Room,
    connections: HashMap<PlayerId, Connection>,
    scheduler: RoundScheduler,
    manager: Recipient<RoomActivity>,
    reconnect_timeout: Duration,
    /// Pending forfeits of offline players, cancelled when they come back.
    forfeits: HashMap<PlayerId, SpawnHandle>,
}

impl Actor for RoomActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        debug!("[Room] room_id={} actor started", self.room.id());
        self.report();
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        debug!("[Room] room_id={} actor stopped", self.room.id());
    }
}

impl RoomActor {
    pub fn new(room: Room, manager: Recipient<RoomActivity>, reconnect_timeout: Duration) -> Self {
        let scheduler = RoundScheduler::new(room.mode().tick_interval());
        Self { room, connections: HashMap::new(), scheduler, manager, reconnect_timeout, forfeits: HashMap::new() }
    }

    /// Play one round and broadcast it.
    pub fn advance_round(&mut self, ctx: &mut Context<Self>) {
        let before = self.room.status();
        self.scheduler.mark_tick();
        let outbox = self.room.tick(self.scheduler.turn_time_left());
        self.deliver(outbox);
        self.sync(ctx, before);
    }

    fn deliver(&self, outbox: Outbox) {
        for (player, msg) in outbox {
            if let Some(conn) = self.connections.get(&player) {
                conn.addr.do_send(msg);
            }
        }
    }

    /// Start or stop the clock on lifecycle transitions and tell the manager.
    fn sync(&mut self, ctx: &mut Context<Self>, before: RoomStatus) {
        let now = self.room.status();
        if before != now {
            match now {
                RoomStatus::Active => self.scheduler.start(ctx),
                RoomStatus::Ended => {
                    self.scheduler.cancel(ctx);
                    for (_, handle) in self.forfeits.drain() {
                        ctx.cancel_future(handle);
                    }
                }
                RoomStatus::Waiting => {}
            }
        }
        self.report();
    }

    /// Give an offline player `reconnect_timeout` to come back before they forfeit.
    fn arm_forfeit(&mut self, player: PlayerId, ctx: &mut Context<Self>) {
        let alive = self.room.game().is_some_and(|g| g.is_alive(player));
        if self.room.status() != RoomStatus::Active || !alive {
            return;
        }
        let handle = ctx.run_later(self.reconnect_timeout, move |act, ctx| {
            act.forfeits.remove(&player);
            act.forfeit(player, ctx);
        });
        if let Some(stale) = self.forfeits.insert(player, handle) {
            ctx.cancel_future(stale);
        }
        debug!("[Room] room_id={} player={} has {:?} to reconnect", self.room.id(), player, self.reconnect_timeout);
    }

    fn disarm_forfeit(&mut self, player: PlayerId, ctx: &mut Context<Self>) {
        if let Some(handle) = self.forfeits.remove(&player) {
            ctx.cancel_future(handle);
            debug!("[Room] room_id={} player={} is back, forfeit cancelled", self.room.id(), player);
        }
    }

    fn forfeit(&mut self, player: PlayerId, ctx: &mut Context<Self>) {
        // rejections are logged by `apply`
        let _ = self.apply(ctx, |room| room.forfeit(player));
    }

    fn report(&self) {
        self.manager.do_send(RoomActivity {
            room_id: self.room.id(),
            status: self.room.status(),
            online: self.room.online_count(),
        });
    }

    fn authorize(&self, player: PlayerId, conn_id: &Uuid) -> Result<(), RoomError> {
        if is_current_connection(&self.connections, player, conn_id) {
            Ok(())
        } else {
            Err(RoomError::NotInRoom(self.room.id()))
        }
    }

    fn apply(
        &mut self,
        ctx: &mut Context<Self>,
        op: impl FnOnce(&mut Room) -> Result<Outbox, RoomError>,
    ) -> Result<(), RoomError> {
        let before = self.room.status();
        let result = op(&mut self.room);
        match result {
            Ok(outbox) => {
                self.deliver(outbox);
                self.sync(ctx, before);
                Ok(())
            }
            Err(e) => {
                warn!("[Room] room_id={} rejected command: {}", self.room.id(), e);
                Err(e)
            }
        }
    }
}

impl Handler<Join> for RoomActor {
    type Result = Result<(), RoomError>;

    fn handle(&mut self, msg: Join, ctx: &mut Context<Self>) -> Self::Result {
        let before = self.room.status();
        let outbox = self
            .room
            .join(msg.player_id, &msg.username, msg.team_id, self.scheduler.turn_time_left())
            .inspect_err(|e| warn!("[Room] room_id={} refused player={}: {}", self.room.id(), msg.player_id, e))?;
        if let Some(previous) = self.connections.insert(msg.player_id, msg.conn.clone()) {
            if previous.id != msg.conn.id {
                info!("[Room] room_id={} player={} replaced connection {}", self.room.id(), msg.player_id, previous.id);
                previous.addr.do_send(ServerMessage::connection(
                    "replaced",
                    Some("another connection joined as this player"),
                ));
            }
        }
        self.disarm_forfeit(msg.player_id, ctx);
        self.deliver(outbox);
        self.sync(ctx, before);
        Ok(())
    }
}

impl Handler<ForceStart> for RoomActor {
    type Result = Result<(), RoomError>;

    fn handle(&mut self, msg: ForceStart, ctx: &mut Context<Self>) -> Self::Result {
        self.authorize(msg.player_id, &msg.conn_id)?;
        self.apply(ctx, |room| room.force_start(msg.player_id, msg.vote))
    }
}

impl Handler<SubmitMove> for RoomActor {
    type Result = Result<(), RoomError>;

    fn handle(&mut self, msg: SubmitMove, ctx: &mut Context<Self>) -> Self::Result {
        self.authorize(msg.cmd.player_id, &msg.conn_id)?;
        self.apply(ctx, |room| room.submit_move(&msg.cmd))
    }
}

impl Handler<Surrender> for RoomActor {
    type Result = Result<(), RoomError>;

    fn handle(&mut self, msg: Surrender, ctx: &mut Context<Self>) -> Self::Result {
        self.authorize(msg.player_id, &msg.conn_id)?;
        self.apply(ctx, |room| room.surrender(msg.player_id))
    }
}

impl Handler<Disconnect> for RoomActor {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, ctx: &mut Context<Self>) {
        if !is_current_connection(&self.connections, msg.player_id, &msg.conn_id) {
            debug!("[Room] room_id={} ignoring disconnect of stale connection {}", self.room.id(), msg.conn_id);
            return;
        }
        self.connections.remove(&msg.player_id);
        let before = self.room.status();
        let outbox = self.room.disconnect(msg.player_id);
        self.deliver(outbox);
        self.sync(ctx, before);
        self.arm_forfeit(msg.player_id, ctx);
    }
}

impl Handler<Tick> for RoomActor {
    type Result = ();

    fn handle(&mut self, _: Tick, ctx: &mut Context<Self>) {
        self.advance_round(ctx);
    }
}

impl Handler<Shutdown> for RoomActor {
    type Result = ();

    fn handle(&mut self, _: Shutdown, ctx: &mut Context<Self>) {
        let before = self.room.status();
        let outbox = self.room.shutdown();
        self.deliver(outbox);
        self.sync(ctx, before);
    }
}

impl Handler<CloseRoom> for RoomActor {
    type Result = ();

    fn handle(&mut self, _: CloseRoom, ctx: &mut Context<Self>) {
        let before = self.room.status();
        let outbox = self.room.shutdown();
        self.deliver(outbox);
        self.sync(ctx, before);
        for conn in self.connections.values() {
            conn.addr.do_send(ServerMessage::connection("closed", Some("room closed")));
        }
        ctx.stop();
    }
}

impl Handler<GetSummary> for RoomActor {
    type Result = MessageResult<GetSummary>;

    fn handle(&mut self, _: GetSummary, _: &mut Context<Self>) -> Self::Result {
        MessageResult(RoomSummary {
            room_id: self.room.id(),
            status: self.room.status(),
            online: self.room.online_count(),
            turn: self.room.game().map(|g| g.turn()),
        })
    }
}

struct RoomEntry {
    addr: Addr<RoomActor>,
    status: RoomStatus,
    /// Set while no player is online.
    idle_since: Option<Instant>,
    ended_at: Option<Instant>,
}

impl RoomEntry {
    fn expired(&self, now: Instant) -> bool {
        let older_than = |since: Option<Instant>, secs: u64| {
            since.is_some_and(|t| now.saturating_duration_since(t) >= Duration::from_secs(secs))
        };
        match self.status {
            RoomStatus::Ended => older_than(self.ended_at, ENDED_ROOM_RETENTION_SECS),
            _ => older_than(self.idle_since, ROOM_IDLE_TIMEOUT_SECS),
        }
    }
}

/// Registry of live rooms.
pub struct RoomManager {
    rooms: HashMap<RoomId, RoomEntry>,
    library: MapLibrary,
    turn_duration_ms: u64,
    reconnect_timeout: Duration,
    workers: Vec<Arbiter>,
    next_worker: usize,
}

impl RoomManager {
    /// `workers` arbiters are spawned for rooms; `0` runs rooms on the current arbiter.
    pub fn new(library: MapLibrary, turn_duration_ms: u64, workers: usize) -> Self {
        let workers = (0..workers).map(|_| Arbiter::new()).collect();
        Self {
            rooms: HashMap::new(),
            library,
            turn_duration_ms,
            reconnect_timeout: Duration::from_secs(RECONNECT_TIMEOUT_SECS),
            workers,
            next_worker: 0,
        }
    }

    /// How long rooms created from now on hold a place for an offline player.
    pub fn with_reconnect_timeout(mut self, timeout: Duration) -> Self {
        self.reconnect_timeout = timeout;
        self
    }

    fn next_arbiter(&mut self) -> Option<ArbiterHandle> {
        if self.workers.is_empty() {
            return None;
        }
        let handle = self.workers[self.next_worker % self.workers.len()].handle();
        self.next_worker = self.next_worker.wrapping_add(1);
        Some(handle)
    }

    fn create_room(
        &mut self,
        mode: Option<String>,
        map_id: Option<String>,
        ctx: &mut Context<Self>,
    ) -> Result<(RoomId, Addr<RoomActor>), RoomError> {
        let mode = match mode.as_deref() {
            None | Some("") => GameMode::default(),
            Some(name) => GameMode::by_name(name).ok_or_else(|| RoomError::UnknownMode(name.to_string()))?,
        }
        .with_turn_duration(self.turn_duration_ms);
        let template = match map_id.as_deref() {
            None | Some("") => None,
            Some(id) => Some(self.library.get(id).ok_or_else(|| RoomError::UnknownMap(id.to_string()))?),
        };

        let room_id = Uuid::new_v4();
        let mode_name = mode.name.clone();
        let room = Room::new(room_id, mode, template);
        let activity = ctx.address().recipient();
        let timeout = self.reconnect_timeout;
        let addr = match self.next_arbiter() {
            Some(arbiter) => RoomActor::start_in_arbiter(&arbiter, move |_| RoomActor::new(room, activity, timeout)),
            None => RoomActor::new(room, activity, timeout).start(),
        };
        self.rooms.insert(
            room_id,
            RoomEntry { addr: addr.clone(), status: RoomStatus::Waiting, idle_since: Some(Instant::now()), ended_at: None },
        );
        info!("[RoomManager] Room created: room_id={} mode={} ({} rooms)", room_id, mode_name, self.rooms.len());
        Ok((room_id, addr))
    }

    /// Close and forget every expired room. Returns how many were removed.
    fn sweep(&mut self, now: Instant) -> usize {
        let expired: Vec<RoomId> = self.rooms.iter().filter(|(_, e)| e.expired(now)).map(|(id, _)| *id).collect();
        for room_id in &expired {
            if let Some(entry) = self.rooms.remove(room_id) {
                entry.addr.do_send(CloseRoom);
                info!("[RoomManager] Room removed: room_id={} ({:?})", room_id, entry.status);
            }
        }
        expired.len()
    }
}

impl Actor for RoomManager {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("[RoomManager] Started with {} worker arbiter(s), {} map template(s)", self.workers.len(), self.library.len());
        ctx.run_interval(Duration::from_secs(JANITOR_INTERVAL_SECS), |act, _| {
            act.sweep(Instant::now());
        });
    }
}

impl Handler<CreateRoom> for RoomManager {
    type Result = Result<(RoomId, Addr<RoomActor>), RoomError>;

    fn handle(&mut self, msg: CreateRoom, ctx: &mut Context<Self>) -> Self::Result {
        self.create_room(msg.mode, msg.map_id, ctx)
    }
}

impl Handler<GetRoom> for RoomManager {
    type Result = Result<Addr<RoomActor>, RoomError>;

    fn handle(&mut self, msg: GetRoom, _: &mut Context<Self>) -> Self::Result {
        self.rooms.get(&msg.room_id).map(|e| e.addr.clone()).ok_or(RoomError::NotFound(msg.room_id))
    }
}

impl Handler<RoomActivity> for RoomManager {
    type Result = ();

    fn handle(&mut self, msg: RoomActivity, _: &mut Context<Self>) {
        let Some(entry) = self.rooms.get_mut(&msg.room_id) else {
            return;
        };
        let now = Instant::now();
        if msg.status != entry.status {
            info!("[RoomManager] room_id={} {:?} -> {:?}", msg.room_id, entry.status, msg.status);
        }
        entry.status = msg.status;
        entry.idle_since = if msg.online == 0 { entry.idle_since.or(Some(now)) } else { None };
        if msg.status == RoomStatus::Ended {
            entry.ended_at = entry.ended_at.or(Some(now));
        }
    }
}

impl Handler<RunJanitor> for RoomManager {
    type Result = usize;

    fn handle(&mut self, msg: RunJanitor, _: &mut Context<Self>) -> usize {
        self.sweep(msg.now)
    }
}

impl Handler<CountRooms> for RoomManager {
    type Result = usize;

    fn handle(&mut self, _: CountRooms, _: &mut Context<Self>) -> usize {
        self.rooms.len()
    }
}

impl Handler<ShutdownAll> for RoomManager {
    type Result = ();

    fn handle(&mut self, _: ShutdownAll, _: &mut Context<Self>) {
        info!("[RoomManager] Shutting down {} room(s)", self.rooms.len());
        for entry in self.rooms.values() {
            entry.addr.do_send(Shutdown);
        }
    }
}
