//! Round clock of a room actor.
//!
//! Owns the interval timer of an active room and the countdown reported to
//! clients. The countdown is informational only; legality never depends on it.

use std::time::{Duration, Instant};

use actix::prelude::*;
use log::debug;

use crate::server::room::server::RoomActor;

pub struct RoundScheduler {
    /// `None` for event-driven rooms that only advance on `Tick`.
    interval: Option<Duration>,
    handle: Option<SpawnHandle>,
    last_tick: Option<Instant>,
}

impl RoundScheduler {
    pub fn new(interval: Option<Duration>) -> Self {
        Self { interval, handle: None, last_tick: None }
    }

    /// Start ticking the room every interval. No-op when event-driven or running.
    pub fn start(&mut self, ctx: &mut Context<RoomActor>) {
        let Some(interval) = self.interval else {
            debug!("[Scheduler] Event-driven room, no timer started");
            return;
        };
        if self.handle.is_some() {
            return;
        }
        self.last_tick = Some(Instant::now());
        self.handle = Some(ctx.run_interval(interval, |act, ctx| act.advance_round(ctx)));
        debug!("[Scheduler] Ticking every {:?}", interval);
    }

    /// Stop the timer. No tick fires afterwards.
    pub fn cancel(&mut self, ctx: &mut Context<RoomActor>) {
        if let Some(handle) = self.handle.take() {
            ctx.cancel_future(handle);
            debug!("[Scheduler] Timer cancelled");
        }
        self.last_tick = None;
    }

    /// Restart the countdown after a round was played.
    pub fn mark_tick(&mut self) {
        if self.handle.is_some() {
            self.last_tick = Some(Instant::now());
        }
    }

    /// Milliseconds until the next scheduled round, `0` when none is scheduled.
    pub fn turn_time_left(&self) -> u64 {
        time_left(self.interval, self.last_tick.map(|t| t.elapsed()))
    }
}

fn time_left(interval: Option<Duration>, elapsed: Option<Duration>) -> u64 {
    match (interval, elapsed) {
        (Some(interval), Some(elapsed)) => {
            let left = interval.saturating_sub(elapsed);
            u64::try_from(left.as_millis()).unwrap_or(u64::MAX)
        }
        _ => 0,
    }
}
