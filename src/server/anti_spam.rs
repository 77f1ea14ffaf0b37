use std::time::{Duration, Instant};

use log::warn;

use crate::config::anti_spam::{BAN_DURATION_SECONDS, MAX_REQUESTS_PER_SECOND, MAX_RESPONSES_PER_SECOND};

/// Tracks anti-spam state for a single connection.
pub struct AntiSpamState {
    // Last error sent (for suppression)
    last_error: Option<String>,
    // Timestamp of last reset (for per-second counters)
    last_tick: Instant,
    // Number of direct error replies sent in the current second
    responses_this_tick: u32,
    // Number of requests received in the current second
    requests_this_tick: u32,
    banned_until: Option<Instant>,
}

impl Default for AntiSpamState {
    fn default() -> Self {
        Self::new()
    }
}

impl AntiSpamState {
    pub fn new() -> Self {
        Self {
            last_error: None,
            last_tick: Instant::now(),
            responses_this_tick: 0,
            requests_this_tick: 0,
            banned_until: None,
        }
    }

    /// Call at the start of every incoming frame.
    /// Returns true if the connection is (now) banned.
    pub fn record_request(&mut self, label: &str) -> bool {
        self.tick();
        self.requests_this_tick += 1;
        if self.requests_this_tick > MAX_REQUESTS_PER_SECOND {
            self.ban(label, "Too many requests per second");
            return true;
        }
        self.is_banned()
    }

    /// Call before every direct error reply.
    /// Returns true if the connection is (now) banned.
    pub fn record_response(&mut self, label: &str) -> bool {
        self.tick();
        self.responses_this_tick += 1;
        if self.responses_this_tick > MAX_RESPONSES_PER_SECOND {
            self.ban(label, "Too many error replies per second");
            return true;
        }
        self.is_banned()
    }

    /// Returns true if the error should be sent, false for an immediate repeat.
    pub fn should_send_error(&mut self, error: &str, label: &str) -> bool {
        if self.last_error.as_deref() == Some(error) {
            warn!("[AntiSpam] Suppressed duplicate error '{}' for {}", error, label);
            return false;
        }
        self.last_error = Some(error.to_string());
        true
    }

    /// Call when a command was accepted.
    pub fn reset_on_valid_action(&mut self) {
        self.last_error = None;
    }

    pub fn is_banned(&self) -> bool {
        self.banned_until.is_some_and(|until| Instant::now() < until)
    }

    /// Remaining ban duration in seconds, or 0 if not banned.
    pub fn ban_remaining_secs(&self) -> u64 {
        self.banned_until.map_or(0, |until| until.saturating_duration_since(Instant::now()).as_secs())
    }

    fn ban(&mut self, label: &str, reason: &str) {
        let until = Instant::now() + Duration::from_secs(BAN_DURATION_SECONDS);
        self.banned_until = Some(until);
        warn!("[AntiSpam] Banned {} for {}s: {}", label, BAN_DURATION_SECONDS, reason);
    }

    /// Reset per-second counters if a new second has started.
    fn tick(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_secs(1) {
            self.last_tick = now;
            self.responses_this_tick = 0;
            self.requests_this_tick = 0;
        }
    }
}
