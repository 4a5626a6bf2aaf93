//! Periodic monitors and the runner that drives them.
//!
//! Each monitor runs in its own task on a fixed period. A tick never overlaps
//! the previous one: the runner awaits the tick before polling the timer again
//! and skips missed ticks. Every runner stops promptly when its
//! [`CancellationToken`] fires, so the supervisor can await shutdown before
//! reconnecting.
//!
//! | Monitor         | Period | Needs control | Acts when                         |
//! |-----------------|--------|---------------|-----------------------------------|
//! | `ModeEnforcer`  | 2 s    | no            | privilege mode drifted            |
//! | `IdleDetector`  | 15 s   | `Filler`      | idle past a re-rolled threshold   |
//! | `Keepalive`     | 20 s   | `Keepalive`   | no inbound signal for 45 s        |
//! | `Glance`        | 1 s    | `Filler`      | 2% chance per tick                |
//! | `ThreatMonitor` | 1 s    | `Combat`      | see [`crate::combat`]             |

use crate::arbiter::Role;
use crate::context::AgentContext;
use crate::motion::{look_around, pulse, random_gesture};
use crate::pacing::{chance, jitter};
use crate::types::{Control, GameMode};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Nothing needed doing.
    Idle,
    /// Something needed doing but the monitor was not allowed to.
    Skipped(&'static str),
    /// The monitor issued commands to the world.
    Acted,
}

#[async_trait]
pub trait Monitor: Send {
    fn name(&self) -> &'static str;
    fn period(&self) -> Duration;
    async fn tick(&mut self) -> Tick;
}

/// Drive `monitor` until `stop` fires. The first tick comes one full period
/// after `startup` has elapsed.
pub async fn run_monitor<M: Monitor>(mut monitor: M, stop: CancellationToken, startup: Duration) {
    tokio::select! {
        _ = stop.cancelled() => return,
        _ = sleep(startup) => {}
    }

    let period = monitor.period();
    info!("{} monitor enabled ({:?} period)", monitor.name(), period);

    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = timer.tick() => {}
        }
        tokio::select! {
            _ = stop.cancelled() => break,
            outcome = monitor.tick() => {
                if let Tick::Skipped(reason) = outcome {
                    debug!("{} tick skipped: {}", monitor.name(), reason);
                }
            }
        }
    }

    debug!("{} monitor stopped", monitor.name());
}

// ---------------------------------------------------------------------------
// Mode enforcer
// ---------------------------------------------------------------------------

/// Keeps the avatar in the configured privilege mode.
///
/// The correction is a chat command, not a movement or action command, so it
/// does not need control of the avatar.
pub struct ModeEnforcer {
    ctx: AgentContext,
}

impl ModeEnforcer {
    pub const SETTLE: Duration = Duration::from_millis(1_000);
    pub const POLL: Duration = Duration::from_millis(2_000);

    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    fn required(&self) -> GameMode {
        self.ctx.config.required_mode
    }

    fn in_required_mode(&self) -> bool {
        self.ctx.world.game_mode() == Some(self.required())
    }

    async fn issue_correction(&self, command: &str) {
        if let Err(e) = self.ctx.world.send_command(command).await {
            warn!("Mode correction '{}' failed: {}", command, e);
        }
        sleep(Self::SETTLE).await;
    }
}

#[async_trait]
impl Monitor for ModeEnforcer {
    fn name(&self) -> &'static str {
        "mode"
    }

    fn period(&self) -> Duration {
        self.ctx.config.timings.mode_check()
    }

    async fn tick(&mut self) -> Tick {
        let Some(mode) = self.ctx.world.game_mode() else {
            return Tick::Skipped("not spawned");
        };
        let required = self.required();
        if mode == required {
            return Tick::Idle;
        }

        warn!("Mode changed to {} - switching back to {}", mode, required);
        let command = format!("/gamemode {}", required);
        self.issue_correction(&command).await;

        let max_retries = self.ctx.config.timings.mode_retries;
        let mut retries = 0;
        while !self.in_required_mode() && retries < max_retries {
            sleep(Self::POLL).await;
            info!("Mode not yet updated, retrying ({}/{})", retries + 1, max_retries);
            self.issue_correction(&command).await;
            retries += 1;
        }

        if self.in_required_mode() {
            info!("Switched to {} mode", required);
        } else {
            warn!("Failed to switch to {} mode - avatar may lack permissions", required);
        }
        Tick::Acted
    }
}

// ---------------------------------------------------------------------------
// Idle detector
// ---------------------------------------------------------------------------

/// Performs a filler gesture when nothing has happened for a while.
pub struct IdleDetector {
    ctx: AgentContext,
}

impl IdleDetector {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Monitor for IdleDetector {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn period(&self) -> Duration {
        self.ctx.config.timings.idle_check()
    }

    async fn tick(&mut self) -> Tick {
        let Ok(snap) = self.ctx.arbiter.snapshot().await else {
            return Tick::Skipped("arbiter closed");
        };
        let timings = &self.ctx.config.timings;
        let threshold = jitter(timings.idle_threshold_min_ms, timings.idle_threshold_max_ms);
        if snap.since_activity <= threshold {
            return Tick::Idle;
        }
        if snap.is_busy() {
            return Tick::Skipped("busy");
        }
        let Ok(Some(grant)) = self.ctx.arbiter.acquire(Role::Filler).await else {
            return Tick::Skipped("control refused");
        };

        info!(
            "Performing filler gesture after {:.0}s idle",
            snap.since_activity.as_secs_f64()
        );
        random_gesture(self.ctx.world.as_ref()).await;
        self.ctx.arbiter.touch_activity();
        grant.release();
        Tick::Acted
    }
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Generates outbound traffic when the world has gone quiet.
pub struct Keepalive {
    ctx: AgentContext,
}

impl Keepalive {
    pub const PULSE: Duration = Duration::from_millis(100);

    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Monitor for Keepalive {
    fn name(&self) -> &'static str {
        "keepalive"
    }

    fn period(&self) -> Duration {
        self.ctx.config.timings.keepalive_check()
    }

    async fn tick(&mut self) -> Tick {
        let Ok(snap) = self.ctx.arbiter.snapshot().await else {
            return Tick::Skipped("arbiter closed");
        };
        if snap.since_signal <= self.ctx.config.timings.keepalive_threshold() {
            return Tick::Idle;
        }
        if self.ctx.world.position().is_none() {
            return Tick::Skipped("not spawned");
        }
        let Ok(Some(grant)) = self.ctx.arbiter.acquire(Role::Keepalive).await else {
            // Whoever holds control is already generating traffic.
            return Tick::Skipped("busy");
        };

        info!(
            "Sending keep-alive pulse ({:.0}s since last signal)",
            snap.since_signal.as_secs_f64()
        );
        pulse(self.ctx.world.as_ref(), Control::Jump, Self::PULSE).await;
        self.ctx.arbiter.record_signal();
        grant.release();
        Tick::Acted
    }
}

// ---------------------------------------------------------------------------
// Glance
// ---------------------------------------------------------------------------

/// Now and then looks somewhere else while nothing holds control.
pub struct Glance {
    ctx: AgentContext,
    chance: f64,
}

impl Glance {
    pub const PERIOD: Duration = Duration::from_secs(1);
    /// About one glance per 50 s of free time.
    pub const CHANCE: f64 = 0.02;

    pub fn new(ctx: AgentContext) -> Self {
        Self {
            ctx,
            chance: Self::CHANCE,
        }
    }

    pub fn with_chance(mut self, chance: f64) -> Self {
        self.chance = chance;
        self
    }
}

#[async_trait]
impl Monitor for Glance {
    fn name(&self) -> &'static str {
        "glance"
    }

    fn period(&self) -> Duration {
        Self::PERIOD
    }

    async fn tick(&mut self) -> Tick {
        if !chance(self.chance) || self.ctx.world.position().is_none() {
            return Tick::Idle;
        }
        let Ok(Some(grant)) = self.ctx.arbiter.acquire(Role::Filler).await else {
            return Tick::Skipped("busy");
        };
        look_around(self.ctx.world.as_ref()).await;
        grant.release();
        Tick::Acted
    }
}
