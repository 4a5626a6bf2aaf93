//! Threat monitor and combat engagement.
//!
//! Every scan period the monitor assesses nearby entities (see
//! [`crate::threat`]); if the nearest hostile is targeting the avatar it asks
//! the arbiter for `Combat` control, which supersedes a preemptible scheduler
//! activity, arms a weapon and runs the engagement loop.
//!
//! Defense is suppressed entirely at night, not just new engagements.

use crate::arbiter::Role;
use crate::context::AgentContext;
use crate::monitors::{Monitor, Tick};
use crate::pacing::jitter;
use crate::provision::equip_weapon;
use crate::threat::{scan, select_target};
use crate::types::EntityId;
use crate::world::WorldInterface;
use async_trait::async_trait;
use log::{info, warn};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Distance at which the avatar swings instead of closing in.
pub const MELEE_RANGE: f64 = 3.5;
/// Movement-goal tolerance while closing in.
pub const APPROACH_TOLERANCE: f64 = 3.0;
/// Beyond this distance the target is abandoned.
pub const DISENGAGE_DISTANCE: f64 = 20.0;

const APPROACH_SETTLE: Duration = Duration::from_millis(300);
const LOOP_PAUSE: Duration = Duration::from_millis(100);

/// How an engagement ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Engagement {
    /// The target died.
    Defeated,
    /// The target despawned or became invalid.
    Lost,
    /// The target moved out of disengage distance.
    Disengaged,
    /// The hard timeout elapsed.
    TimedOut,
    /// A command was rejected mid-fight.
    Failed(String),
}

// ---------------------------------------------------------------------------
// Engagement loop
// ---------------------------------------------------------------------------

/// Fight `target` until it dies, leaves, or `timeout` elapses.
///
/// The movement goal is cleared on every exit path.
pub async fn engage(world: &dyn WorldInterface, target: EntityId, timeout: Duration) -> Engagement {
    let outcome = engagement_loop(world, target, timeout).await;
    world.cancel_movement();
    outcome
}

async fn engagement_loop(world: &dyn WorldInterface, target: EntityId, timeout: Duration) -> Engagement {
    let started = Instant::now();

    loop {
        let Some(mob) = world.entity(target) else {
            return Engagement::Lost;
        };
        if !mob.alive {
            info!("Defeated {}", mob.species);
            return Engagement::Defeated;
        }
        if started.elapsed() > timeout {
            info!("Combat timeout against {}", mob.species);
            return Engagement::TimedOut;
        }
        let Some(position) = world.position() else {
            return Engagement::Lost;
        };

        let distance = position.distance_to(&mob.position);
        if distance > DISENGAGE_DISTANCE {
            info!("{} too far ({:.1}), disengaging", mob.species, distance);
            return Engagement::Disengaged;
        }

        if let Err(e) = world.look_at(mob.eye_target()).await {
            return Engagement::Failed(e.to_string());
        }

        if distance > MELEE_RANGE {
            world.move_toward(mob.position, APPROACH_TOLERANCE);
            sleep(APPROACH_SETTLE).await;
        } else {
            world.cancel_movement();
            if let Err(e) = world.attack(target).await {
                warn!("Attack on {} {} failed: {}", mob.species, target, e);
                return Engagement::Failed(e.to_string());
            }
            info!("Attacked {}", mob.species);
            sleep(jitter(400, 600)).await;
        }

        sleep(LOOP_PAUSE).await;
    }
}

// ---------------------------------------------------------------------------
// Threat monitor
// ---------------------------------------------------------------------------

pub struct ThreatMonitor {
    ctx: AgentContext,
}

impl ThreatMonitor {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Monitor for ThreatMonitor {
    fn name(&self) -> &'static str {
        "threat"
    }

    fn period(&self) -> Duration {
        self.ctx.config.timings.threat_scan()
    }

    async fn tick(&mut self) -> Tick {
        let settings = &self.ctx.config.combat_settings;
        if !settings.enabled {
            return Tick::Idle;
        }
        let Ok(snap) = self.ctx.arbiter.snapshot().await else {
            return Tick::Skipped("arbiter closed");
        };
        if snap.in_combat {
            return Tick::Skipped("already in combat");
        }
        if self.ctx.is_night() {
            return Tick::Skipped("defense suppressed at night");
        }

        let world = self.ctx.world.as_ref();
        let Some(origin) = world.position() else {
            return Tick::Skipped("not spawned");
        };
        let threats = scan(&origin, &world.entities(), settings);
        let Some(target) = select_target(&threats).cloned() else {
            return Tick::Idle;
        };

        let Ok(Some(grant)) = self.ctx.arbiter.acquire(Role::Combat).await else {
            return Tick::Skipped("control refused");
        };
        world.cancel_movement();

        info!(
            "Combat mode activated: {} {} at {:.1} blocks ({} hostiles nearby)",
            target.species,
            target.entity,
            target.distance,
            threats.len()
        );

        if equip_weapon(world, &settings.preferred_weapon).await.is_none() {
            warn!("Cannot fight {} without a weapon", target.species);
            grant.release();
            return Tick::Acted;
        }

        let outcome = engage(world, target.entity, self.ctx.config.timings.combat_timeout()).await;
        info!("Combat mode ended: {:?}", outcome);
        self.ctx.arbiter.touch_activity();
        grant.release();
        Tick::Acted
    }
}
