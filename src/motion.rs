//! Gestures and travel shared by every behavior.
//!
//! All waits here are cooperative (`tokio::time::sleep`), so monitors keep
//! firing while a behavior is in transit.

use crate::arbiter::ControlGrant;
use crate::context::AgentContext;
use crate::pacing::{chance, jitter, pick, uniform, uniform_int};
use crate::types::{Control, EquipSlot, Vec3};
use crate::world::WorldInterface;
use log::debug;
use std::f64::consts::PI;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// How often arrival is polled.
pub const ARRIVAL_POLL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Gestures
// ---------------------------------------------------------------------------

/// Hold `control` for `duration`, then let go.
pub async fn pulse(world: &dyn WorldInterface, control: Control, duration: Duration) {
    world.set_control(control, true);
    sleep(duration).await;
    world.set_control(control, false);
}

/// Turn to a random heading and glance up or down a little.
pub async fn look_around(world: &dyn WorldInterface) {
    let yaw = uniform(-PI, PI);
    let pitch = uniform(-PI / 6.0, PI / 6.0);
    if let Err(e) = world.look(yaw, pitch).await {
        debug!("Look around failed: {}", e);
    }
    sleep(jitter(300, 800)).await;
}

/// One small filler gesture with no net effect on the world.
pub async fn random_gesture(world: &dyn WorldInterface) {
    match uniform_int(0, 4) {
        0 => pulse(world, Control::Jump, jitter(100, 300)).await,
        1 => pulse(world, Control::Sneak, jitter(500, 1500)).await,
        2 => {
            look_around(world).await;
            sleep(jitter(200, 600)).await;
            look_around(world).await;
        }
        3 => {
            sleep(jitter(1000, 3000)).await;
            look_around(world).await;
        }
        _ => {
            let Some(item) = pick(&world.inventory()) else {
                return;
            };
            match world.equip(&item, EquipSlot::Hand).await {
                Ok(()) => sleep(jitter(500, 1200)).await,
                Err(e) => debug!("Item switch to {} failed: {}", item.name, e),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Travel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalOutcome {
    Arrived,
    TimedOut,
    /// A higher-priority condition appeared.
    Interrupted,
    /// The avatar has no position (despawned / disconnected).
    Lost,
}

/// A bounded travel request.
#[derive(Debug, Clone, Copy)]
pub struct Trip {
    pub target: Vec3,
    /// Tolerance handed to the movement planner.
    pub tolerance: f64,
    /// Distance under which the avatar counts as arrived.
    pub threshold: f64,
    pub timeout: Duration,
    /// Interject jumps and glances while walking.
    pub gestures: bool,
}

impl Trip {
    pub fn new(target: Vec3, tolerance: f64, threshold: f64, timeout: Duration) -> Self {
        Self {
            target,
            tolerance,
            threshold,
            timeout,
            gestures: false,
        }
    }

    pub fn with_gestures(mut self) -> Self {
        self.gestures = true;
        self
    }
}

/// Walk toward `trip.target` and wait for arrival, timeout or preemption.
///
/// The movement goal is always cleared before returning.
pub async fn travel(ctx: &AgentContext, grant: &ControlGrant, trip: Trip) -> ArrivalOutcome {
    let world = ctx.world.as_ref();
    world.move_toward(trip.target, trip.tolerance);
    let outcome = wait_for_arrival(ctx, grant, &trip).await;
    world.cancel_movement();
    world.set_control(Control::Jump, false);
    outcome
}

async fn wait_for_arrival(ctx: &AgentContext, grant: &ControlGrant, trip: &Trip) -> ArrivalOutcome {
    let world = ctx.world.as_ref();
    let started = Instant::now();
    let mut next_gesture = started + jitter(800, 2000);

    loop {
        if ctx.should_yield(grant).await {
            return ArrivalOutcome::Interrupted;
        }
        let Some(position) = world.position() else {
            return ArrivalOutcome::Lost;
        };
        if position.distance_to(&trip.target) < trip.threshold {
            return ArrivalOutcome::Arrived;
        }
        if started.elapsed() > trip.timeout {
            return ArrivalOutcome::TimedOut;
        }

        if trip.gestures && Instant::now() >= next_gesture {
            if chance(0.15) {
                pulse(world, Control::Jump, jitter(100, 200)).await;
            }
            if chance(0.1) {
                look_around(world).await;
            }
            next_gesture = Instant::now() + jitter(800, 2000);
        }

        sleep(ARRIVAL_POLL).await;
    }
}
