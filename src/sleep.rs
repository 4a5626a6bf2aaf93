//! Night-time sleep cycle.
//!
//! Find a bed nearby and use it; otherwise provision one, place it next to
//! the avatar and try once more. While asleep the scheduler is suspended
//! until the world reports a wake-up. If everything fails the night is
//! simply endured awake.

use crate::arbiter::{ControlGrant, Role};
use crate::context::AgentContext;
use crate::motion::{travel, ArrivalOutcome, Trip};
use crate::pacing::jitter;
use crate::provision::{ensure_bed, hold};
use crate::types::{is_bed, BlockPos, Face, Item};
use crate::world::{WorldEvent, WorldInterface};
use log::{info, warn};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

/// Upper bound on a night's sleep before control is taken back regardless.
pub const WAKE_TIMEOUT: Duration = Duration::from_secs(600);
/// Radius searched for a bed just placed.
pub const PLACED_BED_RADIUS: f64 = 5.0;

const TRAVEL_THRESHOLD: f64 = 3.0;
const TRAVEL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// Slept and woke up normally.
    Slept,
    /// Fell asleep but no wake-up arrived in time.
    WakeTimeout,
    /// Death or disconnect while asleep.
    Interrupted,
    /// No usable bed could be found or placed.
    NoBed,
    /// The arbiter refused control.
    Refused,
}

/// Run one sleep attempt under `Sleep` control.
pub async fn attempt_sleep(ctx: &AgentContext) -> SleepOutcome {
    let Ok(Some(grant)) = ctx.arbiter.acquire(Role::Sleep).await else {
        return SleepOutcome::Refused;
    };
    ctx.world.cancel_movement();
    info!("Night time - attempting to sleep");

    let mut events = ctx.events.subscribe();
    let outcome = sleep_cycle(ctx, &grant, &mut events).await;

    match outcome {
        SleepOutcome::Slept | SleepOutcome::WakeTimeout => {
            info!("Good morning");
            sleep(jitter(1000, 3000)).await;
        }
        SleepOutcome::NoBed => {
            warn!("No bed available - staying awake tonight");
            sleep(jitter(2000, 5000)).await;
        }
        SleepOutcome::Interrupted | SleepOutcome::Refused => {}
    }

    ctx.arbiter.touch_activity();
    grant.release();
    outcome
}

async fn sleep_cycle(
    ctx: &AgentContext,
    grant: &ControlGrant,
    events: &mut broadcast::Receiver<WorldEvent>,
) -> SleepOutcome {
    let world = ctx.world.as_ref();
    let radius = ctx.config.bed_search_radius;
    info!("Searching for beds within {} blocks", radius);

    match world.find_block(&is_bed, radius) {
        Some(bed) => {
            info!("Found {} at {}", bed.name, bed.position);
            if let Some(outcome) = try_bed(ctx, grant, bed.position, events).await {
                return outcome;
            }
            info!("Trying to place a new bed");
        }
        None => info!("No bed found within {} blocks", radius),
    }

    let Some(item) = ensure_bed(world).await else {
        return SleepOutcome::NoBed;
    };
    let Some(placed) = place_bed_nearby(world, &item).await else {
        return SleepOutcome::NoBed;
    };
    try_bed(ctx, grant, placed, events)
        .await
        .unwrap_or(SleepOutcome::NoBed)
}

/// Walk to the bed and lie down. `None` if the bed could not be used.
async fn try_bed(
    ctx: &AgentContext,
    grant: &ControlGrant,
    bed: BlockPos,
    events: &mut broadcast::Receiver<WorldEvent>,
) -> Option<SleepOutcome> {
    let world = ctx.world.as_ref();
    let position = world.position()?;
    if position.distance_to(&bed.center()) > TRAVEL_THRESHOLD {
        let trip = Trip::new(bed.center(), 1.0, TRAVEL_THRESHOLD, TRAVEL_TIMEOUT);
        if travel(ctx, grant, trip).await == ArrivalOutcome::Lost {
            return Some(SleepOutcome::Interrupted);
        }
    }

    if let Err(e) = world.use_bed(bed).await {
        warn!("Failed to sleep in bed at {}: {}", bed, e);
        return None;
    }
    info!("Sleeping at {} - will wake at dawn", bed);
    Some(wait_for_wake(events).await)
}

async fn wait_for_wake(events: &mut broadcast::Receiver<WorldEvent>) -> SleepOutcome {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(WorldEvent::Wake) => return SleepOutcome::Slept,
                Ok(WorldEvent::Died | WorldEvent::Disconnected | WorldEvent::Kicked(_)) => {
                    return SleepOutcome::Interrupted
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return SleepOutcome::Interrupted,
            }
        }
    };
    timeout(WAKE_TIMEOUT, wait)
        .await
        .unwrap_or(SleepOutcome::WakeTimeout)
}

// ---------------------------------------------------------------------------
// Bed placement
// ---------------------------------------------------------------------------

/// Candidate reference blocks around `floor`, in spiral order: level by level
/// going down, then row by row, skipping the avatar's own cell. The bed goes
/// on top of the reference.
pub fn placement_candidates(floor: BlockPos) -> Vec<BlockPos> {
    let mut candidates = Vec::with_capacity(4 * 25);
    for dy in (-3..=0).rev() {
        for dx in -2..=2 {
            for dz in -2..=2 {
                if dx == 0 && dz == 0 && dy == 0 {
                    continue;
                }
                candidates.push(floor.offset(dx, dy - 1, dz));
            }
        }
    }
    candidates
}

/// Place `item` (a bed) next to the avatar. Returns where the bed ended up.
pub async fn place_bed_nearby(world: &dyn WorldInterface, item: &Item) -> Option<BlockPos> {
    let floor = world.position()?.floored();
    info!("Placing {} near {}", item.name, floor);

    if !hold(world, item, 300, 600).await {
        return None;
    }

    for reference in placement_candidates(floor) {
        let target = Face::UP.apply(reference);
        let solid_below = world.block_at(reference).is_some_and(|b| !b.is_air());
        let free_above = world.block_at(target).is_some_and(|b| b.is_air());
        if !(solid_below && free_above) {
            continue;
        }
        if world.place_block(reference, Face::UP).await.is_err() {
            continue;
        }
        sleep(jitter(400, 800)).await;
        if let Some(bed) = world.find_block(&is_bed, PLACED_BED_RADIUS) {
            info!("Placed bed at {}", bed.position);
            return Some(bed.position);
        }
    }

    warn!("Could not place bed - no suitable location around {}", floor);
    None
}
