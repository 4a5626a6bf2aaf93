use super::idle;
use crate::arbiter::ControlGrant;
use crate::context::AgentContext;
use crate::error::{WorldError, WorldResult};
use crate::motion::look_around;
use crate::pacing::{jitter, shuffle, uniform_int};
use crate::provision::{ensure_item, hold};
use crate::types::{BlockPos, Face};
use crate::world::WorldInterface;
use log::{debug, info, warn};
use tokio::time::sleep;

/// Build blocks that must be on hand before a round; provisioned if short.
const RESTOCK: u32 = 1;

/// Where a block goes and what it is placed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub target: BlockPos,
    pub reference: BlockPos,
    pub face: Face,
}

/// The four horizontal neighbors of the avatar's feet, each placed on top of
/// the block beneath it.
pub fn lateral_candidates(floor: BlockPos) -> Vec<Placement> {
    [(1, 0), (-1, 0), (0, 1), (0, -1)]
        .into_iter()
        .map(|(dx, dz)| {
            let target = floor.offset(dx, 0, dz);
            Placement {
                target,
                reference: target.below(),
                face: Face::UP,
            }
        })
        .collect()
}

/// Place and remove one to three blocks next to the avatar.
///
/// Falls back to idling when building is disabled.
pub async fn build(ctx: &AgentContext, grant: &ControlGrant) -> WorldResult<()> {
    if !ctx.config.building_enabled {
        return idle(ctx, grant).await;
    }

    let world = ctx.world.as_ref();
    let rounds = uniform_int(1, 3);
    info!("Building {} block(s) of {}", rounds, ctx.config.block_type);

    for round in 0..rounds {
        if ctx.should_yield(grant).await {
            return Ok(());
        }
        if round > 0 {
            sleep(jitter(2_000, 5_000)).await;
        }
        look_around(world).await;
        sleep(jitter(300, 800)).await;
        place_and_break(ctx, world).await?;
    }
    Ok(())
}

async fn place_and_break(ctx: &AgentContext, world: &dyn WorldInterface) -> WorldResult<()> {
    let block_type = ctx.config.block_type.as_str();
    let Some(item) = ensure_item(world, block_type, RESTOCK).await else {
        warn!("No {} available to build with", block_type);
        return Ok(());
    };
    if !hold(world, &item, 200, 500).await {
        return Ok(());
    }

    let floor = world.position().ok_or(WorldError::NotSpawned)?.floored();
    let mut candidates = lateral_candidates(floor);
    shuffle(&mut candidates);

    let mut placed = None;
    for spot in candidates {
        let free = world.block_at(spot.target).is_some_and(|b| b.is_air());
        let solid = world.block_at(spot.reference).is_some_and(|b| !b.is_air());
        if !(free && solid) {
            continue;
        }

        if let Err(e) = world.place_block(spot.reference, spot.face).await {
            debug!("Placing {} at {} failed: {}", block_type, spot.target, e);
            continue;
        }
        sleep(jitter(400, 800)).await;

        if world.block_at(spot.target).is_some_and(|b| b.name == block_type) {
            placed = Some(spot.target);
            break;
        }
        warn!("Placement of {} at {} did not take", block_type, spot.target);
    }
    let Some(target) = placed else {
        info!("Could not place {} anywhere around {}", block_type, floor);
        return Ok(());
    };
    info!("Placed {} at {}", block_type, target);

    sleep(jitter(1_000, 3_000)).await;
    look_around(world).await;

    let still_there = world.block_at(target).is_some_and(|b| b.name == block_type);
    if still_there && world.can_dig(target) {
        world.dig(target).await?;
        info!("Removed {} at {}", block_type, target);
    }
    Ok(())
}
