use super::idle;
use crate::arbiter::ControlGrant;
use crate::context::AgentContext;
use crate::error::{WorldError, WorldResult};
use crate::motion::{look_around, travel, ArrivalOutcome, Trip};
use crate::pacing::{chance, jitter};
use crate::types::{is_container, Item};
use crate::world::WorldInterface;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;

const TRAVEL_THRESHOLD: f64 = 3.0;
const TRAVEL_TOLERANCE: f64 = 2.0;
const TRAVEL_TIMEOUT: Duration = Duration::from_secs(10);

/// First stack whose name contains `fragment`.
pub fn find_by_fragment<'a>(items: &'a [Item], fragment: &str) -> Option<&'a Item> {
    items.iter().find(|i| i.name.contains(fragment))
}

/// Walk to the nearest container, open it and shuffle some items around.
///
/// Falls back to idling when the behavior is disabled or nothing is in range.
pub async fn interact(ctx: &AgentContext, grant: &ControlGrant) -> WorldResult<()> {
    let settings = &ctx.config.chest_interaction;
    if !settings.enabled {
        return idle(ctx, grant).await;
    }

    let world = ctx.world.as_ref();
    let Some(container) = world.find_block(&is_container, settings.search_radius) else {
        info!("No container within {} blocks", settings.search_radius);
        return idle(ctx, grant).await;
    };
    let pos = container.position;
    info!("Found {} at {}", container.name, pos);

    let position = world.position().ok_or(WorldError::NotSpawned)?;
    if position.distance_to(&pos.center()) > TRAVEL_THRESHOLD {
        let trip = Trip::new(pos.center(), TRAVEL_TOLERANCE, TRAVEL_THRESHOLD, TRAVEL_TIMEOUT);
        match travel(ctx, grant, trip).await {
            ArrivalOutcome::Interrupted => return Ok(()),
            ArrivalOutcome::Lost => return Err(WorldError::NotSpawned),
            ArrivalOutcome::Arrived | ArrivalOutcome::TimedOut => {}
        }
    }

    sleep(jitter(500, 1_000)).await;
    look_around(world).await;

    let contents = world.open_container(pos).await?;
    info!("Opened container at {} ({} stacks)", pos, contents.len());
    sleep(jitter(800, 1_500)).await;

    transfer(world, &contents, &settings.deposit_items, &settings.withdraw_items).await;

    sleep(jitter(500, 1_200)).await;
    world.close_container().await;
    info!("Closed container at {}", pos);
    Ok(())
}

async fn transfer(
    world: &dyn WorldInterface,
    contents: &[Item],
    deposits: &BTreeMap<String, u32>,
    withdrawals: &BTreeMap<String, u32>,
) {
    if !deposits.is_empty() && chance(0.5) {
        let inventory = world.inventory();
        for (fragment, &requested) in deposits {
            let Some(item) = find_by_fragment(&inventory, fragment) else {
                debug!("Nothing matching {} to deposit", fragment);
                continue;
            };
            let amount = requested.min(item.count);
            if amount == 0 {
                continue;
            }
            match world.deposit(&item.name, amount).await {
                Ok(()) => info!("Deposited {}x {}", amount, item.name),
                Err(e) => warn!("Deposit of {} failed: {}", item.name, e),
            }
            sleep(jitter(400, 900)).await;
        }
    }

    if !withdrawals.is_empty() && chance(0.5) {
        for (fragment, &requested) in withdrawals {
            let Some(item) = find_by_fragment(contents, fragment) else {
                debug!("Nothing matching {} to withdraw", fragment);
                continue;
            };
            let amount = requested.min(item.count);
            if amount == 0 {
                continue;
            }
            match world.withdraw(&item.name, amount).await {
                Ok(()) => info!("Withdrew {}x {}", amount, item.name),
                Err(e) => warn!("Withdrawal of {} failed: {}", item.name, e),
            }
            sleep(jitter(400, 900)).await;
        }
    }
}
