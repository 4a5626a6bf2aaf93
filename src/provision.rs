//! Item provisioning: carried inventory first, privileged request second.

use crate::pacing::jitter;
use crate::types::{is_bed, EquipSlot, Item};
use crate::world::WorldInterface;
use log::{debug, info, warn};
use tokio::time::sleep;

/// Fallback weapons, best first.
pub const WEAPON_FALLBACK: [&str; 4] = ["diamond_sword", "iron_sword", "stone_sword", "wooden_sword"];

/// Bed item requested when none is carried.
pub const PROVISIONED_BED: &str = "red_bed";

/// Whether the avatar may request items right now.
pub fn is_privileged(world: &dyn WorldInterface) -> bool {
    world.game_mode().is_some_and(|m| m.is_privileged())
}

/// Privileged request, treated as unavailable outside the privileged mode.
pub async fn request(world: &dyn WorldInterface, name: &str, count: u32) -> Option<Item> {
    if !is_privileged(world) {
        return None;
    }
    info!("Requesting {}x {} through privileged provisioning", count, name);
    match world.request_item(name, count).await {
        Ok(Some(item)) if item.name == name => Some(item),
        Ok(_) => {
            warn!("Provisioning {} returned nothing", name);
            None
        }
        Err(e) => {
            warn!("Provisioning {} failed: {}", name, e);
            None
        }
    }
}

/// An inventory stack of `name` with at least `min_count`, provisioning the
/// shortfall when allowed. Falls back to a short stack if that is all there is.
pub async fn ensure_item(world: &dyn WorldInterface, name: &str, min_count: u32) -> Option<Item> {
    let existing = world.inventory().into_iter().find(|i| i.name == name);
    if let Some(item) = &existing {
        if item.count >= min_count {
            debug!("Already carrying {}x {}", item.count, name);
            return existing;
        }
    }

    let carried = existing.as_ref().map_or(0, |i| i.count);
    let needed = min_count.saturating_sub(carried).max(1);
    if let Some(item) = request(world, name, needed).await {
        return Some(item);
    }
    existing
}

/// Equip the best available weapon: the preferred one, then the fallback
/// list. Returns the equipped item, or `None` if no weapon can be had.
pub async fn equip_weapon(world: &dyn WorldInterface, preferred: &str) -> Option<Item> {
    let mut candidates = vec![preferred];
    for name in WEAPON_FALLBACK {
        if !candidates.contains(&name) {
            candidates.push(name);
        }
    }

    for name in candidates {
        let Some(weapon) = ensure_item(world, name, 1).await else {
            continue;
        };
        match world.equip(&weapon, EquipSlot::Hand).await {
            Ok(()) => {
                info!("Equipped {}", name);
                return Some(weapon);
            }
            Err(e) => debug!("Could not equip {}: {}", name, e),
        }
    }

    warn!("No weapon available");
    None
}

/// A carried bed, or a provisioned one.
pub async fn ensure_bed(world: &dyn WorldInterface) -> Option<Item> {
    if let Some(bed) = world.inventory().into_iter().find(|i| is_bed(&i.name)) {
        debug!("Already carrying {}", bed.name);
        return Some(bed);
    }
    request(world, PROVISIONED_BED, 1).await
}

/// Equip `item` in hand and give the swap a moment to settle.
pub async fn hold(world: &dyn WorldInterface, item: &Item, min_ms: u64, max_ms: u64) -> bool {
    match world.equip(item, EquipSlot::Hand).await {
        Ok(()) => {
            sleep(jitter(min_ms, max_ms)).await;
            true
        }
        Err(e) => {
            warn!("Failed to equip {}: {}", item.name, e);
            false
        }
    }
}
