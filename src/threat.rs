//! Threat detection and targeting verdicts.
//!
//! Pure functions over an entity snapshot: no world access, no timing. The
//! threat monitor ([`crate::combat`]) recomputes these every scan; nothing
//! here survives between scans.
//!
//! ## Species classes
//!
//! | Class            | Targeting when                                        |
//! |------------------|-------------------------------------------------------|
//! | `AlwaysEngage`   | within engagement distance                            |
//! | `FlagGated`      | within engagement distance and an aggression flag is set, or within the class fallback distance |
//! | `AlwaysHostile`  | within engagement distance (special-case mobs)        |

use crate::config::CombatSettings;
use crate::types::{Entity, EntityFlags, EntityId, Vec3};
use std::cmp::Ordering;

/// Common hostiles engaged on sight.
pub const ALWAYS_ENGAGE: [&str; 24] = [
    "zombie",
    "zombie_villager",
    "husk",
    "drowned",
    "skeleton",
    "stray",
    "wither_skeleton",
    "creeper",
    "spider",
    "cave_spider",
    "witch",
    "blaze",
    "ghast",
    "slime",
    "magma_cube",
    "silverfish",
    "phantom",
    "vex",
    "vindicator",
    "evoker",
    "pillager",
    "ravager",
    "hoglin",
    "zoglin",
];

/// Special-case mobs counted as targeting whenever they are close enough.
pub const ALWAYS_HOSTILE: [&str; 6] = [
    "piglin_brute",
    "guardian",
    "elder_guardian",
    "shulker",
    "wither",
    "endermite",
];

/// Distance under which piglins count as targeting even without a flag.
pub const PIGLIN_FALLBACK_DISTANCE: f64 = 5.0;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostileClass {
    AlwaysEngage,
    FlagGated {
        /// Flags that mark the mob as provoked.
        flags: EntityFlags,
        /// Distance under which it counts as targeting regardless of flags.
        fallback: Option<f64>,
    },
    AlwaysHostile,
}

/// Species class for a hostile, or `None` for anything off the allow-list.
pub fn classify_species(species: &str) -> Option<HostileClass> {
    if ALWAYS_ENGAGE.contains(&species) {
        return Some(HostileClass::AlwaysEngage);
    }
    if ALWAYS_HOSTILE.contains(&species) {
        return Some(HostileClass::AlwaysHostile);
    }
    match species {
        "enderman" => Some(HostileClass::FlagGated {
            flags: EntityFlags::ALERT,
            fallback: None,
        }),
        "zombified_piglin" | "piglin" => Some(HostileClass::FlagGated {
            flags: EntityFlags::ALERT | EntityFlags::CHARGING,
            fallback: Some(PIGLIN_FALLBACK_DISTANCE),
        }),
        _ => None,
    }
}

pub fn is_hostile(species: &str) -> bool {
    classify_species(species).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Hostile,
    Neutral,
}

/// One entity's assessment for the current scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatRecord {
    pub entity: EntityId,
    pub species: String,
    pub disposition: Disposition,
    pub distance: f64,
    /// Whether the entity is actively threatening the avatar.
    pub targeting: bool,
}

/// Targeting verdict for an entity of class `class` at `distance`.
pub fn is_targeting(
    class: HostileClass,
    flags: EntityFlags,
    distance: f64,
    engagement_distance: f64,
) -> bool {
    if distance > engagement_distance {
        return false;
    }
    match class {
        HostileClass::AlwaysEngage | HostileClass::AlwaysHostile => true,
        HostileClass::FlagGated {
            flags: provoked,
            fallback,
        } => flags.intersects(provoked) || fallback.is_some_and(|d| distance <= d),
    }
}

/// Assess a single entity as seen from `origin`.
pub fn assess(entity: &Entity, origin: &Vec3, settings: &CombatSettings) -> ThreatRecord {
    let distance = origin.distance_to(&entity.position);
    let (disposition, targeting) = match classify_species(&entity.species) {
        Some(class) => (
            Disposition::Hostile,
            is_targeting(class, entity.flags, distance, settings.engagement_distance),
        ),
        None => (Disposition::Neutral, false),
    };
    ThreatRecord {
        entity: entity.id,
        species: entity.species.clone(),
        disposition,
        distance,
        targeting,
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Hostile, living entities within the detection radius, nearest first.
pub fn scan(origin: &Vec3, entities: &[Entity], settings: &CombatSettings) -> Vec<ThreatRecord> {
    let mut threats: Vec<ThreatRecord> = entities
        .iter()
        .filter(|e| e.alive)
        .map(|e| assess(e, origin, settings))
        .filter(|t| t.disposition == Disposition::Hostile)
        .filter(|t| t.distance <= settings.detection_radius)
        .collect();
    threats.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    threats
}

/// The single combat target for this scan: the nearest targeting hostile.
pub fn select_target(threats: &[ThreatRecord]) -> Option<&ThreatRecord> {
    threats.iter().find(|t| t.targeting)
}
