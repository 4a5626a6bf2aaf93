//! Core world types shared across all modules.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn distance_to(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Horizontal (x/z plane) distance, ignoring height.
    pub fn horizontal_distance_to(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// The block cell containing this point.
    pub fn floored(&self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Block grid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn below(&self) -> Self {
        self.offset(0, -1, 0)
    }

    pub fn above(&self) -> Self {
        self.offset(0, 1, 0)
    }

    /// Center of the block's bottom face, used as a movement target.
    pub fn center(&self) -> Vec3 {
        Vec3::new(self.x as f64 + 0.5, self.y as f64, self.z as f64 + 0.5)
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{},{}]", self.x, self.y, self.z)
    }
}

/// Face normal passed with a placement; the new block appears on that side of
/// the reference block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
}

impl Face {
    pub const UP: Face = Face { dx: 0, dy: 1, dz: 0 };

    pub fn apply(&self, pos: BlockPos) -> BlockPos {
        pos.offset(self.dx, self.dy, self.dz)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub position: BlockPos,
}

impl Block {
    pub fn new(name: impl Into<String>, position: BlockPos) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }

    pub fn is_air(&self) -> bool {
        self.name == AIR
    }
}

pub const AIR: &str = "air";

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Aggression metadata bits reported for an entity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct EntityFlags: u8 {
        /// Screaming/staring state (enderman-style provocation).
        const ALERT = 0b0000_0001;
        /// Angered/charging state (piglin-style aggression).
        const CHARGING = 0b0000_0010;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Registry name of the species, e.g. `zombie`.
    pub species: String,
    pub position: Vec3,
    #[serde(default = "default_entity_height")]
    pub height: f64,
    #[serde(default)]
    pub flags: EntityFlags,
    #[serde(default = "default_alive")]
    pub alive: bool,
}

fn default_entity_height() -> f64 {
    1.8
}

fn default_alive() -> bool {
    true
}

impl Entity {
    pub fn new(id: u32, species: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: EntityId(id),
            species: species.into(),
            position,
            height: default_entity_height(),
            flags: EntityFlags::empty(),
            alive: true,
        }
    }

    pub fn with_flags(mut self, flags: EntityFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Point halfway up the body, where the avatar looks when fighting.
    pub fn eye_target(&self) -> Vec3 {
        self.position.offset(0.0, self.height * 0.5, 0.0)
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub count: u32,
    #[serde(default)]
    pub slot: Option<u16>,
}

impl Item {
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        Self {
            name: name.into(),
            count,
            slot: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EquipSlot {
    Hand,
    OffHand,
}

// ---------------------------------------------------------------------------
// Avatar state
// ---------------------------------------------------------------------------

/// Privilege mode of the avatar. `Creative` is the privileged mode that
/// grants unrestricted item provisioning.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GameMode {
    Survival,
    #[default]
    Creative,
    Adventure,
    Spectator,
}

impl GameMode {
    pub fn is_privileged(&self) -> bool {
        matches!(self, GameMode::Creative)
    }
}

/// Boolean movement controls that can be held on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Control {
    Jump,
    Sneak,
}

/// Pathing options handed to the world's movement planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementProfile {
    pub can_dig: bool,
    pub allow_towers: bool,
    pub allow_scaffolding: bool,
}

impl MovementProfile {
    pub fn new(can_dig: bool) -> Self {
        Self {
            can_dig,
            allow_towers: false,
            allow_scaffolding: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Day / night
// ---------------------------------------------------------------------------

/// Ticks in a full day.
pub const DAY_LENGTH: u32 = 24_000;
/// First tick of the night window (inclusive).
pub const DUSK: u32 = 13_000;
/// First tick after the night window (exclusive bound).
pub const DAWN: u32 = 23_000;

/// Whether a time-of-day value falls in the dusk–dawn window.
pub fn is_night(time_of_day: u32) -> bool {
    (DUSK..DAWN).contains(&(time_of_day % DAY_LENGTH))
}

/// Bed block/item names recognized as sleep-capable.
pub const BED_NAMES: [&str; 16] = [
    "red_bed",
    "blue_bed",
    "green_bed",
    "yellow_bed",
    "white_bed",
    "black_bed",
    "brown_bed",
    "cyan_bed",
    "gray_bed",
    "light_blue_bed",
    "light_gray_bed",
    "lime_bed",
    "magenta_bed",
    "orange_bed",
    "pink_bed",
    "purple_bed",
];

pub fn is_bed(name: &str) -> bool {
    BED_NAMES.contains(&name)
}

/// Container block names the interact activity opens.
pub const CONTAINER_NAMES: [&str; 2] = ["chest", "trapped_chest"];

pub fn is_container(name: &str) -> bool {
    CONTAINER_NAMES.contains(&name)
}
