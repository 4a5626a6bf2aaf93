//! World interface – the contract the engine consumes.
//!
//! Protocol handling, path planning and perception live behind
//! [`WorldInterface`]; the engine only queries snapshots and issues commands.
//!
//! ## Event contract (inbound)
//!
//! | Event          | Effect                                              |
//! |----------------|-----------------------------------------------------|
//! | `Connected`    | logged                                              |
//! | `Spawned`      | reconnect counter reset, anchor captured, monitors start |
//! | `Died`         | anchor + combat/sleep flags reset                   |
//! | `Wake`         | releases a sleeping scheduler                       |
//! | `Signal`       | refreshes the liveness timestamp                    |
//! | `Chat`         | counts as observed activity                         |
//! | `Kicked`/`Disconnected` | hands control to the reconnection supervisor |
//! | `Error`        | fatal if authentication, logged otherwise           |

use crate::error::{WorldError, WorldResult};
use crate::types::{
    Block, BlockPos, Control, Entity, EntityId, EquipSlot, Face, GameMode, Item, MovementProfile,
    Vec3,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Connected,
    Spawned,
    Died,
    Wake,
    /// Any inbound traffic from the world.
    Signal,
    TimeChanged(u32),
    Chat { username: String, message: String },
    Kicked(String),
    Disconnected,
    Error(WorldError),
}

// ---------------------------------------------------------------------------
// World interface
// ---------------------------------------------------------------------------

/// Queries and commands against the connected world.
///
/// Queries return snapshots; `None` means "not known yet" (before spawn).
/// Commands that can be refused return a [`WorldResult`].
#[async_trait]
pub trait WorldInterface: Send + Sync {
    // --- queries ---------------------------------------------------------

    fn position(&self) -> Option<Vec3>;
    fn entities(&self) -> Vec<Entity>;
    fn entity(&self, id: EntityId) -> Option<Entity>;
    fn block_at(&self, pos: BlockPos) -> Option<Block>;
    /// Nearest block whose name satisfies `matching`, within `max_distance`.
    fn find_block(&self, matching: &(dyn Fn(&str) -> bool + Sync), max_distance: f64)
        -> Option<Block>;
    fn inventory(&self) -> Vec<Item>;
    fn game_mode(&self) -> Option<GameMode>;
    fn time_of_day(&self) -> Option<u32>;
    fn can_dig(&self, pos: BlockPos) -> bool;

    // --- movement --------------------------------------------------------

    fn set_movement_profile(&self, profile: MovementProfile);
    /// Hand a goal to the movement planner; returns immediately.
    fn move_toward(&self, target: Vec3, tolerance: f64);
    fn cancel_movement(&self);
    async fn look(&self, yaw: f64, pitch: f64) -> WorldResult<()>;
    async fn look_at(&self, target: Vec3) -> WorldResult<()>;
    fn set_control(&self, control: Control, on: bool);

    // --- interaction -----------------------------------------------------

    async fn equip(&self, item: &Item, slot: EquipSlot) -> WorldResult<()>;
    async fn place_block(&self, reference: BlockPos, face: Face) -> WorldResult<()>;
    async fn dig(&self, pos: BlockPos) -> WorldResult<()>;
    async fn attack(&self, target: EntityId) -> WorldResult<()>;
    /// Open the container at `pos` and return its contents.
    async fn open_container(&self, pos: BlockPos) -> WorldResult<Vec<Item>>;
    async fn deposit(&self, item: &str, amount: u32) -> WorldResult<()>;
    async fn withdraw(&self, item: &str, amount: u32) -> WorldResult<()>;
    async fn close_container(&self);
    async fn use_bed(&self, pos: BlockPos) -> WorldResult<()>;
    /// Privileged provisioning; only honored in the privileged mode.
    async fn request_item(&self, name: &str, count: u32) -> WorldResult<Option<Item>>;
    /// Issue a slash command (e.g. a mode correction).
    async fn send_command(&self, command: &str) -> WorldResult<()>;

    async fn disconnect(&self);
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// A live connection: the world handle plus its lifecycle event stream.
///
/// The stream ending is treated as a disconnect.
pub struct Connection {
    pub world: Arc<dyn WorldInterface>,
    pub events: mpsc::Receiver<WorldEvent>,
}

/// Opens connections for the reconnection supervisor.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> WorldResult<Connection>;
}

/// Current time of day classified against the night window.
pub fn is_night(world: &dyn WorldInterface) -> bool {
    world.time_of_day().is_some_and(crate::types::is_night)
}
