//! In-process simulated world.
//!
//! A deterministic stand-in for a real server connection, used by the binary's
//! demo mode and by the test suite. Movement is instant, terrain is a flat
//! ground plane plus explicit overrides, and the day/night clock only advances
//! when driven (manually or by [`SimWorld::start_clock`]).
//!
//! The most recent [`COMMAND_LOG_CAPACITY`] commands the engine issued are
//! kept in a log readable through [`SimWorld::commands`], so tests can assert
//! on what the avatar did.

use crate::error::{AgentError, Result, WorldError, WorldResult};
use crate::types::{
    is_container, Block, BlockPos, Control, Entity, EntityId, EquipSlot, Face, GameMode, Item,
    MovementProfile, Vec3, AIR, DAY_LENGTH,
};
use crate::world::{Connection, Connector, WorldEvent, WorldInterface};
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the simulated event stream.
pub const SIM_EVENT_CAPACITY: usize = 256;
/// Wall-clock period of one clock step.
pub const CLOCK_PERIOD: Duration = Duration::from_secs(1);
/// Farthest the avatar can reach to hit, use or open something.
pub const REACH: f64 = 4.5;
/// Commands retained in the log; older ones are dropped first.
pub const COMMAND_LOG_CAPACITY: usize = 4_096;

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scenario {
    pub spawn: Vec3,
    /// Highest solid layer of the ground plane.
    pub ground_level: i32,
    pub ground_block: String,
    pub blocks: Vec<Block>,
    pub entities: Vec<SimEntity>,
    pub inventory: Vec<Item>,
    pub containers: Vec<SimContainer>,
    /// Cells where placement is refused (spawn protection).
    pub protected: Vec<BlockPos>,
    pub game_mode: GameMode,
    pub time_of_day: u32,
    /// Whether `/gamemode` commands take effect.
    pub mode_changes_allowed: bool,
    /// Game ticks added per clock step.
    pub clock_rate: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            spawn: Vec3::new(0.5, 65.0, 0.5),
            ground_level: 64,
            ground_block: "grass_block".into(),
            blocks: Vec::new(),
            entities: Vec::new(),
            inventory: Vec::new(),
            containers: Vec::new(),
            protected: Vec::new(),
            game_mode: GameMode::Creative,
            time_of_day: 1_000,
            mode_changes_allowed: true,
            clock_rate: 20,
        }
    }
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(AgentError::Scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| AgentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEntity {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(default = "default_health")]
    pub health: f64,
}

fn default_health() -> f64 {
    20.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimContainer {
    pub position: BlockPos,
    #[serde(default = "default_container")]
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

fn default_container() -> String {
    "chest".into()
}

// ---------------------------------------------------------------------------
// Command log
// ---------------------------------------------------------------------------

/// A command the engine issued, as recorded by the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldCommand {
    MoveToward(Vec3),
    CancelMovement,
    Look { yaw: f64, pitch: f64 },
    LookAt(Vec3),
    Control { control: Control, on: bool },
    Equip(String),
    Place { reference: BlockPos, target: BlockPos, block: String },
    Dig(BlockPos),
    Attack(EntityId),
    OpenContainer(BlockPos),
    Deposit { item: String, amount: u32 },
    Withdraw { item: String, amount: u32 },
    CloseContainer,
    UseBed(BlockPos),
    RequestItem { name: String, count: u32 },
    Chat(String),
    Disconnect,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct SimState {
    scenario: Scenario,
    position: Option<Vec3>,
    blocks: HashMap<BlockPos, String>,
    entities: BTreeMap<EntityId, SimEntity>,
    inventory: Vec<Item>,
    containers: HashMap<BlockPos, Vec<Item>>,
    open_container: Option<BlockPos>,
    held: Option<String>,
    controls: HashSet<Control>,
    profile: Option<MovementProfile>,
    game_mode: GameMode,
    time_of_day: u32,
    sleeping: bool,
    commands: VecDeque<WorldCommand>,
}

impl SimState {
    fn new(scenario: Scenario) -> Self {
        let mut blocks: HashMap<BlockPos, String> = scenario
            .blocks
            .iter()
            .map(|b| (b.position, b.name.clone()))
            .collect();
        let mut containers = HashMap::new();
        for container in &scenario.containers {
            blocks.insert(container.position, container.name.clone());
            containers.insert(container.position, container.items.clone());
        }
        let entities = scenario
            .entities
            .iter()
            .map(|e| (e.entity.id, e.clone()))
            .collect();

        Self {
            position: None,
            blocks,
            entities,
            inventory: scenario.inventory.clone(),
            containers,
            open_container: None,
            held: None,
            controls: HashSet::new(),
            profile: None,
            game_mode: scenario.game_mode,
            time_of_day: scenario.time_of_day % DAY_LENGTH,
            sleeping: false,
            commands: VecDeque::new(),
            scenario,
        }
    }

    fn record(&mut self, command: WorldCommand) {
        if self.commands.len() == COMMAND_LOG_CAPACITY {
            self.commands.pop_front();
        }
        self.commands.push_back(command);
    }

    fn block_name(&self, pos: BlockPos) -> String {
        if let Some(name) = self.blocks.get(&pos) {
            return name.clone();
        }
        if pos.y <= self.scenario.ground_level {
            self.scenario.ground_block.clone()
        } else {
            AIR.to_string()
        }
    }

    fn position(&self) -> WorldResult<Vec3> {
        self.position.ok_or(WorldError::NotSpawned)
    }

    fn within_reach(&self, target: Vec3, action: &'static str) -> WorldResult<()> {
        let distance = self.position()?.distance_to(&target);
        if distance > REACH {
            return Err(WorldError::rejected(action, format!("out of reach ({:.1})", distance)));
        }
        Ok(())
    }

    fn add_item(&mut self, name: &str, count: u32) -> Item {
        if let Some(stack) = self.inventory.iter_mut().find(|i| i.name == name) {
            stack.count += count;
            return stack.clone();
        }
        let item = Item::new(name, count);
        self.inventory.push(item.clone());
        item
    }

    /// Take up to `count` of `name`; returns how many were taken.
    fn take_item(&mut self, name: &str, count: u32) -> u32 {
        let Some(index) = self.inventory.iter().position(|i| i.name == name) else {
            return 0;
        };
        let stack = &mut self.inventory[index];
        let taken = count.min(stack.count);
        stack.count -= taken;
        if stack.count == 0 {
            self.inventory.remove(index);
            if self.held.as_deref() == Some(name) {
                self.held = None;
            }
        }
        taken
    }

    fn damage_of_held(&self) -> f64 {
        match self.held.as_deref() {
            Some("diamond_sword") => 7.0,
            Some("iron_sword") => 6.0,
            Some("stone_sword") => 5.0,
            Some("wooden_sword") => 4.0,
            _ => 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// SimWorld
// ---------------------------------------------------------------------------

pub struct SimWorld {
    state: Mutex<SimState>,
    events: mpsc::Sender<WorldEvent>,
}

impl SimWorld {
    /// A world in its pre-spawn state and the receiving end of its events.
    pub fn new(scenario: Scenario) -> (Arc<Self>, mpsc::Receiver<WorldEvent>) {
        let (events, rx) = mpsc::channel(SIM_EVENT_CAPACITY);
        let world = Arc::new(Self {
            state: Mutex::new(SimState::new(scenario)),
            events,
        });
        (world, rx)
    }

    /// Place the avatar at the scenario's spawn point and announce it.
    pub fn spawn(&self) {
        {
            let mut state = self.state.lock();
            state.position = Some(state.scenario.spawn);
            state.sleeping = false;
        }
        self.emit(WorldEvent::Spawned);
    }

    /// Push an event to the engine. Dropped if nobody is listening.
    pub fn emit(&self, event: WorldEvent) {
        if let Err(e) = self.events.try_send(event) {
            debug!("Sim event dropped: {}", e);
        }
    }

    pub fn set_time_of_day(&self, time: u32) {
        self.state.lock().time_of_day = time % DAY_LENGTH;
    }

    pub fn set_game_mode(&self, mode: GameMode) {
        self.state.lock().game_mode = mode;
    }

    pub fn set_position(&self, position: Vec3) {
        self.state.lock().position = Some(position);
    }

    pub fn add_entity(&self, entity: Entity, health: f64) {
        self.state
            .lock()
            .entities
            .insert(entity.id, SimEntity { entity, health });
    }

    pub fn set_block(&self, pos: BlockPos, name: impl Into<String>) {
        self.state.lock().blocks.insert(pos, name.into());
    }

    pub fn give(&self, name: &str, count: u32) {
        self.state.lock().add_item(name, count);
    }

    pub fn health(&self, id: EntityId) -> Option<f64> {
        self.state.lock().entities.get(&id).map(|e| e.health)
    }

    pub fn held_item(&self) -> Option<String> {
        self.state.lock().held.clone()
    }

    pub fn is_sleeping(&self) -> bool {
        self.state.lock().sleeping
    }

    pub fn is_container_open(&self) -> bool {
        self.state.lock().open_container.is_some()
    }

    pub fn container_items(&self, pos: BlockPos) -> Option<Vec<Item>> {
        self.state.lock().containers.get(&pos).cloned()
    }

    pub fn movement_profile(&self) -> Option<MovementProfile> {
        self.state.lock().profile
    }

    pub fn commands(&self) -> Vec<WorldCommand> {
        self.state.lock().commands.iter().cloned().collect()
    }

    pub fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    /// Advance the clock by `ticks`. A sleeping avatar sleeps through to
    /// morning and is woken.
    pub fn advance_clock(&self, ticks: u32) {
        let woke = {
            let mut state = self.state.lock();
            if state.sleeping {
                state.sleeping = false;
                state.time_of_day = 0;
                true
            } else {
                state.time_of_day = (state.time_of_day + ticks) % DAY_LENGTH;
                false
            }
        };
        if woke {
            info!("Sim: night skipped, avatar woken");
            self.emit(WorldEvent::Wake);
        }
        self.emit(WorldEvent::Signal);
    }

    /// Drive the clock once per [`CLOCK_PERIOD`] until the event stream
    /// closes.
    pub fn start_clock(self: &Arc<Self>) -> JoinHandle<()> {
        let world = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(CLOCK_PERIOD);
            timer.tick().await;
            loop {
                timer.tick().await;
                if world.events.is_closed() {
                    break;
                }
                let rate = world.state.lock().scenario.clock_rate;
                world.advance_clock(rate);
            }
            debug!("Sim clock stopped");
        })
    }

    fn record(&self, command: WorldCommand) {
        self.state.lock().record(command);
    }
}

#[async_trait]
impl WorldInterface for SimWorld {
    fn position(&self) -> Option<Vec3> {
        self.state.lock().position
    }

    fn entities(&self) -> Vec<Entity> {
        self.state
            .lock()
            .entities
            .values()
            .map(|e| e.entity.clone())
            .collect()
    }

    fn entity(&self, id: EntityId) -> Option<Entity> {
        self.state.lock().entities.get(&id).map(|e| e.entity.clone())
    }

    fn block_at(&self, pos: BlockPos) -> Option<Block> {
        let state = self.state.lock();
        state.position?;
        Some(Block::new(state.block_name(pos), pos))
    }

    fn find_block(
        &self,
        matching: &(dyn Fn(&str) -> bool + Sync),
        max_distance: f64,
    ) -> Option<Block> {
        let state = self.state.lock();
        let origin = state.position?;
        state
            .blocks
            .iter()
            .filter(|(_, name)| matching(name.as_str()))
            .map(|(pos, name)| (origin.distance_to(&pos.center()), pos, name))
            .filter(|(distance, _, _)| *distance <= max_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, pos, name)| Block::new(name.clone(), *pos))
    }

    fn inventory(&self) -> Vec<Item> {
        self.state.lock().inventory.clone()
    }

    fn game_mode(&self) -> Option<GameMode> {
        let state = self.state.lock();
        state.position.map(|_| state.game_mode)
    }

    fn time_of_day(&self) -> Option<u32> {
        let state = self.state.lock();
        state.position.map(|_| state.time_of_day)
    }

    fn can_dig(&self, pos: BlockPos) -> bool {
        let state = self.state.lock();
        let name = state.block_name(pos);
        name != AIR && name != "bedrock"
    }

    fn set_movement_profile(&self, profile: MovementProfile) {
        self.state.lock().profile = Some(profile);
    }

    fn move_toward(&self, target: Vec3, tolerance: f64) {
        let mut state = self.state.lock();
        state.record(WorldCommand::MoveToward(target));
        let Some(current) = state.position else {
            return;
        };
        let distance = current.distance_to(&target);
        if distance <= tolerance {
            return;
        }
        // Stop half the tolerance short of the goal, along the line to it.
        let t = (distance - tolerance * 0.5) / distance;
        state.position = Some(Vec3::new(
            current.x + (target.x - current.x) * t,
            current.y + (target.y - current.y) * t,
            current.z + (target.z - current.z) * t,
        ));
    }

    fn cancel_movement(&self) {
        self.record(WorldCommand::CancelMovement);
    }

    async fn look(&self, yaw: f64, pitch: f64) -> WorldResult<()> {
        let mut state = self.state.lock();
        state.position()?;
        state.record(WorldCommand::Look { yaw, pitch });
        Ok(())
    }

    async fn look_at(&self, target: Vec3) -> WorldResult<()> {
        let mut state = self.state.lock();
        state.position()?;
        state.record(WorldCommand::LookAt(target));
        Ok(())
    }

    fn set_control(&self, control: Control, on: bool) {
        let mut state = self.state.lock();
        if on {
            state.controls.insert(control);
        } else {
            state.controls.remove(&control);
        }
        state.record(WorldCommand::Control { control, on });
    }

    async fn equip(&self, item: &Item, _slot: EquipSlot) -> WorldResult<()> {
        let mut state = self.state.lock();
        state.position()?;
        if !state.inventory.iter().any(|i| i.name == item.name) {
            return Err(WorldError::rejected("equip", format!("{} not carried", item.name)));
        }
        state.held = Some(item.name.clone());
        state.record(WorldCommand::Equip(item.name.clone()));
        Ok(())
    }

    async fn place_block(&self, reference: BlockPos, face: Face) -> WorldResult<()> {
        let mut state = self.state.lock();
        state.within_reach(reference.center(), "place")?;
        let target = face.apply(reference);
        if state.block_name(reference) == AIR {
            return Err(WorldError::rejected("place", "reference block is air"));
        }
        if state.block_name(target) != AIR {
            return Err(WorldError::rejected("place", format!("{} is occupied", target)));
        }
        if state.scenario.protected.contains(&target) {
            return Err(WorldError::rejected("place", format!("{} is protected", target)));
        }
        let Some(block) = state.held.clone() else {
            return Err(WorldError::rejected("place", "nothing in hand"));
        };
        if state.game_mode != GameMode::Creative && state.take_item(&block, 1) == 0 {
            return Err(WorldError::rejected("place", format!("out of {}", block)));
        }

        state.blocks.insert(target, block.clone());
        state.record(WorldCommand::Place {
            reference,
            target,
            block,
        });
        Ok(())
    }

    async fn dig(&self, pos: BlockPos) -> WorldResult<()> {
        let mut state = self.state.lock();
        state.within_reach(pos.center(), "dig")?;
        let name = state.block_name(pos);
        if name == AIR || name == "bedrock" {
            return Err(WorldError::rejected("dig", format!("cannot dig {}", name)));
        }
        state.blocks.insert(pos, AIR.to_string());
        state.containers.remove(&pos);
        state.record(WorldCommand::Dig(pos));
        Ok(())
    }

    async fn attack(&self, target: EntityId) -> WorldResult<()> {
        let mut state = self.state.lock();
        let origin = state.position()?;
        let damage = state.damage_of_held();
        let Some(mob) = state.entities.get_mut(&target) else {
            return Err(WorldError::rejected("attack", format!("no entity {}", target)));
        };
        if !mob.entity.alive {
            return Err(WorldError::rejected("attack", format!("{} is dead", target)));
        }
        let distance = origin.distance_to(&mob.entity.position);
        if distance > REACH {
            return Err(WorldError::rejected("attack", format!("out of reach ({:.1})", distance)));
        }
        mob.health -= damage;
        if mob.health <= 0.0 {
            mob.entity.alive = false;
        }
        state.record(WorldCommand::Attack(target));
        Ok(())
    }

    async fn open_container(&self, pos: BlockPos) -> WorldResult<Vec<Item>> {
        let mut state = self.state.lock();
        state.within_reach(pos.center(), "open")?;
        if !is_container(&state.block_name(pos)) {
            return Err(WorldError::rejected("open", format!("no container at {}", pos)));
        }
        let items = state.containers.entry(pos).or_default().clone();
        state.open_container = Some(pos);
        state.record(WorldCommand::OpenContainer(pos));
        Ok(items)
    }

    async fn deposit(&self, item: &str, amount: u32) -> WorldResult<()> {
        let mut state = self.state.lock();
        let Some(pos) = state.open_container else {
            return Err(WorldError::rejected("deposit", "no container open"));
        };
        let moved = state.take_item(item, amount);
        if moved == 0 {
            return Err(WorldError::rejected("deposit", format!("{} not carried", item)));
        }
        let contents = state.containers.entry(pos).or_default();
        match contents.iter_mut().find(|i| i.name == item) {
            Some(stack) => stack.count += moved,
            None => contents.push(Item::new(item, moved)),
        }
        state.record(WorldCommand::Deposit {
            item: item.to_string(),
            amount: moved,
        });
        Ok(())
    }

    async fn withdraw(&self, item: &str, amount: u32) -> WorldResult<()> {
        let mut state = self.state.lock();
        let Some(pos) = state.open_container else {
            return Err(WorldError::rejected("withdraw", "no container open"));
        };
        let contents = state.containers.entry(pos).or_default();
        let Some(index) = contents.iter().position(|i| i.name == item) else {
            return Err(WorldError::rejected("withdraw", format!("{} not in container", item)));
        };
        let moved = amount.min(contents[index].count);
        contents[index].count -= moved;
        if contents[index].count == 0 {
            contents.remove(index);
        }
        state.add_item(item, moved);
        state.record(WorldCommand::Withdraw {
            item: item.to_string(),
            amount: moved,
        });
        Ok(())
    }

    async fn close_container(&self) {
        let mut state = self.state.lock();
        state.open_container = None;
        state.record(WorldCommand::CloseContainer);
    }

    async fn use_bed(&self, pos: BlockPos) -> WorldResult<()> {
        let mut state = self.state.lock();
        state.within_reach(pos.center(), "sleep")?;
        if !crate::types::is_bed(&state.block_name(pos)) {
            return Err(WorldError::rejected("sleep", format!("no bed at {}", pos)));
        }
        if !crate::types::is_night(state.time_of_day) {
            return Err(WorldError::rejected("sleep", "you can only sleep at night"));
        }
        state.sleeping = true;
        state.record(WorldCommand::UseBed(pos));
        Ok(())
    }

    async fn request_item(&self, name: &str, count: u32) -> WorldResult<Option<Item>> {
        let mut state = self.state.lock();
        state.position()?;
        state.record(WorldCommand::RequestItem {
            name: name.to_string(),
            count,
        });
        if state.game_mode != GameMode::Creative {
            return Err(WorldError::rejected("request", "not in creative mode"));
        }
        Ok(Some(state.add_item(name, count)))
    }

    async fn send_command(&self, command: &str) -> WorldResult<()> {
        let mut state = self.state.lock();
        state.position()?;
        state.record(WorldCommand::Chat(command.to_string()));
        if let Some(mode) = command.strip_prefix("/gamemode ") {
            if state.scenario.mode_changes_allowed {
                if let Ok(mode) = GameMode::from_str(mode.trim()) {
                    state.game_mode = mode;
                }
            }
        }
        Ok(())
    }

    async fn disconnect(&self) {
        {
            let mut state = self.state.lock();
            state.position = None;
            state.record(WorldCommand::Disconnect);
        }
        self.emit(WorldEvent::Disconnected);
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Opens a fresh [`SimWorld`] per connection: connected, spawned and with its
/// clock running.
pub struct SimConnector {
    scenario: Scenario,
}

impl SimConnector {
    pub fn new(scenario: Scenario) -> Self {
        Self { scenario }
    }
}

#[async_trait]
impl Connector for SimConnector {
    async fn connect(&self) -> WorldResult<Connection> {
        let (world, events) = SimWorld::new(self.scenario.clone());
        world.emit(WorldEvent::Connected);
        world.spawn();
        world.start_clock();
        Ok(Connection { world, events })
    }
}
