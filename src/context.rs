//! Per-connection context handed to every component constructor.

use crate::arbiter::{ArbiterHandle, ControlGrant};
use crate::config::AgentConfig;
use crate::world::{self, WorldEvent, WorldInterface};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the world event fan-out. Slow listeners only miss events they
/// were not waiting for.
pub const EVENT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct AgentContext {
    pub world: Arc<dyn WorldInterface>,
    pub config: Arc<AgentConfig>,
    pub arbiter: ArbiterHandle,
    pub events: broadcast::Sender<WorldEvent>,
}

impl AgentContext {
    pub fn new(
        world: Arc<dyn WorldInterface>,
        config: Arc<AgentConfig>,
        arbiter: ArbiterHandle,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            world,
            config,
            arbiter,
            events,
        }
    }

    pub fn is_night(&self) -> bool {
        world::is_night(self.world.as_ref())
    }

    /// Night has fallen, auto-sleep is on and nobody is asleep yet.
    pub fn sleep_due(&self, sleeping: bool) -> bool {
        self.config.auto_sleep && !sleeping && self.is_night()
    }

    /// Whether the behavior holding `grant` must stop at its next check:
    /// its grant was superseded, combat started, or sleep is due.
    pub async fn should_yield(&self, grant: &ControlGrant) -> bool {
        match self.arbiter.snapshot().await {
            Ok(snap) => !snap.holds(grant.id()) || snap.in_combat || self.sleep_due(snap.sleeping),
            Err(_) => true,
        }
    }
}
