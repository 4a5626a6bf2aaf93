//! Foreground behaviors the scheduler picks from.
//!
//! Behaviors are best-effort: they return a [`WorldResult`] so `?` can cut a
//! sequence short, and the scheduler logs the error and moves on. Each one
//! checks for preemption (combat, nightfall, a superseded grant) at bounded
//! intervals and returns early when it appears.

mod build;
mod explore;
mod idle;
mod interact;

pub use build::{build, lateral_candidates, Placement};
pub use explore::explore;
pub use idle::idle;
pub use interact::{find_by_fragment, interact};

use crate::arbiter::ControlGrant;
use crate::context::AgentContext;
use crate::error::WorldResult;
use crate::pacing::weighted_index;
use crate::types::{is_container, Vec3};
use rand::Rng;
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Activity {
    Explore,
    Build,
    Idle,
    Interact,
}

impl Activity {
    /// Selection weights: exploration three times as likely as the rest.
    pub const WEIGHTS: [(Activity, u32); 4] = [
        (Activity::Explore, 3),
        (Activity::Build, 1),
        (Activity::Idle, 1),
        (Activity::Interact, 1),
    ];

    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Activity {
        let weights = Self::WEIGHTS.map(|(_, w)| w);
        weighted_index(rng, &weights)
            .map(|i| Self::WEIGHTS[i].0)
            .unwrap_or(Activity::Idle)
    }

    /// The behavior that will actually run for this pick. Build and interact
    /// fall back to idling when disabled or, for interact, when no container
    /// is in range.
    pub fn resolve(self, ctx: &AgentContext) -> Activity {
        match self {
            Activity::Build if !ctx.config.building_enabled => Activity::Idle,
            Activity::Interact => {
                let settings = &ctx.config.chest_interaction;
                let in_range = settings.enabled
                    && ctx
                        .world
                        .find_block(&is_container, settings.search_radius)
                        .is_some();
                if in_range {
                    Activity::Interact
                } else {
                    Activity::Idle
                }
            }
            other => other,
        }
    }

    /// Whether combat may take over mid-behavior. Placing a block or holding
    /// a container open must finish first.
    pub fn is_preemptible(&self) -> bool {
        matches!(self, Activity::Explore | Activity::Idle)
    }

    pub async fn run(
        self,
        ctx: &AgentContext,
        grant: &ControlGrant,
        anchor: &mut Option<Vec3>,
    ) -> WorldResult<()> {
        match self {
            Activity::Explore => explore(ctx, grant, anchor).await,
            Activity::Build => build(ctx, grant).await,
            Activity::Idle => idle(ctx, grant).await,
            Activity::Interact => interact(ctx, grant).await,
        }
    }
}
