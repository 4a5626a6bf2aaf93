//! Foreground activity scheduler.
//!
//! One cycle at a time: stay suspended while asleep or fighting, go to bed
//! when night falls, otherwise pick a weighted-random activity, run it under
//! `Activity` control and pause to "think" before the next one. The thinking
//! pause keeps control but is always preemptible by combat.

use crate::activity::Activity;
use crate::arbiter::Role;
use crate::context::AgentContext;
use crate::pacing::jitter;
use crate::sleep::{attempt_sleep, SleepOutcome};
use crate::types::Vec3;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Poll interval while suspended or refused control.
pub const SUSPENDED_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Selecting,
    Exploring,
    Building,
    Idling,
    Interacting,
    Sleeping,
    Suspended,
}

impl From<Activity> for SchedulerState {
    fn from(activity: Activity) -> Self {
        match activity {
            Activity::Explore => SchedulerState::Exploring,
            Activity::Build => SchedulerState::Building,
            Activity::Idle => SchedulerState::Idling,
            Activity::Interact => SchedulerState::Interacting,
        }
    }
}

/// What one scheduler cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// Asleep or in combat; nothing was attempted.
    Suspended,
    /// Another holder refused us control.
    Contended,
    Slept(SleepOutcome),
    Ran(Activity),
}

pub struct ActivityScheduler {
    ctx: AgentContext,
    anchor: Option<Vec3>,
    life: Option<u64>,
    state: SchedulerState,
}

impl ActivityScheduler {
    pub fn new(ctx: AgentContext) -> Self {
        Self {
            ctx,
            anchor: None,
            life: None,
            state: SchedulerState::Selecting,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Center of the current explore range, captured on first exploration
    /// after each spawn.
    pub fn anchor(&self) -> Option<Vec3> {
        self.anchor
    }

    /// Run one scheduling cycle.
    pub async fn cycle(&mut self) -> Cycle {
        let Ok(snap) = self.ctx.arbiter.snapshot().await else {
            self.state = SchedulerState::Suspended;
            return Cycle::Suspended;
        };

        if self.life != Some(snap.life) {
            if self.life.is_some() {
                debug!("New life - explore anchor will be recaptured");
            }
            self.life = Some(snap.life);
            self.anchor = None;
        }

        if snap.sleeping || snap.in_combat {
            self.state = SchedulerState::Suspended;
            return Cycle::Suspended;
        }

        if self.ctx.sleep_due(snap.sleeping) {
            self.state = SchedulerState::Sleeping;
            let outcome = attempt_sleep(&self.ctx).await;
            self.state = SchedulerState::Selecting;
            return Cycle::Slept(outcome);
        }

        self.state = SchedulerState::Selecting;
        let picked = Activity::pick(&mut rand::thread_rng());
        let activity = picked.resolve(&self.ctx);
        if activity != picked {
            debug!("{} unavailable, idling instead", picked);
        }
        let role = Role::Activity {
            preemptible: activity.is_preemptible(),
        };
        let Ok(Some(mut grant)) = self.ctx.arbiter.acquire(role).await else {
            return Cycle::Contended;
        };

        info!("Starting activity: {}", activity);
        self.state = activity.into();
        if let Err(e) = activity.run(&self.ctx, &grant, &mut self.anchor).await {
            warn!("Activity {} failed: {}", activity, e);
        }

        // Still held while thinking so fillers stay out, but combat may cut in.
        grant.relax();
        self.state = SchedulerState::Selecting;
        let pause = jitter(2_000, 8_000);
        debug!("Thinking for {:.1}s", pause.as_secs_f64());
        sleep(pause).await;

        self.ctx.arbiter.touch_activity();
        grant.release();
        Cycle::Ran(activity)
    }

    /// Cycle until `stop` fires, starting after `startup`.
    pub async fn run(mut self, stop: CancellationToken, startup: Duration) {
        tokio::select! {
            _ = stop.cancelled() => return,
            _ = sleep(startup) => {}
        }
        info!("Activity scheduler started");

        loop {
            let cycle = tokio::select! {
                _ = stop.cancelled() => break,
                cycle = self.cycle() => cycle,
            };
            if matches!(cycle, Cycle::Suspended | Cycle::Contended) {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = sleep(SUSPENDED_POLL) => {}
                }
            }
        }

        debug!("Activity scheduler stopped");
    }
}
