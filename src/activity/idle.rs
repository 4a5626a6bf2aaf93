use crate::arbiter::ControlGrant;
use crate::context::AgentContext;
use crate::error::WorldResult;
use crate::motion::{look_around, random_gesture};
use crate::pacing::{chance, jitter, uniform_int};
use log::info;
use tokio::time::sleep;

/// A few rounds of looking around and fidgeting in place.
pub async fn idle(ctx: &AgentContext, grant: &ControlGrant) -> WorldResult<()> {
    let world = ctx.world.as_ref();
    let rounds = uniform_int(2, 4);
    info!("Idling for {} rounds", rounds);

    for _ in 0..rounds {
        if ctx.should_yield(grant).await {
            return Ok(());
        }
        look_around(world).await;
        sleep(jitter(1_000, 3_000)).await;
        if chance(0.4) {
            random_gesture(world).await;
        }
    }
    Ok(())
}
