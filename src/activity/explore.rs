use crate::arbiter::ControlGrant;
use crate::context::AgentContext;
use crate::error::{WorldError, WorldResult};
use crate::motion::{look_around, random_gesture, travel, ArrivalOutcome, Trip};
use crate::pacing::{chance, jitter};
use crate::types::Vec3;
use crate::waypoints::{generate_waypoints, stop_count};
use log::info;
use tokio::time::sleep;

/// Wander through a handful of random waypoints around the anchor.
///
/// The anchor is captured from the current position if none is set yet.
pub async fn explore(
    ctx: &AgentContext,
    grant: &ControlGrant,
    anchor: &mut Option<Vec3>,
) -> WorldResult<()> {
    let world = ctx.world.as_ref();
    let position = world.position().ok_or(WorldError::NotSpawned)?;
    let center = *anchor.get_or_insert(position);

    let waypoints = {
        let mut rng = rand::thread_rng();
        let count = stop_count(&mut rng);
        generate_waypoints(&mut rng, center, count, ctx.config.explore_radius)
    };
    info!("Exploring {} random locations around {}", waypoints.len(), center);

    let total = waypoints.len();
    for (i, waypoint) in waypoints.into_iter().enumerate() {
        if ctx.should_yield(grant).await {
            info!("Exploration interrupted before stop {}/{}", i + 1, total);
            return Ok(());
        }

        info!("Moving to location {}/{} {}", i + 1, total, waypoint.position);
        let trip = Trip::new(
            waypoint.position,
            waypoint.tolerance,
            waypoint.arrival_threshold(),
            jitter(8_000, 15_000),
        )
        .with_gestures();

        match travel(ctx, grant, trip).await {
            ArrivalOutcome::Interrupted => {
                info!("Exploration interrupted in transit");
                return Ok(());
            }
            ArrivalOutcome::Lost => return Err(WorldError::NotSpawned),
            ArrivalOutcome::Arrived | ArrivalOutcome::TimedOut => {}
        }

        if chance(0.6) {
            look_around(world).await;
            sleep(jitter(500, 2_000)).await;
            look_around(world).await;
        }
        if chance(0.3) {
            random_gesture(world).await;
        }
        sleep(jitter(1_000, 3_000)).await;
    }

    info!("Exploration complete");
    Ok(())
}
