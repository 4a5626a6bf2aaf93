//! Random-walk waypoints around the explore anchor.

use crate::types::Vec3;
use rand::Rng;
use std::f64::consts::TAU;

/// Waypoints never land closer to the anchor than this (before jitter).
pub const MIN_DISTANCE: f64 = 5.0;
/// Per-axis positional jitter added to each waypoint.
pub const JITTER: f64 = 1.0;
pub const MIN_STOPS: usize = 2;
pub const MAX_STOPS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Vec3,
    /// Goal tolerance handed to the movement planner.
    pub tolerance: f64,
}

impl Waypoint {
    /// Distance under which the avatar counts as arrived.
    pub fn arrival_threshold(&self) -> f64 {
        self.tolerance + 2.0
    }
}

/// How many stops the next exploration makes.
pub fn stop_count<R: Rng + ?Sized>(rng: &mut R) -> usize {
    rng.gen_range(MIN_STOPS..=MAX_STOPS)
}

/// `count` waypoints at a uniform angle and a uniform distance in
/// `[MIN_DISTANCE, radius]` from `anchor`, each nudged by up to `JITTER` on
/// x and z. Height stays at the anchor's.
pub fn generate_waypoints<R: Rng + ?Sized>(
    rng: &mut R,
    anchor: Vec3,
    count: usize,
    radius: f64,
) -> Vec<Waypoint> {
    let max_distance = radius.max(MIN_DISTANCE);
    (0..count)
        .map(|_| {
            let angle = rng.gen_range(0.0..TAU);
            let distance = rng.gen_range(MIN_DISTANCE..=max_distance);
            let x = anchor.x + angle.cos() * distance + rng.gen_range(-JITTER..JITTER);
            let z = anchor.z + angle.sin() * distance + rng.gen_range(-JITTER..JITTER);
            Waypoint {
                position: Vec3::new(x, anchor.y, z),
                tolerance: rng.gen_range(1.5..3.0),
            }
        })
        .collect()
}
