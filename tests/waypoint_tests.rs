//! Waypoint generation unit tests

#[cfg(test)]
mod tests {
    use avatar_autopilot::types::Vec3;
    use avatar_autopilot::waypoints::{
        generate_waypoints, stop_count, JITTER, MAX_STOPS, MIN_DISTANCE, MIN_STOPS,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const RADIUS: f64 = 20.0;

    fn anchor() -> Vec3 {
        Vec3::new(100.0, 70.0, -40.0)
    }

    #[test]
    fn waypoints_stay_within_the_annulus() {
        let mut rng = StdRng::seed_from_u64(7);
        let slack = JITTER * std::f64::consts::SQRT_2;

        let waypoints = generate_waypoints(&mut rng, anchor(), 500, RADIUS);
        assert_eq!(waypoints.len(), 500);
        for wp in &waypoints {
            let d = wp.position.horizontal_distance_to(&anchor());
            assert!(d >= MIN_DISTANCE - slack, "too close: {}", d);
            assert!(d <= RADIUS + slack, "too far: {}", d);
            assert_eq!(wp.position.y, anchor().y);
            assert!((1.5..3.0).contains(&wp.tolerance));
            assert_eq!(wp.arrival_threshold(), wp.tolerance + 2.0);
        }
    }

    #[test]
    fn waypoints_cover_every_quadrant() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut quadrants = [0usize; 4];
        for wp in generate_waypoints(&mut rng, anchor(), 2_000, RADIUS) {
            let dx = wp.position.x - anchor().x;
            let dz = wp.position.z - anchor().z;
            let q = match (dx >= 0.0, dz >= 0.0) {
                (true, true) => 0,
                (false, true) => 1,
                (false, false) => 2,
                (true, false) => 3,
            };
            quadrants[q] += 1;
        }
        // Uniform angle: each quadrant near 500.
        for count in quadrants {
            assert!((350..=650).contains(&count), "skewed: {:?}", quadrants);
        }
    }

    #[test]
    fn tiny_radius_is_clamped_to_minimum_distance() {
        let mut rng = StdRng::seed_from_u64(1);
        for wp in generate_waypoints(&mut rng, anchor(), 50, 2.0) {
            let d = wp.position.horizontal_distance_to(&anchor());
            assert!(d <= MIN_DISTANCE + JITTER * std::f64::consts::SQRT_2);
        }
    }

    #[test]
    fn stop_count_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let n = stop_count(&mut rng);
            assert!((MIN_STOPS..=MAX_STOPS).contains(&n));
        }
    }
}
