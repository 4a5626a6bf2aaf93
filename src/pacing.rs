//! Human pacing.
//!
//! Every timing in every behavior is drawn from a bounded uniform range and
//! every choice is probabilistic, so the avatar never exhibits a fixed period.
//!
//! The free functions use the thread-local generator and return before any
//! await point, so they are safe to call from tasks that move between threads.

use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// A uniformly random duration in `[min_ms, max_ms]`.
pub fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    Duration::from_millis(uniform_int(min_ms, max_ms))
}

/// A uniformly random integer in `[min, max]`.
pub fn uniform_int(min: u64, max: u64) -> u64 {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

/// A uniformly random float in `[min, max)`.
pub fn uniform(min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..max)
}

/// `true` with probability `p`.
pub fn chance(p: f64) -> bool {
    rand::thread_rng().gen_bool(p.clamp(0.0, 1.0))
}

/// A random element of `items`, or `None` when empty.
pub fn pick<T: Clone>(items: &[T]) -> Option<T> {
    items.choose(&mut rand::thread_rng()).cloned()
}

/// Shuffle `items` in place.
pub fn shuffle<T>(items: &mut [T]) {
    items.shuffle(&mut rand::thread_rng());
}

/// Pick an index with probability proportional to its weight.
///
/// Returns `None` when `weights` is empty or sums to zero.
pub fn weighted_index<R: Rng + ?Sized>(rng: &mut R, weights: &[u32]) -> Option<usize> {
    let total: u32 = weights.iter().sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.gen_range(0..total);
    for (i, w) in weights.iter().enumerate() {
        if roll < *w {
            return Some(i);
        }
        roll -= w;
    }
    None
}
