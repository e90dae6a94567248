#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Kinematics of individual swarm sprites.
//!
//! A [`Bike`] either bounces around inside its container or falls from the
//! top edge under gravity, jittering its heading and speed to look organic,
//! and leaves fire-and-forget trails behind it.

mod bike;
pub mod math;

pub use bike::{Bike, MIN_STEP_SECONDS, SPAWN_MULTIPLIER_RANGE};
