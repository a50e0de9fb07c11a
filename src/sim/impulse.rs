//! Launch impulses
//!
//! Three flavours: a serve straight up off the paddle, a rebound opposite a
//! ball's current heading, and the exact relaunch used when restoring frozen
//! balls. Serve and rebound speeds come from a table keyed by field height so
//! taller fields get faster balls.

use std::f32::consts::FRAC_PI_2;

use glam::Vec2;
use rand::Rng;

use super::world::Impulse;
use crate::consts::{REBOUND_SPREAD, SERVE_SPREAD};
use crate::{magnitude, vector_angle};

/// (max field height, launch speed) breakpoints, ascending
const LAUNCH_SPEED_TABLE: [(f32, f32); 4] = [
    (480.0, 320.0),
    (568.0, 360.0),
    (667.0, 400.0),
    (736.0, 440.0),
];
/// Launch speed for anything taller than the last breakpoint
const LAUNCH_SPEED_LARGE: f32 = 520.0;

/// Launch speed for a field of the given height
pub fn launch_speed(field_height: f32) -> f32 {
    LAUNCH_SPEED_TABLE
        .iter()
        .find(|(max_height, _)| field_height <= *max_height)
        .map_or(LAUNCH_SPEED_LARGE, |(_, speed)| *speed)
}

/// Serve off the paddle: straight up ± `SERVE_SPREAD`
pub fn serve_impulse<R: Rng>(rng: &mut R, field_height: f32) -> Impulse {
    let spread = rng.random_range(-SERVE_SPREAD..=SERVE_SPREAD);
    Impulse::new(FRAC_PI_2 + spread, launch_speed(field_height))
}

/// Relaunch opposite the given heading ± `REBOUND_SPREAD`
///
/// A ball at rest has no heading; it is sent up like a serve.
pub fn rebound_impulse<R: Rng>(rng: &mut R, velocity: Vec2, field_height: f32) -> Impulse {
    let base = if velocity.length_squared() > 0.0 {
        vector_angle(-velocity)
    } else {
        FRAC_PI_2
    };
    let spread = rng.random_range(-REBOUND_SPREAD..=REBOUND_SPREAD);
    Impulse::new(base + spread, launch_speed(field_height))
}

/// Relaunch a restored ball along its captured velocity
///
/// The magnitude is the captured speed, not a fixed low value, so a ball of
/// unit density comes back with exactly its pre-freeze velocity.
pub fn restore_impulse(velocity: Vec2) -> Impulse {
    Impulse::new(vector_angle(velocity), magnitude(velocity))
}
