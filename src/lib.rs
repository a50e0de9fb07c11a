//! Prehistoric Breakout - simulation core for a touchscreen Breakout game
//!
//! Core modules:
//! - `sim`: Collision world, rule engine, power drops and brick fades
//! - `settings`: Tunable game configuration
//! - `error`: Configuration/layout policy violations
//!
//! Rendering, gestures and persistence of preferences belong to the shell
//! that drives [`sim::tick`] and drains [`sim::GameEvent`]s.

pub mod error;
pub mod settings;
pub mod sim;

pub use error::ConfigError;
pub use settings::Settings;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Reference play field (points)
    pub const DEFAULT_FIELD_WIDTH: f32 = 375.0;
    pub const DEFAULT_FIELD_HEIGHT: f32 = 667.0;

    /// Gravity acceleration per unit of configured magnitude (points/s²)
    pub const GRAVITY_SCALE: f32 = 1000.0;

    /// Ball defaults
    pub const BALL_SIZE: f32 = 20.0;
    pub const BALL_MIN_SPEED: f32 = 100.0;
    pub const BALL_MAX_SPEED: f32 = 700.0;
    /// Upward velocity added when a ball leaves the paddle (anti-stick)
    pub const PADDLE_RELEASE_NUDGE: f32 = 10.0;
    /// Most balls a game may start with
    pub const MAX_BALLS: u32 = 16;

    /// Paddle defaults
    pub const PADDLE_DEFAULT_WIDTH: f32 = 80.0;
    pub const PADDLE_WIDTH_STEP: f32 = 10.0;
    pub const PADDLE_MIN_WIDTH: f32 = 40.0;
    pub const PADDLE_MAX_WIDTH: f32 = 120.0;
    pub const PADDLE_HEIGHT: f32 = 18.0;
    pub const PADDLE_BOTTOM_OFFSET: f32 = 100.0;

    /// Brick grid
    pub const BRICK_COLUMNS: u16 = 6;
    pub const BRICK_HEIGHT: f32 = 30.0;
    pub const BRICK_GAP: f32 = 10.0;
    pub const BRICK_TOP_OFFSET: f32 = 100.0;
    /// Most bricks a layout may hold (100 full rows)
    pub const MAX_BRICKS: u32 = 100 * BRICK_COLUMNS as u32;
    pub const HARD_BRICK_HITS: u32 = 3;
    /// Alpha lost per hit on multi-hit bricks
    pub const BRICK_FADE_STEP: f32 = 0.10;

    /// Special power drops
    pub const POWER_SIZE: f32 = 50.0;
    pub const POWER_FALL_SECS: f32 = 10.0;

    /// Launch angle spreads (radians, half-width of the band)
    pub const SERVE_SPREAD: f32 = 15.0 * std::f32::consts::PI / 180.0;
    pub const REBOUND_SPREAD: f32 = 30.0 * std::f32::consts::PI / 180.0;
}

/// Length of a vector
#[inline]
pub fn magnitude(v: Vec2) -> f32 {
    (v.x * v.x + v.y * v.y).sqrt()
}

/// Direction of a vector in radians, `atan2(y, x)`
#[inline]
pub fn vector_angle(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Axis-aligned rectangle in field coordinates (y-up)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Overlap test; touching edges do not count
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_magnitude_and_angle() {
        let v = Vec2::new(3.0, 4.0);
        assert!((magnitude(v) - 5.0).abs() < 1e-6);
        assert!((vector_angle(Vec2::new(0.0, 2.0)) - PI / 2.0).abs() < 1e-6);
        assert!((vector_angle(-v) - normalize_angle(vector_angle(v) + PI)).abs() < 1e-5);
    }

    #[test]
    fn test_polar_round_trip() {
        let v = Vec2::new(-120.0, 45.0);
        let back = polar_to_cartesian(magnitude(v), vector_angle(v));
        assert!((back - v).length() < 1e-3);
    }

    #[test]
    fn test_rect_intersects() {
        let a = Rect::from_center_size(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        let b = Rect::from_center_size(Vec2::new(8.0, 0.0), Vec2::new(10.0, 10.0));
        let c = Rect::from_center_size(Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.contains(Vec2::new(5.0, -5.0)));
    }
}
