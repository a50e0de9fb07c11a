//! Collision shapes for boundaries and pinned bodies
//!
//! Field edges are segments, bricks are rectangles, and the paddle is either a
//! rectangle (before the first serve) or an ellipse inscribed in its frame.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{
    CollisionResult, ball_ellipse_collision, ball_rect_collision, ball_segment_collision,
};
use crate::Rect;

/// A static collision outline in field coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Line segment from `a` to `b`
    Segment { a: Vec2, b: Vec2 },
    /// Axis-aligned box
    Rect(Rect),
    /// Axis-aligned ellipse
    Ellipse { center: Vec2, radii: Vec2 },
}

impl Shape {
    pub fn segment(a: Vec2, b: Vec2) -> Self {
        Shape::Segment { a, b }
    }

    /// Ellipse inscribed in a frame
    pub fn ellipse_in(frame: Rect) -> Self {
        Shape::Ellipse {
            center: frame.center(),
            radii: frame.size() * 0.5,
        }
    }

    /// Test a ball (circle) against this shape
    pub fn collide_ball(&self, ball_pos: Vec2, ball_radius: f32) -> CollisionResult {
        match self {
            Shape::Segment { a, b } => ball_segment_collision(ball_pos, ball_radius, *a, *b),
            Shape::Rect(rect) => ball_rect_collision(ball_pos, ball_radius, rect),
            Shape::Ellipse { center, radii } => {
                ball_ellipse_collision(ball_pos, ball_radius, *center, *radii)
            }
        }
    }

    /// Bounding box of the shape
    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Segment { a, b } => Rect::new(*a, *b),
            Shape::Rect(rect) => *rect,
            Shape::Ellipse { center, radii } => Rect::new(*center - *radii, *center + *radii),
        }
    }

    /// Center of the shape's bounds
    pub fn center(&self) -> Vec2 {
        self.bounds().center()
    }
}
