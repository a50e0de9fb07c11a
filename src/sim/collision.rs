//! Collision detection and response
//!
//! Balls are circles; everything they bounce off is a segment, a box or an
//! ellipse. Each query returns the contact normal pointing toward the ball
//! center and how deep the ball has sunk in, so the world can push it back
//! out and reflect its velocity.

use glam::Vec2;

use crate::Rect;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Collision point (if hit)
    pub point: Vec2,
    /// Surface normal at collision (pointing toward ball center)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check collision between a ball and a line segment
pub fn ball_segment_collision(ball_pos: Vec2, ball_radius: f32, a: Vec2, b: Vec2) -> CollisionResult {
    let line_vec = b - a;
    let line_len_sq = line_vec.length_squared();

    let t = if line_len_sq < 0.0001 {
        0.0 // Degenerate segment, treat as a point
    } else {
        ((ball_pos - a).dot(line_vec) / line_len_sq).clamp(0.0, 1.0)
    };
    let closest = a + line_vec * t;
    let offset = ball_pos - closest;
    let dist = offset.length();

    if dist >= ball_radius {
        return CollisionResult::miss();
    }

    let normal = if dist > 1e-4 {
        offset / dist
    } else {
        // Ball center is on the line
        Vec2::new(-line_vec.y, line_vec.x).normalize_or(Vec2::Y)
    };

    CollisionResult {
        hit: true,
        point: closest,
        normal,
        penetration: ball_radius - dist,
    }
}

/// Check collision between a ball and an axis-aligned box
pub fn ball_rect_collision(ball_pos: Vec2, ball_radius: f32, rect: &Rect) -> CollisionResult {
    let closest = ball_pos.clamp(rect.min, rect.max);
    let offset = ball_pos - closest;
    let dist_sq = offset.length_squared();

    if dist_sq > 1e-8 {
        // Center outside the box
        if dist_sq >= ball_radius * ball_radius {
            return CollisionResult::miss();
        }
        let dist = dist_sq.sqrt();
        return CollisionResult {
            hit: true,
            point: closest,
            normal: offset / dist,
            penetration: ball_radius - dist,
        };
    }

    // Center inside the box: push out through the nearest face
    let faces = [
        (ball_pos.x - rect.min.x, Vec2::NEG_X),
        (rect.max.x - ball_pos.x, Vec2::X),
        (ball_pos.y - rect.min.y, Vec2::NEG_Y),
        (rect.max.y - ball_pos.y, Vec2::Y),
    ];
    let (depth, normal) = faces
        .into_iter()
        .fold((f32::INFINITY, Vec2::Y), |best, face| {
            if face.0 < best.0 { face } else { best }
        });

    CollisionResult {
        hit: true,
        point: ball_pos + normal * depth,
        normal,
        penetration: depth + ball_radius,
    }
}

/// Check collision between a ball and an axis-aligned ellipse
///
/// The ellipse is inflated by the ball radius on both axes and the ball
/// center tested against that. Exact for circles, close enough for the flat
/// paddle ellipse.
pub fn ball_ellipse_collision(
    ball_pos: Vec2,
    ball_radius: f32,
    center: Vec2,
    radii: Vec2,
) -> CollisionResult {
    let inflated = radii + Vec2::splat(ball_radius);
    let rel = ball_pos - center;
    let scaled = rel / inflated;
    let k = scaled.length();

    if k >= 1.0 {
        return CollisionResult::miss();
    }

    if k < 1e-4 {
        // Dead center, push straight up
        return CollisionResult {
            hit: true,
            point: center + Vec2::new(0.0, radii.y),
            normal: Vec2::Y,
            penetration: inflated.y,
        };
    }

    let surface = center + rel / k;
    let normal = (rel / (inflated * inflated)).normalize_or(Vec2::Y);

    CollisionResult {
        hit: true,
        point: center + scaled / k * radii,
        normal,
        penetration: (surface - ball_pos).length(),
    }
}

/// Check collision between two balls; the normal points toward ball `a`
pub fn ball_ball_collision(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    let offset = a_pos - b_pos;
    let dist = offset.length();
    let reach = a_radius + b_radius;

    if dist >= reach {
        return CollisionResult::miss();
    }

    let normal = if dist > 1e-4 { offset / dist } else { Vec2::Y };
    CollisionResult {
        hit: true,
        point: b_pos + normal * b_radius,
        normal,
        penetration: reach - dist,
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Bounce off a surface with restitution and friction
///
/// Only the approaching normal component is reflected (scaled by
/// `restitution`); the tangential component loses `friction` of itself.
/// A ball already separating is returned untouched.
pub fn bounce_velocity(velocity: Vec2, normal: Vec2, restitution: f32, friction: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn >= 0.0 {
        return velocity;
    }
    if restitution == 1.0 && friction <= 0.0 {
        return reflect_velocity(velocity, normal);
    }
    let normal_part = normal * vn;
    let tangent_part = velocity - normal_part;
    tangent_part * (1.0 - friction.clamp(0.0, 1.0)) - normal_part * restitution
}

/// Keep a speed within [min, max] without changing direction
///
/// A zero velocity stays zero; resting bodies are not kicked.
pub fn clamp_speed(velocity: Vec2, min: f32, max: f32) -> Vec2 {
    debug_assert!(min < max, "min < max");
    let speed = velocity.length();
    if speed == 0.0 {
        return velocity;
    }
    if speed < min {
        velocity * (min / speed)
    } else if speed > max {
        velocity * (max / speed)
    } else {
        velocity
    }
}
