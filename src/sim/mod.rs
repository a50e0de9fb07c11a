//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod impulse;
pub mod layout;
pub mod shape;
pub mod state;
pub mod tick;
pub mod world;

pub use collision::{CollisionResult, bounce_velocity, clamp_speed, reflect_velocity};
pub use impulse::{launch_speed, rebound_impulse, restore_impulse, serve_impulse};
pub use layout::{BrickGrid, BrickSpec, build_bricks, pick_special_cells};
pub use shape::Shape;
pub use state::{
    Ball, BallId, BallState, Brick, BrickFade, BrickId, BrickKind, FadePhase, GameEvent, GameState,
    GameStatus, HitOutcome, Paddle, PaddleOutline, PowerId, SpecialPower, brick_alpha,
};
pub use tick::{
    BOUNDARY_BOTTOM, BOUNDARY_LEFT, BOUNDARY_PADDLE, BOUNDARY_RIGHT, BOUNDARY_TOP, FrameClock,
    PendingInput, TickInput, tick,
};
pub use world::{
    Body, BodyHandle, BodyKind, BodyTag, Boundary, CollisionWorld, ContactEvent, Gravity, Impulse,
    PhysicsProfile,
};
