//! Game state and core simulation types
//!
//! Entities hold the game-side view of the field. Positions and velocities
//! of balls are owned by the collision world and mirrored here after every
//! step so the shell can render without touching physics.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::shape::Shape;
use super::world::{BodyHandle, CollisionWorld};
use crate::Rect;
use crate::consts::*;
use crate::settings::Settings;

/// Overall game status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    /// Layout built, balls resting on the paddle, waiting for the serve
    Idle,
    /// Active gameplay
    Playing,
    /// Balls frozen, nothing moves
    Paused,
    /// Last ball lost
    GameOver,
    /// Last brick destroyed
    Won,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BallId(pub u32);

/// Brick identity: its cell in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BrickId {
    pub row: u16,
    pub column: u16,
}

impl BrickId {
    pub fn new(row: u16, column: u16) -> Self {
        Self { row, column }
    }

    /// Name of the brick's outline in the collision world
    pub fn boundary_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BrickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "brick-{}-{}", self.row, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PowerId(pub u32);

/// Ball state - resting on the paddle or in play
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BallState {
    /// Waiting for the serve, horizontally offset from the paddle center
    Resting { offset: f32 },
    /// Moving under physics
    Live,
}

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: BallId,
    /// Registration in the collision world
    pub body: BodyHandle,
    /// Diameter
    pub size: f32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub state: BallState,
    /// Velocity captured by `freeze`, consumed by `restore`
    pub frozen_velocity: Option<Vec2>,
}

impl Ball {
    #[inline]
    pub fn radius(&self) -> f32 {
        self.size * 0.5
    }

    pub fn frame(&self) -> Rect {
        Rect::from_center_size(self.pos, Vec2::splat(self.size))
    }
}

/// Paddle collision outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaddleOutline {
    /// Flat top keeps resting balls in place before the serve
    Rect,
    /// Curved top varies bounce angles once play starts
    Ellipse,
}

/// The player's paddle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    pub center: Vec2,
    pub width: f32,
    pub height: f32,
    /// Horizontal field extent the paddle must stay within
    pub field_min_x: f32,
    pub field_max_x: f32,
    pub outline: PaddleOutline,
    /// Pinned body in the collision world (None once released)
    pub body: Option<BodyHandle>,
}

impl Paddle {
    /// Paddle centered near the bottom of the field
    pub fn new(field: &Rect) -> Self {
        Self {
            center: Vec2::new(
                field.center().x,
                field.min.y + PADDLE_BOTTOM_OFFSET + PADDLE_HEIGHT / 2.0,
            ),
            width: PADDLE_DEFAULT_WIDTH,
            height: PADDLE_HEIGHT,
            field_min_x: field.min.x,
            field_max_x: field.max.x,
            outline: PaddleOutline::Rect,
            body: None,
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn frame(&self) -> Rect {
        Rect::from_center_size(self.center, self.size())
    }

    /// Collision outline for the current outline policy
    pub fn shape(&self) -> Shape {
        match self.outline {
            PaddleOutline::Rect => Shape::Rect(self.frame()),
            PaddleOutline::Ellipse => Shape::ellipse_in(self.frame()),
        }
    }

    /// Closest center x that keeps the paddle inside the field
    fn clamp_center_x(&self, x: f32) -> f32 {
        let half = self.width / 2.0;
        let (lo, hi) = (self.field_min_x + half, self.field_max_x - half);
        if lo > hi {
            // Field narrower than the paddle: center it
            (self.field_min_x + self.field_max_x) / 2.0
        } else {
            x.clamp(lo, hi)
        }
    }

    /// Slide horizontally; returns the distance actually moved
    pub fn move_by(&mut self, dx: f32) -> f32 {
        let old = self.center.x;
        self.center.x = self.clamp_center_x(old + dx);
        self.center.x - old
    }

    /// Set width (saturating to [min, max]); returns whether it changed
    pub fn set_width(&mut self, width: f32) -> bool {
        let width = width.clamp(PADDLE_MIN_WIDTH, PADDLE_MAX_WIDTH);
        if width == self.width {
            return false;
        }
        self.width = width;
        self.center.x = self.clamp_center_x(self.center.x);
        true
    }

    pub fn increase_width(&mut self) -> bool {
        self.set_width(self.width + PADDLE_WIDTH_STEP)
    }

    pub fn decrease_width(&mut self) -> bool {
        self.set_width(self.width - PADDLE_WIDTH_STEP)
    }
}

/// Brick types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrickKind {
    #[default]
    Regular,
    SmallerPaddle,
    LargerPaddle,
    AddBall,
    Hard,
}

impl BrickKind {
    pub fn hits_required(&self) -> u32 {
        match self {
            BrickKind::Hard => HARD_BRICK_HITS,
            _ => 1,
        }
    }

    /// Special bricks drop a power when destroyed
    pub fn is_special(&self) -> bool {
        *self != BrickKind::Regular
    }
}

/// What a hit did to a brick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    Damaged,
    Destroyed,
}

/// Alpha of a brick after `hits` hits
///
/// Single-hit bricks never fade; multi-hit bricks lose `BRICK_FADE_STEP`
/// per hit (plus one step up front), clamped to [0, 1].
pub fn brick_alpha(hits: u32, hits_required: u32) -> f32 {
    if hits == 0 || hits_required <= 1 {
        return 1.0;
    }
    (1.0 - (hits + 1) as f32 * BRICK_FADE_STEP).clamp(0.0, 1.0)
}

/// A brick entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brick {
    pub id: BrickId,
    pub kind: BrickKind,
    pub frame: Rect,
    pub hits: u32,
    pub alpha: f32,
    /// Pinned body in the collision world (None once released)
    pub body: Option<BodyHandle>,
}

impl Brick {
    pub fn new(id: BrickId, kind: BrickKind, frame: Rect) -> Self {
        Self {
            id,
            kind,
            frame,
            hits: 0,
            alpha: 1.0,
            body: None,
        }
    }

    pub fn hits_required(&self) -> u32 {
        self.kind.hits_required()
    }

    pub fn is_destroyed(&self) -> bool {
        self.hits >= self.hits_required()
    }

    /// Count one hit; a destroyed brick takes no more
    pub fn record_hit(&mut self) -> HitOutcome {
        if !self.is_destroyed() {
            self.hits += 1;
            self.alpha = brick_alpha(self.hits, self.hits_required());
        }
        if self.is_destroyed() {
            HitOutcome::Destroyed
        } else {
            HitOutcome::Damaged
        }
    }
}

/// A falling pickup dropped by a destroyed special brick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialPower {
    pub id: PowerId,
    pub kind: BrickKind,
    pub start: Vec2,
    /// Height at which the drop ends
    pub floor_y: f32,
    pub pos: Vec2,
    pub size: f32,
    pub elapsed: f32,
    pub fall_secs: f32,
}

impl SpecialPower {
    pub fn new(id: PowerId, kind: BrickKind, at: Vec2, floor_y: f32) -> Self {
        Self {
            id,
            kind,
            start: at,
            floor_y,
            pos: at,
            size: POWER_SIZE,
            elapsed: 0.0,
            fall_secs: POWER_FALL_SECS,
        }
    }

    pub fn frame(&self) -> Rect {
        Rect::from_center_size(self.pos, Vec2::splat(self.size))
    }

    /// Fall for `dt`; returns true once the drop has reached the floor
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed = (self.elapsed + dt).min(self.fall_secs);
        let t = if self.fall_secs > 0.0 {
            self.elapsed / self.fall_secs
        } else {
            1.0
        };
        self.pos.y = self.start.y + (self.floor_y - self.start.y) * t;
        self.elapsed >= self.fall_secs
    }
}

/// Visual phase of a destroyed brick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FadePhase {
    /// Fading toward transparent (`progress` in [0, 1])
    FadeOut { progress: f32 },
    /// Final, slower fade
    FinalFade { progress: f32 },
    /// Gone from view
    Removed,
}

/// Fade durations: blink, blink, then final fade. Alpha snaps back between.
const FADE_STEPS: [f32; 3] = [0.2, 0.2, 0.8];

/// Fade-out timeline of a destroyed brick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrickFade {
    pub brick: BrickId,
    pub frame: Rect,
    /// Alpha the brick had when destroyed (restored between blinks)
    pub start_alpha: f32,
    pub elapsed: f32,
}

impl BrickFade {
    /// Total time from destruction to removal
    pub const DURATION: f32 = FADE_STEPS[0] + FADE_STEPS[1] + FADE_STEPS[2];

    pub fn new(brick: &Brick) -> Self {
        Self {
            brick: brick.id,
            frame: brick.frame,
            start_alpha: brick.alpha,
            elapsed: 0.0,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    pub fn phase(&self) -> FadePhase {
        let mut t = self.elapsed;
        for (i, duration) in FADE_STEPS.iter().enumerate() {
            if t < *duration {
                let progress = t / duration;
                return if i + 1 == FADE_STEPS.len() {
                    FadePhase::FinalFade { progress }
                } else {
                    FadePhase::FadeOut { progress }
                };
            }
            t -= duration;
        }
        FadePhase::Removed
    }

    /// Alpha the renderer should draw with
    pub fn alpha(&self) -> f32 {
        match self.phase() {
            FadePhase::FadeOut { progress } | FadePhase::FinalFade { progress } => {
                self.start_alpha * (1.0 - progress)
            }
            FadePhase::Removed => 0.0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase() == FadePhase::Removed
    }
}

/// Notifications for the shell, drained after each tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Field rebuilt: every earlier entity is gone
    Reset { bricks: u32, balls: u32 },
    StatusChanged { from: GameStatus, to: GameStatus },
    BallAdded { id: BallId, pos: Vec2 },
    BallRemoved { id: BallId },
    BrickHit { id: BrickId, hits: u32, alpha: f32 },
    BrickDestroyed { id: BrickId, kind: BrickKind },
    /// Fade finished, brick gone from view
    BrickRemoved { id: BrickId },
    PowerSpawned { id: PowerId, kind: BrickKind, pos: Vec2 },
    PowerCollected { id: PowerId, kind: BrickKind },
    PowerExpired { id: PowerId },
    PaddleResized { width: f32 },
    Won,
    GameOver,
}

/// Complete game session
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub settings: Settings,
    /// Play field (y-up, origin bottom-left)
    pub field: Rect,
    pub status: GameStatus,
    pub world: CollisionWorld,
    pub paddle: Paddle,
    /// Live balls (sorted by id)
    pub balls: Vec<Ball>,
    /// Balls captured by `freeze`, waiting for `restore`
    pub frozen_balls: Vec<Ball>,
    pub bricks: BTreeMap<BrickId, Brick>,
    /// Falling pickups (sorted by id)
    pub powers: Vec<SpecialPower>,
    /// Destroyed bricks still fading out
    pub fades: Vec<BrickFade>,
    /// Whether the first serve of this game happened
    pub served: bool,
    /// Serve and paddle drag are ignored while false
    pub input_enabled: bool,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub(crate) events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Fresh session with the given seed; the layout is built immediately
    pub fn new(seed: u64, settings: Settings, field_size: Vec2) -> Result<Self, crate::ConfigError> {
        settings.validate()?;
        let field = Rect::new(Vec2::ZERO, field_size);
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            settings,
            field,
            status: GameStatus::Idle,
            world: CollisionWorld::new(),
            paddle: Paddle::new(&field),
            balls: Vec::new(),
            frozen_balls: Vec::new(),
            bricks: BTreeMap::new(),
            powers: Vec::new(),
            fades: Vec::new(),
            served: false,
            input_enabled: false,
            time_ticks: 0,
            events: Vec::new(),
            next_id: 1,
        };
        state.reset()?;
        Ok(state)
    }

    /// Session on the reference field size
    pub fn with_default_field(seed: u64, settings: Settings) -> Result<Self, crate::ConfigError> {
        Self::new(
            seed,
            settings,
            Vec2::new(DEFAULT_FIELD_WIDTH, DEFAULT_FIELD_HEIGHT),
        )
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn ball(&self, id: BallId) -> Option<&Ball> {
        self.balls.iter().find(|b| b.id == id)
    }

    pub fn live_ball_count(&self) -> usize {
        self.balls.len()
    }

    pub fn brick_count(&self) -> usize {
        self.bricks.len()
    }

    /// Take all events raised since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Ensure collections are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
        self.powers.sort_by_key(|p| p.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> Rect {
        Rect::new(Vec2::ZERO, Vec2::new(375.0, 667.0))
    }

    #[test]
    fn test_paddle_stays_in_field() {
        let mut paddle = Paddle::new(&field());
        paddle.move_by(-1000.0);
        assert_eq!(paddle.frame().min.x, 0.0);
        paddle.move_by(5000.0);
        assert_eq!(paddle.frame().max.x, 375.0);
        assert_eq!(paddle.move_by(10.0), 0.0);
    }

    #[test]
    fn test_paddle_width_saturates() {
        let mut paddle = Paddle::new(&field());
        assert_eq!(paddle.width, PADDLE_DEFAULT_WIDTH);
        for _ in 0..10 {
            paddle.increase_width();
        }
        assert_eq!(paddle.width, PADDLE_MAX_WIDTH);
        assert!(!paddle.increase_width());
        for _ in 0..20 {
            paddle.decrease_width();
        }
        assert_eq!(paddle.width, PADDLE_MIN_WIDTH);
    }

    #[test]
    fn test_growing_paddle_at_wall_is_pushed_inward() {
        let mut paddle = Paddle::new(&field());
        paddle.move_by(1000.0);
        paddle.increase_width();
        assert_eq!(paddle.frame().max.x, 375.0);
        assert_eq!(paddle.width, PADDLE_DEFAULT_WIDTH + PADDLE_WIDTH_STEP);
    }

    #[test]
    fn test_paddle_outline_policy() {
        let mut paddle = Paddle::new(&field());
        assert!(matches!(paddle.shape(), Shape::Rect(_)));
        paddle.outline = PaddleOutline::Ellipse;
        assert!(matches!(paddle.shape(), Shape::Ellipse { .. }));
    }

    #[test]
    fn test_hard_brick_takes_three_hits() {
        let mut brick = Brick::new(BrickId::new(0, 0), BrickKind::Hard, field());
        assert_eq!(brick.record_hit(), HitOutcome::Damaged);
        assert!((brick.alpha - 0.8).abs() < 1e-6);
        assert_eq!(brick.record_hit(), HitOutcome::Damaged);
        assert!((brick.alpha - 0.7).abs() < 1e-6);
        assert_eq!(brick.record_hit(), HitOutcome::Destroyed);
        assert_eq!(brick.record_hit(), HitOutcome::Destroyed);
        assert_eq!(brick.hits, 3);
    }

    #[test]
    fn test_regular_brick_does_not_fade() {
        let mut brick = Brick::new(BrickId::new(1, 2), BrickKind::LargerPaddle, field());
        assert_eq!(brick.record_hit(), HitOutcome::Destroyed);
        assert_eq!(brick.alpha, 1.0);
    }

    #[test]
    fn test_alpha_is_clamped() {
        assert_eq!(brick_alpha(50, 100), 0.0);
        assert_eq!(brick_alpha(0, 3), 1.0);
    }

    #[test]
    fn test_brick_id_boundary_name() {
        assert_eq!(BrickId::new(2, 5).boundary_name(), "brick-2-5");
    }

    #[test]
    fn test_power_falls_to_floor() {
        let mut power = SpecialPower::new(PowerId(1), BrickKind::AddBall, Vec2::new(50.0, 500.0), 0.0);
        assert!(!power.advance(5.0));
        assert!((power.pos.y - 250.0).abs() < 1e-3);
        assert!(power.advance(5.0));
        assert_eq!(power.pos.y, 0.0);
    }

    #[test]
    fn test_fade_timeline() {
        let brick = Brick::new(BrickId::new(0, 0), BrickKind::Regular, field());
        let mut fade = BrickFade::new(&brick);
        assert_eq!(fade.phase(), FadePhase::FadeOut { progress: 0.0 });

        fade.advance(0.1);
        assert!((fade.alpha() - 0.5).abs() < 1e-5);

        // Snapped back for the second blink
        fade.advance(0.1);
        assert!(matches!(fade.phase(), FadePhase::FadeOut { .. }));
        assert!(fade.alpha() > 0.9);

        fade.advance(0.3);
        assert!(matches!(fade.phase(), FadePhase::FinalFade { .. }));
        assert!(!fade.is_finished());

        fade.advance(0.71);
        assert!(fade.is_finished());
        assert_eq!(fade.alpha(), 0.0);
        assert!((BrickFade::DURATION - 1.2).abs() < 1e-6);
    }
}
