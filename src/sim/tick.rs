//! Fixed timestep simulation tick
//!
//! The rule engine: reacts to contact events from the collision world,
//! keeps brick/ball/power bookkeeping and decides when the game is won or
//! lost. It never integrates motion itself.

use glam::Vec2;

use super::impulse::{rebound_impulse, restore_impulse, serve_impulse};
use super::layout::build_bricks;
use super::state::{
    Ball, BallId, BallState, Brick, BrickFade, BrickId, BrickKind, GameEvent, GameState,
    GameStatus, HitOutcome, Paddle, PaddleOutline, PowerId, SpecialPower,
};
use super::shape::Shape;
use super::world::{BodyHandle, BodyTag, Boundary, ContactEvent, Gravity};
use crate::consts::*;
use crate::error::ConfigError;
use crate::settings::Settings;

/// Field edge boundary names
pub const BOUNDARY_LEFT: &str = "left";
pub const BOUNDARY_TOP: &str = "top";
pub const BOUNDARY_RIGHT: &str = "right";
/// Open bottom edge: a sensor below the field
pub const BOUNDARY_BOTTOM: &str = "bottom";
pub const BOUNDARY_PADDLE: &str = "paddle";

/// Autoplay paddle speed limit (points per tick)
const AUTOPLAY_MAX_DRAG: f32 = 8.0;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Horizontal paddle drag since the previous tick
    pub paddle_dx: f32,
    /// Serve tap
    pub serve: bool,
    /// Pause toggle
    pub pause: bool,
    /// Demo mode - the paddle plays by itself
    pub autoplay: bool,
}

/// Input gathered between ticks
///
/// Gestures arrive at any time; `take` hands out everything accumulated so
/// far and resets it, so a drag is never applied twice.
#[derive(Debug, Clone, Default)]
pub struct PendingInput {
    drag: f32,
    serve: bool,
    pause: bool,
}

impl PendingInput {
    pub fn push_drag(&mut self, dx: f32) {
        self.drag += dx;
    }

    pub fn request_serve(&mut self) {
        self.serve = true;
    }

    pub fn request_pause_toggle(&mut self) {
        self.pause = !self.pause;
    }

    pub fn take(&mut self) -> TickInput {
        let pending = std::mem::take(self);
        TickInput {
            paddle_dx: pending.drag,
            serve: pending.serve,
            pause: pending.pause,
            autoplay: false,
        }
    }
}

/// Fixed-step accumulator for variable frame times
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    accumulator: f32,
}

impl FrameClock {
    /// Add a frame's elapsed time; returns how many `SIM_DT` ticks to run
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, 0.1);
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS {
            // Drop the backlog instead of spiralling
            self.accumulator = 0.0;
        }
        substeps
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    let mut input = input.clone();
    if input.autoplay {
        autoplay(state, &mut input);
    }

    if input.pause {
        match state.status {
            GameStatus::Playing => state.pause(),
            GameStatus::Paused => state.resume(),
            _ => {}
        }
    }
    if input.serve {
        state.serve();
    }
    if input.paddle_dx != 0.0 {
        state.move_paddle(input.paddle_dx);
    }

    state.time_ticks += 1;

    if state.status == GameStatus::Playing {
        let events = state.world.step(dt);
        for event in events {
            state.handle_contact(event);
            if state.status != GameStatus::Playing {
                break;
            }
        }
    }

    if state.status == GameStatus::Playing {
        state.sync_balls_from_world();
        state.remove_escaped_balls();
    }
    if state.status == GameStatus::Playing {
        state.advance_powers(dt);
    }

    // Fades are visual: they finish even after the game ends
    if state.status != GameStatus::Paused {
        state.advance_fades(dt);
    }
}

/// Steer the paddle toward the lowest ball and serve when idle
fn autoplay(state: &GameState, input: &mut TickInput) {
    if state.status == GameStatus::Idle {
        input.serve = true;
    }

    let lowest = state
        .balls
        .iter()
        .filter(|b| b.state == BallState::Live)
        .min_by(|a, b| {
            a.pos
                .y
                .partial_cmp(&b.pos.y)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

    // Chase a power only while every ball is heading up
    let all_rising = state.balls.iter().all(|b| b.vel.y > 0.0);
    let power = state
        .powers
        .iter()
        .filter(|p| p.kind != BrickKind::SmallerPaddle)
        .min_by(|a, b| {
            a.pos
                .y
                .partial_cmp(&b.pos.y)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

    let target_x = match (power, lowest) {
        (Some(power), _) if all_rising => Some(power.pos.x),
        (_, Some(ball)) => {
            // Vary the contact point so rallies don't loop
            let phase = state.time_ticks as f32 * 0.01;
            let offset = (phase.sin() * 0.3 + (phase * 0.7).sin() * 0.1) * state.paddle.width;
            Some(ball.pos.x + offset)
        }
        _ => None,
    };

    if let Some(x) = target_x {
        input.paddle_dx = (x - state.paddle.center.x).clamp(-AUTOPLAY_MAX_DRAG, AUTOPLAY_MAX_DRAG);
    }
}

impl GameState {
    // === Lifecycle ===

    /// Rebuild the field from the current settings
    ///
    /// Every ball, brick, power and fade of the previous game is dropped.
    pub fn reset(&mut self) -> Result<(), ConfigError> {
        self.settings.validate()?;
        let specs = build_bricks(&mut self.rng, &self.settings, &self.field)?;

        self.world.clear();
        self.world.set_gravity(Gravity::down(self.settings.gravity));
        self.world.set_ball_elasticity(self.settings.elasticity);

        self.balls.clear();
        self.frozen_balls.clear();
        self.bricks.clear();
        self.powers.clear();
        self.fades.clear();
        self.served = false;

        self.add_field_boundaries();

        self.paddle = Paddle::new(&self.field);
        let paddle_body = self
            .world
            .add_body(BodyTag::Paddle, self.paddle.center, self.paddle.size());
        self.paddle.body = Some(paddle_body);
        self.world.add_boundary(
            BOUNDARY_PADDLE,
            Boundary::solid(self.paddle.shape()).owned_by(paddle_body),
        );

        for spec in specs {
            let mut brick = Brick::new(spec.id, spec.kind, spec.frame);
            let body = self.world.add_body(
                BodyTag::Brick(spec.id),
                spec.frame.center(),
                spec.frame.size(),
            );
            self.world.add_boundary(
                spec.id.boundary_name(),
                Boundary::solid(Shape::Rect(spec.frame)).owned_by(body),
            );
            brick.body = Some(body);
            self.bricks.insert(spec.id, brick);
        }

        self.set_status(GameStatus::Idle);
        self.push_event(GameEvent::Reset {
            bricks: self.bricks.len() as u32,
            balls: self.settings.ball_count,
        });
        self.create_balls(self.settings.ball_count);
        self.input_enabled = true;

        log::info!(
            "Reset: {} bricks ({} special), {} balls",
            self.bricks.len(),
            self.bricks.values().filter(|b| b.kind.is_special()).count(),
            self.balls.len()
        );
        Ok(())
    }

    fn add_field_boundaries(&mut self) {
        let f = self.field;
        let (top_left, top_right) = (Vec2::new(f.min.x, f.max.y), f.max);
        let (bottom_left, bottom_right) = (f.min, Vec2::new(f.max.x, f.min.y));

        self.world.add_boundary(
            BOUNDARY_LEFT,
            Boundary::solid(Shape::segment(bottom_left, top_left)),
        );
        self.world.add_boundary(
            BOUNDARY_TOP,
            Boundary::solid(Shape::segment(top_left, top_right)),
        );
        self.world.add_boundary(
            BOUNDARY_RIGHT,
            Boundary::solid(Shape::segment(bottom_right, top_right)),
        );

        // Below the visible edge so a ball is fully out before it counts
        let y = f.min.y - BALL_SIZE;
        self.world.add_boundary(
            BOUNDARY_BOTTOM,
            Boundary::sensor(Shape::segment(
                Vec2::new(f.min.x - f.width(), y),
                Vec2::new(f.max.x + f.width(), y),
            )),
        );
    }

    /// Take new settings; gravity and elasticity apply at once, the rest on
    /// the next reset
    pub fn apply_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.world.set_gravity(Gravity::down(settings.gravity));
        self.world.set_ball_elasticity(settings.elasticity);
        log::info!(
            "Settings applied: gravity {}, elasticity {}",
            settings.gravity,
            settings.elasticity
        );
        self.settings = settings;
        Ok(())
    }

    fn set_status(&mut self, to: GameStatus) {
        let from = self.status;
        if from == to {
            return;
        }
        self.status = to;
        log::info!("Status {:?} -> {:?}", from, to);
        self.push_event(GameEvent::StatusChanged { from, to });
    }

    // === Input ===

    /// Launch every ball resting on the paddle
    pub fn serve(&mut self) {
        if !self.input_enabled {
            return;
        }
        match self.status {
            GameStatus::Idle | GameStatus::Playing => {}
            _ => return,
        }

        let height = self.field.height();
        let mut served = 0;
        for ball in self
            .balls
            .iter_mut()
            .filter(|b| matches!(b.state, BallState::Resting { .. }))
        {
            ball.state = BallState::Live;
            let impulse = serve_impulse(&mut self.rng, height);
            self.world.apply_impulse(ball.body, impulse);
            served += 1;
        }
        if served == 0 {
            return;
        }

        self.set_status(GameStatus::Playing);
        if !self.served {
            self.served = true;
            self.paddle.outline = PaddleOutline::Ellipse;
            self.sync_paddle_boundary();
        }
        log::info!("Served {} balls", served);
    }

    /// Drag the paddle horizontally; resting balls ride along
    pub fn move_paddle(&mut self, dx: f32) {
        if !self.input_enabled || dx == 0.0 {
            return;
        }
        match self.status {
            GameStatus::Idle | GameStatus::Playing => {}
            _ => return,
        }

        if self.paddle.move_by(dx) == 0.0 {
            return;
        }

        let center_x = self.paddle.center.x;
        for ball in &mut self.balls {
            if let BallState::Resting { offset } = ball.state {
                ball.pos.x = center_x + offset;
                self.world.set_position(ball.body, ball.pos);
            }
        }
        self.sync_paddle_boundary();
    }

    /// Move the paddle outline to the paddle's current frame
    ///
    /// Skipped while a ball overlaps the new outline: teleporting the
    /// boundary through a ball would trap it. Returns whether it synced.
    pub fn sync_paddle_boundary(&mut self) -> bool {
        let Some(body) = self.paddle.body else {
            return false;
        };
        let shape = self.paddle.shape();
        if self.world.any_ball_overlaps(&shape) {
            log::debug!("Paddle boundary resync skipped: ball in the way");
            return false;
        }
        self.world.set_position(body, self.paddle.center);
        self.world
            .add_boundary(BOUNDARY_PADDLE, Boundary::solid(shape).owned_by(body));
        true
    }

    /// Suspend play, keeping every ball's velocity
    pub fn pause(&mut self) {
        if self.status != GameStatus::Playing {
            return;
        }
        self.freeze();
        self.set_status(GameStatus::Paused);
    }

    /// Continue after `pause`
    pub fn resume(&mut self) {
        if self.status != GameStatus::Paused {
            return;
        }
        self.restore();
        self.set_status(GameStatus::Playing);
    }

    /// Capture live balls' velocities and take them out of the world
    pub fn freeze(&mut self) {
        let balls = std::mem::take(&mut self.balls);
        for mut ball in balls {
            let velocity = self.world.velocity(ball.body).unwrap_or(ball.vel);
            if let Some(body) = self.world.remove_body(ball.body) {
                ball.pos = body.pos;
            }
            ball.vel = velocity;
            ball.frozen_velocity = Some(velocity);
            self.frozen_balls.push(ball);
        }
        log::debug!("Froze {} balls", self.frozen_balls.len());
    }

    /// Put frozen balls back and relaunch them with their captured velocity
    pub fn restore(&mut self) {
        let frozen = std::mem::take(&mut self.frozen_balls);
        for mut ball in frozen {
            ball.body = self.world.add_body(
                BodyTag::Ball(ball.id),
                ball.pos,
                Vec2::splat(ball.size),
            );
            if let Some(velocity) = ball.frozen_velocity.take() {
                if velocity != Vec2::ZERO {
                    self.world.apply_impulse(ball.body, restore_impulse(velocity));
                }
            }
            ball.vel = Vec2::ZERO;
            self.balls.push(ball);
        }
        self.normalize_order();
        log::debug!("Restored {} balls", self.balls.len());
    }

    // === Balls ===

    /// Place `count` balls evenly across the paddle, resting above it
    pub fn create_balls(&mut self, count: u32) {
        let frame = self.paddle.frame();
        for i in 0..count {
            let x = frame.min.x + frame.width() * (i as f32 + 1.0) / (count as f32 + 1.0);
            let pos = Vec2::new(x, frame.max.y + BALL_SIZE);
            let offset = x - self.paddle.center.x;
            self.spawn_ball(pos, BallState::Resting { offset });
        }
    }

    /// Extra ball at the last ball's position, launched away from it
    pub fn create_ball(&mut self) -> Option<BallId> {
        let (pos, vel) = self.balls.last().map(|b| (b.pos, b.vel))?;
        let id = self.spawn_ball(pos, BallState::Live);
        let impulse = rebound_impulse(&mut self.rng, vel, self.field.height());
        if let Some(ball) = self.ball(id) {
            let body = ball.body;
            self.world.apply_impulse(body, impulse);
        }
        Some(id)
    }

    fn spawn_ball(&mut self, pos: Vec2, state: BallState) -> BallId {
        let id = BallId(self.next_entity_id());
        let body = self
            .world
            .add_body(BodyTag::Ball(id), pos, Vec2::splat(BALL_SIZE));
        self.balls.push(Ball {
            id,
            body,
            size: BALL_SIZE,
            pos,
            vel: Vec2::ZERO,
            state,
            frozen_velocity: None,
        });
        self.push_event(GameEvent::BallAdded { id, pos });
        id
    }

    /// Drop a ball from play; unknown ids are ignored
    pub fn remove_ball(&mut self, id: BallId) -> bool {
        let Some(index) = self.balls.iter().position(|b| b.id == id) else {
            return false;
        };
        let ball = self.balls.remove(index);
        self.world.remove_body(ball.body);
        self.push_event(GameEvent::BallRemoved { id });
        log::debug!("Ball {} removed, {} left", id.0, self.balls.len());
        true
    }

    fn ball_lost(&mut self, id: BallId) {
        if self.remove_ball(id) && self.balls.is_empty() && self.frozen_balls.is_empty() {
            self.game_over();
        }
    }

    fn sync_balls_from_world(&mut self) {
        for ball in &mut self.balls {
            if let Some(body) = self.world.body(ball.body) {
                ball.pos = body.pos;
                ball.vel = body.vel;
            }
        }
    }

    /// Safety net for balls that slipped past the bottom sensor or a wall
    fn remove_escaped_balls(&mut self) {
        let limit = self.field;
        let margin = BALL_SIZE * 2.0;
        let escaped: Vec<BallId> = self
            .balls
            .iter()
            .filter(|b| {
                b.pos.y < limit.min.y - margin
                    || b.pos.x < limit.min.x - margin
                    || b.pos.x > limit.max.x + margin
                    || !b.pos.is_finite()
            })
            .map(|b| b.id)
            .collect();
        for id in escaped {
            log::warn!("Ball {} escaped the field", id.0);
            self.ball_lost(id);
            if self.status != GameStatus::Playing {
                break;
            }
        }
    }

    // === Contacts ===

    /// React to one contact notification from the collision world
    pub fn handle_contact(&mut self, event: ContactEvent) {
        match event {
            ContactEvent::BodyBegan { a, b } => {
                let Some(BodyTag::Ball(_)) = self.world.tag(a) else {
                    return;
                };
                self.clamp_ball(a);
                match self.world.tag(b) {
                    Some(BodyTag::Brick(id)) => {
                        self.hit_brick(id);
                    }
                    Some(BodyTag::Ball(_)) => self.clamp_ball(b),
                    _ => {}
                }
            }
            ContactEvent::BodyEnded { a, b } => {
                let Some(BodyTag::Ball(_)) = self.world.tag(a) else {
                    return;
                };
                self.clamp_ball(a);
                if self.world.tag(b) == Some(BodyTag::Paddle) {
                    self.world
                        .add_linear_velocity(a, Vec2::new(0.0, PADDLE_RELEASE_NUDGE));
                    self.clamp_ball(a);
                }
            }
            ContactEvent::BoundaryBegan { body, boundary } => {
                let Some(BodyTag::Ball(id)) = self.world.tag(body) else {
                    return;
                };
                self.clamp_ball(body);
                if boundary == BOUNDARY_BOTTOM {
                    self.ball_lost(id);
                }
            }
            ContactEvent::BoundaryEnded { .. } => {}
        }
    }

    fn clamp_ball(&mut self, body: BodyHandle) {
        self.world
            .clamp_velocity(body, BALL_MIN_SPEED, BALL_MAX_SPEED);
    }

    // === Bricks ===

    /// Count a hit on a brick; destroys it once it has taken enough hits
    ///
    /// A destroyed brick leaves the world immediately, starts its fade and
    /// drops a power if it was special. Unknown ids are ignored.
    pub fn hit_brick(&mut self, id: BrickId) -> Option<HitOutcome> {
        let brick = self.bricks.get_mut(&id)?;
        let outcome = brick.record_hit();
        let (hits, alpha) = (brick.hits, brick.alpha);
        self.push_event(GameEvent::BrickHit { id, hits, alpha });

        if outcome == HitOutcome::Destroyed {
            if let Some(brick) = self.bricks.remove(&id) {
                self.destroy_brick(brick);
            }
            if self.bricks.is_empty() && !self.balls.is_empty() {
                self.win();
            }
        }
        Some(outcome)
    }

    fn destroy_brick(&mut self, brick: Brick) {
        if let Some(body) = brick.body {
            self.world.remove_body(body);
        }
        self.world.remove_boundary(&brick.id.boundary_name());
        log::debug!("{} destroyed ({:?})", brick.id, brick.kind);

        self.fades.push(BrickFade::new(&brick));
        self.push_event(GameEvent::BrickDestroyed {
            id: brick.id,
            kind: brick.kind,
        });
        if brick.kind.is_special() {
            self.spawn_power(brick.kind, brick.frame.center());
        }
    }

    fn advance_fades(&mut self, dt: f32) {
        if self.fades.is_empty() {
            return;
        }
        let mut removed = Vec::new();
        self.fades.retain_mut(|fade| {
            fade.advance(dt);
            if fade.is_finished() {
                removed.push(fade.brick);
                false
            } else {
                true
            }
        });
        for id in removed {
            self.push_event(GameEvent::BrickRemoved { id });
        }
    }

    // === Powers ===

    /// Start a power falling from `at`
    pub fn spawn_power(&mut self, kind: BrickKind, at: Vec2) -> PowerId {
        let id = PowerId(self.next_entity_id());
        self.powers
            .push(SpecialPower::new(id, kind, at, self.field.min.y));
        self.push_event(GameEvent::PowerSpawned { id, kind, pos: at });
        log::debug!("Power {} ({:?}) dropped at {:?}", id.0, kind, at);
        id
    }

    /// Move powers down; collect those touching the paddle, expire landed ones
    fn advance_powers(&mut self, dt: f32) {
        if self.powers.is_empty() {
            return;
        }
        let paddle_frame = self.paddle.frame();
        let mut collected = Vec::new();
        let mut expired = Vec::new();
        self.powers.retain_mut(|power| {
            let landed = power.advance(dt);
            if power.frame().intersects(&paddle_frame) {
                collected.push((power.id, power.kind));
                false
            } else if landed {
                expired.push(power.id);
                false
            } else {
                true
            }
        });

        for id in expired {
            self.push_event(GameEvent::PowerExpired { id });
        }
        for (id, kind) in collected {
            self.push_event(GameEvent::PowerCollected { id, kind });
            log::debug!("Power {} ({:?}) collected", id.0, kind);
            self.apply_power(kind);
        }
    }

    fn apply_power(&mut self, kind: BrickKind) {
        let resized = match kind {
            BrickKind::LargerPaddle => self.paddle.increase_width(),
            BrickKind::SmallerPaddle => self.paddle.decrease_width(),
            BrickKind::AddBall => {
                self.create_ball();
                false
            }
            BrickKind::Regular | BrickKind::Hard => false,
        };
        if resized {
            self.push_event(GameEvent::PaddleResized {
                width: self.paddle.width,
            });
            self.sync_paddle_boundary();
        }
    }

    // === End conditions ===

    fn win(&mut self) {
        log::info!("All bricks cleared with {} balls in play", self.balls.len());
        let ids: Vec<BallId> = self.balls.iter().map(|b| b.id).collect();
        for id in ids {
            self.remove_ball(id);
        }
        self.end_game(GameStatus::Won);
        self.push_event(GameEvent::Won);
    }

    fn game_over(&mut self) {
        log::info!("Game over with {} bricks left", self.bricks.len());
        self.end_game(GameStatus::GameOver);
        self.push_event(GameEvent::GameOver);
    }

    fn end_game(&mut self, status: GameStatus) {
        self.input_enabled = false;
        self.frozen_balls.clear();
        self.powers.clear();
        self.release_paddle_and_bricks();
        self.set_status(status);
    }

    /// Take the paddle and every brick out of the world
    fn release_paddle_and_bricks(&mut self) {
        if let Some(body) = self.paddle.body.take() {
            self.world.remove_body(body);
        }
        for brick in std::mem::take(&mut self.bricks).into_values() {
            if let Some(body) = brick.body {
                self.world.remove_body(body);
            }
        }
    }
}
