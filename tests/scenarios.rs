//! End-to-end game scenarios driven through the public API

use glam::Vec2;

use prehistoric_breakout::Settings;
use prehistoric_breakout::consts::*;
use prehistoric_breakout::sim::{
    BallId, BrickKind, GameEvent, GameState, GameStatus, HitOutcome, TickInput, tick,
};

fn started_game(seed: u64) -> GameState {
    let mut state =
        GameState::with_default_field(seed, Settings::default()).expect("default settings");
    let serve = TickInput {
        serve: true,
        ..Default::default()
    };
    tick(&mut state, &serve, SIM_DT);
    assert_eq!(state.status, GameStatus::Playing);
    state
}

fn idle_tick(state: &mut GameState) {
    tick(state, &TickInput::default(), SIM_DT);
}

#[test]
fn special_brick_drops_power_and_stops_colliding() {
    let mut state = started_game(2024);
    assert_eq!(state.balls.len(), 2);
    assert_eq!(state.bricks.len(), 18);
    assert_eq!(state.bricks.values().filter(|b| b.kind.is_special()).count(), 6);

    let (id, kind, frame) = state
        .bricks
        .values()
        .find(|b| b.kind.is_special())
        .map(|b| (b.id, b.kind, b.frame))
        .expect("special brick");

    state.drain_events();
    let mut hits = 0;
    while state.hit_brick(id) == Some(HitOutcome::Damaged) {
        hits += 1;
    }
    assert_eq!(hits + 1, kind.hits_required());

    let events = state.drain_events();
    assert!(events.contains(&GameEvent::BrickDestroyed { id, kind }));
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::PowerSpawned { kind: k, pos, .. } if *k == kind && *pos == frame.center()
    )));
    assert_eq!(state.powers.len(), 1);
    assert_eq!(state.powers[0].pos, frame.center());

    // Put a ball where the brick used to be: nothing to hit any more
    assert!(state.world.boundary(&id.boundary_name()).is_none());
    let body = state.balls[0].body;
    state.world.set_position(body, frame.center());
    state.world.set_velocity(body, Vec2::ZERO);
    idle_tick(&mut state);
    assert!(
        !state
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::BrickHit { .. }))
    );
    assert_eq!(state.bricks.len(), 17);
}

#[test]
fn losing_every_ball_ends_the_game() {
    let mut state = started_game(7);
    let bottom = Vec2::new(0.0, state.field.min.y - BALL_SIZE);
    for (i, ball) in state.balls.iter().enumerate() {
        let pos = bottom + Vec2::new(60.0 + 120.0 * i as f32, 0.0);
        state.world.set_position(ball.body, pos);
    }
    state.drain_events();
    idle_tick(&mut state);

    assert_eq!(state.status, GameStatus::GameOver);
    assert!(state.balls.is_empty());
    assert!(!state.input_enabled);
    assert!(state.paddle.body.is_none());
    assert!(state.bricks.is_empty());
    assert_eq!(state.world.body_count(), 0);

    let events = state.drain_events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::BallRemoved { .. }))
            .count(),
        2
    );
    assert!(events.contains(&GameEvent::GameOver));

    // Input is ignored until the next reset
    let paddle_x = state.paddle.center.x;
    state.move_paddle(50.0);
    state.serve();
    assert_eq!(state.paddle.center.x, paddle_x);
    assert_eq!(state.status, GameStatus::GameOver);

    state.reset().expect("valid settings");
    assert_eq!(state.status, GameStatus::Idle);
    assert!(state.input_enabled);
    assert_eq!(state.bricks.len(), 18);
    assert_eq!(state.balls.len(), 2);
}

#[test]
fn one_ball_lost_is_not_game_over() {
    let mut state = started_game(8);
    let body = state.balls[0].body;
    state
        .world
        .set_position(body, Vec2::new(100.0, state.field.min.y - BALL_SIZE));
    idle_tick(&mut state);
    assert_eq!(state.status, GameStatus::Playing);
    assert_eq!(state.balls.len(), 1);
}

#[test]
fn clearing_every_brick_wins() {
    let mut state = started_game(11);
    let ids: Vec<_> = state.bricks.keys().copied().collect();
    for id in &ids {
        while state.hit_brick(*id) == Some(HitOutcome::Damaged) {}
    }

    assert_eq!(state.status, GameStatus::Won);
    assert!(state.balls.is_empty());
    assert!(state.powers.is_empty());
    assert!(!state.input_enabled);
    assert_eq!(state.world.body_count(), 0);
    assert!(state.drain_events().contains(&GameEvent::Won));

    // The last fades still play out
    assert_eq!(state.fades.len(), ids.len());
    for _ in 0..200 {
        idle_tick(&mut state);
    }
    assert!(state.fades.is_empty());
    let removed = state
        .drain_events()
        .iter()
        .filter(|e| matches!(e, GameEvent::BrickRemoved { .. }))
        .count();
    assert_eq!(removed, ids.len());
}

#[test]
fn larger_paddle_power_grows_paddle_up_to_max() {
    let mut state = started_game(5);
    let mut expected = PADDLE_DEFAULT_WIDTH;
    for _ in 0..6 {
        let at = state.paddle.center;
        state.spawn_power(BrickKind::LargerPaddle, at);
        state.drain_events();
        idle_tick(&mut state);

        expected = (expected + PADDLE_WIDTH_STEP).min(PADDLE_MAX_WIDTH);
        assert_eq!(state.paddle.width, expected);
        assert!(state.powers.is_empty());
        assert!(
            state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::PowerCollected { kind: BrickKind::LargerPaddle, .. }))
        );
    }
    assert_eq!(state.paddle.width, PADDLE_MAX_WIDTH);
    let frame = state.paddle.frame();
    assert!(frame.min.x >= state.field.min.x && frame.max.x <= state.field.max.x);
}

#[test]
fn freeze_restore_round_trip() {
    let settings = Settings {
        ball_count: 3,
        ..Default::default()
    };
    let mut state = GameState::with_default_field(31, settings).expect("valid settings");
    state.serve();
    for _ in 0..20 {
        idle_tick(&mut state);
    }

    let before: Vec<(BallId, Vec2)> = state
        .balls
        .iter()
        .map(|b| (b.id, state.world.velocity(b.body).unwrap_or_default()))
        .collect();
    assert!(!before.is_empty());

    state.freeze();
    assert!(state.balls.is_empty());
    assert_eq!(state.frozen_balls.len(), before.len());

    state.restore();
    assert!(state.frozen_balls.is_empty());
    state.world.flush_impulses();
    for (id, velocity) in before {
        let ball = state.ball(id).expect("restored ball");
        let restored = state.world.velocity(ball.body).unwrap_or_default();
        assert!((restored - velocity).length() < 1e-2);
    }
}

#[test]
fn autoplay_session_is_reproducible() {
    let run = |seed| {
        let mut state =
            GameState::with_default_field(seed, Settings::default()).expect("default settings");
        let input = TickInput {
            autoplay: true,
            ..Default::default()
        };
        for _ in 0..2400 {
            tick(&mut state, &input, SIM_DT);
        }
        (
            state.status,
            state.bricks.len(),
            state.balls.iter().map(|b| b.pos).collect::<Vec<_>>(),
        )
    };
    assert_eq!(run(77), run(77));
}
