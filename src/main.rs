//! Prehistoric Breakout headless demo
//!
//! Plays a game on autopilot at a fixed frame rate and prints a JSON summary.
//!
//! Usage: `prehistoric-breakout [settings.json] [seed]`

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    env_logger::init();
    log::info!("Prehistoric Breakout (headless) starting...");
    demo::run(std::env::args().skip(1).collect())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The shell drives the library directly on the web
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::collections::BTreeMap;
    use std::path::Path;

    use anyhow::Context;
    use serde::Serialize;

    use prehistoric_breakout::Settings;
    use prehistoric_breakout::consts::SIM_DT;
    use prehistoric_breakout::sim::{FrameClock, GameEvent, GameState, GameStatus, TickInput, tick};

    /// Display refresh the demo pretends to run at
    const FRAME_DT: f32 = 1.0 / 60.0;
    /// Give up after this much simulated time
    const MAX_SECONDS: f32 = 300.0;

    #[derive(Debug, Serialize)]
    struct RunSummary {
        seed: u64,
        status: GameStatus,
        seconds: f32,
        ticks: u64,
        bricks_left: usize,
        balls_left: usize,
        paddle_width: f32,
        /// Event counts by kind
        events: BTreeMap<&'static str, u32>,
    }

    fn event_name(event: &GameEvent) -> &'static str {
        match event {
            GameEvent::Reset { .. } => "reset",
            GameEvent::StatusChanged { .. } => "status_changed",
            GameEvent::BallAdded { .. } => "ball_added",
            GameEvent::BallRemoved { .. } => "ball_removed",
            GameEvent::BrickHit { .. } => "brick_hit",
            GameEvent::BrickDestroyed { .. } => "brick_destroyed",
            GameEvent::BrickRemoved { .. } => "brick_removed",
            GameEvent::PowerSpawned { .. } => "power_spawned",
            GameEvent::PowerCollected { .. } => "power_collected",
            GameEvent::PowerExpired { .. } => "power_expired",
            GameEvent::PaddleResized { .. } => "paddle_resized",
            GameEvent::Won => "won",
            GameEvent::GameOver => "game_over",
        }
    }

    pub fn run(args: Vec<String>) -> anyhow::Result<()> {
        let settings = match args.first() {
            Some(path) => Settings::load(Path::new(path)),
            None => Settings::default(),
        };
        let seed = match args.get(1) {
            Some(seed) => seed
                .parse::<u64>()
                .with_context(|| format!("seed must be an unsigned integer, got {seed:?}"))?,
            None => 0x00B1_0C4B,
        };

        let mut state = GameState::with_default_field(seed, settings)
            .context("settings rejected by the layout builder")?;
        let mut clock = FrameClock::default();
        let input = TickInput {
            autoplay: true,
            ..Default::default()
        };
        let mut events: BTreeMap<&'static str, u32> = BTreeMap::new();
        let mut seconds = 0.0;

        while seconds < MAX_SECONDS {
            for _ in 0..clock.advance(FRAME_DT) {
                tick(&mut state, &input, SIM_DT);
            }
            seconds += FRAME_DT;

            for event in state.drain_events() {
                *events.entry(event_name(&event)).or_default() += 1;
            }
            if matches!(state.status, GameStatus::Won | GameStatus::GameOver) && state.fades.is_empty()
            {
                break;
            }
        }

        log::info!("Finished as {:?} after {:.1}s", state.status, seconds);
        let summary = RunSummary {
            seed,
            status: state.status,
            seconds,
            ticks: state.time_ticks,
            bricks_left: state.brick_count(),
            balls_left: state.live_ball_count(),
            paddle_width: state.paddle.width,
            events,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}
