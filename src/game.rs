use rand::prelude::*;
use rand::rngs::StdRng;

use crate::config::{ConfigError, GameConfig};
use crate::features::{self, Observation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    NoOp,
    Flap,
}

impl Action {
    pub const ALL: [Action; 2] = [Action::NoOp, Action::Flap];
    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        match self {
            Action::NoOp => 0,
            Action::Flap => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

// Axis-aligned box in screen coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Hitbox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    // touching edges do not count as overlap
    pub fn intersects(&self, other: &Hitbox) -> bool {
        self.w > 0.0
            && self.h > 0.0
            && other.w > 0.0
            && other.h > 0.0
            && self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    pub x: f32,
    top_height: f32,
    bottom_start: f32,
    passed: bool,
}

impl Pipe {
    pub fn new(x: f32, top_height: f32, gap: f32) -> Self {
        Self {
            x,
            top_height,
            bottom_start: top_height + gap,
            passed: false,
        }
    }

    pub fn top_height(&self) -> f32 {
        self.top_height
    }

    pub fn bottom_start(&self) -> f32 {
        self.bottom_start
    }

    pub fn gap_center(&self) -> f32 {
        (self.top_height + self.bottom_start) / 2.0
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn top_rect(&self, width: f32) -> Hitbox {
        Hitbox::new(self.x, 0.0, width, self.top_height)
    }

    pub fn bottom_rect(&self, width: f32, screen_height: f32) -> Hitbox {
        Hitbox::new(self.x, self.bottom_start, width, screen_height - self.bottom_start)
    }

    pub fn collides(&self, hitbox: &Hitbox, width: f32, screen_height: f32) -> bool {
        hitbox.intersects(&self.top_rect(width)) || hitbox.intersects(&self.bottom_rect(width, screen_height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bird {
    pub y: f32,
    pub velocity: f32,
}

impl Bird {
    // dead bird keeps dropping under gravity until it reaches `rest_y`
    pub fn fall(&mut self, gravity: f32, rest_y: f32) -> bool {
        if self.y >= rest_y {
            return false;
        }
        self.velocity += gravity;
        self.y += self.velocity;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub reward: f32,
    pub terminal: bool,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    pub bird_x: f32,
    pub bird_y: f32,
    pub bird_velocity: f32,
    pub pipes: Vec<Pipe>,
    pub score: u32,
    pub terminal: bool,
    pub flapped: bool,
}

// One episode of the world. Does not reset; build a new engine to play again.
pub struct Engine {
    config: GameConfig,
    rng: StdRng,
    bird: Bird,
    pipes: Vec<Pipe>,
    spawn_timer_ms: f32,
    score: u32,
    alive: bool,
    ticks: u64,
    last_action: Action,
}

impl Engine {
    pub fn new(config: GameConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_validated(config, rng))
    }

    pub fn seeded(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    // callers that already validated the config skip the check
    pub(crate) fn with_validated(config: GameConfig, rng: StdRng) -> Self {
        let bird = Bird { y: config.bird_start_y, velocity: 0.0 };
        let mut instance = Self {
            config,
            rng,
            bird,
            pipes: Vec::new(),
            spawn_timer_ms: 0.0,
            score: 0,
            alive: true,
            ticks: 0,
            last_action: Action::NoOp,
        };
        instance.spawn_pipe();

        instance
    }

    pub fn config(&self) -> &GameConfig {&self.config}
    pub fn bird(&self) -> Bird {self.bird}
    pub fn pipes(&self) -> &[Pipe] {&self.pipes}
    pub fn score(&self) -> u32 {self.score}
    pub fn alive(&self) -> bool {self.alive}
    pub fn ticks(&self) -> u64 {self.ticks}

    pub fn observation(&self) -> Observation {
        features::extract(&self.config, self.bird.y, self.bird.velocity, &self.pipes)
    }

    pub fn frame_state(&self) -> FrameState {
        FrameState {
            bird_x: self.config.bird_x,
            bird_y: self.bird.y,
            bird_velocity: self.bird.velocity,
            pipes: self.pipes.clone(),
            score: self.score,
            terminal: !self.alive,
            flapped: self.last_action == Action::Flap,
        }
    }

    pub fn bird_hitbox(&self) -> Hitbox {
        let c = &self.config;
        Hitbox::new(
            c.bird_x + c.hitbox_margin_x,
            self.bird.y.trunc() + c.hitbox_margin_y,
            c.bird_width - 2.0 * c.hitbox_margin_x,
            c.bird_height - 2.0 * c.hitbox_margin_y,
        )
    }

    // Advances the world by one tick. `elapsed_ms` only drives the spawn timer.
    pub fn step(&mut self, action: Action, elapsed_ms: f32) -> StepOutcome {
        if !self.alive {
            return StepOutcome { reward: 0.0, terminal: true, score: self.score };
        }
        self.last_action = action;

        if action == Action::Flap {
            self.bird.velocity = self.config.flap_velocity;
        }
        self.bird.velocity += self.config.gravity;
        self.bird.y += self.bird.velocity;

        self.spawn_timer_ms += elapsed_ms;
        if self.spawn_timer_ms > self.config.spawn_interval_ms {
            self.spawn_pipe();
            self.spawn_timer_ms = 0.0;
        }

        for pipe in &mut self.pipes {
            pipe.x -= self.config.pipe_speed;
        }
        let pipe_width = self.config.pipe_width;
        self.pipes.retain(|pipe| pipe.x > -pipe_width);

        let mut reward = self.config.alive_reward;
        if self.check_pipe_collision() || self.check_out_of_bounds() {
            self.alive = false;
            reward = self.config.death_reward;
        }

        // a pass in the same tick overrides both the alive bonus and the death penalty
        for pipe in &mut self.pipes {
            if !pipe.passed && pipe.x + pipe_width < self.config.bird_x {
                pipe.passed = true;
                self.score += 1;
                reward = self.config.pass_reward;
            }
        }

        self.ticks += 1;

        StepOutcome { reward, terminal: !self.alive, score: self.score }
    }

    fn spawn_pipe(&mut self) {
        let top_height = self.rng.random_range(self.config.pipe_min_top..=self.config.pipe_max_top);
        self.pipes.push(Pipe::new(self.config.screen_width, top_height, self.config.pipe_gap));
    }

    fn check_pipe_collision(&self) -> bool {
        let hitbox = self.bird_hitbox();
        self.pipes
            .iter()
            .any(|pipe| pipe.collides(&hitbox, self.config.pipe_width, self.config.screen_height))
    }

    fn check_out_of_bounds(&self) -> bool {
        self.bird.y < 0.0 || self.bird.y + self.config.bird_height > self.config.screen_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::seeded(GameConfig::default(), 7).unwrap()
    }

    #[test]
    fn test_action_index_round_trip() {
        assert_eq!(Action::from_index(0), Some(Action::NoOp));
        assert_eq!(Action::from_index(1), Some(Action::Flap));
        assert_eq!(Action::from_index(2), None);
        assert_eq!(Action::Flap.index(), 1);
    }

    #[test]
    fn test_new_engine_seeds_one_pipe() {
        let game = engine();
        assert_eq!(game.pipes().len(), 1);
        assert_eq!(game.pipes()[0].x, 288.0);
        assert!(game.alive());
        assert_eq!(game.bird(), Bird { y: 200.0, velocity: 0.0 });
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let config = GameConfig { screen_height: 0.0, ..GameConfig::default() };
        assert!(Engine::seeded(config, 0).is_err());
    }

    #[test]
    fn test_gravity_closed_form() {
        let mut game = engine();
        let g = game.config().gravity;
        for k in 1..=40u32 {
            game.step(Action::NoOp, 0.0);
            let k = k as f32;
            let bird = game.bird();
            assert!((bird.velocity - k * g).abs() < 1e-4, "velocity at tick {}: {}", k, bird.velocity);
            let expected_y = 200.0 + g * k * (k + 1.0) / 2.0;
            assert!((bird.y - expected_y).abs() < 1e-2, "position at tick {}: {}", k, bird.y);
        }
    }

    #[test]
    fn test_flap_resets_velocity_before_gravity() {
        let mut game = engine();
        game.step(Action::NoOp, 0.0);
        game.step(Action::NoOp, 0.0);
        game.step(Action::Flap, 0.0);

        let bird = game.bird();
        assert!((bird.velocity - (-4.5 + 0.1)).abs() < 1e-5);
        // 200 + 0.1 + 0.2 - 4.4
        assert!((bird.y - 195.9).abs() < 1e-3);
        assert!(game.frame_state().flapped);
    }

    #[test]
    fn test_falls_out_of_bounds_after_fixed_tick_count() {
        // 200 + 0.05 k (k + 1) + 24 > 512 first holds at k = 76
        let mut game = engine();
        let mut ticks = 0;
        loop {
            let outcome = game.step(Action::NoOp, 0.0);
            ticks += 1;
            if outcome.terminal {
                assert_eq!(outcome.reward, -1.0);
                break;
            }
            assert_eq!(outcome.reward, 0.1);
        }
        assert_eq!(ticks, 76);
        assert_eq!(game.ticks(), 76);
    }

    #[test]
    fn test_terminated_engine_does_not_advance() {
        let mut game = engine();
        game.bird.y = -50.0;
        assert!(game.step(Action::NoOp, 0.0).terminal);
        let bird = game.bird();

        let outcome = game.step(Action::Flap, 1000.0);
        assert!(outcome.terminal);
        assert_eq!(outcome.reward, 0.0);
        assert_eq!(game.bird(), bird);
    }

    #[test]
    fn test_spawn_timer_uses_elapsed_time() {
        let mut game = engine();
        game.step(Action::Flap, 1400.0);
        assert_eq!(game.pipes().len(), 1, "timer must exceed the interval, not reach it");
        game.step(Action::NoOp, 1.0);
        assert_eq!(game.pipes().len(), 2);
        assert_eq!(game.spawn_timer_ms, 0.0);
        assert_eq!(game.pipes()[1].x, 288.0 - 1.2);
    }

    #[test]
    fn test_gap_size_invariant_across_spawns() {
        let mut game = engine();
        for _ in 0..200 {
            game.spawn_pipe();
        }
        for pipe in game.pipes() {
            assert!((pipe.bottom_start() - pipe.top_height() - 180.0).abs() < 1e-4);
            assert!(pipe.top_height() >= 50.0 && pipe.top_height() <= 282.0);
        }
    }

    #[test]
    fn test_pipes_move_and_despawn() {
        let mut game = engine();
        game.pipes = vec![Pipe::new(-35.0, 100.0, 180.0), Pipe::new(100.0, 100.0, 180.0)];
        game.step(Action::Flap, 0.0);
        assert_eq!(game.pipes().len(), 1);
        assert!((game.pipes()[0].x - 98.8).abs() < 1e-4);
    }

    #[test]
    fn test_pipe_collision_scenario() {
        let pipe = Pipe::new(40.0, 100.0, 180.0);
        assert_eq!(pipe.bottom_start(), 280.0);

        let inside = Hitbox::new(56.0, 105.0, 22.0, 170.0);
        assert!(!pipe.collides(&inside, 36.0, 512.0));

        let above = Hitbox::new(56.0, 95.0, 22.0, 12.0);
        assert!(pipe.collides(&above, 36.0, 512.0));

        let below = Hitbox::new(56.0, 275.0, 22.0, 12.0);
        assert!(pipe.collides(&below, 36.0, 512.0));

        // same heights but outside the pipe's horizontal span
        let beside = Hitbox::new(80.0, 95.0, 22.0, 12.0);
        assert!(!pipe.collides(&beside, 36.0, 512.0));
    }

    #[test]
    fn test_engine_collision_with_pipe_terminates() {
        let mut game = engine();
        game.pipes = vec![Pipe::new(50.0, 300.0, 180.0)];
        let outcome = game.step(Action::NoOp, 0.0);
        assert!(outcome.terminal);
        assert_eq!(outcome.reward, -1.0);
        assert!(!game.alive());
    }

    #[test]
    fn test_passing_pipe_scores_once_and_overrides_alive_bonus() {
        let mut game = engine();
        // right edge at 50.2 moves to 49.0, left of the bird
        game.pipes = vec![Pipe::new(14.2, 150.0, 180.0)];
        let outcome = game.step(Action::NoOp, 0.0);
        assert_eq!(outcome.score, 1);
        assert_eq!(outcome.reward, 1.0);
        assert!(game.pipes()[0].passed());

        let outcome = game.step(Action::NoOp, 0.0);
        assert_eq!(outcome.score, 1);
        assert_eq!(outcome.reward, 0.1);
    }

    #[test]
    fn test_pass_on_the_dying_tick_keeps_pass_reward() {
        let mut game = engine();
        game.bird.y = -50.0;
        game.pipes = vec![Pipe::new(14.2, 150.0, 180.0)];

        let outcome = game.step(Action::NoOp, 0.0);

        assert!(outcome.terminal);
        assert!(!game.alive());
        assert_eq!(outcome.score, 1);
        assert_eq!(outcome.reward, game.config().pass_reward);
    }

    #[test]
    fn test_dead_bird_falls_to_rest() {
        let mut bird = Bird { y: 470.0, velocity: -2.0 };
        let mut ticks = 0;
        while bird.fall(0.1, 480.0) {
            ticks += 1;
            assert!(ticks < 1_000);
        }
        assert!(bird.y >= 480.0);
        assert!(ticks > 1);

        // already resting: nothing moves
        let before = bird;
        assert!(!bird.fall(0.1, 480.0));
        assert_eq!(bird, before);
    }

    #[test]
    fn test_frame_state_mirrors_engine() {
        let mut game = engine();
        game.step(Action::NoOp, 0.0);
        let frame = game.frame_state();
        assert_eq!(frame.bird_x, 50.0);
        assert_eq!(frame.bird_y, game.bird().y);
        assert_eq!(frame.pipes, game.pipes());
        assert!(!frame.terminal);
        assert!(!frame.flapped);
    }
}
