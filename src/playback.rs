use crate::agent::Controller;
use crate::config::{ConfigError, GameConfig};
use crate::game::{Engine, FrameState};

use rand::prelude::*;
use rand::rngs::StdRng;

// Drives one episode with a controller and no learning, frame by frame.
pub struct EpisodeRunner<'a, C: Controller + ?Sized> {
    engine: Engine,
    controller: &'a mut C,
    max_ticks: Option<u64>,
    finished: bool,
}

impl<'a, C: Controller + ?Sized> EpisodeRunner<'a, C> {
    pub fn new(config: GameConfig, rng: StdRng, controller: &'a mut C) -> Result<Self, ConfigError> {
        Ok(Self {
            engine: Engine::new(config, rng)?,
            controller,
            max_ticks: None,
            finished: false,
        })
    }

    pub fn with_max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // Advances one tick; `None` once the episode has ended.
    pub fn tick(&mut self, elapsed_ms: f32) -> Option<FrameState> {
        if self.finished {
            return None;
        }

        let action = self.controller.decide(&self.engine.observation());
        let outcome = self.engine.step(action, elapsed_ms);
        let capped = self.max_ticks.is_some_and(|max| self.engine.ticks() >= max);
        self.finished = outcome.terminal || capped;

        Some(self.engine.frame_state())
    }
}

// fixed-step frames at the configured tick rate, ending with the terminal frame
impl<C: Controller + ?Sized> Iterator for EpisodeRunner<'_, C> {
    type Item = FrameState;

    fn next(&mut self) -> Option<FrameState> {
        let tick_ms = self.engine.config().tick_ms();
        self.tick(tick_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeSummary {
    pub score: u32,
    pub ticks: u64,
    pub terminal: bool,
}

// Runs `episodes` headless episodes and reports how each one ended.
pub fn evaluate<C: Controller + ?Sized>(
    controller: &mut C,
    config: &GameConfig,
    episodes: usize,
    seed: u64,
    max_ticks: Option<u64>,
) -> Result<Vec<EpisodeSummary>, ConfigError> {
    config.validate()?;
    let name = controller.name().to_string();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut summaries = Vec::with_capacity(episodes);

    for episode in 0..episodes {
        let engine_rng = StdRng::seed_from_u64(rng.random());
        let mut runner = EpisodeRunner::new(config.clone(), engine_rng, &mut *controller)?.with_max_ticks(max_ticks);
        for _frame in runner.by_ref() {}

        let engine = runner.engine();
        let summary = EpisodeSummary { score: engine.score(), ticks: engine.ticks(), terminal: !engine.alive() };
        log::info!(
            "{} evaluation episode {}: score {}, ticks {}",
            name,
            episode + 1,
            summary.score,
            summary.ticks
        );
        summaries.push(summary);
    }

    Ok(summaries)
}
