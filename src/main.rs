use ::rand::rngs::StdRng;
use ::rand::{Rng, SeedableRng};
use anyhow::Result;
use clap::{Parser, Subcommand};
use macroquad::prelude::*;

use flappers::cli::{CommonArgs, TrainingArgs};
use flappers::config::{Config, GameConfig};
use flappers::game::{Action, Bird, Engine, FrameState};
use flappers::history::TrainingHistory;
use flappers::logging::init_logging;
use flappers::playback::EpisodeRunner;
use flappers::render::{draw_centered_text, draw_frame};
use flappers::{Controller, DqnAgent, RuleBasedController};

const WINDOW_SCALE: f32 = 1.5;
const TITLE_TEXT_SIZE: f32 = 48.0;
const HINT_TEXT_SIZE: f32 = 24.0;
const EPISODE_PAUSE: f64 = 1.0; // seconds
const TRAIN_EPISODES_PER_FRAME: usize = 2;
const MAX_FRAME_TIME: f32 = 0.25; // seconds
const DEAD_BIRD_REST_Y: f32 = 480.0;

#[derive(Parser, Debug)]
#[command(name = "flappers", about = "Flappy bird, played by you, a rule-based controller or a dqn agent")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Flap with space
    Play,
    /// Watch the rule-based controller
    Watch {
        #[arg(long, default_value_t = 3)]
        episodes: usize,
    },
    /// Train the dqn agent, then watch it play greedily
    Train(TrainingArgs),
}

fn window_conf() -> Conf {
    let game = GameConfig::default();
    Conf {
        window_title: "flappers".to_owned(),
        window_width: (game.screen_width * WINDOW_SCALE) as i32,
        window_height: (game.screen_height * WINDOW_SCALE) as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.common.log_level);

    if let Err(err) = run(cli).await {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let seed = cli.common.seed.unwrap_or_else(|| ::rand::rng().random());
    log::info!("seed {}", seed);

    match cli.mode.unwrap_or(Mode::Play) {
        Mode::Play => play(GameConfig::default(), seed).await,
        Mode::Watch { episodes } => {
            let mut controller = RuleBasedController::new();
            watch(&mut controller, &GameConfig::default(), episodes, seed).await
        }
        Mode::Train(args) => {
            let mut config = Config::default();
            config.training.seed = Some(seed);
            args.apply(&mut config.training);
            let game = config.game.clone();

            let Some(mut agent) = train(config, &args).await? else {
                return Ok(());
            };
            watch(&mut agent, &game, args.watch_episodes, seed).await
        }
    }
}

// fixed-step accumulator: whole ticks owed for the time since the last frame
struct TickClock {
    tick_seconds: f32,
    accumulator: f32,
}

impl TickClock {
    fn new(config: &GameConfig) -> Self {
        Self { tick_seconds: config.tick_ms() / 1000.0, accumulator: 0.0 }
    }

    fn due_ticks(&mut self) -> usize {
        self.accumulator += get_frame_time().min(MAX_FRAME_TIME);
        let mut ticks = 0;
        while self.accumulator >= self.tick_seconds {
            self.accumulator -= self.tick_seconds;
            ticks += 1;
        }
        ticks
    }
}

enum PlayState {
    Waiting,
    Playing,
    GameOver,
}

async fn play(config: GameConfig, seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut engine = Engine::new(config.clone(), StdRng::seed_from_u64(rng.random()))?;
    let mut clock = TickClock::new(&config);
    let mut state = PlayState::Waiting;
    let mut flap_queued = false;
    let mut falling = Bird { y: 0.0, velocity: 0.0 };

    loop {
        if is_key_pressed(KeyCode::Escape) {
            return Ok(());
        }
        let space = is_key_pressed(KeyCode::Space);

        match state {
            PlayState::Waiting => {
                if space {
                    state = PlayState::Playing;
                    flap_queued = true;
                    clock = TickClock::new(&config);
                }
            }
            PlayState::Playing => {
                flap_queued |= space;
                for _ in 0..clock.due_ticks() {
                    let action = if flap_queued { Action::Flap } else { Action::NoOp };
                    flap_queued = false;
                    let outcome = engine.step(action, config.tick_ms());
                    if outcome.terminal {
                        log::info!("game over, score {}", outcome.score);
                        falling = engine.bird();
                        state = PlayState::GameOver;
                        break;
                    }
                }
            }
            PlayState::GameOver => {
                for _ in 0..clock.due_ticks() {
                    falling.fall(config.gravity, DEAD_BIRD_REST_Y);
                }
                if space {
                    engine = Engine::new(config.clone(), StdRng::seed_from_u64(rng.random()))?;
                    state = PlayState::Waiting;
                }
            }
        }

        let mut frame = engine.frame_state();
        if let PlayState::GameOver = state {
            frame.bird_y = falling.y;
            frame.bird_velocity = falling.velocity;
        }
        draw_frame(&frame, &config);
        match state {
            PlayState::Waiting => {
                draw_centered_text("PRESS SPACE", screen_height() / 2.0, TITLE_TEXT_SIZE);
            }
            PlayState::GameOver => {
                draw_centered_text("GAME OVER", screen_height() / 2.0, TITLE_TEXT_SIZE);
                draw_centered_text("space to retry", screen_height() / 2.0 + 40.0, HINT_TEXT_SIZE);
            }
            PlayState::Playing => {}
        }

        next_frame().await
    }
}

// Runs `episodes` on screen at the simulated tick rate. Returns early on escape.
async fn watch<C: Controller>(controller: &mut C, config: &GameConfig, episodes: usize, seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let label = controller.name().to_string();

    for episode in 0..episodes {
        let mut runner = EpisodeRunner::new(config.clone(), StdRng::seed_from_u64(rng.random()), &mut *controller)?;
        let mut clock = TickClock::new(config);
        let mut frame: FrameState = runner.engine().frame_state();

        while !runner.is_finished() {
            if is_key_pressed(KeyCode::Escape) {
                return Ok(());
            }
            for _ in 0..clock.due_ticks() {
                match runner.tick(config.tick_ms()) {
                    Some(next) => frame = next,
                    None => break,
                }
            }

            draw_frame(&frame, config);
            draw_episode_label(&label, episode, episodes);
            next_frame().await
        }
        log::info!("{} watch episode {}: score {}", label, episode + 1, frame.score);

        let resume_at = get_time() + EPISODE_PAUSE;
        while get_time() < resume_at {
            if is_key_pressed(KeyCode::Escape) {
                return Ok(());
            }
            draw_frame(&frame, config);
            draw_episode_label(&label, episode, episodes);
            draw_centered_text("GAME OVER", screen_height() / 2.0, TITLE_TEXT_SIZE);
            next_frame().await
        }
    }

    Ok(())
}

fn draw_episode_label(label: &str, episode: usize, episodes: usize) {
    let text = format!("{}  {}/{}", label, episode + 1, episodes);
    draw_text(&text, 10.0, screen_height() - 12.0, HINT_TEXT_SIZE, WHITE);
}

// Trains a few episodes per frame while drawing progress. `None` if the
// window was closed out with escape.
async fn train(config: Config, args: &TrainingArgs) -> Result<Option<DqnAgent>> {
    let mut agent = DqnAgent::new(config)?;
    let mut history = TrainingHistory::new();

    while history.len() < args.episodes {
        if is_key_pressed(KeyCode::Escape) {
            return Ok(None);
        }
        let chunk = TRAIN_EPISODES_PER_FRAME.min(args.episodes - history.len());
        agent.train_into(&mut history, chunk);

        clear_background(Color::new(0.1, 0.1, 0.2, 1.0));
        let y = screen_height() / 2.0 - 60.0;
        draw_centered_text("TRAINING", y, TITLE_TEXT_SIZE);
        draw_centered_text(&format!("episode {}/{}", history.len(), args.episodes), y + 40.0, HINT_TEXT_SIZE);
        draw_centered_text(&format!("epsilon {:.3}", agent.epsilon()), y + 70.0, HINT_TEXT_SIZE);
        draw_centered_text(&format!("avg score (20) {:.2}", history.average_score(20)), y + 100.0, HINT_TEXT_SIZE);
        draw_centered_text(&format!("best {}", history.best_score()), y + 130.0, HINT_TEXT_SIZE);
        next_frame().await
    }

    log::info!(
        "training finished after {} episodes, best score {}, avg score(20) {:.2}",
        history.len(),
        history.best_score(),
        history.average_score(20)
    );
    if let Some(path) = &args.history {
        history.write_csv(path)?;
        log::info!("wrote training history to {}", path.display());
    }

    Ok(Some(agent))
}
