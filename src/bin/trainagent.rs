use anyhow::Result;
use clap::Parser;
use rand::Rng;

use flappers::cli::{CommonArgs, TrainingArgs};
use flappers::config::Config;
use flappers::logging::init_logging;
use flappers::playback;
use flappers::DqnAgent;

/// Headless dqn training followed by a greedy evaluation.
#[derive(Parser, Debug)]
#[command(name = "trainagent")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
    #[command(flatten)]
    training: TrainingArgs,
    /// Tick cap for each evaluation episode
    #[arg(long, default_value_t = 20_000)]
    eval_max_ticks: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.common.log_level);

    let seed = args.common.seed.unwrap_or_else(|| rand::rng().random());
    let mut config = Config::default();
    config.training.seed = Some(seed);
    args.training.apply(&mut config.training);
    log::info!("training config: {:?}", config.training);

    let mut agent = DqnAgent::new(config)?;
    log::info!("starting training for {} episodes", args.training.episodes);
    let history = agent.train(args.training.episodes);
    log::info!(
        "training finished, best score {}, avg score(20) {:.2}",
        history.best_score(),
        history.average_score(20)
    );

    if let Some(path) = &args.training.history {
        history.write_csv(path)?;
        log::info!("wrote training history to {}", path.display());
    }

    let game = agent.config().game.clone();
    let summaries = playback::evaluate(
        &mut agent,
        &game,
        args.training.watch_episodes,
        seed,
        Some(args.eval_max_ticks),
    )?;
    let scores: Vec<u32> = summaries.iter().map(|summary| summary.score).collect();
    log::info!("greedy evaluation scores: {:?}", scores);

    Ok(())
}
