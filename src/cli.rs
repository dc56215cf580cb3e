use clap::Args;
use log::LevelFilter;
use std::path::PathBuf;

use crate::config::TrainingConfig;

/// Training knobs shared by the windowed and headless binaries.
#[derive(Args, Debug, Clone)]
pub struct TrainingArgs {
    /// Number of training episodes
    #[arg(long, default_value_t = 200)]
    pub episodes: usize,
    /// Greedy episodes to run once training is done
    #[arg(long, default_value_t = 3)]
    pub watch_episodes: usize,
    #[arg(long)]
    pub learning_rate: Option<f32>,
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Episodes between target network syncs
    #[arg(long)]
    pub sync_interval: Option<usize>,
    /// Cut training episodes off after this many ticks
    #[arg(long)]
    pub max_ticks: Option<u64>,
    /// Write per-episode training history as csv
    #[arg(long)]
    pub history: Option<PathBuf>,
}

impl TrainingArgs {
    pub fn apply(&self, training: &mut TrainingConfig) {
        if let Some(learning_rate) = self.learning_rate {
            training.learning_rate = learning_rate;
        }
        if let Some(batch_size) = self.batch_size {
            training.batch_size = batch_size;
        }
        if let Some(interval) = self.sync_interval {
            training.target_sync_interval = interval;
        }
        if self.max_ticks.is_some() {
            training.max_episode_ticks = self.max_ticks;
        }
    }
}

/// Flags every binary takes.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Seed for the agent and the game; random when omitted
    #[arg(long, global = true)]
    pub seed: Option<u64>,
    #[arg(long, global = true, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}
