pub mod sequential;

pub use sequential::tensor::Tensor;
pub use sequential::layer::{
    Layer,
    Dense,
    ReLU,
};
pub use sequential::loss::{
    Loss,
    MeanSquaredError
};
pub use sequential::optimizer::{
    Optimizer,
    SGD,
    Adam,
};
pub use sequential::Sequential;

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, GameConfig, TrainingConfig};

pub mod game;
pub mod features;

pub use game::{Action, Engine, FrameState, StepOutcome};
pub use features::Observation;

pub mod agent;
pub mod history;
pub mod playback;

pub use agent::{Controller, DqnAgent};
pub use agent::rule_based::RuleBasedController;
pub use agent::replaybuffer::ReplayBuffer;
pub use history::{EpisodeRecord, TrainingHistory};

pub mod render;
pub mod cli;
