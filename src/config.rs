use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("screen dimensions must be positive, got {width}x{height}")]
    ScreenSize { width: f32, height: f32 },
    #[error("pipe gap {gap} must be positive and fit inside screen height {height}")]
    GapSize { gap: f32, height: f32 },
    #[error("pipe top height bounds [{min}, {max}] must satisfy 0 < min <= max and max + gap <= screen height")]
    PipeHeightBounds { min: f32, max: f32 },
    #[error("bird start y {start_y} must lie inside the screen")]
    BirdStart { start_y: f32 },
    #[error("hitbox margins ({margin_x}, {margin_y}) leave no hitbox inside a {width}x{height} sprite")]
    Hitbox { margin_x: f32, margin_y: f32, width: f32, height: f32 },
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },
    #[error("{name} must be at least 1")]
    Zero { name: &'static str },
    #[error("batch size {batch_size} exceeds replay capacity {capacity}")]
    BatchExceedsCapacity { batch_size: usize, capacity: usize },
    #[error("{name} must lie in {range}, got {value}")]
    OutOfRange { name: &'static str, range: &'static str, value: f32 },
    #[error("epsilon floor {floor} is above epsilon start {start}")]
    EpsilonFloor { floor: f32, start: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub screen_width: f32,
    pub screen_height: f32,
    pub bird_x: f32,
    pub bird_start_y: f32,
    pub bird_width: f32,
    pub bird_height: f32,
    pub hitbox_margin_x: f32,
    pub hitbox_margin_y: f32,
    // added to the velocity every tick
    pub gravity: f32,
    // velocity a flap resets to (negative is up)
    pub flap_velocity: f32,
    pub pipe_width: f32,
    // pixels per tick
    pub pipe_speed: f32,
    // milliseconds between pipe spawns
    pub spawn_interval_ms: f32,
    pub pipe_gap: f32,
    pub pipe_min_top: f32,
    pub pipe_max_top: f32,
    // divisor for the velocity feature
    pub velocity_scale: f32,
    pub alive_reward: f32,
    pub death_reward: f32,
    pub pass_reward: f32,
    // simulated rate used by fixed-step drivers
    pub ticks_per_second: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            screen_width: 288.0,
            screen_height: 512.0,
            bird_x: 50.0,
            bird_start_y: 200.0,
            bird_width: 34.0,
            bird_height: 24.0,
            hitbox_margin_x: 6.0,
            hitbox_margin_y: 6.0,
            gravity: 0.1,
            flap_velocity: -4.5,
            pipe_width: 36.0,
            pipe_speed: 1.2,
            spawn_interval_ms: 1400.0,
            pipe_gap: 180.0,
            pipe_min_top: 50.0,
            pipe_max_top: 282.0,
            velocity_scale: 10.0,
            alive_reward: 0.1,
            death_reward: -1.0,
            pass_reward: 1.0,
            ticks_per_second: 120.0,
        }
    }
}

impl GameConfig {
    pub fn tick_ms(&self) -> f32 {
        1000.0 / self.ticks_per_second
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.screen_width > 0.0 && self.screen_height > 0.0) {
            return Err(ConfigError::ScreenSize {
                width: self.screen_width,
                height: self.screen_height,
            });
        }
        if !(self.pipe_gap > 0.0 && self.pipe_gap < self.screen_height) {
            return Err(ConfigError::GapSize { gap: self.pipe_gap, height: self.screen_height });
        }
        if !(self.pipe_min_top > 0.0
            && self.pipe_min_top <= self.pipe_max_top
            && self.pipe_max_top + self.pipe_gap <= self.screen_height)
        {
            return Err(ConfigError::PipeHeightBounds { min: self.pipe_min_top, max: self.pipe_max_top });
        }
        if !(self.bird_start_y >= 0.0 && self.bird_start_y + self.bird_height <= self.screen_height) {
            return Err(ConfigError::BirdStart { start_y: self.bird_start_y });
        }
        if !(self.hitbox_margin_x >= 0.0
            && self.hitbox_margin_y >= 0.0
            && 2.0 * self.hitbox_margin_x < self.bird_width
            && 2.0 * self.hitbox_margin_y < self.bird_height)
        {
            return Err(ConfigError::Hitbox {
                margin_x: self.hitbox_margin_x,
                margin_y: self.hitbox_margin_y,
                width: self.bird_width,
                height: self.bird_height,
            });
        }
        for (name, value) in [
            ("pipe_width", self.pipe_width),
            ("pipe_speed", self.pipe_speed),
            ("spawn_interval_ms", self.spawn_interval_ms),
            ("velocity_scale", self.velocity_scale),
            ("ticks_per_second", self.ticks_per_second),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

// Hyperparameters of the DQN training loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub hidden_size: usize,
    pub replay_capacity: usize,
    pub batch_size: usize,
    pub discount: f32,
    pub learning_rate: f32,
    pub epsilon_start: f32,
    pub epsilon_floor: f32,
    pub epsilon_decay: f32,
    // target network is overwritten every this many episodes
    pub target_sync_interval: usize,
    pub log_every: usize,
    pub seed: Option<u64>,
    // truncates an episode that is still alive after this many ticks
    pub max_episode_ticks: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_size: 64,
            replay_capacity: 10_000,
            batch_size: 64,
            discount: 0.99,
            learning_rate: 1e-3,
            epsilon_start: 1.0,
            epsilon_floor: 0.01,
            epsilon_decay: 0.995,
            target_sync_interval: 10,
            log_every: 20,
            seed: None,
            max_episode_ticks: None,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("hidden_size", self.hidden_size),
            ("replay_capacity", self.replay_capacity),
            ("batch_size", self.batch_size),
            ("target_sync_interval", self.target_sync_interval),
            ("log_every", self.log_every),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { name });
            }
        }
        if self.batch_size > self.replay_capacity {
            return Err(ConfigError::BatchExceedsCapacity {
                batch_size: self.batch_size,
                capacity: self.replay_capacity,
            });
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(ConfigError::OutOfRange { name: "discount", range: "[0, 1]", value: self.discount });
        }
        if !(self.learning_rate > 0.0) {
            return Err(ConfigError::NonPositive { name: "learning_rate", value: self.learning_rate });
        }
        for (name, value) in [("epsilon_start", self.epsilon_start), ("epsilon_floor", self.epsilon_floor)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, range: "[0, 1]", value });
            }
        }
        if self.epsilon_floor > self.epsilon_start {
            return Err(ConfigError::EpsilonFloor { floor: self.epsilon_floor, start: self.epsilon_start });
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "epsilon_decay",
                range: "(0, 1]",
                value: self.epsilon_decay,
            });
        }
        if self.max_episode_ticks == Some(0) {
            return Err(ConfigError::Zero { name: "max_episode_ticks" });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub game: GameConfig,
    pub training: TrainingConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate()?;
        self.training.validate()
    }
}
