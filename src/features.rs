use crate::config::GameConfig;
use crate::game::Pipe;
use crate::sequential::tensor::Tensor;

pub const OBSERVATION_SIZE: usize = 4;

// [bird y, bird velocity, pipe dx, gap center dy], each normalised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation(pub [f32; OBSERVATION_SIZE]);

impl Observation {
    pub fn bird_y(&self) -> f32 {self.0[0]}
    pub fn bird_velocity(&self) -> f32 {self.0[1]}
    pub fn pipe_dx(&self) -> f32 {self.0[2]}
    pub fn gap_dy(&self) -> f32 {self.0[3]}

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn to_tensor(&self) -> Tensor {
        Tensor::from_vec(self.0.to_vec(), vec![1, OBSERVATION_SIZE])
    }
}

// First pipe whose right edge is still ahead of the bird, else the first pipe.
pub fn next_pipe<'a>(config: &GameConfig, pipes: &'a [Pipe]) -> Option<&'a Pipe> {
    pipes
        .iter()
        .find(|pipe| pipe.x + config.pipe_width > config.bird_x)
        .or_else(|| pipes.first())
}

pub fn extract(config: &GameConfig, bird_y: f32, bird_velocity: f32, pipes: &[Pipe]) -> Observation {
    // an empty pipe list only exists before the first spawn; the pipe terms read as zero
    let (pipe_dx, gap_dy) = match next_pipe(config, pipes) {
        Some(pipe) => (pipe.x - config.bird_x, pipe.gap_center() - bird_y),
        None => (0.0, 0.0),
    };

    Observation([
        bird_y / config.screen_height,
        bird_velocity / config.velocity_scale,
        pipe_dx / config.screen_width,
        gap_dy / config.screen_height,
    ])
}
