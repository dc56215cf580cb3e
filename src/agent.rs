pub mod exploration;
pub mod qnetwork;
pub mod replaybuffer;
pub mod rule_based;

use exploration::{ActionSelector, EpsilonGreedy, ExplorationSchedule, Greedy};
use qnetwork::QNetwork;
use replaybuffer::{ReplayBuffer, Transition, TransitionBatch};
use crate::config::{Config, ConfigError};
use crate::features::Observation;
use crate::game::{Action, Engine};
use crate::history::{EpisodeRecord, TrainingHistory};
use crate::sequential::tensor::Tensor;

use rand::prelude::*;
use rand::rngs::StdRng;

const AVERAGE_WINDOW: usize = 20;

pub trait Controller {
    fn name(&self) -> &str;
    fn decide(&mut self, observation: &Observation) -> Action;
}

// Deep Q-learning agent: policy and target networks, replay memory and an
// epsilon-greedy explorer, trained one episode at a time.
pub struct DqnAgent {
    config: Config,
    policy: QNetwork,
    target: QNetwork,
    replay_buffer: ReplayBuffer<Transition>,
    explorer: EpsilonGreedy,
    rng: StdRng,
    episodes_completed: usize,
}

impl DqnAgent {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let seed = config.training.seed.unwrap_or_else(|| rand::rng().random());
        log::info!("initializing dqn agent with seed {}", seed);
        let mut rng = StdRng::seed_from_u64(seed);

        let training = &config.training;
        let policy = QNetwork::new(training.hidden_size, training.learning_rate, &mut rng);
        let target = policy.clone();
        let replay_buffer = ReplayBuffer::new(training.replay_capacity);
        let explorer = EpsilonGreedy::new(ExplorationSchedule::new(
            training.epsilon_start,
            training.epsilon_floor,
            training.epsilon_decay,
        ));

        Ok(Self {
            config,
            policy,
            target,
            replay_buffer,
            explorer,
            rng,
            episodes_completed: 0,
        })
    }

    pub fn config(&self) -> &Config {&self.config}
    pub fn epsilon(&self) -> f32 {self.explorer.epsilon()}
    pub fn episodes_completed(&self) -> usize {self.episodes_completed}
    pub fn replay_buffer(&self) -> &ReplayBuffer<Transition> {&self.replay_buffer}
    pub fn policy(&self) -> &QNetwork {&self.policy}
    pub fn target(&self) -> &QNetwork {&self.target}

    pub fn train(&mut self, num_episodes: usize) -> TrainingHistory {
        let mut history = TrainingHistory::new();
        self.train_into(&mut history, num_episodes);
        history
    }

    // Like `train`, appending to an existing history so progress logging
    // sees the whole run.
    pub fn train_into(&mut self, history: &mut TrainingHistory, num_episodes: usize) {
        for _ in 0..num_episodes {
            let record = self.train_episode();
            let log_due = record.episode % self.config.training.log_every == 0;
            history.push(record);

            if log_due {
                let last = &history.records()[history.len() - 1];
                log::info!(
                    "episode {}, score: {}, epsilon: {:.3}, avg score({}): {:.2}",
                    last.episode,
                    last.score,
                    last.epsilon,
                    AVERAGE_WINDOW,
                    history.average_score(AVERAGE_WINDOW)
                );
            }
        }
    }

    // Plays one exploring episode into the replay buffer, then decays epsilon,
    // takes at most one gradient step and syncs the target when due.
    pub fn train_episode(&mut self) -> EpisodeRecord {
        let episode = self.episodes_completed;
        let game_config = self.config.game.clone();
        let tick_ms = game_config.tick_ms();
        let max_ticks = self.config.training.max_episode_ticks;

        let engine_rng = StdRng::seed_from_u64(self.rng.random());
        let mut engine = Engine::with_validated(game_config, engine_rng);

        let mut observation = engine.observation();
        let mut total_reward = 0.0;
        let mut truncated = false;

        loop {
            let q_values = self.policy.evaluate(&observation);
            let action = self.explorer.select(&q_values, &mut self.rng);

            let outcome = engine.step(action, tick_ms);
            let next_observation = engine.observation();
            total_reward += outcome.reward;

            self.replay_buffer.push(Transition {
                observation,
                action,
                reward: outcome.reward,
                next_observation,
                terminal: outcome.terminal,
            });
            observation = next_observation;

            if outcome.terminal {
                break;
            }
            if max_ticks.is_some_and(|max| engine.ticks() >= max) {
                truncated = true;
                break;
            }
        }

        let epsilon = self.explorer.decay();
        let loss = self.optimize();
        let target_synced = episode % self.config.training.target_sync_interval == 0;
        if target_synced {
            self.sync_target();
        }
        self.episodes_completed += 1;

        EpisodeRecord {
            episode,
            score: engine.score(),
            total_reward,
            ticks: engine.ticks(),
            epsilon,
            loss,
            target_synced,
            truncated,
        }
    }

    // One gradient step on a uniformly sampled batch. Returns `None` until
    // the buffer holds a full batch.
    pub fn optimize(&mut self) -> Option<f32> {
        let batch_size = self.config.training.batch_size;
        if self.replay_buffer.len() < batch_size {
            return None;
        }

        let batch = match self.replay_buffer.sample(batch_size, &mut self.rng) {
            Ok(sample) => TransitionBatch::from_transitions(&sample),
            Err(err) => {
                log::warn!("skipping optimization: {}", err);
                return None;
            }
        };

        let targets = self.bootstrap_targets(&batch);
        let loss = self.policy.train_on_batch(&batch.observations, &targets);
        log::debug!("episode {}, batch loss: {:.5}", self.episodes_completed, loss);

        Some(loss)
    }

    // policy predictions with the taken action's entry replaced by
    // r + discount * max_a target(s', a), or just r on terminal transitions
    fn bootstrap_targets(&mut self, batch: &TransitionBatch) -> Tensor {
        let discount = self.config.training.discount;
        let max_next_q = self.target.evaluate_batch(&batch.next_observations).max_rows();
        let targets = self.policy.evaluate_batch(&batch.observations);

        {
            let mut targets_data = targets.write();
            for i in 0..batch.len() {
                let bootstrap = if batch.terminals[i] { 0.0 } else { max_next_q[i] };
                targets_data[i * Action::COUNT + batch.actions[i]] = batch.rewards[i] + discount * bootstrap;
            }
        }

        targets
    }

    pub fn sync_target(&mut self) {
        self.target.copy_from(&self.policy);
        log::debug!("target network synced after {} episodes", self.episodes_completed);
    }
}

impl Controller for DqnAgent {
    fn name(&self) -> &str {
        "dqn"
    }

    // greedy: exploration is never applied outside training
    fn decide(&mut self, observation: &Observation) -> Action {
        let q_values = self.policy.evaluate(observation);
        Greedy.select(&q_values, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;

    fn small_config(seed: u64) -> Config {
        Config {
            training: TrainingConfig {
                hidden_size: 16,
                replay_capacity: 2_000,
                batch_size: 8,
                target_sync_interval: 3,
                seed: Some(seed),
                max_episode_ticks: Some(400),
                ..TrainingConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_new_agent_starts_synchronised() {
        let agent = DqnAgent::new(small_config(1)).unwrap();
        assert_eq!(agent.policy().parameters(), agent.target().parameters());
        assert_eq!(agent.epsilon(), 1.0);
        assert!(agent.replay_buffer().is_empty());
        assert_eq!(agent.episodes_completed(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = small_config(1);
        config.training.discount = 1.5;
        assert!(DqnAgent::new(config).is_err());
    }

    #[test]
    fn test_episode_fills_buffer_and_decays_epsilon() {
        let mut agent = DqnAgent::new(small_config(2)).unwrap();
        let record = agent.train_episode();

        assert_eq!(record.episode, 0);
        assert!(record.ticks > 0);
        assert_eq!(agent.replay_buffer().len() as u64, record.ticks);
        assert!((record.epsilon - 0.995).abs() < 1e-6);
        assert_eq!(agent.epsilon(), record.epsilon);

        let last = agent.replay_buffer().iter().last().unwrap();
        assert_eq!(last.terminal, !record.truncated);
    }

    #[test]
    fn test_no_gradient_step_before_full_batch() {
        let mut config = small_config(3);
        config.training.batch_size = 2_000;
        let mut agent = DqnAgent::new(config).unwrap();
        let before = agent.policy().parameters();

        let record = agent.train_episode();

        assert_eq!(record.loss, None);
        assert_eq!(agent.policy().parameters(), before);
    }

    #[test]
    fn test_gradient_step_leaves_target_untouched() {
        let mut agent = DqnAgent::new(small_config(4)).unwrap();
        while agent.replay_buffer().len() < 8 {
            agent.train_episode();
        }
        agent.sync_target();
        let target_before = agent.target().parameters();
        let policy_before = agent.policy().parameters();

        let loss = agent.optimize();

        assert!(loss.is_some_and(|l| l.is_finite()));
        assert_ne!(agent.policy().parameters(), policy_before);
        assert_eq!(agent.target().parameters(), target_before);
    }

    #[test]
    fn test_target_sync_cadence() {
        let mut agent = DqnAgent::new(small_config(5)).unwrap();
        for episode in 0..7 {
            let record = agent.train_episode();
            assert_eq!(record.target_synced, episode % 3 == 0, "episode {}", episode);
            if record.target_synced {
                assert_eq!(agent.policy().parameters(), agent.target().parameters());
            }
        }
    }

    #[test]
    fn test_epsilon_monotone_over_training() {
        let mut config = small_config(6);
        config.training.epsilon_decay = 0.5;
        config.training.epsilon_floor = 0.1;
        let mut agent = DqnAgent::new(config).unwrap();

        let history = agent.train(12);

        let mut previous = 1.0;
        for record in history.records() {
            assert!(record.epsilon <= previous);
            assert!(record.epsilon >= 0.1);
            previous = record.epsilon;
        }
        assert_eq!(agent.epsilon(), 0.1);
        assert_eq!(agent.episodes_completed(), 12);
    }

    #[test]
    fn test_training_in_chunks_matches_one_run() {
        let mut whole = DqnAgent::new(small_config(10)).unwrap();
        let expected = whole.train(6);

        let mut chunked = DqnAgent::new(small_config(10)).unwrap();
        let mut history = TrainingHistory::new();
        chunked.train_into(&mut history, 2);
        chunked.train_into(&mut history, 4);

        assert_eq!(history.records(), expected.records());
        assert_eq!(chunked.policy().parameters(), whole.policy().parameters());
    }

    #[test]
    fn test_truncation_caps_episode_length() {
        let mut config = small_config(7);
        config.training.max_episode_ticks = Some(5);
        let mut agent = DqnAgent::new(config).unwrap();
        for _ in 0..5 {
            let record = agent.train_episode();
            assert!(record.ticks <= 5);
        }
    }

    #[test]
    fn test_bootstrap_targets() {
        let mut agent = DqnAgent::new(small_config(8)).unwrap();
        let live = Transition {
            observation: Observation([0.4, 0.0, 0.5, 0.0]),
            action: Action::Flap,
            reward: 0.1,
            next_observation: Observation([0.41, 0.01, 0.49, -0.01]),
            terminal: false,
        };
        let dead = Transition {
            observation: Observation([0.9, 0.5, 0.2, -0.3]),
            action: Action::NoOp,
            reward: -1.0,
            next_observation: Observation([0.95, 0.51, 0.19, -0.35]),
            terminal: true,
        };
        let batch = TransitionBatch::from_transitions(&[&live, &dead]);

        // policy drifts away from the target so the bootstrap source is observable
        agent.policy = QNetwork::new(16, 1e-3, &mut StdRng::seed_from_u64(99));
        assert_ne!(agent.policy().parameters(), agent.target().parameters());

        let max = |values: Vec<f32>| values.into_iter().fold(f32::NEG_INFINITY, f32::max);
        let predictions = agent.policy.evaluate_batch(&batch.observations).read().clone();
        let target_next_max = max(agent.target.evaluate(&live.next_observation));
        let policy_next_max = max(agent.policy.evaluate(&live.next_observation));
        assert!((target_next_max - policy_next_max).abs() > 1e-3);

        let targets = agent.bootstrap_targets(&batch);
        let targets = targets.read();

        // untaken actions keep the policy's own estimate
        assert!((targets[0] - predictions[0]).abs() < 1e-6);
        assert!((targets[1] - (0.1 + 0.99 * target_next_max)).abs() < 1e-5);
        assert!((targets[1] - (0.1 + 0.99 * policy_next_max)).abs() > 1e-4);
        assert!((targets[2] - (-1.0)).abs() < 1e-6);
        assert!((targets[3] - predictions[3]).abs() < 1e-6);
    }

    #[test]
    fn test_greedy_decide_does_not_touch_parameters() {
        let mut agent = DqnAgent::new(small_config(9)).unwrap();
        let before = agent.policy().parameters();
        let observation = Observation([0.5, 0.0, 0.3, 0.1]);

        let first = agent.decide(&observation);
        for _ in 0..20 {
            assert_eq!(agent.decide(&observation), first);
        }
        assert_eq!(agent.policy().parameters(), before);
        assert_eq!(agent.name(), "dqn");
    }
}
