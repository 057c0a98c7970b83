use std::collections::{BTreeMap, VecDeque};

use log::info;
use rlhp_types::prelude::Path;

use crate::logging::SUMMARY_TARGET;
use crate::templates::collaborators::{CollaboratorError, SummaryLogger};

pub const DEFAULT_TIMESTEPS_PER_SUMMARY: u64 = 1_000;
pub const DEFAULT_MAX_RECENT_PATHS: usize = 100;

/// Tracks the agent's recent episodes and writes scalar summaries.
///
/// `summary_step` advances once per `timesteps_per_summary` logged environment steps;
/// each scalar is written against the current step and the latest value per key is kept.
#[derive(Debug, Clone)]
pub struct AgentLogger {
    timesteps_per_summary: u64,
    max_recent_paths: usize,
    summary_step: u64,
    timesteps_elapsed: u64,
    timesteps_since_summary: u64,
    recent_paths: VecDeque<Path>,
    latest: BTreeMap<String, (u64, f64)>,
}

impl Default for AgentLogger {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTEPS_PER_SUMMARY, DEFAULT_MAX_RECENT_PATHS)
    }
}

impl AgentLogger {
    pub fn new(timesteps_per_summary: u64, max_recent_paths: usize) -> Self {
        Self {
            timesteps_per_summary: timesteps_per_summary.max(1),
            max_recent_paths,
            summary_step: 0,
            timesteps_elapsed: 0,
            timesteps_since_summary: 0,
            recent_paths: VecDeque::with_capacity(max_recent_paths),
            latest: BTreeMap::new(),
        }
    }

    /// Records a finished episode. Writes the agent summaries each time another
    /// `timesteps_per_summary` steps have been logged.
    pub fn log_episode(&mut self, path: &Path) {
        let length = path.len() as u64;
        self.timesteps_elapsed = self.timesteps_elapsed.saturating_add(length);
        self.timesteps_since_summary = self.timesteps_since_summary.saturating_add(length);

        if self.max_recent_paths > 0 {
            if self.recent_paths.len() == self.max_recent_paths {
                self.recent_paths.pop_front();
            }
            self.recent_paths.push_back(path.clone());
        }

        if self.timesteps_since_summary >= self.timesteps_per_summary {
            self.summary_step += 1;
            self.write_episode_summaries();
            self.timesteps_since_summary -= self.timesteps_per_summary;
        }
    }

    fn write_episode_summaries(&mut self) {
        let count = self.recent_paths.len();
        if count == 0 {
            return;
        }
        let mean_reward = self
            .recent_paths
            .iter()
            .map(|p| f64::from(p.total_original_reward()))
            .sum::<f64>()
            / count as f64;
        let mean_length =
            self.recent_paths.iter().map(|p| p.len() as f64).sum::<f64>() / count as f64;

        self.record("agent/true_reward_per_episode", mean_reward);
        self.record("agent/episode_length", mean_length);
        self.record("agent/total_timesteps", self.timesteps_elapsed as f64);
    }

    fn record(&mut self, key: &str, value: f64) {
        info!(target: SUMMARY_TARGET, "step={} {}={}", self.summary_step, key, value);
        self.latest.insert(key.to_string(), (self.summary_step, value));
    }

    /// Latest `(summary_step, value)` written for `key`.
    pub fn latest(&self, key: &str) -> Option<(u64, f64)> {
        self.latest.get(key).copied()
    }

    pub fn timesteps_elapsed(&self) -> u64 {
        self.timesteps_elapsed
    }

    pub fn recent_path_count(&self) -> usize {
        self.recent_paths.len()
    }
}

impl SummaryLogger for AgentLogger {
    fn log_simple(&mut self, key: &str, value: f64) -> Result<(), CollaboratorError> {
        if key.is_empty() {
            return Err(CollaboratorError::Logger("summary key is empty".to_string()));
        }
        self.record(key, value);
        Ok(())
    }

    fn recent_paths_with_padding(&self) -> Vec<Path> {
        let Some(max_len) = self.recent_paths.iter().map(Path::len).max() else {
            return Vec::new();
        };
        self.recent_paths
            .iter()
            .map(|p| p.padded_with_end_state(max_len))
            .collect()
    }

    fn summary_step(&self) -> u64 {
        self.summary_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlhp_types::prelude::Action;

    fn path_of(len: usize, reward: f32) -> Path {
        Path::new(
            (0..len).map(|i| vec![i as f32]).collect(),
            vec![Action::Discrete(1); len],
            vec![reward; len],
        )
        .unwrap()
    }

    #[test]
    fn test_summary_step_advances_per_timesteps() {
        let mut logger = AgentLogger::new(1_000, 100);
        logger.log_episode(&path_of(600, 0.0));
        assert_eq!(logger.summary_step(), 0);
        logger.log_episode(&path_of(600, 0.0));
        assert_eq!(logger.summary_step(), 1);
        // 200 carried over
        logger.log_episode(&path_of(800, 0.0));
        assert_eq!(logger.summary_step(), 2);
        assert_eq!(logger.timesteps_elapsed(), 2_000);
    }

    #[test]
    fn test_episode_summaries_written() {
        let mut logger = AgentLogger::new(10, 100);
        logger.log_episode(&path_of(4, 1.0));
        logger.log_episode(&path_of(6, 2.0));

        let (step, mean_reward) = logger.latest("agent/true_reward_per_episode").unwrap();
        assert_eq!(step, 1);
        assert!((mean_reward - 8.0).abs() < 1e-9);
        assert_eq!(logger.latest("agent/episode_length").unwrap().1, 5.0);
    }

    #[test]
    fn test_recent_paths_bounded_and_padded() {
        let mut logger = AgentLogger::new(1_000_000, 3);
        for len in [2, 5, 3, 4] {
            logger.log_episode(&path_of(len, 1.0));
        }
        assert_eq!(logger.recent_path_count(), 3);

        let padded = logger.recent_paths_with_padding();
        assert_eq!(padded.len(), 3);
        assert!(padded.iter().all(|p| p.len() == 5));
        // the 3-step path is extended with its last observation
        assert_eq!(padded[1].obs()[4], vec![2.0]);
        assert_eq!(padded[1].total_original_reward(), 5.0);
    }

    #[test]
    fn test_log_simple_keeps_latest() {
        let mut logger = AgentLogger::default();
        logger.log_simple("predictor/loss", 0.7).unwrap();
        logger.log_simple("predictor/loss", 0.3).unwrap();
        assert_eq!(logger.latest("predictor/loss"), Some((0, 0.3)));
        assert!(logger.log_simple("", 1.0).is_err());
        assert!(logger.recent_paths_with_padding().is_empty());
    }
}
