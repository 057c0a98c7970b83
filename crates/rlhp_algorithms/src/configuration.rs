//! JSON configuration for the reward predictor and its default collaborators.
//!
//! `PredictorConfigLoader::load_or_create` reads the file when it exists and otherwise
//! writes `DEFAULT_PREDICTOR_CONFIG_CONTENT` to it before loading. Missing keys fall back
//! to their defaults.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::agent_logger::{
    AgentLogger, DEFAULT_MAX_RECENT_PATHS, DEFAULT_TIMESTEPS_PER_SUMMARY,
};
use crate::schedules::{ConstantLabelSchedule, LabelAnnealer};
use crate::templates::base_predictor::PredictorError;
use crate::templates::collaborators::LabelSchedule;

pub const DEFAULT_PREDICTOR_CONFIG_PATH: &str = "predictor_config.json";

pub(crate) const DEFAULT_PREDICTOR_CONFIG_CONTENT: &str = r#"{
    "comparison_predictor": {
        "clip_length_seconds": 1.5,
        "stacked_frames": 0,
        "hidden_sizes": [64, 64],
        "dropout": 0.5,
        "learning_rate": 1e-3,
        "minibatch_size": 128,
        "max_segments": 1000,
        "train_every_timesteps": 2000,
        "checkpoint_every_timesteps": 20000,
        "validation_every_summary_steps": 10,
        "checkpoint_root": "checkpoints/reward_model",
        "seed": 1
    },
    "label_schedule": {
        "kind": "annealer",
        "pretrain_labels": 175,
        "final_labels": 700,
        "final_timesteps": 5000000
    },
    "agent_logger": {
        "timesteps_per_summary": 1000,
        "max_recent_paths": 100
    }
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonPredictorParams {
    pub clip_length_seconds: f64,
    pub stacked_frames: usize,
    pub hidden_sizes: Vec<usize>,
    pub dropout: f64,
    pub learning_rate: f64,
    pub minibatch_size: usize,
    pub max_segments: usize,
    pub train_every_timesteps: u64,
    pub checkpoint_every_timesteps: u64,
    pub validation_every_summary_steps: u64,
    pub checkpoint_root: PathBuf,
    pub seed: u64,
}

impl Default for ComparisonPredictorParams {
    fn default() -> Self {
        Self {
            clip_length_seconds: 1.5,
            stacked_frames: 0,
            hidden_sizes: vec![64, 64],
            dropout: 0.5,
            learning_rate: 1e-3,
            minibatch_size: 128,
            max_segments: 1000,
            train_every_timesteps: 2000,
            checkpoint_every_timesteps: 20000,
            validation_every_summary_steps: 10,
            checkpoint_root: PathBuf::from("checkpoints/reward_model"),
            seed: 1,
        }
    }
}

impl ComparisonPredictorParams {
    pub fn validate(&self) -> Result<(), PredictorError> {
        let invalid =
            |msg: String| -> Result<(), PredictorError> { Err(PredictorError::Configuration(msg)) };

        if !(self.clip_length_seconds.is_finite() && self.clip_length_seconds > 0.0) {
            return invalid(format!(
                "clip_length_seconds must be positive, got {}",
                self.clip_length_seconds
            ));
        }
        if self.hidden_sizes.contains(&0) {
            return invalid("hidden_sizes must not contain zero-width layers".to_string());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("dropout must be in [0, 1), got {}", self.dropout));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if self.minibatch_size == 0 {
            return invalid("minibatch_size must be at least 1".to_string());
        }
        if self.train_every_timesteps == 0 || self.checkpoint_every_timesteps == 0 {
            return invalid("training and checkpoint periods must be at least 1 step".to_string());
        }
        if self.validation_every_summary_steps == 0 {
            return invalid("validation_every_summary_steps must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LabelScheduleParams {
    Constant {
        pretrain_labels: usize,
        #[serde(default = "default_seconds_between_labels")]
        seconds_between_labels: f64,
    },
    Annealer {
        pretrain_labels: usize,
        final_labels: usize,
        final_timesteps: u64,
    },
}

fn default_seconds_between_labels() -> f64 {
    3.0
}

impl Default for LabelScheduleParams {
    fn default() -> Self {
        LabelScheduleParams::Annealer {
            pretrain_labels: 175,
            final_labels: 700,
            final_timesteps: 5_000_000,
        }
    }
}

impl LabelScheduleParams {
    pub fn build(&self) -> Box<dyn LabelSchedule> {
        match *self {
            LabelScheduleParams::Constant {
                pretrain_labels,
                seconds_between_labels,
            } => Box::new(ConstantLabelSchedule::new(
                pretrain_labels,
                seconds_between_labels,
            )),
            LabelScheduleParams::Annealer {
                pretrain_labels,
                final_labels,
                final_timesteps,
            } => Box::new(LabelAnnealer::new(
                pretrain_labels,
                final_labels,
                final_timesteps,
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentLoggerParams {
    pub timesteps_per_summary: u64,
    pub max_recent_paths: usize,
}

impl Default for AgentLoggerParams {
    fn default() -> Self {
        Self {
            timesteps_per_summary: DEFAULT_TIMESTEPS_PER_SUMMARY,
            max_recent_paths: DEFAULT_MAX_RECENT_PATHS,
        }
    }
}

impl AgentLoggerParams {
    pub fn build(&self) -> AgentLogger {
        AgentLogger::new(self.timesteps_per_summary, self.max_recent_paths)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub comparison_predictor: ComparisonPredictorParams,
    pub label_schedule: LabelScheduleParams,
    pub agent_logger: AgentLoggerParams,
}

#[derive(Debug, Clone)]
pub struct PredictorConfigLoader {
    config_path: PathBuf,
    config: PredictorConfig,
}

impl PredictorConfigLoader {
    /// Loads `config_path`, writing the default configuration there first if it is missing.
    pub fn load_or_create(config_path: impl AsRef<Path>) -> Result<Self, PredictorError> {
        let config_path = config_path.as_ref().to_path_buf();
        if config_path.exists() {
            info!(
                "[PredictorConfigLoader - load_or_create] Found config at: {}",
                config_path.display()
            );
        } else {
            if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config_path, DEFAULT_PREDICTOR_CONFIG_CONTENT)?;
            info!(
                "[PredictorConfigLoader - load_or_create] Created new config at: {}",
                config_path.display()
            );
        }
        Self::load_config(config_path)
    }

    pub fn load_config(config_path: impl AsRef<Path>) -> Result<Self, PredictorError> {
        let config_path = config_path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&config_path)?;
        let config: PredictorConfig = serde_json::from_str(&contents)?;
        config.comparison_predictor.validate()?;
        Ok(Self {
            config_path,
            config,
        })
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn get_comparison_predictor(&self) -> &ComparisonPredictorParams {
        &self.config.comparison_predictor
    }

    pub fn get_label_schedule(&self) -> &LabelScheduleParams {
        &self.config.label_schedule
    }

    pub fn get_agent_logger(&self) -> &AgentLoggerParams {
        &self.config.agent_logger
    }
}
