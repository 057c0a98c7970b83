//! Reward predictors for reinforcement learning from human preferences.
//!
//! `predictors::comparison::ComparisonRewardPredictor` learns a per-timestep reward from
//! labeled pairs of trajectory segments and is fed online by the agent's completed paths.
//! `predictors::traditional::TraditionalRewardPredictor` passes the environment reward
//! through and serves as the baseline.

pub mod configuration;
pub mod logging;
pub mod predictors;
pub mod sampling;
pub mod schedules;
pub mod templates;

pub mod prelude {
    pub use crate::configuration::{
        AgentLoggerParams, ComparisonPredictorParams, LabelScheduleParams, PredictorConfig,
        PredictorConfigLoader,
    };
    pub use crate::logging::{init_logging, init_logging_from_file, AgentLogger};
    pub use crate::predictors::comparison::{
        CheckpointMetadata, CheckpointNaming, ComparisonRewardPredictor, ConvolutionalScorer,
        FullyConnectedScorer, PairwiseRewardModel, SegmentScorer, ZeroPaddedCheckpoints,
    };
    pub use crate::predictors::corrcoef;
    pub use crate::predictors::traditional::TraditionalRewardPredictor;
    pub use crate::sampling::{RandomSegmentSampler, SegmentSampler};
    pub use crate::schedules::{ConstantLabelSchedule, LabelAnnealer};
    pub use crate::templates::base_predictor::{PredictorError, RewardPredictorTrait};
    pub use crate::templates::collaborators::{
        CollaboratorError, ComparisonCollector, LabelSchedule, SummaryLogger,
    };
}
