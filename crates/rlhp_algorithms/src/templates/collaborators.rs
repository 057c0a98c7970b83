//! Contracts for the collaborators a comparison reward predictor drives but does not own
//! the policy of: the comparison collector, the label schedule and the summary logger.
//!
//! All calls happen on the predictor's thread. `label_unlabeled_comparisons` is the only
//! point where the predictor waits on an outside labeler, and it is expected to block
//! until pending labels are resolved.

use rlhp_types::prelude::{Comparison, Path, Segment, SegmentId};
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum CollaboratorError {
    #[error("Comparison collector failed: {0}")]
    Collector(String),
    #[error("Label acquisition failed: {0}")]
    Labeling(String),
    #[error("Summary logger failed: {0}")]
    Logger(String),
}

/// Store of segments and of the comparisons built from them.
///
/// Storage, deduplication, retention and labeling are the collector's concern. The
/// predictor only adds segments, asks for new comparisons, triggers label resolution and
/// reads back the decisive labeled pool.
pub trait ComparisonCollector {
    fn add_segment(&mut self, segment: Segment) -> Result<(), CollaboratorError>;

    /// Creates one unlabeled comparison by pairing segments already in the store.
    fn invent_comparison(&mut self) -> Result<(), CollaboratorError>;

    /// Resolves pending labels, mutating comparisons in place. Blocks until done.
    fn label_unlabeled_comparisons(&mut self) -> Result<(), CollaboratorError>;

    fn get_segment(&self, id: SegmentId) -> Option<&Segment>;

    /// Labeled comparisons with an unambiguous preference, in insertion order.
    fn labeled_decisive_comparisons(&self) -> Vec<Comparison>;

    /// Total number of comparisons, labeled or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of segments currently held.
    fn segment_count(&self) -> usize;
}

/// How many labeled comparisons the pipeline wants at this point of training.
pub trait LabelSchedule {
    fn n_desired_labels(&self) -> usize;

    /// Informs the schedule of the total number of environment steps seen so far.
    fn observe_timesteps(&mut self, _total_timesteps: u64) {}
}

impl<T: LabelSchedule + ?Sized> LabelSchedule for Box<T> {
    fn n_desired_labels(&self) -> usize {
        (**self).n_desired_labels()
    }

    fn observe_timesteps(&mut self, total_timesteps: u64) {
        (**self).observe_timesteps(total_timesteps)
    }
}

/// Sink for scalar training summaries and source of recent episodes for validation.
pub trait SummaryLogger {
    fn log_simple(&mut self, key: &str, value: f64) -> Result<(), CollaboratorError>;

    /// Recent episodes, all padded to the length of the longest one.
    fn recent_paths_with_padding(&self) -> Vec<Path>;

    /// Monotonically increasing summary counter.
    fn summary_step(&self) -> u64;
}
