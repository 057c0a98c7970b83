//! Per-timestep actions as they are recorded in paths and segments.

use serde::{Deserialize, Serialize};

/// A single action taken by the agent.
///
/// Discrete actions carry the raw index chosen from the action space; continuous actions
/// carry the flattened action vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Discrete(usize),
    Continuous(Vec<f32>),
}

impl Action {
    pub fn is_discrete(&self) -> bool {
        matches!(self, Action::Discrete(_))
    }
}

/// Expands a discrete action index into a one-hot row of width `cardinality`.
///
/// Returns `None` when `index` is outside `0..cardinality`.
pub fn one_hot(index: usize, cardinality: usize) -> Option<Vec<f32>> {
    if index >= cardinality {
        return None;
    }
    let mut encoded = vec![0.0f32; cardinality];
    encoded[index] = 1.0;
    Some(encoded)
}
