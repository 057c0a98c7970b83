//! Observation and action spaces.
//!
//! Spaces are resolved once when a predictor is built. Every observation and action that
//! later reaches a model is checked against them; a mismatch is a configuration error and
//! is never silently coerced.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::action::{one_hot, Action};

#[derive(Clone, Debug, PartialEq, Error)]
pub enum SpaceError {
    #[error("Observation width mismatch at step {step}: expected {expected}, found {found}")]
    ObservationWidth {
        step: usize,
        expected: usize,
        found: usize,
    },
    #[error("Action kind mismatch at step {step}: space is {expected}")]
    ActionKind { step: usize, expected: &'static str },
    #[error("Discrete action {index} at step {step} is outside 0..{cardinality}")]
    ActionIndex {
        step: usize,
        index: usize,
        cardinality: usize,
    },
    #[error("Continuous action width mismatch at step {step}: expected {expected}, found {found}")]
    ActionWidth {
        step: usize,
        expected: usize,
        found: usize,
    },
    #[error("Ragged sequence: {0}")]
    Ragged(String),
}

/// Shape of a single observation, optionally extended with a trailing stacked-frame axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpace {
    shape: Vec<usize>,
}

impl ObservationSpace {
    pub fn new(shape: Vec<usize>) -> Self {
        Self { shape }
    }

    /// Appends a trailing frame axis when `stacked_frames > 0`.
    pub fn with_stacked_frames(mut self, stacked_frames: usize) -> Self {
        if stacked_frames > 0 {
            self.shape.push(stacked_frames);
        }
        self
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of scalars in one flattened observation.
    pub fn flat_dim(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn check(&self, step: usize, observation: &[f32]) -> Result<(), SpaceError> {
        let expected = self.flat_dim();
        if observation.len() != expected {
            return Err(SpaceError::ObservationWidth {
                step,
                expected,
                found: observation.len(),
            });
        }
        Ok(())
    }
}

/// Action space of the environment, resolved once into a tagged variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSpace {
    /// `n` mutually exclusive actions; fed to models as one-hot rows of width `n`.
    Discrete(usize),
    /// Fixed-shape real vector; fed to models unchanged.
    Continuous(Vec<usize>),
}

impl ActionSpace {
    pub fn is_discrete(&self) -> bool {
        matches!(self, ActionSpace::Discrete(_))
    }

    /// Width of one action row as seen by a scorer.
    pub fn encoded_dim(&self) -> usize {
        match self {
            ActionSpace::Discrete(cardinality) => *cardinality,
            ActionSpace::Continuous(shape) => shape.iter().product(),
        }
    }

    /// Appends the model-facing encoding of `action` to `out`.
    pub fn encode_into(
        &self,
        step: usize,
        action: &Action,
        out: &mut Vec<f32>,
    ) -> Result<(), SpaceError> {
        match (self, action) {
            (ActionSpace::Discrete(cardinality), Action::Discrete(index)) => {
                let encoded = one_hot(*index, *cardinality).ok_or(SpaceError::ActionIndex {
                    step,
                    index: *index,
                    cardinality: *cardinality,
                })?;
                out.extend_from_slice(&encoded);
                Ok(())
            }
            (ActionSpace::Continuous(_), Action::Continuous(values)) => {
                let expected = self.encoded_dim();
                if values.len() != expected {
                    return Err(SpaceError::ActionWidth {
                        step,
                        expected,
                        found: values.len(),
                    });
                }
                out.extend_from_slice(values);
                Ok(())
            }
            (space, _) => Err(SpaceError::ActionKind {
                step,
                expected: if space.is_discrete() {
                    "discrete"
                } else {
                    "continuous"
                },
            }),
        }
    }
}

/// What a predictor needs to know about the environment it scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub observation_space: ObservationSpace,
    pub action_space: ActionSpace,
    /// Environment steps per second; segment length is `clip_length_seconds * fps`.
    pub fps: f64,
}

impl EnvironmentSpec {
    pub fn new(observation_space: ObservationSpace, action_space: ActionSpace, fps: f64) -> Self {
        Self {
            observation_space,
            action_space,
            fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stacked_frames_extend_shape() {
        let space = ObservationSpace::new(vec![4, 4]).with_stacked_frames(3);
        assert_eq!(space.shape(), &[4, 4, 3]);
        assert_eq!(space.flat_dim(), 48);

        let unstacked = ObservationSpace::new(vec![4, 4]).with_stacked_frames(0);
        assert_eq!(unstacked.shape(), &[4, 4]);
    }

    #[test]
    fn test_discrete_encoding_is_one_hot() {
        let space = ActionSpace::Discrete(3);
        let mut out = Vec::new();
        space.encode_into(0, &Action::Discrete(2), &mut out).unwrap();
        assert_eq!(out, vec![0.0, 0.0, 1.0]);
        assert_eq!(space.encoded_dim(), 3);
    }

    #[test]
    fn test_continuous_encoding_passes_through() {
        let space = ActionSpace::Continuous(vec![2]);
        let mut out = Vec::new();
        space
            .encode_into(0, &Action::Continuous(vec![0.25, -0.5]), &mut out)
            .unwrap();
        assert_eq!(out, vec![0.25, -0.5]);
    }

    #[test]
    fn test_encoding_rejects_mismatches() {
        let mut out = Vec::new();
        let discrete = ActionSpace::Discrete(2);
        assert_eq!(
            discrete.encode_into(5, &Action::Discrete(2), &mut out),
            Err(SpaceError::ActionIndex {
                step: 5,
                index: 2,
                cardinality: 2
            })
        );
        assert!(matches!(
            discrete.encode_into(0, &Action::Continuous(vec![1.0]), &mut out),
            Err(SpaceError::ActionKind { .. })
        ));

        let continuous = ActionSpace::Continuous(vec![3]);
        assert!(matches!(
            continuous.encode_into(1, &Action::Continuous(vec![1.0]), &mut out),
            Err(SpaceError::ActionWidth {
                expected: 3,
                found: 1,
                ..
            })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_observation_check() {
        let space = ObservationSpace::new(vec![2, 2]);
        assert!(space.check(0, &[0.0; 4]).is_ok());
        assert_eq!(
            space.check(7, &[0.0; 3]),
            Err(SpaceError::ObservationWidth {
                step: 7,
                expected: 4,
                found: 3
            })
        );
    }
}
