use rlhp_types::prelude::Path;

use crate::templates::base_predictor::{PredictorError, RewardPredictorTrait};

/// Passes the environment's own reward through untouched.
///
/// Used as the baseline when an agent trains on the true reward.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraditionalRewardPredictor;

impl TraditionalRewardPredictor {
    pub fn new() -> Self {
        Self
    }
}

impl RewardPredictorTrait for TraditionalRewardPredictor {
    fn predict_reward(&self, path: &Path) -> Result<Vec<f32>, PredictorError> {
        Ok(path.original_rewards().to_vec())
    }

    fn path_callback(&mut self, _path: &Path) -> Result<(), PredictorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlhp_types::prelude::Action;

    #[test]
    fn test_returns_original_rewards() {
        let rewards = vec![0.5, -1.25, f32::MIN_POSITIVE, 3.0e7];
        let path = Path::new(
            vec![vec![0.0]; 4],
            vec![Action::Discrete(0); 4],
            rewards.clone(),
        )
        .unwrap();

        let mut predictor = TraditionalRewardPredictor::new();
        predictor.path_callback(&path).unwrap();
        let predicted = predictor.predict_reward(&path).unwrap();

        assert_eq!(predicted.len(), rewards.len());
        for (a, b) in predicted.iter().zip(&rewards) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_empty_path() {
        let predictor = TraditionalRewardPredictor;
        assert!(predictor.predict_reward(&Path::default()).unwrap().is_empty());
    }
}
