use rand::{Rng, RngCore};
use rlhp_types::prelude::{Path, Segment};

/// Cuts a fixed-length segment out of a completed path.
pub trait SegmentSampler {
    /// Returns `None` when the path is shorter than `segment_length`.
    fn sample(&self, path: &Path, segment_length: usize, rng: &mut dyn RngCore) -> Option<Segment>;
}

/// Uniformly random start position, every valid offset equally likely.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSegmentSampler;

impl SegmentSampler for RandomSegmentSampler {
    fn sample(&self, path: &Path, segment_length: usize, rng: &mut dyn RngCore) -> Option<Segment> {
        if segment_length == 0 || path.len() < segment_length {
            return None;
        }
        let start = rng.random_range(0..=path.len() - segment_length);
        path.segment(start, segment_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rlhp_types::prelude::Action;

    fn counting_path(len: usize) -> Path {
        Path::new(
            (0..len).map(|i| vec![i as f32]).collect(),
            vec![Action::Discrete(0); len],
            (0..len).map(|i| i as f32).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_short_path_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(RandomSegmentSampler.sample(&counting_path(10), 11, &mut rng).is_none());
        assert!(RandomSegmentSampler.sample(&counting_path(10), 0, &mut rng).is_none());
    }

    #[test]
    fn test_exact_length_takes_whole_path() {
        let mut rng = StdRng::seed_from_u64(0);
        let segment = RandomSegmentSampler.sample(&counting_path(7), 7, &mut rng).unwrap();
        assert_eq!(segment.original_rewards(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_segments_are_contiguous_and_in_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let path = counting_path(50);
        for _ in 0..200 {
            let segment = RandomSegmentSampler.sample(&path, 15, &mut rng).unwrap();
            assert_eq!(segment.len(), 15);
            let first = segment.original_rewards()[0];
            assert!(first + 14.0 <= 49.0);
            for (offset, reward) in segment.original_rewards().iter().enumerate() {
                assert_eq!(*reward, first + offset as f32);
            }
        }
    }
}
