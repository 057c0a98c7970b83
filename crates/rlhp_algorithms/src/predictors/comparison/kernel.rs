//! Scoring network and pairwise preference head.
//!
//! A scorer maps one (observation, action) row to one scalar and has no notion of time.
//! Segments are scored by flattening `(batch, time)` into rows, scoring every row and
//! folding the result back to `(batch, time)`. Summing over time gives one logit per
//! segment; the two segments of a comparison form a two-way classification whose target
//! is the human (or synthetic) preference.

use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, LeakyRelu, LeakyReluConfig, Linear, LinearConfig};
use burn::tensor::activation::log_softmax;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

use rlhp_types::prelude::{Action, ActionSpace, ObservationSpace, Path, Preference, Segment, SpaceError};

#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    layers: Vec<Linear<B>>,
    activation: LeakyRelu,
    dropout: Dropout,
}

impl<B: Backend> Mlp<B> {
    pub fn new(
        input_dim: usize,
        hidden_sizes: &[usize],
        output_dim: usize,
        dropout: f64,
        device: &B::Device,
    ) -> Self {
        let mut dims = Vec::with_capacity(hidden_sizes.len() + 2);
        dims.push(input_dim);
        dims.extend_from_slice(hidden_sizes);
        dims.push(output_dim);

        let mut layers = Vec::with_capacity(dims.len() - 1);
        for window in dims.windows(2) {
            let layer = LinearConfig::new(window[0], window[1]).init(device);
            layers.push(layer);
        }

        Self {
            layers,
            activation: LeakyReluConfig::new().init(),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    /// Width of the rows the first layer accepts.
    pub fn input_dim(&self) -> usize {
        self.layers
            .first()
            .map_or(0, |layer| layer.weight.val().dims()[0])
    }

    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for (idx, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            if idx < self.layers.len() - 1 {
                x = self.activation.forward(x);
                x = self.dropout.forward(x);
            }
        }
        x
    }
}

/// Maps a flat batch of (observation, action) rows to one value per row.
///
/// `obs` is `[rows, obs_dim]`, `act` is `[rows, act_dim]` (already one-hot for discrete
/// spaces); the result is `[rows, 1]`.
pub trait SegmentScorer<B: Backend>: Module<B> {
    fn forward(&self, obs: Tensor<B, 2>, act: Tensor<B, 2>) -> Tensor<B, 2>;

    /// `obs_dim + act_dim` the scorer was built for.
    fn input_width(&self) -> usize;
}

/// Flattened observation concatenated with the encoded action, through an MLP with
/// leaky-ReLU and dropout between layers.
#[derive(Module, Debug)]
pub struct FullyConnectedScorer<B: Backend> {
    mlp: Mlp<B>,
}

impl<B: Backend> FullyConnectedScorer<B> {
    pub fn new(
        obs_dim: usize,
        act_dim: usize,
        hidden_sizes: &[usize],
        dropout: f64,
        device: &B::Device,
    ) -> Self {
        Self {
            mlp: Mlp::new(obs_dim + act_dim, hidden_sizes, 1, dropout, device),
        }
    }
}

impl<B: Backend> SegmentScorer<B> for FullyConnectedScorer<B> {
    fn forward(&self, obs: Tensor<B, 2>, act: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mlp.forward(Tensor::cat(vec![obs, act], 1))
    }

    fn input_width(&self) -> usize {
        self.mlp.input_dim()
    }
}

/// Host-side batch of equal-length sequences, validated and encoded for a scorer.
///
/// Observations are stored row-major as `[batch, time, obs_dim]` and actions as
/// `[batch, time, act_dim]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentBatch {
    batch_size: usize,
    segment_length: usize,
    obs_dim: usize,
    act_dim: usize,
    obs: Vec<f32>,
    act: Vec<f32>,
}

impl SegmentBatch {
    pub fn from_segments(
        segments: &[&Segment],
        observation_space: &ObservationSpace,
        action_space: &ActionSpace,
    ) -> Result<Self, SpaceError> {
        Self::collect(
            segments.iter().map(|s| (s.obs(), s.actions())),
            observation_space,
            action_space,
        )
    }

    pub fn from_paths(
        paths: &[Path],
        observation_space: &ObservationSpace,
        action_space: &ActionSpace,
    ) -> Result<Self, SpaceError> {
        Self::collect(
            paths.iter().map(|p| (p.obs(), p.actions())),
            observation_space,
            action_space,
        )
    }

    fn collect<'a, I>(
        sequences: I,
        observation_space: &ObservationSpace,
        action_space: &ActionSpace,
    ) -> Result<Self, SpaceError>
    where
        I: Iterator<Item = (&'a [Vec<f32>], &'a [Action])>,
    {
        let obs_dim = observation_space.flat_dim();
        let act_dim = action_space.encoded_dim();
        let mut batch = Self {
            batch_size: 0,
            segment_length: 0,
            obs_dim,
            act_dim,
            obs: Vec::new(),
            act: Vec::new(),
        };

        for (idx, (obs, actions)) in sequences.enumerate() {
            if obs.len() != actions.len() {
                return Err(SpaceError::Ragged(format!(
                    "sequence {} has {} observations and {} actions",
                    idx,
                    obs.len(),
                    actions.len()
                )));
            }
            if idx == 0 {
                batch.segment_length = obs.len();
            } else if obs.len() != batch.segment_length {
                return Err(SpaceError::Ragged(format!(
                    "sequence {} has {} steps, expected {}",
                    idx,
                    obs.len(),
                    batch.segment_length
                )));
            }
            for (step, (observation, action)) in obs.iter().zip(actions).enumerate() {
                observation_space.check(step, observation)?;
                batch.obs.extend_from_slice(observation);
                action_space.encode_into(step, action, &mut batch.act)?;
            }
            batch.batch_size += 1;
        }

        Ok(batch)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn segment_length(&self) -> usize {
        self.segment_length
    }

    pub fn is_empty(&self) -> bool {
        self.batch_size == 0 || self.segment_length == 0
    }

    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    pub fn act_dim(&self) -> usize {
        self.act_dim
    }

    /// Encoded action rows, `[batch * time, act_dim]` row-major.
    pub fn encoded_actions(&self) -> &[f32] {
        &self.act
    }

    fn rows(&self) -> usize {
        self.batch_size * self.segment_length
    }
}

/// Scores every timestep of every sequence in `batch`; returns `[batch, time]`.
pub fn predict_per_timestep<B: Backend, S: SegmentScorer<B>>(
    scorer: &S,
    batch: &SegmentBatch,
    device: &B::Device,
) -> Tensor<B, 2> {
    let rows = batch.rows();
    let obs = Tensor::<B, 2>::from_data(
        TensorData::new(batch.obs.clone(), [rows, batch.obs_dim]).convert::<B::FloatElem>(),
        device,
    );
    let act = Tensor::<B, 2>::from_data(
        TensorData::new(batch.act.clone(), [rows, batch.act_dim]).convert::<B::FloatElem>(),
        device,
    );

    scorer
        .forward(obs, act)
        .reshape([batch.batch_size, batch.segment_length])
}

/// Sums per-timestep values of both streams into `[batch, 2]` preference logits.
pub fn segment_logits<B: Backend>(left_values: Tensor<B, 2>, right_values: Tensor<B, 2>) -> Tensor<B, 2> {
    Tensor::cat(vec![left_values.sum_dim(1), right_values.sum_dim(1)], 1)
}

/// Mean categorical cross-entropy between `[batch, 2]` logits and class labels.
pub fn preference_loss<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let log_probs = log_softmax(logits, 1);
    log_probs.gather(1, labels.unsqueeze_dim::<2>(1)).mean().neg()
}

pub fn label_tensor<B: Backend>(labels: &[Preference], device: &B::Device) -> Tensor<B, 1, Int> {
    let indices: Vec<i64> = labels.iter().map(|label| label.class_index()).collect();
    Tensor::<B, 1, Int>::from_data(
        TensorData::from(indices.as_slice()).convert::<B::IntElem>(),
        device,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::ElementConversion;

    type TestBackend = NdArray;

    fn segment(obs: &[f32], actions: Vec<Action>) -> Segment {
        let rewards = vec![0.0; obs.len()];
        Segment::new(obs.iter().map(|&o| vec![o, -o]).collect(), actions, rewards).unwrap()
    }

    fn loss_value(logits: Tensor<TestBackend, 2>, labels: &[Preference]) -> f32 {
        let device = Default::default();
        preference_loss(logits, label_tensor::<TestBackend>(labels, &device))
            .into_scalar()
            .elem::<f32>()
    }

    #[test]
    fn test_per_timestep_shape() {
        let device = Default::default();
        let obs_space = ObservationSpace::new(vec![2]);
        let act_space = ActionSpace::Discrete(3);
        let scorer = FullyConnectedScorer::<TestBackend>::new(2, 3, &[8, 8], 0.0, &device);

        let segs: Vec<Segment> = (0..3)
            .map(|i| {
                segment(
                    &[i as f32, 1.0, 2.0, 3.0],
                    (0..4).map(|a| Action::Discrete(a % 3)).collect(),
                )
            })
            .collect();
        let refs: Vec<&Segment> = segs.iter().collect();
        let batch = SegmentBatch::from_segments(&refs, &obs_space, &act_space).unwrap();

        let values = predict_per_timestep(&scorer, &batch, &device);
        assert_eq!(values.dims(), [3, 4]);

        let logits = segment_logits(values.clone(), values);
        assert_eq!(logits.dims(), [3, 2]);
    }

    #[test]
    fn test_scorer_reports_input_width() {
        let device = Default::default();
        let scorer = FullyConnectedScorer::<TestBackend>::new(5, 2, &[8, 8], 0.5, &device);
        assert_eq!(scorer.input_width(), 7);
        assert_eq!(scorer.mlp.input_dim(), 7);
    }

    #[test]
    fn test_discrete_actions_are_one_hot_encoded() {
        let obs_space = ObservationSpace::new(vec![2]);
        let act_space = ActionSpace::Discrete(4);
        let actions = vec![Action::Discrete(3), Action::Discrete(0), Action::Discrete(2)];
        let seg = segment(&[0.0, 1.0, 2.0], actions.clone());

        let batch = SegmentBatch::from_segments(&[&seg], &obs_space, &act_space).unwrap();
        assert_eq!(batch.act_dim(), 4);

        for (row, action) in batch.encoded_actions().chunks(4).zip(actions) {
            let hot = row.iter().position(|&v| v == 1.0).unwrap();
            assert_eq!(Action::Discrete(hot), action);
            assert_eq!(row.iter().sum::<f32>(), 1.0);
        }
    }

    #[test]
    fn test_batch_rejects_mismatched_shapes() {
        let obs_space = ObservationSpace::new(vec![2]);
        let a = segment(&[0.0, 1.0], vec![Action::Discrete(0), Action::Discrete(1)]);
        let b = segment(&[0.0], vec![Action::Discrete(0)]);

        let ragged = SegmentBatch::from_segments(&[&a, &b], &obs_space, &ActionSpace::Discrete(2));
        assert!(matches!(ragged, Err(SpaceError::Ragged(_))));

        let wrong_obs =
            SegmentBatch::from_segments(&[&a], &ObservationSpace::new(vec![3]), &ActionSpace::Discrete(2));
        assert!(matches!(wrong_obs, Err(SpaceError::ObservationWidth { .. })));

        let wrong_kind =
            SegmentBatch::from_segments(&[&a], &obs_space, &ActionSpace::Continuous(vec![1]));
        assert!(matches!(wrong_kind, Err(SpaceError::ActionKind { .. })));
    }

    #[test]
    fn test_continuous_streams_are_symmetric() {
        let device = Default::default();
        let obs_space = ObservationSpace::new(vec![2]);
        let act_space = ActionSpace::Continuous(vec![1]);
        let scorer = FullyConnectedScorer::<TestBackend>::new(2, 1, &[4], 0.0, &device);

        let left = segment(&[0.5, 1.5], vec![Action::Continuous(vec![0.1]), Action::Continuous(vec![0.2])]);
        let right = segment(&[-1.0, 2.0], vec![Action::Continuous(vec![-0.3]), Action::Continuous(vec![0.4])]);
        let left_batch = SegmentBatch::from_segments(&[&left], &obs_space, &act_space).unwrap();
        let right_batch = SegmentBatch::from_segments(&[&right], &obs_space, &act_space).unwrap();

        let forward = segment_logits(
            predict_per_timestep(&scorer, &left_batch, &device),
            predict_per_timestep(&scorer, &right_batch, &device),
        );
        let backward = segment_logits(
            predict_per_timestep(&scorer, &right_batch, &device),
            predict_per_timestep(&scorer, &left_batch, &device),
        );
        let forward = forward.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        let backward = backward.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert!((forward[0] - backward[1]).abs() < 1e-6);
        assert!((forward[1] - backward[0]).abs() < 1e-6);
    }

    #[test]
    fn test_loss_symmetric_under_swap_and_flip() {
        let device = Default::default();
        let left = Tensor::<TestBackend, 2>::from_floats([[0.5, 1.0, -0.25], [2.0, -1.0, 0.0]], &device);
        let right = Tensor::<TestBackend, 2>::from_floats([[-0.5, 0.0, 0.75], [1.0, 1.0, 1.0]], &device);
        let labels = [Preference::Left, Preference::Right];
        let flipped: Vec<Preference> = labels.iter().map(|l| l.flipped()).collect();

        let forward = loss_value(segment_logits(left.clone(), right.clone()), &labels);
        let swapped = loss_value(segment_logits(right, left), &flipped);
        assert!((forward - swapped).abs() < 1e-6);
    }

    #[test]
    fn test_loss_of_indifferent_logits_is_ln_two() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[1.0, 1.0], [-3.0, -3.0]], &device);
        let loss = loss_value(logits, &[Preference::Left, Preference::Right]);
        assert!((loss - std::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_loss_rewards_agreeing_logits() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[4.0, -4.0]], &device);
        let agree = loss_value(logits.clone(), &[Preference::Left]);
        let disagree = loss_value(logits, &[Preference::Right]);
        assert!(agree < 0.01);
        assert!(disagree > 7.9);
    }
}
