//! Episodes and the fixed-length clips cut from them.
//!
//! A `Path` is one complete episode as produced by the environment loop. A `Segment` is a
//! contiguous, immutable slice of a path; segments are what get compared and labeled.

use serde::{Deserialize, Serialize};

use crate::data::action::Action;
use crate::data::comparison::SegmentId;
use crate::data::space::{ActionSpace, ObservationSpace, SpaceError};

fn check_aligned(observations: usize, actions: usize, rewards: usize) -> Result<(), SpaceError> {
    if observations != actions || observations != rewards {
        return Err(SpaceError::Ragged(format!(
            "{} observations, {} actions, {} rewards",
            observations, actions, rewards
        )));
    }
    Ok(())
}

/// Unchecked wire form of `Path`; deserialization goes through `Path::new`.
#[derive(Deserialize)]
struct RawPath {
    obs: Vec<Vec<f32>>,
    actions: Vec<Action>,
    original_rewards: Vec<f32>,
}

/// One full episode: observations, actions and the environment's own rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPath")]
pub struct Path {
    obs: Vec<Vec<f32>>,
    actions: Vec<Action>,
    original_rewards: Vec<f32>,
}

impl Default for Path {
    fn default() -> Self {
        Self {
            obs: Vec::new(),
            actions: Vec::new(),
            original_rewards: Vec::new(),
        }
    }
}

impl Path {
    pub fn new(
        obs: Vec<Vec<f32>>,
        actions: Vec<Action>,
        original_rewards: Vec<f32>,
    ) -> Result<Self, SpaceError> {
        check_aligned(obs.len(), actions.len(), original_rewards.len())?;
        Ok(Self {
            obs,
            actions,
            original_rewards,
        })
    }

    pub fn push_step(&mut self, obs: Vec<f32>, action: Action, original_reward: f32) {
        self.obs.push(obs);
        self.actions.push(action);
        self.original_rewards.push(original_reward);
    }

    pub fn obs(&self) -> &[Vec<f32>] {
        &self.obs
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn original_rewards(&self) -> &[f32] {
        &self.original_rewards
    }

    pub fn len(&self) -> usize {
        self.obs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obs.is_empty()
    }

    pub fn total_original_reward(&self) -> f32 {
        self.original_rewards.iter().sum()
    }

    /// Copies `length` steps starting at `start` into a new segment.
    ///
    /// Returns `None` if the range does not fit inside the path or is empty.
    pub fn segment(&self, start: usize, length: usize) -> Option<Segment> {
        let end = start.checked_add(length)?;
        if length == 0 || end > self.len() {
            return None;
        }
        Some(Segment {
            id: SegmentId::new(),
            obs: self.obs.get(start..end)?.to_vec(),
            actions: self.actions.get(start..end)?.to_vec(),
            original_rewards: self.original_rewards.get(start..end)?.to_vec(),
        })
    }

    /// Extends the path to `length` steps by repeating its final step.
    ///
    /// Paths already at least `length` long, and empty paths, are returned unchanged.
    pub fn padded_with_end_state(&self, length: usize) -> Self {
        let mut padded = self.clone();
        let (Some(obs), Some(action), Some(reward)) = (
            self.obs.last(),
            self.actions.last(),
            self.original_rewards.last(),
        ) else {
            return padded;
        };
        while padded.len() < length {
            padded.push_step(obs.clone(), action.clone(), *reward);
        }
        padded
    }

    /// Checks every step against the given spaces.
    pub fn validate(
        &self,
        observation_space: &ObservationSpace,
        action_space: &ActionSpace,
    ) -> Result<(), SpaceError> {
        validate_steps(&self.obs, &self.actions, observation_space, action_space)
    }
}

impl TryFrom<RawPath> for Path {
    type Error = SpaceError;

    fn try_from(raw: RawPath) -> Result<Self, Self::Error> {
        Path::new(raw.obs, raw.actions, raw.original_rewards)
    }
}

#[derive(Deserialize)]
struct RawSegment {
    id: SegmentId,
    obs: Vec<Vec<f32>>,
    actions: Vec<Action>,
    original_rewards: Vec<f32>,
}

/// A contiguous clip of a path, owned by the comparison collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSegment")]
pub struct Segment {
    id: SegmentId,
    obs: Vec<Vec<f32>>,
    actions: Vec<Action>,
    original_rewards: Vec<f32>,
}

impl Segment {
    pub fn new(
        obs: Vec<Vec<f32>>,
        actions: Vec<Action>,
        original_rewards: Vec<f32>,
    ) -> Result<Self, SpaceError> {
        check_aligned(obs.len(), actions.len(), original_rewards.len())?;
        Ok(Self {
            id: SegmentId::new(),
            obs,
            actions,
            original_rewards,
        })
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn obs(&self) -> &[Vec<f32>] {
        &self.obs
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn original_rewards(&self) -> &[f32] {
        &self.original_rewards
    }

    pub fn len(&self) -> usize {
        self.obs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obs.is_empty()
    }

    pub fn total_original_reward(&self) -> f32 {
        self.original_rewards.iter().sum()
    }

    pub fn validate(
        &self,
        observation_space: &ObservationSpace,
        action_space: &ActionSpace,
    ) -> Result<(), SpaceError> {
        validate_steps(&self.obs, &self.actions, observation_space, action_space)
    }
}

impl TryFrom<RawSegment> for Segment {
    type Error = SpaceError;

    fn try_from(raw: RawSegment) -> Result<Self, Self::Error> {
        check_aligned(raw.obs.len(), raw.actions.len(), raw.original_rewards.len())?;
        Ok(Segment {
            id: raw.id,
            obs: raw.obs,
            actions: raw.actions,
            original_rewards: raw.original_rewards,
        })
    }
}

fn validate_steps(
    obs: &[Vec<f32>],
    actions: &[Action],
    observation_space: &ObservationSpace,
    action_space: &ActionSpace,
) -> Result<(), SpaceError> {
    let mut scratch = Vec::with_capacity(action_space.encoded_dim());
    for (step, (observation, action)) in obs.iter().zip(actions).enumerate() {
        observation_space.check(step, observation)?;
        scratch.clear();
        action_space.encode_into(step, action, &mut scratch)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_of(rewards: &[f32]) -> Path {
        let mut path = Path::default();
        for (i, &r) in rewards.iter().enumerate() {
            path.push_step(vec![i as f32, 0.0], Action::Discrete(i % 2), r);
        }
        path
    }

    #[test]
    fn test_path_rejects_ragged_input() {
        let result = Path::new(vec![vec![0.0]], vec![], vec![1.0]);
        assert!(matches!(result, Err(SpaceError::Ragged(_))));
    }

    #[test]
    fn test_segment_slices_all_fields() {
        let path = path_of(&[1.0, 2.0, 3.0, 4.0]);
        let segment = path.segment(1, 2).unwrap();
        assert_eq!(segment.len(), 2);
        assert_eq!(segment.original_rewards(), &[2.0, 3.0]);
        assert_eq!(segment.obs()[0], vec![1.0, 0.0]);
        assert_eq!(segment.actions(), &[Action::Discrete(1), Action::Discrete(0)]);
        assert_eq!(segment.total_original_reward(), 5.0);
    }

    #[test]
    fn test_segment_out_of_range() {
        let path = path_of(&[1.0, 2.0]);
        assert!(path.segment(1, 2).is_none());
        assert!(path.segment(0, 0).is_none());
        assert!(path.segment(usize::MAX, 2).is_none());
    }

    #[test]
    fn test_segments_get_distinct_ids() {
        let path = path_of(&[1.0, 2.0, 3.0]);
        let a = path.segment(0, 2).unwrap();
        let b = path.segment(0, 2).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_padding_repeats_end_state() {
        let path = path_of(&[1.0, 2.0]);
        let padded = path.padded_with_end_state(4);
        assert_eq!(padded.len(), 4);
        assert_eq!(padded.original_rewards(), &[1.0, 2.0, 2.0, 2.0]);
        assert_eq!(padded.obs()[3], path.obs()[1]);
        assert_eq!(padded.actions()[3], Action::Discrete(1));

        assert_eq!(path.padded_with_end_state(1), path);
        assert!(Path::default().padded_with_end_state(3).is_empty());
    }

    #[test]
    fn test_validate_reports_first_bad_step() {
        let path = path_of(&[0.0, 0.0, 0.0]);
        let obs_space = ObservationSpace::new(vec![2]);
        assert!(path.validate(&obs_space, &ActionSpace::Discrete(2)).is_ok());
        assert!(matches!(
            path.validate(&ObservationSpace::new(vec![3]), &ActionSpace::Discrete(2)),
            Err(SpaceError::ObservationWidth { step: 0, .. })
        ));
        assert!(matches!(
            path.validate(&obs_space, &ActionSpace::Continuous(vec![2])),
            Err(SpaceError::ActionKind { step: 0, .. })
        ));
    }

    #[test]
    fn test_path_serde_round_trip() {
        let path = path_of(&[0.5, -0.5]);
        let json = serde_json::to_string(&path).unwrap();
        let decoded: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_ragged_json_is_rejected() {
        let json = format!(
            r#"{{"obs": {}, "actions": [{{"Discrete": 0}}], "original_rewards": [1.0]}}"#,
            serde_json::to_string(&vec![vec![0.0_f32]; 20]).unwrap()
        );
        let err = serde_json::from_str::<Path>(&json).unwrap_err();
        assert!(err.to_string().contains("Ragged"));

        let segment = path_of(&[1.0, 2.0]).segment(0, 2).unwrap();
        let mut value = serde_json::to_value(&segment).unwrap();
        value["original_rewards"] = serde_json::json!([1.0]);
        assert!(serde_json::from_value::<Segment>(value).is_err());
    }

    #[test]
    fn test_segment_serde_keeps_id() {
        let segment = path_of(&[1.0, 2.0, 3.0]).segment(1, 2).unwrap();
        let json = serde_json::to_string(&segment).unwrap();
        let decoded: Segment = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.id(), segment.id());
        assert_eq!(decoded, segment);
    }
}
