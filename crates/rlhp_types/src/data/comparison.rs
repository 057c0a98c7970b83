//! Pairwise comparisons between trajectory segments.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a segment held by a comparison collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(Uuid);

impl SegmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SegmentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of a comparison was judged better.
///
/// The discriminant is the class index used by the preference loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preference {
    Left = 0,
    Right = 1,
}

impl Preference {
    pub fn class_index(self) -> i64 {
        self as i64
    }

    pub fn flipped(self) -> Self {
        match self {
            Preference::Left => Preference::Right,
            Preference::Right => Preference::Left,
        }
    }
}

impl TryFrom<i64> for Preference {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Preference::Left),
            1 => Ok(Preference::Right),
            other => Err(other),
        }
    }
}

/// Two segments awaiting, or carrying, a preference judgment.
///
/// A comparison starts unlabeled and is labeled in place by the collector. How the
/// collector represents ties is its own business: only comparisons it reports as
/// decisive are trained on, and those always carry `Some(label)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub left: SegmentId,
    pub right: SegmentId,
    pub label: Option<Preference>,
}

impl Comparison {
    pub fn unlabeled(left: SegmentId, right: SegmentId) -> Self {
        Self {
            left,
            right,
            label: None,
        }
    }

    pub fn labeled(left: SegmentId, right: SegmentId, label: Preference) -> Self {
        Self {
            left,
            right,
            label: Some(label),
        }
    }

    pub fn is_labeled(&self) -> bool {
        self.label.is_some()
    }

    /// The same judgment with the sides exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            left: self.right,
            right: self.left,
            label: self.label.map(Preference::flipped),
        }
    }
}
