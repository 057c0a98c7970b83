//! # RLHP shared types
//!
//! Plain data exchanged between the environment loop, the comparison collector and the
//! reward predictors:
//!
//! - **Spaces** (`data::space`): observation and action spaces, resolved once from the
//!   environment and used to validate every segment fed to a model.
//! - **Actions** (`data::action`): discrete indices or continuous vectors, plus one-hot
//!   encoding for discrete spaces.
//! - **Trajectories** (`data::trajectory`): complete episodes (`Path`) and the fixed-length
//!   clips sampled from them (`Segment`).
//! - **Comparisons** (`data::comparison`): pairs of segment ids with an optional preference.

pub mod data {
    pub mod action;
    pub mod comparison;
    pub mod space;
    pub mod trajectory;
}

pub mod prelude {
    pub use crate::data::action::{one_hot, Action};
    pub use crate::data::comparison::{Comparison, Preference, SegmentId};
    pub use crate::data::space::{ActionSpace, EnvironmentSpec, ObservationSpace, SpaceError};
    pub use crate::data::trajectory::{Path, Segment};
}
