pub mod base_predictor;
pub mod collaborators;
