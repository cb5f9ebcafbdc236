pub mod candidates;
pub mod generation;
pub mod refinement;
