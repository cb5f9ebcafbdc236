//! Hierarchical sparse grid point storage and adaptive refinement.
//!
//! Grid points are addressed by their per-axis (level, index) pairs and kept
//! in a [`storage::SparseGridStorage`] that assigns stable, insertion-ordered
//! sequence numbers. [`algorithms::refinement::HashRefinement`] grows such a
//! storage by ranking refinable points with a
//! [`algorithms::refinement::RefinementFunctor`] and appending the missing
//! children of the best ones, or whole subspaces chosen by summed indicators.

pub mod algorithms;
pub mod errors;
pub mod refinement;
pub mod serialization;
pub mod storage;
