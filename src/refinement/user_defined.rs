use crate::{algorithms::refinement::RefinementFunctor, storage::SparseGridStorage};

///
/// A function that defines how refinement is performed.
///
/// # Arguments
/// - `storage`: Storage of sparse grid.
/// - `seq`: Sequence number of the point to rank.
///
pub type UserRefinementFunction = dyn Fn(&SparseGridStorage, usize) -> f64 + Send + Sync;

pub struct UserDefinedRefinement<'a>
{
    pub fun_eval: &'a UserRefinementFunction,
    pub max_candidates: usize,
    pub threshold: f64,
}

impl RefinementFunctor for UserDefinedRefinement<'_>
{
    fn indicator(&self, storage: &SparseGridStorage, seq: usize) -> f64 {
        (self.fun_eval)(storage, seq)
    }

    fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}
