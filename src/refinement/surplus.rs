use crate::{algorithms::refinement::RefinementFunctor, storage::SparseGridStorage};

///
/// Ranks points by the largest absolute surplus coefficient. `alpha` holds
/// `num_outputs` coefficients per grid point, ordered by sequence number.
/// Points without coefficients (e.g. created after `alpha` was computed)
/// get an indicator of zero.
///
pub struct SurplusRefinement<'a>
{
    pub alpha: &'a [f64],
    pub num_outputs: usize,
    pub max_candidates: usize,
    pub threshold: f64,
}

impl<'a> SurplusRefinement<'a>
{
    pub fn new(alpha: &'a [f64], max_candidates: usize, threshold: f64) -> Self
    {
        Self { alpha, num_outputs: 1, max_candidates, threshold }
    }

    pub fn with_outputs(mut self, num_outputs: usize) -> Self
    {
        self.num_outputs = num_outputs;
        self
    }
}

impl RefinementFunctor for SurplusRefinement<'_>
{
    fn indicator(&self, _storage: &SparseGridStorage, seq: usize) -> f64
    {
        let start = seq * self.num_outputs;
        self.alpha.get(start..start + self.num_outputs).map_or(0.0, |alpha_i|
        {
            let mut max = 0.0_f64;
            alpha_i.iter().for_each(|&val| max = max.max(val.abs()));
            max
        })
    }

    #[inline]
    fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    #[inline]
    fn threshold(&self) -> f64 {
        self.threshold
    }
}
