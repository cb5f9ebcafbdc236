use std::{collections::BTreeMap, ops::Range};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::{errors::SGError, storage::{child_of, GridPoint, Side, SparseGridStorage, MAX_LEVEL}};
use super::candidates::{BoundedCandidates, Candidate};

///
/// Supplies the refinement indicator and the knobs of one refinement pass.
///
/// The engine does not validate what a functor returns. Indicators are
/// ranked by `f64::total_cmp`, so a positive NaN ranks above `+inf` and a
/// negative NaN below `-inf`. A NaN never reaches the threshold and is
/// therefore never refined, even when it is selected. `max_candidates` and
/// `threshold` are read once per pass.
///
pub trait RefinementFunctor : Send + Sync
{
    ///
    /// Indicator ("value of refining here") of the point at `seq`. Called at
    /// most once per refinable point and pass, while the storage is read-only.
    ///
    fn indicator(&self, storage: &SparseGridStorage, seq: usize) -> f64;

    ///
    /// Maximum number of points ranked in one pass (K).
    ///
    fn max_candidates(&self) -> usize;

    ///
    /// Minimum indicator a ranked point needs to actually be refined.
    ///
    fn threshold(&self) -> f64;
}

///
/// Grid-type specific adjustment of a freshly computed child. Called once per
/// dimension before the new point is inserted.
///
pub trait PointConstructionHook : Send + Sync
{
    fn adjust(&self, _point: &mut GridPoint, _dim: usize) {}
}

/// Leaves new points as computed.
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityHook;

impl PointConstructionHook for IdentityHook {}

///
/// A level vector selected for subspace refinement together with the summed
/// indicators of the points that asked for it.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Subspace
{
    pub level: Vec<u8>,
    pub value: f64,
}

#[inline]
fn reaches(value: f64, threshold: f64) -> bool
{
    // false for NaN
    value >= threshold
}

///
/// Calls `operation` with every point of `storage` that misses at least one
/// child, along with the first dimension in which it does. Dimensions are
/// tested in increasing order and the scan of a point stops at the first
/// dimension with a missing child, so each point is reported at most once.
/// A dimension whose level already reached `level_limits[d]` is skipped.
///
fn iterate_refinable_points<Op: FnMut((usize, &GridPoint, usize))>(storage: &SparseGridStorage, level_limits: &[u8], operation: &mut Op)
{
    for (seq, point) in storage.iter()
    {
        for d in 0..storage.dimension()
        {
            if point.level[d] >= level_limits[d]
            {
                continue;
            }
            if storage.has_missing_child(point, d)
            {
                operation((seq, point, d));
                break;
            }
        }
    }
}

///
/// Hash based refinement. Stateless between calls: each `refine_once` scans
/// the storage, ranks the refinable points and then appends the missing
/// children of the selected ones.
///
#[derive(Clone, Debug, Default)]
pub struct HashRefinement<H: PointConstructionHook = IdentityHook>
{
    hook: H,
    parallel: bool,
    level_limits: Option<Vec<u8>>,
}

impl HashRefinement<IdentityHook>
{
    pub fn new() -> Self
    {
        Self::default()
    }
}

impl<H: PointConstructionHook> HashRefinement<H>
{
    pub fn with_hook(hook: H) -> Self
    {
        Self { hook, parallel: false, level_limits: None }
    }

    ///
    /// Evaluates indicators on the rayon thread pool during candidate
    /// collection. The storage is only read while this happens.
    ///
    pub fn parallel(mut self, parallel: bool) -> Self
    {
        self.parallel = parallel;
        self
    }

    ///
    /// Caps refinement per dimension: no point with `level[d] >= limits[d]`
    /// is refined in direction `d`, so no level ever exceeds its limit. The
    /// vector must have one entry per storage dimension, otherwise every
    /// operation fails with `DimensionMismatch`.
    ///
    pub fn level_limits(mut self, limits: Vec<u8>) -> Self
    {
        self.level_limits = Some(limits);
        self
    }

    fn limits_for(&self, storage: &SparseGridStorage) -> Result<Vec<u8>, SGError>
    {
        match &self.level_limits
        {
            Some(limits) if limits.len() != storage.dimension() => Err(SGError::DimensionMismatch),
            Some(limits) => Ok(limits.clone()),
            None => Ok(vec![MAX_LEVEL; storage.dimension()]),
        }
    }

    ///
    /// Phase 1: ranks every refinable point by its indicator and keeps the
    /// `functor.max_candidates()` best ones.
    ///
    pub fn collect_refinable(&self, storage: &SparseGridStorage, functor: &dyn RefinementFunctor) -> Result<BoundedCandidates, SGError>
    {
        if storage.is_empty()
        {
            return Err(SGError::StorageEmpty);
        }
        let limits = self.limits_for(storage)?;
        let mut candidates = BoundedCandidates::with_expected(functor.max_candidates(), storage.len());
        if self.parallel
        {
            let mut refinable = Vec::new();
            iterate_refinable_points(storage, &limits, &mut |(seq, _point, _dim)| refinable.push(seq));
            let evaluated: Vec<Candidate> = refinable.par_iter()
                .map(|&seq| Candidate { seq, value: functor.indicator(storage, seq) })
                .collect();
            for candidate in evaluated
            {
                candidates.push(candidate);
            }
        }
        else
        {
            iterate_refinable_points(storage, &limits, &mut |(seq, _point, _dim)|
            {
                candidates.push(Candidate { seq, value: functor.indicator(storage, seq) });
            });
        }
        Ok(candidates)
    }

    ///
    /// Phase 2: refines every candidate whose indicator reaches the threshold,
    /// best first. Returns the number of refined points.
    ///
    pub fn apply_refinement(&self, storage: &mut SparseGridStorage, functor: &dyn RefinementFunctor, candidates: &BoundedCandidates) -> Result<usize, SGError>
    {
        let threshold = functor.threshold();
        let mut refined = 0;
        for candidate in candidates.sorted()
        {
            if !reaches(candidate.value, threshold)
            {
                continue;
            }
            self.refine_gridpoint(storage, candidate.seq)?;
            refined += 1;
        }
        Ok(refined)
    }

    ///
    /// Runs one refinement pass and returns the sequence numbers of the points
    /// it created. New points are only ever appended, so they form the tail
    /// `before..storage.len()`. The caller must not mutate `storage` from
    /// elsewhere during the call.
    ///
    pub fn refine_once(&self, storage: &mut SparseGridStorage, functor: &dyn RefinementFunctor) -> Result<Range<usize>, SGError>
    {
        let before = storage.len();
        let candidates = self.collect_refinable(storage, functor)?;
        let refined = self.apply_refinement(storage, functor, &candidates)?;
        debug!(candidates = candidates.len(), refined, created = storage.len() - before, "refinement pass finished");
        Ok(before..storage.len())
    }

    ///
    /// Returns the number of grid points that can be refined.
    ///
    pub fn count_refinable(&self, storage: &SparseGridStorage) -> Result<usize, SGError>
    {
        if storage.is_empty()
        {
            return Err(SGError::StorageEmpty);
        }
        let limits = self.limits_for(storage)?;
        let mut count = 0;
        iterate_refinable_points(storage, &limits, &mut |_point| count += 1);
        Ok(count)
    }

    ///
    /// Sums the indicators of the refinable points per subspace and keeps the
    /// `functor.max_candidates()` best subspaces, best first. A point votes
    /// for the level vector of its children in the first direction where one
    /// is missing. The raw indicator is summed, so negative values lower a
    /// subspace's score. Equal scores keep the lexicographically smaller
    /// level vector.
    ///
    pub fn collect_refinable_subspaces(&self, storage: &SparseGridStorage, functor: &dyn RefinementFunctor) -> Result<Vec<Subspace>, SGError>
    {
        if storage.is_empty()
        {
            return Err(SGError::StorageEmpty);
        }
        let limits = self.limits_for(storage)?;
        let mut scores: BTreeMap<Vec<u8>, f64> = BTreeMap::new();
        iterate_refinable_points(storage, &limits, &mut |(seq, point, dim)|
        {
            if let Some((level, _)) = child_of(point.level[dim], point.index[dim], Side::Left)
            {
                let mut key = point.level.clone();
                key[dim] = level;
                *scores.entry(key).or_insert(0.0) += functor.indicator(storage, seq);
            }
        });
        // positions follow the map order, so ties resolve to the smaller level vector
        let subspaces: Vec<(Vec<u8>, f64)> = scores.into_iter().collect();
        let mut candidates = BoundedCandidates::with_expected(functor.max_candidates(), subspaces.len());
        for (position, (_, value)) in subspaces.iter().enumerate()
        {
            candidates.push(Candidate { seq: position, value: *value });
        }
        Ok(candidates.sorted().into_iter()
            .map(|c| Subspace { level: subspaces[c.seq].0.clone(), value: c.value })
            .collect())
    }

    ///
    /// Creates every selected subspace whose score reaches the threshold.
    /// Returns the number of subspaces created.
    ///
    pub fn apply_subspace_refinement(&self, storage: &mut SparseGridStorage, functor: &dyn RefinementFunctor, subspaces: &[Subspace]) -> Result<usize, SGError>
    {
        let threshold = functor.threshold();
        let mut created = 0;
        for subspace in subspaces
        {
            if !reaches(subspace.value, threshold)
            {
                continue;
            }
            self.create_subspace(storage, &subspace.level)?;
            created += 1;
        }
        Ok(created)
    }

    ///
    /// One subspace refinement pass. Like `refine_once` the new points form
    /// the returned tail of the storage.
    ///
    pub fn refine_subspaces_once(&self, storage: &mut SparseGridStorage, functor: &dyn RefinementFunctor) -> Result<Range<usize>, SGError>
    {
        let before = storage.len();
        let subspaces = self.collect_refinable_subspaces(storage, functor)?;
        let created = self.apply_subspace_refinement(storage, functor, &subspaces)?;
        debug!(subspaces = subspaces.len(), created, points = storage.len() - before, "subspace refinement pass finished");
        Ok(before..storage.len())
    }

    ///
    /// Inserts every missing point of the subspace `level`, i.e. all odd
    /// indices below `2^level[d]` in each dimension, as leaves. Stored
    /// hierarchical parents of the new points stop being leaves; absent
    /// parents are not created.
    ///
    pub fn create_subspace(&self, storage: &mut SparseGridStorage, level: &[u8]) -> Result<(), SGError>
    {
        let dim = storage.dimension();
        if level.len() != dim
        {
            return Err(SGError::DimensionMismatch);
        }
        if level.iter().any(|&l| l == 0 || l > MAX_LEVEL)
        {
            return Err(SGError::InvalidLevelIndex);
        }
        trace!(?level, "creating subspace");
        let mut index = vec![1u32; dim];
        loop
        {
            let point = GridPoint::new(level, &index, true);
            if !storage.contains(&point)
            {
                for d in 0..dim
                {
                    if let Some(seq) = point.parent(d).and_then(|parent| storage.find(&parent))
                    {
                        storage.set_is_leaf(seq, false);
                    }
                }
                self.create_point(storage, point)?;
            }
            // odometer over the odd indices
            let mut d = 0;
            loop
            {
                if d == dim
                {
                    return Ok(());
                }
                index[d] += 2;
                if index[d] < (1u32 << level[d])
                {
                    break;
                }
                index[d] = 1;
                d += 1;
            }
        }
    }

    ///
    /// Marks the point at `seq` as non-leaf and creates its missing children in
    /// every direction below the level limits.
    ///
    pub fn refine_gridpoint(&self, storage: &mut SparseGridStorage, seq: usize) -> Result<(), SGError>
    {
        let limits = self.limits_for(storage)?;
        let point = storage.get(seq).ok_or(SGError::InvalidIndex)?.clone();
        trace!(seq, level = ?point.level, index = ?point.index, "refining grid point");
        storage.set_is_leaf(seq, false);
        for dim in 0..storage.dimension()
        {
            if point.level[dim] >= limits[dim]
            {
                continue;
            }
            self.refine_1d(storage, &point, dim)?;
        }
        Ok(())
    }

    ///
    /// Refine a grid point along a single direction
    ///
    pub fn refine_1d(&self, storage: &mut SparseGridStorage, point: &GridPoint, dim: usize) -> Result<(), SGError>
    {
        for side in Side::BOTH
        {
            if let Some(child) = point.child(dim, side)
            {
                if !storage.contains(&child)
                {
                    self.create_point(storage, child)?;
                }
            }
        }
        Ok(())
    }

    fn create_point(&self, storage: &mut SparseGridStorage, mut point: GridPoint) -> Result<(), SGError>
    {
        point.set_is_leaf(true);
        for dim in 0..storage.dimension()
        {
            self.hook.adjust(&mut point, dim);
        }
        // the hook may map the child onto an existing point
        if !storage.contains(&point)
        {
            storage.insert(point)?;
        }
        Ok(())
    }
}
