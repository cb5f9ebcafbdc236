//! Property tests for the point storage and the refinement engine.

use std::collections::HashSet;
use proptest::collection::vec;
use proptest::prelude::*;
use sgrefine::{
    algorithms::{generation::regular, refinement::{HashRefinement, RefinementFunctor}},
    storage::{GridKey, GridPoint, SparseGridStorage},
};

/// Looks indicators up in a table, cycling through it by sequence number.
struct TableFunctor
{
    values: Vec<f64>,
    max_candidates: usize,
    threshold: f64,
}

impl RefinementFunctor for TableFunctor
{
    fn indicator(&self, _storage: &SparseGridStorage, seq: usize) -> f64 {
        self.values[seq % self.values.len()]
    }
    fn max_candidates(&self) -> usize {
        self.max_candidates
    }
    fn threshold(&self) -> f64 {
        self.threshold
    }
}

fn grid(dim: usize, level: usize) -> SparseGridStorage
{
    let mut storage = SparseGridStorage::new(dim);
    regular(&mut storage, level).expect("regular grid");
    storage
}

fn keys(storage: &SparseGridStorage) -> Vec<GridKey>
{
    storage.points().iter().map(|p| p.key()).collect()
}

proptest! {
    /// Refinement only appends; existing identities never change.
    #[test]
    fn refinement_is_append_only(
        dim in 1usize..4,
        level in 1usize..4,
        values in vec(0.0f64..1.0, 1..20),
        max_candidates in 0usize..8,
        threshold in 0.0f64..1.0,
        passes in 1usize..4
    ) {
        let mut storage = grid(dim, level);
        let functor = TableFunctor { values, max_candidates, threshold };
        let refinement = HashRefinement::new();
        for _ in 0..passes
        {
            let before = keys(&storage);
            let added = refinement.refine_once(&mut storage, &functor).expect("refine");
            prop_assert_eq!(added.start, before.len());
            prop_assert_eq!(added.end, storage.len());
            let after = keys(&storage);
            prop_assert_eq!(&after[..before.len()], &before[..]);
            for seq in added
            {
                prop_assert!(storage.is_leaf(seq));
            }
        }
    }

    /// Every point is stored exactly once and found under its own sequence number.
    #[test]
    fn refinement_never_duplicates(
        dim in 1usize..4,
        values in vec(0.0f64..1.0, 1..20),
        max_candidates in 1usize..16,
        passes in 1usize..5
    ) {
        let mut storage = grid(dim, 2);
        let functor = TableFunctor { values, max_candidates, threshold: 0.0 };
        let refinement = HashRefinement::new();
        for _ in 0..passes
        {
            refinement.refine_once(&mut storage, &functor).expect("refine");
        }
        let unique: HashSet<GridKey> = keys(&storage).into_iter().collect();
        prop_assert_eq!(unique.len(), storage.len());
        for (seq, point) in storage.iter()
        {
            prop_assert_eq!(storage.find(point), Some(seq));
        }
    }

    /// The ranked collection holds min(K, refinable) candidates.
    #[test]
    fn selection_is_bounded(
        dim in 1usize..4,
        level in 1usize..4,
        values in vec(-1.0f64..1.0, 1..20),
        max_candidates in 0usize..32
    ) {
        let storage = grid(dim, level);
        let functor = TableFunctor { values, max_candidates, threshold: 0.0 };
        let refinement = HashRefinement::new();
        let candidates = refinement.collect_refinable(&storage, &functor).expect("collect");
        let refinable = refinement.count_refinable(&storage).expect("count");
        prop_assert!(candidates.len() <= max_candidates);
        prop_assert_eq!(candidates.len(), max_candidates.min(refinable));
    }

    /// With K unbounded every refinable point becomes a candidate exactly once.
    #[test]
    fn count_matches_unbounded_collection(
        dim in 1usize..4,
        level in 1usize..4,
        values in vec(0.0f64..1.0, 1..20),
        passes in 0usize..3
    ) {
        let mut storage = grid(dim, level);
        let refinement = HashRefinement::new();
        let grow = TableFunctor { values: values.clone(), max_candidates: 2, threshold: 0.0 };
        for _ in 0..passes
        {
            refinement.refine_once(&mut storage, &grow).expect("refine");
        }
        let functor = TableFunctor { values, max_candidates: usize::MAX, threshold: 0.0 };
        let candidates = refinement.collect_refinable(&storage, &functor).expect("collect");
        let seqs: HashSet<usize> = candidates.iter().map(|c| c.seq).collect();
        prop_assert_eq!(seqs.len(), candidates.len());
        prop_assert_eq!(candidates.len(), refinement.count_refinable(&storage).expect("count"));
    }

    /// Candidates below the threshold stay leaves, and every new point is a
    /// child of a candidate that reached it. A gated point may still gain a
    /// child through a refined neighbour sharing it in another dimension.
    #[test]
    fn threshold_gates_refinement(
        dim in 1usize..4,
        level in 1usize..4,
        values in vec(0.0f64..1.0, 1..20),
        max_candidates in 1usize..16,
        threshold in 0.0f64..1.0
    ) {
        let mut storage = grid(dim, level);
        let functor = TableFunctor { values, max_candidates, threshold };
        let refinement = HashRefinement::new();
        let candidates = refinement.collect_refinable(&storage, &functor).expect("collect");
        let gated: Vec<(usize, bool)> = candidates.iter()
            .filter(|c| c.value < threshold)
            .map(|c| (c.seq, storage.is_leaf(c.seq)))
            .collect();
        let refined: HashSet<usize> = candidates.iter()
            .filter(|c| c.value >= threshold)
            .map(|c| c.seq)
            .collect();
        let before = storage.len();
        refinement.apply_refinement(&mut storage, &functor, &candidates).expect("apply");
        for (seq, is_leaf) in gated
        {
            prop_assert_eq!(storage.is_leaf(seq), is_leaf);
        }
        for seq in before..storage.len()
        {
            let point = storage.point(seq);
            let from_refined = (0..dim)
                .filter_map(|d| point.parent(d))
                .filter_map(|parent| storage.find(&parent))
                .any(|parent| refined.contains(&parent));
            prop_assert!(from_refined);
        }
    }

    /// Subspace refinement appends whole subspaces and never duplicates.
    #[test]
    fn subspace_refinement_creates_complete_subspaces(
        dim in 1usize..4,
        level in 1usize..4,
        values in vec(-1.0f64..1.0, 1..20),
        max_candidates in 0usize..4,
        threshold in -1.0f64..1.0
    ) {
        let mut storage = grid(dim, level);
        let functor = TableFunctor { values, max_candidates, threshold };
        let refinement = HashRefinement::new();
        let subspaces = refinement.collect_refinable_subspaces(&storage, &functor).expect("collect");
        prop_assert!(subspaces.len() <= max_candidates);
        let before = keys(&storage);
        let added = refinement.refine_subspaces_once(&mut storage, &functor).expect("refine");
        prop_assert_eq!(added.start, before.len());
        let after = keys(&storage);
        prop_assert_eq!(&after[..before.len()], &before[..]);
        let unique: HashSet<GridKey> = after.into_iter().collect();
        prop_assert_eq!(unique.len(), storage.len());
        for subspace in subspaces.iter().filter(|s| s.value >= threshold)
        {
            let size: usize = subspace.level.iter().map(|&l| 1usize << (l - 1)).product();
            let stored = storage.points().iter().filter(|p| p.level == subspace.level).count();
            prop_assert_eq!(stored, size);
        }
    }

    /// No point grows beyond the per-dimension level limits.
    #[test]
    fn level_limits_are_never_exceeded(
        dim in 1usize..4,
        limits in vec(1u8..4, 3),
        values in vec(0.0f64..1.0, 1..20),
        passes in 1usize..5
    ) {
        let mut storage = SparseGridStorage::new(dim);
        storage.insert(GridPoint::new(&vec![1u8; dim], &vec![1u32; dim], true)).expect("insert");
        let limits = limits[..dim].to_vec();
        let refinement = HashRefinement::new().level_limits(limits.clone());
        let functor = TableFunctor { values, max_candidates: 8, threshold: 0.0 };
        for _ in 0..passes
        {
            refinement.refine_once(&mut storage, &functor).expect("refine");
            refinement.refine_subspaces_once(&mut storage, &functor).expect("refine subspaces");
        }
        for point in storage.points()
        {
            for d in 0..dim
            {
                prop_assert!(point.level[d] <= limits[d]);
            }
        }
    }

    /// Refining the same point twice creates its children only once.
    #[test]
    fn child_creation_is_idempotent(dim in 1usize..4, level in 1usize..4, pick in any::<prop::sample::Index>()) {
        let mut storage = grid(dim, level);
        let refinement = HashRefinement::new();
        let seq = pick.index(storage.len());
        refinement.refine_gridpoint(&mut storage, seq).expect("refine");
        let len = storage.len();
        refinement.refine_gridpoint(&mut storage, seq).expect("refine");
        prop_assert_eq!(storage.len(), len);
        prop_assert!(!storage.is_leaf(seq));
        for d in 0..dim
        {
            prop_assert!(!storage.has_missing_child(storage.point(seq), d));
        }
    }
}

#[test]
fn second_pass_on_refined_root_changes_nothing()
{
    let mut storage = SparseGridStorage::new(1);
    storage.insert(GridPoint::new(&[1], &[1], true)).expect("insert");
    let refinement = HashRefinement::new();
    let functor = TableFunctor { values: vec![1.0], max_candidates: 1, threshold: 0.0 };
    assert_eq!(refinement.refine_once(&mut storage, &functor).expect("refine"), 1..3);

    // only the root would qualify, but it has both children now
    struct RootOnly;
    impl RefinementFunctor for RootOnly
    {
        fn indicator(&self, _storage: &SparseGridStorage, seq: usize) -> f64 {
            if seq == 0 { 1.0 } else { -1.0 }
        }
        fn max_candidates(&self) -> usize {
            1
        }
        fn threshold(&self) -> f64 {
            0.0
        }
    }
    let added = refinement.refine_once(&mut storage, &RootOnly).expect("refine");
    assert!(added.is_empty());
    assert_eq!(storage.len(), 3);
}
