use std::ops::Index;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::SGError;
use super::grid_point::{GridKey, GridPoint, Side};

///
/// Insertion-ordered storage of sparse grid points. Points live in a growable
/// list addressed by their sequence number; the map only resolves the packed
/// (level, index) key of a point to that sequence number.
///
/// Sequence numbers are contiguous, start at zero and never change once
/// assigned. The only in-place mutation of a stored point is its leaf flag.
///
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "StoredGrid", into = "StoredGrid")]
pub struct SparseGridStorage
{
    num_inputs: usize,
    list: Vec<GridPoint>,
    map: FxHashMap<GridKey, usize>,
}

/// Serialized form: the ordered point list. The map is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct StoredGrid
{
    num_inputs: usize,
    points: Vec<GridPoint>,
}

impl From<SparseGridStorage> for StoredGrid
{
    fn from(value: SparseGridStorage) -> Self {
        Self { num_inputs: value.num_inputs, points: value.list }
    }
}

impl TryFrom<StoredGrid> for SparseGridStorage
{
    type Error = SGError;

    fn try_from(value: StoredGrid) -> Result<Self, Self::Error> {
        SparseGridStorage::from_points(value.num_inputs, value.points)
    }
}

impl SparseGridStorage
{
    pub fn new(num_inputs: usize) -> Self
    {
        Self { num_inputs, list: Vec::new(), map: FxHashMap::default() }
    }

    ///
    /// Builds a storage from an ordered list of points. Sequence numbers follow
    /// the order of `points`. Fails on the first malformed or repeated point.
    ///
    pub fn from_points(num_inputs: usize, points: Vec<GridPoint>) -> Result<Self, SGError>
    {
        let mut storage = Self::new(num_inputs);
        storage.list.reserve(points.len());
        storage.map.reserve(points.len());
        for point in points
        {
            storage.insert(point)?;
        }
        Ok(storage)
    }

    #[inline]
    pub fn dimension(&self) -> usize
    {
        self.num_inputs
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.list.is_empty()
    }

    #[inline]
    pub fn find(&self, point: &GridPoint) -> Option<usize>
    {
        self.find_key(&point.key())
    }

    #[inline]
    pub fn find_key(&self, key: &GridKey) -> Option<usize>
    {
        self.map.get(key).copied()
    }

    #[inline]
    pub fn contains(&self, point: &GridPoint) -> bool
    {
        self.contains_key(&point.key())
    }

    #[inline]
    pub fn contains_key(&self, key: &GridKey) -> bool
    {
        self.map.contains_key(key)
    }

    ///
    /// Appends `point` and returns its sequence number. The point must match
    /// the storage dimension, be a valid level/index encoding and not be
    /// present yet; otherwise the storage is left untouched.
    ///
    pub fn insert(&mut self, mut point: GridPoint) -> Result<usize, SGError>
    {
        if point.dim() != self.num_inputs
        {
            return Err(SGError::DimensionMismatch);
        }
        point.validate()?;
        let key = point.key();
        if self.map.contains_key(&key)
        {
            return Err(SGError::DuplicatePoint);
        }
        // make sure our is_inner flag is up-to-date...
        point.flags.update_is_inner(&point.level);
        let seq = self.list.len();
        self.list.push(point);
        self.map.insert(key, seq);
        Ok(seq)
    }

    #[inline]
    pub fn get(&self, seq: usize) -> Option<&GridPoint>
    {
        self.list.get(seq)
    }

    ///
    /// Point at `seq`. Panics when `seq` is out of range.
    ///
    #[inline]
    pub fn point(&self, seq: usize) -> &GridPoint
    {
        &self.list[seq]
    }

    #[inline]
    pub fn is_leaf(&self, seq: usize) -> bool
    {
        self.list[seq].is_leaf()
    }

    ///
    /// Flips the leaf flag of the point at `seq`. Panics when `seq` is out of range.
    ///
    #[inline]
    pub fn set_is_leaf(&mut self, seq: usize, value: bool)
    {
        self.list[seq].set_is_leaf(value);
    }

    #[inline]
    pub fn try_set_is_leaf(&mut self, seq: usize, value: bool) -> Result<(), SGError>
    {
        self.list.get_mut(seq).ok_or(SGError::InvalidIndex)?.set_is_leaf(value);
        Ok(())
    }

    ///
    /// Sequence numbers paired with their points, in insertion order.
    ///
    #[inline]
    pub fn iter(&self) -> std::iter::Enumerate<std::slice::Iter<'_, GridPoint>>
    {
        self.list.iter().enumerate()
    }

    #[inline]
    pub fn points(&self) -> &[GridPoint]
    {
        &self.list
    }

    pub fn unit_coordinates(&self) -> Vec<Vec<f64>>
    {
        self.list.iter().map(GridPoint::unit_coordinate).collect()
    }

    pub fn max_level(&self) -> u8
    {
        self.list.iter().map(GridPoint::level_max).max().unwrap_or(0)
    }

    pub fn number_of_inner_points(&self) -> usize
    {
        self.list.iter().filter(|p| p.is_inner_point()).count()
    }

    ///
    /// Returns true if any child of `point` along `dim` is missing from the
    /// storage. Axes at `MAX_LEVEL` have no children and never count as missing.
    ///
    #[inline]
    pub fn has_missing_child(&self, point: &GridPoint, dim: usize) -> bool
    {
        Side::BOTH.iter().any(|&side|
        {
            point.child_key(dim, side).is_some_and(|key| !self.contains_key(&key))
        })
    }

    ///
    /// Recomputes every leaf flag: a point is a leaf iff no child in any
    /// direction is stored.
    ///
    pub fn recalc_leaf_property(&mut self)
    {
        let leaves: Vec<bool> = self.list.iter().map(|point|
        {
            (0..self.num_inputs).all(|dim|
            {
                Side::BOTH.iter().all(|&side| point.child_key(dim, side).map_or(true, |key| !self.contains_key(&key)))
            })
        }).collect();
        for (point, is_leaf) in self.list.iter_mut().zip(leaves)
        {
            point.set_is_leaf(is_leaf);
        }
    }
}

impl Index<usize> for SparseGridStorage
{
    type Output = GridPoint;
    fn index(&self, index: usize) -> &Self::Output
    {
        &self.list[index]
    }
}
