use std::hash::{Hash, Hasher};
use bitfield_struct::bitfield;
use serde::{Deserialize, Serialize};

use crate::errors::SGError;

///
/// Finest level a grid point may carry. Children of a point at this level
/// would overflow the `u32` index space, so refinement stops here.
///
pub const MAX_LEVEL: u8 = 30;

#[bitfield(u8, new=false)]
#[derive(Serialize, Deserialize, PartialEq, Eq)]
pub struct GridPointFlags
{
    pub is_leaf: bool,
    pub is_inner: bool,
    #[bits(6)]
    pub _empty: u8
}

impl GridPointFlags
{
    pub fn new(level: &[u8], is_leaf: bool) -> Self
    {
        let mut r = Self::default();
        r.set_is_leaf(is_leaf);
        r.set_is_inner(!level.contains(&0));
        r
    }
    /// update `is_inner` flag...
    pub fn update_is_inner(&mut self, level: &[u8])
    {
        self.set_is_inner(!level.contains(&0));
    }
}

///
/// Which of the two hierarchical children along one axis.
///
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side
{
    Left,
    Right,
}

impl Side
{
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

///
/// Packed (level, index) tuple of a grid point. Each axis occupies one `u64`
/// with the level in the upper and the index in the lower 32 bits. This is the
/// key of the storage map; the leaf flag never takes part in it.
///
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GridKey(Box<[u64]>);

impl GridKey
{
    #[inline]
    fn pack(level: u8, index: u32) -> u64
    {
        ((level as u64) << 32) | index as u64
    }

    pub fn from_parts(level: &[u8], index: &[u32]) -> Self
    {
        Self(level.iter().zip(index).map(|(&l, &i)| Self::pack(l, i)).collect())
    }

    ///
    /// Key of `level`/`index` with axis `dim` replaced by `(l, i)`.
    ///
    pub fn with_axis(level: &[u8], index: &[u32], dim: usize, l: u8, i: u32) -> Self
    {
        let mut key = Self::from_parts(level, index);
        key.0[dim] = Self::pack(l, i);
        key
    }

    #[inline]
    pub fn dim(&self) -> usize
    {
        self.0.len()
    }

    #[inline]
    pub fn level(&self, dim: usize) -> u8
    {
        (self.0[dim] >> 32) as u8
    }

    #[inline]
    pub fn index(&self, dim: usize) -> u32
    {
        self.0[dim] as u32
    }
}

///
/// Level/index pair of the child of `(level, index)` on `side`, or `None` when
/// the axis is already at `MAX_LEVEL`. A level-0 (boundary) axis has the
/// single child `(1, 1)` on both sides.
///
#[inline]
pub fn child_of(level: u8, index: u32, side: Side) -> Option<(u8, u32)>
{
    if level >= MAX_LEVEL
    {
        return None;
    }
    if level == 0
    {
        return Some((1, 1));
    }
    match side
    {
        Side::Left => Some((level + 1, 2 * index - 1)),
        Side::Right => Some((level + 1, 2 * index + 1)),
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct GridPoint
{
    pub level: Vec<u8>,
    pub index: Vec<u32>,
    pub(crate) flags: GridPointFlags,
}

impl Hash for GridPoint
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.index.hash(state);
    }
}

impl PartialEq for GridPoint
{
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.index == other.index
    }
}
impl Eq for GridPoint {}

impl GridPoint
{
    pub fn new(level: &[u8], index: &[u32], is_leaf: bool) -> Self
    {
        let flags = GridPointFlags::new(level, is_leaf);
        Self { level: level.to_vec(), index: index.to_vec(), flags }
    }

    #[inline]
    pub fn dim(&self) -> usize
    {
        self.level.len()
    }

    #[inline]
    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }

    #[inline]
    pub fn set_is_leaf(&mut self, is_leaf: bool)
    {
        self.flags.set_is_leaf(is_leaf);
    }

    ///
    /// This is an inner point if no levels are zero...
    ///
    #[inline]
    pub fn is_inner_point(&self) -> bool
    {
        self.flags.is_inner()
    }

    #[inline]
    pub fn flags(&self) -> GridPointFlags
    {
        self.flags
    }

    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }
    #[inline]
    pub fn level_max(&self) -> u8
    {
        *self.level.iter().max().unwrap_or(&0)
    }

    pub fn key(&self) -> GridKey
    {
        GridKey::from_parts(&self.level, &self.index)
    }

    ///
    /// Key of the child in direction `dim` without building the point itself.
    ///
    pub fn child_key(&self, dim: usize, side: Side) -> Option<GridKey>
    {
        child_of(self.level[dim], self.index[dim], side)
            .map(|(l, i)| GridKey::with_axis(&self.level, &self.index, dim, l, i))
    }

    ///
    /// Child in direction `dim`. The leaf flag is copied from `self`; callers set
    /// it before inserting.
    ///
    pub fn child(&self, dim: usize, side: Side) -> Option<GridPoint>
    {
        child_of(self.level[dim], self.index[dim], side).map(|(l, i)|
        {
            let mut r = self.clone();
            r.level[dim] = l;
            r.index[dim] = i;
            r.flags.update_is_inner(&r.level);
            r
        })
    }

    pub fn left_child(&self, dim: usize) -> Option<GridPoint>
    {
        self.child(dim, Side::Left)
    }

    pub fn right_child(&self, dim: usize) -> Option<GridPoint>
    {
        self.child(dim, Side::Right)
    }

    ///
    /// This only works for grids without boundaries.
    ///
    pub fn parent(&self, dim: usize) -> Option<GridPoint>
    {
        if self.level[dim] <= 1
        {
            return None;
        }
        let mut r = self.clone();
        r.index[dim] = (self.index[dim] >> 1) | 1;
        r.level[dim] -= 1;
        Some(r)
    }

    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        self.level.iter().zip(&self.index).map(|(&l, &i)| i as f64 / (1u64 << l) as f64).collect()
    }

    ///
    /// Checks the level/index encoding: every axis must have a level no larger
    /// than `MAX_LEVEL`, level 0 only allows the boundary indices 0 and 1 and
    /// finer levels need an odd index below `2^level`.
    ///
    pub fn validate(&self) -> Result<(), SGError>
    {
        if self.level.len() != self.index.len()
        {
            return Err(SGError::DimensionMismatch);
        }
        for (&l, &i) in self.level.iter().zip(&self.index)
        {
            let valid = match l
            {
                0 => i <= 1,
                l if l <= MAX_LEVEL => i % 2 == 1 && (i as u64) < (1u64 << l),
                _ => false,
            };
            if !valid
            {
                return Err(SGError::InvalidLevelIndex);
            }
        }
        Ok(())
    }
}
