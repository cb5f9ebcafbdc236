use crate::{errors::SGError, storage::{GridPoint, SparseGridStorage, MAX_LEVEL}};

///
/// Generates a regular sparse grid of level `level` without boundaries into
/// an empty storage: every point with all levels at least one and a level sum
/// of at most `level + D - 1`. Points on the finest diagonal are leaves.
///
/// The grid is built one dimension at a time: start with the one dimensional
/// hierarchy and extend every intermediate point by all admissible
/// level/index pairs of the next dimension.
///
pub fn regular(storage: &mut SparseGridStorage, level: usize) -> Result<(), SGError>
{
    if !storage.is_empty()
    {
        return Err(SGError::StorageNotEmpty);
    }
    if level > MAX_LEVEL as usize
    {
        return Err(SGError::InvalidLevelIndex);
    }
    let dim = storage.dimension();
    if level == 0 || dim == 0
    {
        return Ok(());
    }
    let n = level as u32;
    let mut partial = vec![GridPoint::new(&[], &[], false)];
    for d in 0..dim
    {
        // level sum budget of the first d + 1 dimensions
        let budget = n + d as u32;
        let mut next = Vec::new();
        for point in &partial
        {
            let used = point.level_sum();
            for l in 1..=(budget - used).min(n)
            {
                for i in (1..(1u32 << l)).step_by(2)
                {
                    let mut extended = point.clone();
                    extended.level.push(l as u8);
                    extended.index.push(i);
                    next.push(extended);
                }
            }
        }
        partial = next;
    }
    let finest = n + dim as u32 - 1;
    for point in partial
    {
        let is_leaf = point.level_sum() == finest;
        storage.insert(GridPoint::new(&point.level, &point.index, is_leaf))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_regular_1d()
    {
        let mut storage = SparseGridStorage::new(1);
        regular(&mut storage, 3).unwrap();
        assert_eq!(storage.len(), 7);
        let leaves = storage.iter().filter(|(_, p)| p.is_leaf()).count();
        assert_eq!(leaves, 4);
    }

    #[test]
    fn test_regular_point_counts()
    {
        // 2D level 3: 1 + 2*2 + (4 + 4 + 4) = 17 points
        let mut storage = SparseGridStorage::new(2);
        regular(&mut storage, 3).unwrap();
        assert_eq!(storage.len(), 17);
        let mut storage = SparseGridStorage::new(3);
        regular(&mut storage, 2).unwrap();
        assert_eq!(storage.len(), 7);
        assert_eq!(storage.max_level(), 2);
    }

    #[test]
    fn test_regular_leaf_flags_match_children()
    {
        let mut storage = SparseGridStorage::new(2);
        regular(&mut storage, 4).unwrap();
        let flags: Vec<bool> = storage.points().iter().map(GridPoint::is_leaf).collect();
        storage.recalc_leaf_property();
        let recomputed: Vec<bool> = storage.points().iter().map(GridPoint::is_leaf).collect();
        assert_eq!(flags, recomputed);
    }

    #[test]
    fn test_regular_rejects_non_empty_and_level_zero_is_empty()
    {
        let mut storage = SparseGridStorage::new(2);
        regular(&mut storage, 0).unwrap();
        assert!(storage.is_empty());
        regular(&mut storage, 1).unwrap();
        assert_eq!(storage.len(), 1);
        assert_eq!(regular(&mut storage, 2), Err(SGError::StorageNotEmpty));
        let mut storage = SparseGridStorage::new(1);
        assert_eq!(regular(&mut storage, MAX_LEVEL as usize + 1), Err(SGError::InvalidLevelIndex));
    }
}
