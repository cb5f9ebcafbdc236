use std::{cmp::{Ordering, Reverse}, collections::BinaryHeap};

///
/// A refinable point together with the indicator its functor assigned to it.
///
/// Candidates are totally ordered: a larger indicator ranks higher and, for
/// equal indicators, the lower sequence number ranks higher. Indicators are
/// compared with `f64::total_cmp`.
///
#[derive(Copy, Clone, Debug)]
pub struct Candidate
{
    pub seq: usize,
    pub value: f64,
}

impl PartialEq for Candidate
{
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Candidate {}

impl PartialOrd for Candidate
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.total_cmp(&other.value).then(other.seq.cmp(&self.seq))
    }
}

///
/// Keeps the `capacity` best candidates pushed so far. The worst retained
/// candidate sits on top of a min-heap; a new candidate either fills a free
/// slot or replaces the worst one if it ranks higher. The collection never
/// holds more than `capacity` entries.
///
#[derive(Clone, Debug)]
pub struct BoundedCandidates
{
    heap: BinaryHeap<Reverse<Candidate>>,
    capacity: usize,
}

impl BoundedCandidates
{
    pub fn new(capacity: usize) -> Self
    {
        Self { heap: BinaryHeap::new(), capacity }
    }

    ///
    /// Like `new`, but preallocates for at most `expected` entries. Useful when
    /// `capacity` is a loose bound such as `usize::MAX`.
    ///
    pub fn with_expected(capacity: usize, expected: usize) -> Self
    {
        Self { heap: BinaryHeap::with_capacity(capacity.min(expected)), capacity }
    }

    #[inline]
    pub fn capacity(&self) -> usize
    {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.heap.is_empty()
    }

    ///
    /// Offers a candidate. Returns true if it was retained.
    ///
    pub fn push(&mut self, candidate: Candidate) -> bool
    {
        if self.heap.len() < self.capacity
        {
            self.heap.push(Reverse(candidate));
            return true;
        }
        match self.heap.peek_mut()
        {
            Some(mut worst) if candidate > worst.0 =>
            {
                *worst = Reverse(candidate);
                true
            }
            _ => false,
        }
    }

    ///
    /// Smallest retained candidate.
    ///
    pub fn worst(&self) -> Option<&Candidate>
    {
        self.heap.peek().map(|c| &c.0)
    }

    ///
    /// Retained candidates, best first.
    ///
    pub fn sorted(&self) -> Vec<Candidate>
    {
        let mut list: Vec<Candidate> = self.heap.iter().map(|c| c.0).collect();
        list.sort_unstable_by(|a, b| b.cmp(a));
        list
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate>
    {
        self.heap.iter().map(|c| &c.0)
    }
}
