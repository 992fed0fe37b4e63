//! Chunk planning for transactional writes.
//!
//! A chunk is the unit of one database transaction. It holds at most
//! `max_sets` sets and is closed early once its child rows would exceed
//! `max_rows`, so a few very large sets cannot blow a transaction's time
//! budget. A chunk always holds at least one set, even an oversized one.

use crate::import::data_structures::PreparedSet;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimits {
    pub max_sets: usize,
    pub max_rows: usize,
}

impl ChunkLimits {
    pub fn new(max_sets: usize, max_rows: usize) -> Self {
        Self {
            max_sets: max_sets.max(1),
            max_rows: max_rows.max(1),
        }
    }
}

/// Split items with the given row counts into contiguous chunk ranges.
pub fn plan_chunk_bounds(row_counts: &[usize], limits: ChunkLimits) -> Vec<Range<usize>> {
    let max_sets = limits.max_sets.max(1);
    let mut bounds = Vec::new();
    let mut start = 0;
    let mut rows = 0;

    for (index, &count) in row_counts.iter().enumerate() {
        let len = index - start;
        let full = len >= max_sets || (len > 0 && rows + count > limits.max_rows);
        if full {
            bounds.push(start..index);
            start = index;
            rows = 0;
        }
        rows += count;
    }

    if start < row_counts.len() {
        bounds.push(start..row_counts.len());
    }

    bounds
}

/// Group prepared sets into chunks, preserving submission order.
pub fn plan_chunks(sets: Vec<PreparedSet>, limits: ChunkLimits) -> Vec<Vec<PreparedSet>> {
    let row_counts: Vec<usize> = sets.iter().map(PreparedSet::row_count).collect();
    let bounds = plan_chunk_bounds(&row_counts, limits);

    let mut chunks = Vec::with_capacity(bounds.len());
    let mut remaining = sets.into_iter();
    for range in bounds {
        chunks.push(remaining.by_ref().take(range.len()).collect());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_size_chunks_cover_every_set() {
        let limits = ChunkLimits::new(3, usize::MAX);
        for n in 0..=10 {
            let bounds = plan_chunk_bounds(&vec![5; n], limits);
            assert_eq!(bounds.len(), n.div_ceil(3), "n = {n}");
            let covered: usize = bounds.iter().map(|r| r.len()).sum();
            assert_eq!(covered, n);
        }
    }

    #[test]
    fn seven_sets_make_three_chunks() {
        let bounds = plan_chunk_bounds(&[1; 7], ChunkLimits::new(3, 1000));
        assert_eq!(bounds, vec![0..3, 3..6, 6..7]);
    }

    #[test]
    fn row_budget_closes_chunks_early() {
        let bounds = plan_chunk_bounds(&[40, 40, 40, 10, 10], ChunkLimits::new(3, 100));
        assert_eq!(bounds, vec![0..2, 2..5]);
    }

    #[test]
    fn oversized_set_gets_its_own_chunk() {
        let bounds = plan_chunk_bounds(&[10, 500, 10], ChunkLimits::new(3, 100));
        assert_eq!(bounds, vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn zero_limits_are_clamped() {
        let limits = ChunkLimits::new(0, 0);
        assert_eq!(limits.max_sets, 1);
        assert_eq!(plan_chunk_bounds(&[1, 1], limits), vec![0..1, 1..2]);
    }
}
