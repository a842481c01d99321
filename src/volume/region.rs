//! Planning of rectangular region transfers.
//!
//! A region of a 7-dimensional volume is transferred as a sequence of
//! contiguous blocks. Leading axes transferred in full are merged with the
//! next axis, so that each block is as large as possible. The remaining
//! outer axes are walked by an odometer, first outer axis fastest, which
//! keeps the blocks in the logical order of the region.

use crate::array::ALL;
use crate::error::{NiftiError, Result};
use crate::header::MAX_RANK;
use crate::util::calc_strides;

/// A validated region transfer against a volume shape.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RegionPlan {
    dims: [usize; MAX_RANK],
    strides: [usize; MAX_RANK],
    start: [usize; MAX_RANK],
    size: [usize; MAX_RANK],
    first_dim: usize,
    block_size: usize,
}

impl RegionPlan {
    /// Validate a request of `start` and `size` over `dims`. Missing trailing
    /// axes start at 0 with size 1, and `ALL` takes the full axis.
    ///
    /// # Errors
    ///
    /// - `InvalidRank` if more than 7 axes are given.
    /// - `ZeroSize` if any requested size is 0.
    /// - `OutOfBounds` if the region reaches past the volume.
    pub fn new(dims: [usize; MAX_RANK], start: &[usize], size: &[usize]) -> Result<Self> {
        if start.len() > MAX_RANK || size.len() > MAX_RANK {
            return Err(NiftiError::InvalidRank(start.len().max(size.len()) as i64));
        }
        if let Some(axis) = size.iter().position(|&s| s == 0) {
            return Err(NiftiError::ZeroSize(axis));
        }
        let mut full_start = [0; MAX_RANK];
        let mut full_size = [1; MAX_RANK];
        full_start[..start.len()].copy_from_slice(start);
        full_size[..size.len()].copy_from_slice(size);
        for (s, d) in full_size.iter_mut().zip(dims.iter()) {
            if *s == ALL {
                *s = *d;
            }
        }
        let outside = full_start
            .iter()
            .zip(full_size.iter())
            .zip(dims.iter())
            .any(|((st, sz), d)| st.checked_add(*sz).map_or(true, |end| end > *d));
        if outside {
            return Err(NiftiError::OutOfBounds {
                index: full_start
                    .iter()
                    .zip(full_size.iter())
                    .map(|(a, b)| a.saturating_add(*b))
                    .collect(),
                dims: dims.to_vec(),
            });
        }

        let mut first_dim = 0;
        let mut block_size = full_size[0];
        while full_size[first_dim] == dims[first_dim] && first_dim < MAX_RANK - 1 {
            first_dim += 1;
            block_size *= full_size[first_dim];
        }

        Ok(RegionPlan {
            dims,
            strides: calc_strides(&dims),
            start: full_start,
            size: full_size,
            first_dim,
            block_size,
        })
    }

    /// Number of voxels in the region.
    pub fn len(&self) -> usize {
        self.size.iter().product()
    }

    /// Number of voxels moved per contiguous block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks.
    pub fn block_count(&self) -> usize {
        self.len() / self.block_size
    }

    /// The linear voxel index of the first voxel of each block, in order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            plan: self,
            index: self.start,
            done: false,
        }
    }

    fn linear_index(&self, index: &[usize; MAX_RANK]) -> usize {
        index
            .iter()
            .zip(self.strides.iter())
            .map(|(i, s)| i * s)
            .sum()
    }
}

/// Odometer over the outer axes of a region plan.
#[derive(Debug)]
pub(crate) struct Blocks<'a> {
    plan: &'a RegionPlan,
    index: [usize; MAX_RANK],
    done: bool,
}

impl Iterator for Blocks<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        let current = self.plan.linear_index(&self.index);
        let p = self.plan;
        self.done = true;
        for axis in p.first_dim + 1..MAX_RANK {
            self.index[axis] += 1;
            if self.index[axis] < p.start[axis] + p.size[axis] {
                self.done = false;
                break;
            }
            self.index[axis] = p.start[axis];
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DIMS: [usize; 7] = [4, 3, 2, 2, 1, 1, 1];

    #[test]
    fn whole_volume_is_one_block() {
        let plan = RegionPlan::new(DIMS, &[], &DIMS).unwrap();
        assert_eq!(plan.block_size(), 48);
        assert_eq!(plan.blocks().collect::<Vec<_>>(), vec![0]);
        let plan = RegionPlan::new(DIMS, &[0, 0, 0, 0], &[ALL, ALL, ALL, ALL]).unwrap();
        assert_eq!(plan.block_count(), 1);
    }

    #[test]
    fn collapses_leading_axes() {
        // one full slice per volume
        let plan = RegionPlan::new(DIMS, &[0, 0, 1, 0], &[4, 3, 1, 2]).unwrap();
        assert_eq!(plan.block_size(), 12);
        assert_eq!(plan.blocks().collect::<Vec<_>>(), vec![12, 36]);
    }

    #[test]
    fn partial_rows() {
        let plan = RegionPlan::new(DIMS, &[1, 1], &[2, 2]).unwrap();
        assert_eq!(plan.block_size(), 2);
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.blocks().collect::<Vec<_>>(), vec![5, 9]);
    }

    #[test]
    fn rejects_bad_requests() {
        assert!(matches!(
            RegionPlan::new(DIMS, &[0], &[0]),
            Err(NiftiError::ZeroSize(0))
        ));
        assert!(matches!(
            RegionPlan::new(DIMS, &[3], &[2]),
            Err(NiftiError::OutOfBounds { .. })
        ));
        assert!(matches!(
            RegionPlan::new(DIMS, &[0, 0, 0, 0, 1], &[]),
            Err(NiftiError::OutOfBounds { .. })
        ));
        assert!(RegionPlan::new(DIMS, &[0; 8], &[]).is_err());
    }
}
