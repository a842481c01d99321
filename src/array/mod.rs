//! Strided N-dimensional views over shared buffers.
//!
//! A [`StridedView`] addresses a flat, reference-counted buffer through a
//! shape, a stride per axis and an offset. Views are cheap to create from
//! one another: [`slice`] and [`reshape`] produce new views over the same
//! buffer, and only [`pack`] ever copies data, when the view is not
//! contiguous.
//!
//! The logical order of elements has the first axis varying fastest, which
//! is also the order in which NIfTI voxels are persisted.
//!
//! # Example
//!
//! ```
//! use nrecon::array::{StridedView, ALL};
//! # use nrecon::Result;
//! # fn run() -> Result<()> {
//! let volume = StridedView::from_vec([2, 3, 4], (0..24).collect::<Vec<i32>>())?;
//! // the third plane along the last axis
//! let plane = volume.slice::<2>([0, 0, 2], [ALL, ALL, 0])?;
//! assert_eq!(plane.dims(), &[2, 3]);
//! assert_eq!(plane.get([1, 2])?, 17);
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```
//!
//! [`StridedView`]: ./struct.StridedView.html
//! [`slice`]: ./struct.StridedView.html#method.slice
//! [`reshape`]: ./struct.StridedView.html#method.reshape
//! [`pack`]: ./struct.StridedView.html#method.pack

use crate::error::{NiftiError, Result};
use crate::util::calc_strides;
use std::cell::RefCell;
use std::rc::Rc;

mod iter;

pub use self::iter::Iter;
pub(crate) use self::iter::Cursor;

/// Size sentinel for taking the whole remaining extent of an axis.
pub const ALL: usize = usize::MAX;

/// Shared handle to the flat backing buffer of one or more views.
pub type SharedBuffer<T> = Rc<RefCell<Vec<T>>>;

/// An N-dimensional view over a shared flat buffer.
///
/// Views are not `Send`: the buffer is shared through `Rc<RefCell<_>>`.
/// Writes through one view are observed by every other view of the same
/// buffer.
#[derive(Debug)]
pub struct StridedView<T, const R: usize> {
    data: SharedBuffer<T>,
    dims: [usize; R],
    strides: [usize; R],
    offset: usize,
    packed: bool,
}

impl<T, const R: usize> Clone for StridedView<T, R> {
    fn clone(&self) -> Self {
        StridedView {
            data: Rc::clone(&self.data),
            dims: self.dims,
            strides: self.strides,
            offset: self.offset,
            packed: self.packed,
        }
    }
}

impl<T, const R: usize> StridedView<T, R> {
    /// Allocate a new packed view of the given shape, filled with the
    /// default value of `T`.
    pub fn new(dims: [usize; R]) -> Self
    where
        T: Clone + Default,
    {
        let len = dims.iter().product();
        StridedView {
            data: Rc::new(RefCell::new(vec![T::default(); len])),
            dims,
            strides: calc_strides(&dims),
            offset: 0,
            packed: true,
        }
    }

    /// Wrap a vector holding exactly `product(dims)` elements in logical
    /// order.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` if the vector length does not match the shape.
    pub fn from_vec(dims: [usize; R], data: Vec<T>) -> Result<Self> {
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(NiftiError::SizeMismatch {
                expected,
                got: data.len(),
            });
        }
        Self::from_shared(dims, Rc::new(RefCell::new(data)), [0; R], 0)
    }

    /// Create a view over an existing buffer. All-zero `strides` stand for
    /// the canonical strides of `dims`.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if the view would reach past the end of the buffer.
    pub fn from_shared(
        dims: [usize; R],
        data: SharedBuffer<T>,
        strides: [usize; R],
        offset: usize,
    ) -> Result<Self> {
        let canonical = calc_strides(&dims);
        let strides = if strides.iter().all(|&s| s == 0) {
            canonical
        } else {
            strides
        };
        let view = StridedView {
            data,
            dims,
            strides,
            offset,
            packed: strides == canonical,
        };
        view.check_reach()?;
        Ok(view)
    }

    fn check_reach(&self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let last = self.offset
            + self
                .dims
                .iter()
                .zip(self.strides.iter())
                .map(|(d, s)| (d - 1) * s)
                .sum::<usize>();
        let len = self.data.borrow().len();
        if last >= len {
            Err(NiftiError::OutOfBounds {
                index: vec![last],
                dims: vec![len],
            })
        } else {
            Ok(())
        }
    }

    /// The extent of each axis.
    pub fn dims(&self) -> &[usize; R] {
        &self.dims
    }

    /// The step in the buffer of each axis.
    pub fn strides(&self) -> &[usize; R] {
        &self.strides
    }

    /// Position of the first element in the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the strides are the canonical strides of the shape.
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// The number of axes.
    pub fn rank(&self) -> usize {
        R
    }

    /// Total number of elements in the view.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// Whether the view has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Obtain a new handle to the backing buffer.
    pub fn buffer(&self) -> SharedBuffer<T> {
        Rc::clone(&self.data)
    }

    /// Whether both views address the same backing buffer.
    pub fn shares_buffer<const N: usize>(&self, other: &StridedView<T, N>) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    fn data_index(&self, index: &[usize; R]) -> Result<usize> {
        if index.iter().zip(self.dims.iter()).any(|(i, d)| i >= d) {
            return Err(NiftiError::OutOfBounds {
                index: index.to_vec(),
                dims: self.dims.to_vec(),
            });
        }
        Ok(self.offset
            + index
                .iter()
                .zip(self.strides.iter())
                .map(|(i, s)| i * s)
                .sum::<usize>())
    }

    fn unravel(&self, flat: usize) -> Result<[usize; R]> {
        let len = self.len();
        if flat >= len {
            return Err(NiftiError::OutOfBounds {
                index: vec![flat],
                dims: vec![len],
            });
        }
        let mut index = [0; R];
        let mut rest = flat;
        for (i, d) in index.iter_mut().zip(self.dims.iter()) {
            *i = rest % d;
            rest /= d;
        }
        Ok(index)
    }

    fn buffer_error(&self, position: usize) -> NiftiError {
        NiftiError::OutOfBounds {
            index: vec![position],
            dims: vec![self.data.borrow().len()],
        }
    }

    /// Fetch the element at the given index.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if any axis index is not below its dimension.
    pub fn get(&self, index: [usize; R]) -> Result<T>
    where
        T: Clone,
    {
        let pos = self.data_index(&index)?;
        let value = self.data.borrow().get(pos).cloned();
        value.ok_or_else(|| self.buffer_error(pos))
    }

    /// Replace the element at the given index.
    pub fn set(&self, index: [usize; R], value: T) -> Result<()> {
        let pos = self.data_index(&index)?;
        let mut data = self.data.borrow_mut();
        match data.get_mut(pos) {
            Some(v) => {
                *v = value;
                Ok(())
            }
            None => {
                let len = data.len();
                Err(NiftiError::OutOfBounds {
                    index: vec![pos],
                    dims: vec![len],
                })
            }
        }
    }

    /// Fetch the element at the given position in logical order.
    pub fn get_flat(&self, i: usize) -> Result<T>
    where
        T: Clone,
    {
        let index = self.unravel(i)?;
        self.get(index)
    }

    /// Replace the element at the given position in logical order.
    pub fn set_flat(&self, i: usize, value: T) -> Result<()> {
        let index = self.unravel(i)?;
        self.set(index, value)
    }

    /// Take a unit-stride slice. See [`slice_strided`].
    ///
    /// [`slice_strided`]: #method.slice_strided
    pub fn slice<const N: usize>(
        &self,
        start: [usize; R],
        size: [usize; R],
    ) -> Result<StridedView<T, N>> {
        self.slice_strided(start, size, [1; R])
    }

    /// Take a view of a sub-region, over the same buffer.
    ///
    /// `size[axis] == ALL` takes every remaining element of that axis from
    /// `start[axis]`, in steps of `strides[axis]`. Axes of size 0 are
    /// dropped, and their `start` fixes the position along them; exactly
    /// `R - N` axes must be dropped.
    ///
    /// # Errors
    ///
    /// - `OutOfBounds` if the region reaches past any dimension, or a
    /// stride is 0.
    /// - `SliceRank` if the number of dropped axes is not `R - N`.
    pub fn slice_strided<const N: usize>(
        &self,
        start: [usize; R],
        size: [usize; R],
        strides: [usize; R],
    ) -> Result<StridedView<T, N>> {
        let mut size = size;
        let mut last = start;
        for axis in 0..R {
            let (dim, step) = (self.dims[axis], strides[axis]);
            if step == 0 || start[axis] >= dim {
                return Err(NiftiError::OutOfBounds {
                    index: start.to_vec(),
                    dims: self.dims.to_vec(),
                });
            }
            if size[axis] == ALL {
                size[axis] = (dim - start[axis] + step - 1) / step;
            }
            if size[axis] > 0 {
                last[axis] = start[axis] + (size[axis] - 1) * step;
            }
        }
        if last.iter().zip(self.dims.iter()).any(|(l, d)| l >= d) {
            return Err(NiftiError::OutOfBounds {
                index: last.to_vec(),
                dims: self.dims.to_vec(),
            });
        }

        let dropped = size.iter().filter(|&&s| s == 0).count();
        if R - dropped != N {
            return Err(NiftiError::SliceRank {
                dropped,
                rank: R,
                new_rank: N,
            });
        }

        let mut new_dims = [0; N];
        let mut new_strides = [0; N];
        let kept = (0..R).filter(|&axis| size[axis] > 0);
        for (to, from) in kept.enumerate() {
            new_dims[to] = size[from];
            new_strides[to] = self.strides[from] * strides[from];
        }
        let offset = self.offset
            + start
                .iter()
                .zip(self.strides.iter())
                .map(|(i, s)| i * s)
                .sum::<usize>();
        StridedView::from_shared(new_dims, Rc::clone(&self.data), new_strides, offset)
    }

    /// Reinterpret a packed view with a new shape holding the same number of
    /// elements. The result shares the buffer.
    ///
    /// # Errors
    ///
    /// - `NotPacked` if the view is not packed.
    /// - `SizeMismatch` if the element counts differ.
    pub fn reshape<const N: usize>(&self, dims: [usize; N]) -> Result<StridedView<T, N>> {
        if !self.packed {
            return Err(NiftiError::NotPacked);
        }
        let count: usize = dims.iter().product();
        if count != self.len() {
            return Err(NiftiError::SizeMismatch {
                expected: self.len(),
                got: count,
            });
        }
        Ok(StridedView {
            data: Rc::clone(&self.data),
            dims,
            strides: calc_strides(&dims),
            offset: self.offset,
            packed: true,
        })
    }

    /// Obtain a packed view of the same elements. A packed view is returned
    /// as is; otherwise, the elements are copied in logical order into a new
    /// buffer.
    pub fn pack(&self) -> StridedView<T, R>
    where
        T: Clone,
    {
        if self.packed {
            return self.clone();
        }
        StridedView {
            data: Rc::new(RefCell::new(self.to_vec())),
            dims: self.dims,
            strides: calc_strides(&self.dims),
            offset: 0,
            packed: true,
        }
    }

    /// Iterate over the elements in logical order, first axis fastest.
    pub fn iter(&self) -> Iter<T, R>
    where
        T: Clone,
    {
        Iter::new(self)
    }

    /// An iterator already in its end state, for cursor comparisons.
    pub fn iter_end(&self) -> Iter<T, R> {
        Iter::new_end(self)
    }

    /// Copy the elements into a vector, in logical order.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().collect()
    }

    /// Overwrite every element of the view, in logical order.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` if `values` does not yield exactly `len()` elements,
    /// in which case nothing is written.
    pub fn assign<I>(&self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        let values: Vec<T> = values.into_iter().collect();
        if values.len() != self.len() {
            return Err(NiftiError::SizeMismatch {
                expected: self.len(),
                got: values.len(),
            });
        }
        let mut data = self.data.borrow_mut();
        let len = data.len();
        for (pos, v) in Cursor::begin(self.dims, self.strides, self.offset).zip(values) {
            match data.get_mut(pos) {
                Some(slot) => *slot = v,
                None => {
                    return Err(NiftiError::OutOfBounds {
                        index: vec![pos],
                        dims: vec![len],
                    })
                }
            }
        }
        Ok(())
    }

    /// Convert the view into an `ndarray` array of the same shape, in
    /// column-major (first axis fastest) memory order.
    #[cfg(feature = "ndarray_volumes")]
    pub fn to_ndarray(&self) -> Result<ndarray::ArrayD<T>>
    where
        T: Clone,
    {
        use ndarray::{ArrayD, IxDyn, ShapeBuilder};
        let data = self.to_vec();
        let got = data.len();
        ArrayD::from_shape_vec(IxDyn(&self.dims).f(), data).map_err(|_| NiftiError::SizeMismatch {
            expected: self.len(),
            got,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture() -> StridedView<i32, 3> {
        StridedView::from_vec([2, 3, 4], (0..24).collect()).unwrap()
    }

    #[test]
    fn fresh_view_is_packed() {
        let v: StridedView<f32, 3> = StridedView::new([2, 3, 4]);
        assert!(v.is_packed());
        assert_eq!(v.strides(), &[1, 2, 6]);
        assert_eq!(v.len(), 24);
        assert_eq!(v.get([1, 2, 3]).unwrap(), 0.);
    }

    #[test]
    fn index_bounds() {
        let v = fixture();
        assert_eq!(v.get([1, 1, 1]).unwrap(), 1 + 2 + 6);
        assert_eq!(v.get_flat(23).unwrap(), 23);
        assert!(matches!(v.get([2, 0, 0]), Err(NiftiError::OutOfBounds { .. })));
        assert!(matches!(v.get_flat(24), Err(NiftiError::OutOfBounds { .. })));
    }

    #[test]
    fn flat_index_follows_strides() {
        let v = fixture();
        let s = v.slice_strided::<3>([0, 0, 1], [2, 2, 2], [1, 2, 2]).unwrap();
        assert!(!s.is_packed());
        // logical position 2 is index [0, 1, 0]
        assert_eq!(s.get_flat(2).unwrap(), 6 + 4);
    }

    #[test]
    fn shared_writes() {
        let v = fixture();
        let s = v.slice::<2>([0, 0, 3], [ALL, ALL, 0]).unwrap();
        s.set([0, 0], -1).unwrap();
        assert_eq!(v.get([0, 0, 3]).unwrap(), -1);
        assert!(v.shares_buffer(&s));
    }

    #[test]
    fn wrapped_buffer_reach() {
        let buf = Rc::new(RefCell::new(vec![0u8; 10]));
        assert!(StridedView::from_shared([5, 2], Rc::clone(&buf), [0, 0], 0).is_ok());
        assert!(StridedView::from_shared([5, 2], Rc::clone(&buf), [0, 0], 1).is_err());
        let v = StridedView::from_shared([2, 2], buf, [2, 5], 0).unwrap();
        assert!(!v.is_packed());
    }

    #[test]
    fn empty_view_iterates_nothing() {
        let v: StridedView<u8, 2> = StridedView::new([3, 0]);
        let it = v.iter();
        assert!(it.is_end());
        assert_eq!(it.count(), 0);
    }

    #[test]
    fn iterator_reaches_end() {
        let v = fixture();
        let mut it = v.iter();
        assert_eq!(it.len(), 24);
        assert!(it != v.iter_end());
        for _ in 0..24 {
            assert!(it.next().is_some());
        }
        assert!(it.is_end());
        assert!(it == v.iter_end());
        assert_eq!(it.next(), None);
    }

    #[test]
    fn iterators_on_other_buffers_differ() {
        let a = fixture();
        let b = fixture();
        assert!(a.iter() == a.iter());
        assert!(a.iter() != b.iter());
        assert!(a.iter_end() != b.iter_end());
    }

    #[test]
    fn assign_is_all_or_nothing() {
        let v = fixture();
        let s = v.slice::<1>([0, 1, 1], [ALL, 0, 0]).unwrap();
        assert!(s.assign(vec![100]).is_err());
        assert_eq!(v.get([0, 1, 1]).unwrap(), 8);
        s.assign(vec![100, 101]).unwrap();
        assert_eq!(v.get([0, 1, 1]).unwrap(), 100);
        assert_eq!(v.get([1, 1, 1]).unwrap(), 101);
    }

    #[cfg(feature = "ndarray_volumes")]
    #[test]
    fn into_ndarray() {
        let v = fixture();
        let a = v.to_ndarray().unwrap();
        assert_eq!(a.shape(), &[2, 3, 4]);
        assert_eq!(a[[1, 2, 3]], 23);
        assert_eq!(a[[1, 0, 2]], 13);
    }
}
