//! Iteration over strided views, first axis fastest.
use super::{SharedBuffer, StridedView};
use std::iter::FusedIterator;
use std::rc::Rc;

/// Multi-axis counter tracking both the logical index and the position in
/// the backing buffer.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<const R: usize> {
    dims: [usize; R],
    strides: [usize; R],
    index: [usize; R],
    data_index: usize,
    end: bool,
}

impl<const R: usize> Cursor<R> {
    pub(crate) fn begin(dims: [usize; R], strides: [usize; R], offset: usize) -> Self {
        Cursor {
            dims,
            strides,
            index: [0; R],
            data_index: offset,
            end: dims.iter().any(|&d| d == 0),
        }
    }

    pub(crate) fn end(dims: [usize; R], strides: [usize; R], offset: usize) -> Self {
        let data_index = offset
            + dims
                .iter()
                .zip(strides.iter())
                .map(|(d, s)| d * s)
                .sum::<usize>();
        Cursor {
            dims,
            strides,
            index: dims,
            data_index,
            end: true,
        }
    }

    fn advance(&mut self) {
        for axis in 0..R {
            self.index[axis] += 1;
            self.data_index += self.strides[axis];
            if self.index[axis] == self.dims[axis] {
                // carry into the next axis
                self.data_index -= self.strides[axis] * self.dims[axis];
                self.index[axis] = 0;
            } else {
                return;
            }
        }
        self.end = true;
    }

    fn remaining(&self) -> usize {
        if self.end {
            return 0;
        }
        let mut done = 0;
        let mut step = 1;
        for axis in 0..R {
            done += self.index[axis] * step;
            step *= self.dims[axis];
        }
        step - done
    }
}

impl<const R: usize> Iterator for Cursor<R> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.end {
            return None;
        }
        let current = self.data_index;
        self.advance();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

/// Iterator over the elements of a [`StridedView`], in logical order with
/// the first axis varying fastest. Elements are yielded by value.
///
/// Two iterators compare equal when they walk the same buffer and either
/// both point at the same element or both have reached their end.
///
/// [`StridedView`]: ./struct.StridedView.html
#[derive(Debug)]
pub struct Iter<T, const R: usize> {
    data: SharedBuffer<T>,
    cursor: Cursor<R>,
}

impl<T, const R: usize> Iter<T, R> {
    pub(crate) fn new(view: &StridedView<T, R>) -> Self {
        Iter {
            data: Rc::clone(&view.data),
            cursor: Cursor::begin(view.dims, view.strides, view.offset),
        }
    }

    pub(crate) fn new_end(view: &StridedView<T, R>) -> Self {
        Iter {
            data: Rc::clone(&view.data),
            cursor: Cursor::end(view.dims, view.strides, view.offset),
        }
    }

    /// Whether this iterator has gone past the last element.
    pub fn is_end(&self) -> bool {
        self.cursor.end
    }

    /// The logical index of the element to be yielded next.
    pub fn index(&self) -> [usize; R] {
        self.cursor.index
    }
}

impl<T, const R: usize> Clone for Iter<T, R> {
    fn clone(&self) -> Self {
        Iter {
            data: Rc::clone(&self.data),
            cursor: self.cursor.clone(),
        }
    }
}

impl<T: Clone, const R: usize> Iterator for Iter<T, R> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.cursor.end {
            return None;
        }
        let value = self.data.borrow().get(self.cursor.data_index).cloned();
        match value {
            Some(v) => {
                self.cursor.advance();
                Some(v)
            }
            None => {
                // the shared buffer was shrunk behind this view
                self.cursor.end = true;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

impl<T: Clone, const R: usize> ExactSizeIterator for Iter<T, R> {}

impl<T: Clone, const R: usize> FusedIterator for Iter<T, R> {}

impl<T, const R: usize> PartialEq for Iter<T, R> {
    fn eq(&self, other: &Self) -> bool {
        if !Rc::ptr_eq(&self.data, &other.data) || self.cursor.end != other.cursor.end {
            return false;
        }
        self.cursor.end || self.cursor.data_index == other.cursor.data_index
    }
}
