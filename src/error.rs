//! Types for error handling go here.
//!
//! Every fallible operation in this crate returns [`Result`], whose error
//! type distinguishes malformed input, out-of-range requests, state misuse
//! and I/O failures, so that batch tools may report the culprit and move on.
//!
//! [`Result`]: ./type.Result.html

use crate::typedef::NiftiType;
use std::io::Error as IOError;
use std::path::{Path, PathBuf};

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    #[non_exhaustive]
    pub enum NiftiError {
        /// The data is not a valid NIfTI file or vendor file.
        InvalidFormat(reason: String) {
            display("Invalid file format: {}", reason)
        }
        /// An unrecognized code was found for a header field.
        InvalidCode(typename: &'static str, code: i64) {
            display("Invalid code `{}` for {}", code, typename)
        }
        /// The header declares a rank outside `[1, 7]`.
        InvalidRank(rank: i64) {
            display("Invalid rank {}: must be between 1 and 7", rank)
        }
        /// The file name does not carry a recognized extension.
        InvalidFileExtension(path: PathBuf) {
            display("Invalid extension for file: {}", path.display())
        }
        /// Attempted to address outside the boundaries of an array or volume.
        OutOfBounds { index: Vec<usize>, dims: Vec<usize> } {
            display("Index {:?} is outside of dimensions {:?}", index, dims)
        }
        /// A slice dropped a number of axes inconsistent with its target rank.
        SliceRank { dropped: usize, rank: usize, new_rank: usize } {
            display("Slice of rank {} from rank {} must drop {} axes, but {} were dropped",
                    new_rank, rank, rank.saturating_sub(*new_rank), dropped)
        }
        /// A sequence of elements does not match the expected element count.
        SizeMismatch { expected: usize, got: usize } {
            display("Expected {} elements, got {}", expected, got)
        }
        /// A region request has a zero-length axis.
        ZeroSize(axis: usize) {
            display("Requested size along axis {} is zero", axis)
        }
        /// A dimension does not fit in the target header layout.
        DimensionOverflow { axis: usize, dim: usize, max: i64 } {
            display("Dimension {} along axis {} is greater than the maximum of {}", dim, axis, max)
        }
        /// Reshaping requires a packed array.
        NotPacked {
            display("Arrays must be packed before reshaping")
        }
        /// The operation is not allowed in the current state of the object.
        State(reason: &'static str) {
            display("Invalid state: {}", reason)
        }
        /// The data type is not supported for this operation.
        UnsupportedDataType(t: NiftiType) {
            display("Unsupported data type {:?}", t)
        }
        /// A parameter table could not be parsed.
        Procpar(line: usize, reason: String) {
            display("Parameter table error at line {}: {}", line, reason)
        }
        /// An FDF header could not be parsed.
        Fdf(line: usize, reason: String) {
            display("FDF header error at line {}: {}", line, reason)
        }
        /// A named parameter is not present.
        MissingParameter(name: String) {
            display("Could not find parameter {}", name)
        }
        /// A parameter was accessed as the wrong kind of value.
        ParameterType(name: String, expected: &'static str) {
            display("Parameter {} does not hold {} values", name, expected)
        }
        /// A parameter value index is out of range.
        ParameterIndex { name: String, index: usize, len: usize } {
            display("Parameter {} has {} values, tried to access value {}", name, len, index)
        }
        /// I/O error on a file.
        Io(path: PathBuf, err: IOError) {
            context(path: &'a Path, err: IOError) -> (path.to_path_buf(), err)
            display("I/O error on {}: {}", path.display(), err)
            source(err)
        }
        /// I/O error on a stream with no known path.
        RawIo(err: IOError) {
            from()
            display("I/O error: {}", err)
            source(err)
        }
    }
}

/// Type alias for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, NiftiError>;
