//! Building blocks for MR image reconstruction pipelines: strided
//! N-dimensional arrays, and reading and writing of NIfTI-1 and NIfTI-2
//! volumes one region at a time.
//!
//! The main entry points are [`StridedView`], a view over a shared flat
//! buffer with slicing and reshaping, and [`NiftiFile`], which holds a
//! [`NiftiHeader`] with its extensions and moves voxel data between files
//! and memory. Raw FID data and reconstructed FDF images from Agilent
//! systems are read through the [`agilent`] module.
//!
//! # Example
//!
//! ```no_run
//! use nrecon::{Mode, NiftiFile, NiftiHeader, NiftiType};
//! # use nrecon::Result;
//! # fn run() -> Result<()> {
//! let header = NiftiHeader::new(&[4, 4, 2], &[1., 1., 2.], NiftiType::Float32)?;
//! let mut out = NiftiFile::create("out.nii.gz", header)?;
//! out.write_all((0..32).map(|v| v as f32))?;
//! out.close()?;
//!
//! let mut input = NiftiFile::new();
//! input.open("out.nii.gz", Mode::Read)?;
//! let voxels: Vec<f32> = input.read_all()?;
//! assert_eq!(voxels[31], 31.);
//! # Ok(())
//! # }
//! ```
//!
//! [`StridedView`]: ./array/struct.StridedView.html
//! [`NiftiFile`]: ./volume/struct.NiftiFile.html
//! [`NiftiHeader`]: ./header/struct.NiftiHeader.html
//! [`agilent`]: ./agilent/index.html
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate num_derive;

pub mod affine;
pub mod agilent;
pub mod array;
pub mod error;
pub mod extension;
pub mod header;
pub mod typedef;
pub mod volume;
pub mod zipfile;
mod util;

pub use crate::array::{StridedView, ALL};
pub use crate::error::{NiftiError, Result};
pub use crate::extension::Extension;
pub use crate::header::{NiftiHeader, NiftiVersion};
pub use crate::typedef::{Intent, NiftiType, SliceOrder, Unit, XForm};
pub use crate::util::Endianness;
pub use crate::volume::{DataElement, Mode, NiftiFile};
pub use crate::zipfile::TransparentFile;
