//! Readers for Agilent (Varian) scanner output: `procpar` parameter tables,
//! raw FID data and reconstructed FDF images.

pub mod fdf;
pub mod fid;
pub mod procpar;

pub use self::fdf::{FdfField, FdfFile, FdfImage, FdfKind, FdfValue};
pub use self::fid::{AppType, FidBundle, FidFile, FidType};
pub use self::procpar::{Parameter, ParameterKind, ProcPar};
