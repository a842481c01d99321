use nrecon::{NiftiHeader, NiftiType};
use std::path::{Path, PathBuf};

/// A header with unit voxel sizes for the given shape and type.
#[allow(dead_code)]
pub fn header_with(dims: &[usize], datatype: NiftiType) -> NiftiHeader {
    NiftiHeader::new(dims, &vec![1.; dims.len()], datatype).unwrap()
}

/// A path for `name` inside the temporary directory.
#[allow(dead_code)]
pub fn tmp_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

/// The values 0, 1, 2, ... as `f32`.
#[allow(dead_code)]
pub fn ramp(len: usize) -> Vec<f32> {
    (0..len).map(|v| v as f32).collect()
}
