//! This module defines the `NiftiHeader` struct, which holds the geometry
//! and metadata of a NIfTI volume independently of the version of the
//! on-disk layout.
//!
//! The raw layouts are available as [`Nifti1Header`] and [`Nifti2Header`].
//! Conversion from a raw layout validates codes and ranks, conversion to a
//! raw layout checks that every dimension fits in the target field width.
//!
//! [`Nifti1Header`]: ./struct.Nifti1Header.html
//! [`Nifti2Header`]: ./struct.Nifti2Header.html

use crate::affine::{
    compose, extract_rotation, fill_positive, linear_and_translation, quaternion_to_rotation,
    rotation_to_quaternion, scale, Affine3, Affine4,
};
use crate::error::{NiftiError, Result};
use crate::typedef::{Intent, NiftiType, SliceOrder, Unit, XForm};
use crate::util::{calc_strides, Endianness};
use approx::relative_eq;
use nalgebra::Vector3;
use std::fmt;

mod nifti1;
mod nifti2;

pub use self::nifti1::Nifti1Header;
pub use self::nifti2::Nifti2Header;

/// Size of a NIfTI-1 header, which is also its `sizeof_hdr` value.
pub const NIFTI1_HEADER_SIZE: usize = 348;
/// Size of a NIfTI-2 header, which is also its `sizeof_hdr` value.
pub const NIFTI2_HEADER_SIZE: usize = 540;

/// Magic code for NIFTI-1 header files (extension ".hdr[.gz]").
pub const MAGIC_CODE_NI1: &[u8; 4] = b"ni1\0";
/// Magic code for full NIFTI-1 files (extension ".nii[.gz]").
pub const MAGIC_CODE_NIP1: &[u8; 4] = b"n+1\0";
/// Magic code for NIFTI-2 header files (extension ".hdr[.gz]").
pub const MAGIC_CODE_NI2: &[u8; 8] = b"ni2\0\r\n\x1a\n";
/// Magic code for full NIFTI-2 files (extension ".nii[.gz]").
pub const MAGIC_CODE_NIP2: &[u8; 8] = b"n+2\0\r\n\x1a\n";

/// Maximum number of data axes.
pub const MAX_RANK: usize = 7;

/// Version of the on-disk header layout.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum NiftiVersion {
    /// The 348 byte layout.
    Nifti1,
    /// The 540 byte layout.
    Nifti2,
}

impl NiftiVersion {
    /// The size of the header in bytes.
    pub fn header_size(self) -> usize {
        match self {
            NiftiVersion::Nifti1 => NIFTI1_HEADER_SIZE,
            NiftiVersion::Nifti2 => NIFTI2_HEADER_SIZE,
        }
    }

    /// Identify the version and byte order of a header from its first four
    /// bytes, which hold `sizeof_hdr`.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` if the value matches neither header size in either
    /// byte order.
    pub fn detect(sizeof_hdr: [u8; 4]) -> Result<(Self, Endianness)> {
        let native = Endianness::native();
        for &endianness in &[native, native.to_opposite()] {
            let size = match endianness {
                Endianness::Little => i32::from_le_bytes(sizeof_hdr),
                Endianness::Big => i32::from_be_bytes(sizeof_hdr),
            };
            if size == NIFTI1_HEADER_SIZE as i32 {
                return Ok((NiftiVersion::Nifti1, endianness));
            }
            if size == NIFTI2_HEADER_SIZE as i32 {
                return Ok((NiftiVersion::Nifti2, endianness));
            }
        }
        Err(NiftiError::InvalidFormat(format!(
            "could not determine header version from size field {:?}",
            sizeof_hdr
        )))
    }

    /// Check the first four bytes of the magic field against this version.
    /// Returns whether the header describes a single `.nii` file.
    pub fn check_magic(self, magic: &[u8]) -> Result<bool> {
        let digit = match self {
            NiftiVersion::Nifti1 => b'1',
            NiftiVersion::Nifti2 => b'2',
        };
        match magic {
            [b'n', b'+', d, 0, ..] if *d == digit => Ok(true),
            [b'n', b'i', d, 0, ..] if *d == digit => Ok(false),
            [0, 0, 0, 0, ..] => Err(NiftiError::InvalidFormat(
                "legacy ANALYZE 7.5 headers are not supported".to_string(),
            )),
            _ => Err(NiftiError::InvalidFormat(format!(
                "bad magic string {:?}",
                String::from_utf8_lossy(magic)
            ))),
        }
    }
}

/// Version independent view of the raw header fields, in the widest types.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fields {
    pub dim: [i64; 8],
    pub pixdim: [f64; 8],
    pub datatype: i16,
    pub bitpix: i16,
    pub intent_p: [f64; 3],
    pub intent_code: i32,
    pub vox_offset: i64,
    pub scl_slope: f64,
    pub scl_inter: f64,
    pub cal_max: f64,
    pub cal_min: f64,
    pub slice_duration: f64,
    pub toffset: f64,
    pub slice_start: i64,
    pub slice_end: i64,
    pub slice_code: i32,
    pub xyzt_units: i32,
    pub dim_info: u8,
    pub descrip: String,
    pub aux_file: String,
    pub intent_name: String,
    pub qform_code: i32,
    pub sform_code: i32,
    pub quatern: [f64; 3],
    pub qoffset: [f64; 3],
    pub srow: [[f64; 4]; 3],
    pub magic: [u8; 4],
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.
    }
}

/// Geometry and metadata of a NIfTI image.
///
/// The dimensions, voxel sizes and transforms are kept consistent through
/// accessor methods. The remaining metadata fields are public.
///
/// # Example
///
/// ```
/// use nrecon::{NiftiHeader, NiftiType, XForm};
/// # use nrecon::Result;
/// # fn run() -> Result<()> {
/// let hdr = NiftiHeader::new(&[64, 64, 30, 1], &[2., 2., 3., 1.], NiftiType::Float32)?;
/// assert_eq!(hdr.rank(), 3);
/// assert_eq!(hdr.dims(), &[64, 64, 30]);
/// assert_eq!(hdr.qcode(), XForm::ScannerAnat);
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    dims: [usize; MAX_RANK],
    voxdims: [f64; MAX_RANK],
    datatype: NiftiType,
    qform: Affine4,
    qcode: XForm,
    sform: Affine4,
    scode: XForm,
    magic: [u8; 4],
    vox_offset: usize,
    scl_slope: f64,
    scl_inter: f64,
    /// Max display intensity
    pub cal_max: f64,
    /// Min display intensity
    pub cal_min: f64,
    /// Frequency encoding axis, 1-based, 0 if unknown
    pub freq_dim: u8,
    /// Phase encoding axis, 1-based, 0 if unknown
    pub phase_dim: u8,
    /// Slice axis, 1-based, 0 if unknown
    pub slice_dim: u8,
    /// Slice timing order
    pub slice_code: SliceOrder,
    /// First slice index
    pub slice_start: i64,
    /// Last slice index
    pub slice_end: i64,
    /// Time for 1 slice
    pub slice_duration: f64,
    /// Time axis shift
    pub toffset: f64,
    /// Units of the spatial voxel sizes
    pub xyz_units: Unit,
    /// Units of the temporal voxel size
    pub time_units: Unit,
    /// Meaning of the voxel values
    pub intent: Intent,
    /// Intent parameters
    pub intent_p: [f64; 3],
    /// 'name' or meaning of data
    pub intent_name: String,
    /// Any text you like
    pub description: String,
    /// Auxiliary filename
    pub aux_file: String,
}

impl Default for NiftiHeader {
    fn default() -> Self {
        NiftiHeader {
            dims: [1; MAX_RANK],
            voxdims: [1.; MAX_RANK],
            datatype: NiftiType::Float32,
            qform: Affine4::identity(),
            qcode: XForm::Unknown,
            sform: Affine4::identity(),
            scode: XForm::Unknown,
            magic: *MAGIC_CODE_NIP1,
            vox_offset: 0,
            scl_slope: 1.,
            scl_inter: 0.,
            cal_max: 0.,
            cal_min: 0.,
            freq_dim: 0,
            phase_dim: 0,
            slice_dim: 0,
            slice_code: SliceOrder::Unknown,
            slice_start: 0,
            slice_end: 0,
            slice_duration: 0.,
            toffset: 0.,
            xyz_units: Unit::Mm,
            time_units: Unit::Sec,
            intent: Intent::None,
            intent_p: [0.; 3],
            intent_name: String::new(),
            description: String::new(),
            aux_file: String::new(),
        }
    }
}

impl NiftiHeader {
    /// Create a header for an image of the given dimensions and voxel sizes.
    /// Dimensions below 1 become 1, and missing voxel sizes are 1. Both
    /// transforms are set to the voxel scaling, in scanner coordinates.
    ///
    /// # Errors
    ///
    /// `InvalidRank` if more than 7 dimensions or voxel sizes are given.
    pub fn new(dims: &[usize], voxdims: &[f64], datatype: NiftiType) -> Result<Self> {
        if dims.len() > MAX_RANK || voxdims.len() > MAX_RANK {
            return Err(NiftiError::InvalidRank(dims.len().max(voxdims.len()) as i64));
        }
        let mut hdr = NiftiHeader {
            datatype,
            ..Default::default()
        };
        for (to, from) in hdr.dims.iter_mut().zip(dims) {
            *to = (*from).max(1);
        }
        hdr.voxdims[..voxdims.len()].copy_from_slice(voxdims);
        let s = scale([hdr.voxdims[0], hdr.voxdims[1], hdr.voxdims[2]]);
        hdr.set_transform(s, XForm::ScannerAnat);
        Ok(hdr)
    }

    /// Build a header out of a raw NIfTI-1 header.
    pub fn from_nifti1(raw: &Nifti1Header) -> Result<Self> {
        Self::from_fields(&raw.to_fields())
    }

    /// Build a header out of a raw NIfTI-2 header.
    pub fn from_nifti2(raw: &Nifti2Header) -> Result<Self> {
        Self::from_fields(&raw.to_fields())
    }

    /// Convert to a raw NIfTI-1 header.
    ///
    /// # Errors
    ///
    /// `DimensionOverflow` if a dimension does not fit in 16 bits.
    pub fn to_nifti1(&self) -> Result<Nifti1Header> {
        Nifti1Header::from_fields(&self.to_fields(NiftiVersion::Nifti1))
    }

    /// Convert to a raw NIfTI-2 header.
    pub fn to_nifti2(&self) -> Result<Nifti2Header> {
        Nifti2Header::from_fields(&self.to_fields(NiftiVersion::Nifti2))
    }

    fn from_fields(f: &Fields) -> Result<Self> {
        let datatype = NiftiType::from_code(f.datatype)?;
        let rank = f.dim[0];
        if !(1..=MAX_RANK as i64).contains(&rank) {
            return Err(NiftiError::InvalidRank(rank));
        }
        let rank = rank as usize;
        let mut dims = [1; MAX_RANK];
        let mut voxdims = [1.; MAX_RANK];
        for i in 0..rank {
            if f.dim[i + 1] < 0 {
                return Err(NiftiError::InvalidFormat(format!(
                    "negative dimension {} along axis {}",
                    f.dim[i + 1],
                    i
                )));
            }
            dims[i] = f.dim[i + 1] as usize;
            voxdims[i] = f.pixdim[i + 1];
        }

        let s = scale([voxdims[0], voxdims[1], voxdims[2]]);
        let (qform, qcode) = if f.qform_code <= 0 {
            (s, XForm::Unknown)
        } else {
            let bcd = Vector3::new(
                finite_or_zero(f.quatern[0]),
                finite_or_zero(f.quatern[1]),
                finite_or_zero(f.quatern[2]),
            );
            let rotation = quaternion_to_rotation(fill_positive(bcd));
            let zooms = Vector3::new(voxdims[0], voxdims[1], voxdims[2]);
            let mut linear = rotation * Affine3::from_diagonal(&zooms);
            // the handedness flag lives in pixdim[0]
            if f.pixdim[0] < 0. {
                linear.column_mut(2).neg_mut();
            }
            let translation = Vector3::new(
                finite_or_zero(f.qoffset[0]),
                finite_or_zero(f.qoffset[1]),
                finite_or_zero(f.qoffset[2]),
            );
            (compose(&linear, &translation), XForm::from_code(f.qform_code)?)
        };
        let (sform, scode) = if f.sform_code <= 0 {
            (s, XForm::Unknown)
        } else {
            let mut sform = Affine4::identity();
            for (r, row) in f.srow.iter().enumerate() {
                for (c, v) in row.iter().enumerate() {
                    sform[(r, c)] = *v;
                }
            }
            (sform, XForm::from_code(f.sform_code)?)
        };

        let mut scl_slope = finite_or_zero(f.scl_slope);
        if scl_slope == 0. {
            scl_slope = 1.;
        }

        let slice_code = SliceOrder::from_code(f.slice_code).unwrap_or_else(|e| {
            log::warn!("{}, treating as unknown", e);
            SliceOrder::Unknown
        });
        let xyz_units = Unit::space_from_xyzt(f.xyzt_units).unwrap_or_else(|e| {
            log::warn!("{}, treating as unknown", e);
            Unit::Unknown
        });
        let time_units = Unit::time_from_xyzt(f.xyzt_units).unwrap_or_else(|e| {
            log::warn!("{}, treating as unknown", e);
            Unit::Unknown
        });

        Ok(NiftiHeader {
            dims,
            voxdims,
            datatype,
            qform,
            qcode,
            sform,
            scode,
            magic: f.magic,
            vox_offset: f.vox_offset.max(0) as usize,
            scl_slope,
            scl_inter: finite_or_zero(f.scl_inter),
            cal_max: finite_or_zero(f.cal_max),
            cal_min: finite_or_zero(f.cal_min),
            freq_dim: f.dim_info & 0x03,
            phase_dim: (f.dim_info >> 2) & 0x03,
            slice_dim: (f.dim_info >> 4) & 0x03,
            slice_code,
            slice_start: f.slice_start,
            slice_end: f.slice_end,
            slice_duration: finite_or_zero(f.slice_duration),
            toffset: finite_or_zero(f.toffset),
            xyz_units,
            time_units,
            intent: Intent::from_code(f.intent_code)?,
            intent_p: [
                finite_or_zero(f.intent_p[0]),
                finite_or_zero(f.intent_p[1]),
                finite_or_zero(f.intent_p[2]),
            ],
            intent_name: f.intent_name.clone(),
            description: f.descrip.clone(),
            aux_file: f.aux_file.clone(),
        })
    }

    fn to_fields(&self, version: NiftiVersion) -> Fields {
        let mut dim = [1i64; 8];
        let mut pixdim = [1f64; 8];
        dim[0] = self.rank() as i64;
        for i in 0..MAX_RANK {
            dim[i + 1] = self.dims[i] as i64;
            pixdim[i + 1] = self.voxdims[i];
        }

        let (linear, translation) = linear_and_translation(&self.qform);
        let (rotation, qfac) = extract_rotation(&linear);
        pixdim[0] = qfac;
        let q = rotation_to_quaternion(&rotation);

        let mut srow = [[0.; 4]; 3];
        for (r, row) in srow.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = self.sform[(r, c)];
            }
        }

        let (cal_min, cal_max) = if self.cal_max > self.cal_min {
            (self.cal_min, self.cal_max)
        } else {
            (0., 0.)
        };

        let mut magic = self.magic;
        magic[2] = match version {
            NiftiVersion::Nifti1 => b'1',
            NiftiVersion::Nifti2 => b'2',
        };

        Fields {
            dim,
            pixdim,
            datatype: self.datatype.code(),
            bitpix: (8 * self.datatype.size_of()) as i16,
            intent_p: self.intent_p,
            intent_code: self.intent as i32,
            vox_offset: self.vox_offset as i64,
            scl_slope: self.scl_slope,
            scl_inter: self.scl_inter,
            cal_max,
            cal_min,
            slice_duration: self.slice_duration,
            toffset: self.toffset,
            slice_start: self.slice_start,
            slice_end: self.slice_end,
            slice_code: self.slice_code as i32,
            xyzt_units: self.xyz_units as i32 | self.time_units as i32,
            dim_info: (self.freq_dim & 0x03)
                | ((self.phase_dim & 0x03) << 2)
                | ((self.slice_dim & 0x03) << 4),
            descrip: self.description.clone(),
            aux_file: self.aux_file.clone(),
            intent_name: self.intent_name.clone(),
            qform_code: self.qcode as i32,
            sform_code: self.scode as i32,
            quatern: [q.i, q.j, q.k],
            qoffset: [translation.x, translation.y, translation.z],
            srow,
            magic,
        }
    }

    /// The voxel data type.
    pub fn datatype(&self) -> NiftiType {
        self.datatype
    }

    /// Change the voxel data type.
    pub fn set_datatype(&mut self, datatype: NiftiType) {
        self.datatype = datatype;
    }

    /// The highest 1-based axis whose size exceeds 1, or 1 if there is none.
    pub fn rank(&self) -> usize {
        self.dims.iter().rposition(|&d| d > 1).map_or(1, |i| i + 1)
    }

    /// The size of the given 0-based axis. Axes past the last are size 1.
    pub fn dim(&self, axis: usize) -> usize {
        self.dims.get(axis).copied().unwrap_or(1)
    }

    /// Change the size of the given 0-based axis.
    ///
    /// # Errors
    ///
    /// `InvalidRank` if the axis is not below 7.
    pub fn set_dim(&mut self, axis: usize, size: usize) -> Result<()> {
        match self.dims.get_mut(axis) {
            Some(d) => {
                *d = size;
                Ok(())
            }
            None => Err(NiftiError::InvalidRank(axis as i64 + 1)),
        }
    }

    /// The dimensions up to the rank.
    pub fn dims(&self) -> &[usize] {
        &self.dims[..self.rank()]
    }

    /// All 7 dimensions.
    pub fn full_dims(&self) -> [usize; MAX_RANK] {
        self.dims
    }

    /// The size of a voxel along the given 0-based axis.
    pub fn voxdim(&self, axis: usize) -> f64 {
        self.voxdims.get(axis).copied().unwrap_or(1.)
    }

    /// Change the voxel size along the given 0-based axis.
    pub fn set_voxdim(&mut self, axis: usize, size: f64) -> Result<()> {
        match self.voxdims.get_mut(axis) {
            Some(d) => {
                *d = size;
                Ok(())
            }
            None => Err(NiftiError::InvalidRank(axis as i64 + 1)),
        }
    }

    /// The voxel sizes up to the rank.
    pub fn voxdims(&self) -> &[f64] {
        &self.voxdims[..self.rank()]
    }

    /// Canonical strides over all 7 axes, first axis fastest.
    pub fn strides(&self) -> [usize; MAX_RANK] {
        calc_strides(&self.dims)
    }

    /// Total number of voxels.
    pub fn voxel_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Size of one voxel on disk, in bytes.
    pub fn voxel_bytes(&self) -> usize {
        self.datatype.size_of()
    }

    /// Size of the voxel data on disk, in bytes.
    pub fn data_size(&self) -> usize {
        self.voxel_count() * self.voxel_bytes()
    }

    /// The scaling slope, never 0.
    pub fn scl_slope(&self) -> f64 {
        self.scl_slope
    }

    /// The scaling intercept.
    pub fn scl_inter(&self) -> f64 {
        self.scl_inter
    }

    /// Set the linear scaling from disk values to memory values. A slope
    /// that is zero or not finite is stored as 1.
    pub fn set_scaling(&mut self, slope: f64, inter: f64) {
        self.scl_slope = if slope.is_finite() && slope != 0. {
            slope
        } else {
            log::warn!("Scaling slope {} replaced by 1", slope);
            1.
        };
        self.scl_inter = finite_or_zero(inter);
    }

    /// The quaternion based transform.
    pub fn qform(&self) -> &Affine4 {
        &self.qform
    }

    /// Provenance of the quaternion based transform.
    pub fn qcode(&self) -> XForm {
        self.qcode
    }

    /// The matrix based transform.
    pub fn sform(&self) -> &Affine4 {
        &self.sform
    }

    /// Provenance of the matrix based transform.
    pub fn scode(&self) -> XForm {
        self.scode
    }

    /// The preferred transform: `sform` when its code is known and not below
    /// the `qform` code, `qform` otherwise.
    pub fn transform(&self) -> &Affine4 {
        if self.scode > XForm::Unknown && self.scode >= self.qcode {
            &self.sform
        } else {
            &self.qform
        }
    }

    /// Set both transforms and their codes.
    pub fn set_transform(&mut self, transform: Affine4, code: XForm) {
        self.qform = transform;
        self.sform = transform;
        self.qcode = code;
        self.scode = code;
    }

    /// Set the quaternion based transform alone.
    pub fn set_qform(&mut self, transform: Affine4, code: XForm) {
        self.qform = transform;
        self.qcode = code;
    }

    /// Set the matrix based transform alone.
    pub fn set_sform(&mut self, transform: Affine4, code: XForm) {
        self.sform = transform;
        self.scode = code;
    }

    /// Whether both headers describe the same voxel grid: equal first three
    /// dimensions and approximately equal voxel sizes.
    pub fn matches_voxels(&self, other: &NiftiHeader) -> bool {
        self.dims[..3] == other.dims[..3]
            && self.voxdims[..3]
                .iter()
                .zip(other.voxdims[..3].iter())
                .all(|(a, b)| relative_eq!(a, b, epsilon = 1e-5, max_relative = 1e-5))
    }

    /// Whether both headers describe the same voxel grid at the same place.
    pub fn matches_space(&self, other: &NiftiHeader) -> bool {
        self.matches_voxels(other)
            && relative_eq!(
                self.transform(),
                other.transform(),
                epsilon = 1e-5,
                max_relative = 1e-5
            )
    }

    /// The 3 character magic string, `"ni1"`, `"n+1"`, `"ni2"` or `"n+2"`.
    pub fn magic(&self) -> String {
        String::from_utf8_lossy(&self.magic[..3]).into_owned()
    }

    /// Set the magic string for the given version and file layout.
    pub fn set_magic(&mut self, version: NiftiVersion, is_nii: bool) {
        self.magic = match (version, is_nii) {
            (NiftiVersion::Nifti1, true) => *MAGIC_CODE_NIP1,
            (NiftiVersion::Nifti1, false) => *MAGIC_CODE_NI1,
            (NiftiVersion::Nifti2, true) => *b"n+2\0",
            (NiftiVersion::Nifti2, false) => *b"ni2\0",
        };
    }

    /// Offset of the voxel data in the image file, in bytes.
    pub fn vox_offset(&self) -> usize {
        self.vox_offset
    }

    /// Set the voxel data offset for the given version and layout: right
    /// after the header, extender and extensions for a `.nii` file, 0 for an
    /// `.img` file.
    pub fn set_vox_offset(&mut self, version: NiftiVersion, is_nii: bool, extension_size: usize) {
        self.vox_offset = if is_nii {
            version.header_size() + 4 + extension_size
        } else {
            0
        };
    }

    pub(crate) fn force_vox_offset(&mut self, offset: usize) {
        self.vox_offset = offset;
    }
}

struct Row<'a>(&'a Affine4, usize);

impl fmt::Display for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let m = self.0;
        let r = self.1;
        write!(
            f,
            "{:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            m[(r, 0)],
            m[(r, 1)],
            m[(r, 2)],
            m[(r, 3)]
        )
    }
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for NiftiHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Datatype:    {} ({} bytes)",
            self.datatype.name(),
            self.datatype.size_of()
        )?;
        writeln!(f, "Dimensions:  {}", join(&self.dims))?;
        write!(f, "Voxel sizes: {} {}", join(&self.voxdims), self.xyz_units.name())?;
        if self.rank() > 3 {
            write!(f, "/{}", self.time_units.name())?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Calibration (min, max): {}, {}",
            self.cal_min, self.cal_max
        )?;
        writeln!(
            f,
            "Scaling (slope, inter): {}, {}",
            self.scl_slope, self.scl_inter
        )?;
        writeln!(
            f,
            "Dimension labels (Phase, Freq, Slice):   {}, {}, {}",
            self.phase_dim, self.freq_dim, self.slice_dim
        )?;
        writeln!(
            f,
            "Slice info (Code, Start, End, Duration): {}, {}, {}, {}",
            self.slice_code as i32, self.slice_start, self.slice_end, self.slice_duration
        )?;
        writeln!(f, "Slice name: {}", self.slice_code.name())?;
        writeln!(f, "Time offset: {}", self.toffset)?;
        writeln!(f, "Intent name:   {}", self.intent_name)?;
        writeln!(f, "Intent code:   {}", self.intent.name())?;
        writeln!(f, "Intent params: {}", join(&self.intent_p))?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Aux File:    {}", self.aux_file)?;
        writeln!(f, "QForm: {}", self.qcode.name())?;
        for r in 0..4 {
            writeln!(f, "{}", Row(&self.qform, r))?;
        }
        writeln!(f, "SForm: {}", self.scode.name())?;
        for r in 0..4 {
            writeln!(f, "{}", Row(&self.sform, r))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn rank_is_never_zero() {
        let hdr = NiftiHeader::default();
        assert_eq!(hdr.rank(), 1);
        let hdr = NiftiHeader::new(&[1, 1, 1, 5], &[], NiftiType::Uint8).unwrap();
        assert_eq!(hdr.rank(), 4);
        assert_eq!(hdr.dims(), &[1, 1, 1, 5]);
        let hdr = NiftiHeader::new(&[4, 0, 3], &[], NiftiType::Uint8).unwrap();
        assert_eq!(hdr.full_dims(), [4, 1, 3, 1, 1, 1, 1]);
    }

    #[test]
    fn sform_priority() {
        let mut hdr = NiftiHeader::default();
        let q = scale([2., 2., 2.]);
        let s = scale([3., 3., 3.]);
        hdr.set_qform(q, XForm::AlignedAnat);
        hdr.set_sform(s, XForm::Unknown);
        assert_eq!(hdr.transform(), &q);
        hdr.set_sform(s, XForm::ScannerAnat);
        assert_eq!(hdr.transform(), &q);
        hdr.set_sform(s, XForm::AlignedAnat);
        assert_eq!(hdr.transform(), &s);
        hdr.set_qform(q, XForm::Unknown);
        hdr.set_sform(s, XForm::Unknown);
        assert_eq!(hdr.transform(), &q);
    }

    #[test]
    fn version_detection() {
        let le = 348i32.to_le_bytes();
        let be = 348i32.to_be_bytes();
        assert_eq!(NiftiVersion::detect(le).unwrap().0, NiftiVersion::Nifti1);
        assert_eq!(NiftiVersion::detect(be).unwrap().0, NiftiVersion::Nifti1);
        assert_eq!(
            NiftiVersion::detect(540i32.to_be_bytes()).unwrap(),
            (NiftiVersion::Nifti2, Endianness::Big)
        );
        assert!(NiftiVersion::detect([1, 2, 3, 4]).is_err());
    }

    #[test]
    fn magic_checks() {
        assert_eq!(NiftiVersion::Nifti1.check_magic(b"n+1\0").unwrap(), true);
        assert_eq!(NiftiVersion::Nifti1.check_magic(b"ni1\0").unwrap(), false);
        assert_eq!(NiftiVersion::Nifti2.check_magic(MAGIC_CODE_NIP2).unwrap(), true);
        assert!(NiftiVersion::Nifti1.check_magic(b"n+2\0").is_err());
        assert!(NiftiVersion::Nifti1.check_magic(&[0; 4]).is_err());
    }

    #[test]
    fn zero_slope_is_one() {
        let mut raw = NiftiHeader::default().to_nifti1().unwrap();
        raw.scl_slope = 0.;
        raw.scl_inter = f32::NAN;
        let hdr = NiftiHeader::from_nifti1(&raw).unwrap();
        assert_eq!(hdr.scl_slope(), 1.);
        assert_eq!(hdr.scl_inter(), 0.);
    }

    #[test]
    fn invalid_rank() {
        let mut raw = NiftiHeader::default().to_nifti1().unwrap();
        raw.dim[0] = 8;
        assert!(matches!(
            NiftiHeader::from_nifti1(&raw),
            Err(NiftiError::InvalidRank(8))
        ));
        raw.dim[0] = 0;
        assert!(matches!(
            NiftiHeader::from_nifti1(&raw),
            Err(NiftiError::InvalidRank(0))
        ));
    }

    #[test]
    fn nifti1_dimension_limit() {
        let hdr = NiftiHeader::new(&[40000, 2], &[1., 1.], NiftiType::Uint8).unwrap();
        assert!(matches!(
            hdr.to_nifti1(),
            Err(NiftiError::DimensionOverflow { axis: 0, .. })
        ));
        let raw = hdr.to_nifti2().unwrap();
        assert_eq!(raw.dim[1], 40000);
    }

    #[test]
    fn dim_info_packing() {
        let mut hdr = NiftiHeader::default();
        hdr.freq_dim = 1;
        hdr.phase_dim = 2;
        hdr.slice_dim = 3;
        let raw = hdr.to_nifti1().unwrap();
        assert_eq!(raw.dim_info, 1 | (2 << 2) | (3 << 4));
        let back = NiftiHeader::from_nifti1(&raw).unwrap();
        assert_eq!((back.freq_dim, back.phase_dim, back.slice_dim), (1, 2, 3));
    }

    #[test]
    fn rotated_qform() {
        // 90 degrees about z, then scaled and shifted
        #[rustfmt::skip]
        let linear = Affine3::new(
            0., -2., 0.,
            2.,  0., 0.,
            0.,  0., 3.,
        );
        let t = compose(&linear, &Vector3::new(-10., 5., 1.));
        let mut hdr = NiftiHeader::new(&[8, 8, 4], &[2., 2., 3.], NiftiType::Int16).unwrap();
        hdr.set_transform(t, XForm::AlignedAnat);
        let back = NiftiHeader::from_nifti2(&hdr.to_nifti2().unwrap()).unwrap();
        assert_abs_diff_eq!(*back.qform(), t, epsilon = 1e-9);
        assert_eq!(back.qcode(), XForm::AlignedAnat);
    }

    #[test]
    fn dump_mentions_everything() {
        let mut hdr =
            NiftiHeader::new(&[4, 4, 2, 3], &[1., 1., 2., 0.5], NiftiType::Int16).unwrap();
        hdr.description = "phantom".to_string();
        let text = hdr.to_string();
        assert!(text.contains("INT16 (2 bytes)"));
        assert!(text.contains("Dimensions:  4 4 2 3 1 1 1"));
        assert!(text.contains("mm/s"));
        assert!(text.contains("Description: phantom"));
        assert!(text.contains("QForm: Scanner Anatomy"));
    }
}
