//! The NIfTI-2 header layout, 540 bytes on disk.

use super::{Fields, NIFTI2_HEADER_SIZE};
use crate::error::{NiftiError, Result};
use crate::util::{from_fixed_str, to_fixed_str, Endianness};
use byteordered::ByteOrdered;
use std::io::{Read, Write};

/// The NIfTI-2 header data type. Same content as NIfTI-1 with wider
/// fields and a different order.
#[derive(Debug, Clone, PartialEq)]
pub struct Nifti2Header {
    /// Header size, must be 540
    pub sizeof_hdr: i32,
    /// Magic code. `b"n+2\0\r\n\x1a\n"` or `b"ni2\0\r\n\x1a\n"`
    pub magic: [u8; 8],
    /// Defines the data type
    pub datatype: i16,
    /// Number of bits per voxel
    pub bitpix: i16,
    /// Data array dimensions, rank first
    pub dim: [i64; 8],
    /// 1st intent parameter
    pub intent_p1: f64,
    /// 2nd intent parameter
    pub intent_p2: f64,
    /// 3rd intent parameter
    pub intent_p3: f64,
    /// Grid spacings, `pixdim[0]` holds the handedness flag
    pub pixdim: [f64; 8],
    /// Offset into .nii file to reach the volume
    pub vox_offset: i64,
    /// Data scaling: slope
    pub scl_slope: f64,
    /// Data scaling: offset
    pub scl_inter: f64,
    /// Max display intensity
    pub cal_max: f64,
    /// Min display intensity
    pub cal_min: f64,
    /// Time for 1 slice
    pub slice_duration: f64,
    /// Time axis shift
    pub toffset: f64,
    /// First slice index
    pub slice_start: i64,
    /// Last slice index
    pub slice_end: i64,
    /// Any text you like
    pub descrip: [u8; 80],
    /// Auxiliary filename
    pub aux_file: [u8; 24],
    /// NIFTI_XFORM_* code
    pub qform_code: i32,
    /// NIFTI_XFORM_* code
    pub sform_code: i32,
    /// Quaternion b param
    pub quatern_b: f64,
    /// Quaternion c param
    pub quatern_c: f64,
    /// Quaternion d param
    pub quatern_d: f64,
    /// Quaternion x shift
    pub qoffset_x: f64,
    /// Quaternion y shift
    pub qoffset_y: f64,
    /// Quaternion z shift
    pub qoffset_z: f64,
    /// 1st row affine transform
    pub srow_x: [f64; 4],
    /// 2nd row affine transform
    pub srow_y: [f64; 4],
    /// 3rd row affine transform
    pub srow_z: [f64; 4],
    /// Slice timing order
    pub slice_code: i32,
    /// Units of `pixdim[1..4]`
    pub xyzt_units: i32,
    /// NIFTI_INTENT_* code
    pub intent_code: i32,
    /// 'name' or meaning of data
    pub intent_name: [u8; 16],
    /// MRI slice ordering
    pub dim_info: u8,
    /// Unused, zero filled
    pub unused_str: [u8; 15],
}

impl Default for Nifti2Header {
    fn default() -> Self {
        Nifti2Header {
            sizeof_hdr: NIFTI2_HEADER_SIZE as i32,
            magic: *b"ni2\0\r\n\x1a\n",
            datatype: 0,
            bitpix: 0,
            dim: [1, 0, 0, 0, 0, 0, 0, 0],
            intent_p1: 0.,
            intent_p2: 0.,
            intent_p3: 0.,
            pixdim: [1.; 8],
            vox_offset: 0,
            scl_slope: 0.,
            scl_inter: 0.,
            cal_max: 0.,
            cal_min: 0.,
            slice_duration: 0.,
            toffset: 0.,
            slice_start: 0,
            slice_end: 0,
            descrip: [0; 80],
            aux_file: [0; 24],
            qform_code: 0,
            sform_code: 0,
            quatern_b: 0.,
            quatern_c: 0.,
            quatern_d: 0.,
            qoffset_x: 0.,
            qoffset_y: 0.,
            qoffset_z: 0.,
            srow_x: [1., 0., 0., 0.],
            srow_y: [0., 1., 0., 0.],
            srow_z: [0., 0., 1., 0.],
            slice_code: 0,
            xyzt_units: 0,
            intent_code: 0,
            intent_name: [0; 16],
            dim_info: 0,
            unused_str: [0; 15],
        }
    }
}

impl Nifti2Header {
    /// Read a NIfTI-2 header from the given source, in the given byte order.
    pub fn from_reader<S: Read>(source: S, endianness: Endianness) -> Result<Self> {
        let mut input = ByteOrdered::runtime(source, endianness);
        let mut h = Nifti2Header::default();

        h.sizeof_hdr = input.read_i32()?;
        input.read_exact(&mut h.magic)?;
        h.datatype = input.read_i16()?;
        h.bitpix = input.read_i16()?;
        for v in &mut h.dim {
            *v = input.read_i64()?;
        }
        h.intent_p1 = input.read_f64()?;
        h.intent_p2 = input.read_f64()?;
        h.intent_p3 = input.read_f64()?;
        for v in &mut h.pixdim {
            *v = input.read_f64()?;
        }
        h.vox_offset = input.read_i64()?;
        h.scl_slope = input.read_f64()?;
        h.scl_inter = input.read_f64()?;
        h.cal_max = input.read_f64()?;
        h.cal_min = input.read_f64()?;
        h.slice_duration = input.read_f64()?;
        h.toffset = input.read_f64()?;
        h.slice_start = input.read_i64()?;
        h.slice_end = input.read_i64()?;
        input.read_exact(&mut h.descrip)?;
        input.read_exact(&mut h.aux_file)?;
        h.qform_code = input.read_i32()?;
        h.sform_code = input.read_i32()?;
        h.quatern_b = input.read_f64()?;
        h.quatern_c = input.read_f64()?;
        h.quatern_d = input.read_f64()?;
        h.qoffset_x = input.read_f64()?;
        h.qoffset_y = input.read_f64()?;
        h.qoffset_z = input.read_f64()?;
        for row in [&mut h.srow_x, &mut h.srow_y, &mut h.srow_z] {
            for v in row.iter_mut() {
                *v = input.read_f64()?;
            }
        }
        h.slice_code = input.read_i32()?;
        h.xyzt_units = input.read_i32()?;
        h.intent_code = input.read_i32()?;
        input.read_exact(&mut h.intent_name)?;
        h.dim_info = input.read_u8()?;
        input.read_exact(&mut h.unused_str)?;
        Ok(h)
    }

    /// Write this header to the given sink, in the given byte order.
    pub fn write_to<W: Write>(&self, sink: W, endianness: Endianness) -> Result<()> {
        let mut out = ByteOrdered::runtime(sink, endianness);
        out.write_i32(self.sizeof_hdr)?;
        out.write_all(&self.magic)?;
        out.write_i16(self.datatype)?;
        out.write_i16(self.bitpix)?;
        for v in &self.dim {
            out.write_i64(*v)?;
        }
        for v in &[self.intent_p1, self.intent_p2, self.intent_p3] {
            out.write_f64(*v)?;
        }
        for v in &self.pixdim {
            out.write_f64(*v)?;
        }
        out.write_i64(self.vox_offset)?;
        for v in &[
            self.scl_slope,
            self.scl_inter,
            self.cal_max,
            self.cal_min,
            self.slice_duration,
            self.toffset,
        ] {
            out.write_f64(*v)?;
        }
        out.write_i64(self.slice_start)?;
        out.write_i64(self.slice_end)?;
        out.write_all(&self.descrip)?;
        out.write_all(&self.aux_file)?;
        out.write_i32(self.qform_code)?;
        out.write_i32(self.sform_code)?;
        for v in &[
            self.quatern_b,
            self.quatern_c,
            self.quatern_d,
            self.qoffset_x,
            self.qoffset_y,
            self.qoffset_z,
        ] {
            out.write_f64(*v)?;
        }
        for row in &[self.srow_x, self.srow_y, self.srow_z] {
            for v in row {
                out.write_f64(*v)?;
            }
        }
        out.write_i32(self.slice_code)?;
        out.write_i32(self.xyzt_units)?;
        out.write_i32(self.intent_code)?;
        out.write_all(&self.intent_name)?;
        out.write_u8(self.dim_info)?;
        out.write_all(&self.unused_str)?;
        Ok(())
    }

    pub(crate) fn to_fields(&self) -> Fields {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&self.magic[..4]);
        Fields {
            dim: self.dim,
            pixdim: self.pixdim,
            datatype: self.datatype,
            bitpix: self.bitpix,
            intent_p: [self.intent_p1, self.intent_p2, self.intent_p3],
            intent_code: self.intent_code,
            vox_offset: self.vox_offset,
            scl_slope: self.scl_slope,
            scl_inter: self.scl_inter,
            cal_max: self.cal_max,
            cal_min: self.cal_min,
            slice_duration: self.slice_duration,
            toffset: self.toffset,
            slice_start: self.slice_start,
            slice_end: self.slice_end,
            slice_code: self.slice_code,
            xyzt_units: self.xyzt_units,
            dim_info: self.dim_info,
            descrip: from_fixed_str(&self.descrip),
            aux_file: from_fixed_str(&self.aux_file),
            intent_name: from_fixed_str(&self.intent_name),
            qform_code: self.qform_code,
            sform_code: self.sform_code,
            quatern: [self.quatern_b, self.quatern_c, self.quatern_d],
            qoffset: [self.qoffset_x, self.qoffset_y, self.qoffset_z],
            srow: [self.srow_x, self.srow_y, self.srow_z],
            magic,
        }
    }

    pub(crate) fn from_fields(f: &Fields) -> Result<Self> {
        if let Some(axis) = f.dim.iter().position(|&d| d < 0) {
            return Err(NiftiError::DimensionOverflow {
                axis: axis.saturating_sub(1),
                dim: 0,
                max: i64::MAX,
            });
        }
        let mut magic = *b"\0\0\0\0\r\n\x1a\n";
        magic[..4].copy_from_slice(&f.magic);
        Ok(Nifti2Header {
            sizeof_hdr: NIFTI2_HEADER_SIZE as i32,
            magic,
            datatype: f.datatype,
            bitpix: f.bitpix,
            dim: f.dim,
            intent_p1: f.intent_p[0],
            intent_p2: f.intent_p[1],
            intent_p3: f.intent_p[2],
            pixdim: f.pixdim,
            vox_offset: f.vox_offset,
            scl_slope: f.scl_slope,
            scl_inter: f.scl_inter,
            cal_max: f.cal_max,
            cal_min: f.cal_min,
            slice_duration: f.slice_duration,
            toffset: f.toffset,
            slice_start: f.slice_start,
            slice_end: f.slice_end,
            descrip: to_fixed_str(&f.descrip),
            aux_file: to_fixed_str(&f.aux_file),
            qform_code: f.qform_code,
            sform_code: f.sform_code,
            quatern_b: f.quatern[0],
            quatern_c: f.quatern[1],
            quatern_d: f.quatern[2],
            qoffset_x: f.qoffset[0],
            qoffset_y: f.qoffset[1],
            qoffset_z: f.qoffset[2],
            srow_x: f.srow[0],
            srow_y: f.srow[1],
            srow_z: f.srow[2],
            slice_code: f.slice_code,
            xyzt_units: f.xyzt_units,
            intent_code: f.intent_code,
            intent_name: to_fixed_str(&f.intent_name),
            dim_info: f.dim_info,
            unused_str: [0; 15],
        })
    }
}
