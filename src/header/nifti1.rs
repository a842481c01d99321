//! The NIfTI-1 header layout, 348 bytes on disk.

use super::{Fields, NIFTI1_HEADER_SIZE};
use crate::error::{NiftiError, Result};
use crate::util::{from_fixed_str, to_fixed_str, Endianness};
use byteordered::ByteOrdered;
use std::io::{Read, Write};

/// The NIfTI-1 header data type.
/// All fields are public and named after the standard's header file,
/// holding exactly what is stored on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Nifti1Header {
    /// Header size, must be 348
    pub sizeof_hdr: i32,
    /// Unused in NIFTI-1
    pub data_type: [u8; 10],
    /// Unused in NIFTI-1
    pub db_name: [u8; 18],
    /// Unused in NIFTI-1
    pub extents: i32,
    /// Unused in NIFTI-1
    pub session_error: i16,
    /// Unused in NIFTI-1, written as `'r'`
    pub regular: u8,
    /// MRI slice ordering
    pub dim_info: u8,
    /// Data array dimensions, rank first
    pub dim: [i16; 8],
    /// 1st intent parameter
    pub intent_p1: f32,
    /// 2nd intent parameter
    pub intent_p2: f32,
    /// 3rd intent parameter
    pub intent_p3: f32,
    /// NIFTI_INTENT_* code
    pub intent_code: i16,
    /// Defines the data type
    pub datatype: i16,
    /// Number of bits per voxel
    pub bitpix: i16,
    /// First slice index
    pub slice_start: i16,
    /// Grid spacings, `pixdim[0]` holds the handedness flag
    pub pixdim: [f32; 8],
    /// Offset into .nii file to reach the volume
    pub vox_offset: f32,
    /// Data scaling: slope
    pub scl_slope: f32,
    /// Data scaling: offset
    pub scl_inter: f32,
    /// Last slice index
    pub slice_end: i16,
    /// Slice timing order
    pub slice_code: u8,
    /// Units of `pixdim[1..4]`
    pub xyzt_units: u8,
    /// Max display intensity
    pub cal_max: f32,
    /// Min display intensity
    pub cal_min: f32,
    /// Time for 1 slice
    pub slice_duration: f32,
    /// Time axis shift
    pub toffset: f32,
    /// Unused in NIFTI-1
    pub glmax: i32,
    /// Unused in NIFTI-1
    pub glmin: i32,
    /// Any text you like
    pub descrip: [u8; 80],
    /// Auxiliary filename
    pub aux_file: [u8; 24],
    /// NIFTI_XFORM_* code
    pub qform_code: i16,
    /// NIFTI_XFORM_* code
    pub sform_code: i16,
    /// Quaternion b param
    pub quatern_b: f32,
    /// Quaternion c param
    pub quatern_c: f32,
    /// Quaternion d param
    pub quatern_d: f32,
    /// Quaternion x shift
    pub qoffset_x: f32,
    /// Quaternion y shift
    pub qoffset_y: f32,
    /// Quaternion z shift
    pub qoffset_z: f32,
    /// 1st row affine transform
    pub srow_x: [f32; 4],
    /// 2nd row affine transform
    pub srow_y: [f32; 4],
    /// 3rd row affine transform
    pub srow_z: [f32; 4],
    /// 'name' or meaning of data
    pub intent_name: [u8; 16],
    /// Magic code. Must be `b"ni1\0"` or `b"n+1\0"`
    pub magic: [u8; 4],
}

impl Default for Nifti1Header {
    fn default() -> Self {
        Nifti1Header {
            sizeof_hdr: NIFTI1_HEADER_SIZE as i32,
            data_type: [0; 10],
            db_name: [0; 18],
            extents: 0,
            session_error: 0,
            regular: b'r',
            dim_info: 0,
            dim: [1, 0, 0, 0, 0, 0, 0, 0],
            intent_p1: 0.,
            intent_p2: 0.,
            intent_p3: 0.,
            intent_code: 0,
            datatype: 0,
            bitpix: 0,
            slice_start: 0,
            pixdim: [1.; 8],
            vox_offset: 0.,
            scl_slope: 0.,
            scl_inter: 0.,
            slice_end: 0,
            slice_code: 0,
            xyzt_units: 0,
            cal_max: 0.,
            cal_min: 0.,
            slice_duration: 0.,
            toffset: 0.,
            glmax: 0,
            glmin: 0,
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
            intent_name: [0; 16],
            magic: *b"ni1\0",
        }
    }
}

impl Nifti1Header {
    /// Read a NIfTI-1 header from the given source, with all multi-byte
    /// fields in the given byte order. The `sizeof_hdr` field is read too,
    /// but not checked.
    pub fn from_reader<S: Read>(source: S, endianness: Endianness) -> Result<Self> {
        let mut input = ByteOrdered::runtime(source, endianness);
        let mut h = Nifti1Header::default();

        h.sizeof_hdr = input.read_i32()?;
        input.read_exact(&mut h.data_type)?;
        input.read_exact(&mut h.db_name)?;
        h.extents = input.read_i32()?;
        h.session_error = input.read_i16()?;
        h.regular = input.read_u8()?;
        h.dim_info = input.read_u8()?;
        for v in &mut h.dim {
            *v = input.read_i16()?;
        }
        h.intent_p1 = input.read_f32()?;
        h.intent_p2 = input.read_f32()?;
        h.intent_p3 = input.read_f32()?;
        h.intent_code = input.read_i16()?;
        h.datatype = input.read_i16()?;
        h.bitpix = input.read_i16()?;
        h.slice_start = input.read_i16()?;
        for v in &mut h.pixdim {
            *v = input.read_f32()?;
        }
        h.vox_offset = input.read_f32()?;
        h.scl_slope = input.read_f32()?;
        h.scl_inter = input.read_f32()?;
        h.slice_end = input.read_i16()?;
        h.slice_code = input.read_u8()?;
        h.xyzt_units = input.read_u8()?;
        h.cal_max = input.read_f32()?;
        h.cal_min = input.read_f32()?;
        h.slice_duration = input.read_f32()?;
        h.toffset = input.read_f32()?;
        h.glmax = input.read_i32()?;
        h.glmin = input.read_i32()?;
        input.read_exact(&mut h.descrip)?;
        input.read_exact(&mut h.aux_file)?;
        h.qform_code = input.read_i16()?;
        h.sform_code = input.read_i16()?;
        h.quatern_b = input.read_f32()?;
        h.quatern_c = input.read_f32()?;
        h.quatern_d = input.read_f32()?;
        h.qoffset_x = input.read_f32()?;
        h.qoffset_y = input.read_f32()?;
        h.qoffset_z = input.read_f32()?;
        for row in [&mut h.srow_x, &mut h.srow_y, &mut h.srow_z] {
            for v in row.iter_mut() {
                *v = input.read_f32()?;
            }
        }
        input.read_exact(&mut h.intent_name)?;
        input.read_exact(&mut h.magic)?;
        Ok(h)
    }

    /// Write this header to the given sink, in the given byte order.
    pub fn write_to<W: Write>(&self, sink: W, endianness: Endianness) -> Result<()> {
        let mut out = ByteOrdered::runtime(sink, endianness);
        out.write_i32(self.sizeof_hdr)?;
        out.write_all(&self.data_type)?;
        out.write_all(&self.db_name)?;
        out.write_i32(self.extents)?;
        out.write_i16(self.session_error)?;
        out.write_u8(self.regular)?;
        out.write_u8(self.dim_info)?;
        for v in &self.dim {
            out.write_i16(*v)?;
        }
        out.write_f32(self.intent_p1)?;
        out.write_f32(self.intent_p2)?;
        out.write_f32(self.intent_p3)?;
        out.write_i16(self.intent_code)?;
        out.write_i16(self.datatype)?;
        out.write_i16(self.bitpix)?;
        out.write_i16(self.slice_start)?;
        for v in &self.pixdim {
            out.write_f32(*v)?;
        }
        out.write_f32(self.vox_offset)?;
        out.write_f32(self.scl_slope)?;
        out.write_f32(self.scl_inter)?;
        out.write_i16(self.slice_end)?;
        out.write_u8(self.slice_code)?;
        out.write_u8(self.xyzt_units)?;
        out.write_f32(self.cal_max)?;
        out.write_f32(self.cal_min)?;
        out.write_f32(self.slice_duration)?;
        out.write_f32(self.toffset)?;
        out.write_i32(self.glmax)?;
        out.write_i32(self.glmin)?;
        out.write_all(&self.descrip)?;
        out.write_all(&self.aux_file)?;
        out.write_i16(self.qform_code)?;
        out.write_i16(self.sform_code)?;
        for v in &[
            self.quatern_b,
            self.quatern_c,
            self.quatern_d,
            self.qoffset_x,
            self.qoffset_y,
            self.qoffset_z,
        ] {
            out.write_f32(*v)?;
        }
        for row in &[self.srow_x, self.srow_y, self.srow_z] {
            for v in row {
                out.write_f32(*v)?;
            }
        }
        out.write_all(&self.intent_name)?;
        out.write_all(&self.magic)?;
        Ok(())
    }

    pub(crate) fn to_fields(&self) -> Fields {
        let mut dim = [0i64; 8];
        let mut pixdim = [0f64; 8];
        for i in 0..8 {
            dim[i] = i64::from(self.dim[i]);
            pixdim[i] = f64::from(self.pixdim[i]);
        }
        let row = |r: &[f32; 4]| [r[0].into(), r[1].into(), r[2].into(), r[3].into()];
        Fields {
            dim,
            pixdim,
            datatype: self.datatype,
            bitpix: self.bitpix,
            intent_p: [
                self.intent_p1.into(),
                self.intent_p2.into(),
                self.intent_p3.into(),
            ],
            intent_code: self.intent_code.into(),
            vox_offset: self.vox_offset as i64,
            scl_slope: self.scl_slope.into(),
            scl_inter: self.scl_inter.into(),
            cal_max: self.cal_max.into(),
            cal_min: self.cal_min.into(),
            slice_duration: self.slice_duration.into(),
            toffset: self.toffset.into(),
            slice_start: self.slice_start.into(),
            slice_end: self.slice_end.into(),
            slice_code: self.slice_code.into(),
            xyzt_units: self.xyzt_units.into(),
            dim_info: self.dim_info,
            descrip: from_fixed_str(&self.descrip),
            aux_file: from_fixed_str(&self.aux_file),
            intent_name: from_fixed_str(&self.intent_name),
            qform_code: self.qform_code.into(),
            sform_code: self.sform_code.into(),
            quatern: [
                self.quatern_b.into(),
                self.quatern_c.into(),
                self.quatern_d.into(),
            ],
            qoffset: [
                self.qoffset_x.into(),
                self.qoffset_y.into(),
                self.qoffset_z.into(),
            ],
            srow: [row(&self.srow_x), row(&self.srow_y), row(&self.srow_z)],
            magic: self.magic,
        }
    }

    pub(crate) fn from_fields(f: &Fields) -> Result<Self> {
        let mut h = Nifti1Header::default();
        for (axis, (to, from)) in h.dim.iter_mut().zip(f.dim.iter()).enumerate() {
            *to = narrow_dim(axis, *from)?;
        }
        for (to, from) in h.pixdim.iter_mut().zip(f.pixdim.iter()) {
            *to = *from as f32;
        }
        h.datatype = f.datatype;
        h.intent_p1 = f.intent_p[0] as f32;
        h.intent_p2 = f.intent_p[1] as f32;
        h.intent_p3 = f.intent_p[2] as f32;
        h.intent_code = f.intent_code as i16;
        h.vox_offset = f.vox_offset as f32;
        h.scl_slope = f.scl_slope as f32;
        h.scl_inter = f.scl_inter as f32;
        h.cal_max = f.cal_max as f32;
        h.cal_min = f.cal_min as f32;
        h.slice_duration = f.slice_duration as f32;
        h.toffset = f.toffset as f32;
        h.slice_start = saturate_i16(f.slice_start);
        h.slice_end = saturate_i16(f.slice_end);
        h.slice_code = f.slice_code as u8;
        h.xyzt_units = f.xyzt_units as u8;
        h.dim_info = f.dim_info;
        h.descrip = to_fixed_str(&f.descrip);
        h.aux_file = to_fixed_str(&f.aux_file);
        h.intent_name = to_fixed_str(&f.intent_name);
        h.qform_code = f.qform_code as i16;
        h.sform_code = f.sform_code as i16;
        h.quatern_b = f.quatern[0] as f32;
        h.quatern_c = f.quatern[1] as f32;
        h.quatern_d = f.quatern[2] as f32;
        h.qoffset_x = f.qoffset[0] as f32;
        h.qoffset_y = f.qoffset[1] as f32;
        h.qoffset_z = f.qoffset[2] as f32;
        let row = |r: &[f64; 4]| [r[0] as f32, r[1] as f32, r[2] as f32, r[3] as f32];
        h.srow_x = row(&f.srow[0]);
        h.srow_y = row(&f.srow[1]);
        h.srow_z = row(&f.srow[2]);
        h.magic = f.magic;
        h.bitpix = f.bitpix;
        Ok(h)
    }
}

fn narrow_dim(axis: usize, dim: i64) -> Result<i16> {
    if dim > i64::from(i16::MAX) || dim < 0 {
        // dim[0] is the rank, the data axes start at 1
        return Err(NiftiError::DimensionOverflow {
            axis: axis.saturating_sub(1),
            dim: dim.max(0) as usize,
            max: i16::MAX.into(),
        });
    }
    Ok(dim as i16)
}

fn saturate_i16(v: i64) -> i16 {
    v.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}
