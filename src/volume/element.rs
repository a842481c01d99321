//! This module defines the data element API, which enables volume files to
//! read, write and convert data elements between their on-disk type and the
//! type held in memory.
//!
//! Every on-disk value goes through a [`Sample`], which is either real or
//! complex. Scaling is applied to the sample, and the result is cast to the
//! target type. Conversion between a real and a complex value uses a zero
//! imaginary part one way and the magnitude the other way.
//!
//! [`Sample`]: ./enum.Sample.html

use crate::error::{NiftiError, Result};
use crate::typedef::NiftiType;
use bytemuck::{bytes_of, pod_read_unaligned};
use num_complex::Complex;

/// A single value, as decoded from disk or about to be encoded.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Sample {
    /// A real value.
    Real(f64),
    /// A complex value.
    Complex(Complex<f64>),
}

impl Sample {
    /// The value as a real number. Complex values give their magnitude.
    pub fn real(self) -> f64 {
        match self {
            Sample::Real(v) => v,
            Sample::Complex(c) => c.norm(),
        }
    }

    /// The value as a complex number.
    pub fn complex(self) -> Complex<f64> {
        match self {
            Sample::Real(v) => Complex::new(v, 0.),
            Sample::Complex(c) => c,
        }
    }

    /// Apply `slope * x + inter`, keeping the kind of value.
    pub fn scale(self, slope: f64, inter: f64) -> Sample {
        match self {
            Sample::Real(v) => Sample::Real(v * slope + inter),
            Sample::Complex(c) => Sample::Complex(c * slope + inter),
        }
    }

    /// Apply `(x - inter) / slope`, keeping the kind of value.
    pub fn unscale(self, slope: f64, inter: f64) -> Sample {
        match self {
            Sample::Real(v) => Sample::Real((v - inter) / slope),
            Sample::Complex(c) => Sample::Complex((c - inter) / slope),
        }
    }
}

/// Trait type for characterizing a voxel value held in memory, implemented
/// for primitive numeric types and complex numbers.
pub trait DataElement: 'static + Sized + Copy {
    /// The `datatype` naturally mapped to this type.
    const DATA_TYPE: NiftiType;

    /// Build a value from a real number. Integers round to the nearest
    /// value and saturate.
    fn from_real(value: f64) -> Self;

    /// Build a value from a complex number. Real types take the magnitude.
    fn from_complex(value: Complex<f64>) -> Self;

    /// Turn this value into a sample.
    fn to_sample(self) -> Sample;
}

/// Convert an on-disk sample to a value in memory, applying the scaling.
/// A complex sample read into a real type keeps its magnitude, which is
/// scaled afterwards.
pub fn from_disk<T: DataElement>(sample: Sample, slope: f64, inter: f64) -> T {
    match sample {
        Sample::Real(v) => T::from_real(v * slope + inter),
        Sample::Complex(c) if T::DATA_TYPE.is_complex() => T::from_complex(c * slope + inter),
        Sample::Complex(c) => T::from_real(c.norm() * slope + inter),
    }
}

/// Convert a value in memory to an on-disk sample, undoing the scaling.
/// A complex value written to a real type keeps its magnitude.
pub fn to_disk<T: DataElement>(value: T, disk: NiftiType, slope: f64, inter: f64) -> Sample {
    let sample = value.to_sample();
    if disk.is_complex() {
        sample.unscale(slope, inter)
    } else {
        Sample::Real(sample.real()).unscale(slope, inter)
    }
}

macro_rules! impl_real_element {
    ($t:ty, $dt:ident, $from:expr) => {
        impl DataElement for $t {
            const DATA_TYPE: NiftiType = NiftiType::$dt;

            fn from_real(value: f64) -> Self {
                let f: fn(f64) -> $t = $from;
                f(value)
            }

            fn from_complex(value: Complex<f64>) -> Self {
                Self::from_real(value.norm())
            }

            fn to_sample(self) -> Sample {
                Sample::Real(self as f64)
            }
        }
    };
}

// float to integer `as` casts saturate, and map NaN to 0
impl_real_element!(u8, Uint8, |v| v.round() as u8);
impl_real_element!(i8, Int8, |v| v.round() as i8);
impl_real_element!(u16, Uint16, |v| v.round() as u16);
impl_real_element!(i16, Int16, |v| v.round() as i16);
impl_real_element!(u32, Uint32, |v| v.round() as u32);
impl_real_element!(i32, Int32, |v| v.round() as i32);
impl_real_element!(u64, Uint64, |v| v.round() as u64);
impl_real_element!(i64, Int64, |v| v.round() as i64);
impl_real_element!(f32, Float32, |v| v as f32);
impl_real_element!(f64, Float64, |v| v);

impl DataElement for Complex<f32> {
    const DATA_TYPE: NiftiType = NiftiType::Complex64;

    fn from_real(value: f64) -> Self {
        Complex::new(value as f32, 0.)
    }

    fn from_complex(value: Complex<f64>) -> Self {
        Complex::new(value.re as f32, value.im as f32)
    }

    fn to_sample(self) -> Sample {
        Sample::Complex(Complex::new(self.re.into(), self.im.into()))
    }
}

impl DataElement for Complex<f64> {
    const DATA_TYPE: NiftiType = NiftiType::Complex128;

    fn from_real(value: f64) -> Self {
        Complex::new(value, 0.)
    }

    fn from_complex(value: Complex<f64>) -> Self {
        value
    }

    fn to_sample(self) -> Sample {
        Sample::Complex(self)
    }
}

/// Decodes one native-order on-disk value.
pub(crate) type Decoder = fn(&[u8]) -> Sample;
/// Encodes one sample into a native-order on-disk value.
pub(crate) type Encoder = fn(Sample, &mut [u8]);

/// Obtain the decoder for a data type.
///
/// # Errors
///
/// `UnsupportedDataType` for 128 bit floats and packed colour types.
pub(crate) fn decoder(datatype: NiftiType) -> Result<Decoder> {
    let f: Decoder = match datatype {
        NiftiType::Uint8 => |b: &[u8]| Sample::Real(b[0].into()),
        NiftiType::Int8 => |b: &[u8]| Sample::Real((b[0] as i8).into()),
        NiftiType::Uint16 => |b: &[u8]| Sample::Real(pod_read_unaligned::<u16>(b).into()),
        NiftiType::Int16 => |b: &[u8]| Sample::Real(pod_read_unaligned::<i16>(b).into()),
        NiftiType::Uint32 => |b: &[u8]| Sample::Real(pod_read_unaligned::<u32>(b).into()),
        NiftiType::Int32 => |b: &[u8]| Sample::Real(pod_read_unaligned::<i32>(b).into()),
        NiftiType::Uint64 => |b: &[u8]| Sample::Real(pod_read_unaligned::<u64>(b) as f64),
        NiftiType::Int64 => |b: &[u8]| Sample::Real(pod_read_unaligned::<i64>(b) as f64),
        NiftiType::Float32 => |b: &[u8]| Sample::Real(pod_read_unaligned::<f32>(b).into()),
        NiftiType::Float64 => |b: &[u8]| Sample::Real(pod_read_unaligned::<f64>(b)),
        NiftiType::Complex64 => |b: &[u8]| {
            let c: Complex<f32> = pod_read_unaligned(b);
            Sample::Complex(Complex::new(c.re.into(), c.im.into()))
        },
        NiftiType::Complex128 => |b: &[u8]| Sample::Complex(pod_read_unaligned(b)),
        NiftiType::Float128 | NiftiType::Complex256 | NiftiType::Rgb24 | NiftiType::Rgba32 => {
            return Err(NiftiError::UnsupportedDataType(datatype))
        }
    };
    Ok(f)
}

/// Obtain the encoder for a data type. Complex samples written to a real
/// type keep their magnitude.
///
/// # Errors
///
/// `UnsupportedDataType` for 128 bit floats and packed colour types.
pub(crate) fn encoder(datatype: NiftiType) -> Result<Encoder> {
    let f: Encoder = match datatype {
        NiftiType::Uint8 => |s: Sample, out: &mut [u8]| out[0] = u8::from_real(s.real()),
        NiftiType::Int8 => |s: Sample, out: &mut [u8]| out[0] = i8::from_real(s.real()) as u8,
        NiftiType::Uint16 => {
            |s: Sample, out: &mut [u8]| out.copy_from_slice(bytes_of(&u16::from_real(s.real())))
        }
        NiftiType::Int16 => {
            |s: Sample, out: &mut [u8]| out.copy_from_slice(bytes_of(&i16::from_real(s.real())))
        }
        NiftiType::Uint32 => {
            |s: Sample, out: &mut [u8]| out.copy_from_slice(bytes_of(&u32::from_real(s.real())))
        }
        NiftiType::Int32 => {
            |s: Sample, out: &mut [u8]| out.copy_from_slice(bytes_of(&i32::from_real(s.real())))
        }
        NiftiType::Uint64 => {
            |s: Sample, out: &mut [u8]| out.copy_from_slice(bytes_of(&u64::from_real(s.real())))
        }
        NiftiType::Int64 => {
            |s: Sample, out: &mut [u8]| out.copy_from_slice(bytes_of(&i64::from_real(s.real())))
        }
        NiftiType::Float32 => {
            |s: Sample, out: &mut [u8]| out.copy_from_slice(bytes_of(&(s.real() as f32)))
        }
        NiftiType::Float64 => |s: Sample, out: &mut [u8]| out.copy_from_slice(bytes_of(&s.real())),
        NiftiType::Complex64 => |s: Sample, out: &mut [u8]| {
            let c = Complex::<f32>::from_complex(s.complex());
            out.copy_from_slice(bytes_of(&c))
        },
        NiftiType::Complex128 => {
            |s: Sample, out: &mut [u8]| out.copy_from_slice(bytes_of(&s.complex()))
        }
        NiftiType::Float128 | NiftiType::Complex256 | NiftiType::Rgb24 | NiftiType::Rgba32 => {
            return Err(NiftiError::UnsupportedDataType(datatype))
        }
    };
    Ok(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn integer_targets_round_and_saturate() {
        assert_eq!(i16::from_real(2.5), 3);
        assert_eq!(i16::from_real(-2.4), -2);
        assert_eq!(u8::from_real(300.), 255);
        assert_eq!(u8::from_real(-1.), 0);
        assert_eq!(i32::from_real(f64::NAN), 0);
    }

    #[test]
    fn real_complex_conversions() {
        let c = Complex::new(3., 4.);
        assert_eq!(from_disk::<f32>(Sample::Complex(c), 2., 1.), 11.);
        assert_eq!(
            from_disk::<Complex<f64>>(Sample::Complex(c), 2., 1.),
            Complex::new(7., 8.)
        );
        assert_eq!(
            from_disk::<Complex<f64>>(Sample::Real(2.), 1., 0.),
            Complex::new(2., 0.)
        );
        assert_eq!(to_disk(c, NiftiType::Int16, 1., 0.), Sample::Real(5.));
        assert_eq!(to_disk(9i16, NiftiType::Int16, 2., 1.), Sample::Real(4.));
        assert_eq!(Sample::Complex(c).scale(2., 1.).complex(), Complex::new(7., 8.));
        assert_abs_diff_eq!(Sample::Real(7.).unscale(2., 1.).real(), 3.);
    }

    #[test]
    fn codec_round_trip() {
        for &dt in &[NiftiType::Int16, NiftiType::Float64, NiftiType::Uint32] {
            let mut buf = vec![0u8; dt.size_of()];
            encoder(dt).unwrap()(Sample::Real(1234.), &mut buf);
            assert_eq!(decoder(dt).unwrap()(&buf), Sample::Real(1234.));
        }
        let mut buf = [0u8; 8];
        encoder(NiftiType::Complex64).unwrap()(Sample::Complex(Complex::new(1.5, -2.)), &mut buf);
        assert_eq!(
            decoder(NiftiType::Complex64).unwrap()(&buf),
            Sample::Complex(Complex::new(1.5, -2.))
        );
    }

    #[test]
    fn unsupported_types() {
        assert!(decoder(NiftiType::Rgb24).is_err());
        assert!(encoder(NiftiType::Float128).is_err());
    }
}
