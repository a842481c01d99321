//! Closed sets of codes defined by the NIfTI standard.
//!
//! Each enum maps to and from the integer stored on disk. Lookups of
//! unknown codes fail with [`NiftiError::InvalidCode`] rather than
//! falling back to a default value.
//!
//! [`NiftiError::InvalidCode`]: ../error/enum.NiftiError.html

use crate::error::{NiftiError, Result};
use num_traits::FromPrimitive;

/// Data type of the voxels of a NIfTI volume.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum NiftiType {
    /// unsigned char.
    Uint8 = 2,
    /// signed short.
    Int16 = 4,
    /// signed int.
    Int32 = 8,
    /// 32 bit float.
    Float32 = 16,
    /// 64 bit complex = 2 32 bit floats.
    Complex64 = 32,
    /// 64 bit float = double.
    Float64 = 64,
    /// 3 8 bit bytes.
    Rgb24 = 128,
    /// signed char.
    Int8 = 256,
    /// unsigned short.
    Uint16 = 512,
    /// unsigned int.
    Uint32 = 768,
    /// signed long long.
    Int64 = 1024,
    /// unsigned long long.
    Uint64 = 1280,
    /// 128 bit float = long double.
    Float128 = 1536,
    /// 128 bit complex = 2 64 bit floats.
    Complex128 = 1792,
    /// 256 bit complex = 2 128 bit floats
    Complex256 = 2048,
    /// 4 8 bit bytes.
    Rgba32 = 2304,
}

/// Registry row for a data type.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TypeInfo {
    /// On-disk `datatype` code.
    pub code: i16,
    /// Size of one element in bytes.
    pub size: usize,
    /// Granularity of byte swapping, 0 if the type is never swapped.
    pub swap_size: usize,
    /// Human-readable name.
    pub name: &'static str,
}

impl NiftiType {
    /// Look up a data type by its on-disk code.
    ///
    /// # Errors
    ///
    /// `InvalidCode` if no data type has this code.
    pub fn from_code(code: i16) -> Result<Self> {
        FromPrimitive::from_i16(code).ok_or(NiftiError::InvalidCode("datatype", i64::from(code)))
    }

    /// The full registry row of this data type.
    pub fn info(self) -> TypeInfo {
        use self::NiftiType::*;
        let (size, swap_size, name) = match self {
            Uint8 => (1, 0, "UINT8"),
            Int16 => (2, 2, "INT16"),
            Int32 => (4, 4, "INT32"),
            Float32 => (4, 4, "FLOAT32"),
            Complex64 => (8, 4, "COMPLEX64"),
            Float64 => (8, 8, "FLOAT64"),
            Rgb24 => (3, 0, "RGB24"),
            Int8 => (1, 0, "INT8"),
            Uint16 => (2, 2, "UINT16"),
            Uint32 => (4, 4, "UINT32"),
            Int64 => (8, 8, "INT64"),
            Uint64 => (8, 8, "UINT64"),
            Float128 => (16, 16, "FLOAT128"),
            Complex128 => (16, 8, "COMPLEX128"),
            Complex256 => (32, 16, "COMPLEX256"),
            Rgba32 => (4, 0, "RGBA32"),
        };
        TypeInfo {
            code: self.code(),
            size,
            swap_size,
            name,
        }
    }

    /// The on-disk code.
    pub fn code(self) -> i16 {
        self as i16
    }

    /// Retrieve the size of an element of this data type, in bytes.
    pub fn size_of(self) -> usize {
        self.info().size
    }

    /// Retrieve the byte swapping granularity of this data type. Complex
    /// types swap each component on its own, byte-sized types are never
    /// swapped (0).
    pub fn swap_size(self) -> usize {
        self.info().swap_size
    }

    /// Whether this data type holds complex numbers.
    pub fn is_complex(self) -> bool {
        matches!(
            self,
            NiftiType::Complex64 | NiftiType::Complex128 | NiftiType::Complex256
        )
    }

    /// The name of this data type, as used in header dumps.
    pub fn name(self) -> &'static str {
        self.info().name
    }
}

/// An enum type which represents a unit type.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum Unit {
    /// NIFTI code for unspecified units.
    Unknown = 0,
    /* Space codes are multiples of 1. */
    /// NIFTI code for meters.
    Meter = 1,
    /// NIFTI code for millimeters.
    Mm = 2,
    /// NIFTI code for micrometers.
    Micron = 3,
    /* Time codes are multiples of 8. */
    /// NIFTI code for seconds.
    Sec = 8,
    /// NIFTI code for milliseconds.
    Msec = 16,
    /// NIFTI code for microseconds.
    Usec = 24,
    /* These units are for spectral data: */
    /// NIFTI code for Hertz.
    Hz = 32,
    /// NIFTI code for ppm.
    Ppm = 40,
    /// NIFTI code for radians per second.
    Rads = 48,
}

impl Unit {
    /// Look up the spatial unit packed in the low bits of `xyzt_units`.
    pub fn space_from_xyzt(xyzt_units: i32) -> Result<Self> {
        let code = xyzt_units & 0x07;
        FromPrimitive::from_i32(code)
            .ok_or(NiftiError::InvalidCode("xyzt units (space)", i64::from(code)))
    }

    /// Look up the temporal unit packed in `xyzt_units`.
    pub fn time_from_xyzt(xyzt_units: i32) -> Result<Self> {
        let code = xyzt_units & 0x38;
        FromPrimitive::from_i32(code)
            .ok_or(NiftiError::InvalidCode("xyzt units (time)", i64::from(code)))
    }

    /// The unit's symbol.
    pub fn name(self) -> &'static str {
        match self {
            Unit::Unknown => "Unknown",
            Unit::Meter => "m",
            Unit::Mm => "mm",
            Unit::Micron => "um",
            Unit::Sec => "s",
            Unit::Msec => "ms",
            Unit::Usec => "us",
            Unit::Hz => "Hz",
            Unit::Ppm => "ppm",
            Unit::Rads => "rad/s",
        }
    }
}

/// An enum type for representing a NIFTI intent code.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum Intent {
    /// No intention is indicated.
    None = 0,
    /// Correlation coefficient R (1 param): p1 = degrees of freedom.
    Correl = 2,
    /// Student t statistic (1 param): p1 = DOF.
    Ttest = 3,
    /// Fisher F statistic (2 params).
    Ftest = 4,
    /// Standard normal (0 params).
    Zscore = 5,
    /// Chi-squared (1 param): p1 = DOF.
    Chisq = 6,
    /// Beta distribution (2 params).
    Beta = 7,
    /// Binomial distribution (2 params).
    Binom = 8,
    /// Gamma distribution (2 params).
    Gamma = 9,
    /// Poisson distribution (1 param).
    Poisson = 10,
    /// Normal distribution (2 params).
    Normal = 11,
    /// Noncentral F statistic (3 params).
    FtestNonc = 12,
    /// Noncentral chi-squared statistic (2 params).
    ChisqNonc = 13,
    /// Logistic distribution (2 params).
    Logistic = 14,
    /// Laplace distribution (2 params).
    Laplace = 15,
    /// Uniform distribution.
    Uniform = 16,
    /// Noncentral t statistic (2 params).
    TtestNonc = 17,
    /// Weibull distribution (3 params).
    Weibull = 18,
    /// Chi distribution (1 param).
    Chi = 19,
    /// Inverse Gaussian (2 params).
    Invgauss = 20,
    /// Extreme value type I (2 params).
    Extval = 21,
    /// Data is a p-value.
    Pval = 22,
    /// Data is ln(p-value).
    Logpval = 23,
    /// Data is log10(p-value).
    Log10pval = 24,
    /// Each voxel is an estimate of some parameter.
    Estimate = 1001,
    /// Each voxel is an index into a set of labels.
    Label = 1002,
    /// Each voxel is an index into the NeuroNames label set.
    Neuroname = 1003,
    /// An M x N matrix at each voxel, stored along the 5th dimension.
    Genmatrix = 1004,
    /// An N x N symmetric matrix at each voxel.
    Symmatrix = 1005,
    /// A displacement vector at each voxel.
    Dispvect = 1006,
    /// Any other kind of vector at each voxel.
    Vector = 1007,
    /// Each voxel is a spatial coordinate.
    Pointset = 1008,
    /// Each voxel is a triple of indexes into a pointset.
    Triangle = 1009,
    /// Each voxel is a quaternion.
    Quaternion = 1010,
    /// Dimensionless value.
    Dimless = 1011,
    /// GIFTI time series.
    TimeSeries = 2001,
    /// GIFTI node index.
    NodeIndex = 2002,
    /// GIFTI RGB triplet.
    RgbVector = 2003,
    /// GIFTI RGBA vector.
    RgbaVector = 2004,
    /// GIFTI shape value.
    Shape = 2005,
}

impl Intent {
    /// Look up an intent by its on-disk code.
    pub fn from_code(code: i32) -> Result<Self> {
        FromPrimitive::from_i32(code).ok_or(NiftiError::InvalidCode("intent", i64::from(code)))
    }

    /// Check whether this intent code are used for statistics.
    pub fn is_statcode(self) -> bool {
        self as i16 >= 2 && self as i16 <= 24
    }

    /// The long name of this intent.
    pub fn name(self) -> &'static str {
        use self::Intent::*;
        match self {
            None => "None",
            Correl => "Correlation statistic",
            Ttest => "T-statistic",
            Ftest => "F-statistic",
            Zscore => "Z-score",
            Chisq => "Chi-squared distribution",
            Beta => "Beta distribution",
            Binom => "Binomial distribution",
            Gamma => "Gamma distribution",
            Poisson => "Poisson distribution",
            Normal => "Normal distribution",
            FtestNonc => "F-statistic noncentral",
            ChisqNonc => "Chi-squared noncentral",
            Logistic => "Logistic distribution",
            Laplace => "Laplace distribution",
            Uniform => "Uniform distribution",
            TtestNonc => "T-statistic noncentral",
            Weibull => "Weibull distribution",
            Chi => "Chi distribution",
            Invgauss => "Inverse Gaussian distribution",
            Extval => "Extreme Value distribution",
            Pval => "P-value",
            Logpval => "Log P-value",
            Log10pval => "Log10 P-value",
            Estimate => "Estimate",
            Label => "Label index",
            Neuroname => "NeuroNames index",
            Genmatrix => "General matrix",
            Symmatrix => "Symmetric matrix",
            Dispvect => "Displacement vector",
            Vector => "Vector",
            Pointset => "Pointset",
            Triangle => "Triangle",
            Quaternion => "Quaternion",
            Dimless => "Dimensionless number",
            TimeSeries => "GIFTI Timeseries",
            NodeIndex => "GIFTI Node Index",
            RgbVector => "GIFTI RGB Vector",
            RgbaVector => "GIFTI RGBA Vector",
            Shape => "GIFTI Shape",
        }
    }
}

/// Provenance of an affine transform.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, FromPrimitive)]
pub enum XForm {
    /// Arbitrary coordinates.
    Unknown = 0,
    /// Scanner-based anatomical coordinates
    ScannerAnat = 1,
    /// Coordinates aligned to another file's,
    /// or to anatomical "truth".
    AlignedAnat = 2,
    /// Coordinates aligned to Talairach-Tournoux
    /// Atlas; (0,0,0)=AC, etc.
    Talairach = 3,
    /// MNI 152 normalized coordinates.
    Mni152 = 4,
}

impl XForm {
    /// Look up a transform provenance by its on-disk code.
    pub fn from_code(code: i32) -> Result<Self> {
        FromPrimitive::from_i32(code).ok_or(NiftiError::InvalidCode("xform", i64::from(code)))
    }

    /// The name of this provenance code.
    pub fn name(self) -> &'static str {
        match self {
            XForm::Unknown => "Unknown",
            XForm::ScannerAnat => "Scanner Anatomy",
            XForm::AlignedAnat => "Aligned Anatomy",
            XForm::Talairach => "Talairach",
            XForm::Mni152 => "MNI 152",
        }
    }
}

/// An enum type for representing the slice order.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum SliceOrder {
    /// NIFTI_SLICE_UNKNOWN
    Unknown = 0,
    /// NIFTI_SLICE_SEQ_INC
    SeqInc = 1,
    /// NIFTI_SLICE_SEQ_DEC
    SeqDec = 2,
    /// NIFTI_SLICE_ALT_INC
    AltInc = 3,
    /// NIFTI_SLICE_ALT_DEC
    AltDec = 4,
    /// NIFTI_SLICE_ALT_INC2
    AltInc2 = 5,
    /// NIFTI_SLICE_ALT_DEC2
    AltDec2 = 6,
}

impl SliceOrder {
    /// Look up a slice order by its on-disk code.
    pub fn from_code(code: i32) -> Result<Self> {
        FromPrimitive::from_i32(code).ok_or(NiftiError::InvalidCode("slice order", i64::from(code)))
    }

    /// The name of this slice order.
    pub fn name(self) -> &'static str {
        match self {
            SliceOrder::Unknown => "unknown",
            SliceOrder::SeqInc => "sequential_increasing",
            SliceOrder::SeqDec => "sequential_decreasing",
            SliceOrder::AltInc => "alternating_increasing",
            SliceOrder::AltDec => "alternating_decreasing",
            SliceOrder::AltInc2 => "alternating_increasing_2",
            SliceOrder::AltDec2 => "alternating_decreasing_2",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_sizes() {
        assert_eq!(NiftiType::Uint8.size_of(), 1);
        assert_eq!(NiftiType::Rgb24.size_of(), 3);
        assert_eq!(NiftiType::Complex64.size_of(), 8);
        assert_eq!(NiftiType::Complex64.swap_size(), 4);
        assert_eq!(NiftiType::Complex128.swap_size(), 8);
        assert_eq!(NiftiType::Complex256.size_of(), 32);
        assert_eq!(NiftiType::Rgba32.swap_size(), 0);
        assert_eq!(NiftiType::Float128.swap_size(), 16);
    }

    #[test]
    fn registry_codes() {
        let codes = [
            2, 4, 8, 16, 32, 64, 128, 256, 512, 768, 1024, 1280, 1536, 1792, 2048, 2304,
        ];
        for &code in &codes {
            let t = NiftiType::from_code(code).unwrap();
            assert_eq!(t.code(), code);
            assert_eq!(t.info().code, code);
        }
        assert_eq!(NiftiType::Complex128.info().name, "COMPLEX128");
        assert!(NiftiType::from_code(3).is_err());
        assert!(NiftiType::from_code(0).is_err());
    }

    #[test]
    fn units_from_xyzt() {
        assert_eq!(Unit::space_from_xyzt(10).unwrap(), Unit::Mm);
        assert_eq!(Unit::time_from_xyzt(10).unwrap(), Unit::Sec);
        assert_eq!(Unit::time_from_xyzt(0x18).unwrap(), Unit::Usec);
        assert!(Unit::space_from_xyzt(7).is_err());
    }

    #[test]
    fn names() {
        assert_eq!(Intent::Ttest.name(), "T-statistic");
        assert_eq!(XForm::Mni152.name(), "MNI 152");
        assert_eq!(SliceOrder::AltDec2.name(), "alternating_decreasing_2");
        assert!(Intent::from_code(25).is_err());
        assert!(XForm::from_code(5).is_err());
    }
}
