//! Reader for Agilent (Varian) FDF images and `.img` directories.
//!
//! An FDF file starts with a text header of C-like declarations, ends the
//! header with a NUL byte, and then holds the raw image data.
//!
//! ```text
//! #!/usr/local/fdf/startup
//! float  rank = 2;
//! char  *storage = "float";
//! float  matrix[] = {128, 128};
//! int    checksum = 0;
//! ```
//!
//! Images reconstructed on the scanner are saved as a `.img` directory with
//! one FDF file per slice (or slab), image and echo, next to the `procpar`
//! table of the acquisition.

use super::procpar::ProcPar;
use crate::affine::{compose, Affine3, Affine4};
use crate::error::{NiftiError, Result};
use crate::util::Endianness;
use byteordered::ByteOrdered;
use nalgebra::Vector3;
use quick_error::ResultExt;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// The first line of every FDF file.
pub const MAGIC: &str = "#!/usr/local/fdf/startup";

/// The declared type of a header field.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum FdfKind {
    /// `int` fields.
    Int,
    /// `float` fields.
    Float,
    /// `char *` fields, holding strings.
    Char,
}

impl FdfKind {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "int" => Some(FdfKind::Int),
            "float" => Some(FdfKind::Float),
            "char" => Some(FdfKind::Char),
            _ => None,
        }
    }

    /// The keyword declaring this kind of field.
    pub fn name(self) -> &'static str {
        match self {
            FdfKind::Int => "int",
            FdfKind::Float => "float",
            FdfKind::Char => "char",
        }
    }
}

/// A single value of a header field.
#[derive(Debug, PartialEq, Clone)]
pub enum FdfValue {
    /// An integer.
    Int(i32),
    /// A single precision real.
    Float(f32),
    /// A string, without its quotes.
    Str(String),
}

impl FdfValue {
    fn parse(kind: FdfKind, text: &str, line: usize) -> Result<Self> {
        let bad = || NiftiError::Fdf(line, format!("bad {} value `{}`", kind.name(), text));
        match kind {
            FdfKind::Int => text.parse().map(FdfValue::Int).map_err(|_| bad()),
            FdfKind::Float => text.parse().map(FdfValue::Float).map_err(|_| bad()),
            FdfKind::Char => {
                if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
                    Ok(FdfValue::Str(text[1..text.len() - 1].to_string()))
                } else {
                    Err(bad())
                }
            }
        }
    }

    /// The value as a number, or `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FdfValue::Int(v) => Some(f64::from(*v)),
            FdfValue::Float(v) => Some(f64::from(*v)),
            FdfValue::Str(_) => None,
        }
    }

    /// The value as a string, or `None` for numbers.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FdfValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FdfValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FdfValue::Int(v) => write!(f, "{}", v),
            FdfValue::Float(v) => write!(f, "{}", v),
            FdfValue::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// Split `text` at every `sep` which is not inside double quotes.
fn split_unquoted(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut from = 0;
    for (i, c) in text.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == sep && !quoted {
            parts.push(&text[from..i]);
            from = i + c.len_utf8();
        }
    }
    parts.push(&text[from..]);
    parts
}

/// A named header field, holding one value or an array of values.
#[derive(Debug, PartialEq, Clone)]
pub struct FdfField {
    name: String,
    kind: FdfKind,
    values: Vec<FdfValue>,
}

impl FdfField {
    /// Parse one declaration. Blank lines and comments give `None`.
    fn parse(text: &str, line: usize) -> Result<Option<Self>> {
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            return Ok(None);
        }
        let err = |reason: &str| NiftiError::Fdf(line, reason.to_string());

        let split = text.find(char::is_whitespace).unwrap_or_else(|| text.len());
        let (word, rest) = text.split_at(split);
        let kind = FdfKind::from_word(word)
            .ok_or_else(|| NiftiError::Fdf(line, format!("unknown field type `{}`", word)))?;
        let eq = rest.find('=').ok_or_else(|| err("missing `=`"))?;
        let name = rest[..eq].trim().trim_start_matches('*').trim();
        let statement = split_unquoted(&rest[eq + 1..], ';');
        if statement.len() < 2 {
            return Err(err("missing `;`"));
        }
        let value = statement[0].trim();

        let (name, items) = match name.strip_suffix("[]") {
            Some(name) => {
                let inner = value
                    .strip_prefix('{')
                    .and_then(|v| v.strip_suffix('}'))
                    .ok_or_else(|| err("array values must be within braces"))?;
                (name.trim(), split_unquoted(inner, ','))
            }
            None => (name, vec![value]),
        };
        if name.is_empty() {
            return Err(err("missing field name"));
        }
        let values = items
            .iter()
            .map(|item| FdfValue::parse(kind, item.trim(), line))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(FdfField {
            name: name.to_string(),
            kind,
            values,
        }))
    }

    /// The field name, without array brackets.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    pub fn kind(&self) -> FdfKind {
        self.kind
    }

    /// All values, in declaration order.
    pub fn values(&self) -> &[FdfValue] {
        &self.values
    }

    /// The value at `index`.
    pub fn value(&self, index: usize) -> Result<&FdfValue> {
        self.values
            .get(index)
            .ok_or_else(|| NiftiError::ParameterIndex {
                name: self.name.clone(),
                index,
                len: self.values.len(),
            })
    }

    /// The numeric value at `index`.
    ///
    /// # Errors
    ///
    /// `ParameterType` for string fields, `ParameterIndex` if there is no
    /// such value.
    pub fn real_value(&self, index: usize) -> Result<f64> {
        self.value(index)?
            .as_f64()
            .ok_or_else(|| NiftiError::ParameterType(self.name.clone(), "numeric"))
    }

    /// The string value at `index`.
    ///
    /// # Errors
    ///
    /// `ParameterType` for numeric fields, `ParameterIndex` if there is no
    /// such value.
    pub fn string_value(&self, index: usize) -> Result<&str> {
        self.value(index)?
            .as_str()
            .ok_or_else(|| NiftiError::ParameterType(self.name.clone(), "string"))
    }
}

impl fmt::Display for FdfField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let star = if self.kind == FdfKind::Char { "*" } else { "" };
        if self.values.len() == 1 {
            return write!(f, "{} {}{} = {};", self.kind.name(), star, self.name, self.values[0]);
        }
        write!(f, "{} {}{}[] = {{", self.kind.name(), star, self.name)?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "}};")
    }
}

/// A single FDF file. Only the header is kept in memory: the data is read
/// on request, and no file handle is held in between.
#[derive(Debug, Clone)]
pub struct FdfFile {
    path: PathBuf,
    fields: BTreeMap<String, FdfField>,
    header_size: u64,
    rank: usize,
    dims: [usize; 3],
    endianness: Endianness,
}

impl FdfFile {
    /// Read the header of the FDF file at `path`.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` without the magic line or the NUL after the header,
    /// for a storage other than 32 bit floats, or a rank other than 2 or 3.
    /// - `Fdf` with the offending line for a malformed declaration.
    /// - `MissingParameter` if `storage`, `rank` or `matrix` are missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = BufReader::new(File::open(path).context(path)?);
        let mut first = Vec::new();
        let _ = file.read_until(b'\n', &mut first).context(path)?;
        if String::from_utf8_lossy(&first).trim_end() != MAGIC {
            return Err(NiftiError::InvalidFormat(format!(
                "missing FDF magic line in {}",
                path.display()
            )));
        }
        let mut text = Vec::new();
        let _ = file.read_until(0, &mut text).context(path)?;
        if text.pop() != Some(0) {
            return Err(NiftiError::InvalidFormat(format!(
                "no end of FDF header in {}",
                path.display()
            )));
        }
        let header_size = (first.len() + text.len() + 1) as u64;

        let mut fields = BTreeMap::new();
        for (i, line) in String::from_utf8_lossy(&text).lines().enumerate() {
            if let Some(field) = FdfField::parse(line, i + 2)? {
                let _ = fields.insert(field.name.clone(), field);
            }
        }
        let mut fdf = FdfFile {
            path: path.to_path_buf(),
            fields,
            header_size,
            rank: 0,
            dims: [1; 3],
            endianness: Endianness::native(),
        };

        let storage = fdf.string_value("storage", 0)?;
        let bits = fdf.real_value("bits", 0).unwrap_or(32.);
        if storage != "float" || bits != 32. {
            return Err(NiftiError::InvalidFormat(format!(
                "unsupported {} bit {} storage in {}",
                bits,
                storage,
                path.display()
            )));
        }
        let matrix = |i: usize| -> Result<usize> { Ok(fdf.real_value("matrix", i)? as usize) };
        let rank = fdf.real_value("rank", 0)? as usize;
        let dims = match rank {
            // 2D data is stored transposed, see `read_data`
            2 => [matrix(1)?, matrix(0)?, 1],
            3 => [matrix(0)?, matrix(1)?, matrix(2)?],
            _ => {
                return Err(NiftiError::InvalidFormat(format!(
                    "unsupported rank {} in {}",
                    rank,
                    path.display()
                )))
            }
        };
        if let Ok(big) = fdf.real_value("bigendian", 0) {
            fdf.endianness = if big != 0. {
                Endianness::Big
            } else {
                Endianness::Little
            };
        }
        fdf.rank = rank;
        fdf.dims = dims;
        log::debug!(
            "Read FDF header of {} bytes from {}, dimensions {:?}",
            header_size,
            path.display(),
            dims
        );
        Ok(fdf)
    }

    /// The path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The number of spatial dimensions, 2 or 3.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The image dimensions. The third is 1 for 2D files.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// The number of data points.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// Whether the file holds no data points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The size of the header, including the magic line and the final NUL.
    pub fn header_size(&self) -> u64 {
        self.header_size
    }

    /// The byte order of the data, from the `bigendian` field. Files without
    /// it are taken as native.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The header fields, sorted by name.
    pub fn fields(&self) -> impl Iterator<Item = &FdfField> {
        self.fields.values()
    }

    /// The field called `name`.
    pub fn field(&self, name: &str) -> Result<&FdfField> {
        self.fields
            .get(name)
            .ok_or_else(|| NiftiError::MissingParameter(name.to_string()))
    }

    /// Shortcut to the numeric value `index` of the field `name`.
    pub fn real_value(&self, name: &str, index: usize) -> Result<f64> {
        self.field(name)?.real_value(index)
    }

    /// Shortcut to the string value `index` of the field `name`.
    pub fn string_value(&self, name: &str, index: usize) -> Result<&str> {
        self.field(name)?.string_value(index)
    }

    /// Read the image data, first dimension fastest.
    pub fn read_data(&self) -> Result<Vec<f32>> {
        let path = self.path.as_path();
        let mut file = File::open(path).context(path)?;
        let _ = file.seek(SeekFrom::Start(self.header_size)).context(path)?;
        let mut bytes = vec![0u8; self.len() * 4];
        file.read_exact(&mut bytes).context(path)?;

        let mut input = ByteOrdered::runtime(&bytes[..], self.endianness);
        let mut raw = Vec::with_capacity(self.len());
        for _ in 0..self.len() {
            raw.push(input.read_f32()?);
        }
        if self.rank == 3 {
            return Ok(raw);
        }

        // 2D data comes transposed, with both axes reversed
        let (d0, d1) = (self.dims[0], self.dims[1]);
        let mut out = Vec::with_capacity(raw.len());
        for i in 0..d1 {
            for j in 0..d0 {
                out.push(raw[(d0 - j - 1) * d1 + d1 - i - 1]);
            }
        }
        Ok(out)
    }
}

impl fmt::Display for FdfFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", MAGIC)?;
        for field in self.fields.values() {
            writeln!(f, "{}", field)?;
        }
        Ok(())
    }
}

/// Rotation from the magnet frame to the user frame, for the Euler angles
/// `psi`, `phi` and `theta` in degrees.
pub fn euler_rotation(psi: f64, phi: f64, theta: f64) -> Affine3 {
    let (sps, cps) = psi.to_radians().sin_cos();
    let (sph, cph) = phi.to_radians().sin_cos();
    let (sth, cth) = theta.to_radians().sin_cos();
    #[rustfmt::skip]
    let r = Affine3::new(
        -cps * sph + sps * cth * cph, -cps * cph - sps * cth * sph, sps * sth,
        sps * sph + cps * cth * cph, sps * cph - cps * cth * sph, cps * sth,
        -sth * cph, sth * sph, cth,
    );
    r
}

/// A `.img` directory of FDF files and its `procpar` table.
#[derive(Debug)]
pub struct FdfImage {
    path: PathBuf,
    procpar: ProcPar,
    prefix: String,
    files: BTreeMap<String, FdfFile>,
    rank: usize,
    dims: [usize; 3],
    slabs: usize,
    images: usize,
    echoes: usize,
    voxdims: [f64; 3],
    transform: Affine4,
}

impl FdfImage {
    /// Open the directory at `path`, which must end in `.img`, reading the
    /// header of every `.fdf` file in it.
    ///
    /// # Errors
    ///
    /// - `InvalidFileExtension` if the path does not end in `.img`.
    /// - `InvalidFormat` if there are no FDF files, or their names do not
    /// share one prefix.
    /// - `MissingParameter` if a geometry parameter is not in `procpar`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = path.to_string_lossy();
        let trimmed = text.trim_end_matches('/');
        if !trimmed.ends_with(".img") {
            return Err(NiftiError::InvalidFileExtension(path.to_path_buf()));
        }
        let path = PathBuf::from(trimmed);
        let procpar = ProcPar::from_file(path.join("procpar"))?;

        let mut prefix: Option<String> = None;
        let mut files = BTreeMap::new();
        for entry in fs::read_dir(&path).context(path.as_path())? {
            let entry = entry.context(path.as_path())?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !name.ends_with(".fdf") {
                continue;
            }
            let end = name
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or_else(|| name.len());
            let stem = &name[..end];
            if prefix.get_or_insert_with(|| stem.to_string()).as_str() != stem {
                return Err(NiftiError::InvalidFormat(format!(
                    "multiple file prefixes in {}",
                    path.display()
                )));
            }
            let file = FdfFile::open(entry.path())?;
            let _ = files.insert(name, file);
        }
        let (rank, file_dims) = match files.values().next() {
            Some(first) => (first.rank(), first.dims()),
            None => {
                return Err(NiftiError::InvalidFormat(format!(
                    "no FDF files in {}",
                    path.display()
                )))
            }
        };

        let slabs = procpar.real_values("pss")?.len();
        let echoes = procpar.real_value("ne", 0)? as usize;
        if slabs == 0 || echoes == 0 {
            return Err(NiftiError::InvalidFormat(format!(
                "no slices or echoes in {}",
                path.display()
            )));
        }
        let images = files.len() / (slabs * echoes);
        let dims = if rank == 2 {
            [file_dims[0], file_dims[1], slabs]
        } else {
            file_dims
        };

        let pp = |name: &str| procpar.real_value(name, 0);
        let mut voxdims = [0.; 3];
        let mut offset = [0.; 3];
        // the readout offset has the opposite sign of the phase offsets
        voxdims[0] = pp("lro")? / dims[0] as f64;
        offset[0] = -pp("pro")? - (pp("lro")? - voxdims[0]) / 2.;
        voxdims[1] = pp("lpe")? / dims[1] as f64;
        offset[1] = pp("ppe")? - (pp("lpe")? - voxdims[1]) / 2.;
        if rank == 2 {
            // thk is in mm, everything else in cm
            voxdims[2] = pp("thk")? / 10. + pp("gap")?;
            offset[2] = procpar
                .real_values("pss")?
                .iter()
                .cloned()
                .fold(f64::INFINITY, f64::min);
        } else {
            voxdims[2] = pp("lpe2")? / dims[2] as f64;
            offset[2] = pp("ppe2")? - (pp("lpe2")? - voxdims[2]) / 2.;
        }
        for v in voxdims.iter_mut().chain(offset.iter_mut()) {
            *v *= 10.;
        }
        let rotation = euler_rotation(pp("psi")?, pp("phi")?, pp("theta")?);
        let zooms = Affine3::from_diagonal(&Vector3::from(voxdims));
        let transform = compose(&(rotation * zooms), &(rotation * Vector3::from(offset)));

        log::debug!(
            "Opened {} with {} files, dimensions {:?}, {} images and {} echoes",
            path.display(),
            files.len(),
            dims,
            images,
            echoes
        );
        Ok(FdfImage {
            path,
            procpar,
            prefix: prefix.unwrap_or_default(),
            files,
            rank,
            dims,
            slabs,
            images,
            echoes,
            voxdims,
            transform,
        })
    }

    /// The path of the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The parameter table.
    pub fn procpar(&self) -> &ProcPar {
        &self.procpar
    }

    /// The number of spatial dimensions of each file.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The spatial dimensions of one volume.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// The number of images, or volumes per echo.
    pub fn images(&self) -> usize {
        self.images
    }

    /// The number of echoes.
    pub fn echoes(&self) -> usize {
        self.echoes
    }

    /// Voxel sizes in mm.
    pub fn voxdims(&self) -> [f64; 3] {
        self.voxdims
    }

    /// The voxel to scanner transform, in mm.
    pub fn transform(&self) -> &Affine4 {
        &self.transform
    }

    /// The number of voxels of one volume.
    pub fn voxels_per_volume(&self) -> usize {
        self.dims.iter().product()
    }

    /// The name of the file holding a slice (or slab) of an image and echo.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if any index is too large.
    pub fn file_name(&self, slab: usize, image: usize, echo: usize) -> Result<String> {
        if slab >= self.slabs || image >= self.images || echo >= self.echoes {
            return Err(NiftiError::OutOfBounds {
                index: vec![slab, image, echo],
                dims: vec![self.slabs, self.images, self.echoes],
            });
        }
        Ok(format!(
            "{}{:03}image{:03}echo{:03}.fdf",
            self.prefix,
            slab + 1,
            image + 1,
            echo + 1
        ))
    }

    /// Read one volume, assembling its slices (or slabs) in order.
    pub fn read_volume(&self, image: usize, echo: usize) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(self.voxels_per_volume());
        for slab in 0..self.slabs {
            let name = self.file_name(slab, image, echo)?;
            let file = self.files.get(&name).ok_or_else(|| {
                NiftiError::InvalidFormat(format!("missing {} in {}", name, self.path.display()))
            })?;
            out.extend(file.read_data()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalar_fields() {
        let f = FdfField::parse("float  rank = 2;", 2).unwrap().unwrap();
        assert_eq!(f.name(), "rank");
        assert_eq!(f.kind(), FdfKind::Float);
        assert_eq!(f.real_value(0).unwrap(), 2.);

        let f = FdfField::parse("char  *storage = \"float\"; ", 3).unwrap().unwrap();
        assert_eq!(f.string_value(0).unwrap(), "float");
        assert!(matches!(f.real_value(0), Err(NiftiError::ParameterType(..))));
        assert_eq!(f.to_string(), "char *storage = \"float\";");

        assert_eq!(FdfField::parse("   ", 4).unwrap(), None);
    }

    #[test]
    fn array_fields() {
        let f = FdfField::parse("int    slices[] = {1, -2, 3};", 2).unwrap().unwrap();
        assert_eq!(
            f.values(),
            &[FdfValue::Int(1), FdfValue::Int(-2), FdfValue::Int(3)][..]
        );
        assert!(matches!(
            f.value(3),
            Err(NiftiError::ParameterIndex { index: 3, len: 3, .. })
        ));

        let f = FdfField::parse("char  *names[] = {\"a, b\", \"c;\"};", 2).unwrap().unwrap();
        assert_eq!(f.string_value(0).unwrap(), "a, b");
        assert_eq!(f.string_value(1).unwrap(), "c;");
        assert_eq!(f.to_string(), "char *names[] = {\"a, b\", \"c;\"};");
    }

    #[test]
    fn malformed_fields() {
        assert!(matches!(FdfField::parse("long x = 1;", 5), Err(NiftiError::Fdf(5, _))));
        assert!(matches!(FdfField::parse("int x = 1", 6), Err(NiftiError::Fdf(6, _))));
        assert!(matches!(FdfField::parse("int x = 1.5;", 7), Err(NiftiError::Fdf(7, _))));
        assert!(matches!(FdfField::parse("int x[] = 1, 2;", 8), Err(NiftiError::Fdf(8, _))));
        assert!(matches!(FdfField::parse("char *s = abc;", 9), Err(NiftiError::Fdf(9, _))));
    }

    #[test]
    fn euler_identity_angles() {
        let r = euler_rotation(0., 0., 0.);
        assert_eq!(r, Affine3::new(0., -1., 0., 1., 0., 0., 0., 0., 1.));
    }
}
