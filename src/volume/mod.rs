//! Reading and writing NIfTI volumes on disk.
//!
//! A [`NiftiFile`] holds a header and its extensions, and moves voxel data
//! between the file and memory one rectangular region at a time. Both the
//! single file layout (`.nii`) and the header/image pair (`.hdr` and `.img`)
//! are supported, each optionally compressed with gzip (`.gz`).
//!
//! Voxels go through the [`DataElement`] API, which converts from the
//! on-disk data type to the type held in memory while applying the scaling
//! declared in the header.
//!
//! # Example
//!
//! ```no_run
//! use nrecon::{Mode, NiftiFile};
//! # use nrecon::Result;
//! # fn run() -> Result<()> {
//! let mut file = NiftiFile::new();
//! file.open("scan.nii.gz", Mode::Read)?;
//! // the first slice of the first volume
//! let slice: Vec<f32> = file.read_voxels(&[0, 0, 0], &[nrecon::ALL, nrecon::ALL, 1])?;
//! file.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`NiftiFile`]: ./struct.NiftiFile.html
//! [`DataElement`]: ./element/trait.DataElement.html

pub mod element;
mod region;

pub use self::element::{from_disk, to_disk, DataElement, Sample};

use self::element::{decoder, encoder};
use self::region::RegionPlan;
use crate::array::StridedView;
use crate::error::{NiftiError, Result};
use crate::extension::{read_extensions, write_extensions, Extension};
use crate::header::{Nifti1Header, Nifti2Header, NiftiHeader, NiftiVersion, MAX_RANK};
use crate::util::{is_gz_file, swap_bytes, Endianness};
use crate::zipfile::{FileMode, TransparentFile};
use quick_error::ResultExt;
use std::ffi::OsString;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// The state of a NIfTI file.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Mode {
    /// No file is open.
    Closed,
    /// Open for reading the header and voxel data.
    Read,
    /// Read the header and extensions only. The file is closed right away.
    ReadHeader,
    /// Open for writing. The header is written when opening.
    Write,
}

/// Turn an I/O error with no known path into one naming `path`.
fn on(path: &Path) -> impl FnOnce(NiftiError) -> NiftiError + '_ {
    move |e| match e {
        NiftiError::RawIo(err) => NiftiError::Io(path.to_path_buf(), err),
        e => e,
    }
}

/// Split a path into its base (no extensions), whether it is compressed and
/// whether it is a single `.nii` file.
fn split_path(path: &Path) -> Result<(PathBuf, bool, bool)> {
    let bad = || NiftiError::InvalidFileExtension(path.to_path_buf());
    let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(bad)?;
    let gz = is_gz_file(path);
    let name = if gz { &name[..name.len() - 3] } else { name };
    let dot = name.rfind('.').filter(|&i| i > 0).ok_or_else(bad)?;
    let nii = match &name[dot + 1..] {
        "nii" => true,
        "hdr" | "img" => false,
        _ => return Err(bad()),
    };
    Ok((path.with_file_name(&name[..dot]), gz, nii))
}

/// A NIfTI-1 or NIfTI-2 volume on disk.
///
/// Files start out closed. Setting a header and extensions, then opening
/// for writing, persists them; opening for reading loads them. Voxel data
/// moves through [`read_voxels`] and [`write_voxels`] while the file is
/// open, and [`close`] completes the file. Dropping an open file closes it.
///
/// [`read_voxels`]: #method.read_voxels
/// [`write_voxels`]: #method.write_voxels
/// [`close`]: #method.close
#[derive(Debug)]
pub struct NiftiFile {
    base_path: PathBuf,
    gz: bool,
    nii: bool,
    version: NiftiVersion,
    endianness: Endianness,
    header: NiftiHeader,
    extensions: Vec<Extension>,
    file: Option<TransparentFile>,
    mode: Mode,
}

impl Default for NiftiFile {
    fn default() -> Self {
        NiftiFile {
            base_path: PathBuf::new(),
            gz: false,
            nii: true,
            version: NiftiVersion::Nifti1,
            endianness: Endianness::native(),
            header: NiftiHeader::default(),
            extensions: Vec::new(),
            file: None,
            mode: Mode::Closed,
        }
    }
}

impl NiftiFile {
    /// A closed file with a default header.
    pub fn new() -> Self {
        Self::default()
    }

    /// A closed file with the given header, ready to be opened for writing.
    pub fn with_header(header: NiftiHeader) -> Self {
        let mut file = Self::default();
        file.header = header;
        file
    }

    /// Open the file at `path` for reading, loading its header.
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = Self::new();
        file.open(path, Mode::Read)?;
        Ok(file)
    }

    /// Create the file at `path` with the given header, and open it for
    /// writing.
    pub fn create<P: AsRef<Path>>(path: P, header: NiftiHeader) -> Result<Self> {
        let mut file = Self::with_header(header);
        file.open(path, Mode::Write)?;
        Ok(file)
    }

    /// Select the header layout used when writing.
    pub fn with_version(mut self, version: NiftiVersion) -> Self {
        self.version = version;
        self
    }

    /// Select the byte order used when writing. Files are written in the
    /// native byte order by default.
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// The header.
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// Replace the header.
    ///
    /// # Errors
    ///
    /// `State` if the file is open.
    pub fn set_header(&mut self, header: NiftiHeader) -> Result<()> {
        if self.is_open() {
            return Err(NiftiError::State("cannot change the header of an open file"));
        }
        self.header = header;
        Ok(())
    }

    /// The extensions, in file order.
    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Append an extension.
    ///
    /// # Errors
    ///
    /// `State` if the file is open.
    pub fn add_extension(&mut self, extension: Extension) -> Result<()> {
        if self.is_open() {
            return Err(NiftiError::State("cannot change the extensions of an open file"));
        }
        self.extensions.push(extension);
        Ok(())
    }

    /// Replace the extensions.
    ///
    /// # Errors
    ///
    /// `State` if the file is open.
    pub fn set_extensions(&mut self, extensions: Vec<Extension>) -> Result<()> {
        if self.is_open() {
            return Err(NiftiError::State("cannot change the extensions of an open file"));
        }
        self.extensions = extensions;
        Ok(())
    }

    /// Remove all extensions.
    ///
    /// # Errors
    ///
    /// `State` if the file is open.
    pub fn clear_extensions(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(NiftiError::State("cannot change the extensions of an open file"));
        }
        self.extensions.clear();
        Ok(())
    }

    /// Sum of the stored sizes of all extensions.
    pub fn total_extension_size(&self) -> usize {
        self.extensions.iter().map(Extension::size).sum()
    }

    /// The header layout, as read or to be written.
    pub fn version(&self) -> NiftiVersion {
        self.version
    }

    /// The byte order, as read or to be written.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The current state.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the file is open for reading or writing.
    pub fn is_open(&self) -> bool {
        self.mode != Mode::Closed
    }

    /// Whether the data is compressed with gzip.
    pub fn is_gz(&self) -> bool {
        self.gz
    }

    /// Whether the header and the data share a single `.nii` file.
    pub fn is_nii(&self) -> bool {
        self.nii
    }

    /// The path without its `.nii`, `.hdr` or `.img` extension and `.gz`
    /// suffix.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// The file holding the header.
    pub fn header_path(&self) -> PathBuf {
        self.derived_path(if self.nii { "nii" } else { "hdr" })
    }

    /// The file holding the voxel data.
    pub fn image_path(&self) -> PathBuf {
        self.derived_path(if self.nii { "nii" } else { "img" })
    }

    fn derived_path(&self, ext: &str) -> PathBuf {
        let mut path = OsString::from(self.base_path.as_os_str());
        path.push(".");
        path.push(ext);
        if self.gz {
            path.push(".gz");
        }
        PathBuf::from(path)
    }

    /// Open the file at `path`. The extension of the path selects the
    /// layout: `.nii` for a single file, `.hdr` or `.img` for a pair, with an
    /// optional `.gz` suffix for compression.
    ///
    /// Opening for reading loads the header and extensions, detecting the
    /// version and byte order. [`Mode::ReadHeader`] stops there and leaves
    /// the file closed. Opening for writing persists the current header and
    /// extensions, truncating any existing file.
    ///
    /// # Errors
    ///
    /// - `State` if the file is already open, or `mode` is `Closed`.
    /// - `InvalidFileExtension` for an unrecognized path.
    /// - `InvalidFormat` for a malformed header or extensions.
    /// - `Io` naming the file on I/O failure.
    ///
    /// [`Mode::ReadHeader`]: ./enum.Mode.html#variant.ReadHeader
    pub fn open<P: AsRef<Path>>(&mut self, path: P, mode: Mode) -> Result<()> {
        if self.is_open() {
            return Err(NiftiError::State("file is already open"));
        }
        let (base_path, gz, nii) = split_path(path.as_ref())?;
        self.base_path = base_path;
        self.gz = gz;
        self.nii = nii;

        match mode {
            Mode::Closed => Err(NiftiError::State("cannot open a file in closed mode")),
            Mode::Read | Mode::ReadHeader => self.open_read(mode),
            Mode::Write => self.open_write(),
        }
    }

    fn open_read(&mut self, mode: Mode) -> Result<()> {
        let path = self.header_path();
        log::debug!("Opening {} for reading", path.display());
        let mut file = TransparentFile::open(&path, FileMode::Read, self.gz)?;

        let mut sizeof_hdr = [0u8; 4];
        file.read_exact(&mut sizeof_hdr).context(path.as_path())?;
        let (version, endianness) = NiftiVersion::detect(sizeof_hdr)?;
        let mut header = {
            let source = (&sizeof_hdr[..]).chain(&mut file);
            match version {
                NiftiVersion::Nifti1 => {
                    let raw = Nifti1Header::from_reader(source, endianness).map_err(on(&path))?;
                    check_layout(version, &raw.magic, self.nii, &path)?;
                    NiftiHeader::from_nifti1(&raw)?
                }
                NiftiVersion::Nifti2 => {
                    let raw = Nifti2Header::from_reader(source, endianness).map_err(on(&path))?;
                    check_layout(version, &raw.magic, self.nii, &path)?;
                    NiftiHeader::from_nifti2(&raw)?
                }
            }
        };
        log::debug!("Found a {:?} header in {:?} byte order", version, endianness);

        let target = if self.nii {
            if header.vox_offset() < version.header_size() {
                log::warn!(
                    "Voxel offset {} overlaps the header, using {}",
                    header.vox_offset(),
                    version.header_size()
                );
                header.force_vox_offset(version.header_size());
            }
            header.vox_offset() as u64
        } else {
            let len = file.seek(SeekFrom::End(0)).context(path.as_path())?;
            let _ = file
                .seek(SeekFrom::Start(version.header_size() as u64))
                .context(path.as_path())?;
            len
        };
        let extensions = read_extensions(&mut file, endianness, target).map_err(on(&path))?;

        self.version = version;
        self.endianness = endianness;
        self.header = header;
        self.extensions = extensions;

        if mode == Mode::ReadHeader {
            file.finish().context(path.as_path())?;
            return Ok(());
        }
        if !self.nii {
            file.finish().context(path.as_path())?;
            file = TransparentFile::open(self.image_path(), FileMode::Read, self.gz)?;
        }
        self.file = Some(file);
        self.mode = Mode::Read;
        Ok(())
    }

    fn open_write(&mut self) -> Result<()> {
        let path = self.header_path();
        log::debug!("Opening {} for writing", path.display());
        let extension_size = self.total_extension_size();
        self.header.set_magic(self.version, self.nii);
        self.header
            .set_vox_offset(self.version, self.nii, extension_size);

        // a header which does not fit the layout must leave no file behind
        let mut head = Vec::with_capacity(self.version.header_size() + 4 + extension_size);
        match self.version {
            NiftiVersion::Nifti1 => self.header.to_nifti1()?.write_to(&mut head, self.endianness)?,
            NiftiVersion::Nifti2 => self.header.to_nifti2()?.write_to(&mut head, self.endianness)?,
        }
        let _ = write_extensions(&mut head, self.endianness, &self.extensions)?;

        let mut file = TransparentFile::open(&path, FileMode::Write, self.gz)?;
        let _ = file.write_bytes(&head).context(path.as_path())?;
        let expected = (self.version.header_size() + 4 + extension_size) as u64;
        let pos = file.tell().context(path.as_path())?;
        if pos != expected {
            return Err(NiftiError::InvalidFormat(format!(
                "header and extensions end at {}, expected {}",
                pos, expected
            )));
        }

        if !self.nii {
            file.finish().context(path.as_path())?;
            file = TransparentFile::open(self.image_path(), FileMode::Write, self.gz)?;
        }
        self.file = Some(file);
        self.mode = Mode::Write;
        Ok(())
    }

    /// Close the file. A file open for writing is padded with zeros up to
    /// the full size of the voxel data.
    ///
    /// # Errors
    ///
    /// `State` if the file is already closed, `Io` on I/O failure.
    pub fn close(&mut self) -> Result<()> {
        let mode = std::mem::replace(&mut self.mode, Mode::Closed);
        let mut file = match (mode, self.file.take()) {
            (Mode::Closed, _) | (_, None) => {
                return Err(NiftiError::State("file is already closed"))
            }
            (_, Some(file)) => file,
        };
        let path = file.path().to_path_buf();
        if mode == Mode::Write {
            let end = (self.header.vox_offset() + self.header.data_size()) as u64;
            let pos = file.seek(SeekFrom::End(0)).context(path.as_path())?;
            if pos < end {
                log::debug!("Padding {} to {} bytes", path.display(), end);
                let _ = file.seek(SeekFrom::Start(end - 1)).context(path.as_path())?;
                let _ = file.write_bytes(&[0]).context(path.as_path())?;
            }
        }
        file.finish().context(path.as_path())?;
        log::debug!("Closed {}", path.display());
        Ok(())
    }

    /// Open another handle to the same file, in the same state and at the
    /// same position.
    ///
    /// # Errors
    ///
    /// `State` if the file is open for writing, since reopening would
    /// truncate it.
    pub fn try_clone(&mut self) -> Result<Self> {
        let mut clone = NiftiFile {
            base_path: self.base_path.clone(),
            gz: self.gz,
            nii: self.nii,
            version: self.version,
            endianness: self.endianness,
            header: self.header.clone(),
            extensions: self.extensions.clone(),
            file: None,
            mode: Mode::Closed,
        };
        match self.mode {
            Mode::Closed | Mode::ReadHeader => Ok(clone),
            Mode::Write => Err(NiftiError::State("cannot clone a file open for writing")),
            Mode::Read => {
                let path = self.image_path();
                let pos = self.file_mut()?.tell().context(path.as_path())?;
                let mut file = TransparentFile::open(&path, FileMode::Read, self.gz)?;
                let _ = file.seek(SeekFrom::Start(pos)).context(path.as_path())?;
                clone.file = Some(file);
                clone.mode = Mode::Read;
                Ok(clone)
            }
        }
    }

    fn file_mut(&mut self) -> Result<&mut TransparentFile> {
        self.file.as_mut().ok_or(NiftiError::State("file is not open"))
    }

    fn expect_mode(&self, mode: Mode) -> Result<()> {
        if self.mode == mode {
            Ok(())
        } else if mode == Mode::Read {
            Err(NiftiError::State("file is not open for reading"))
        } else {
            Err(NiftiError::State("file is not open for writing"))
        }
    }

    /// Move the file cursor to the voxel at `index`. Missing trailing axes
    /// are 0.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if the index is outside the volume, `State` if the file
    /// is closed.
    pub fn seek_to_voxel(&mut self, index: &[usize]) -> Result<()> {
        let dims = self.header.full_dims();
        if index.len() > MAX_RANK || index.iter().zip(dims.iter()).any(|(i, d)| i >= d) {
            return Err(NiftiError::OutOfBounds {
                index: index.to_vec(),
                dims: self.header.dims().to_vec(),
            });
        }
        let linear: usize = index
            .iter()
            .zip(self.header.strides().iter())
            .map(|(i, s)| i * s)
            .sum();
        let offset = (self.header.vox_offset() + linear * self.header.voxel_bytes()) as u64;
        let path = self.image_path();
        let _ = self.file_mut()?.seek(SeekFrom::Start(offset)).context(path.as_path())?;
        Ok(())
    }

    /// Read the region starting at `start` with extent `size`, in logical
    /// order. Missing trailing axes start at 0 with size 1, and a size of
    /// [`ALL`] takes the whole axis.
    ///
    /// # Errors
    ///
    /// - `State` if the file is not open for reading.
    /// - `ZeroSize` or `OutOfBounds` for an invalid region.
    /// - `UnsupportedDataType` if the on-disk type cannot be decoded.
    /// - `Io` on I/O failure, including a file shorter than its header
    ///   declares.
    ///
    /// [`ALL`]: ../array/constant.ALL.html
    pub fn read_voxels<T: DataElement>(
        &mut self,
        start: &[usize],
        size: &[usize],
    ) -> Result<Vec<T>> {
        self.expect_mode(Mode::Read)?;
        let plan = RegionPlan::new(self.header.full_dims(), start, size)?;
        self.read_region(&plan)
    }

    /// Read the region starting at `start` with extent `size` into a view,
    /// in logical order.
    ///
    /// # Errors
    ///
    /// As [`read_voxels`], plus `SizeMismatch` if the view does not hold as
    /// many elements as the region.
    ///
    /// [`read_voxels`]: #method.read_voxels
    pub fn read_voxels_into_view<T: DataElement, const R: usize>(
        &mut self,
        start: &[usize],
        size: &[usize],
        view: &StridedView<T, R>,
    ) -> Result<()> {
        self.expect_mode(Mode::Read)?;
        let plan = RegionPlan::new(self.header.full_dims(), start, size)?;
        if plan.len() != view.len() {
            return Err(NiftiError::SizeMismatch {
                expected: plan.len(),
                got: view.len(),
            });
        }
        let values: Vec<T> = self.read_region(&plan)?;
        view.assign(values)
    }

    /// Read `count` consecutive volumes along the fourth axis, from `first`.
    /// A `count` of 0 reads through the last volume.
    pub fn read_volumes<T: DataElement>(&mut self, first: usize, count: usize) -> Result<Vec<T>> {
        let (start, size) = self.volume_region(first, count)?;
        self.read_voxels(&start, &size)
    }

    /// Read the whole voxel data.
    pub fn read_all<T: DataElement>(&mut self) -> Result<Vec<T>> {
        let dims = self.header.full_dims();
        self.read_voxels(&[], &dims)
    }

    /// Read the whole voxel data into an array of the volume's shape.
    #[cfg(feature = "ndarray_volumes")]
    pub fn read_ndarray<T: DataElement>(&mut self) -> Result<ndarray::ArrayD<T>> {
        use ndarray::{ArrayD, IxDyn, ShapeBuilder};
        let data = self.read_all()?;
        let dims = self.header.dims().to_vec();
        let got = data.len();
        ArrayD::from_shape_vec(IxDyn(&dims).f(), data).map_err(|_| NiftiError::SizeMismatch {
            expected: self.header.voxel_count(),
            got,
        })
    }

    /// Write `values`, in logical order, to the region starting at `start`
    /// with extent `size`. Values may come from a slice, a vector or a
    /// [`StridedView`] iterator.
    ///
    /// # Errors
    ///
    /// - `State` if the file is not open for writing.
    /// - `ZeroSize` or `OutOfBounds` for an invalid region.
    /// - `SizeMismatch` if `values` does not hold as many elements as the
    ///   region, in which case nothing is written.
    /// - `UnsupportedDataType` if the on-disk type cannot be encoded.
    /// - `Io` on I/O failure, such as seeking backwards in a compressed file.
    ///
    /// [`StridedView`]: ../array/struct.StridedView.html
    pub fn write_voxels<T, I>(&mut self, start: &[usize], size: &[usize], values: I) -> Result<()>
    where
        T: DataElement,
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        self.expect_mode(Mode::Write)?;
        let plan = RegionPlan::new(self.header.full_dims(), start, size)?;
        let values = values.into_iter();
        if values.len() != plan.len() {
            return Err(NiftiError::SizeMismatch {
                expected: plan.len(),
                got: values.len(),
            });
        }
        self.write_region(&plan, values)
    }

    /// Write `count` consecutive volumes along the fourth axis, from `first`.
    /// A `count` of 0 writes through the last volume.
    pub fn write_volumes<T, I>(&mut self, first: usize, count: usize, values: I) -> Result<()>
    where
        T: DataElement,
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let (start, size) = self.volume_region(first, count)?;
        self.write_voxels(&start, &size, values)
    }

    /// Write the whole voxel data.
    pub fn write_all<T, I>(&mut self, values: I) -> Result<()>
    where
        T: DataElement,
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let dims = self.header.full_dims();
        self.write_voxels(&[], &dims, values)
    }

    fn volume_region(&self, first: usize, count: usize) -> Result<([usize; 4], [usize; 4])> {
        let d = self.header.full_dims();
        if first >= d[3] {
            return Err(NiftiError::OutOfBounds {
                index: vec![0, 0, 0, first],
                dims: self.header.dims().to_vec(),
            });
        }
        let count = if count == 0 { d[3] - first } else { count };
        Ok(([0, 0, 0, first], [d[0], d[1], d[2], count]))
    }

    fn read_region<T: DataElement>(&mut self, plan: &RegionPlan) -> Result<Vec<T>> {
        let datatype = self.header.datatype();
        let decode = decoder(datatype)?;
        let bytes = datatype.size_of();
        let swap = self.endianness != Endianness::native();
        let (slope, inter) = (self.header.scl_slope(), self.header.scl_inter());
        let vox_offset = self.header.vox_offset() as u64;
        let path = self.image_path();
        let file = self.file_mut()?;

        let mut buf = vec![0u8; plan.block_size() * bytes];
        let mut out = Vec::with_capacity(plan.len());
        for first in plan.blocks() {
            let offset = vox_offset + (first * bytes) as u64;
            log::trace!("Reading {} bytes at offset {}", buf.len(), offset);
            let _ = file.seek(SeekFrom::Start(offset)).context(path.as_path())?;
            let n = file.read_bytes(&mut buf).context(path.as_path())?;
            if n < buf.len() {
                return Err(NiftiError::Io(
                    path,
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("expected {} bytes at offset {}, got {}", buf.len(), offset, n),
                    ),
                ));
            }
            if swap {
                swap_bytes(&mut buf, datatype.swap_size());
            }
            out.extend(
                buf.chunks_exact(bytes)
                    .map(|b| from_disk::<T>(decode(b), slope, inter)),
            );
        }
        Ok(out)
    }

    fn write_region<T, I>(&mut self, plan: &RegionPlan, mut values: I) -> Result<()>
    where
        T: DataElement,
        I: Iterator<Item = T>,
    {
        let datatype = self.header.datatype();
        let encode = encoder(datatype)?;
        let bytes = datatype.size_of();
        let swap = self.endianness != Endianness::native();
        let (slope, inter) = (self.header.scl_slope(), self.header.scl_inter());
        let vox_offset = self.header.vox_offset() as u64;
        let path = self.image_path();
        let file = self.file_mut()?;

        let mut buf = vec![0u8; plan.block_size() * bytes];
        for first in plan.blocks() {
            for chunk in buf.chunks_exact_mut(bytes) {
                let value = values.next().ok_or(NiftiError::SizeMismatch {
                    expected: plan.len(),
                    got: plan.len() - 1,
                })?;
                encode(to_disk(value, datatype, slope, inter), chunk);
            }
            if swap {
                swap_bytes(&mut buf, datatype.swap_size());
            }
            let offset = vox_offset + (first * bytes) as u64;
            log::trace!("Writing {} bytes at offset {}", buf.len(), offset);
            let _ = file.seek(SeekFrom::Start(offset)).context(path.as_path())?;
            let _ = file.write_bytes(&buf).context(path.as_path())?;
        }
        Ok(())
    }
}

/// Check the magic string against the version and the file layout implied by
/// the path.
fn check_layout(version: NiftiVersion, magic: &[u8], nii: bool, path: &Path) -> Result<()> {
    let magic_nii = version.check_magic(magic)?;
    if magic_nii != nii {
        log::warn!(
            "Magic string of {} does not match its file layout",
            path.display()
        );
    }
    Ok(())
}

impl Drop for NiftiFile {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                log::warn!("Failed to close {}: {}", self.image_path().display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typedef::NiftiType;
    use pretty_assertions::assert_eq;

    #[test]
    fn path_layouts() {
        let (base, gz, nii) = split_path(Path::new("/data/scan.nii.gz")).unwrap();
        assert_eq!(base, PathBuf::from("/data/scan"));
        assert!(gz);
        assert!(nii);
        let (base, gz, nii) = split_path(Path::new("run.1.img")).unwrap();
        assert_eq!(base, PathBuf::from("run.1"));
        assert!(!gz);
        assert!(!nii);
        assert!(split_path(Path::new("scan.txt")).is_err());
        assert!(split_path(Path::new("scan")).is_err());
        assert!(split_path(Path::new(".nii")).is_err());
    }

    #[test]
    fn derived_paths() {
        let mut file = NiftiFile::new();
        let (base, gz, nii) = split_path(Path::new("a/b.img.gz")).unwrap();
        file.base_path = base;
        file.gz = gz;
        file.nii = nii;
        assert_eq!(file.header_path(), PathBuf::from("a/b.hdr.gz"));
        assert_eq!(file.image_path(), PathBuf::from("a/b.img.gz"));
        assert_eq!(file.base_path(), Path::new("a/b"));
    }

    #[test]
    fn state_errors() {
        let mut file = NiftiFile::new();
        assert!(matches!(file.close(), Err(NiftiError::State(_))));
        assert!(matches!(
            file.read_voxels::<f32>(&[0], &[1]),
            Err(NiftiError::State(_))
        ));
        assert!(matches!(
            file.open("x.nii", Mode::Closed),
            Err(NiftiError::State(_))
        ));
    }

    #[test]
    fn volume_regions() {
        let header = NiftiHeader::new(&[2, 2, 2, 5], &[1.; 4], NiftiType::Uint8).unwrap();
        let file = NiftiFile::with_header(header);
        assert_eq!(
            file.volume_region(1, 0).unwrap(),
            ([0, 0, 0, 1], [2, 2, 2, 4])
        );
        assert_eq!(
            file.volume_region(0, 2).unwrap(),
            ([0, 0, 0, 0], [2, 2, 2, 2])
        );
        assert!(file.volume_region(5, 1).is_err());
    }
}
