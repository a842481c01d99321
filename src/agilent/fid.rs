//! Reader for Agilent (Varian) FID files and `.fid` bundles.
//!
//! A FID file holds raw k-space data as a big-endian file header followed by
//! blocks. Each block starts with its own header, then holds `ntraces`
//! traces of `np` interleaved real and imaginary points.

use super::procpar::ProcPar;
use crate::error::{NiftiError, Result};
use byteordered::ByteOrdered;
use num_complex::Complex;
use quick_error::ResultExt;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Size of the file header, in bytes.
pub const FILE_HEADER_SIZE: u64 = 32;
/// Size of a block header, in bytes.
pub const BLOCK_HEADER_SIZE: u64 = 28;

/// The type of the stored points.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum FidType {
    /// 16 bit integers.
    Int16,
    /// 32 bit integers.
    Int32,
    /// 32 bit floats.
    Float32,
}

impl FidType {
    fn from_status(status: i16) -> Self {
        if status & 0x8 != 0 {
            FidType::Float32
        } else if status & 0x4 != 0 {
            FidType::Int32
        } else {
            FidType::Int16
        }
    }
}

/// The header at the start of a FID file.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct FidHeader {
    /// Number of blocks.
    pub nblocks: i32,
    /// Number of traces per block.
    pub ntraces: i32,
    /// Number of points per trace, counting real and imaginary parts.
    pub np: i32,
    /// Bytes per point.
    pub ebytes: i32,
    /// Bytes per trace.
    pub tbytes: i32,
    /// Bytes per block, including the block headers.
    pub bbytes: i32,
    /// Software version and file id bits.
    pub vers_id: i16,
    /// Status bits.
    pub status: i16,
    /// Number of block headers per block.
    pub nbheaders: i32,
}

impl FidHeader {
    /// Read the header from a big-endian source.
    pub fn from_reader<S: Read>(source: S) -> Result<Self> {
        let mut input = ByteOrdered::be(source);
        Ok(FidHeader {
            nblocks: input.read_i32()?,
            ntraces: input.read_i32()?,
            np: input.read_i32()?,
            ebytes: input.read_i32()?,
            tbytes: input.read_i32()?,
            bbytes: input.read_i32()?,
            vers_id: input.read_i16()?,
            status: input.read_i16()?,
            nbheaders: input.read_i32()?,
        })
    }
}

impl fmt::Display for FidHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Number of blocks: {}", self.nblocks)?;
        writeln!(f, "Number of traces per block: {}", self.ntraces)?;
        writeln!(f, "Number of points per trace: {}", self.np)?;
        writeln!(f, "Number of bytes per point: {}", self.ebytes)?;
        writeln!(f, "Number of bytes per trace: {}", self.tbytes)?;
        writeln!(f, "Number of bytes per block: {}", self.bbytes)?;
        writeln!(
            f,
            "Status bits: {:016b} Version/ID bits: {:016b}",
            self.status, self.vers_id
        )?;
        writeln!(f, "Number of block headers per block: {}", self.nbheaders)
    }
}

/// The header at the start of each block.
#[derive(Debug, Default, PartialEq, Clone, Copy)]
pub struct BlockHeader {
    /// Scaling factor. Zero means no scaling.
    pub scale: i16,
    /// Status bits.
    pub status: i16,
    /// Block index.
    pub index: i16,
    /// Mode bits.
    pub mode: i16,
    /// Completed transients.
    pub ctcount: i32,
    /// Left phase.
    pub lpval: f32,
    /// Right phase.
    pub rpval: f32,
    /// Level drift correction.
    pub lvl: f32,
    /// Tilt drift correction.
    pub tlt: f32,
}

impl BlockHeader {
    /// Read the header from a big-endian source.
    pub fn from_reader<S: Read>(source: S) -> Result<Self> {
        let mut input = ByteOrdered::be(source);
        Ok(BlockHeader {
            scale: input.read_i16()?,
            status: input.read_i16()?,
            index: input.read_i16()?,
            mode: input.read_i16()?,
            ctcount: input.read_i32()?,
            lpval: input.read_f32()?,
            rpval: input.read_f32()?,
            lvl: input.read_f32()?,
            tlt: input.read_f32()?,
        })
    }
}

/// An open FID file.
#[derive(Debug)]
pub struct FidFile {
    path: PathBuf,
    file: BufReader<File>,
    header: FidHeader,
}

impl FidFile {
    /// Open a FID file and read its header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = BufReader::new(File::open(path).context(path)?);
        let header = FidHeader::from_reader(&mut file).map_err(|e| match e {
            NiftiError::RawIo(err) => NiftiError::Io(path.to_path_buf(), err),
            e => e,
        })?;
        if header.nblocks < 0 || header.ntraces < 0 || header.np < 0 || header.bbytes < 0 {
            return Err(NiftiError::InvalidFormat(format!(
                "negative sizes in FID header of {}",
                path.display()
            )));
        }
        log::debug!("Opened {} with {} blocks", path.display(), header.nblocks);
        Ok(FidFile {
            path: path.to_path_buf(),
            file,
            header,
        })
    }

    /// The file header.
    pub fn header(&self) -> &FidHeader {
        &self.header
    }

    /// Number of blocks.
    pub fn block_count(&self) -> usize {
        self.header.nblocks as usize
    }

    /// Number of traces per block.
    pub fn trace_count(&self) -> usize {
        self.header.ntraces as usize
    }

    /// Number of complex points per trace.
    pub fn complex_per_trace(&self) -> usize {
        self.header.np as usize / 2
    }

    /// Number of complex points per block.
    pub fn complex_per_block(&self) -> usize {
        self.complex_per_trace() * self.trace_count()
    }

    /// The type of the stored points.
    pub fn data_type(&self) -> FidType {
        FidType::from_status(self.header.status)
    }

    /// Read block `index` as complex points, divided by the block scale.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if there is no such block, `Io` if the file is
    /// truncated.
    pub fn read_block(&mut self, index: usize) -> Result<Vec<Complex<f64>>> {
        if index >= self.block_count() {
            return Err(NiftiError::OutOfBounds {
                index: vec![index],
                dims: vec![self.block_count()],
            });
        }
        let path = self.path.clone();
        let offset = FILE_HEADER_SIZE + index as u64 * self.header.bbytes as u64;
        let _ = self.file.seek(SeekFrom::Start(offset)).context(path.as_path())?;
        let block = BlockHeader::from_reader(&mut self.file).map_err(|e| match e {
            NiftiError::RawIo(err) => NiftiError::Io(path.clone(), err),
            e => e,
        })?;
        let scale = if block.scale == 0 { 1. } else { f64::from(block.scale) };

        let points = self.complex_per_block() * 2;
        let mut bytes = vec![0u8; self.header.tbytes as usize * self.trace_count()];
        self.file.read_exact(&mut bytes).context(path.as_path())?;
        let data_type = self.data_type();
        let width = match data_type {
            FidType::Int16 => 2,
            FidType::Int32 | FidType::Float32 => 4,
        };
        if bytes.len() < points * width {
            return Err(NiftiError::InvalidFormat(format!(
                "block of {} bytes cannot hold {} points",
                bytes.len(),
                points
            )));
        }
        log::trace!("Reading block {} at offset {}", index, offset);

        let mut input = ByteOrdered::be(&bytes[..]);
        let mut next = || -> io::Result<f64> {
            match data_type {
                FidType::Int16 => input.read_i16().map(f64::from),
                FidType::Int32 => input.read_i32().map(f64::from),
                FidType::Float32 => input.read_f32().map(f64::from),
            }
        };
        let mut out = Vec::with_capacity(points / 2);
        for _ in 0..points / 2 {
            let re = next()?;
            let im = next()?;
            out.push(Complex::new(re / scale, im / scale));
        }
        Ok(out)
    }
}

/// The acquisition type of a bundle.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum AppType {
    /// Multi-slice 2D imaging.
    Im2D,
    /// 3D imaging.
    Im3D,
}

/// A `.fid` directory, holding the `fid` data and its `procpar` table.
#[derive(Debug)]
pub struct FidBundle {
    path: PathBuf,
    procpar: ProcPar,
    fid: FidFile,
    apptype: AppType,
    dims: [usize; 3],
}

impl FidBundle {
    /// Open the bundle at `path`, which must end in `.fid`.
    ///
    /// # Errors
    ///
    /// - `InvalidFileExtension` if the path does not end in `.fid`.
    /// - `MissingParameter` if `seqcon` or `apptype` are missing.
    /// - `InvalidFormat` for an unsupported `apptype`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = path.to_string_lossy();
        let trimmed = text.trim_end_matches('/');
        if !trimmed.ends_with(".fid") {
            return Err(NiftiError::InvalidFileExtension(path.to_path_buf()));
        }
        let path = PathBuf::from(trimmed);

        let procpar = ProcPar::from_file(path.join("procpar"))?;
        let fid = FidFile::open(path.join("fid"))?;
        let _ = procpar.string_value("seqcon", 0)?;
        let apptype = match procpar.string_value("apptype", 0)? {
            "im2D" => AppType::Im2D,
            "im3D" => AppType::Im3D,
            other => {
                return Err(NiftiError::InvalidFormat(format!(
                    "unsupported apptype `{}`",
                    other
                )))
            }
        };
        let count = |name: &str| -> Result<usize> { Ok(procpar.real_value(name, 0)? as usize) };
        let dims = match apptype {
            AppType::Im2D => [count("np")? / 2, count("nv")?, count("ns")?],
            AppType::Im3D => [count("np")? / 2, count("nv")?, count("nv2")?],
        };
        log::debug!("Opened {} as {:?} with dimensions {:?}", path.display(), apptype, dims);
        Ok(FidBundle {
            path,
            procpar,
            fid,
            apptype,
            dims,
        })
    }

    /// The path of the bundle directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The parameter table.
    pub fn procpar(&self) -> &ProcPar {
        &self.procpar
    }

    /// The FID file.
    pub fn fid(&mut self) -> &mut FidFile {
        &mut self.fid
    }

    /// The acquisition type.
    pub fn apptype(&self) -> AppType {
        self.apptype
    }

    /// The k-space dimensions: readout, phase encode, then slices or second
    /// phase encode.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Read every block, concatenated in file order.
    pub fn read_all_blocks(&mut self) -> Result<Vec<Complex<f64>>> {
        let mut all = Vec::with_capacity(self.fid.block_count() * self.fid.complex_per_block());
        for i in 0..self.fid.block_count() {
            all.extend(self.fid.read_block(i)?);
        }
        Ok(all)
    }
}
