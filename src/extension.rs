//! This module contains definitions for the extension and related types.
//! Extensions are optional data frames sitting between the header and the
//! voxel data. An extender frame of 4 bytes always follows the header, with
//! the first byte set to 1 when extensions are present.
//!
//! Each extension is stored as its size and code (both `i32`), its data and
//! zero padding. The stored size accounts for all of them and is a multiple
//! of 16.

use crate::error::{NiftiError, Result};
use crate::util::Endianness;
use byteordered::ByteOrdered;
use std::io::{ErrorKind as IoErrorKind, Read, Seek, Write};

/// Largest known extension code.
pub const MAX_ECODE: i32 = 30;

/// Data type for the extender code.
#[derive(Debug, Default, PartialEq, Clone, Copy)]
pub struct Extender([u8; 4]);

impl Extender {
    /// An extender announcing whether extensions follow.
    pub fn new(has_extensions: bool) -> Self {
        Extender([u8::from(has_extensions), 0, 0, 0])
    }

    /// Fetch the extender code from the given source, while
    /// being possible to not be available.
    /// Returns `None` if the source reaches EoF prematurely.
    pub fn from_reader_optional<S: Read>(mut source: S) -> Result<Option<Self>> {
        let mut extender = [0u8; 4];
        match source.read_exact(&mut extender) {
            Ok(()) => Ok(Some(Extender(extender))),
            Err(ref e) if e.kind() == IoErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(NiftiError::from(e)),
        }
    }

    /// Whether extensions should exist upon this extender code.
    pub fn has_extensions(&self) -> bool {
        self.0[0] == 1
    }

    /// Get the extender's bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

/// Look up the registered name of an extension code.
pub fn code_name(code: i32) -> &'static str {
    match code {
        0 => "Ignore",
        2 => "DICOM Attributes",
        4 => "AFNI",
        6 => "Plain ASCII text",
        8 => "XCEDE",
        10 => "JIM Dimension Information",
        12 => "Workflow Forwards",
        14 => "Freesurfer",
        16 => "Pickled Python Objects",
        18 => "Mind Ident",
        20 => "B Value",
        22 => "Spherical Direction",
        24 => "DT Component",
        26 => "SHC Degree Order",
        28 => "VOXBO",
        30 => "CARET",
        _ => "Unknown extension code",
    }
}

fn is_valid_code(code: i32) -> bool {
    (0..=MAX_ECODE).contains(&code) && code % 2 == 0
}

/// Data type for the raw contents of an extension.
/// Users of this type have to reinterpret the data
/// to suit their needs.
#[derive(Debug, PartialEq, Clone)]
pub struct Extension {
    code: i32,
    data: Vec<u8>,
}

impl Extension {
    /// Create an extension with a known code.
    ///
    /// # Errors
    ///
    /// `InvalidCode` if the code is odd or outside `[0, 30]`.
    pub fn new(code: i32, data: Vec<u8>) -> Result<Self> {
        if !is_valid_code(code) {
            return Err(NiftiError::InvalidCode("extension", code.into()));
        }
        Ok(Extension { code, data })
    }

    /// Create an extension with any code, as found in a file.
    pub fn from_raw(code: i32, data: Vec<u8>) -> Self {
        if !is_valid_code(code) {
            log::warn!("Unknown extension code {}", code);
        }
        Extension { code, data }
    }

    /// Obtain the extension's code.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Change the extension's code.
    ///
    /// # Errors
    ///
    /// `InvalidCode` if the code is odd or outside `[0, 30]`.
    pub fn set_code(&mut self, code: i32) -> Result<()> {
        if !is_valid_code(code) {
            return Err(NiftiError::InvalidCode("extension", code.into()));
        }
        self.code = code;
        Ok(())
    }

    /// The registered name of the extension's code.
    pub fn code_name(&self) -> &'static str {
        code_name(self.code)
    }

    /// Obtain the extension's data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the extension's data.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Take the extension's raw data, discarding the rest.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Length of the data, in bytes.
    pub fn raw_size(&self) -> usize {
        self.data.len()
    }

    /// Number of zero bytes written after the data. Always in `1..=16`.
    pub fn padding(&self) -> usize {
        16 - ((self.data.len() + 8) % 16)
    }

    /// Full stored size: the size and code fields, the data and padding.
    pub fn size(&self) -> usize {
        self.raw_size() + 8 + self.padding()
    }
}

/// Read the extender and all extensions from `source`, positioned right
/// after the header, until the stream position reaches `target`.
///
/// `target` is the voxel offset of a `.nii` file, or the length of a
/// `.hdr` file. A missing extender means there are no extensions.
pub fn read_extensions<S>(
    source: &mut S,
    endianness: Endianness,
    target: u64,
) -> Result<Vec<Extension>>
where
    S: Read + Seek,
{
    let mut extensions = Vec::new();
    // voxel data right after the header leaves no room for an extender
    if source.stream_position()? + 4 > target {
        return Ok(extensions);
    }
    match Extender::from_reader_optional(&mut *source)? {
        Some(extender) if extender.has_extensions() => {}
        _ => return Ok(extensions),
    }

    let mut pos = source.stream_position()?;
    while pos < target {
        if pos + 16 > target {
            return Err(NiftiError::InvalidFormat(format!(
                "insufficient space for remaining extensions at offset {}",
                pos
            )));
        }
        let mut input = ByteOrdered::runtime(&mut *source, endianness);
        let esize = input.read_i32()?;
        let ecode = input.read_i32()?;
        if esize < 16 || pos + esize as u64 > target {
            return Err(NiftiError::InvalidFormat(format!(
                "bad extension size {} at offset {}",
                esize, pos
            )));
        }
        let mut edata = vec![0u8; esize as usize - 8];
        input.read_exact(&mut edata)?;
        extensions.push(Extension::from_raw(ecode, edata));
        pos = source.stream_position()?;
        if pos > target {
            return Err(NiftiError::InvalidFormat(
                "went past the start of the voxel data while reading extensions".to_string(),
            ));
        }
    }
    log::debug!("Read {} extensions", extensions.len());
    Ok(extensions)
}

/// Write the extender and the given extensions to `sink`. Returns the
/// number of bytes written.
pub fn write_extensions<W: Write>(
    sink: W,
    endianness: Endianness,
    extensions: &[Extension],
) -> Result<usize> {
    let mut out = ByteOrdered::runtime(sink, endianness);
    out.write_all(Extender::new(!extensions.is_empty()).as_bytes())?;
    let mut written = 4;
    for ext in extensions {
        if ext.raw_size() > i32::MAX as usize - 24 {
            return Err(NiftiError::InvalidFormat(format!(
                "extension of {} bytes is too large",
                ext.raw_size()
            )));
        }
        out.write_i32(ext.size() as i32)?;
        out.write_i32(ext.code())?;
        out.write_all(ext.data())?;
        out.write_all(&[0u8; 16][..ext.padding()])?;
        written += ext.size();
    }
    Ok(written)
}
