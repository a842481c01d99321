//! Transparent access to plain and gzip compressed files.
//!
//! A [`TransparentFile`] is opened either for reading or for writing, and
//! whether it goes through gzip is decided by the caller when opening it.
//! Compressed streams only move forward, so seeking is emulated: forward
//! seeks skip (reading) or emit zeros (writing), and backward seeks reopen
//! the file when reading and fail when writing.
//!
//! [`TransparentFile`]: ./struct.TransparentFile.html

use crate::error::Result;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use quick_error::ResultExt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Largest number of bytes moved by a single call into the underlying
/// stream.
const MAX_CHUNK: usize = i32::MAX as usize;

/// Whether a file is open for reading or for writing.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum FileMode {
    /// Read an existing file.
    Read,
    /// Create or truncate a file.
    Write,
}

#[derive(Debug)]
enum Inner {
    Read(BufReader<File>),
    Write(BufWriter<File>),
    GzRead { decoder: GzDecoder<BufReader<File>>, pos: u64 },
    GzWrite { encoder: GzEncoder<BufWriter<File>>, pos: u64 },
}

/// A file which may or may not be compressed with gzip.
#[derive(Debug)]
pub struct TransparentFile {
    path: PathBuf,
    inner: Inner,
}

fn open_decoder(path: &Path) -> io::Result<GzDecoder<BufReader<File>>> {
    Ok(GzDecoder::new(BufReader::new(File::open(path)?)))
}

fn seek_target(base: u64, delta: i64) -> io::Result<u64> {
    let target = base as i128 + i128::from(delta);
    if target < 0 {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid seek to a negative position",
        ))
    } else {
        Ok(target as u64)
    }
}

impl TransparentFile {
    /// Open the file at `path`. With `gz`, data goes through gzip.
    pub fn open<P: AsRef<Path>>(path: P, mode: FileMode, gz: bool) -> Result<Self> {
        let path = path.as_ref();
        let inner = match (mode, gz) {
            (FileMode::Read, false) => Inner::Read(BufReader::new(File::open(path).context(path)?)),
            (FileMode::Write, false) => {
                Inner::Write(BufWriter::new(File::create(path).context(path)?))
            }
            (FileMode::Read, true) => Inner::GzRead {
                decoder: open_decoder(path).context(path)?,
                pos: 0,
            },
            (FileMode::Write, true) => Inner::GzWrite {
                encoder: GzEncoder::new(
                    BufWriter::new(File::create(path).context(path)?),
                    Compression::fast(),
                ),
                pos: 0,
            },
        };
        Ok(TransparentFile {
            path: path.to_path_buf(),
            inner,
        })
    }

    /// The path this file was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the data goes through gzip.
    pub fn is_gz(&self) -> bool {
        matches!(self.inner, Inner::GzRead { .. } | Inner::GzWrite { .. })
    }

    /// The mode this file was opened in.
    pub fn mode(&self) -> FileMode {
        match self.inner {
            Inner::Read(_) | Inner::GzRead { .. } => FileMode::Read,
            Inner::Write(_) | Inner::GzWrite { .. } => FileMode::Write,
        }
    }

    /// The current position in the uncompressed stream.
    pub fn tell(&mut self) -> io::Result<u64> {
        match &mut self.inner {
            Inner::GzRead { pos, .. } | Inner::GzWrite { pos, .. } => Ok(*pos),
            Inner::Read(f) => f.stream_position(),
            Inner::Write(f) => f.stream_position(),
        }
    }

    /// Read until `buf` is full or the end of the file is reached, in chunks
    /// of at most `i32::MAX` bytes. Returns the number of bytes read, which is
    /// only short of `buf.len()` at the end of the file.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut done = 0;
        while done < buf.len() {
            let end = buf.len().min(done + MAX_CHUNK);
            match self.read(&mut buf[done..end]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(done)
    }

    /// Write all of `buf`, in chunks of at most `i32::MAX` bytes.
    pub fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        for chunk in buf.chunks(MAX_CHUNK) {
            self.write_all(chunk)?;
        }
        Ok(buf.len())
    }

    /// Flush and close the file.
    pub fn finish(self) -> io::Result<()> {
        match self.inner {
            Inner::Read(_) | Inner::GzRead { .. } => Ok(()),
            Inner::Write(mut f) => f.flush(),
            Inner::GzWrite { encoder, .. } => encoder.finish()?.flush(),
        }
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        match &mut self.inner {
            Inner::GzRead { decoder, pos } => {
                let skipped = io::copy(&mut decoder.take(n), &mut io::sink())?;
                *pos += skipped;
                Ok(skipped)
            }
            Inner::GzWrite { encoder, pos } => {
                let zeros = [0u8; 4096];
                let mut left = n;
                while left > 0 {
                    let len = left.min(zeros.len() as u64) as usize;
                    encoder.write_all(&zeros[..len])?;
                    left -= len as u64;
                }
                *pos += n;
                Ok(n)
            }
            Inner::Read(_) | Inner::Write(_) => Ok(0),
        }
    }
}

impl Read for TransparentFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Read(f) => f.read(buf),
            Inner::GzRead { decoder, pos } => {
                let n = decoder.read(buf)?;
                *pos += n as u64;
                Ok(n)
            }
            Inner::Write(_) | Inner::GzWrite { .. } => Err(io::Error::new(
                io::ErrorKind::Other,
                "file is not open for reading",
            )),
        }
    }
}

impl Write for TransparentFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Write(f) => f.write(buf),
            Inner::GzWrite { encoder, pos } => {
                let n = encoder.write(buf)?;
                *pos += n as u64;
                Ok(n)
            }
            Inner::Read(_) | Inner::GzRead { .. } => Err(io::Error::new(
                io::ErrorKind::Other,
                "file is not open for writing",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Inner::Write(f) => f.flush(),
            Inner::GzWrite { encoder, .. } => encoder.flush(),
            Inner::Read(_) | Inner::GzRead { .. } => Ok(()),
        }
    }
}

impl Seek for TransparentFile {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        let current = match &mut self.inner {
            Inner::Read(f) => return f.seek(from),
            Inner::Write(f) => return f.seek(from),
            Inner::GzRead { pos, .. } | Inner::GzWrite { pos, .. } => *pos,
        };
        let target = match from {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(d) => seek_target(current, d)?,
            SeekFrom::End(d) => {
                // the decompressed length is only known once it is all read,
                // while a compressed file being written ends at the cursor
                if self.mode() == FileMode::Read {
                    let _ = self.skip(u64::MAX)?;
                }
                seek_target(self.tell()?, d)?
            }
        };
        let current = self.tell()?;
        if target < current {
            if let Inner::GzRead { decoder, pos } = &mut self.inner {
                *decoder = open_decoder(&self.path)?;
                *pos = 0;
            } else {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "cannot seek backwards in a compressed file open for writing",
                ));
            }
        }
        let current = self.tell()?;
        let skipped = self.skip(target - current)?;
        if skipped < target - current {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "seek past the end of a compressed file",
            ));
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sample(path: &Path, gz: bool) {
        let mut f = TransparentFile::open(path, FileMode::Write, gz).unwrap();
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(f.write_bytes(&data).unwrap(), 256);
        f.finish().unwrap();
    }

    #[test]
    fn gz_seeks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.bin.gz");
        write_sample(&path, true);

        let mut f = TransparentFile::open(&path, FileMode::Read, true).unwrap();
        assert!(f.is_gz());
        assert_eq!(f.seek(SeekFrom::Start(100)).unwrap(), 100);
        let mut b = [0u8; 2];
        assert_eq!(f.read_bytes(&mut b).unwrap(), 2);
        assert_eq!(b, [100, 101]);
        assert_eq!(f.seek(SeekFrom::Current(-52)).unwrap(), 50);
        assert_eq!(f.read_bytes(&mut b).unwrap(), 2);
        assert_eq!(b, [50, 51]);
        assert_eq!(f.seek(SeekFrom::End(-1)).unwrap(), 255);
        let mut rest = [0u8; 4];
        assert_eq!(f.read_bytes(&mut rest).unwrap(), 1);
        assert_eq!(rest[0], 255);
        assert!(f.seek(SeekFrom::Start(300)).is_err());
    }

    #[test]
    fn gz_write_seeks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holes.bin.gz");
        let mut f = TransparentFile::open(&path, FileMode::Write, true).unwrap();
        f.write_bytes(&[1, 2]).unwrap();
        assert_eq!(f.seek(SeekFrom::Start(6)).unwrap(), 6);
        f.write_bytes(&[3]).unwrap();
        assert_eq!(f.seek(SeekFrom::End(0)).unwrap(), 7);
        assert!(f.seek(SeekFrom::Start(0)).is_err());
        f.finish().unwrap();

        let mut f = TransparentFile::open(&path, FileMode::Read, true).unwrap();
        let mut all = vec![0u8; 16];
        assert_eq!(f.read_bytes(&mut all).unwrap(), 7);
        assert_eq!(&all[..7], &[1, 2, 0, 0, 0, 0, 3]);
    }

    #[test]
    fn plain_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.bin");
        write_sample(&path, false);
        let mut f = TransparentFile::open(&path, FileMode::Read, false).unwrap();
        assert_eq!(f.mode(), FileMode::Read);
        f.seek(SeekFrom::Start(10)).unwrap();
        assert_eq!(f.tell().unwrap(), 10);
        let mut b = [0u8; 1];
        f.read_bytes(&mut b).unwrap();
        assert_eq!(b[0], 10);
        assert!(f.write_bytes(&[0]).is_err());
    }

    #[test]
    fn missing_file_names_path() {
        let err =
            TransparentFile::open("/nonexistent/dir/x.nii", FileMode::Read, false).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dir/x.nii"));
    }
}
