//! Private utility module
use std::path::Path;

pub use byteordered::Endianness;

/// Check whether the given path ends with a `.gz` extension.
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}

/// Reverse the byte order of every `swap_size`-byte word in `buf`.
/// A swap size of 0 or 1 leaves the buffer untouched.
pub fn swap_bytes(buf: &mut [u8], swap_size: usize) {
    if swap_size < 2 {
        return;
    }
    for word in buf.chunks_exact_mut(swap_size) {
        word.reverse();
    }
}

/// Compute canonical strides for the given dimensions, with the first
/// axis varying fastest.
pub fn calc_strides<const R: usize>(dims: &[usize; R]) -> [usize; R] {
    let mut strides = [0; R];
    if R > 0 {
        strides[0] = 1;
        for i in 1..R {
            strides[i] = strides[i - 1] * dims[i - 1];
        }
    }
    strides
}

/// Copy `text` into a NUL padded fixed-size field, keeping at most
/// `N - 1` bytes so the field is always NUL-terminated.
pub fn to_fixed_str<const N: usize>(text: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let bytes = text.as_bytes();
    let len = bytes.len().min(N.saturating_sub(1));
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

/// Read a NUL terminated string out of a fixed-size field.
pub fn from_fixed_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
