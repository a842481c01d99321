//! An application for printing the header and extensions of NIfTI files.

use nrecon::{Mode, NiftiFile};
use std::env;
use std::process;

fn dump(path: &str) -> nrecon::Result<()> {
    let mut file = NiftiFile::new();
    file.open(path, Mode::ReadHeader)?;
    println!("{} ({:?}, {:?})", path, file.version(), file.endianness());
    println!("{}", file.header());
    for (i, ext) in file.extensions().iter().enumerate() {
        println!(
            "Extension {}: code {} ({}), {} bytes",
            i,
            ext.code(),
            ext.code_name(),
            ext.size()
        );
    }
    Ok(())
}

fn main() {
    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("Usage: niftidump FILE...");
        process::exit(2);
    }
    let mut failed = false;
    for path in &paths {
        if let Err(e) = dump(path) {
            eprintln!("Failed to read {}: {}", path, e);
            failed = true;
        }
    }
    if failed {
        process::exit(1);
    }
}
