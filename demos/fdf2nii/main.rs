//! An application for converting Agilent `.img` directories of FDF images
//! into NIfTI files.

use nrecon::agilent::FdfImage;
use nrecon::{Extension, Mode, NiftiError, NiftiFile, NiftiHeader, NiftiType, Unit, XForm};
use std::env;
use std::path::{Path, PathBuf};
use std::process;

const USAGE: &str = "\
Usage: fdf2nii [-z] [-p] [-o PREFIX] [-e ECHO] IMAGE.img...

  -z         write gzipped output
  -p         embed the procpar table as a header extension
  -o PREFIX  prefix of the output file names
  -e ECHO    echo to write, starting from 0, or
             -1 for all echoes, -2 for their sum, -3 for their mean";

/// Which echoes make up the output volumes.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Echo {
    One(usize),
    All,
    Sum,
    Mean,
}

#[derive(Debug)]
struct Options {
    gzip: bool,
    procpar: bool,
    prefix: String,
    echo: Echo,
    inputs: Vec<String>,
}

fn parse_args() -> Option<Options> {
    let mut opts = Options {
        gzip: false,
        procpar: false,
        prefix: String::new(),
        echo: Echo::One(0),
        inputs: Vec::new(),
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-z" => opts.gzip = true,
            "-p" => opts.procpar = true,
            "-o" => opts.prefix = args.next()?,
            "-e" => {
                opts.echo = match args.next()?.parse::<i64>().ok()? {
                    -1 => Echo::All,
                    -2 => Echo::Sum,
                    -3 => Echo::Mean,
                    e if e >= 0 => Echo::One(e as usize),
                    _ => return None,
                }
            }
            _ if arg.starts_with('-') => return None,
            _ => opts.inputs.push(arg),
        }
    }
    if opts.inputs.is_empty() {
        None
    } else {
        Some(opts)
    }
}

fn output_path(input: &str, opts: &Options) -> PathBuf {
    let stem = Path::new(input.trim_end_matches('/'))
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = if opts.gzip { "nii.gz" } else { "nii" };
    PathBuf::from(format!("{}{}.{}", opts.prefix, stem, ext))
}

/// Read all echoes of one image, adding them up.
fn echo_sum(image: &FdfImage, index: usize) -> nrecon::Result<Vec<f32>> {
    let mut sum = image.read_volume(index, 0)?;
    for echo in 1..image.echoes() {
        for (s, v) in sum.iter_mut().zip(image.read_volume(index, echo)?) {
            *s += v;
        }
    }
    Ok(sum)
}

fn convert(input: &str, opts: &Options) -> nrecon::Result<PathBuf> {
    let image = FdfImage::open(input)?;
    let echoes = image.echoes();
    if let Echo::One(e) = opts.echo {
        if e >= echoes {
            return Err(NiftiError::OutOfBounds {
                index: vec![e],
                dims: vec![echoes],
            });
        }
    }
    let volumes = match opts.echo {
        Echo::All => image.images() * echoes,
        _ => image.images(),
    };

    let [d0, d1, d2] = image.dims();
    let [v0, v1, v2] = image.voxdims();
    let mut header =
        NiftiHeader::new(&[d0, d1, d2, volumes], &[v0, v1, v2, 1.], NiftiType::Float32)?;
    header.set_transform(*image.transform(), XForm::ScannerAnat);
    header.xyz_units = Unit::Mm;
    let mut out = NiftiFile::with_header(header);
    if opts.procpar {
        out.add_extension(Extension::new(6, image.procpar().to_string().into_bytes())?)?;
    }

    let path = output_path(input, opts);
    out.open(&path, Mode::Write)?;
    let mut next = 0;
    for index in 0..image.images() {
        match opts.echo {
            Echo::One(e) => {
                out.write_volumes(next, 1, image.read_volume(index, e)?)?;
                next += 1;
            }
            Echo::All => {
                for e in 0..echoes {
                    out.write_volumes(next, 1, image.read_volume(index, e)?)?;
                    next += 1;
                }
            }
            Echo::Sum | Echo::Mean => {
                let mut volume = echo_sum(&image, index)?;
                if opts.echo == Echo::Mean {
                    for v in &mut volume {
                        *v /= echoes as f32;
                    }
                }
                out.write_volumes(next, 1, volume)?;
                next += 1;
            }
        }
    }
    out.close()?;
    Ok(path)
}

fn main() {
    let opts = match parse_args() {
        Some(opts) => opts,
        None => {
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };
    let mut failed = false;
    for input in &opts.inputs {
        match convert(input, &opts) {
            Ok(path) => println!("{} -> {}", input, path.display()),
            Err(e) => {
                eprintln!("Failed to convert {}: {}", input, e);
                failed = true;
            }
        }
    }
    if failed {
        process::exit(1);
    }
}
