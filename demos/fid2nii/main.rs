//! An application for reconstructing a magnitude image out of an Agilent
//! `.fid` bundle.

use nrecon::agilent::{AppType, FidBundle};
use nrecon::{NiftiFile, NiftiHeader, NiftiType, StridedView, ALL};
use rustfft::num_complex::Complex;
use rustfft::{FftDirection, FftPlanner};
use std::env;
use std::process;

/// Inverse transform every line of `volume` along `axis`, in place, with
/// the output divided by the transform length.
fn inverse_fft(volume: &StridedView<Complex<f64>, 3>, axis: usize) -> nrecon::Result<()> {
    let dims = *volume.dims();
    let n = dims[axis];
    if n < 2 {
        return Ok(());
    }
    let fft = FftPlanner::<f64>::new().plan_fft(n, FftDirection::Inverse);
    let norm = 1. / n as f64;
    let (a, b) = match axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };
    let mut size = [0; 3];
    size[axis] = ALL;
    for i in 0..dims[a] {
        for j in 0..dims[b] {
            let mut start = [0; 3];
            start[a] = i;
            start[b] = j;
            let line = volume.slice::<1>(start, size)?;
            let mut values = line.to_vec();
            fft.process(&mut values);
            line.assign(values.into_iter().map(|v| v * norm))?;
        }
    }
    Ok(())
}

fn run(input: &str, output: &str) -> nrecon::Result<()> {
    let mut bundle = FidBundle::open(input)?;
    print!("{}", bundle.fid().header());
    let dims = bundle.dims();
    println!("Dimensions: {} {} {}", dims[0], dims[1], dims[2]);

    let mut kspace = bundle.read_all_blocks()?;
    let count: usize = dims.iter().product();
    if kspace.len() != count {
        eprintln!(
            "Read {} points for a {:?} volume, padding or truncating",
            kspace.len(),
            dims
        );
    }
    kspace.resize(count, Complex::new(0., 0.));

    let volume = StridedView::from_vec(dims, kspace)?;
    inverse_fft(&volume, 0)?;
    inverse_fft(&volume, 1)?;
    if bundle.apptype() == AppType::Im3D {
        inverse_fft(&volume, 2)?;
    }

    let header = NiftiHeader::new(&dims, &[1., 1., 1.], NiftiType::Float32)?;
    let mut out = NiftiFile::create(output, header)?;
    out.write_all(volume.iter().map(|c| c.norm() as f32))?;
    out.close()
}

fn main() {
    let mut args = env::args().skip(1);
    let input = match args.next() {
        Some(input) => input,
        None => {
            eprintln!("Usage: fid2nii INPUT.fid [OUTPUT.nii.gz]");
            process::exit(2);
        }
    };
    let output = args.next().unwrap_or_else(|| "output.nii.gz".to_string());
    if let Err(e) = run(&input, &output) {
        eprintln!("Failed to convert {}: {}", input, e);
        process::exit(1);
    }
}
