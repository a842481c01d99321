use approx::assert_abs_diff_eq;
use nalgebra::{Matrix3, Vector3};
use nrecon::affine::linear_and_translation;
use nrecon::agilent::{AppType, FdfFile, FdfImage, FdfKind, FidBundle, FidType, Parameter, ProcPar};
use nrecon::{Endianness, NiftiError};
use num_complex::Complex;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

const NP: usize = 8;
const NV: usize = 3;
const NS: usize = 2;

fn procpar(apptype: &str) -> ProcPar {
    let mut pp = ProcPar::new();
    let real = |name: &str, v: f64| Parameter::real(name, 7, vec![v]);
    let string = |name: &str, v: &str| Parameter::string(name, 2, vec![v.to_string()]);
    for p in vec![
        real("np", NP as f64),
        real("nv", NV as f64),
        real("ns", NS as f64),
        string("seqcon", "nccnn"),
        string("apptype", apptype),
    ] {
        let _ = pp.insert(p);
    }
    pp
}

/// Two blocks of three float traces, the second block with a scale of 2.
fn fid_bytes() -> Vec<u8> {
    let tbytes = (NP * 4) as i32;
    let bbytes = 28 + tbytes * NV as i32;
    let mut out = Vec::new();
    for v in &[NS as i32, NV as i32, NP as i32, 4, tbytes, bbytes] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out.extend_from_slice(&0i16.to_be_bytes());
    out.extend_from_slice(&0x9i16.to_be_bytes());
    out.extend_from_slice(&1i32.to_be_bytes());

    for block in 0..NS {
        let scale = if block == 0 { 0i16 } else { 2 };
        out.extend_from_slice(&scale.to_be_bytes());
        out.extend_from_slice(&[0u8; 26]);
        for p in 0..NV * NP / 2 {
            let v = (block * 100 + p) as f32;
            out.extend_from_slice(&v.to_be_bytes());
            out.extend_from_slice(&(-v).to_be_bytes());
        }
    }
    out
}

fn make_bundle(dir: &Path, name: &str, pp: &ProcPar) -> std::path::PathBuf {
    let bundle = dir.join(name);
    fs::create_dir(&bundle).unwrap();
    fs::write(bundle.join("procpar"), pp.to_string()).unwrap();
    fs::write(bundle.join("fid"), fid_bytes()).unwrap();
    bundle
}

#[test]
fn procpar_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("procpar");
    fs::write(&path, procpar("im2D").to_string()).unwrap();
    let pp = ProcPar::from_file(&path).unwrap();
    assert_eq!(pp, procpar("im2D"));
    assert_eq!(pp.string_value("apptype", 0).unwrap(), "im2D");

    let err = ProcPar::from_file(dir.path().join("missing")).unwrap_err();
    assert!(matches!(err, NiftiError::Io(..)));
}

#[test]
fn read_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let path = make_bundle(dir.path(), "scan.fid", &procpar("im2D"));
    let mut bundle = FidBundle::open(format!("{}/", path.display())).unwrap();
    assert_eq!(bundle.path(), path.as_path());
    assert_eq!(bundle.apptype(), AppType::Im2D);
    assert_eq!(bundle.dims(), [NP / 2, NV, NS]);

    let fid = bundle.fid();
    assert_eq!(fid.data_type(), FidType::Float32);
    assert_eq!(fid.block_count(), NS);
    assert_eq!(fid.complex_per_block(), NV * NP / 2);
    assert!(fid.header().to_string().contains("Number of blocks: 2"));

    let first = fid.read_block(0).unwrap();
    assert_eq!(first[5], Complex::new(5., -5.));
    let second = fid.read_block(1).unwrap();
    assert_eq!(second[1], Complex::new(50.5, -50.5));
    assert!(matches!(fid.read_block(2), Err(NiftiError::OutOfBounds { .. })));

    let all = bundle.read_all_blocks().unwrap();
    assert_eq!(all.len(), NS * NV * NP / 2);
    assert_eq!(all[12], Complex::new(50., -50.));
}

#[test]
fn bundle_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = make_bundle(dir.path(), "scan.dat", &procpar("im2D"));
    assert!(matches!(
        FidBundle::open(&path),
        Err(NiftiError::InvalidFileExtension(_))
    ));

    let mut pp = procpar("im2D");
    let _ = pp.remove("seqcon");
    let path = make_bundle(dir.path(), "noseq.fid", &pp);
    assert!(matches!(
        FidBundle::open(&path),
        Err(NiftiError::MissingParameter(_))
    ));

    let path = make_bundle(dir.path(), "csi.fid", &procpar("im1Dcsi"));
    assert!(matches!(
        FidBundle::open(&path),
        Err(NiftiError::InvalidFormat(_))
    ));
}

#[test]
fn truncated_fid() {
    let dir = tempfile::tempdir().unwrap();
    let path = make_bundle(dir.path(), "short.fid", &procpar("im2D"));
    let mut bytes = fid_bytes();
    bytes.truncate(bytes.len() - 10);
    fs::write(path.join("fid"), bytes).unwrap();

    let mut bundle = FidBundle::open(&path).unwrap();
    assert!(bundle.fid().read_block(0).is_ok());
    assert!(matches!(bundle.fid().read_block(1), Err(NiftiError::Io(..))));
}

/// An FDF file of big endian floats with the given matrix.
fn fdf_bytes(matrix: &[usize], data: &[f32]) -> Vec<u8> {
    let dims: Vec<String> = matrix.iter().map(|d| d.to_string()).collect();
    let header = format!(
        "#!/usr/local/fdf/startup\n\
         float  rank = {};\n\
         char  *storage = \"float\";\n\
         float  bits = 32;\n\
         float  matrix[] = {{{}}};\n\
         char  *abscissa[] = {{\"cm\", \"cm\"}};\n\
         int    bigendian = 1;\n\
         int    checksum = 0;\n",
        matrix.len(),
        dims.join(", ")
    );
    let mut out = header.into_bytes();
    out.push(0);
    for v in data {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out
}

/// A `.img` directory with two 2x2 slices of one image and echo.
fn make_image(dir: &Path, name: &str) -> std::path::PathBuf {
    let image = dir.join(name);
    fs::create_dir(&image).unwrap();
    let mut pp = ProcPar::new();
    let real = |name: &str, v: Vec<f64>| Parameter::real(name, 1, v);
    for p in vec![
        real("pss", vec![0.1, -0.1]),
        real("ne", vec![1.]),
        real("lro", vec![4.]),
        real("lpe", vec![3.]),
        real("pro", vec![0.]),
        real("ppe", vec![0.]),
        real("thk", vec![2.]),
        real("gap", vec![0.]),
        real("psi", vec![0.]),
        real("phi", vec![0.]),
        real("theta", vec![0.]),
    ] {
        let _ = pp.insert(p);
    }
    fs::write(image.join("procpar"), pp.to_string()).unwrap();
    for slice in 0..2 {
        let data: Vec<f32> = (0..4).map(|v| (slice * 10 + v) as f32).collect();
        let name = format!("slice{:03}image001echo001.fdf", slice + 1);
        fs::write(image.join(name), fdf_bytes(&[2, 2], &data)).unwrap();
    }
    fs::write(image.join("notes.txt"), "not an image").unwrap();
    image
}

#[test]
fn fdf_file_2d() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slice.fdf");
    let data: Vec<f32> = (0..6).map(|v| v as f32).collect();
    fs::write(&path, fdf_bytes(&[3, 2], &data)).unwrap();

    let fdf = FdfFile::open(&path).unwrap();
    assert_eq!(fdf.rank(), 2);
    assert_eq!(fdf.dims(), [2, 3, 1]);
    assert_eq!(fdf.len(), 6);
    assert_eq!(fdf.endianness(), Endianness::Big);
    assert_eq!(fdf.header_size() as usize, fs::read(&path).unwrap().len() - 24);
    assert_eq!(fdf.read_data().unwrap(), vec![5., 2., 4., 1., 3., 0.]);

    assert_eq!(fdf.field("matrix").unwrap().kind(), FdfKind::Float);
    assert_eq!(fdf.string_value("abscissa", 1).unwrap(), "cm");
    assert!(matches!(
        fdf.real_value("storage", 0),
        Err(NiftiError::ParameterType(..))
    ));
    assert!(matches!(fdf.field("nope"), Err(NiftiError::MissingParameter(_))));
    assert!(fdf.to_string().contains("float matrix[] = {3, 2};"));
}

#[test]
fn fdf_file_3d_little_endian() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slab.fdf");
    let mut bytes = b"#!/usr/local/fdf/startup\n\
        float rank = 3;\n\
        char *storage = \"float\";\n\
        float matrix[] = {2, 1, 2};\n\
        int bigendian = 0;\n\0"
        .to_vec();
    for v in &[1f32, 2., 3., 4.] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(&path, bytes).unwrap();

    let fdf = FdfFile::open(&path).unwrap();
    assert_eq!(fdf.dims(), [2, 1, 2]);
    assert_eq!(fdf.endianness(), Endianness::Little);
    assert_eq!(fdf.read_data().unwrap(), vec![1., 2., 3., 4.]);
}

#[test]
fn fdf_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.fdf");

    fs::write(&path, b"#!/bin/sh\nfloat rank = 2;\n\0").unwrap();
    assert!(matches!(FdfFile::open(&path), Err(NiftiError::InvalidFormat(_))));

    fs::write(&path, b"#!/usr/local/fdf/startup\nfloat rank = 2;\n").unwrap();
    assert!(matches!(FdfFile::open(&path), Err(NiftiError::InvalidFormat(_))));

    fs::write(&path, b"#!/usr/local/fdf/startup\nfloat rank = 2;\nlong x = 3;\n\0").unwrap();
    assert!(matches!(FdfFile::open(&path), Err(NiftiError::Fdf(3, _))));

    let bytes = String::from_utf8(fdf_bytes(&[2, 2], &[]))
        .unwrap()
        .replace("\"float\"", "\"integer\"");
    fs::write(&path, bytes).unwrap();
    assert!(matches!(FdfFile::open(&path), Err(NiftiError::InvalidFormat(_))));

    fs::write(&path, fdf_bytes(&[2, 2], &[1., 2., 3.])).unwrap();
    let fdf = FdfFile::open(&path).unwrap();
    assert!(matches!(fdf.read_data(), Err(NiftiError::Io(..))));
}

#[test]
fn fdf_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = make_image(dir.path(), "scan.img");
    let image = FdfImage::open(format!("{}/", path.display())).unwrap();
    assert_eq!(image.path(), path.as_path());
    assert_eq!(image.rank(), 2);
    assert_eq!(image.dims(), [2, 2, 2]);
    assert_eq!(image.images(), 1);
    assert_eq!(image.echoes(), 1);
    assert_abs_diff_eq!(&image.voxdims()[..], &[20., 15., 2.][..], epsilon = 1e-9);

    let (linear, translation) = linear_and_translation(image.transform());
    #[rustfmt::skip]
    let expected = Matrix3::new(
        0., -15., 0.,
        20., 0., 0.,
        0., 0., 2.,
    );
    assert_abs_diff_eq!(linear, expected, epsilon = 1e-9);
    assert_abs_diff_eq!(translation, Vector3::new(7.5, -10., -1.), epsilon = 1e-9);

    assert_eq!(
        image.file_name(1, 0, 0).unwrap(),
        "slice002image001echo001.fdf"
    );
    assert_eq!(
        image.read_volume(0, 0).unwrap(),
        vec![3., 1., 2., 0., 13., 11., 12., 10.]
    );
    assert!(matches!(
        image.read_volume(1, 0),
        Err(NiftiError::OutOfBounds { .. })
    ));
}

#[test]
fn fdf_image_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = make_image(dir.path(), "scan.dat");
    assert!(matches!(
        FdfImage::open(&path),
        Err(NiftiError::InvalidFileExtension(_))
    ));

    let path = make_image(dir.path(), "mixed.img");
    fs::copy(
        path.join("slice001image001echo001.fdf"),
        path.join("other001image001echo001.fdf"),
    )
    .unwrap();
    assert!(matches!(FdfImage::open(&path), Err(NiftiError::InvalidFormat(_))));

    let path = dir.path().join("empty.img");
    fs::create_dir(&path).unwrap();
    fs::write(path.join("procpar"), ProcPar::new().to_string()).unwrap();
    assert!(matches!(FdfImage::open(&path), Err(NiftiError::InvalidFormat(_))));
}
