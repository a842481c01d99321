use approx::assert_abs_diff_eq;
use nalgebra::{Matrix3, Vector3};
use nrecon::affine::compose;
use nrecon::header::{Nifti1Header, NIFTI1_HEADER_SIZE};
use nrecon::{
    Endianness, Mode, NiftiFile, NiftiHeader, NiftiType, NiftiVersion, SliceOrder, Unit, XForm,
};
use pretty_assertions::assert_eq;
use std::fs;

mod util;

fn reflected_header() -> NiftiHeader {
    let mut hdr =
        NiftiHeader::new(&[64, 64, 30, 1], &[2., 2., 3.5, 1.], NiftiType::Float32).unwrap();
    let linear = Matrix3::from_diagonal(&Vector3::new(-2., 2., 3.5));
    hdr.set_transform(
        compose(&linear, &Vector3::new(64., -60., -52.5)),
        XForm::ScannerAnat,
    );
    hdr.slice_code = SliceOrder::AltInc;
    hdr.xyz_units = Unit::Mm;
    hdr.time_units = Unit::Sec;
    hdr.description = "round trip".to_string();
    hdr
}

#[test]
fn header_round_trip_through_nifti1() {
    let dir = tempfile::tempdir().unwrap();
    let path = util::tmp_file(dir.path(), "reflected.nii");
    let hdr = reflected_header();

    let mut out = NiftiFile::create(&path, hdr.clone()).unwrap();
    out.close().unwrap();

    let mut input = NiftiFile::new();
    input.open(&path, Mode::ReadHeader).unwrap();
    assert!(!input.is_open());
    let back = input.header();
    assert_eq!(input.version(), NiftiVersion::Nifti1);
    assert_eq!(back.full_dims(), [64, 64, 30, 1, 1, 1, 1]);
    assert_eq!(back.dims(), &[64, 64, 30]);
    assert_eq!(back.datatype(), NiftiType::Float32);
    assert_eq!(back.magic(), "n+1");
    assert_eq!(back.vox_offset(), NIFTI1_HEADER_SIZE + 4);
    assert_eq!(back.slice_code, SliceOrder::AltInc);
    assert_eq!((back.xyz_units, back.time_units), (Unit::Mm, Unit::Sec));
    assert_eq!(back.description, "round trip");
    assert_eq!(back.qcode(), XForm::ScannerAnat);
    assert_abs_diff_eq!(*back.qform(), *hdr.qform(), epsilon = 1e-4);
    assert_abs_diff_eq!(*back.sform(), *hdr.sform(), epsilon = 1e-4);
    assert!(back.matches_space(&hdr));

    // header, extender and the zero padded voxel data
    let len = fs::metadata(&path).unwrap().len() as usize;
    assert_eq!(len, NIFTI1_HEADER_SIZE + 4 + 64 * 64 * 30 * 4);
}

#[test]
fn byte_order_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = util::tmp_file(dir.path(), "swapped.hdr");
    let foreign = Endianness::native().to_opposite();

    let mut out = NiftiFile::with_header(reflected_header()).with_endianness(foreign);
    out.open(&path, Mode::Write).unwrap();
    out.close().unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), NIFTI1_HEADER_SIZE + 4);
    let mut sizeof_hdr = [0u8; 4];
    sizeof_hdr.copy_from_slice(&bytes[..4]);
    assert_eq!(
        NiftiVersion::detect(sizeof_hdr).unwrap(),
        (NiftiVersion::Nifti1, foreign)
    );

    // fields read in the wrong order come out byte swapped
    let wrong = Nifti1Header::from_reader(&bytes[..], Endianness::native()).unwrap();
    let right = Nifti1Header::from_reader(&bytes[..], foreign).unwrap();
    assert_eq!(right.dim[1], 64);
    assert_eq!(wrong.dim[1], 64i16.swap_bytes());
    assert_eq!(wrong.datatype, right.datatype.swap_bytes());
    assert_eq!(wrong.pixdim[3].to_bits(), right.pixdim[3].to_bits().swap_bytes());
    assert_eq!(wrong.magic, right.magic);

    let mut input = NiftiFile::new();
    input.open(&path, Mode::ReadHeader).unwrap();
    assert_eq!(input.endianness(), foreign);
    assert!(!input.is_nii());
    assert_eq!(input.header().magic(), "ni1");
    assert_eq!(input.header().vox_offset(), 0);
    assert_eq!(input.header().voxdim(2), 3.5);
}

#[test]
fn nifti2_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = util::tmp_file(dir.path(), "wide.nii.gz");
    let hdr = util::header_with(&[40000, 2], NiftiType::Uint8);

    // too wide for the 16 bit fields of a NIfTI-1 header
    let mut out = NiftiFile::with_header(hdr.clone());
    assert!(out.open(&path, Mode::Write).is_err());
    assert!(!path.exists());

    let mut out = NiftiFile::with_header(hdr).with_version(NiftiVersion::Nifti2);
    out.open(&path, Mode::Write).unwrap();
    out.close().unwrap();

    let mut input = NiftiFile::new();
    input.open(&path, Mode::ReadHeader).unwrap();
    assert_eq!(input.version(), NiftiVersion::Nifti2);
    assert_eq!(input.header().dims(), &[40000, 2]);
    assert_eq!(input.header().magic(), "n+2");
    assert_eq!(input.header().vox_offset(), 544);
}

#[test]
fn bad_paths() {
    let mut file = NiftiFile::new();
    assert!(matches!(
        file.open("volume.txt", Mode::Read),
        Err(nrecon::NiftiError::InvalidFileExtension(_))
    ));
    let err = file.open("/nonexistent/volume.nii", Mode::Read).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/volume.nii"));
    assert!(!file.is_open());
}
