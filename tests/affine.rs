use approx::assert_abs_diff_eq;
use nalgebra::{Matrix3, Vector3};
use nrecon::affine::{compose, fill_positive, linear_and_translation, quaternion_to_rotation, scale};
use nrecon::{NiftiHeader, NiftiType, XForm};
use pretty_assertions::assert_eq;

fn rotated_header(qfac: f64) -> NiftiHeader {
    let mut hdr = NiftiHeader::new(&[32, 32, 16], &[1.5, 1.5, 3.], NiftiType::Int16).unwrap();
    let rotation = quaternion_to_rotation(fill_positive(Vector3::new(0.1, -0.05, 0.2)));
    let linear = rotation * Matrix3::from_diagonal(&Vector3::new(1.5, 1.5, 3. * qfac));
    hdr.set_qform(compose(&linear, &Vector3::new(-24., 10., 5.)), XForm::AlignedAnat);
    hdr.set_sform(scale([1.5, 1.5, 3.]), XForm::Unknown);
    hdr
}

#[test]
fn qform_survives_nifti1() {
    for &qfac in &[1., -1.] {
        let hdr = rotated_header(qfac);
        let raw = hdr.to_nifti1().unwrap();
        assert_eq!(raw.pixdim[0], qfac as f32);
        assert_eq!(raw.qform_code, 2);
        assert_eq!(raw.sform_code, 0);

        let back = NiftiHeader::from_nifti1(&raw).unwrap();
        assert_eq!(back.qcode(), XForm::AlignedAnat);
        assert_abs_diff_eq!(*back.qform(), *hdr.qform(), epsilon = 1e-4);
        // sform code is unknown, so the qform is preferred
        assert_abs_diff_eq!(*back.transform(), *hdr.qform(), epsilon = 1e-4);
    }
}

#[test]
fn qform_survives_nifti2() {
    let hdr = rotated_header(-1.);
    let back = NiftiHeader::from_nifti2(&hdr.to_nifti2().unwrap()).unwrap();
    assert_abs_diff_eq!(*back.qform(), *hdr.qform(), epsilon = 1e-9);
}

#[test]
fn preferred_transform() {
    let mut hdr = rotated_header(1.);
    let zooms = Matrix3::from_diagonal(&Vector3::new(1.5, 1.5, 3.));
    let shifted = compose(&zooms, &Vector3::new(1., 2., 3.));

    hdr.set_sform(shifted, XForm::ScannerAnat);
    assert_eq!(hdr.transform(), hdr.qform());

    hdr.set_sform(shifted, XForm::AlignedAnat);
    assert_eq!(*hdr.transform(), shifted);

    hdr.set_sform(shifted, XForm::Mni152);
    let (_, translation) = linear_and_translation(hdr.transform());
    assert_eq!(translation, Vector3::new(1., 2., 3.));
}

#[test]
fn unset_transforms_fall_back_to_scaling() {
    let mut hdr = NiftiHeader::new(&[4, 4, 4], &[2., 3., 4.], NiftiType::Uint8).unwrap();
    hdr.set_transform(compose(&Matrix3::identity(), &Vector3::new(9., 9., 9.)), XForm::Unknown);
    let back = NiftiHeader::from_nifti1(&hdr.to_nifti1().unwrap()).unwrap();
    assert_eq!(back.qcode(), XForm::Unknown);
    assert_eq!(back.scode(), XForm::Unknown);
    assert_eq!(*back.transform(), scale([2., 3., 4.]));
}
