//! Affine transform helpers for the quaternion encoding of `qform`.
use nalgebra::{Matrix3, Matrix4, Quaternion, SymmetricEigen, UnitQuaternion, Vector3};

/// A 3x3 linear block.
pub type Affine3 = Matrix3<f64>;
/// A full 4x4 homogeneous affine transform.
pub type Affine4 = Matrix4<f64>;

/// Build a 4x4 affine from a linear block and a translation.
pub fn compose(linear: &Affine3, translation: &Vector3<f64>) -> Affine4 {
    let mut affine = Affine4::identity();
    affine.fixed_view_mut::<3, 3>(0, 0).copy_from(linear);
    affine.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    affine
}

/// Separate a 4x4 affine into its 3x3 linear and translation components.
pub fn linear_and_translation(affine: &Affine4) -> (Affine3, Vector3<f64>) {
    let linear = affine.fixed_view::<3, 3>(0, 0).into_owned();
    let translation = affine.fixed_view::<3, 1>(0, 3).into_owned();
    (linear, translation)
}

/// A scaling affine with the given zooms on the three spatial axes.
pub fn scale(zooms: [f64; 3]) -> Affine4 {
    Affine4::new_nonuniform_scaling(&Vector3::new(zooms[0], zooms[1], zooms[2]))
}

/// Compute the unit quaternion from its last 3 values, assuming the real
/// part is non-negative. A slightly negative `1 - |bcd|²` produced by
/// rounding is clamped to 0, which corresponds to a 180 degree rotation.
pub fn fill_positive(bcd: Vector3<f64>) -> Quaternion<f64> {
    let w2 = 1.0 - bcd.dot(&bcd);
    let w = if w2 > 0.0 { w2.sqrt() } else { 0.0 };
    Quaternion::new(w, bcd.x, bcd.y, bcd.z)
}

/// Encode a proper rotation as the `qform` quaternion.
///
/// `rotation` must have a determinant of +1: a reflection in the `qform`
/// is carried by the `qfac` sign in `pixdim[0]` instead, and is removed
/// beforehand with [`extract_rotation`]. The result has a non-negative real
/// part, so that only its `(b, c, d)` components need to be stored.
///
/// The quaternion is the dominant eigenvector of the symmetric matrix of
/// Bar-Itzhack (2000), which tolerates rounding in `rotation`.
///
/// [`extract_rotation`]: ./fn.extract_rotation.html
pub fn rotation_to_quaternion(rotation: &Affine3) -> Quaternion<f64> {
    let r = |row: usize, col: usize| rotation[(row, col)];
    // only the lower triangle is read
    #[rustfmt::skip]
    let k = Affine4::new(
        r(0, 0) - r(1, 1) - r(2, 2), 0.0, 0.0, 0.0,
        r(0, 1) + r(1, 0), r(1, 1) - r(0, 0) - r(2, 2), 0.0, 0.0,
        r(0, 2) + r(2, 0), r(1, 2) + r(2, 1), r(2, 2) - r(0, 0) - r(1, 1), 0.0,
        r(2, 1) - r(1, 2), r(0, 2) - r(2, 0), r(1, 0) - r(0, 1), r(0, 0) + r(1, 1) + r(2, 2),
    ) / 3.0;

    let SymmetricEigen {
        eigenvalues,
        eigenvectors,
    } = k.symmetric_eigen();
    let v = eigenvectors.column(eigenvalues.imax());
    let q = Quaternion::new(v[3], v[0], v[1], v[2]);
    if q.w < 0.0 {
        -q
    } else {
        q
    }
}

/// Decode a `qform` quaternion into its proper rotation.
///
/// Headers pass the quaternion completed by [`fill_positive`]. The rotation
/// never includes the `qfac` reflection: readers negate its third column
/// afterwards when `pixdim[0]` is negative. The quaternion is normalized
/// first, and a null quaternion decodes to the identity.
///
/// [`fill_positive`]: ./fn.fill_positive.html
pub fn quaternion_to_rotation(q: Quaternion<f64>) -> Affine3 {
    if q.norm_squared() < f64::EPSILON {
        return Affine3::identity();
    }
    UnitQuaternion::from_quaternion(q)
        .to_rotation_matrix()
        .into_inner()
}

/// Extract the proper rotation out of a linear block.
///
/// Columns are normalized to unit length, and when the block has a negative
/// determinant the third column is negated, so that the result is always a
/// proper rotation. The returned flag is `-1.0` in that case, `1.0` otherwise.
pub fn extract_rotation(linear: &Affine3) -> (Affine3, f64) {
    let mut rotation = *linear;
    for mut column in rotation.column_iter_mut() {
        let norm = column.norm();
        if norm > 0.0 {
            column /= norm;
        }
    }
    let qfac = if linear.determinant() < 0.0 { -1.0 } else { 1.0 };
    if qfac < 0.0 {
        let mut third = rotation.column_mut(2);
        third.neg_mut();
    }
    (rotation, qfac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quaternion_round_trip() {
        let q = fill_positive(Vector3::new(0.1, -0.2, 0.3));
        let r = quaternion_to_rotation(q);
        let q2 = rotation_to_quaternion(&r);
        assert_abs_diff_eq!(q.w, q2.w, epsilon = 1e-9);
        assert_abs_diff_eq!(q.i, q2.i, epsilon = 1e-9);
        assert_abs_diff_eq!(q.j, q2.j, epsilon = 1e-9);
        assert_abs_diff_eq!(q.k, q2.k, epsilon = 1e-9);
    }

    #[test]
    fn identity_quaternion() {
        let q = rotation_to_quaternion(&Affine3::identity());
        assert_abs_diff_eq!(q.w, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q.i, 0.0, epsilon = 1e-12);
        assert_eq!(quaternion_to_rotation(Quaternion::new(0., 0., 0., 0.)), Affine3::identity());
    }

    #[test]
    fn non_unit_quaternion() {
        let q = fill_positive(Vector3::new(0.3, 0.1, -0.2));
        let r = quaternion_to_rotation(q);
        assert_abs_diff_eq!(quaternion_to_rotation(q * 2.0), r, epsilon = 1e-12);
        assert_abs_diff_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn fill_positive_clamps() {
        let q = fill_positive(Vector3::new(1.0, 1e-9, 0.0));
        assert_eq!(q.w, 0.0);
    }

    #[test]
    fn rotation_from_reflection() {
        let linear = Affine3::from_diagonal(&Vector3::new(2.0, 3.0, -4.0));
        let (r, qfac) = extract_rotation(&linear);
        assert_eq!(qfac, -1.0);
        assert_abs_diff_eq!(r, Affine3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn compose_and_split() {
        let lin = Affine3::new(0., -1., 0., 1., 0., 0., 0., 0., 2.);
        let t = Vector3::new(1., 2., 3.);
        let a = compose(&lin, &t);
        assert_eq!(a[(3, 3)], 1.0);
        assert_eq!(a[(0, 3)], 1.0);
        let (lin2, t2) = linear_and_translation(&a);
        assert_eq!(lin, lin2);
        assert_eq!(t, t2);
    }
}
