use nrecon::array::{StridedView, ALL};
use nrecon::NiftiError;
use pretty_assertions::assert_eq;

fn volume() -> StridedView<i32, 3> {
    StridedView::from_vec([4, 3, 2], (0..24).collect()).unwrap()
}

#[test]
fn slice_then_pack() {
    let v = volume();
    let sub = v.slice::<3>([1, 0, 0], [2, ALL, ALL]).unwrap();
    assert_eq!(sub.dims(), &[2, 3, 2]);
    assert!(!sub.is_packed());
    assert_eq!(sub.to_vec(), vec![1, 2, 5, 6, 9, 10, 13, 14, 17, 18, 21, 22]);

    let packed = sub.pack();
    assert!(packed.is_packed());
    assert!(!packed.shares_buffer(&v));
    assert_eq!(packed.to_vec(), sub.to_vec());
}

#[test]
fn dropping_axes() {
    let v = volume();
    let row = v.slice::<1>([0, 2, 1], [ALL, 0, 0]).unwrap();
    assert_eq!(row.dims(), &[4]);
    assert_eq!(row.to_vec(), vec![20, 21, 22, 23]);
    assert!(row.shares_buffer(&v));

    assert!(matches!(
        v.slice::<2>([0, 0, 0], [ALL, 0, 0]),
        Err(NiftiError::SliceRank { dropped: 2, .. })
    ));
}

#[test]
fn strided_slices() {
    let v = volume();
    let every_other = v.slice_strided::<3>([0, 0, 0], [ALL, ALL, ALL], [2, 1, 1]).unwrap();
    assert_eq!(every_other.dims(), &[2, 3, 2]);
    assert_eq!(every_other.get([1, 1, 1]).unwrap(), 18);
    assert!(v.slice_strided::<3>([0, 0, 0], [1, 1, 1], [0, 1, 1]).is_err());
    assert!(v.slice::<3>([3, 0, 0], [2, 1, 1]).is_err());
}

#[test]
fn writes_through_slices() {
    let v = volume();
    let plane = v.slice::<2>([0, 0, 1], [ALL, ALL, 0]).unwrap();
    plane.set([3, 2], -1).unwrap();
    assert_eq!(v.get([3, 2, 1]).unwrap(), -1);
    plane.assign(vec![0; 12]).unwrap();
    assert_eq!(&v.to_vec()[12..], &[0; 12][..]);
    assert_eq!(v.get([0, 0, 0]).unwrap(), 0);
    assert_eq!(v.get([1, 0, 0]).unwrap(), 1);
}

#[test]
fn reshape_round_trip() {
    let v = volume();
    let flat = v.reshape([24]).unwrap();
    assert!(flat.shares_buffer(&v));
    assert_eq!(flat.get([7]).unwrap(), 7);
    let back = flat.reshape([4, 3, 2]).unwrap();
    assert_eq!(back.to_vec(), v.to_vec());
    assert!(matches!(
        v.reshape([5, 5]),
        Err(NiftiError::SizeMismatch { expected: 24, got: 25 })
    ));

    let sub = v.slice::<3>([1, 0, 0], [2, ALL, ALL]).unwrap();
    assert!(matches!(sub.reshape([12]), Err(NiftiError::NotPacked)));
    assert_eq!(sub.pack().reshape([12]).unwrap().len(), 12);
}

#[test]
fn iterator_positions() {
    let v = volume();
    let mut it = v.iter();
    assert_eq!(it.len(), 24);
    assert_eq!(it.next(), Some(0));
    assert_eq!(it.index(), [1, 0, 0]);
    let rest: Vec<i32> = it.by_ref().collect();
    assert_eq!(rest.len(), 23);
    assert!(it == v.iter_end());
}
