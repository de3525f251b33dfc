use rbitset::RoaringBitmap;

#[test]
fn union_of_disjoint_ranges() {
    let a: RoaringBitmap = (0..1000).collect();
    let b: RoaringBitmap = (2000..3000).collect();
    let union = &a | &b;
    assert_eq!(union.len(), 2000);
    assert!(union.contains(500));
    assert!(union.contains(2500));
    assert!(!union.contains(1500));
}

#[test]
fn intersection_across_container_boundary() {
    let a: RoaringBitmap = (60000..70000).collect();
    let b: RoaringBitmap = (65000..75000).collect();
    let inter = &a & &b;
    assert_eq!(inter.len(), 5000);
    assert_eq!(inter.min(), Some(65000));
    assert_eq!(inter.max(), Some(69999));
}

#[test]
fn difference_and_symmetric_difference() {
    let a: RoaringBitmap = (0..10).collect();
    let b: RoaringBitmap = (5..15).collect();
    assert_eq!((&a - &b).len(), 5);
    assert_eq!((&b - &a).len(), 5);
    assert_eq!((&a ^ &b).len(), 10);
}

#[test]
fn assign_operators_mutate_in_place() {
    let mut a: RoaringBitmap = (0..10).collect();
    let b: RoaringBitmap = (5..15).collect();
    a &= &b;
    assert_eq!(a.len(), 5);
    assert_eq!(a.min(), Some(5));
}

#[test]
fn empty_bitmap_is_identity_for_union() {
    let a: RoaringBitmap = (0..100).collect();
    let empty = RoaringBitmap::new();
    assert_eq!(&a | &empty, a);
    assert_eq!(&a & &empty, empty);
}

#[test]
fn lazy_union_then_repair_matches_eager() {
    let a: RoaringBitmap = (0..5000).collect();
    let b: RoaringBitmap = (2500..7500).collect();

    let mut lazy = a.clone();
    lazy.lazy_union_with(&b);
    lazy.repair_cardinality();

    let mut eager = a.clone();
    eager.union_with(&b);

    assert_eq!(lazy, eager);
}

#[test]
fn run_optimize_preserves_contents() {
    let mut bm: RoaringBitmap = (0..50000).collect();
    let before: Vec<u32> = bm.iter().collect();
    bm.run_optimize();
    let after: Vec<u32> = bm.iter().collect();
    assert_eq!(before, after);
}
