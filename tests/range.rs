use rbitset::RoaringBitmap;

#[test]
fn insert_range_touching_top_of_value_space() {
    let mut bm = RoaringBitmap::new();
    let added = bm.insert_range((u32::MAX as u64 - 10)..=(u32::MAX as u64));
    assert_eq!(added, 11);
    assert!(bm.contains(u32::MAX));
    assert_eq!(bm.max(), Some(u32::MAX));
}

#[test]
fn remove_range_shrinks_container() {
    let mut bm: RoaringBitmap = (0..1000).collect();
    let removed = bm.remove_range(100..200);
    assert_eq!(removed, 100);
    assert_eq!(bm.len(), 900);
    assert!(!bm.contains(150));
    assert!(bm.contains(99));
    assert!(bm.contains(200));
}

#[test]
fn contains_range_respects_holes() {
    let mut bm: RoaringBitmap = (0..100).collect();
    assert!(bm.contains_range(10..90));
    bm.remove(50);
    assert!(!bm.contains_range(10..90));
    assert!(bm.contains_range(10..50));
}

#[test]
fn flip_over_full_container() {
    let mut bm = RoaringBitmap::new();
    bm.insert_range(0..0x1_0000);
    bm.flip(0u64..0x1_0000);
    assert!(bm.is_empty());
}

#[test]
fn rank_at_every_boundary() {
    let bm: RoaringBitmap = [0u32, 65535, 65536, 131071].iter().copied().collect();
    assert_eq!(bm.rank(0), 1);
    assert_eq!(bm.rank(65535), 2);
    assert_eq!(bm.rank(65536), 3);
    assert_eq!(bm.rank(131071), 4);
}
