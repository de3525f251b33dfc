use rbitset::RoaringBitmap;

#[test]
fn iterates_ascending_across_container_boundaries() {
    let values = vec![5u32, 70000, 1, 3, 200000, 70001];
    let bm: RoaringBitmap = values.iter().copied().collect();
    let collected: Vec<u32> = bm.iter().collect();
    let mut sorted = values;
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(collected, sorted);
}

#[test]
fn size_hint_matches_len() {
    let bm: RoaringBitmap = (0..10_000).collect();
    let iter = bm.iter();
    assert_eq!(iter.size_hint().0, bm.len() as usize);
}

#[test]
fn from_sorted_iter_is_equivalent_to_insert() {
    let sorted: Vec<u32> = (0..10_000).step_by(3).collect();
    let from_sorted = RoaringBitmap::from_sorted_iter(sorted.iter().copied()).unwrap();
    let from_insert: RoaringBitmap = sorted.into_iter().collect();
    assert_eq!(from_sorted, from_insert);
}

#[test]
fn extend_accumulates_values() {
    let mut bm = RoaringBitmap::new();
    bm.extend(vec![3u32, 1, 2]);
    assert_eq!(bm.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
}
