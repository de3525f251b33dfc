use rbitset::RoaringBitmap;

#[test]
fn clone_is_independent_of_source() {
    let mut a: RoaringBitmap = (0..100).collect();
    let b = a.clone();
    a.insert(1000);
    a.remove(5);
    assert!(!b.contains(1000));
    assert!(b.contains(5));
    assert_eq!(b.len(), 100);
    assert_eq!(a.len(), 100);
}

#[test]
fn clone_shares_storage_until_write() {
    // Cloning is cheap because containers share their `Rc<Store>`; the first
    // write after a clone is what triggers the actual copy.
    let a: RoaringBitmap = (0..50_000).collect();
    let mut b = a.clone();
    assert_eq!(a, b);
    b.insert(999_999);
    assert_ne!(a, b);
    assert_eq!(a.len(), 50_000);
}

#[test]
fn equality_ignores_representation() {
    let mut array_form: RoaringBitmap = (0..10).collect();
    let mut run_form = array_form.clone();
    run_form.run_optimize();
    assert_eq!(array_form, run_form);
    array_form.insert(20);
    assert_ne!(array_form, run_form);
}
