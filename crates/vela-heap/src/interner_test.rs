use super::*;
use crate::gc::GcConfig;
use crate::heap::Heap;
use proptest::prelude::*;

#[test]
fn hash_bytes_is_deterministic_for_equal_content() {
    assert_eq!(hash_bytes(b"abc"), hash_bytes(b"abc"));
}

#[test]
fn hash_bytes_differs_for_different_content_in_practice() {
    assert_ne!(hash_bytes(b"abc"), hash_bytes(b"xyz"));
}

#[test]
fn lookup_after_insert_finds_the_same_object() {
    let heap = Heap::new(GcConfig::default());
    let obj = heap.alloc_string(b"registered").unwrap();
    let hash = hash_bytes(b"registered");
    let found = heap.interner().lookup(b"registered", hash).unwrap();
    assert_eq!(found, Some(obj));
}

#[test]
fn prune_removes_entries_for_unmarked_objects() {
    let heap = Heap::new(GcConfig::default());
    heap.alloc_string(b"will-be-pruned").unwrap();
    assert_eq!(heap.interner().len(), 1);
    heap.interner().prune(|_| false).unwrap();
    assert_eq!(heap.interner().len(), 0);
}

proptest! {
    /// spec.md §3 I2: two interned short strings with equal content are
    /// the same object, for any content the interning threshold admits.
    #[test]
    fn equal_short_strings_always_intern_to_one_object(bytes in proptest::collection::vec(any::<u8>(), 0..=vela_core::MAX_SHORT_STRING_LEN)) {
        let heap = Heap::new(GcConfig::default());
        let a = heap.alloc_string(&bytes).unwrap();
        let b = heap.alloc_string(&bytes).unwrap();
        prop_assert!(a.ptr_eq(b));
    }

    /// spec.md §3 I3: strings past the threshold are never interned,
    /// even when their content is identical.
    #[test]
    fn equal_long_strings_never_intern_to_one_object(byte: u8, extra_len in 0usize..64) {
        let heap = Heap::new(GcConfig::default());
        let bytes = vec![byte; vela_core::MAX_SHORT_STRING_LEN + 1 + extra_len];
        let a = heap.alloc_string(&bytes).unwrap();
        let b = heap.alloc_string(&bytes).unwrap();
        prop_assert!(!a.ptr_eq(b));
    }

    /// `hash_bytes` must agree with itself regardless of how the bytes
    /// are sliced up to produce it, since it is the interner's only key.
    #[test]
    fn hash_bytes_is_a_pure_function_of_content(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
        prop_assert_eq!(hash_bytes(&bytes), hash_bytes(&bytes));
    }
}
