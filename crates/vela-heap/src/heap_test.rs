use super::*;
use crate::gc::GcConfig;
use proptest::prelude::*;

fn heap() -> Heap {
    Heap::new(GcConfig::default())
}

#[test]
fn allocating_a_string_links_it_into_the_nursery_and_bumps_byte_counter() {
    let h = heap();
    let before = h.bytes_allocated();
    h.alloc_string(b"hello").unwrap();
    assert!(h.bytes_allocated() > before);
}

#[test]
fn interning_returns_the_same_object_for_equal_short_strings() {
    let h = heap();
    let a = h.alloc_string(b"shared").unwrap();
    let b = h.alloc_string(b"shared").unwrap();
    assert!(a.ptr_eq(b));
}

#[test]
fn distinct_short_strings_intern_to_distinct_objects() {
    let h = heap();
    let a = h.alloc_string(b"alpha").unwrap();
    let b = h.alloc_string(b"beta").unwrap();
    assert!(!a.ptr_eq(b));
}

#[test]
fn long_strings_are_not_interned() {
    let h = heap();
    let long = vec![b'x'; vela_core::MAX_SHORT_STRING_LEN + 1];
    let a = h.alloc_string(&long).unwrap();
    let b = h.alloc_string(&long).unwrap();
    assert!(!a.ptr_eq(b), "long strings must allocate fresh objects each time");
}

#[test]
fn unreachable_objects_are_reclaimed_and_reachable_ones_survive() {
    let h = heap();
    let kept = h.alloc_string(b"kept").unwrap();
    h.alloc_string(b"garbage-unique-payload").unwrap();

    let stats = h.collect(&OneRoot(kept)).unwrap();
    assert_eq!(stats.objects_freed, 1);
    assert!(unsafe { kept.header() }.generation() == vela_core::Generation::Old);
}

#[test]
fn a_second_collection_with_the_same_roots_frees_nothing_further() {
    let h = heap();
    let kept = h.alloc_string(b"kept").unwrap();
    h.collect(&OneRoot(kept)).unwrap();
    let stats = h.collect(&OneRoot(kept)).unwrap();
    assert_eq!(stats.objects_freed, 0);
}

#[test]
fn collecting_with_no_roots_frees_everything() {
    let h = heap();
    h.alloc_string(b"one").unwrap();
    h.alloc_string(b"two").unwrap();
    let stats = h.collect(&NoRoots).unwrap();
    assert_eq!(stats.objects_freed, 2);
}

#[test]
fn array_elements_keep_their_objects_alive() {
    let h = heap();
    let element = h.alloc_string(b"inside-array").unwrap();
    let array = h.alloc_array(vec![Value::Object(element)]).unwrap();

    let stats = h.collect(&OneRoot(array)).unwrap();
    assert_eq!(stats.objects_freed, 0);
}

struct OneRoot(ObjectRef);
impl RootProvider for OneRoot {
    fn enumerate_roots(&self, push: &mut dyn FnMut(ObjectRef)) {
        push(self.0);
    }
}

proptest! {
    /// spec.md §4.3 "Write barrier contract": storing a pointer into an
    /// already-black container mid-cycle must re-gray that container, or
    /// the newly reachable white object is missed and swept away. Fuzzes
    /// over how many late references get stored and what they contain.
    #[test]
    fn write_barrier_keeps_a_late_mutation_into_a_black_container_alive(
        payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..32), 1..8),
    ) {
        let heap = heap();
        let array = heap.alloc_array(Vec::new()).unwrap();

        heap.begin_marking().unwrap();
        let mut gray = heap.seed_roots(&OneRoot(array)).unwrap();
        heap.drain_gray(&mut gray).unwrap();
        prop_assert!(unsafe { array.header() }.is_marked(), "the root container must already be black");

        let mut late = Vec::new();
        for bytes in &payloads {
            let obj = heap.alloc_string(bytes).unwrap();
            prop_assert!(!unsafe { obj.header() }.is_marked(), "an object unreachable at scan time must still be white");
            late.push(obj);
        }

        let mut array = array;
        match unsafe { &mut array.object_mut().payload } {
            ObjectPayload::Array(a) => a.items.extend(late.iter().copied().map(Value::Object)),
            _ => unreachable!("kind() said Array"),
        }
        heap.write_barrier(array).unwrap();

        heap.drain_gray(&mut gray).unwrap();
        heap.finish_marking().unwrap();
        let stats = heap.sweep_and_resize().unwrap();
        heap.finish_sweeping().unwrap();

        prop_assert_eq!(stats.objects_freed, 0, "the write barrier must keep every late reference alive through the sweep");
        for obj in late {
            prop_assert!(unsafe { obj.header() }.is_marked());
        }
    }

    /// Without the barrier call, the same late mutation is unsound: the
    /// child is missed and freed out from under the still-live container.
    /// This pins down why the barrier is mandatory, not just convenient.
    #[test]
    fn omitting_the_write_barrier_loses_the_late_reference(bytes in proptest::collection::vec(any::<u8>(), 1..32)) {
        let heap = heap();
        let array = heap.alloc_array(Vec::new()).unwrap();

        heap.begin_marking().unwrap();
        let mut gray = heap.seed_roots(&OneRoot(array)).unwrap();
        heap.drain_gray(&mut gray).unwrap();

        let late = heap.alloc_string(&bytes).unwrap();
        let mut array = array;
        match unsafe { &mut array.object_mut().payload } {
            ObjectPayload::Array(a) => a.items.push(Value::Object(late)),
            _ => unreachable!("kind() said Array"),
        }
        // Deliberately skip `heap.write_barrier(array)`.

        heap.drain_gray(&mut gray).unwrap();
        heap.finish_marking().unwrap();
        let stats = heap.sweep_and_resize().unwrap();
        heap.finish_sweeping().unwrap();

        prop_assert_eq!(stats.objects_freed, 1, "without the barrier the late reference must be lost, demonstrating why it is mandatory");
    }
}
