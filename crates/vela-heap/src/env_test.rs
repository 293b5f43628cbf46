use super::*;
use crate::gc::GcConfig;
use crate::heap::Heap;

fn name(heap: &Heap, s: &str) -> ObjectRef {
    heap.alloc_string(s.as_bytes()).unwrap()
}

#[test]
fn define_then_get_global_round_trips() {
    let heap = Heap::new(GcConfig::default());
    let env = heap.alloc_environment(None, false).unwrap();
    let x = name(&heap, "x");
    define_global(&heap, env, x, Value::Int(10)).unwrap();
    assert_eq!(get_global(env, x).unwrap(), Value::Int(10));
}

#[test]
fn redefining_a_global_updates_in_place() {
    let heap = Heap::new(GcConfig::default());
    let env = heap.alloc_environment(None, false).unwrap();
    let x = name(&heap, "x");
    define_global(&heap, env, x, Value::Int(1)).unwrap();
    define_global(&heap, env, x, Value::Int(2)).unwrap();
    assert_eq!(get_global(env, x).unwrap(), Value::Int(2));
}

#[test]
fn getting_an_undefined_global_is_an_error() {
    let heap = Heap::new(GcConfig::default());
    let env = heap.alloc_environment(None, false).unwrap();
    let missing = name(&heap, "missing");
    let err = get_global(env, missing).unwrap_err();
    assert!(matches!(err, HeapError::UndefinedName { .. }));
}

#[test]
fn module_globals_are_not_visible_in_a_sibling_module_but_are_via_parent_chain() {
    // spec.md §8 P7: a `var x` in module A is not a bare name in module
    // B; here we model "bare name" as an environment with no parent
    // link to A, and "visible through a parent" as a child scope.
    let heap = Heap::new(GcConfig::default());
    let module_a = heap.alloc_environment(None, false).unwrap();
    let module_b = heap.alloc_environment(None, false).unwrap();
    let child_of_a = heap.alloc_environment(Some(module_a), false).unwrap();

    let x = name(&heap, "x");
    define_global(&heap, module_a, x, Value::Int(99)).unwrap();

    assert!(get_global(module_b, x).is_err());
    assert_eq!(get_global(child_of_a, x).unwrap(), Value::Int(99));
}

#[test]
fn variable_and_function_tables_are_independent() {
    let heap = Heap::new(GcConfig::default());
    let env = heap.alloc_environment(None, false).unwrap();
    let f = name(&heap, "f");
    define_function(&heap, env, f, Value::Int(42)).unwrap();
    assert!(get_global(env, f).is_err());
    assert_eq!(get_function(env, f).unwrap(), Value::Int(42));
}

#[test]
fn many_names_hashing_into_the_same_bucket_still_resolve_correctly() {
    let heap = Heap::new(GcConfig::default());
    let env = heap.alloc_environment(None, false).unwrap();
    let names: Vec<ObjectRef> = (0..BUCKET_COUNT * 3).map(|i| name(&heap, &format!("n{i}"))).collect();
    for (i, n) in names.iter().enumerate() {
        define_global(&heap, env, *n, Value::Int(i as i64)).unwrap();
    }
    for (i, n) in names.iter().enumerate() {
        assert_eq!(get_global(env, *n).unwrap(), Value::Int(i as i64));
    }
}
