use super::*;
use crate::env::get_global;
use crate::gc::GcConfig;
use crate::heap::Heap;

fn double(args: &[Value]) -> Result<Value, Box<str>> {
    match args {
        [Value::Int(n)] => Ok(Value::Int(n * 2)),
        _ => Err("double expects one integer".into()),
    }
}

#[test]
fn define_native_registers_a_callable_first_class_value() {
    let heap = Heap::new(GcConfig::default());
    let env = heap.alloc_environment(None, true).unwrap();
    define_native(&heap, env, "double", double, Some(1)).unwrap();

    let value = get_global(env, heap.alloc_string(b"double").unwrap()).unwrap();
    assert!(value.is_callable());
    let Value::Object(obj) = value else { panic!("expected function object") };
    assert_eq!(obj.kind(), ObjectKind::Function);
}

struct MathModule;
impl NativeModule for MathModule {
    fn name(&self) -> &str {
        "math"
    }
    fn register(&self, heap: &Heap, env: ObjectRef) -> Result<(), HeapError> {
        define_native(heap, env, "double", double, Some(1))
    }
}

#[test]
fn install_registers_every_listed_module() {
    let heap = Heap::new(GcConfig::default());
    let env = heap.alloc_environment(None, true).unwrap();
    install(&[&MathModule], &heap, env).unwrap();
    assert!(get_global(env, heap.alloc_string(b"double").unwrap()).is_ok());
}
