// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! The register-window bytecode interpreter (spec.md §4.7).
//!
//! One shared register file backs every frame; a `CALL`/`ASYNC`
//! callee's window starts at its own function register (`Ra`), so
//! arguments already sit where the callee's parameter locals expect
//! them and no copy is needed on entry. `IMPORT` is the one caller that
//! instead opens a register window beyond every frame currently in use,
//! since an imported module's globals must never alias the importing
//! frame's temporaries. Grounded on `lona-vm/src/vm/mod.rs`'s
//! `Vm::run`/`call_user_fn` dispatch loop and register-file discipline,
//! restructured from recursive `call_user_fn` calls into one flat loop
//! over `frames` so `IMPORT` and `CALL` both just push a frame and let
//! the same loop carry on.

#[cfg(test)]
#[path = "interpreter_test.rs"]
mod interpreter_test;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::trace;
use vela_bytecode::{decode_a, decode_b, decode_bx, decode_c, decode_opcode, decode_sbx, decode_sbx24, op};
use vela_core::{
    Chunk, FunctionObj, ModuleObj, ObjectKind, ObjectPayload, ObjectRef, StructDefObj, StructInstanceObj, Value,
};
use vela_heap::{env, Heap, RootProvider};

use crate::arithmetic;
use crate::containers;
use crate::error::RuntimeError;
use crate::future;
use crate::value_fmt::display_value;

/// Nested call-frame limit (spec.md §7 `StackOverflow`).
pub const MAX_FRAMES: usize = 1024;
/// Total addressable registers across every live frame (spec.md §7
/// `StackOverflow`: "65536 registers").
pub const MAX_REGISTERS: usize = 65536;

/// What happens to a frame's return value once it's popped (or, for a
/// native/struct-constructor call, computed with no frame at all).
enum FrameKind {
    /// Plain call: the raw value is the result.
    Call,
    /// `ASYNC`: wrap the raw value in an already-resolved Future.
    Async,
    /// `IMPORT`: wrap the frame's own environment as a Module and enter
    /// it into the path cache.
    Import { canonical_path: PathBuf },
}

struct Frame {
    chunk: Arc<Chunk>,
    ip: usize,
    reg_base: usize,
    /// Absolute register the (possibly wrapped) return value lands in,
    /// once this frame is popped.
    result_reg: usize,
    module_env: ObjectRef,
    module_path: Option<Box<str>>,
    kind: FrameKind,
}

/// One interpreter instance: a register file, a call stack, the module
/// cache, and a handle to the shared heap.
pub struct Vm {
    heap: Arc<Heap>,
    regs: Box<[Value]>,
    frames: Vec<Frame>,
    modules: std::collections::HashMap<PathBuf, ObjectRef>,
}

impl Vm {
    #[must_use]
    pub fn new(heap: Arc<Heap>) -> Self {
        Self {
            heap,
            regs: vec![Value::Nil; MAX_REGISTERS].into_boxed_slice(),
            frames: Vec::new(),
            modules: std::collections::HashMap::new(),
        }
    }

    /// One past the highest register any *currently active* frame can
    /// reach. Recomputed from the live frame stack on every call instead
    /// of tracked as a running maximum, so it shrinks back down as deep
    /// frames return (spec.md §4.3 step 1: "every value in the value
    /// stack up to stack top" means the current top, not a historic
    /// peak). Also the next free base for a fresh, non-overlapping
    /// `IMPORT` window — "beyond every frame currently in use" is
    /// exactly this quantity.
    ///
    /// A nested callee's window does not always extend past its
    /// caller's (a deep function can call a shallow one), so this maxes
    /// over every active frame rather than trusting the top of the
    /// stack alone.
    fn live_top(&self) -> usize {
        self.frames.iter().map(|f| f.reg_base + f.chunk.max_regs as usize).max().unwrap_or(0)
    }

    #[must_use]
    pub fn heap(&self) -> &Arc<Heap> {
        &self.heap
    }

    /// Run a freshly compiled chunk to completion in its own register
    /// window, returning whatever its top-level `return` (or the
    /// implicit `return nil` every module body ends with) produced.
    pub fn execute_chunk(
        &mut self,
        chunk: Arc<Chunk>,
        module_env: ObjectRef,
        module_path: Option<Box<str>>,
    ) -> Result<Value, RuntimeError> {
        let reg_base = self.live_top();
        self.push_frame(chunk, reg_base, reg_base, module_env, module_path, FrameKind::Call)?;
        self.run()
    }

    fn push_frame(
        &mut self,
        chunk: Arc<Chunk>,
        reg_base: usize,
        result_reg: usize,
        module_env: ObjectRef,
        module_path: Option<Box<str>>,
        kind: FrameKind,
    ) -> Result<(), RuntimeError> {
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::StackOverflow { limit: MAX_FRAMES });
        }
        let new_top = reg_base + chunk.max_regs as usize;
        if new_top > MAX_REGISTERS {
            return Err(RuntimeError::RegisterOverflow { limit: MAX_REGISTERS });
        }
        self.frames.push(Frame { chunk, ip: 0, reg_base, result_reg, module_env, module_path, kind });
        Ok(())
    }

    /// A previously imported module for `canonical_path`, if the cache
    /// already has one (spec.md §4.7 "cache by canonical path").
    pub(crate) fn cached_module(&self, canonical_path: &PathBuf) -> Option<Value> {
        self.modules.get(canonical_path).map(|obj| Value::Object(*obj))
    }

    /// Push a fresh register window beyond every frame currently in use
    /// and start executing a just-compiled module chunk (spec.md §4.7
    /// "Module import"). Caller is expected to have already checked
    /// [`Self::cached_module`].
    pub(crate) fn begin_import(
        &mut self,
        canonical_path: PathBuf,
        chunk: Arc<Chunk>,
        module_env: ObjectRef,
        module_path: Box<str>,
        result_reg: usize,
    ) -> Result<Option<Value>, RuntimeError> {
        let reg_base = self.live_top();
        self.push_frame(chunk, reg_base, result_reg, module_env, Some(module_path), FrameKind::Import { canonical_path })?;
        Ok(None)
    }

    fn maybe_gc(&mut self) -> Result<(), RuntimeError> {
        let heap = Arc::clone(&self.heap);
        heap.maybe_collect(self)?;
        Ok(())
    }

    fn finish_frame(&mut self, heap: &Heap, kind: FrameKind, module_env: ObjectRef, raw: Value) -> Result<Value, RuntimeError> {
        match kind {
            FrameKind::Call => Ok(raw),
            FrameKind::Async => future::alloc_resolved(heap, raw),
            FrameKind::Import { canonical_path } => {
                let name = canonical_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let path_str = canonical_path.to_string_lossy().into_owned();
                let module = ModuleObj { name: name.into(), path: Some(path_str.into()), env: module_env };
                let size = std::mem::size_of::<ModuleObj>() as u32;
                let obj = heap.allocate(ObjectKind::Module, false, size, ObjectPayload::Module(module))?;
                self.modules.insert(canonical_path, obj);
                Ok(Value::Object(obj))
            }
        }
    }

    /// Drive every live frame to completion; returns once the frame
    /// `execute_chunk` pushed (and everything it transitively called)
    /// has returned.
    fn run(&mut self) -> Result<Value, RuntimeError> {
        loop {
            self.maybe_gc()?;
            let frame_idx = self.frames.len() - 1;
            let (opcode, instr, line, reg_base) = {
                let frame = &mut self.frames[frame_idx];
                let instr = frame.chunk.code[frame.ip];
                let line = frame.chunk.line_for(frame.ip);
                frame.ip += 1;
                (decode_opcode(instr), instr, line, frame.reg_base)
            };
            trace!(opcode = op::name(opcode), frame_idx, "dispatch");

            match opcode {
                op::MOVE => {
                    let (a, b) = (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize);
                    self.regs[a] = self.regs[b];
                }
                op::LOADK => {
                    let a = reg_base + decode_a(instr) as usize;
                    let bx = decode_bx(instr) as usize;
                    self.regs[a] = self.frames[frame_idx].chunk.constants[bx];
                }
                op::LOADI => {
                    let a = reg_base + decode_a(instr) as usize;
                    self.regs[a] = Value::Int(i64::from(decode_sbx(instr)));
                }
                op::LOADNIL => self.regs[reg_base + decode_a(instr) as usize] = Value::Nil,
                op::LOADTRUE => self.regs[reg_base + decode_a(instr) as usize] = Value::Bool(true),
                op::LOADFALSE => self.regs[reg_base + decode_a(instr) as usize] = Value::Bool(false),

                op::GETGLOBAL => {
                    let a = reg_base + decode_a(instr) as usize;
                    let name = self.constant_object(frame_idx, decode_bx(instr) as usize);
                    let module_env = self.frames[frame_idx].module_env;
                    self.regs[a] = env::get_global(module_env, name).map_err(|_| name_error(name, line))?;
                }
                op::SETGLOBAL => {
                    let a = reg_base + decode_a(instr) as usize;
                    let name = self.constant_object(frame_idx, decode_bx(instr) as usize);
                    let module_env = self.frames[frame_idx].module_env;
                    env::get_global(module_env, name).map_err(|_| name_error(name, line))?;
                    env::define_global(&self.heap, module_env, name, self.regs[a])?;
                }
                op::DEFGLOBAL => {
                    let a = reg_base + decode_a(instr) as usize;
                    let name = self.constant_object(frame_idx, decode_bx(instr) as usize);
                    let module_env = self.frames[frame_idx].module_env;
                    env::define_global(&self.heap, module_env, name, self.regs[a])?;
                }

                op::ADD | op::SUB | op::MUL | op::DIV | op::MOD => {
                    let (a, b, c) =
                        (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize, reg_base + decode_c(instr) as usize);
                    let (lhs, rhs) = (self.regs[b], self.regs[c]);
                    self.regs[a] = match opcode {
                        op::ADD => arithmetic::add(&self.heap, lhs, rhs, line)?,
                        op::SUB => arithmetic::sub(lhs, rhs, line)?,
                        op::MUL => arithmetic::mul(lhs, rhs, line)?,
                        op::DIV => arithmetic::div(lhs, rhs, line)?,
                        _ => arithmetic::rem(lhs, rhs, line)?,
                    };
                }
                op::NEG => {
                    let (a, b) = (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize);
                    self.regs[a] = arithmetic::neg(self.regs[b], line)?;
                }
                op::LT | op::LE | op::GT | op::GE => {
                    let (a, b, c) =
                        (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize, reg_base + decode_c(instr) as usize);
                    let ord = arithmetic::compare(self.regs[b], self.regs[c], op::name(opcode), line)?;
                    self.regs[a] = Value::Bool(match opcode {
                        op::LT => ord.is_lt(),
                        op::LE => ord.is_le(),
                        op::GT => ord.is_gt(),
                        _ => ord.is_ge(),
                    });
                }
                op::EQ | op::NE => {
                    let (a, b, c) =
                        (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize, reg_base + decode_c(instr) as usize);
                    let equal = arithmetic::values_equal(self.regs[b], self.regs[c]);
                    self.regs[a] = Value::Bool(if opcode == op::EQ { equal } else { !equal });
                }
                op::NOT => {
                    let (a, b) = (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize);
                    self.regs[a] = Value::Bool(!self.regs[b].is_truthy());
                }

                op::JMP | op::LOOP => {
                    let offset = decode_sbx24(instr);
                    self.jump(frame_idx, offset);
                }
                op::JMPF | op::JMPT => {
                    let a = reg_base + decode_a(instr) as usize;
                    let take = self.regs[a].is_truthy() == (opcode == op::JMPT);
                    if take {
                        self.jump(frame_idx, i32::from(decode_sbx(instr)));
                    }
                }

                op::CALL => {
                    let fn_reg = reg_base + decode_a(instr) as usize;
                    let argc = decode_b(instr);
                    if let Some(value) = self.begin_call(fn_reg, argc, fn_reg, line, FrameKind::Call)? {
                        self.regs[fn_reg] = value;
                    }
                }
                op::ASYNC => {
                    let dest = reg_base + decode_a(instr) as usize;
                    let fn_reg = reg_base + decode_b(instr) as usize;
                    let argc = decode_c(instr);
                    if let Some(value) = self.begin_call(fn_reg, argc, dest, line, FrameKind::Async)? {
                        self.regs[dest] = value;
                    }
                }
                op::AWAIT => {
                    let (a, b) = (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize);
                    self.regs[a] = future::await_value(self.regs[b], line)?;
                }

                op::RETURN | op::RETURNNIL => {
                    let value = if opcode == op::RETURN { self.regs[reg_base + decode_a(instr) as usize] } else { Value::Nil };
                    let finished = self.frames.pop().expect("the frame this loop is executing is still on the stack");
                    let heap = Arc::clone(&self.heap);
                    let result_reg = finished.result_reg;
                    let module_env = finished.module_env;
                    let final_value = self.finish_frame(&heap, finished.kind, module_env, value)?;
                    if self.frames.is_empty() {
                        return Ok(final_value);
                    }
                    self.regs[result_reg] = final_value;
                }

                op::GETPROP => {
                    let (a, b) = (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize);
                    let field = self.constant_object(frame_idx, decode_c(instr) as usize);
                    self.regs[a] = containers::get_prop(self.regs[b], field, line)?;
                }
                op::SETPROP => {
                    let (a, c) = (reg_base + decode_a(instr) as usize, reg_base + decode_c(instr) as usize);
                    let field = self.constant_object(frame_idx, decode_b(instr) as usize);
                    containers::set_prop(&self.heap, self.regs[a], field, self.regs[c], line)?;
                }
                op::GETIDX => {
                    let (a, b, c) =
                        (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize, reg_base + decode_c(instr) as usize);
                    self.regs[a] = containers::get_index(self.regs[b], self.regs[c], line)?;
                }
                op::SETIDX => {
                    let (a, b, c) =
                        (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize, reg_base + decode_c(instr) as usize);
                    containers::set_index(&self.heap, self.regs[a], self.regs[b], self.regs[c], line)?;
                }

                op::NEWARRAY => self.regs[reg_base + decode_a(instr) as usize] = containers::new_array(&self.heap)?,
                op::NEWMAP => self.regs[reg_base + decode_a(instr) as usize] = containers::new_map(&self.heap)?,
                op::STRUCTDEF => self.structdef(frame_idx, instr)?,

                op::PUSH => {
                    let (a, b) = (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize);
                    containers::push(&self.heap, self.regs[a], self.regs[b], line)?;
                }
                op::POP => {
                    let (a, b) = (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize);
                    self.regs[a] = containers::pop(self.regs[b], line)?;
                }
                op::LEN => {
                    let (a, b) = (reg_base + decode_a(instr) as usize, reg_base + decode_b(instr) as usize);
                    self.regs[a] = containers::len(self.regs[b], line)?;
                }

                op::IMPORT => {
                    let a = reg_base + decode_a(instr) as usize;
                    let path_name = self.constant_object(frame_idx, decode_bx(instr) as usize);
                    let path_text = unsafe { path_name.header() }.as_string().as_str().to_string();
                    let importer_path = self.frames[frame_idx].module_path.clone();
                    if let Some(value) = crate::module::begin_import(self, &path_text, importer_path.as_deref(), a)? {
                        self.regs[a] = value;
                    }
                }

                op::PRINT => {
                    let a = reg_base + decode_a(instr) as usize;
                    println!("{}", display_value(&self.regs[a]));
                }
                op::HALT => return Ok(Value::Nil),
                op::NOP => {}

                _ => return Err(RuntimeError::InvalidOpcode { opcode, line }),
            }
        }
    }

    fn jump(&mut self, frame_idx: usize, offset: i32) {
        let frame = &mut self.frames[frame_idx];
        frame.ip = (frame.ip as i64 + i64::from(offset)) as usize;
    }

    fn constant_object(&self, frame_idx: usize, idx: usize) -> ObjectRef {
        self.frames[frame_idx].chunk.constants[idx]
            .as_object()
            .expect("the compiler only ever emits name/field constants as interned strings")
    }

    fn structdef(&mut self, frame_idx: usize, instr: u32) -> Result<(), RuntimeError> {
        let field_count = decode_a(instr) as usize;
        let name_idx = decode_bx(instr) as usize;
        let (name, fields, module_env) = {
            let chunk = Arc::clone(&self.frames[frame_idx].chunk);
            let name = chunk.constants[name_idx].as_object().expect("STRUCTDEF name constant is always a string");
            let fields: Vec<ObjectRef> = chunk.constants[name_idx + 1..name_idx + 1 + field_count]
                .iter()
                .map(|v| v.as_object().expect("STRUCTDEF field constants are always strings"))
                .collect();
            (name, fields, self.frames[frame_idx].module_env)
        };
        let name_str = unsafe { name.header() }.as_string().as_str().to_string();
        let def = StructDefObj { name: name_str.into(), fields };
        let size = std::mem::size_of::<StructDefObj>() as u32;
        let obj = self.heap.allocate(ObjectKind::StructDef, false, size, ObjectPayload::StructDef(def))?;
        env::define_global(&self.heap, module_env, name, Value::Object(obj))?;
        Ok(())
    }

    /// Shared dispatch for `CALL`/`ASYNC`: native and struct-constructor
    /// callees run to completion immediately (`Ok(Some(value))`);
    /// bytecode callees push a frame and defer (`Ok(None)`), with the
    /// eventual `RETURN` writing into `deposit_reg` through `kind`'s
    /// wrapping.
    fn begin_call(
        &mut self,
        fn_reg_abs: usize,
        argc: u8,
        deposit_reg: usize,
        line: u32,
        kind: FrameKind,
    ) -> Result<Option<Value>, RuntimeError> {
        match self.regs[fn_reg_abs] {
            Value::Object(obj) if obj.kind() == ObjectKind::Function => {
                let function = match &unsafe { obj.object() }.payload {
                    ObjectPayload::Function(f) => f,
                    _ => unreachable!("kind() said Function"),
                };
                match function {
                    FunctionObj::Bytecode { chunk, arity, module_env, module_path, name } => {
                        if argc != *arity {
                            return Err(RuntimeError::ArityError { name: name.clone(), expected: *arity, got: argc, line });
                        }
                        self.push_frame(Arc::clone(chunk), fn_reg_abs, deposit_reg, *module_env, module_path.clone(), kind)?;
                        Ok(None)
                    }
                    FunctionObj::Native { func, arity, name } => {
                        if let Some(expected) = arity {
                            if argc != *expected {
                                return Err(RuntimeError::ArityError { name: name.clone(), expected: *expected, got: argc, line });
                            }
                        }
                        let args = &self.regs[fn_reg_abs + 1..fn_reg_abs + 1 + argc as usize];
                        let raw = func(args)
                            .map_err(|message| RuntimeError::NativeError { name: name.clone(), message, line })?;
                        let heap = Arc::clone(&self.heap);
                        Ok(Some(self.wrap_immediate(&heap, raw, kind)?))
                    }
                }
            }
            Value::Object(obj) if obj.kind() == ObjectKind::StructDef => {
                let def = match &unsafe { obj.object() }.payload {
                    ObjectPayload::StructDef(d) => d,
                    _ => unreachable!("kind() said StructDef"),
                };
                let expected: u8 = def.fields.len().try_into().unwrap_or(u8::MAX);
                if argc != expected {
                    return Err(RuntimeError::ArityError { name: def.name.clone(), expected, got: argc, line });
                }
                let fields = self.regs[fn_reg_abs + 1..fn_reg_abs + 1 + argc as usize].to_vec();
                let instance = StructInstanceObj { def: obj, fields };
                let size = std::mem::size_of::<StructInstanceObj>() as u32;
                let instance_ref = self.heap.allocate(ObjectKind::StructInstance, false, size, ObjectPayload::StructInstance(instance))?;
                let heap = Arc::clone(&self.heap);
                Ok(Some(self.wrap_immediate(&heap, Value::Object(instance_ref), kind)?))
            }
            other => Err(RuntimeError::NotCallable { type_name: other.type_name(), line }),
        }
    }

    fn wrap_immediate(&mut self, heap: &Heap, value: Value, kind: FrameKind) -> Result<Value, RuntimeError> {
        match kind {
            FrameKind::Call => Ok(value),
            FrameKind::Async => future::alloc_resolved(heap, value),
            FrameKind::Import { .. } => unreachable!("IMPORT never goes through begin_call"),
        }
    }
}

impl RootProvider for Vm {
    fn enumerate_roots(&self, push: &mut dyn FnMut(ObjectRef)) {
        for value in &self.regs[..self.live_top()] {
            if let Value::Object(obj) = value {
                push(*obj);
            }
        }
        for frame in &self.frames {
            push(frame.module_env);
        }
        for obj in self.modules.values() {
            push(*obj);
        }
    }
}

pub(crate) fn name_error(name: ObjectRef, line: u32) -> RuntimeError {
    let name = unsafe { name.header() }.as_string().as_str().to_string();
    RuntimeError::NameError { name, line }
}
