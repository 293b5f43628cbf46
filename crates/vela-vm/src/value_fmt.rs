// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Value-to-string conversion shared by `PRINT` and string concatenation
//! (spec.md §4.7: "`+` also concatenates when either operand is a
//! string, converting the other via a small fixed conversion").

use vela_core::{ObjectKind, Value};

/// Render `value` the way `PRINT` and string-concatenation coercion do:
/// ints as decimal, floats as their shortest round-tripping form, bools
/// as `true`/`false`, nil as `nil`, strings as their own contents, and
/// every other object as `[object]`.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format!("{f}"),
        Value::Object(obj) => match obj.kind() {
            ObjectKind::String => unsafe { obj.header() }.as_string().as_str().to_string(),
            _ => "[object]".to_string(),
        },
    }
}
