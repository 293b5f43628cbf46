// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Human-readable chunk listing, grounded on `lona-vm`'s own
//! `compiler::disassemble` module. Used by the REPL's `:disasm` command
//! and by compiler tests that assert on emitted opcodes directly.

use crate::{decode_a, decode_b, decode_bx, decode_c, decode_opcode, decode_sbx, decode_sbx24, op};
use vela_core::Chunk;

/// Render every instruction in `chunk` as one line of text.
#[must_use]
pub fn disassemble(chunk: &Chunk, name: &str) -> String {
    let mut out = format!("== {name} ==\n");
    for (ip, &instr) in chunk.code.iter().enumerate() {
        out.push_str(&disassemble_instr(chunk, ip, instr));
        out.push('\n');
    }
    out
}

#[must_use]
pub fn disassemble_instr(chunk: &Chunk, ip: usize, instr: u32) -> String {
    let opcode = decode_opcode(instr);
    let line = chunk.line_for(ip);
    let a = decode_a(instr);
    let mnemonic = op::name(opcode);
    match opcode {
        op::LOADK | op::GETGLOBAL | op::SETGLOBAL | op::DEFGLOBAL => {
            let bx = decode_bx(instr);
            let constant = chunk.constants.get(bx as usize);
            format!("{ip:04} {line:>4} {mnemonic:<10} R{a} K{bx} ; {constant:?}")
        }
        op::LOADI => {
            let sbx = decode_sbx(instr);
            format!("{ip:04} {line:>4} {mnemonic:<10} R{a} #{sbx}")
        }
        op::JMP | op::LOOP => {
            let sbx24 = decode_sbx24(instr);
            format!("{ip:04} {line:>4} {mnemonic:<10} -> {}", ip as i64 + 1 + sbx24 as i64)
        }
        op::JMPF | op::JMPT => {
            let sbx = decode_sbx(instr);
            format!(
                "{ip:04} {line:>4} {mnemonic:<10} R{a} -> {}",
                ip as i64 + 1 + sbx as i64
            )
        }
        op::GETPROP => {
            let b = decode_b(instr);
            format!("{ip:04} {line:>4} {mnemonic:<10} R{a} R{b} K{}", decode_c(instr))
        }
        op::SETPROP => {
            let b = decode_b(instr);
            format!("{ip:04} {line:>4} {mnemonic:<10} R{a} K{b} R{}", decode_c(instr))
        }
        op::IMPORT => {
            let bx = decode_bx(instr);
            let constant = chunk.constants.get(bx as usize);
            format!("{ip:04} {line:>4} {mnemonic:<10} R{a} K{bx} ; {constant:?}")
        }
        op::NEG | op::NOT | op::AWAIT | op::LEN | op::POP => {
            format!("{ip:04} {line:>4} {mnemonic:<10} R{a} R{}", decode_b(instr))
        }
        op::LOADNIL | op::LOADTRUE | op::LOADFALSE | op::RETURN | op::PRINT | op::NEWARRAY
        | op::NEWMAP => {
            format!("{ip:04} {line:>4} {mnemonic:<10} R{a}")
        }
        op::RETURNNIL | op::HALT | op::NOP => format!("{ip:04} {line:>4} {mnemonic}"),
        op::CALL => {
            format!(
                "{ip:04} {line:>4} {mnemonic:<10} R{a} {} {}",
                decode_b(instr),
                decode_c(instr)
            )
        }
        op::ASYNC => {
            format!(
                "{ip:04} {line:>4} {mnemonic:<10} R{a} R{} {}",
                decode_b(instr),
                decode_c(instr)
            )
        }
        op::STRUCTDEF => {
            format!(
                "{ip:04} {line:>4} {mnemonic:<10} fields={} K{}",
                a,
                decode_bx(instr)
            )
        }
        _ => format!(
            "{ip:04} {line:>4} {mnemonic:<10} R{a} {} {}",
            decode_b(instr),
            decode_c(instr)
        ),
    }
}
