// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

use crate::*;
use proptest::prelude::*;

#[test]
fn encodes_and_decodes_abc() {
    let instr = encode_abc(op::ADD, 3, 4, 5);
    assert_eq!(decode_opcode(instr), op::ADD);
    assert_eq!(decode_a(instr), 3);
    assert_eq!(decode_b(instr), 4);
    assert_eq!(decode_c(instr), 5);
}

#[test]
fn encodes_and_decodes_abx() {
    let instr = encode_abx(op::LOADK, 2, 40_000);
    assert_eq!(decode_opcode(instr), op::LOADK);
    assert_eq!(decode_a(instr), 2);
    assert_eq!(decode_bx(instr), 40_000);
}

#[test]
fn signed_sbx_round_trips_negative() {
    let instr = encode_asbx(op::JMPF, 1, -1234);
    assert_eq!(decode_sbx(instr), -1234);
}

#[test]
fn sbx24_round_trips_full_range() {
    for v in [-(1 << 23), -1, 0, 1, (1 << 23) - 1] {
        let instr = encode_sbx24(op::JMP, v);
        assert_eq!(decode_sbx24(instr), v, "value {v} did not round-trip");
    }
}

proptest! {
    #[test]
    fn abc_round_trips(op_byte: u8, a: u8, b: u8, c: u8) {
        let instr = encode_abc(op_byte, a, b, c);
        prop_assert_eq!(decode_opcode(instr), op_byte);
        prop_assert_eq!(decode_a(instr), a);
        prop_assert_eq!(decode_b(instr), b);
        prop_assert_eq!(decode_c(instr), c);
    }

    #[test]
    fn sbx_round_trips(op_byte: u8, a: u8, sbx: i16) {
        let instr = encode_asbx(op_byte, a, sbx);
        prop_assert_eq!(decode_opcode(instr), op_byte);
        prop_assert_eq!(decode_a(instr), a);
        prop_assert_eq!(decode_sbx(instr), sbx);
    }

    #[test]
    fn sbx24_round_trips(op_byte: u8, sbx24 in -(1i32 << 23)..(1i32 << 23)) {
        let instr = encode_sbx24(op_byte, sbx24);
        prop_assert_eq!(decode_opcode(instr), op_byte);
        prop_assert_eq!(decode_sbx24(instr), sbx24);
    }
}
