// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Built-in TriCore TC1.6 reduced instruction set.
//!
//! Used when no instruction-table path is configured. The rows are in the
//! same shape the file loaders produce and go through the same syntax
//! parsing and geometry validation, so nothing here is special-cased.
//! Row order matters: it is the tie-break priority between equally legal
//! variants.

use crate::core::table::{InstructionTable, TableLoadError, TableRow};

struct StockRow {
    opcode: u32,
    size: u8,
    mnemonic: &'static str,
    syntax: &'static str,
    count: u8,
    fields: &'static [(u8, u8)],
}

const STOCK_ROWS: &[StockRow] = &[
    // System
    StockRow { opcode: 0x0000, size: 16, mnemonic: "NOP", syntax: "NOP", count: 0, fields: &[] },
    StockRow { opcode: 0x0000_000D, size: 32, mnemonic: "NOP", syntax: "NOP", count: 0, fields: &[] },
    StockRow { opcode: 0x9000, size: 16, mnemonic: "RET", syntax: "RET", count: 0, fields: &[] },
    // Moves
    StockRow { opcode: 0x0002, size: 16, mnemonic: "MOV", syntax: "MOV D[a], D[b]", count: 2, fields: &[(8, 4), (12, 4)] },
    StockRow { opcode: 0x0082, size: 16, mnemonic: "MOV", syntax: "MOV D[a], const4", count: 2, fields: &[(8, 4), (12, 4)] },
    StockRow { opcode: 0x00DA, size: 16, mnemonic: "MOV", syntax: "MOV D[15], const8", count: 2, fields: &[(0, 0), (8, 8)] },
    StockRow { opcode: 0x3B, size: 32, mnemonic: "MOV", syntax: "MOV D[c], const16", count: 2, fields: &[(28, 4), (12, 16)] },
    StockRow { opcode: 0xFB, size: 32, mnemonic: "MOV", syntax: "MOV E[c], const16", count: 2, fields: &[(28, 4), (12, 16)] },
    StockRow { opcode: 0xBB, size: 32, mnemonic: "MOV.U", syntax: "MOV.U D[c], const16", count: 2, fields: &[(28, 4), (12, 16)] },
    StockRow { opcode: 0x7B, size: 32, mnemonic: "MOVH", syntax: "MOVH D[c], const16", count: 2, fields: &[(28, 4), (12, 16)] },
    StockRow { opcode: 0x91, size: 32, mnemonic: "MOVH.A", syntax: "MOVH.A A[c], const16", count: 2, fields: &[(28, 4), (12, 16)] },
    StockRow { opcode: 0x0040, size: 16, mnemonic: "MOV.AA", syntax: "MOV.AA A[a], A[b]", count: 2, fields: &[(8, 4), (12, 4)] },
    StockRow { opcode: 0x0060, size: 16, mnemonic: "MOV.A", syntax: "MOV.A A[a], D[b]", count: 2, fields: &[(8, 4), (12, 4)] },
    StockRow { opcode: 0x00A0, size: 16, mnemonic: "MOV.A", syntax: "MOV.A A[a], const4", count: 2, fields: &[(8, 4), (12, 4)] },
    StockRow { opcode: 0x0080, size: 16, mnemonic: "MOV.D", syntax: "MOV.D D[a], A[b]", count: 2, fields: &[(8, 4), (12, 4)] },
    // Arithmetic
    StockRow { opcode: 0x0042, size: 16, mnemonic: "ADD", syntax: "ADD D[a], D[b]", count: 2, fields: &[(8, 4), (12, 4)] },
    StockRow { opcode: 0x00C2, size: 16, mnemonic: "ADD", syntax: "ADD D[a], const4", count: 2, fields: &[(8, 4), (12, 4)] },
    StockRow { opcode: 0x0000_000B, size: 32, mnemonic: "ADD", syntax: "ADD D[c], D[a], D[b]", count: 3, fields: &[(28, 4), (8, 4), (12, 4)] },
    StockRow { opcode: 0x0000_008B, size: 32, mnemonic: "ADD", syntax: "ADD D[c], D[a], const9", count: 3, fields: &[(28, 4), (8, 4), (12, 9)] },
    StockRow { opcode: 0x1B, size: 32, mnemonic: "ADDI", syntax: "ADDI D[c], D[a], const16", count: 3, fields: &[(28, 4), (8, 4), (12, 16)] },
    StockRow { opcode: 0x9B, size: 32, mnemonic: "ADDIH", syntax: "ADDIH D[c], D[a], const16", count: 3, fields: &[(28, 4), (8, 4), (12, 16)] },
    StockRow { opcode: 0x00A2, size: 16, mnemonic: "SUB", syntax: "SUB D[a], D[b]", count: 2, fields: &[(8, 4), (12, 4)] },
    StockRow { opcode: 0x0080_000B, size: 32, mnemonic: "SUB", syntax: "SUB D[c], D[a], D[b]", count: 3, fields: &[(28, 4), (8, 4), (12, 4)] },
    StockRow { opcode: 0x0026, size: 16, mnemonic: "AND", syntax: "AND D[a], D[b]", count: 2, fields: &[(8, 4), (12, 4)] },
    StockRow { opcode: 0x0100_008F, size: 32, mnemonic: "AND", syntax: "AND D[c], D[a], const9", count: 3, fields: &[(28, 4), (8, 4), (12, 9)] },
    StockRow { opcode: 0x00A6, size: 16, mnemonic: "OR", syntax: "OR D[a], D[b]", count: 2, fields: &[(8, 4), (12, 4)] },
    StockRow { opcode: 0x0140_008F, size: 32, mnemonic: "OR", syntax: "OR D[c], D[a], const9", count: 3, fields: &[(28, 4), (8, 4), (12, 9)] },
    StockRow { opcode: 0x0006, size: 16, mnemonic: "SH", syntax: "SH D[a], const4", count: 2, fields: &[(8, 4), (12, 4)] },
    // Packed multiply (packed-half suffix selects the operand halves)
    StockRow { opcode: 0x0068_00B3, size: 32, mnemonic: "MUL.H", syntax: "MUL.H E[c], D[a], D[b], LL", count: 4, fields: &[(28, 4), (8, 4), (12, 4)] },
    StockRow { opcode: 0x0064_00B3, size: 32, mnemonic: "MUL.H", syntax: "MUL.H E[c], D[a], D[b], LU", count: 4, fields: &[(28, 4), (8, 4), (12, 4)] },
    StockRow { opcode: 0x0060_00B3, size: 32, mnemonic: "MUL.H", syntax: "MUL.H E[c], D[a], D[b], UL", count: 4, fields: &[(28, 4), (8, 4), (12, 4)] },
    StockRow { opcode: 0x006C_00B3, size: 32, mnemonic: "MUL.H", syntax: "MUL.H E[c], D[a], D[b], UU", count: 4, fields: &[(28, 4), (8, 4), (12, 4)] },
    // Jumps and calls
    StockRow { opcode: 0x3C, size: 16, mnemonic: "J", syntax: "J disp8/2", count: 1, fields: &[(8, 8)] },
    StockRow { opcode: 0x1D, size: 32, mnemonic: "J", syntax: "J disp24/2 {[15:0],[23:16]}", count: 1, fields: &[(16, 16), (8, 8)] },
    StockRow { opcode: 0x6D, size: 32, mnemonic: "CALL", syntax: "CALL disp24/2 {[15:0],[23:16]}", count: 1, fields: &[(16, 16), (8, 8)] },
    StockRow { opcode: 0xEE, size: 16, mnemonic: "JNZ", syntax: "JNZ D[15], disp8/2", count: 2, fields: &[(0, 0), (8, 8)] },
    StockRow { opcode: 0x6E, size: 16, mnemonic: "JZ", syntax: "JZ D[15], disp8/2", count: 2, fields: &[(0, 0), (8, 8)] },
    StockRow { opcode: 0xF6, size: 16, mnemonic: "JNZ", syntax: "JNZ D[b], disp4/2", count: 2, fields: &[(12, 4), (8, 4)] },
    StockRow { opcode: 0x76, size: 16, mnemonic: "JZ", syntax: "JZ D[b], disp4/2", count: 2, fields: &[(12, 4), (8, 4)] },
    StockRow { opcode: 0x0000_00DF, size: 32, mnemonic: "JEQ", syntax: "JEQ D[a], const4, disp15/2", count: 3, fields: &[(8, 4), (12, 4), (16, 15)] },
    StockRow { opcode: 0x8000_00DF, size: 32, mnemonic: "JNE", syntax: "JNE D[a], const4, disp15/2", count: 3, fields: &[(8, 4), (12, 4), (16, 15)] },
    StockRow { opcode: 0x0000_005F, size: 32, mnemonic: "JEQ", syntax: "JEQ D[a], D[b], disp15/2", count: 3, fields: &[(8, 4), (12, 4), (16, 15)] },
    StockRow { opcode: 0x8000_005F, size: 32, mnemonic: "JNE", syntax: "JNE D[a], D[b], disp15/2", count: 3, fields: &[(8, 4), (12, 4), (16, 15)] },
    StockRow { opcode: 0x0000_007F, size: 32, mnemonic: "JGE", syntax: "JGE D[a], D[b], disp15/2", count: 3, fields: &[(8, 4), (12, 4), (16, 15)] },
    StockRow { opcode: 0x0000_003F, size: 32, mnemonic: "JLT", syntax: "JLT D[a], D[b], disp15/2", count: 3, fields: &[(8, 4), (12, 4), (16, 15)] },
    StockRow { opcode: 0xFC, size: 16, mnemonic: "LOOP", syntax: "LOOP A[b], disp4/2", count: 2, fields: &[(12, 4), (8, 4)] },
    StockRow { opcode: 0xFD, size: 32, mnemonic: "LOOP", syntax: "LOOP A[b], disp15/2", count: 2, fields: &[(12, 4), (16, 15)] },
    // Long-offset loads/stores (BOL)
    StockRow { opcode: 0xD9, size: 32, mnemonic: "LEA", syntax: "LEA A[a], [A[b]]off16 {[9:6][15:10][5:0]}", count: 3, fields: &[(8, 4), (12, 4), (28, 4), (22, 6), (16, 6)] },
    StockRow { opcode: 0x19, size: 32, mnemonic: "LD.W", syntax: "LD.W D[a], [A[b]]off16 {[9:6][15:10][5:0]}", count: 3, fields: &[(8, 4), (12, 4), (28, 4), (22, 6), (16, 6)] },
    StockRow { opcode: 0x59, size: 32, mnemonic: "ST.W", syntax: "ST.W [A[b]]off16 {[9:6][15:10][5:0]}, D[a]", count: 3, fields: &[(12, 4), (28, 4), (22, 6), (16, 6), (8, 4)] },
    StockRow { opcode: 0x99, size: 32, mnemonic: "LD.A", syntax: "LD.A A[a], [A[b]]off16 {[9:6][15:10][5:0]}", count: 3, fields: &[(8, 4), (12, 4), (28, 4), (22, 6), (16, 6)] },
    StockRow { opcode: 0xB5, size: 32, mnemonic: "ST.A", syntax: "ST.A [A[b]]off16 {[9:6][15:10][5:0]}, A[a]", count: 3, fields: &[(12, 4), (28, 4), (22, 6), (16, 6), (8, 4)] },
    StockRow { opcode: 0x39, size: 32, mnemonic: "LD.BU", syntax: "LD.BU D[a], [A[b]]off16 {[9:6][15:10][5:0]}", count: 3, fields: &[(8, 4), (12, 4), (28, 4), (22, 6), (16, 6)] },
    StockRow { opcode: 0x79, size: 32, mnemonic: "LD.B", syntax: "LD.B D[a], [A[b]]off16 {[9:6][15:10][5:0]}", count: 3, fields: &[(8, 4), (12, 4), (28, 4), (22, 6), (16, 6)] },
    StockRow { opcode: 0xE9, size: 32, mnemonic: "ST.B", syntax: "ST.B [A[b]]off16 {[9:6][15:10][5:0]}, D[a]", count: 3, fields: &[(12, 4), (28, 4), (22, 6), (16, 6), (8, 4)] },
    // Short loads/stores through A[15] (implicit base)
    StockRow { opcode: 0x48, size: 16, mnemonic: "LD.W", syntax: "LD.W D[a], [A[15]]off4/4", count: 3, fields: &[(8, 4), (0, 0), (12, 4)] },
    StockRow { opcode: 0x68, size: 16, mnemonic: "ST.W", syntax: "ST.W [A[15]]off4/4, D[a]", count: 3, fields: &[(0, 0), (12, 4), (8, 4)] },
    StockRow { opcode: 0x08, size: 16, mnemonic: "LD.BU", syntax: "LD.BU D[a], [A[15]]off4", count: 3, fields: &[(8, 4), (0, 0), (12, 4)] },
    StockRow { opcode: 0x28, size: 16, mnemonic: "ST.B", syntax: "ST.B [A[15]]off4, D[a]", count: 3, fields: &[(0, 0), (12, 4), (8, 4)] },
    // Short loads/stores with implicit D[15]
    StockRow { opcode: 0x4C, size: 16, mnemonic: "LD.W", syntax: "LD.W D[15], [A[b]]off4/4", count: 3, fields: &[(0, 0), (12, 4), (8, 4)] },
    StockRow { opcode: 0x6C, size: 16, mnemonic: "ST.W", syntax: "ST.W [A[b]]off4/4, D[15]", count: 3, fields: &[(12, 4), (8, 4), (0, 0)] },
    StockRow { opcode: 0x0C, size: 16, mnemonic: "LD.BU", syntax: "LD.BU D[15], [A[b]]off4", count: 3, fields: &[(0, 0), (12, 4), (8, 4)] },
    StockRow { opcode: 0x2C, size: 16, mnemonic: "ST.B", syntax: "ST.B [A[b]]off4, D[15]", count: 3, fields: &[(12, 4), (8, 4), (0, 0)] },
    // Post-increment addressing (BO)
    StockRow { opcode: 0x0100_0029, size: 32, mnemonic: "LD.W", syntax: "LD.W D[a], [A[b]+]off10 {[9:6][5:0]}", count: 3, fields: &[(8, 4), (12, 4), (28, 4), (16, 6)] },
    StockRow { opcode: 0x0100_0089, size: 32, mnemonic: "ST.W", syntax: "ST.W [A[b]+]off10 {[9:6][5:0]}, D[a]", count: 3, fields: &[(12, 4), (28, 4), (16, 6), (8, 4)] },
];

/// Build the stock table. The rows are static data; a failure here is a
/// defect in the rows themselves.
pub fn stock_table() -> Result<InstructionTable, TableLoadError> {
    let rows = STOCK_ROWS
        .iter()
        .map(|r| TableRow {
            opcode: r.opcode,
            opcode_size: r.size,
            mnemonic: r.mnemonic.to_string(),
            syntax: r.syntax.to_string(),
            operand_count: r.count as usize,
            fields: r.fields.to_vec(),
        })
        .collect();
    InstructionTable::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::SlotKind;

    #[test]
    fn stock_table_builds_cleanly() {
        let table = stock_table().expect("stock rows must validate");
        assert!(table.mnemonic_count() >= 20);
    }

    #[test]
    fn stock_rows_have_disjoint_fields_clear_of_opcode_bits() {
        let table = stock_table().unwrap();
        for variant in table.variants() {
            let mut used = 0u32;
            for slot in &variant.slots {
                for field in &slot.fields {
                    assert_eq!(
                        used & field.mask(),
                        0,
                        "{}: overlapping fields",
                        variant.syntax
                    );
                    used |= field.mask();
                }
            }
            assert_eq!(
                variant.base_opcode & used,
                0,
                "{}: opcode bits inside operand fields",
                variant.syntax
            );
        }
    }

    #[test]
    fn mov_variants_are_ordered_smallest_first_by_row() {
        let table = stock_table().unwrap();
        let movs = table.variants_with_arity("MOV", 2);
        // reg-reg, const4, D15/const8, const16, E/const16 in table order
        assert_eq!(movs.len(), 5);
        assert_eq!(movs[0].base_opcode, 0x0002);
        assert_eq!(movs[1].base_opcode, 0x0082);
        assert_eq!(movs[2].base_opcode, 0x00DA);
        assert_eq!(movs[3].base_opcode, 0x3B);
    }

    #[test]
    fn jump_variants_cover_both_sizes() {
        let table = stock_table().unwrap();
        let js = table.variants_with_arity("J", 1);
        assert_eq!(js.len(), 2);
        assert_eq!(js[0].opcode_bits, 16);
        assert_eq!(js[1].opcode_bits, 32);
        assert!(js[1].slots[0].is_split());
    }

    #[test]
    fn packed_suffix_rows_parse_as_fixed_tokens() {
        let table = stock_table().unwrap();
        let muls = table.variants_with_arity("MUL.H", 4);
        assert_eq!(muls.len(), 4);
        for v in muls {
            assert!(matches!(v.slots[3].kind, SlotKind::FixedToken(_)));
        }
    }
}
