// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Variant selection, displacement/immediate fit checking, and bit-field
//! encoding.
//!
//! Selection is deterministic: arity filter, slot-shape filter,
//! optimisation filters, fit filter, then smallest size with table order as
//! the tie-break. When a referenced label has no address yet (pass 1), the
//! largest shape-compatible variant is chosen so later fixpoint passes can
//! only shrink the program's upper bound, never underestimate it.

use crate::core::operand::Operand;
use crate::core::symbol_table::SymbolTable;
use crate::core::table::{
    BitField, InstructionTable, InstructionVariant, OperandSlot, Signedness, SlotKind,
};

/// Optimisation switches from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorOptions {
    /// `-O32`: force the 32-bit variant where a choice exists.
    pub force_32bit: bool,
    /// `-Ono-implicit`: drop variants that require a literal A[10]/A[15].
    pub no_implicit: bool,
}

/// Byte order of emitted words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Why selection failed, per candidate variant.
#[derive(Debug, Clone)]
pub struct RejectedVariant {
    pub syntax: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub enum SelectError {
    /// No variant of the mnemonic exists at all.
    UnknownMnemonic(String),
    /// Candidates existed but every one was eliminated.
    NoVariant {
        mnemonic: String,
        rejected: Vec<RejectedVariant>,
    },
}

impl SelectError {
    pub fn message(&self) -> String {
        match self {
            SelectError::UnknownMnemonic(m) => format!("unknown mnemonic '{m}'"),
            SelectError::NoVariant { mnemonic, rejected } => {
                let mut msg = format!("no encodable variant for '{mnemonic}'");
                for r in rejected {
                    msg.push_str(&format!("\n  {} rejected: {}", r.syntax, r.reason));
                }
                msg
            }
        }
    }

    /// True when every shape-matching variant failed only the fit filter.
    pub fn is_range_failure(&self) -> bool {
        match self {
            SelectError::UnknownMnemonic(_) => false,
            SelectError::NoVariant { rejected, .. } => {
                !rejected.is_empty()
                    && rejected
                        .iter()
                        .any(|r| r.reason.contains("does not fit") || r.reason.contains("exact"))
            }
        }
    }
}

/// Outcome of encoding one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// The raw instruction word (16 or 32 bits significant).
    pub word: u32,
    pub size_bytes: u32,
    /// Memory-order bytes per the active endianness.
    pub bytes: Vec<u8>,
}

/// Select the best variant for an instruction at `pc`.
///
/// `min_size_bits` is the monotonicity floor: the fixpoint linker passes
/// the previously chosen size so re-selection can never shrink a statement.
pub fn select_variant<'t>(
    table: &'t InstructionTable,
    mnemonic: &str,
    operands: &[Operand],
    pc: u32,
    symbols: &SymbolTable,
    opts: SelectorOptions,
    min_size_bits: u8,
) -> Result<&'t InstructionVariant, SelectError> {
    if !table.has_mnemonic(mnemonic) {
        return Err(SelectError::UnknownMnemonic(mnemonic.to_string()));
    }

    let mut rejected = Vec::new();
    let mut shape_matched: Vec<&InstructionVariant> = Vec::new();

    for variant in table.variants_of(mnemonic) {
        if variant.operand_count() != operands.len() {
            rejected.push(RejectedVariant {
                syntax: variant.syntax.clone(),
                reason: format!(
                    "expects {} operand(s), got {}",
                    variant.operand_count(),
                    operands.len()
                ),
            });
            continue;
        }
        if let Err(reason) = shape_matches(variant, operands) {
            rejected.push(RejectedVariant {
                syntax: variant.syntax.clone(),
                reason,
            });
            continue;
        }
        if opts.force_32bit && variant.opcode_bits < 32 {
            rejected.push(RejectedVariant {
                syntax: variant.syntax.clone(),
                reason: "16-bit variant disabled by force-32".to_string(),
            });
            continue;
        }
        if opts.no_implicit && variant.uses_implicit_address_register() {
            rejected.push(RejectedVariant {
                syntax: variant.syntax.clone(),
                reason: "implicit-register variant disabled".to_string(),
            });
            continue;
        }
        if variant.opcode_bits < min_size_bits {
            rejected.push(RejectedVariant {
                syntax: variant.syntax.clone(),
                reason: "smaller than a previously chosen size".to_string(),
            });
            continue;
        }
        shape_matched.push(variant);
    }

    if shape_matched.is_empty() {
        return Err(SelectError::NoVariant {
            mnemonic: mnemonic.to_string(),
            rejected,
        });
    }

    // A reference to a label without an address yet: pick the largest
    // shape-compatible variant and let the fixpoint settle it.
    if has_unresolved_symbol(operands, symbols) {
        let largest = shape_matched
            .iter()
            .copied()
            .max_by(|a, b| {
                a.opcode_bits
                    .cmp(&b.opcode_bits)
                    .then(b.row.cmp(&a.row))
            })
            .unwrap();
        return Ok(largest);
    }

    let mut fitting: Vec<&InstructionVariant> = Vec::new();
    for variant in shape_matched {
        match fits(variant, operands, pc, symbols) {
            Ok(()) => fitting.push(variant),
            Err(reason) => rejected.push(RejectedVariant {
                syntax: variant.syntax.clone(),
                reason,
            }),
        }
    }

    fitting
        .into_iter()
        .min_by(|a, b| a.opcode_bits.cmp(&b.opcode_bits).then(a.row.cmp(&b.row)))
        .ok_or(SelectError::NoVariant {
            mnemonic: mnemonic.to_string(),
            rejected,
        })
}

fn has_unresolved_symbol(operands: &[Operand], symbols: &SymbolTable) -> bool {
    operands.iter().any(|op| match op {
        Operand::Symbol { name, .. } => symbols.lookup(name).is_none(),
        _ => false,
    })
}

/// Slot-shape filter: banks, literal-register constraints, post-increment,
/// value-vs-register kinds, packed-half suffixes. Dereference brackets are
/// accepted either way because the vendor spellings vary (`[a15]14` splits
/// to a bare `a15`), but post-increment must match exactly.
fn shape_matches(variant: &InstructionVariant, operands: &[Operand]) -> Result<(), String> {
    for (idx, (slot, operand)) in variant.slots.iter().zip(operands).enumerate() {
        match (&slot.kind, operand) {
            (
                SlotKind::Reg {
                    bank,
                    fixed,
                    post_increment,
                    ..
                },
                Operand::Register(reg),
            ) => {
                if reg.bank != *bank {
                    return Err(format!(
                        "operand {} is {}-bank, slot needs {}",
                        idx + 1,
                        reg.bank,
                        bank
                    ));
                }
                if reg.bank.requires_even_index() && reg.index % 2 != 0 {
                    return Err(format!(
                        "operand {} uses odd {}-register index {}",
                        idx + 1,
                        reg.bank,
                        reg.index
                    ));
                }
                if let Some(required) = fixed {
                    if reg.index != *required {
                        return Err(format!(
                            "operand {} must be {}{}",
                            idx + 1,
                            bank,
                            required
                        ));
                    }
                }
                if reg.post_increment != *post_increment {
                    return Err(format!(
                        "operand {} post-increment mismatch",
                        idx + 1
                    ));
                }
            }
            (SlotKind::Reg { bank, .. }, _) => {
                return Err(format!(
                    "operand {} must be a {}-register",
                    idx + 1,
                    bank
                ));
            }
            (SlotKind::Value { .. }, op) if op.is_value() => {}
            (SlotKind::Value { .. }, _) => {
                return Err(format!(
                    "operand {} must be an immediate or label",
                    idx + 1
                ));
            }
            (SlotKind::FixedToken(token), Operand::Fixed(given)) => {
                if !token.eq_ignore_ascii_case(given) {
                    return Err(format!("operand {} must be literal {}", idx + 1, token));
                }
            }
            // A bare `L`/`U` suffix token parses as a symbol; accept it when
            // it spells the required literal.
            (SlotKind::FixedToken(token), Operand::Symbol { name, offset: 0, half: None })
                if token.eq_ignore_ascii_case(name) => {}
            (SlotKind::FixedToken(token), _) => {
                return Err(format!("operand {} must be literal {}", idx + 1, token));
            }
        }
    }
    Ok(())
}

/// Resolve the value an operand contributes to a slot, PC-relative and
/// `HI:`/`LO:` rules applied. Errors carry the unresolved symbol name.
fn slot_value(
    slot: &OperandSlot,
    operand: &Operand,
    pc: u32,
    symbols: &SymbolTable,
) -> Result<Option<i64>, String> {
    let (scale, pc_relative) = match slot.kind {
        SlotKind::Value {
            scale, pc_relative, ..
        } => (scale, pc_relative),
        _ => return Ok(None),
    };

    let raw = match operand {
        Operand::Immediate { value, .. } => *value,
        Operand::Symbol { name, offset, half } => {
            let target = symbols
                .lookup(name)
                .ok_or_else(|| format!("unresolved symbol '{name}'"))? as i64
                + offset;
            let absolute = if pc_relative {
                target - i64::from(pc)
            } else {
                target
            };
            match half {
                Some(sel) => sel.apply(absolute),
                None => absolute,
            }
        }
        _ => return Ok(None),
    };

    if scale > 1 {
        let scale = i64::from(scale);
        if raw % scale != 0 {
            return Err(format!(
                "displacement {raw} is not an exact multiple of {scale}"
            ));
        }
        Ok(Some(raw / scale))
    } else {
        Ok(Some(raw))
    }
}

fn in_range(value: i64, width: u8, signedness: Signedness) -> bool {
    let max_signed = (1i64 << (width - 1)) - 1;
    let min_signed = -(1i64 << (width - 1));
    let max_unsigned = (1i64 << width) - 1;
    match signedness {
        Signedness::Signed => (min_signed..=max_signed).contains(&value),
        Signedness::Unsigned => (0..=max_unsigned).contains(&value),
        Signedness::Either => {
            (min_signed..=max_signed).contains(&value) || (0..=max_unsigned).contains(&value)
        }
    }
}

/// Fit filter: every value slot must hold its operand.
fn fits(
    variant: &InstructionVariant,
    operands: &[Operand],
    pc: u32,
    symbols: &SymbolTable,
) -> Result<(), String> {
    for (slot, operand) in variant.slots.iter().zip(operands) {
        let SlotKind::Value {
            width, signedness, ..
        } = slot.kind
        else {
            continue;
        };
        let Some(value) = slot_value(slot, operand, pc, symbols)? else {
            continue;
        };
        if !in_range(value, width, signedness) {
            return Err(format!(
                "value {value} does not fit in a {width}-bit field"
            ));
        }
    }
    Ok(())
}

/// Assemble the instruction word for a chosen variant.
pub fn encode(
    variant: &InstructionVariant,
    operands: &[Operand],
    pc: u32,
    symbols: &SymbolTable,
    endianness: Endianness,
) -> Result<Encoded, String> {
    let mut word = variant.base_opcode;

    for (slot, operand) in variant.slots.iter().zip(operands) {
        match (&slot.kind, operand) {
            (SlotKind::Reg { .. }, Operand::Register(reg)) => {
                if let Some(field) = slot.fields.first() {
                    word |= place(u32::from(reg.index), *field);
                }
            }
            (SlotKind::Value { width, signedness, .. }, _) => {
                let value = slot_value(slot, operand, pc, symbols)?
                    .ok_or_else(|| "value slot without a value operand".to_string())?;
                if !in_range(value, *width, *signedness) {
                    return Err(format!(
                        "value {value} does not fit in a {width}-bit field"
                    ));
                }
                let stored = (value as u64) & ((1u64 << width) - 1);
                if slot.is_split() {
                    for (field, &(hi, lo)) in slot.fields.iter().zip(&slot.splits) {
                        let part = (stored >> lo) & ((1u64 << (hi - lo + 1)) - 1);
                        word |= place(part as u32, *field);
                    }
                } else if let Some(field) = slot.fields.first() {
                    word |= place((stored as u32) & field_mask_value(*field), *field);
                }
            }
            (SlotKind::FixedToken(_), _) | (SlotKind::Reg { .. }, _) => {}
        }
    }

    let size_bytes = variant.size_bytes();
    Ok(Encoded {
        word,
        size_bytes,
        bytes: word_bytes(word, variant.opcode_bits, endianness),
    })
}

fn place(value: u32, field: BitField) -> u32 {
    (value & field_mask_value(field)) << field.pos
}

fn field_mask_value(field: BitField) -> u32 {
    if field.len >= 32 {
        u32::MAX
    } else {
        (1u32 << field.len) - 1
    }
}

/// Serialise an instruction word in the configured byte order. 32-bit
/// instructions are two half-words; half-word order follows the byte order.
pub fn word_bytes(word: u32, bits: u8, endianness: Endianness) -> Vec<u8> {
    match (bits, endianness) {
        (16, Endianness::Little) => (word as u16).to_le_bytes().to_vec(),
        (16, Endianness::Big) => (word as u16).to_be_bytes().to_vec(),
        (_, Endianness::Little) => word.to_le_bytes().to_vec(),
        (_, Endianness::Big) => word.to_be_bytes().to_vec(),
    }
}

/// Decode an instruction word back through the table: find the variant
/// whose fixed bits match and recover each slot's raw field value. Used by
/// the round-trip tests; table order decides between aliases.
pub fn decode(table: &InstructionTable, word: u32, bits: u8) -> Option<(String, Vec<u32>)> {
    for variant in table.variants() {
        if variant.opcode_bits != bits {
            continue;
        }
        let mut field_mask = 0u32;
        for slot in &variant.slots {
            for field in &slot.fields {
                field_mask |= field.mask();
            }
        }
        let word_mask: u32 = if bits == 32 { u32::MAX } else { 0xFFFF };
        if word & word_mask & !field_mask != variant.base_opcode {
            continue;
        }
        let mut values = Vec::new();
        for slot in &variant.slots {
            if slot.fields.is_empty() {
                continue;
            }
            let mut value = 0u64;
            if slot.is_split() {
                for (field, &(_, lo)) in slot.fields.iter().zip(&slot.splits) {
                    let part = u64::from((word >> field.pos) & field_mask_value(*field));
                    value |= part << lo;
                }
            } else {
                let field = slot.fields[0];
                value = u64::from((word >> field.pos) & field_mask_value(field));
            }
            values.push(value as u32);
        }
        return Some((variant.mnemonic.clone(), values));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::operand::{parse_register, RegBank};
    use crate::core::stock::stock_table;

    fn reg(text: &str) -> Operand {
        Operand::Register(parse_register(text).unwrap())
    }

    fn imm(value: i64) -> Operand {
        Operand::immediate(value)
    }

    fn select<'t>(
        table: &'t InstructionTable,
        mnemonic: &str,
        operands: &[Operand],
        pc: u32,
    ) -> Result<&'t InstructionVariant, SelectError> {
        let symbols = SymbolTable::new();
        select_variant(
            table,
            mnemonic,
            operands,
            pc,
            &symbols,
            SelectorOptions::default(),
            0,
        )
    }

    fn encode_one(table: &InstructionTable, mnemonic: &str, operands: &[Operand], pc: u32) -> Encoded {
        let symbols = SymbolTable::new();
        let variant = select(table, mnemonic, operands, pc).unwrap();
        encode(variant, operands, pc, &symbols, Endianness::Little).unwrap()
    }

    #[test]
    fn mov_const4_selects_16_bit() {
        let table = stock_table().unwrap();
        let enc = encode_one(&table, "MOV", &[reg("d4"), imm(1)], 0);
        assert_eq!(enc.word, 0x1482);
        assert_eq!(enc.size_bytes, 2);
        assert_eq!(enc.bytes, vec![0x82, 0x14]);
    }

    #[test]
    fn mov_const16_selects_32_bit() {
        let table = stock_table().unwrap();
        let variant = select(&table, "MOV", &[reg("d4"), imm(256)], 0).unwrap();
        assert_eq!(variant.base_opcode, 0x3B);
        assert_eq!(variant.opcode_bits, 32);
        let enc = encode_one(&table, "MOV", &[reg("d4"), imm(256)], 0);
        assert_eq!(enc.word, 0x4010_003B);
        assert_eq!(enc.size_bytes, 4);
    }

    #[test]
    fn mov_d15_selects_const8_variant() {
        let table = stock_table().unwrap();
        let variant = select(&table, "MOV", &[reg("d15"), imm(126)], 0).unwrap();
        assert_eq!(variant.base_opcode, 0x00DA);
        let enc = encode_one(&table, "MOV", &[reg("d15"), imm(126)], 0);
        assert_eq!(enc.word, 0x7EDA);
    }

    #[test]
    fn mov_register_to_register() {
        let table = stock_table().unwrap();
        let enc = encode_one(&table, "MOV", &[reg("d4"), reg("d1")], 0);
        assert_eq!(enc.word, 0x1402);
    }

    #[test]
    fn jump_selects_size_by_displacement() {
        let table = stock_table().unwrap();
        let near = select(&table, "J", &[imm(0xFE)], 0x8000_0000).unwrap();
        assert_eq!(near.opcode_bits, 16);
        let far = select(&table, "J", &[imm(0x200)], 0x8000_0000).unwrap();
        assert_eq!(far.opcode_bits, 32);
    }

    #[test]
    fn jump_split_encoding_distributes_bits() {
        let table = stock_table().unwrap();
        let enc = encode_one(&table, "J", &[imm(0x24680)], 0);
        // disp = 0x24680/2 = 0x12340; low 16 bits at [31:16], high 8 at [15:8]
        assert_eq!(enc.word, 0x2340_011D);
    }

    #[test]
    fn pc_relative_label_displacement() {
        let table = stock_table().unwrap();
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("target", 0x8000_0010, None, 1);
        let operands = vec![Operand::symbol("target")];
        let variant = select_variant(
            &table,
            "J",
            &operands,
            0x8000_0000,
            &symbols,
            SelectorOptions::default(),
            0,
        )
        .unwrap();
        assert_eq!(variant.opcode_bits, 16);
        let enc = encode(&variant, &operands, 0x8000_0000, &symbols, Endianness::Little).unwrap();
        // (0x8000_0010 - 0x8000_0000) / 2 = 8
        assert_eq!(enc.word, 0x083C);
    }

    #[test]
    fn backward_label_encodes_negative_displacement() {
        let table = stock_table().unwrap();
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("back", 0x8000_0000, None, 1);
        let operands = vec![Operand::symbol("back")];
        let enc_variant = select_variant(
            &table,
            "J",
            &operands,
            0x8000_0010,
            &symbols,
            SelectorOptions::default(),
            0,
        )
        .unwrap();
        let enc = encode(
            &enc_variant,
            &operands,
            0x8000_0010,
            &symbols,
            Endianness::Little,
        )
        .unwrap();
        // disp = -16/2 = -8 -> 0xF8 in 8 bits
        assert_eq!(enc.word, 0xF83C);
    }

    #[test]
    fn unresolved_label_prefers_largest_variant() {
        let table = stock_table().unwrap();
        let symbols = SymbolTable::new();
        let operands = vec![Operand::symbol("later")];
        let variant = select_variant(
            &table,
            "J",
            &operands,
            0,
            &symbols,
            SelectorOptions::default(),
            0,
        )
        .unwrap();
        assert_eq!(variant.opcode_bits, 32);
    }

    #[test]
    fn loop_with_label_takes_32_bit_variant_until_resolved() {
        let table = stock_table().unwrap();
        let symbols = SymbolTable::new();
        let operands = vec![reg("a2"), Operand::symbol("top")];
        let variant = select_variant(
            &table,
            "LOOP",
            &operands,
            0,
            &symbols,
            SelectorOptions::default(),
            0,
        )
        .unwrap();
        assert_eq!(variant.base_opcode, 0xFD);
    }

    #[test]
    fn force_32_drops_16_bit_candidates() {
        let table = stock_table().unwrap();
        let symbols = SymbolTable::new();
        let opts = SelectorOptions {
            force_32bit: true,
            no_implicit: false,
        };
        let variant = select_variant(
            &table,
            "MOV",
            &[reg("d4"), imm(1)],
            0,
            &symbols,
            opts,
            0,
        )
        .unwrap();
        assert_eq!(variant.opcode_bits, 32);
        assert_eq!(variant.base_opcode, 0x3B);
    }

    #[test]
    fn no_implicit_drops_a15_variants() {
        let table = stock_table().unwrap();
        let symbols = SymbolTable::new();
        let operands = vec![reg("a15"), imm(2), reg("d1")];
        // With implicit variants allowed, ST.B picks the short A[15] form.
        let with = select_variant(
            &table,
            "ST.B",
            &operands,
            0,
            &symbols,
            SelectorOptions::default(),
            0,
        )
        .unwrap();
        assert_eq!(with.opcode_bits, 16);
        // Without, the long-offset BOL form is the only survivor.
        let opts = SelectorOptions {
            force_32bit: false,
            no_implicit: true,
        };
        let without =
            select_variant(&table, "ST.B", &operands, 0, &symbols, opts, 0).unwrap();
        assert_eq!(without.opcode_bits, 32);
    }

    #[test]
    fn monotonicity_floor_excludes_smaller_variants() {
        let table = stock_table().unwrap();
        let symbols = SymbolTable::new();
        let variant = select_variant(
            &table,
            "MOV",
            &[reg("d4"), imm(1)],
            0,
            &symbols,
            SelectorOptions::default(),
            32,
        )
        .unwrap();
        assert_eq!(variant.opcode_bits, 32);
    }

    #[test]
    fn shape_rejections_are_reported() {
        let table = stock_table().unwrap();
        let err = select(&table, "MOV", &[imm(1), imm(2)], 0).unwrap_err();
        match err {
            SelectError::NoVariant { rejected, .. } => {
                assert!(!rejected.is_empty());
                assert!(rejected.iter().all(|r| !r.reason.is_empty()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn odd_e_register_index_is_rejected() {
        let table = stock_table().unwrap();
        let e3 = Operand::Register(crate::core::operand::Register::new(RegBank::E, 3));
        let err = select(&table, "MOV", &[e3, imm(5)], 0).unwrap_err();
        assert!(matches!(err, SelectError::NoVariant { .. }));
    }

    #[test]
    fn even_e_register_encodes() {
        let table = stock_table().unwrap();
        let e4 = reg("e4");
        let variant = select(&table, "MOV", &[e4.clone(), imm(5)], 0).unwrap();
        assert_eq!(variant.base_opcode, 0xFB);
    }

    #[test]
    fn packed_suffix_picks_matching_row() {
        let table = stock_table().unwrap();
        let operands = vec![
            reg("e4"),
            reg("d1"),
            reg("d2"),
            Operand::Fixed("UL".to_string()),
        ];
        let variant = select(&table, "MUL.H", &operands, 0).unwrap();
        assert_eq!(variant.base_opcode, 0x0060_00B3);
    }

    #[test]
    fn post_increment_must_match() {
        let table = stock_table().unwrap();
        let mut postinc = parse_register("[a2+]").unwrap();
        assert!(postinc.post_increment);
        let operands = vec![reg("d1"), Operand::Register(postinc), imm(4)];
        let variant = select(&table, "LD.W", &operands, 0).unwrap();
        assert_eq!(variant.base_opcode, 0x0100_0029);
        // The same operands without post-increment pick a different variant.
        postinc = parse_register("[a2]").unwrap();
        let operands = vec![reg("d1"), Operand::Register(postinc), imm(4)];
        let variant = select(&table, "LD.W", &operands, 0).unwrap();
        assert_ne!(variant.base_opcode, 0x0100_0029);
    }

    #[test]
    fn inexact_scaled_displacement_does_not_fit() {
        let table = stock_table().unwrap();
        let err_free = select(&table, "J", &[imm(0xFE)], 0).unwrap();
        assert_eq!(err_free.opcode_bits, 16);
        // An odd displacement cannot be divided by 2 exactly.
        let odd = select(&table, "J", &[imm(0xFF)], 0);
        assert!(odd.is_err());
    }

    #[test]
    fn encode_decode_round_trip() {
        let table = stock_table().unwrap();
        let cases: Vec<(&str, Vec<Operand>)> = vec![
            ("MOV", vec![reg("d4"), imm(1)]),
            ("MOV", vec![reg("d4"), reg("d1")]),
            ("MOV", vec![reg("d15"), imm(126)]),
            ("ADD", vec![reg("d3"), reg("d2"), imm(100)]),
            ("J", vec![imm(0x200)]),
            ("LOOP", vec![reg("a2"), imm(-4)]),
        ];
        let symbols = SymbolTable::new();
        for (mnemonic, operands) in cases {
            let variant = select(&table, mnemonic, &operands, 0).unwrap();
            let enc = encode(variant, &operands, 0, &symbols, Endianness::Little).unwrap();
            let (decoded, fields) =
                decode(&table, enc.word, variant.opcode_bits).expect("decodable");
            assert_eq!(decoded, mnemonic, "mnemonic for {mnemonic}");
            // Every encoded register index must be recoverable.
            let encoded_regs: Vec<u32> = variant
                .slots
                .iter()
                .zip(&operands)
                .filter_map(|(slot, op)| match (&slot.kind, op) {
                    (SlotKind::Reg { .. }, Operand::Register(r))
                        if !slot.fields.is_empty() =>
                    {
                        Some(u32::from(r.index))
                    }
                    _ => None,
                })
                .collect();
            for idx in encoded_regs {
                assert!(fields.contains(&idx), "{mnemonic}: register {idx} lost");
            }
        }
    }

    #[test]
    fn big_endian_word_bytes() {
        assert_eq!(
            word_bytes(0x1482, 16, Endianness::Little),
            vec![0x82, 0x14]
        );
        assert_eq!(word_bytes(0x1482, 16, Endianness::Big), vec![0x14, 0x82]);
        assert_eq!(
            word_bytes(0x4010_003B, 32, Endianness::Little),
            vec![0x3B, 0x00, 0x10, 0x40]
        );
    }
}
