// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Instruction-set table: loading, syntax-pattern parsing, and indexing.
//!
//! Every encoding variant is one table row. The row's `Syntax` column
//! (`"MOV D[a], const4"`, `"J disp24 {[15:0],[23:16]}"`) is parsed at load
//! time into typed operand slots; the `opN_pos`/`opN_len` columns give each
//! slot its bit field(s) in the emitted word. No mnemonic is hard-coded
//! anywhere in the assembler.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::core::operand::RegBank;

/// One contiguous bit range inside the encoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub pos: u8,
    pub len: u8,
}

impl BitField {
    pub fn mask(self) -> u32 {
        if self.len == 0 {
            0
        } else {
            (((1u64 << self.len) - 1) as u32) << self.pos
        }
    }
}

/// Representable range interpretation for a value slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signedness {
    Signed,
    Unsigned,
    /// Accept either interpretation, the lenient TriCore-manual reading
    /// used for `const`/`off`/`imm` fields.
    Either,
}

/// What a syntax slot accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    Reg {
        bank: RegBank,
        /// A literal-register constraint such as "must be D15" or "must be
        /// A10". `None` means any index.
        fixed: Option<u8>,
        deref: bool,
        post_increment: bool,
    },
    Value {
        width: u8,
        signedness: Signedness,
        /// Displacement scale divisor (1, 2 or 4).
        scale: u8,
        pc_relative: bool,
    },
    /// Packed-half literal suffix (`LL`, `LU`, `UL`, `UU`).
    FixedToken(String),
}

/// One operand slot of a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandSlot {
    pub kind: SlotKind,
    /// Instruction-word fields this slot writes; empty for implicit
    /// (non-encoded) operands such as the `A[15]` in short store forms.
    pub fields: Vec<BitField>,
    /// For split operands: the value bit range `[hi:lo]` stored in each
    /// field, parallel to `fields`. Empty when the slot is not split.
    pub splits: Vec<(u8, u8)>,
    /// Original syntax text of the slot, kept for diagnostics.
    pub text: String,
}

impl OperandSlot {
    pub fn is_split(&self) -> bool {
        !self.splits.is_empty()
    }

    /// Total value width in bits.
    pub fn value_width(&self) -> u8 {
        match &self.kind {
            SlotKind::Value { width, .. } => *width,
            _ => self.fields.iter().map(|f| f.len).sum(),
        }
    }
}

/// One row of the instruction table, fully parsed.
#[derive(Debug, Clone)]
pub struct InstructionVariant {
    pub mnemonic: String,
    pub syntax: String,
    pub opcode_bits: u8,
    pub base_opcode: u32,
    pub slots: Vec<OperandSlot>,
    /// Source row order; earlier rows win selection ties.
    pub row: usize,
}

impl InstructionVariant {
    pub fn size_bytes(&self) -> u32 {
        u32::from(self.opcode_bits) / 8
    }

    pub fn operand_count(&self) -> usize {
        self.slots.len()
    }

    /// True when the variant requires a literal `A[10]` or `A[15]` register
    /// (the variants dropped by `-Ono-implicit`).
    pub fn uses_implicit_address_register(&self) -> bool {
        self.slots.iter().any(|slot| {
            matches!(
                slot.kind,
                SlotKind::Reg {
                    bank: RegBank::A,
                    fixed: Some(10) | Some(15),
                    ..
                }
            )
        })
    }
}

/// Raw row as read from a table file, before syntax parsing.
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub opcode: u32,
    pub opcode_size: u8,
    pub mnemonic: String,
    pub syntax: String,
    pub operand_count: usize,
    /// `(pos, len)` pairs for op1..op5 as present in the row.
    pub fields: Vec<(u8, u8)>,
}

/// Row-level load failure.
#[derive(Debug, Clone)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

/// Table load failure: unreadable file or rows that failed schema checks.
#[derive(Debug)]
pub struct TableLoadError {
    pub message: String,
    pub row_errors: Vec<RowError>,
}

impl TableLoadError {
    pub fn file(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            row_errors: Vec::new(),
        }
    }
}

impl fmt::Display for TableLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for err in &self.row_errors {
            write!(f, "; {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TableLoadError {}

/// The immutable, indexed instruction set.
#[derive(Debug, Default)]
pub struct InstructionTable {
    variants: Vec<InstructionVariant>,
    by_mnemonic: HashMap<String, Vec<usize>>,
}

impl InstructionTable {
    /// Build a table from raw rows, validating each row's geometry.
    pub fn from_rows(rows: Vec<TableRow>) -> Result<Self, TableLoadError> {
        let mut table = InstructionTable::default();
        let mut row_errors = Vec::new();
        for (idx, row) in rows.into_iter().enumerate() {
            match variant_from_row(&row, table.variants.len()) {
                Ok(variant) => {
                    let slot = table.variants.len();
                    table
                        .by_mnemonic
                        .entry(variant.mnemonic.clone())
                        .or_default()
                        .push(slot);
                    table.variants.push(variant);
                }
                Err(message) => row_errors.push(RowError { row: idx + 1, message }),
            }
        }
        if !row_errors.is_empty() {
            return Err(TableLoadError {
                message: format!("{} table row(s) failed validation", row_errors.len()),
                row_errors,
            });
        }
        if table.variants.is_empty() {
            return Err(TableLoadError::file("instruction table is empty"));
        }
        Ok(table)
    }

    /// Load from a file; the format is chosen by extension (`.csv`, `.json`).
    pub fn load(path: &Path) -> Result<Self, TableLoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let text = fs::read_to_string(path).map_err(|e| {
            TableLoadError::file(format!("cannot read {}: {e}", path.display()))
        })?;
        match ext.as_str() {
            "csv" => Self::from_rows(parse_csv(&text)?),
            "json" => Self::from_rows(parse_json(&text)?),
            other => Err(TableLoadError::file(format!(
                "unsupported instruction table format: .{other}"
            ))),
        }
    }

    pub fn variants(&self) -> &[InstructionVariant] {
        &self.variants
    }

    /// All variants of a mnemonic, in table order.
    pub fn variants_of(&self, mnemonic: &str) -> Vec<&InstructionVariant> {
        let key = mnemonic.to_ascii_uppercase();
        self.by_mnemonic
            .get(&key)
            .map(|ids| ids.iter().map(|&i| &self.variants[i]).collect())
            .unwrap_or_default()
    }

    /// Arity pre-filter: variants of a mnemonic with the given operand count.
    pub fn variants_with_arity(&self, mnemonic: &str, count: usize) -> Vec<&InstructionVariant> {
        self.variants_of(mnemonic)
            .into_iter()
            .filter(|v| v.operand_count() == count)
            .collect()
    }

    /// Membership query used by the parser to distinguish instructions from
    /// unknown directives.
    pub fn has_mnemonic(&self, mnemonic: &str) -> bool {
        self.by_mnemonic
            .contains_key(&mnemonic.to_ascii_uppercase())
    }

    pub fn mnemonic_count(&self) -> usize {
        self.by_mnemonic.len()
    }
}

/// Parse a row into a typed variant, validating slot geometry.
pub fn variant_from_row(row: &TableRow, order: usize) -> Result<InstructionVariant, String> {
    if row.mnemonic.is_empty() {
        return Err("missing mnemonic".to_string());
    }
    if row.opcode_size != 16 && row.opcode_size != 32 {
        return Err(format!("bad opcode size {}", row.opcode_size));
    }

    let slots = parse_syntax_slots(&row.syntax, &row.fields)?;
    if row.operand_count != slots.len() {
        return Err(format!(
            "operand_count {} does not match syntax ({} operands)",
            row.operand_count,
            slots.len()
        ));
    }

    // Geometry: fields disjoint, inside the word, clear in the base opcode.
    let mut used: u32 = 0;
    let word_mask: u32 = if row.opcode_size == 32 {
        0xFFFF_FFFF
    } else {
        0xFFFF
    };
    for slot in &slots {
        for field in &slot.fields {
            let mask = field.mask();
            if mask == 0 {
                continue;
            }
            if u32::from(field.pos) + u32::from(field.len) > u32::from(row.opcode_size) {
                return Err(format!(
                    "operand field [{}+{}] extends past the {}-bit word",
                    field.pos, field.len, row.opcode_size
                ));
            }
            if used & mask != 0 {
                return Err(format!(
                    "operand field [{}+{}] overlaps another slot",
                    field.pos, field.len
                ));
            }
            used |= mask;
        }
    }
    if row.opcode & !word_mask != 0 {
        return Err(format!(
            "opcode {:#x} wider than {} bits",
            row.opcode, row.opcode_size
        ));
    }
    if row.opcode & used != 0 {
        return Err(format!(
            "fixed opcode bits {:#x} overlap operand fields {:#x}",
            row.opcode, used
        ));
    }

    Ok(InstructionVariant {
        mnemonic: row.mnemonic.to_ascii_uppercase(),
        syntax: row.syntax.clone(),
        opcode_bits: row.opcode_size,
        base_opcode: row.opcode,
        slots,
        row: order,
    })
}

/// Parse the operand part of a syntax pattern into slots, wiring each slot
/// to its `(pos, len)` row entries. A split operand (`{[15:0],[23:16]}`)
/// consumes one row entry per bit-group.
fn parse_syntax_slots(syntax: &str, fields: &[(u8, u8)]) -> Result<Vec<OperandSlot>, String> {
    let operand_text = match syntax.split_once(char::is_whitespace) {
        Some((_, rest)) => rest.trim(),
        None => "",
    };
    if operand_text.is_empty() {
        return Ok(Vec::new());
    }

    // Pull out the (single) split-field group before comma-splitting; its
    // commas are not operand separators.
    let (clean, split_ranges, split_after) = extract_split_group(operand_text)?;

    let mut slots = Vec::new();
    let mut field_idx = 0usize;
    let mut take_field = |text: &str| -> Result<BitField, String> {
        let (pos, len) = fields
            .get(field_idx)
            .copied()
            .ok_or_else(|| format!("no bit field for operand '{text}'"))?;
        field_idx += 1;
        Ok(BitField { pos, len })
    };

    for (op_idx, piece) in split_commas(&clean).into_iter().enumerate() {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let is_split_owner = split_after == Some(op_idx);
        for part in split_syntax_operand(piece)? {
            let split_here = is_split_owner && matches!(&part, SyntaxPart::Value(_));
            let slot = build_slot(
                part,
                if split_here { &split_ranges } else { &[] },
                &mut take_field,
            )?;
            slots.push(slot);
        }
    }
    Ok(slots)
}

enum SyntaxPart {
    Reg {
        bank: RegBank,
        fixed: Option<u8>,
        deref: bool,
        post_increment: bool,
        text: String,
    },
    Value(String),
    Fixed(String),
}

/// Break one comma-separated syntax piece into its parts. Compound memory
/// pieces like `[A[15]]off4` contribute a register slot and a value slot.
fn split_syntax_operand(piece: &str) -> Result<Vec<SyntaxPart>, String> {
    let piece = piece.trim();
    if piece.starts_with('[') {
        // [A[b]]off10, [A[b]+]off10, [A[15]]off4, [A[b]], [A[b]+]
        let close = find_matching_bracket(piece)
            .ok_or_else(|| format!("unbalanced brackets in syntax '{piece}'"))?;
        let inner = &piece[1..close];
        let tail = piece[close + 1..].trim();
        let (bank, fixed, post_increment) = parse_syntax_register(inner)?;
        let mut parts = vec![SyntaxPart::Reg {
            bank,
            fixed,
            deref: true,
            post_increment,
            text: piece[..=close].to_string(),
        }];
        if !tail.is_empty() {
            parts.push(SyntaxPart::Value(tail.to_string()));
        }
        return Ok(parts);
    }

    if let Ok((bank, fixed, _)) = parse_syntax_register(piece) {
        return Ok(vec![SyntaxPart::Reg {
            bank,
            fixed,
            deref: false,
            post_increment: false,
            text: piece.to_string(),
        }]);
    }

    let upper = piece.to_ascii_uppercase();
    if matches!(upper.as_str(), "LL" | "LU" | "UL" | "UU") {
        return Ok(vec![SyntaxPart::Fixed(upper)]);
    }

    Ok(vec![SyntaxPart::Value(piece.to_string())])
}

fn build_slot(
    part: SyntaxPart,
    split_ranges: &[(u8, u8)],
    take_field: &mut impl FnMut(&str) -> Result<BitField, String>,
) -> Result<OperandSlot, String> {
    match part {
        SyntaxPart::Reg {
            bank,
            fixed,
            deref,
            post_increment,
            text,
        } => {
            let field = take_field(&text)?;
            let fields = if field.len == 0 { Vec::new() } else { vec![field] };
            Ok(OperandSlot {
                kind: SlotKind::Reg {
                    bank,
                    fixed,
                    deref,
                    post_increment,
                },
                fields,
                splits: Vec::new(),
                text,
            })
        }
        SyntaxPart::Fixed(token) => Ok(OperandSlot {
            kind: SlotKind::FixedToken(token.clone()),
            fields: Vec::new(),
            splits: Vec::new(),
            text: token,
        }),
        SyntaxPart::Value(text) => {
            let (width, signedness, scale, pc_relative) = parse_value_spec(&text)?;
            let mut fields = Vec::new();
            let mut splits = Vec::new();
            if split_ranges.is_empty() {
                let field = take_field(&text)?;
                if field.len != 0 {
                    fields.push(field);
                }
            } else {
                for &(hi, lo) in split_ranges {
                    let field = take_field(&text)?;
                    if field.len != u8::from(hi - lo + 1) {
                        return Err(format!(
                            "split range [{hi}:{lo}] does not match field width {} for '{text}'",
                            field.len
                        ));
                    }
                    fields.push(field);
                    splits.push((hi, lo));
                }
            }
            Ok(OperandSlot {
                kind: SlotKind::Value {
                    width,
                    signedness,
                    scale,
                    pc_relative,
                },
                fields,
                splits,
                text,
            })
        }
    }
}

/// Parse `D[a]`, `D[15]`, `A[b]+`, `E[c]` register syntax.
fn parse_syntax_register(text: &str) -> Result<(RegBank, Option<u8>, bool), String> {
    let mut body = text.trim();
    let mut post_increment = false;
    if let Some(stripped) = body.strip_suffix('+') {
        post_increment = true;
        body = stripped.trim();
    }
    let mut chars = body.chars();
    let bank = chars
        .next()
        .and_then(RegBank::from_letter)
        .ok_or_else(|| format!("not a register pattern: '{text}'"))?;
    let rest = chars.as_str().trim();
    let inner = rest
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .ok_or_else(|| format!("not a register pattern: '{text}'"))?
        .trim();
    if inner.is_empty() {
        return Err(format!("empty register index in '{text}'"));
    }
    if inner.bytes().all(|c| c.is_ascii_digit()) {
        let index: u8 = inner
            .parse()
            .map_err(|_| format!("bad register index in '{text}'"))?;
        if index > 15 {
            return Err(format!("register index out of range in '{text}'"));
        }
        Ok((bank, Some(index), post_increment))
    } else if inner.bytes().all(|c| c.is_ascii_alphabetic()) {
        Ok((bank, None, post_increment))
    } else {
        Err(format!("bad register index in '{text}'"))
    }
}

/// Parse `const4`, `off10/2`, `disp24`, `imm8`, `rel16` value specs.
fn parse_value_spec(text: &str) -> Result<(u8, Signedness, u8, bool), String> {
    let lower = text.trim().to_ascii_lowercase();
    let (body, scale) = if let Some(b) = lower.strip_suffix("/4") {
        (b.trim(), 4u8)
    } else if let Some(b) = lower.strip_suffix("/2") {
        (b.trim(), 2u8)
    } else {
        (lower.as_str(), 1u8)
    };

    const PREFIXES: &[(&str, Signedness, bool)] = &[
        ("disp", Signedness::Signed, true),
        ("rel", Signedness::Signed, true),
        ("const", Signedness::Either, false),
        ("off", Signedness::Either, false),
        ("imm", Signedness::Either, false),
    ];
    for (prefix, signedness, pc_relative) in PREFIXES {
        if let Some(digits) = body.strip_prefix(prefix) {
            if !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_digit()) {
                let width: u8 = digits
                    .parse()
                    .map_err(|_| format!("bad operand width in '{text}'"))?;
                if width == 0 || width > 32 {
                    return Err(format!("operand width out of range in '{text}'"));
                }
                return Ok((width, *signedness, scale, *pc_relative));
            }
        }
    }
    Err(format!("unrecognised operand pattern '{text}'"))
}

/// Extract the `{[hi:lo]...}` split group from the operand text.
/// Returns the cleaned text, the ranges, and the 0-based index of the
/// comma-separated operand the group is attached to.
fn extract_split_group(text: &str) -> Result<(String, Vec<(u8, u8)>, Option<usize>), String> {
    let Some(open) = text.find('{') else {
        return Ok((text.to_string(), Vec::new(), None));
    };
    let close = text[open..]
        .find('}')
        .map(|i| open + i)
        .ok_or_else(|| format!("unterminated split group in '{text}'"))?;
    let content = &text[open + 1..close];

    let mut ranges = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find('[') {
        let end = rest[start..]
            .find(']')
            .map(|i| start + i)
            .ok_or_else(|| format!("bad split range in '{content}'"))?;
        let pair = &rest[start + 1..end];
        let (hi, lo) = pair
            .split_once(':')
            .ok_or_else(|| format!("bad split range '{pair}'"))?;
        let hi: u8 = hi.trim().parse().map_err(|_| format!("bad split range '{pair}'"))?;
        let lo: u8 = lo.trim().parse().map_err(|_| format!("bad split range '{pair}'"))?;
        if lo > hi {
            return Err(format!("inverted split range '{pair}'"));
        }
        ranges.push((hi, lo));
        rest = &rest[end + 1..];
    }
    if ranges.is_empty() {
        return Err(format!("empty split group in '{text}'"));
    }

    let owner = text[..open].matches(',').count();
    let mut clean = String::new();
    clean.push_str(&text[..open]);
    clean.push_str(&text[close + 1..]);
    Ok((clean, ranges, Some(owner)))
}

fn split_commas(text: &str) -> Vec<String> {
    text.split(',').map(|s| s.trim().to_string()).collect()
}

fn find_matching_bracket(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (idx, c) in text.bytes().enumerate() {
        match c {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_opcode_text(text: &str) -> Result<u32, String> {
    let t = text.trim();
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|_| format!("bad opcode '{t}'"))
    } else {
        t.parse::<u32>().map_err(|_| format!("bad opcode '{t}'"))
    }
}

/// Line-oriented CSV loader. The header row names the columns; `Syntax`
/// cells containing commas are double-quoted.
fn parse_csv(text: &str) -> Result<Vec<TableRow>, TableLoadError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| TableLoadError::file("empty instruction table file"))?;
    let columns: Vec<String> = csv_fields(header)
        .into_iter()
        .map(|c| c.trim().to_ascii_lowercase())
        .collect();
    let col = |name: &str| columns.iter().position(|c| c == name);

    let opcode_col = col("opcode").ok_or_else(|| TableLoadError::file("missing OpCode column"))?;
    let size_col =
        col("opcodesize").ok_or_else(|| TableLoadError::file("missing OpCodeSize column"))?;
    let mnemonic_col =
        col("instruction").ok_or_else(|| TableLoadError::file("missing Instruction column"))?;
    let syntax_col = col("syntax").ok_or_else(|| TableLoadError::file("missing Syntax column"))?;
    let count_col = col("operandcount")
        .ok_or_else(|| TableLoadError::file("missing OperandCount column"))?;
    let mut field_cols = Vec::new();
    for i in 1..=5 {
        let pos = col(&format!("op{i}_pos"));
        let len = col(&format!("op{i}_len"));
        field_cols.push((pos, len));
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    for (line_idx, line) in lines.enumerate() {
        let fields = csv_fields(line);
        let cell = |idx: usize| fields.get(idx).map(|s| s.trim()).unwrap_or("");
        let parse_cell_num = |idx: usize| -> Option<u8> { cell(idx).parse().ok() };

        let mnemonic = cell(mnemonic_col).to_string();
        let opcode_text = cell(opcode_col);
        if mnemonic.is_empty() || opcode_text.is_empty() {
            // Blank separator rows are tolerated, mirroring spreadsheet input.
            continue;
        }
        let opcode = match parse_opcode_text(opcode_text) {
            Ok(v) => v,
            Err(message) => {
                row_errors.push(RowError {
                    row: line_idx + 2,
                    message,
                });
                continue;
            }
        };
        let mut row_fields = Vec::new();
        for &(pos_col, len_col) in &field_cols {
            let (Some(pc), Some(lc)) = (pos_col, len_col) else {
                continue;
            };
            // An empty cell means the slot is absent, not zero-width.
            if cell(pc).is_empty() && cell(lc).is_empty() {
                continue;
            }
            let pos = parse_cell_num(pc).unwrap_or(0);
            let len = parse_cell_num(lc).unwrap_or(0);
            row_fields.push((pos, len));
        }
        rows.push(TableRow {
            opcode,
            opcode_size: cell(size_col).parse().unwrap_or(32),
            mnemonic,
            syntax: cell(syntax_col).to_string(),
            operand_count: cell(count_col).parse().unwrap_or(0),
            fields: row_fields,
        });
    }
    if !row_errors.is_empty() {
        return Err(TableLoadError {
            message: format!("{} malformed row(s)", row_errors.len()),
            row_errors,
        });
    }
    Ok(rows)
}

fn csv_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(buf.clone());
                buf.clear();
            }
            _ => buf.push(c),
        }
    }
    fields.push(buf);
    fields
}

/// JSON loader; the document layout mirrors the table's export format:
/// `{ "instructions": [ { "opcode": "0x0082", "instruction": "MOV", … } ] }`.
fn parse_json(text: &str) -> Result<Vec<TableRow>, TableLoadError> {
    let doc: Value = serde_json::from_str(text)
        .map_err(|e| TableLoadError::file(format!("invalid JSON: {e}")))?;
    let instructions = doc
        .get("instructions")
        .and_then(Value::as_array)
        .ok_or_else(|| TableLoadError::file("missing 'instructions' array"))?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    for (idx, entry) in instructions.iter().enumerate() {
        let str_of = |key: &str| {
            entry
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string()
        };
        let num_of = |key: &str| entry.get(key).and_then(Value::as_u64);

        let opcode = match entry.get("opcode") {
            Some(Value::String(s)) => match parse_opcode_text(s) {
                Ok(v) => v,
                Err(message) => {
                    row_errors.push(RowError { row: idx + 1, message });
                    continue;
                }
            },
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as u32,
            _ => {
                row_errors.push(RowError {
                    row: idx + 1,
                    message: "missing opcode".to_string(),
                });
                continue;
            }
        };

        let mut fields = Vec::new();
        for i in 1..=5 {
            let pos = num_of(&format!("op{i}_pos"));
            let len = num_of(&format!("op{i}_len"));
            match (pos, len) {
                (None, None) => continue,
                (pos, len) => fields.push((
                    pos.unwrap_or(0) as u8,
                    len.unwrap_or(0) as u8,
                )),
            }
        }

        rows.push(TableRow {
            opcode,
            opcode_size: num_of("opcode_size").unwrap_or(32) as u8,
            mnemonic: str_of("instruction"),
            syntax: str_of("syntax"),
            operand_count: num_of("operand_count").unwrap_or(0) as usize,
            fields,
        });
    }
    if !row_errors.is_empty() {
        return Err(TableLoadError {
            message: format!("{} malformed row(s)", row_errors.len()),
            row_errors,
        });
    }
    Ok(rows)
}
