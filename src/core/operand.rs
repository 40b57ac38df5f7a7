// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Canonical operand representation.
//!
//! The parser reduces the many vendor spellings of a register operand
//! (`d4`, `D4`, `d[4]`, `D[4]`, `%d4`, `[d4]`, `[D[4]]`, `[%a2+]`) to a
//! single canonical form. Everything that is not a register is an
//! immediate, a symbol reference, or a packed-half selector token.

use crate::core::numeric::{self, parse_numeric};
use std::fmt;

/// Register bank. `E` and `P` are the even-indexed extended/pair banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegBank {
    D,
    A,
    E,
    P,
}

impl RegBank {
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'd' => Some(RegBank::D),
            'a' => Some(RegBank::A),
            'e' => Some(RegBank::E),
            'p' => Some(RegBank::P),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            RegBank::D => 'd',
            RegBank::A => 'a',
            RegBank::E => 'e',
            RegBank::P => 'p',
        }
    }

    /// E and P registers exist only at even indices.
    pub fn requires_even_index(self) -> bool {
        matches!(self, RegBank::E | RegBank::P)
    }
}

impl fmt::Display for RegBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A canonical register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub bank: RegBank,
    pub index: u8,
    /// Parsed from a bracketed form (`[a4]` vs `a4`).
    pub deref: bool,
    /// Parsed from a `[A[b]+]` post-increment form.
    pub post_increment: bool,
}

impl Register {
    pub fn new(bank: RegBank, index: u8) -> Self {
        Self {
            bank,
            index,
            deref: false,
            post_increment: false,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deref {
            let inc = if self.post_increment { "+" } else { "" };
            write!(f, "[{}{}{}]", self.bank, self.index, inc)
        } else {
            write!(f, "{}{}", self.bank, self.index)
        }
    }
}

/// `HI:`/`LO:` half selection on an immediate or symbol reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfSel {
    Hi,
    Lo,
}

impl HalfSel {
    /// Apply the selector to a resolved 32-bit value.
    pub fn apply(self, value: i64) -> i64 {
        match self {
            HalfSel::Hi => (value >> 16) & 0xFFFF,
            HalfSel::Lo => value & 0xFFFF,
        }
    }
}

/// A canonical operand after tolerant normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    /// Fully evaluated numeric value (`#5`, `0x10`, `#LO:0x12345678`).
    Immediate { value: i64, half: Option<HalfSel> },
    /// Symbol reference, resolved against the symbol table during linking.
    /// `offset` carries trailing `+n`/`-n` terms; `half` a `HI:`/`LO:` prefix.
    Symbol {
        name: String,
        offset: i64,
        half: Option<HalfSel>,
    },
    /// Packed-half suffix token (`LL`, `LU`, `UL`, `UU`).
    Fixed(String),
}

impl Operand {
    pub fn immediate(value: i64) -> Self {
        Operand::Immediate { value, half: None }
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Operand::Symbol {
            name: name.into(),
            offset: 0,
            half: None,
        }
    }

    pub fn as_register(&self) -> Option<&Register> {
        match self {
            Operand::Register(reg) => Some(reg),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Operand::Immediate { .. } | Operand::Symbol { .. })
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(reg) => write!(f, "{reg}"),
            Operand::Immediate { value, half } => match half {
                Some(HalfSel::Hi) => write!(f, "#HI:{value}"),
                Some(HalfSel::Lo) => write!(f, "#LO:{value}"),
                None => write!(f, "#{value}"),
            },
            Operand::Symbol { name, offset, .. } => {
                if *offset == 0 {
                    write!(f, "{name}")
                } else if *offset > 0 {
                    write!(f, "{name}+{offset}")
                } else {
                    write!(f, "{name}{offset}")
                }
            }
            Operand::Fixed(tok) => write!(f, "{tok}"),
        }
    }
}

/// Try to parse a register from a single normalised token.
///
/// Accepted spellings, all case-insensitive and with an optional `%` prefix:
/// `d4`, `d[4]`, `[d4]`, `[d[4]]`, `[%a2+]`, `[a2+]`.
pub fn parse_register(token: &str) -> Option<Register> {
    let token = token.trim();
    let mut inner = token;
    let mut deref = false;
    let mut post_increment = false;

    // Strip outer memory brackets; the innermost `X[n]` bracket pair is
    // index notation, not a dereference.
    while inner.starts_with('[') && inner.ends_with(']') {
        let candidate = inner[1..inner.len() - 1].trim();
        if candidate.is_empty() {
            return None;
        }
        // Stop if stripping would break `a[4]`-style index notation.
        if candidate.as_bytes()[0].is_ascii_alphabetic() || candidate.starts_with('%') {
            deref = true;
            inner = candidate;
        } else {
            return None;
        }
        if !inner.contains('[') {
            break;
        }
        // `[a[4]]`: one more round strips nothing useful, `a[4]` parses below.
        break;
    }

    let mut body = inner.strip_prefix('%').unwrap_or(inner);
    if let Some(stripped) = body.strip_suffix('+') {
        if !deref {
            return None;
        }
        post_increment = true;
        body = stripped;
    }

    let mut chars = body.chars();
    let bank = RegBank::from_letter(chars.next()?)?;
    let rest = chars.as_str().trim();

    let index_text = if rest.starts_with('[') && rest.ends_with(']') {
        rest[1..rest.len() - 1].trim()
    } else {
        rest
    };
    if index_text.is_empty() || !index_text.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let index: u8 = index_text.parse().ok()?;
    if index > 15 {
        return None;
    }

    Some(Register {
        bank,
        index,
        deref,
        post_increment,
    })
}

/// Packed-half suffix tokens used by `MOV.H`-style packed instructions.
pub fn parse_fixed_suffix(token: &str) -> Option<String> {
    let upper = token.trim().to_ascii_uppercase();
    match upper.as_str() {
        "LL" | "LU" | "UL" | "UU" => Some(upper),
        _ => None,
    }
}

/// True when a bare token should be read as an immediate rather than a
/// symbol: it starts with `#`, or parses as a pure number and is not a
/// register.
pub fn looks_immediate(token: &str) -> bool {
    let token = token.trim();
    if token.starts_with('#') {
        return true;
    }
    parse_register(token).is_none() && numeric::is_numeric(token)
}

/// Evaluate `HI:`/`LO:` prefix on a raw value expression text, returning the
/// selector and the remainder.
pub fn split_half_prefix(text: &str) -> (Option<HalfSel>, &str) {
    let trimmed = text.trim();
    let upper_prefix = |p: &str| {
        trimmed.len() >= p.len() && trimmed[..p.len()].eq_ignore_ascii_case(p)
    };
    if upper_prefix("HI:") {
        (Some(HalfSel::Hi), trimmed[3..].trim())
    } else if upper_prefix("LO:") {
        (Some(HalfSel::Lo), trimmed[3..].trim())
    } else {
        (None, trimmed)
    }
}

/// Parse an immediate token (`#` already stripped is fine too) into an
/// operand, falling back to a symbol reference for identifier expressions.
pub fn parse_value_token(token: &str) -> Option<Operand> {
    let body = token.trim().strip_prefix('#').unwrap_or(token.trim()).trim();
    let (half, expr) = split_half_prefix(body);
    if expr.is_empty() {
        return None;
    }

    if let Ok(value) = parse_numeric(expr) {
        let value = match half {
            Some(sel) => sel.apply(value),
            None => value,
        };
        return Some(Operand::Immediate { value, half });
    }

    // label, label+off, label-off
    let (name, offset) = split_symbol_offset(expr)?;
    Some(Operand::Symbol { name, offset, half })
}

/// Split `name+off` / `name-off` into the symbol and its numeric offset.
/// Left-to-right addition only; no multiplicative operators.
fn split_symbol_offset(expr: &str) -> Option<(String, i64)> {
    let bytes = expr.as_bytes();
    if bytes.is_empty() || !crate::core::text_utils::is_ident_start(bytes[0]) {
        return None;
    }
    let mut end = 1;
    while end < bytes.len() && crate::core::text_utils::is_ident_char(bytes[end]) {
        end += 1;
    }
    let name = expr[..end].to_string();
    let mut offset: i64 = 0;
    let mut rest = expr[end..].trim();
    while !rest.is_empty() {
        let sign = match rest.as_bytes()[0] {
            b'+' => 1,
            b'-' => -1,
            _ => return None,
        };
        rest = rest[1..].trim();
        let term_end = rest
            .bytes()
            .position(|c| c == b'+' || c == b'-')
            .unwrap_or(rest.len());
        let term = rest[..term_end].trim();
        let value = parse_numeric(term).ok()?;
        offset += sign * value;
        rest = rest[term_end..].trim();
    }
    Some((name, offset))
}
