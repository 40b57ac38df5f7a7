// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Statement parser: one source line in, one canonical [`Statement`] out.
//!
//! The parser is recoverable: a bad line produces a diagnostic and an empty
//! statement, and parsing continues on the next line. Directive names are
//! matched case-insensitively; GCC numeric local labels (`1:`) are rewritten
//! to unique per-file names and `1f`/`1b` references are resolved to the
//! nearest following/preceding definition.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::core::numeric::parse_numeric;
use crate::core::operand::{
    looks_immediate, parse_fixed_suffix, parse_register, parse_value_token, split_half_prefix,
    HalfSel, Operand,
};
use crate::core::report::{Diagnostic, ErrorKind, SourceLocation};
use crate::core::table::InstructionTable;
use crate::core::tokenizer::{split_label, split_mnemonic, split_operands, CommentStripper};

/// Element width of a data directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataWidth {
    Byte,
    Word,
    Dword,
    Qword,
}

impl DataWidth {
    pub fn bytes(self) -> u32 {
        match self {
            DataWidth::Byte => 1,
            DataWidth::Word => 2,
            DataWidth::Dword => 4,
            DataWidth::Qword => 8,
        }
    }
}

/// One value of a data directive. Symbols resolve at emission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    Number(i64),
    Symbol {
        name: String,
        offset: i64,
        half: Option<HalfSel>,
    },
    /// String/character payload; only legal for byte-wide directives.
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Instruction {
        mnemonic: String,
        operands: Vec<Operand>,
    },
    Data {
        width: DataWidth,
        values: Vec<DataValue>,
    },
    Reserve {
        bytes: u32,
    },
    Equate {
        name: String,
        value: i64,
    },
    Times {
        count: u32,
        inner: Box<StatementKind>,
    },
    Origin {
        address: u32,
    },
    Section {
        name: String,
    },
    Align {
        boundary: u32,
    },
    Global {
        name: String,
    },
    Empty,
}

impl StatementKind {
    pub fn is_empty(&self) -> bool {
        matches!(self, StatementKind::Empty)
    }
}

/// Canonical form of one source line.
#[derive(Debug, Clone)]
pub struct Statement {
    pub label: Option<String>,
    pub kind: StatementKind,
    pub location: SourceLocation,
    /// Original text, comments included, for the listing.
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub statements: Vec<Statement>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
struct EvalError(String);

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Statement parser over a pre-expanded line stream.
pub struct LineParser<'t> {
    table: &'t InstructionTable,
    file: String,
    stripper: CommentStripper,
    /// EQU values usable in directive expressions further down the file.
    equates: HashMap<String, i64>,
    /// Occurrence counters for GCC numeric local labels.
    local_counts: HashMap<String, u32>,
    diagnostics: Vec<Diagnostic>,
    /// Base directory for INCBIN path resolution.
    base_dir: PathBuf,
}

impl<'t> LineParser<'t> {
    pub fn new(table: &'t InstructionTable, file: impl Into<String>) -> Self {
        Self {
            table,
            file: file.into(),
            stripper: CommentStripper::new(),
            equates: HashMap::new(),
            local_counts: HashMap::new(),
            diagnostics: Vec::new(),
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Parse every line; bad lines yield diagnostics and parsing continues.
    pub fn parse(mut self, lines: &[String]) -> ParseOutput {
        let mut statements = Vec::with_capacity(lines.len());
        for (idx, raw) in lines.iter().enumerate() {
            let line_num = (idx + 1) as u32;
            statements.push(self.parse_line(raw, line_num));
        }
        ParseOutput {
            statements,
            diagnostics: self.diagnostics,
        }
    }

    fn location(&self, line: u32) -> SourceLocation {
        SourceLocation::new(self.file.clone(), line)
    }

    fn error(&mut self, line: u32, kind: ErrorKind, msg: impl Into<String>) {
        let loc = self.location(line);
        self.diagnostics.push(Diagnostic::error_at(loc, kind, msg));
    }

    fn parse_line(&mut self, raw: &str, line_num: u32) -> Statement {
        let code = self.stripper.strip(raw);

        if code.trim().is_empty() {
            return self.bare_statement(None, raw, line_num);
        }

        // NAME EQU value comes before label handling: the name is in label
        // position but takes no colon.
        if let Some(stmt) = self.try_parse_equ(&code, line_num, raw) {
            return stmt;
        }

        let (mut label, rest) = split_label(&code);
        if let Some(name) = label.take() {
            label = Some(self.canonical_label(&name));
        }

        // GCC-style bare labels: a lone `.L…` token with nothing else.
        if label.is_none() && rest.split_whitespace().count() == 1 {
            let token = rest.trim();
            if token.starts_with(".L") && !self.is_directive(token) {
                return self.bare_statement(Some(token.to_string()), raw, line_num);
            }
        }

        if rest.trim().is_empty() {
            return self.bare_statement(label, raw, line_num);
        }

        let kind = self.parse_body(&rest, line_num);
        Statement {
            label,
            kind,
            location: self.location(line_num),
            source: raw.to_string(),
        }
    }

    fn bare_statement(&self, label: Option<String>, raw: &str, line_num: u32) -> Statement {
        Statement {
            label,
            kind: StatementKind::Empty,
            location: self.location(line_num),
            source: raw.to_string(),
        }
    }

    /// Rewrite numeric local labels to unique per-file names.
    /// Definition `1:` becomes `1@<k>`; see `local_ref` for `1f`/`1b`.
    fn canonical_label(&mut self, name: &str) -> String {
        if !name.bytes().all(|c| c.is_ascii_digit()) {
            return name.to_string();
        }
        let count = self.local_counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        format!("{name}@{count}")
    }

    /// Resolve `1f`/`1b` numeric label references against the counters.
    fn local_ref(&self, token: &str) -> Option<String> {
        let bytes = token.as_bytes();
        if bytes.len() < 2 {
            return None;
        }
        let (digits, dir) = token.split_at(token.len() - 1);
        if !digits.bytes().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let seen = self.local_counts.get(digits).copied().unwrap_or(0);
        match dir {
            "f" => Some(format!("{digits}@{}", seen + 1)),
            "b" if seen > 0 => Some(format!("{digits}@{seen}")),
            _ => None,
        }
    }

    fn is_directive(&self, token: &str) -> bool {
        let lower = token.trim_start_matches('.').to_ascii_lowercase();
        matches!(
            lower.as_str(),
            "org" | "section" | "sect" | "sdecl" | "align" | "global" | "globl" | "type"
                | "end" | "db" | "dw" | "dd" | "dq" | "resb" | "resw" | "resd" | "resq"
                | "equ" | "times" | "incbin" | "include"
        )
    }

    fn try_parse_equ(&mut self, code: &str, line_num: u32, raw: &str) -> Option<Statement> {
        let mut words = code.split_whitespace();
        let name = words.next()?;
        let keyword = words.next()?;
        if !keyword.eq_ignore_ascii_case("equ") {
            return None;
        }
        let expr = code
            .splitn(3, char::is_whitespace)
            .nth(2)
            .unwrap_or("")
            .trim()
            .to_string();
        let location = self.location(line_num);
        let kind = match self.eval_expr(&expr) {
            Ok(value) => {
                self.equates.insert(name.to_string(), value);
                StatementKind::Equate {
                    name: name.to_string(),
                    value,
                }
            }
            Err(err) => {
                self.error(
                    line_num,
                    ErrorKind::Directive,
                    format!("bad EQU value '{expr}': {err}"),
                );
                StatementKind::Empty
            }
        };
        Some(Statement {
            label: None,
            kind,
            location,
            source: raw.to_string(),
        })
    }

    fn parse_body(&mut self, body: &str, line_num: u32) -> StatementKind {
        let Some((keyword, operands)) = split_mnemonic(body) else {
            return StatementKind::Empty;
        };
        let lower = keyword.trim_start_matches('.').to_ascii_lowercase();
        let dotted = keyword.starts_with('.');

        match lower.as_str() {
            "org" if dotted => self.parse_org(&operands, line_num),
            "section" | "sect" if dotted => self.parse_section(&operands),
            "sdecl" if dotted => self.parse_sdecl(&operands),
            "align" if dotted => self.parse_align(&operands, line_num),
            "global" | "globl" if dotted => StatementKind::Global {
                name: operands.trim().to_string(),
            },
            "type" | "end" if dotted => StatementKind::Empty,
            "db" => self.parse_data(DataWidth::Byte, &operands, line_num),
            "dw" => self.parse_data(DataWidth::Word, &operands, line_num),
            "dd" => self.parse_data(DataWidth::Dword, &operands, line_num),
            "dq" => self.parse_data(DataWidth::Qword, &operands, line_num),
            "resb" => self.parse_reserve(1, &operands, line_num),
            "resw" => self.parse_reserve(2, &operands, line_num),
            "resd" => self.parse_reserve(4, &operands, line_num),
            "resq" => self.parse_reserve(8, &operands, line_num),
            "times" => self.parse_times(&operands, line_num),
            "incbin" => self.parse_incbin(&operands, line_num),
            // Includes are resolved by the preprocessor; a survivor is a no-op.
            "include" => StatementKind::Empty,
            _ => self.parse_instruction(&keyword, &operands, line_num),
        }
    }

    fn parse_org(&mut self, operands: &str, line_num: u32) -> StatementKind {
        match self.eval_expr(operands) {
            Ok(value) if value >= 0 && value <= u32::MAX as i64 => StatementKind::Origin {
                address: value as u32,
            },
            Ok(value) => {
                self.error(
                    line_num,
                    ErrorKind::Directive,
                    format!(".ORG address {value:#x} out of range"),
                );
                StatementKind::Empty
            }
            Err(err) => {
                self.error(line_num, ErrorKind::Directive, format!("bad .ORG: {err}"));
                StatementKind::Empty
            }
        }
    }

    fn parse_section(&mut self, operands: &str) -> StatementKind {
        let name = operands
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string();
        StatementKind::Section { name }
    }

    /// `.sdecl '<name>', CODE, …` reduces to plain section metadata.
    fn parse_sdecl(&mut self, operands: &str) -> StatementKind {
        let first = operands.split(',').next().unwrap_or("").trim();
        let name = first.trim_matches(|c| c == '"' || c == '\'').to_string();
        if name.is_empty() {
            StatementKind::Empty
        } else {
            StatementKind::Section { name }
        }
    }

    fn parse_align(&mut self, operands: &str, line_num: u32) -> StatementKind {
        match self.eval_expr(operands) {
            Ok(value) if value > 0 && (value as u64).is_power_of_two() => StatementKind::Align {
                boundary: value as u32,
            },
            Ok(value) => {
                self.error(
                    line_num,
                    ErrorKind::Directive,
                    format!(".align boundary {value} is not a positive power of two"),
                );
                StatementKind::Empty
            }
            Err(err) => {
                self.error(line_num, ErrorKind::Directive, format!("bad .align: {err}"));
                StatementKind::Empty
            }
        }
    }

    fn parse_data(&mut self, width: DataWidth, operands: &str, line_num: u32) -> StatementKind {
        let pieces = crate::core::text_utils::split_top_level(operands);
        if pieces.is_empty() {
            self.error(line_num, ErrorKind::Directive, "data directive without values");
            return StatementKind::Empty;
        }
        let mut values = Vec::new();
        for piece in pieces {
            match self.parse_data_value(&piece, width, line_num) {
                Some(value) => values.push(value),
                None => return StatementKind::Empty,
            }
        }
        StatementKind::Data { width, values }
    }

    fn parse_data_value(
        &mut self,
        piece: &str,
        width: DataWidth,
        line_num: u32,
    ) -> Option<DataValue> {
        let piece = piece.trim();
        if piece.starts_with('"') {
            let bytes = match unquote(piece, '"') {
                Ok(b) => b,
                Err(err) => {
                    self.error(line_num, ErrorKind::Lex, err);
                    return None;
                }
            };
            if width != DataWidth::Byte {
                self.error(
                    line_num,
                    ErrorKind::Directive,
                    "string data is only valid in DB",
                );
                return None;
            }
            return Some(DataValue::Bytes(bytes));
        }
        if piece.starts_with('\'') {
            let bytes = match unquote(piece, '\'') {
                Ok(b) => b,
                Err(err) => {
                    self.error(line_num, ErrorKind::Lex, err);
                    return None;
                }
            };
            if bytes.len() == 1 {
                return Some(DataValue::Number(i64::from(bytes[0])));
            }
            if width != DataWidth::Byte {
                self.error(
                    line_num,
                    ErrorKind::Directive,
                    "multi-character literal is only valid in DB",
                );
                return None;
            }
            return Some(DataValue::Bytes(bytes));
        }
        if let Ok(value) = self.eval_expr(piece) {
            return Some(DataValue::Number(value));
        }
        // Symbolic value, resolved at emission.
        let (half, expr) = split_half_prefix(piece);
        match parse_value_token(expr) {
            Some(Operand::Symbol { name, offset, .. }) => Some(DataValue::Symbol {
                name,
                offset,
                half,
            }),
            _ => {
                self.error(
                    line_num,
                    ErrorKind::NumericLiteral,
                    format!("bad data value '{piece}'"),
                );
                None
            }
        }
    }

    fn parse_reserve(&mut self, unit: u32, operands: &str, line_num: u32) -> StatementKind {
        match self.eval_expr(operands) {
            Ok(count) if count >= 0 => StatementKind::Reserve {
                bytes: unit * count as u32,
            },
            Ok(_) | Err(_) => {
                self.error(
                    line_num,
                    ErrorKind::Directive,
                    format!("bad reserve count '{}'", operands.trim()),
                );
                StatementKind::Empty
            }
        }
    }

    fn parse_times(&mut self, operands: &str, line_num: u32) -> StatementKind {
        let Some((count_text, inner_text)) = operands.trim().split_once(char::is_whitespace)
        else {
            self.error(line_num, ErrorKind::Directive, "TIMES needs a count and a statement");
            return StatementKind::Empty;
        };
        let count = match self.eval_expr(count_text) {
            Ok(value) if value >= 0 => value as u32,
            _ => {
                self.error(
                    line_num,
                    ErrorKind::Directive,
                    format!("bad TIMES count '{count_text}'"),
                );
                return StatementKind::Empty;
            }
        };
        let inner = self.parse_body(inner_text.trim(), line_num);
        if inner.is_empty() {
            return StatementKind::Empty;
        }
        StatementKind::Times {
            count,
            inner: Box::new(inner),
        }
    }

    fn parse_incbin(&mut self, operands: &str, line_num: u32) -> StatementKind {
        let path_text = operands
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string();
        let path = self.base_dir.join(&path_text);
        match fs::read(&path) {
            Ok(bytes) => StatementKind::Data {
                width: DataWidth::Byte,
                values: vec![DataValue::Bytes(bytes)],
            },
            Err(err) => {
                self.error(
                    line_num,
                    ErrorKind::Directive,
                    format!("INCBIN cannot read '{path_text}': {err}"),
                );
                StatementKind::Empty
            }
        }
    }

    fn parse_instruction(
        &mut self,
        mnemonic: &str,
        operand_text: &str,
        line_num: u32,
    ) -> StatementKind {
        let upper = mnemonic.to_ascii_uppercase();
        if !self.table.has_mnemonic(&upper) {
            self.error(
                line_num,
                ErrorKind::UnknownMnemonic,
                format!("unknown mnemonic '{mnemonic}'"),
            );
            return StatementKind::Empty;
        }

        let mut operands = Vec::new();
        for token in split_operands(operand_text) {
            match self.parse_operand(&token, line_num) {
                Some(op) => operands.push(op),
                None => return StatementKind::Empty,
            }
        }
        StatementKind::Instruction {
            mnemonic: upper,
            operands,
        }
    }

    fn parse_operand(&mut self, token: &str, line_num: u32) -> Option<Operand> {
        if let Some(reg) = parse_register(token) {
            return Some(Operand::Register(reg));
        }
        if let Some(fixed) = parse_fixed_suffix(token) {
            return Some(Operand::Fixed(fixed));
        }
        if let Some(local) = self.local_ref(token) {
            return Some(Operand::symbol(local));
        }
        // EQU constants are immediates once defined.
        if let Some((half, expr)) = strip_hash(token) {
            if let Ok(value) = self.eval_expr(expr) {
                let value = half.map_or(value, |h| h.apply(value));
                return Some(Operand::Immediate { value, half });
            }
        }
        if looks_immediate(token) || token.starts_with('#') {
            if let Some(op) = parse_value_token(token) {
                return Some(op);
            }
            self.error(
                line_num,
                ErrorKind::NumericLiteral,
                format!("bad numeric literal '{token}'"),
            );
            return None;
        }
        match parse_value_token(token) {
            Some(op) => Some(op),
            None => {
                self.error(
                    line_num,
                    ErrorKind::InvalidOperand,
                    format!("malformed operand '{token}'"),
                );
                None
            }
        }
    }

    /// Evaluate a directive expression: literals, EQU names, and `+`/`-`
    /// chains, left to right. `HI:`/`LO:` apply to the final value.
    fn eval_expr(&self, text: &str) -> Result<i64, EvalError> {
        let (half, body) = split_half_prefix(text.trim());
        let value = self.eval_sum(body)?;
        Ok(half.map_or(value, |h| h.apply(value)))
    }

    fn eval_sum(&self, text: &str) -> Result<i64, EvalError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EvalError("empty expression".to_string()));
        }
        let mut total = 0i64;
        let mut sign = 1i64;
        let mut term = String::new();
        let mut first = true;
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '+' | '-' if !term.trim().is_empty() || !first => {
                    if term.trim().is_empty() {
                        // Consecutive sign: fold into the pending sign.
                        if c == '-' {
                            sign = -sign;
                        }
                        continue;
                    }
                    total += sign * self.eval_term(term.trim())?;
                    sign = if c == '-' { -1 } else { 1 };
                    term.clear();
                }
                '-' if first && term.is_empty() => {
                    sign = -1;
                    first = false;
                }
                '+' if first && term.is_empty() => {
                    first = false;
                }
                _ => {
                    term.push(c);
                    first = false;
                }
            }
        }
        if term.trim().is_empty() {
            return Err(EvalError("trailing operator in expression".to_string()));
        }
        total += sign * self.eval_term(term.trim())?;
        Ok(total)
    }

    fn eval_term(&self, term: &str) -> Result<i64, EvalError> {
        if let Some(&value) = self.equates.get(term) {
            return Ok(value);
        }
        parse_numeric(term).map_err(|e| EvalError(e.message))
    }
}

fn strip_hash(token: &str) -> Option<(Option<HalfSel>, &str)> {
    let body = token.strip_prefix('#')?;
    Some(split_half_prefix(body))
}

/// Decode a quoted string/char literal to bytes.
fn unquote(piece: &str, quote: char) -> Result<Vec<u8>, String> {
    let inner = piece
        .strip_prefix(quote)
        .and_then(|s| s.strip_suffix(quote))
        .ok_or_else(|| format!("unterminated string: {piece}"))?;
    let mut out = Vec::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let esc = chars
                .next()
                .ok_or_else(|| format!("dangling escape in {piece}"))?;
            out.push(match esc {
                'n' => b'\n',
                'r' => b'\r',
                't' => b'\t',
                '0' => 0,
                other => other as u8,
            });
        } else {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stock::stock_table;

    fn parse(src: &str) -> ParseOutput {
        let table = stock_table().unwrap();
        let lines: Vec<String> = src.lines().map(str::to_string).collect();
        LineParser::new(&table, "test.asm").parse(&lines)
    }

    fn single_kind(src: &str) -> StatementKind {
        let out = parse(src);
        assert!(
            out.diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            out.diagnostics
        );
        out.statements.into_iter().next().unwrap().kind
    }

    #[test]
    fn parses_org() {
        assert_eq!(
            single_kind(".ORG 0x80000000"),
            StatementKind::Origin {
                address: 0x8000_0000
            }
        );
        assert_eq!(
            single_kind(".org 0xA000"),
            StatementKind::Origin { address: 0xA000 }
        );
    }

    #[test]
    fn parses_label_and_instruction() {
        let out = parse("start: mov d4, #1");
        let stmt = &out.statements[0];
        assert_eq!(stmt.label.as_deref(), Some("start"));
        match &stmt.kind {
            StatementKind::Instruction { mnemonic, operands } => {
                assert_eq!(mnemonic, "MOV");
                assert_eq!(operands.len(), 2);
                assert_eq!(operands[1], Operand::immediate(1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn immediate_without_hash_is_accepted() {
        match single_kind("mov d4, 1") {
            StatementKind::Instruction { operands, .. } => {
                assert_eq!(operands[1], Operand::immediate(1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn compound_operands_flow_through() {
        match single_kind("st.b [a15]2, d15") {
            StatementKind::Instruction { operands, .. } => {
                assert_eq!(operands.len(), 3);
                assert!(operands[0].as_register().is_some());
                assert_eq!(operands[1], Operand::immediate(2));
                assert!(operands[2].as_register().is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_mnemonic_is_recoverable() {
        let out = parse("frobnicate d1, d2\nmov d0, d1");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(
            out.diagnostics[0].error.kind(),
            ErrorKind::UnknownMnemonic
        );
        assert!(matches!(
            out.statements[1].kind,
            StatementKind::Instruction { .. }
        ));
    }

    #[test]
    fn equ_defines_a_constant_usable_later() {
        let out = parse("STACK EQU 0x100\n.org STACK");
        assert!(out.diagnostics.is_empty());
        assert_eq!(
            out.statements[0].kind,
            StatementKind::Equate {
                name: "STACK".to_string(),
                value: 0x100
            }
        );
        assert_eq!(
            out.statements[1].kind,
            StatementKind::Origin { address: 0x100 }
        );
    }

    #[test]
    fn equ_constant_becomes_immediate_operand() {
        let out = parse("SIZE EQU 12\nmov d4, #SIZE");
        assert!(out.diagnostics.is_empty());
        match &out.statements[1].kind {
            StatementKind::Instruction { operands, .. } => {
                assert_eq!(operands[1], Operand::immediate(12));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn data_directive_accepts_all_literal_bases() {
        match single_kind("DB 0xAB, 0o253, 0b10101011, 171, 0d171") {
            StatementKind::Data { width, values } => {
                assert_eq!(width, DataWidth::Byte);
                assert_eq!(values, vec![DataValue::Number(0xAB); 5]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn data_directive_accepts_strings_and_chars() {
        match single_kind("DB \"AB\", 'C'") {
            StatementKind::Data { values, .. } => {
                assert_eq!(
                    values,
                    vec![
                        DataValue::Bytes(vec![b'A', b'B']),
                        DataValue::Number(b'C' as i64)
                    ]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reserve_scales_by_unit() {
        assert_eq!(single_kind("RESB 4"), StatementKind::Reserve { bytes: 4 });
        assert_eq!(single_kind("RESW 4"), StatementKind::Reserve { bytes: 8 });
        assert_eq!(single_kind("RESD 2"), StatementKind::Reserve { bytes: 8 });
        assert_eq!(single_kind("RESQ 1"), StatementKind::Reserve { bytes: 8 });
    }

    #[test]
    fn times_wraps_inner_statement() {
        match single_kind("TIMES 4 DB 0") {
            StatementKind::Times { count, inner } => {
                assert_eq!(count, 4);
                assert!(matches!(*inner, StatementKind::Data { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn align_rejects_non_power_of_two() {
        let out = parse(".align 3");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].error.kind(), ErrorKind::Directive);
    }

    #[test]
    fn numeric_local_labels_are_rewritten_uniquely() {
        let out = parse("1: nop\nj 1b\n1: nop\nj 1b\nj 1f\n1: nop");
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.statements[0].label.as_deref(), Some("1@1"));
        assert_eq!(out.statements[2].label.as_deref(), Some("1@2"));
        assert_eq!(out.statements[5].label.as_deref(), Some("1@3"));
        let refs: Vec<_> = out
            .statements
            .iter()
            .filter_map(|s| match &s.kind {
                StatementKind::Instruction { mnemonic, operands } if mnemonic == "J" => {
                    match &operands[0] {
                        Operand::Symbol { name, .. } => Some(name.clone()),
                        _ => None,
                    }
                }
                _ => None,
            })
            .collect();
        assert_eq!(refs, vec!["1@1", "1@2", "1@3"]);
    }

    #[test]
    fn gcc_bare_label_defines_symbol() {
        let out = parse(".L42");
        assert_eq!(out.statements[0].label.as_deref(), Some(".L42"));
        assert!(out.statements[0].kind.is_empty());
    }

    #[test]
    fn hi_lo_in_instruction_operand() {
        match single_kind("movh d4, #HI:0x12345678") {
            StatementKind::Instruction { operands, .. } => match &operands[1] {
                Operand::Immediate { value, half } => {
                    assert_eq!(*value, 0x1234);
                    assert_eq!(*half, Some(HalfSel::Hi));
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn label_reference_with_offset() {
        match single_kind("j target+4") {
            StatementKind::Instruction { operands, .. } => {
                assert_eq!(
                    operands[0],
                    Operand::Symbol {
                        name: "target".to_string(),
                        offset: 4,
                        half: None
                    }
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sdecl_reduces_to_section() {
        assert_eq!(
            single_kind(".sdecl '.text.main', CODE"),
            StatementKind::Section {
                name: ".text.main".to_string()
            }
        );
    }

    #[test]
    fn comments_and_annotations_are_ignored() {
        let out = parse("#APP\nmov d0, d1 ; copy\n# 12 \"x.c\" 1\nret #fn");
        assert!(out.diagnostics.is_empty());
        assert!(out.statements[0].kind.is_empty());
        assert!(matches!(
            out.statements[1].kind,
            StatementKind::Instruction { .. }
        ));
        assert!(out.statements[2].kind.is_empty());
        match &out.statements[3].kind {
            StatementKind::Instruction { mnemonic, operands } => {
                assert_eq!(mnemonic, "RET");
                assert!(operands.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
