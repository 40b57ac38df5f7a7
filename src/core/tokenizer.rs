// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Line-level scanning: comment stripping and tolerant operand splitting.
//!
//! This is the assembler's tolerance layer. It strips `;` comments, GCC
//! `#`-annotations and `/* */` block comments, then splits operand text on
//! top-level commas and runs a second micro-pass that breaks compound
//! operands like `[a15]14` into the canonical `a15, 14` pair. The splitter
//! never cuts inside brackets or quotes and is idempotent.

use crate::core::operand::parse_register;
use crate::core::text_utils::{is_ident_char, is_ident_start, split_top_level};

/// Stateful comment stripper; the state carries open `/* … */` blocks
/// across lines.
#[derive(Debug, Default)]
pub struct CommentStripper {
    in_block: bool,
}

impl CommentStripper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove comments from one source line, returning the code part.
    pub fn strip(&mut self, line: &str) -> String {
        let mut out = String::new();
        let bytes = line.as_bytes();
        let mut idx = 0usize;
        let mut in_single = false;
        let mut in_double = false;

        while idx < bytes.len() {
            if self.in_block {
                if bytes[idx] == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    self.in_block = false;
                    idx += 2;
                } else {
                    idx += 1;
                }
                continue;
            }
            let c = bytes[idx];
            match c {
                b'\'' if !in_double => {
                    in_single = !in_single;
                    out.push(c as char);
                    idx += 1;
                }
                b'"' if !in_single => {
                    in_double = !in_double;
                    out.push(c as char);
                    idx += 1;
                }
                b'/' if !in_single && !in_double && bytes.get(idx + 1) == Some(&b'*') => {
                    self.in_block = true;
                    idx += 2;
                }
                b';' if !in_single && !in_double => {
                    // `;/*` opens a block comment; a bare `;` comments out
                    // the rest of the line.
                    if bytes.get(idx + 1) == Some(&b'/') && bytes.get(idx + 2) == Some(&b'*') {
                        self.in_block = true;
                        idx += 3;
                    } else {
                        break;
                    }
                }
                _ => {
                    out.push(c as char);
                    idx += 1;
                }
            }
        }

        let code = strip_hash_annotations(&out);
        code.trim_end().to_string()
    }

    pub fn in_block(&self) -> bool {
        self.in_block
    }
}

/// Remove GCC-style `#` annotations.
///
/// A line whose first non-blank character is `#` is an annotation line
/// (`#APP`, `#NO_APP`, `# 670 "file" 1` linemarkers) — immediates never
/// start a statement, so a leading `#` is always metadata. A trailing
/// `#name` after the operands is an annotation too; `#10` and `#HI:x` are
/// immediates and stay.
fn strip_hash_annotations(line: &str) -> String {
    if line.trim_start().starts_with('#') {
        return String::new();
    }

    // Trailing `#identifier` annotation (GCC function markers).
    if let Some(pos) = find_trailing_annotation(line) {
        line[..pos].trim_end().trim_end_matches(',').to_string()
    } else {
        line.to_string()
    }
}

fn find_trailing_annotation(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let hash = line.rfind('#')?;
    if hash == 0 {
        return None;
    }
    let after = &bytes[hash + 1..];
    if after.is_empty() || !is_ident_start(after[0]) || after[0] == b'.' {
        return None;
    }
    if !after.iter().all(|&c| is_ident_char(c)) {
        return None;
    }
    // `#HI:`/`#LO:` never match here because ':' is not an identifier char,
    // but an all-ident tail like `#function` does.
    Some(hash)
}

/// Canonicalise one register-ish token: strip `%`, collapse `a[2]` to `a2`,
/// drop memory brackets unless the register is post-increment.
fn canonical_register_text(token: &str) -> Option<String> {
    let reg = parse_register(token)?;
    if reg.post_increment {
        Some(format!("[{}{}+]", reg.bank, reg.index))
    } else if reg.deref {
        Some(format!("[{}{}]", reg.bank, reg.index))
    } else {
        Some(format!("{}{}", reg.bank, reg.index))
    }
}

/// Split an operand string into canonical operand tokens.
///
/// First pass: split on top-level commas (respecting brackets and quotes).
/// Second pass: split compound tokens of the form `[<reg>]<disp>` into
/// `<reg>, <disp>`, which yields e.g.
/// `[a15]14,d1 -> a15,14,d1` and `d15,[a5]18 -> d15,a5,18`.
pub fn split_operands(operand_str: &str) -> Vec<String> {
    let mut out = Vec::new();
    for part in split_top_level(operand_str) {
        split_compound(&part, &mut out);
    }
    out
}

fn split_compound(token: &str, out: &mut Vec<String>) {
    let token = token.trim();
    if token.is_empty() {
        return;
    }

    // `[reg]disp` compound: bracketed group followed by a bare number.
    if let Some((head, tail)) = split_bracket_group(token) {
        if !tail.is_empty() && tail.bytes().all(|c| c.is_ascii_digit()) {
            if let Some(reg) = canonical_register_text(head) {
                // Post-increment keeps its brackets; a plain base register
                // is emitted bare, per the vendor-tolerant canonical form.
                let reg = reg
                    .strip_prefix('[')
                    .and_then(|r| r.strip_suffix(']'))
                    .filter(|r| !r.ends_with('+'))
                    .map(str::to_string)
                    .unwrap_or(reg);
                out.push(reg);
                out.push(tail.to_string());
                return;
            }
        }
    }

    // Plain token: canonicalise register spellings, pass the rest through.
    match canonical_register_text(token) {
        Some(reg) => out.push(reg),
        None => out.push(token.to_string()),
    }
}

/// Split `[...]rest` into the bracketed group (brackets included) and the
/// remainder. Nested brackets are tracked.
fn split_bracket_group(token: &str) -> Option<(&str, &str)> {
    let bytes = token.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let mut depth = 0i32;
    for (idx, &c) in bytes.iter().enumerate() {
        match c {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&token[..=idx], token[idx + 1..].trim()));
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract a leading label from a code line.
///
/// Recognises `name:` anywhere a colon appears outside brackets/quotes, and
/// GCC numeric local labels `1:`. Returns `(label, rest)`.
pub fn split_label(code: &str) -> (Option<String>, String) {
    let bytes = code.as_bytes();
    let mut idx = 0usize;
    // Candidate label runs from the first non-space to a `:`.
    while idx < bytes.len() && (bytes[idx] == b' ' || bytes[idx] == b'\t') {
        idx += 1;
    }
    let start = idx;
    if idx < bytes.len() && (is_ident_start(bytes[idx]) || bytes[idx].is_ascii_digit()) {
        idx += 1;
        while idx < bytes.len() && is_ident_char(bytes[idx]) {
            idx += 1;
        }
        if idx < bytes.len() && bytes[idx] == b':' && bytes.get(idx + 1) != Some(&b':') {
            let label = code[start..idx].to_string();
            let rest = code[idx + 1..].trim().to_string();
            return (Some(label), rest);
        }
    }
    (None, code.trim().to_string())
}

/// Split a statement body into mnemonic and operand text.
pub fn split_mnemonic(code: &str) -> Option<(String, String)> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return None;
    }
    let end = trimmed
        .bytes()
        .position(|c| c == b' ' || c == b'\t')
        .unwrap_or(trimmed.len());
    let mnemonic = trimmed[..end].to_string();
    let operands = trimmed[end..].trim().to_string();
    Some((mnemonic, operands))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_semicolon_comments() {
        let mut cs = CommentStripper::new();
        assert_eq!(cs.strip("mov d4, d1 ; copy"), "mov d4, d1");
        assert_eq!(cs.strip("; whole line"), "");
    }

    #[test]
    fn strips_block_comments_across_lines() {
        let mut cs = CommentStripper::new();
        assert_eq!(cs.strip("mov d0, d1 /* start"), "mov d0, d1");
        assert!(cs.in_block());
        assert_eq!(cs.strip("still inside"), "");
        assert_eq!(cs.strip("end */ mov d2, d3"), " mov d2, d3");
        assert!(!cs.in_block());
    }

    #[test]
    fn strips_semicolon_block_comments() {
        let mut cs = CommentStripper::new();
        assert_eq!(cs.strip("nop ;/* note"), "nop");
        assert!(cs.in_block());
        assert_eq!(cs.strip("done */ ret"), " ret");
    }

    #[test]
    fn leading_hash_is_annotation() {
        let mut cs = CommentStripper::new();
        assert_eq!(cs.strip("#APP"), "");
        assert_eq!(cs.strip("# 670 \"file.c\" 1"), "");
        assert_eq!(cs.strip("#NO_APP"), "");
    }

    #[test]
    fn trailing_hash_annotation_is_stripped_but_immediates_stay() {
        let mut cs = CommentStripper::new();
        assert_eq!(cs.strip("ret #my_function"), "ret");
        assert_eq!(cs.strip("mov d4, #1"), "mov d4, #1");
        assert_eq!(cs.strip("movh d4, #HI:sym"), "movh d4, #HI:sym");
    }

    #[test]
    fn compound_split_vectors() {
        assert_eq!(split_operands("[a15]14,d1"), vec!["a15", "14", "d1"]);
        assert_eq!(split_operands("d15,[a5]18"), vec!["d15", "a5", "18"]);
        assert_eq!(split_operands("[a15]2,d15"), vec!["a15", "2", "d15"]);
        assert_eq!(split_operands("d15,[a2]6"), vec!["d15", "a2", "6"]);
    }

    #[test]
    fn compound_split_is_idempotent() {
        let once = split_operands("[a15]14,d1");
        let again = split_operands(&once.join(","));
        assert_eq!(once, again);
    }

    #[test]
    fn post_increment_keeps_brackets() {
        assert_eq!(split_operands("[%a2+]1"), vec!["[a2+]", "1"]);
        assert_eq!(split_operands("[a0+]"), vec!["[a0+]"]);
    }

    #[test]
    fn never_splits_inside_quotes() {
        assert_eq!(
            split_operands("\"[a15]14,d1\""),
            vec!["\"[a15]14,d1\"".to_string()]
        );
    }

    #[test]
    fn register_spellings_canonicalise() {
        assert_eq!(split_operands("D[4],%d1"), vec!["d4", "d1"]);
        assert_eq!(split_operands("[A[2]]"), vec!["[a2]"]);
    }

    #[test]
    fn label_splitting() {
        assert_eq!(
            split_label("loop: mov d0, d1"),
            (Some("loop".to_string()), "mov d0, d1".to_string())
        );
        assert_eq!(
            split_label(".L1:"),
            (Some(".L1".to_string()), String::new())
        );
        assert_eq!(split_label("1:"), (Some("1".to_string()), String::new()));
        assert_eq!(split_label("mov d0, d1"), (None, "mov d0, d1".to_string()));
    }

    #[test]
    fn mnemonic_splitting() {
        assert_eq!(
            split_mnemonic("mov d4, #1"),
            Some(("mov".to_string(), "d4, #1".to_string()))
        );
        assert_eq!(split_mnemonic("ret"), Some(("ret".to_string(), String::new())));
        assert_eq!(split_mnemonic("   "), None);
    }
}
