// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! C-like macro preprocessor.
//!
//! Runs ahead of the parser and delivers a pre-expanded line stream:
//! `#define` object- and function-like macros, `|` as a line break inside
//! expansions, `##` token pasting (pasted tokens are sanitised to legal
//! identifier characters), and `__COUNTER__` yielding a fresh integer per
//! macro invocation. The counter is explicit state on the preprocessor, not
//! a global. Expansion depth is bounded; exceeding it is an error.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::core::text_utils::{is_ident_char, is_ident_start};

const MAX_EXPANSION_DEPTH: u32 = 10;

#[derive(Debug)]
pub struct PreprocessError {
    pub message: String,
    pub line: Option<u32>,
    pub file: Option<String>,
}

impl PreprocessError {
    fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            line: None,
            file: None,
        }
    }

    fn at(mut self, line: u32, file: &str) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
            self.file = Some(file.to_string());
        }
        self
    }
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{file}:{line}: {}", self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for PreprocessError {}

#[derive(Debug, Clone)]
struct MacroDef {
    /// `None` for object-like macros.
    params: Option<Vec<String>>,
    body: String,
}

#[derive(Debug, Default)]
pub struct Preprocessor {
    macros: HashMap<String, MacroDef>,
    counter: u32,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn macro_count(&self) -> usize {
        self.macros.len()
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// `-D NAME[=VAL]` command-line definition; VAL defaults to 1.
    pub fn define_from_cli(&mut self, spec: &str) {
        let (name, value) = match spec.split_once('=') {
            Some((n, v)) => (n.trim(), v.trim().to_string()),
            None => (spec.trim(), "1".to_string()),
        };
        self.macros.insert(
            name.to_string(),
            MacroDef {
                params: None,
                body: value,
            },
        );
    }

    /// Collect `#define`s from a macro library file; other lines are
    /// ignored.
    pub fn load_macro_file(&mut self, path: &Path) -> Result<(), PreprocessError> {
        let text = fs::read_to_string(path).map_err(|e| {
            PreprocessError::new(format!("cannot read macro file {}: {e}", path.display()))
        })?;
        for (idx, line) in text.lines().enumerate() {
            if line.trim_start().starts_with("#define") {
                self.parse_define(line)
                    .map_err(|e| e.at(idx as u32 + 1, &path.display().to_string()))?;
            }
        }
        Ok(())
    }

    /// Expand a source into its line stream. `#define` lines are consumed
    /// in place; an expansion containing `|` contributes several lines.
    pub fn expand_source(
        &mut self,
        lines: &[String],
        file: &str,
    ) -> Result<Vec<String>, PreprocessError> {
        let mut out = Vec::with_capacity(lines.len());
        for (idx, line) in lines.iter().enumerate() {
            let line_num = idx as u32 + 1;
            if line.trim_start().starts_with("#define") {
                self.parse_define(line).map_err(|e| e.at(line_num, file))?;
                out.push(String::new());
                continue;
            }
            let expanded = self
                .expand_line(line, 0)
                .map_err(|e| e.at(line_num, file))?;
            out.extend(expanded);
        }
        Ok(out)
    }

    fn parse_define(&mut self, line: &str) -> Result<(), PreprocessError> {
        let rest = line
            .trim_start()
            .strip_prefix("#define")
            .ok_or_else(|| PreprocessError::new("not a #define"))?
            .trim_start();
        let name_end = rest
            .bytes()
            .position(|c| !is_ident_char(c))
            .unwrap_or(rest.len());
        if name_end == 0 {
            return Err(PreprocessError::new("missing macro name in #define"));
        }
        let name = &rest[..name_end];
        let after = &rest[name_end..];

        // A '(' glued to the name makes a function-like macro.
        if let Some(arg_text) = after.strip_prefix('(') {
            let close = arg_text
                .find(')')
                .ok_or_else(|| PreprocessError::new("unterminated parameter list"))?;
            let params: Vec<String> = arg_text[..close]
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            let body = arg_text[close + 1..].trim().to_string();
            self.macros.insert(
                name.to_string(),
                MacroDef {
                    params: Some(params),
                    body,
                },
            );
        } else {
            self.macros.insert(
                name.to_string(),
                MacroDef {
                    params: None,
                    body: after.trim().to_string(),
                },
            );
        }
        Ok(())
    }

    /// Expand the first macro invocation found in the line and recurse on
    /// the result until no invocation remains.
    fn expand_line(&mut self, line: &str, depth: u32) -> Result<Vec<String>, PreprocessError> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(PreprocessError::new(format!(
                "macro expansion deeper than {MAX_EXPANSION_DEPTH} levels"
            )));
        }

        let Some((start, end, name)) = self.find_invocation(line) else {
            return Ok(split_pipes(line));
        };

        let def = self.macros.get(&name).cloned().expect("known macro");
        let (replacement, consumed_end) = match def.params {
            None => (def.body.clone(), end),
            Some(ref params) => {
                let (args, args_end) = parse_arguments(line, end)
                    .ok_or_else(|| {
                        PreprocessError::new(format!("malformed arguments for macro '{name}'"))
                    })?;
                if args.len() != params.len() {
                    return Err(PreprocessError::new(format!(
                        "macro '{name}' expects {} argument(s), got {}",
                        params.len(),
                        args.len()
                    )));
                }
                (substitute_params(&def.body, params, &args), args_end)
            }
        };

        // One counter value per invocation: every __COUNTER__ inside this
        // expansion sees the same number.
        let replacement = if replacement.contains("__COUNTER__") {
            let value = self.counter;
            self.counter += 1;
            replacement.replace("__COUNTER__", &value.to_string())
        } else {
            replacement
        };
        let replacement = paste_tokens(&replacement);

        let mut expanded = String::new();
        expanded.push_str(&line[..start]);
        expanded.push_str(&replacement);
        expanded.push_str(&line[consumed_end..]);
        self.expand_line(&expanded, depth + 1)
    }

    /// Find the first known-macro identifier outside quotes.
    /// Returns `(start, end, name)` with `end` just past the identifier.
    fn find_invocation(&self, line: &str) -> Option<(usize, usize, String)> {
        let bytes = line.as_bytes();
        let mut idx = 0usize;
        let mut in_single = false;
        let mut in_double = false;
        while idx < bytes.len() {
            let c = bytes[idx];
            match c {
                b'\'' if !in_double => in_single = !in_single,
                b'"' if !in_single => in_double = !in_double,
                _ if !in_single && !in_double && is_ident_start(c) => {
                    let start = idx;
                    let mut end = idx + 1;
                    while end < bytes.len() && is_ident_char(bytes[end]) {
                        end += 1;
                    }
                    let name = &line[start..end];
                    if self.macros.contains_key(name) {
                        return Some((start, end, name.to_string()));
                    }
                    idx = end;
                    continue;
                }
                _ => {}
            }
            idx += 1;
        }
        None
    }
}

/// Parse `(arg, arg, …)` starting at `open` (index of the byte after the
/// macro name). Commas inside nested parens, brackets, or quotes do not
/// split. Returns the arguments and the index just past the `)`.
fn parse_arguments(line: &str, open: usize) -> Option<(Vec<String>, usize)> {
    let bytes = line.as_bytes();
    let mut idx = open;
    while idx < bytes.len() && (bytes[idx] == b' ' || bytes[idx] == b'\t') {
        idx += 1;
    }
    if bytes.get(idx) != Some(&b'(') {
        return None;
    }
    idx += 1;
    let mut args = Vec::new();
    let mut buf = String::new();
    let mut depth = 1i32;
    let mut in_single = false;
    let mut in_double = false;
    while idx < bytes.len() {
        let c = bytes[idx];
        match c {
            b'\'' if !in_double => {
                in_single = !in_single;
                buf.push(c as char);
            }
            b'"' if !in_single => {
                in_double = !in_double;
                buf.push(c as char);
            }
            b'(' | b'[' if !in_single && !in_double => {
                depth += 1;
                buf.push(c as char);
            }
            b')' if !in_single && !in_double => {
                depth -= 1;
                if depth == 0 {
                    let trimmed = buf.trim();
                    if !trimmed.is_empty() || !args.is_empty() {
                        args.push(trimmed.to_string());
                    }
                    return Some((args, idx + 1));
                }
                buf.push(c as char);
            }
            b']' if !in_single && !in_double => {
                depth -= 1;
                buf.push(c as char);
            }
            b',' if depth == 1 && !in_single && !in_double => {
                args.push(buf.trim().to_string());
                buf.clear();
            }
            _ => buf.push(c as char),
        }
        idx += 1;
    }
    None
}

/// Token-wise parameter substitution: only whole identifiers are replaced.
fn substitute_params(body: &str, params: &[String], args: &[String]) -> String {
    let bytes = body.as_bytes();
    let mut out = String::new();
    let mut idx = 0usize;
    let mut in_single = false;
    let mut in_double = false;
    while idx < bytes.len() {
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
            _ if !in_single && !in_double && is_ident_start(c) => {
                let start = idx;
                let mut end = idx + 1;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                let token = &body[start..end];
                match params.iter().position(|p| p == token) {
                    Some(pos) => out.push_str(&args[pos]),
                    None => out.push_str(token),
                }
                idx = end;
            }
            _ => {
                out.push(c as char);
                idx += 1;
            }
        }
    }
    out
}

/// Apply `##` token pasting. The pasted token is sanitised so that
/// arguments containing `#`, `-`, and similar still form a legal label.
fn paste_tokens(text: &str) -> String {
    if !text.contains("##") {
        return text.to_string();
    }
    let segments: Vec<&str> = text.split("##").collect();
    let last = segments.len() - 1;
    let mut out = String::new();
    for (idx, raw) in segments.into_iter().enumerate() {
        // Whitespace around each `##` is consumed by the paste.
        let segment = match idx {
            0 => raw.trim_end(),
            i if i == last => raw.trim_start(),
            _ => raw.trim(),
        };
        if idx == 0 {
            out.push_str(segment);
            continue;
        }
        // Sanitise the tail of the left token and the head of the right one.
        let boundary = out
            .rfind(|c: char| c.is_whitespace() || c == ',' || c == ':')
            .map(|p| p + 1)
            .unwrap_or(0);
        let left_tail = sanitize_ident(&out[boundary..]);
        out.truncate(boundary);
        out.push_str(&left_tail);
        let head_end = segment
            .bytes()
            .position(|c| c.is_ascii_whitespace() || c == b',' || c == b':')
            .unwrap_or(segment.len());
        out.push_str(&sanitize_ident(&segment[..head_end]));
        out.push_str(&segment[head_end..]);
    }
    out
}

fn sanitize_ident(token: &str) -> String {
    token
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn split_pipes(line: &str) -> Vec<String> {
    if !line.contains('|') {
        return vec![line.to_string()];
    }
    let bytes = line.as_bytes();
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut in_single = false;
    let mut in_double = false;
    for &c in bytes {
        match c {
            b'\'' if !in_double => {
                in_single = !in_single;
                buf.push(c as char);
            }
            b'"' if !in_single => {
                in_double = !in_double;
                buf.push(c as char);
            }
            b'|' if !in_single && !in_double => {
                parts.push(buf.trim().to_string());
                buf.clear();
            }
            _ => buf.push(c as char),
        }
    }
    parts.push(buf.trim().to_string());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(pp: &mut Preprocessor, src: &str) -> Vec<String> {
        let lines: Vec<String> = src.lines().map(str::to_string).collect();
        pp.expand_source(&lines, "test.asm").unwrap()
    }

    #[test]
    fn object_macro_expands() {
        let mut pp = Preprocessor::new();
        let out = expand(&mut pp, "#define LIMIT 0x40\nmov d4, #LIMIT");
        assert_eq!(out, vec!["".to_string(), "mov d4, #0x40".to_string()]);
    }

    #[test]
    fn function_macro_substitutes_arguments() {
        let mut pp = Preprocessor::new();
        let out = expand(
            &mut pp,
            "#define SET(reg, val) mov reg, #val\nSET(d4, 7)",
        );
        assert_eq!(out[1], "mov d4, #7");
    }

    #[test]
    fn pipe_breaks_expansion_into_lines() {
        let mut pp = Preprocessor::new();
        let out = expand(
            &mut pp,
            "#define TWO(a, b) mov d0, #a | mov d1, #b\nTWO(1, 2)",
        );
        assert_eq!(out[1], "mov d0, #1");
        assert_eq!(out[2], "mov d1, #2");
    }

    #[test]
    fn counter_is_fresh_per_invocation_and_shared_within() {
        let mut pp = Preprocessor::new();
        let out = expand(
            &mut pp,
            "#define L() lbl_ ## __COUNTER__: nop | j lbl_ ## __COUNTER__\nL()\nL()",
        );
        // Both uses inside one invocation see the same number.
        assert_eq!(out[1], "lbl_0: nop");
        assert_eq!(out[2], "j lbl_0");
        assert_eq!(out[3], "lbl_1: nop");
        assert_eq!(out[4], "j lbl_1");
        assert_eq!(pp.counter(), 2);
    }

    #[test]
    fn token_pasting_sanitises_illegal_characters() {
        let mut pp = Preprocessor::new();
        let out = expand(
            &mut pp,
            "#define TAG(reg, val) chk_ ## reg ## _ ## val: nop\nTAG(d4, #-1)",
        );
        assert_eq!(out[1], "chk_d4___1: nop");
    }

    #[test]
    fn quoted_fragments_do_not_split_arguments() {
        let mut pp = Preprocessor::new();
        let out = expand(
            &mut pp,
            "#define EMIT(code) code\nEMIT('mov d0, d1')",
        );
        assert_eq!(out[1], "'mov d0, d1'");
    }

    #[test]
    fn nested_expansion_works() {
        let mut pp = Preprocessor::new();
        let out = expand(
            &mut pp,
            "#define ONE 1\n#define PLUS_ONE #ONE\nmov d4, PLUS_ONE",
        );
        assert_eq!(out[2], "mov d4, #1");
    }

    #[test]
    fn recursion_beyond_depth_limit_fails() {
        let mut pp = Preprocessor::new();
        let lines = vec![
            "#define A B".to_string(),
            "#define B A".to_string(),
            "A".to_string(),
        ];
        let err = pp.expand_source(&lines, "test.asm").unwrap_err();
        assert!(err.message.contains("deeper than"));
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let mut pp = Preprocessor::new();
        let lines = vec![
            "#define SET(reg, val) mov reg, #val".to_string(),
            "SET(d4)".to_string(),
        ];
        let err = pp.expand_source(&lines, "test.asm").unwrap_err();
        assert!(err.message.contains("expects 2"));
    }

    #[test]
    fn cli_defines_default_to_one() {
        let mut pp = Preprocessor::new();
        pp.define_from_cli("DEBUG");
        pp.define_from_cli("LEVEL=3");
        let out = expand(&mut pp, "db DEBUG, LEVEL");
        assert_eq!(out[0], "db 1, 3");
    }

    #[test]
    fn macro_file_collects_defines_only() {
        use std::io::Write;
        let dir = std::env::temp_dir();
        let path = dir.join("tcasm_pp_test_macros.inc");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "; library").unwrap();
        writeln!(f, "#define MAGIC 42").unwrap();
        drop(f);
        let mut pp = Preprocessor::new();
        pp.load_macro_file(&path).unwrap();
        assert_eq!(pp.macro_count(), 1);
        let out = expand(&mut pp, "db MAGIC");
        assert_eq!(out[0], "db 42");
        let _ = std::fs::remove_file(&path);
    }
}
