// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Listing and map file generation.

use std::io::{self, Write};

use crate::core::symbol_table::SymbolTable;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One listing row: the statement's address, its memory-order bytes, and
/// the original source text with comments preserved.
pub struct ListingLine<'a> {
    pub addr: Option<u32>,
    pub bytes: &'a [u8],
    pub line_num: u32,
    pub source: &'a str,
}

pub struct ListingWriter<W: Write> {
    out: W,
}

impl<W: Write> ListingWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn header(&mut self, input_name: &str) -> io::Result<()> {
        writeln!(self.out, "tcasm TriCore Assembler v{VERSION} - {input_name}")?;
        writeln!(self.out, "ADDRESS   BYTES                     LINE  SOURCE")?;
        writeln!(self.out, "--------  ------------------------  ----  ------")
    }

    pub fn write_line(&mut self, line: ListingLine<'_>) -> io::Result<()> {
        let loc = match line.addr {
            Some(addr) if !line.bytes.is_empty() => format!("{addr:08X}"),
            _ => "--------".to_string(),
        };
        let bytes_col = format_bytes(line.bytes);
        writeln!(
            self.out,
            "{:<8}  {:<24}  {:>4}  {}",
            loc, bytes_col, line.line_num, line.source
        )
    }

    pub fn footer(
        &mut self,
        symbols: &SymbolTable,
        errors: usize,
        warnings: usize,
        total_bytes: usize,
    ) -> io::Result<()> {
        writeln!(self.out, "\nErrors: {errors}  Warnings: {warnings}")?;
        writeln!(self.out, "\nSYMBOL TABLE\n")?;
        symbols.dump(&mut self.out)?;
        writeln!(self.out, "\nTotal memory is {total_bytes} bytes")
    }
}

fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map file: one line per symbol with name, address, section, and scope.
pub fn write_map<W: Write>(mut out: W, symbols: &SymbolTable) -> io::Result<()> {
    writeln!(out, "{:<24}  {:<10}  {:<16}  SCOPE", "SYMBOL", "ADDRESS", "SECTION")?;
    for symbol in symbols.iter() {
        if !symbol.is_defined {
            continue;
        }
        let scope = if symbol.is_global { "global" } else { "local" };
        let section = if symbol.is_constant {
            "(const)"
        } else {
            symbol.section.as_deref().unwrap_or("")
        };
        writeln!(
            out,
            "{:<24}  0x{:08X}  {:<16}  {}",
            symbol.name, symbol.value, section, scope
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::symbol_table::SymbolTable;

    #[test]
    fn listing_lines_show_address_and_bytes() {
        let mut out = Vec::new();
        let mut listing = ListingWriter::new(&mut out);
        listing.header("prog.asm").unwrap();
        listing
            .write_line(ListingLine {
                addr: Some(0x8000_0000),
                bytes: &[0x82, 0x14],
                line_num: 1,
                source: "    mov d4, #1 ; set flag",
            })
            .unwrap();
        listing
            .write_line(ListingLine {
                addr: None,
                bytes: &[],
                line_num: 2,
                source: "; comment only",
            })
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("80000000  82 14"));
        assert!(text.contains("; set flag"));
        assert!(text.contains("--------"));
    }

    #[test]
    fn listing_footer_includes_symbols() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("start", 0x8000_0000, Some(".text"), 1);
        let mut out = Vec::new();
        let mut listing = ListingWriter::new(&mut out);
        listing.footer(&symbols, 0, 1, 42).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("SYMBOL TABLE"));
        assert!(text.contains("start"));
        assert!(text.contains("Total memory is 42 bytes"));
    }

    #[test]
    fn map_lists_symbols_with_scope_and_section() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("local_lbl", 0x1000, Some(".text"), 1);
        let _ = symbols.define("entry", 0x2000, Some(".text"), 2);
        symbols.declare_global("entry", 2);
        let _ = symbols.define_constant("SIZE", 64, 3);
        let mut out = Vec::new();
        write_map(&mut out, &symbols).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("local_lbl"));
        assert!(text.lines().any(|l| l.contains("entry") && l.contains("global")));
        assert!(text.lines().any(|l| l.contains("SIZE") && l.contains("(const)")));
    }
}
