// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error kinds, diagnostics, and run reporting for the assembler.

use std::fmt;

/// Categories of assembler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    NumericLiteral,
    UnknownMnemonic,
    InvalidOperand,
    OperandOutOfRange,
    DuplicateSymbol,
    UnresolvedSymbol,
    AddressOverlap,
    Directive,
    TableLoad,
    Config,
    Preprocess,
    Cli,
    Io,
}

impl ErrorKind {
    /// Bracketed tag appended to diagnostic lines.
    pub fn tag(self) -> &'static str {
        match self {
            ErrorKind::Lex => "LEX_ERROR",
            ErrorKind::NumericLiteral => "NUMERIC_LITERAL_ERROR",
            ErrorKind::UnknownMnemonic => "UNKNOWN_MNEMONIC",
            ErrorKind::InvalidOperand => "INVALID_OPERAND",
            ErrorKind::OperandOutOfRange => "OPERAND_OUT_OF_RANGE",
            ErrorKind::DuplicateSymbol => "DUPLICATE_SYMBOL",
            ErrorKind::UnresolvedSymbol => "UNRESOLVED_SYMBOL",
            ErrorKind::AddressOverlap => "ADDRESS_OVERLAP",
            ErrorKind::Directive => "DIRECTIVE_ERROR",
            ErrorKind::TableLoad => "TABLE_LOAD_ERROR",
            ErrorKind::Config => "CONFIG_ERROR",
            ErrorKind::Preprocess => "PREPROCESS_ERROR",
            ErrorKind::Cli => "CLI_ERROR",
            ErrorKind::Io => "IO_ERROR",
        }
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// An assembler error with a kind and message.
#[derive(Debug, Clone)]
pub struct AsmError {
    kind: ErrorKind,
    message: String,
}

impl AsmError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.message, self.kind.tag())
    }
}

impl std::error::Error for AsmError {}

/// Source position attached to a diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: Option<usize>,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column: None,
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

/// A diagnostic message with location and severity.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub location: SourceLocation,
    pub severity: Severity,
    pub error: AsmError,
}

impl Diagnostic {
    pub fn new(location: SourceLocation, severity: Severity, error: AsmError) -> Self {
        Self {
            location,
            severity,
            error,
        }
    }

    pub fn error_at(location: SourceLocation, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self::new(location, Severity::Error, AsmError::new(kind, msg))
    }

    pub fn warning_at(location: SourceLocation, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self::new(location, Severity::Warning, AsmError::new(kind, msg))
    }

    /// `<file>:<line>:<col>: <level>: <message> [<KIND>]`
    pub fn format(&self) -> String {
        let col = self.location.column.unwrap_or(1);
        format!(
            "{}:{}:{}: {}: {} [{}]",
            self.location.file,
            self.location.line,
            col,
            self.severity.label(),
            self.error.message(),
            self.error.kind().tag()
        )
    }
}

/// Accumulator for the diagnostics of a run.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
    threshold: Severity,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Warning
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
            threshold: Severity::Warning,
        }
    }

    /// Minimum severity echoed to stderr as diagnostics arrive.
    pub fn with_threshold(mut self, threshold: Severity) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    pub fn push(&mut self, diag: Diagnostic) {
        if diag.severity >= self.threshold {
            eprintln!("{}", diag.format());
        }
        self.diagnostics.push(diag);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn extend(&mut self, diags: impl IntoIterator<Item = Diagnostic>) {
        for diag in diags {
            self.push(diag);
        }
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// One-line end-of-run summary for stdout.
    pub fn summary(&self) -> String {
        format!(
            "Errors: {}  Warnings: {}  Info: {}  Debug: {}",
            self.count(Severity::Error),
            self.count(Severity::Warning),
            self.count(Severity::Info),
            self.count(Severity::Debug)
        )
    }
}

/// Report from a finished assembly run.
#[derive(Debug)]
pub struct RunReport {
    pub diagnostics: Vec<Diagnostic>,
    pub lines: u32,
    pub output_files: Vec<String>,
}

/// Error from a failed assembly run.
#[derive(Debug)]
pub struct RunError {
    pub error: AsmError,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunError {
    pub fn new(error: AsmError, diagnostics: Vec<Diagnostic>) -> Self {
        Self { error, diagnostics }
    }

    pub fn bare(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            error: AsmError::new(kind, msg),
            diagnostics: Vec::new(),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for RunError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_format_has_location_and_tag() {
        let loc = SourceLocation::new("prog.asm", 12).with_column(5);
        let diag = Diagnostic::error_at(loc, ErrorKind::UnknownMnemonic, "Unknown mnemonic FOO");
        assert_eq!(
            diag.format(),
            "prog.asm:12:5: error: Unknown mnemonic FOO [UNKNOWN_MNEMONIC]"
        );
    }

    #[test]
    fn reporter_counts_by_severity() {
        let mut reporter = Reporter::new();
        let loc = SourceLocation::new("a.asm", 1);
        reporter.push(Diagnostic::error_at(
            loc.clone(),
            ErrorKind::Lex,
            "bad char",
        ));
        reporter.push(Diagnostic::warning_at(loc, ErrorKind::Directive, "odd"));
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(reporter.warning_count(), 1);
        assert!(reporter.has_errors());
    }
}
