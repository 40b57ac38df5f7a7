// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Assembler pipeline driver and artefact generation.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

use crate::core::config::Config;
use crate::core::encoder::SelectorOptions;
use crate::core::imagestore::{self, ImageStore};
use crate::core::linker::{LinkOutput, Linker};
use crate::core::listing::{self, ListingLine, ListingWriter};
use crate::core::parser::LineParser;
use crate::core::preprocess::Preprocessor;
use crate::core::report::{AsmError, ErrorKind, Reporter, RunError, RunReport, Severity};
use crate::core::stock::stock_table;
use crate::core::table::InstructionTable;

const LONG_ABOUT: &str = "Data-driven assembler for the TriCore TC1.6/1.8 architecture.

The instruction set is loaded from an external table (CSV or JSON); a
built-in reduced TriCore table is used when none is configured. The
assembler selects the smallest legal encoding variant for every
instruction, iterating label addresses to a fixed point, and emits raw
binary, Intel HEX, or a text dump, plus a listing and a symbol map.";

#[derive(Parser, Debug)]
#[command(
    name = "tcasm",
    version,
    about = "TriCore TC1.6/1.8 table-driven assembler",
    long_about = LONG_ABOUT
)]
struct Cli {
    /// Input assembly file.
    #[arg(value_name = "FILE")]
    input: PathBuf,
    #[arg(
        short = 'f',
        long = "format",
        value_name = "bin|hex|txt",
        default_value = "bin",
        long_help = "Output format for the final artefact."
    )]
    format: String,
    #[arg(
        short = 'o',
        long = "outfile",
        value_name = "FILE",
        long_help = "Final output file. Defaults to the input base name with the format's extension, inside the output directory."
    )]
    outfile: Option<PathBuf>,
    #[arg(
        short = 'l',
        long = "list",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "",
        long_help = "Emit a listing file. FILE is optional; when omitted, the name is derived from the input."
    )]
    list_name: Option<String>,
    #[arg(short = 'D', long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,
    #[arg(
        short = 's',
        long = "instruction-set",
        value_name = "FILE",
        long_help = "Instruction table override (.csv or .json). The built-in TriCore table is used when neither this flag nor the config provides a path."
    )]
    instruction_set: Option<PathBuf>,
    #[arg(
        short = 'm',
        long = "macro-file",
        value_name = "FILE",
        action = ArgAction::Append,
        long_help = "Additional macro-definition file for the preprocessor (repeatable)."
    )]
    macro_files: Vec<PathBuf>,
    #[arg(long = "no-macros", action = ArgAction::SetTrue)]
    no_macros: bool,
    #[arg(
        short = 'E',
        action = ArgAction::SetTrue,
        long_help = "Run only the preprocessor and write the expanded source to stdout."
    )]
    preprocess_only: bool,
    #[arg(
        long = "O32",
        action = ArgAction::SetTrue,
        long_help = "Force the 32-bit instruction variant where a choice exists."
    )]
    force_32bit: bool,
    #[arg(
        long = "Ono-implicit",
        action = ArgAction::SetTrue,
        long_help = "Disable variants that rely on an implicit A[10]/A[15] register."
    )]
    no_implicit: bool,
    #[arg(long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
    #[arg(long = "info", action = ArgAction::SetTrue)]
    info: bool,
    #[arg(long = "debug", action = ArgAction::SetTrue)]
    debug: bool,
}

pub fn run() -> Result<RunReport, RunError> {
    let cli = Cli::parse();
    run_with(cli)
}

fn run_with(cli: Cli) -> Result<RunReport, RunError> {
    let config = load_config(&cli)?;
    let threshold = if cli.debug {
        Severity::Debug
    } else if cli.verbose || cli.info {
        Severity::Info
    } else {
        Severity::Warning
    };
    let mut reporter = Reporter::new().with_threshold(threshold);

    let source = fs::read_to_string(&cli.input).map_err(|e| {
        RunError::bare(
            ErrorKind::Io,
            format!("cannot read {}: {e}", cli.input.display()),
        )
    })?;
    let source_lines: Vec<String> = source.lines().map(str::to_string).collect();
    let input_name = cli.input.display().to_string();

    // Preprocess, unless bypassed by flag or config.
    let lines = if cli.no_macros || !config.enable_macros {
        source_lines
    } else {
        let mut preprocessor = Preprocessor::new();
        for macro_file in &cli.macro_files {
            preprocessor.load_macro_file(macro_file).map_err(|e| {
                RunError::bare(ErrorKind::Preprocess, e.to_string())
            })?;
        }
        preprocessor
            .expand_source(&source_lines, &input_name)
            .map_err(|e| RunError::bare(ErrorKind::Preprocess, e.to_string()))?
    };

    if cli.preprocess_only {
        let mut stdout = std::io::stdout().lock();
        for line in &lines {
            let _ = writeln!(stdout, "{line}");
        }
        return Ok(RunReport {
            diagnostics: Vec::new(),
            lines: lines.len() as u32,
            output_files: Vec::new(),
        });
    }

    let table = load_table(&cli, &config)?;

    let base_dir = cli
        .input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let parsed = LineParser::new(&table, input_name.clone())
        .with_base_dir(base_dir)
        .parse(&lines);
    reporter.extend(parsed.diagnostics);

    let opts = SelectorOptions {
        force_32bit: cli.force_32bit,
        no_implicit: cli.no_implicit,
    };
    let link_result = Linker::new(&table)
        .with_options(opts)
        .with_endianness(config.endianness)
        .link(&parsed.statements);

    let linked = match link_result {
        Ok(output) => {
            let warnings = output.warnings.clone();
            reporter.extend(warnings);
            Some(output)
        }
        Err(diags) => {
            reporter.extend(diags);
            None
        }
    };

    // Recoverable parse errors accumulate; emission is suppressed when any
    // error exists.
    if reporter.has_errors() || linked.is_none() {
        println!("{}", reporter.summary());
        return Err(RunError::new(
            AsmError::new(ErrorKind::Cli, "assembly failed; no output written"),
            reporter.take(),
        ));
    }
    let linked = linked.expect("checked above");

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());
    fs::create_dir_all(&output_dir).map_err(|e| {
        RunError::bare(
            ErrorKind::Io,
            format!("cannot create {}: {e}", output_dir.display()),
        )
    })?;

    let mut output_files = Vec::new();
    emit_artifacts(
        &cli,
        &config,
        &linked,
        &lines,
        &input_name,
        &output_dir,
        &reporter,
        &mut output_files,
    )?;
    write_build_summary(&output_dir, &reporter, &linked, &output_files);

    println!("{}", reporter.summary());
    Ok(RunReport {
        diagnostics: reporter.take(),
        lines: lines.len() as u32,
        output_files,
    })
}

fn load_config(cli: &Cli) -> Result<Config, RunError> {
    match &cli.config {
        Some(path) => Config::load(path)
            .map_err(|e| RunError::bare(ErrorKind::Config, e.to_string())),
        None => {
            let default_path = Path::new("tcasm.json");
            if default_path.exists() {
                Config::load(default_path)
                    .map_err(|e| RunError::bare(ErrorKind::Config, e.to_string()))
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn load_table(cli: &Cli, config: &Config) -> Result<InstructionTable, RunError> {
    let path = cli
        .instruction_set
        .clone()
        .or_else(|| config.instruction_set.clone());
    match path {
        Some(path) => InstructionTable::load(&path)
            .map_err(|e| RunError::bare(ErrorKind::TableLoad, e.to_string())),
        None => {
            stock_table().map_err(|e| RunError::bare(ErrorKind::TableLoad, e.to_string()))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_artifacts(
    cli: &Cli,
    config: &Config,
    linked: &LinkOutput,
    lines: &[String],
    input_name: &str,
    output_dir: &Path,
    reporter: &Reporter,
    output_files: &mut Vec<String>,
) -> Result<(), RunError> {
    let base = input_base(&cli.input);
    let mut image = ImageStore::new();
    for chunk in &linked.emitted {
        image.store_slice(chunk.address, &chunk.bytes);
    }

    let format = cli.format.to_ascii_lowercase();
    let enabled = match format.as_str() {
        "bin" => config.generate_bin,
        "hex" => config.generate_hex,
        "txt" => true,
        other => {
            return Err(RunError::bare(
                ErrorKind::Cli,
                format!("unknown output format '{other}'"),
            ))
        }
    };

    if enabled {
        let out_path = cli
            .outfile
            .clone()
            .unwrap_or_else(|| output_dir.join(format!("{base}.{format}")));
        let mut buffer = Vec::new();
        match format.as_str() {
            "bin" => image.write_bin(&mut buffer),
            "hex" => image.write_hex(&mut buffer),
            _ => {
                let mut words: Vec<(u32, u64, u8)> = linked
                    .emitted
                    .iter()
                    .flat_map(|e| e.words.iter().copied())
                    .collect();
                words.sort_by_key(|&(addr, _, _)| addr);
                imagestore::write_txt(&mut buffer, &words)
            }
        }
        .map_err(|e| RunError::bare(ErrorKind::Io, e.to_string()))?;
        write_atomic(&out_path, &buffer)?;
        output_files.push(out_path.display().to_string());
    }

    let want_listing = cli.list_name.is_some() || config.generate_lst;
    if want_listing {
        let list_path = match cli.list_name.as_deref() {
            Some(name) if !name.is_empty() => PathBuf::from(name),
            _ => output_dir.join(format!("{base}.lst")),
        };
        let mut buffer = Vec::new();
        write_listing(&mut buffer, linked, lines, input_name, reporter)
            .map_err(|e| RunError::bare(ErrorKind::Io, e.to_string()))?;
        write_atomic(&list_path, &buffer)?;
        output_files.push(list_path.display().to_string());
    }

    if config.generate_map {
        let map_path = output_dir.join(format!("{base}.map"));
        let mut buffer = Vec::new();
        listing::write_map(&mut buffer, &linked.symbols)
            .map_err(|e| RunError::bare(ErrorKind::Io, e.to_string()))?;
        write_atomic(&map_path, &buffer)?;
        output_files.push(map_path.display().to_string());
    }

    Ok(())
}

fn write_listing<W: Write>(
    out: W,
    linked: &LinkOutput,
    lines: &[String],
    input_name: &str,
    reporter: &Reporter,
) -> std::io::Result<()> {
    let mut writer = ListingWriter::new(out);
    writer.header(input_name)?;
    let mut by_index = std::collections::HashMap::new();
    for chunk in &linked.emitted {
        by_index.insert(chunk.index, chunk);
    }
    for (idx, source) in lines.iter().enumerate() {
        let chunk = by_index.get(&idx);
        writer.write_line(ListingLine {
            addr: linked.assignments.get(idx).map(|a| a.address),
            bytes: chunk.map(|c| c.bytes.as_slice()).unwrap_or(&[]),
            line_num: idx as u32 + 1,
            source,
        })?;
    }
    let total: usize = linked.emitted.iter().map(|e| e.bytes.len()).sum();
    writer.footer(
        &linked.symbols,
        reporter.error_count(),
        reporter.warning_count(),
        total,
    )
}

/// Write through a temporary sibling and rename, so an aborted run never
/// leaves a half-written artefact.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RunError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| {
        RunError::bare(
            ErrorKind::Io,
            format!("cannot write {}: {e}", tmp.display()),
        )
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        RunError::bare(
            ErrorKind::Io,
            format!("cannot rename into {}: {e}", path.display()),
        )
    })
}

fn write_build_summary(
    output_dir: &Path,
    reporter: &Reporter,
    linked: &LinkOutput,
    output_files: &[String],
) {
    let summary = serde_json::json!({
        "errors": reporter.error_count(),
        "warnings": reporter.warning_count(),
        "fixpoint_iterations": linked.iterations,
        "sections": linked.sections.iter()
            .filter(|s| s.start != s.end)
            .map(|s| serde_json::json!({
                "name": s.name,
                "start": format!("{:#010x}", s.start),
                "end": format!("{:#010x}", s.end),
            }))
            .collect::<Vec<_>>(),
        "outputs": output_files,
    });
    let path = output_dir.join("build_summary.json");
    if let Ok(text) = serde_json::to_string_pretty(&summary) {
        let _ = fs::write(path, text);
    }
}

fn input_base(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out")
        .to_string()
}
