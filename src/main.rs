// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for tcasm.

fn main() {
    // Diagnostics are printed to stderr as they arise; only the final
    // failure line is added here.
    match tcasm::assembler::run() {
        Ok(_report) => {}
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
