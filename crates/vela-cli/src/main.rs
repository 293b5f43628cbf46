// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

//! Thin runner/REPL binary for the Vela VM. Given a file, compiles and
//! runs it to completion; given nothing, starts an interactive session
//! (SPEC_FULL.md §2 "REPL").

mod error;
mod repl;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vela_heap::GcConfig;

/// Vela: register-bytecode virtual machine.
#[derive(Parser)]
#[command(name = "vela", version, about)]
struct Cli {
    /// Script to run; omit to start the REPL.
    file: Option<PathBuf>,

    /// Run the background-concurrent collector instead of stop-the-world.
    #[arg(long)]
    gc_background: bool,

    /// Collect on every allocation (for diagnosing GC bugs, not for normal use).
    #[arg(long)]
    gc_stress: bool,
}

impl Cli {
    fn gc_config(&self) -> GcConfig {
        GcConfig { background: self.gc_background, stress: self.gc_stress, ..GcConfig::default() }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let gc_config = cli.gc_config();

    let result = match &cli.file {
        Some(path) => runner::run_file(path, gc_config).map_err(|err| err.to_string()),
        None => repl::run(gc_config).map_err(|err| err.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
