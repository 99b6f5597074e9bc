//! Kiln text chunking utility.
//!
//! Independent of the execution server: given a file path and a mode, it
//! emits a structured JSON description to stdout: a context assessment, a
//! size-bounded chunk list with boundary snapping, or a boundary list.

mod scan;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;

use scan::{DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};

#[derive(Parser, Debug)]
#[command(name = "kiln-chunk")]
#[command(about = "Text chunking utility for size-bounded context decomposition")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a context assessment as JSON
    Info { file: PathBuf },

    /// Chunk the file into pieces, breaking at natural boundaries
    Chunk {
        file: PathBuf,

        /// Target chunk size in characters
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        size: usize,

        /// Overlap between chunks in characters
        #[arg(long, default_value_t = DEFAULT_OVERLAP)]
        overlap: usize,
    },

    /// Detect natural boundaries in the file
    Boundaries { file: PathBuf },
}

impl Command {
    fn file(&self) -> &Path {
        match self {
            Command::Info { file }
            | Command::Chunk { file, .. }
            | Command::Boundaries { file } => file,
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    let file = args.command.file();
    if !file.is_file() {
        eprintln!("Error: {} is not a file", file.display());
        return ExitCode::FAILURE;
    }

    match run(&args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Command) -> Result<()> {
    match command {
        Command::Info { file } => emit(&scan::assess(file)?),
        Command::Chunk {
            file,
            size,
            overlap,
        } => {
            let content = scan::read_text(file)?;
            emit(&scan::chunk(&content, *size, *overlap))
        }
        Command::Boundaries { file } => {
            let content = scan::read_text(file)?;
            emit(&scan::boundaries(&content))
        }
    }
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
