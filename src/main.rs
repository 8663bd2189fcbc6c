//! Command-line driver for the MMXI assembler.
//!
//! Reads one source file, assembles it, and writes the object file and
//! listing next to it (or wherever `-o`/`--listing` point). Warnings go to
//! stderr as `[WARNING nnn] …`; the first fatal error is reported as
//! `[ERROR nnn] …` and the process exits nonzero.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use mmxi_asm::asm::assemble;
use mmxi_asm::err::AsmErr;
use mmxi_asm::parse::{parse_program, Limits};

#[derive(Parser, Debug)]
#[command(name = "mmxi-asm", version, about = "Assembler for the MMXI educational machine")]
struct Cli {
    /// MMXI assembly source file.
    input: PathBuf,

    /// Object file path (default: `<input stem>.obj`).
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Listing file path (default: `<input stem>.lst`).
    #[arg(long)]
    listing: Option<PathBuf>,

    /// Dump the parsed program model to `<input stem>.dump`.
    #[arg(short = 'd', long)]
    dump: bool,

    /// Maximum number of source records before forced finalization.
    #[arg(short = 'm', long, default_value_t = 2000)]
    max_records: usize,

    /// Maximum number of symbols.
    #[arg(short = 's', long, default_value_t = 100)]
    max_symbols: usize,

    /// Maximum number of pooled literals.
    #[arg(short = 'l', long, default_value_t = 50)]
    max_literals: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR {:03}] {e}", e.code());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), AsmErr> {
    let src = fs::read_to_string(&cli.input)?;
    let limits = Limits {
        max_symbols: cli.max_symbols,
        max_literals: cli.max_literals,
        max_records: cli.max_records,
    };

    let out = parse_program(&src, &limits)?;
    for warning in &out.warnings {
        eprintln!("[WARNING {:03}] {warning}", warning.code());
    }

    if cli.dump {
        let path = cli.input.with_extension("dump");
        let mut dump = BufWriter::new(File::create(path)?);
        out.program.write_state_to(&mut dump)?;
        dump.flush()?;
    }

    let obj_path = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("obj"));
    let lst_path = cli
        .listing
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("lst"));

    let mut obj = BufWriter::new(File::create(obj_path)?);
    let mut lst = BufWriter::new(File::create(lst_path)?);
    assemble(&out.program, &mut obj, &mut lst)?;
    obj.flush()?;
    lst.flush()?;
    Ok(())
}
