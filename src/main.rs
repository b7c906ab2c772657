use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use formula_sheet::{cell_id, Error, Store};
use serde::Serialize;

#[derive(Parser)]
#[command(about = "Evaluate spreadsheet formulas kept in a JSON file.")]
struct Args {
    /// File holding the sheet's formulas. Created on first write.
    #[arg(long, short, default_value = "sheet.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clear the spreadsheet.
    Clear,
    /// Copy the formula in SRC to DEST, adjusting relative references.
    Copy {
        #[arg(value_parser = cell_id)]
        dest: String,
        #[arg(value_parser = cell_id)]
        src: String,
    },
    /// Delete the formula in CELL.
    Delete {
        #[arg(value_parser = cell_id)]
        cell: String,
    },
    /// Print every formula in dependency order.
    Dump,
    /// Set CELL to FORMULA and print every value that changed.
    Eval {
        #[arg(value_parser = cell_id)]
        cell: String,
        #[arg(allow_hyphen_values = true)]
        formula: String,
    },
    /// Load a previously dumped FILE into the spreadsheet.
    Load { file: PathBuf },
    /// Print the formula and current value of CELL.
    Query {
        #[arg(value_parser = cell_id)]
        cell: String,
    },
}

fn main() -> ExitCode {
    // run with `RUST_LOG=formula_sheet=debug` to see each operation
    env_logger::init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {err}", err.code());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Error> {
    let mut store = Store::open(&args.store)?;
    match args.command {
        Command::Clear => store.clear()?,
        Command::Copy { dest, src } => print_json(&store.copy(&dest, &src)?)?,
        Command::Delete { cell } => print_json(&store.delete(&cell)?)?,
        Command::Dump => print_json(&store.dump())?,
        Command::Eval { cell, formula } => print_json(&store.edit(&cell, &formula)?)?,
        Command::Load { file } => print_json(&store.load(&file)?)?,
        Command::Query { cell } => print_json(&store.query(&cell))?,
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
