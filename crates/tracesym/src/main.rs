use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracesym_core::SymbolTable;
use tracesym_utils::{info, init_logging};

/// Map instruction addresses from execution traces to function names.
#[derive(Parser, Debug)]
#[command(name = "tracesym")]
#[command(version)]
#[command(about = "Map instruction addresses from execution traces to function names", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Resolve one or more addresses against a binary
    Resolve
    {
        /// Path to the traced binary
        binary: PathBuf,
        /// Addresses to resolve (hex format: 0x1000 or decimal)
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Resolve every address in a trace file
    ///
    /// The file carries one record per line: an address, optionally
    /// followed by whitespace and further fields (opcode bytes, counts)
    /// which are not used for resolution but echoed in the output. Empty
    /// lines and lines starting with '#' are skipped.
    Trace
    {
        /// Path to the traced binary
        binary: PathBuf,
        /// Path to the trace file
        file: PathBuf,
    },
}

fn main()
{
    // Initialize logging (reads from RUST_LOG env var)
    // Defaults to INFO level and Pretty format if not set
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let cli = Cli::parse();

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> Result<(), Box<dyn std::error::Error>>
{
    match cli.command {
        Commands::Resolve { binary, addresses } => {
            let table = load_table(&binary)?;
            for address in &addresses {
                let pc = parse_address(address)?;
                print_resolution(&table, pc);
            }
            Ok(())
        }
        Commands::Trace { binary, file } => {
            let table = load_table(&binary)?;
            let contents = fs::read_to_string(&file)?;

            for line in contents.lines() {
                let Some((address, trailer)) = split_trace_line(line) else {
                    continue;
                };
                let pc = parse_address(address)?;
                match table.find_function(pc) {
                    Some(symbol) => println!("{:#018x}  {}{}", pc, format_trailer(trailer), symbol),
                    None => println!("{:#018x}  {}??", pc, format_trailer(trailer)),
                }
            }
            Ok(())
        }
    }
}

fn load_table(binary: &PathBuf) -> Result<SymbolTable, Box<dyn std::error::Error>>
{
    info!("loading symbols from {}", binary.display());
    let table = SymbolTable::load(binary)?;
    info!("loaded {} symbol table entries", table.len());
    Ok(table)
}

/// Split a trace line into its leading address field and the rest
///
/// The trailing fields (opcode bytes, hit counts) are not used for
/// resolution but are echoed in the output. Returns `None` for empty
/// lines and `#` comments.
fn split_trace_line(line: &str) -> Option<(&str, &str)>
{
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((address, trailer)) => Some((address, trailer.trim())),
        None => Some((line, "")),
    }
}

fn format_trailer(trailer: &str) -> String
{
    if trailer.is_empty() {
        String::new()
    } else {
        format!("{trailer}  ")
    }
}

fn parse_address(s: &str) -> Result<u64, Box<dyn std::error::Error>>
{
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse::<u64>()
    };
    parsed.map_err(|_| format!("invalid address: {s}").into())
}

fn print_resolution(table: &SymbolTable, pc: u64)
{
    match table.find_function(pc) {
        Some(symbol) => println!("{:#018x}  {}", pc, symbol),
        None => println!("{:#018x}  ??", pc),
    }
}
