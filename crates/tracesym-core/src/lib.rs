//! # tracesym-core
//!
//! Debug-info ingestion and symbol resolution for execution traces.
//!
//! This crate maps instruction addresses recorded by a CPU tracer back to
//! the source-level functions that own them, including functions that the
//! compiler inlined away:
//! - ELF/DWARF parsing (via `object` and `gimli`)
//! - Two-pass DWARF ingestion (concrete subprograms, then inlined
//!   subroutine instances resolved through their abstract origins)
//! - An ordered symbol table whose lookup prefers the innermost (inlined)
//!   function covering an address
//! - An unconditional ELF symbol-table fallback for binaries with little
//!   or no debug information
//!
//! ## Example
//!
//! ```no_run
//! use tracesym_core::SymbolTable;
//!
//! # fn example() -> tracesym_core::Result<()> {
//! let table = SymbolTable::load("/usr/bin/ls")?;
//! if let Some(symbol) = table.find_function(0x4010a0) {
//!     println!("{}{}", symbol.name(), if symbol.is_inlined() { " (inlined)" } else { "" });
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod symbols;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SymbolError};
pub use symbols::SymbolTable;
pub use types::{AddressRange, Symbol, SymbolLanguage, SymbolName};
