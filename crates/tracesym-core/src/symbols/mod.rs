//! # Symbol Resolution
//!
//! ELF/DWARF ingestion and the address-to-function table.
//!
//! The pipeline is: [`image`] reads the binary and its debug sections,
//! [`session`] materializes the DWARF units, [`ingest`] walks the DIE
//! trees into function records and folds them into symbols (resolving
//! inlined instances through their abstract origins), [`elf`] contributes
//! the symbol-table fallback, and [`table`] owns the sorted map that
//! answers queries.

use gimli::{Dwarf, EndianArcSlice, RunTimeEndian};

mod demangle;
mod elf;
mod image;
mod ingest;
mod ranges;
mod session;
mod table;

pub use table::SymbolTable;

pub(crate) type OwnedReader = EndianArcSlice<RunTimeEndian>;
pub(crate) type OwnedDwarf = Dwarf<OwnedReader>;
