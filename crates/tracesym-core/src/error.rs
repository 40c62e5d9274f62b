//! # Error Types
//!
//! General error handling for symbol resolution.
//!
//! We use `thiserror` to automatically generate `Error` trait
//! implementations and nice error messages.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for symbol-resolution operations
///
/// This enum represents all the ways building or querying a symbol table
/// can fail.
///
/// ## Error Categories
///
/// 1. **Image errors**: BinaryNotFound, Io, Object. The binary itself
///    could not be read or parsed. Always fatal.
/// 2. **Debug-info errors**: NoDebugInfo, DebugInfo. The DWARF sections
///    are absent or undecodable. `NoDebugInfo` is recoverable at exactly
///    one place: [`SymbolTable::load`](crate::SymbolTable::load) falls
///    back to the ELF symbol table. Everywhere else it is fatal.
/// 3. **Local-recovery errors**: InvalidRangeAttribute, InvalidSymbol.
///    One DIE or one symbol is malformed; ingestion skips it and keeps
///    going.
/// 4. **Structural errors**: CyclicReference, MissingAbstractOrigin,
///    UnsupportedForm. The DIE graph itself is broken or uses features
///    this resolver does not support. Fatal, because continuing would
///    attribute trace addresses to the wrong functions.
#[derive(Error, Debug)]
pub enum SymbolError
{
    /// The binary does not exist on disk
    #[error("Binary not found: {}", .0.display())]
    BinaryNotFound(PathBuf),

    /// I/O error while reading the binary
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a parsable object file
    #[error("Failed to parse object file: {0}")]
    Object(#[from] object::read::Error),

    /// The binary carries no `.debug_info` section
    ///
    /// Ingestion cannot run without it, but the ELF symbol table can
    /// still produce a coarse function map.
    #[error("No debug information present")]
    NoDebugInfo,

    /// A DWARF primitive failed while decoding
    ///
    /// `operation` names the decoding step that hit the failure, e.g.
    /// `"reading DW_AT_low_pc"`. Every gimli call in this crate funnels
    /// through [`map_dwarf_error`] so the operation name is never lost.
    #[error("DWARF error while {operation}: {source}")]
    DebugInfo
    {
        /// The decoding step that failed
        operation: &'static str,
        /// The underlying gimli error
        source: gimli::Error,
    },

    /// A `DW_AT_ranges` attribute could not be turned into address ranges
    ///
    /// The owning DIE is skipped; ingestion continues.
    #[error("Invalid range attribute: {0}")]
    InvalidRangeAttribute(&'static str),

    /// A symbol name failed validation (empty, or an `$x`-style mapping
    /// symbol)
    ///
    /// The symbol is skipped; ingestion continues.
    #[error("Invalid symbol name: {0:?}")]
    InvalidSymbol(String),

    /// A specification / abstract-origin chain loops back on itself
    #[error("Cyclic DIE reference chain at offset 0x{0:x}")]
    CyclicReference(u64),

    /// An inlined subroutine's abstract origin names no known function
    #[error("Missing abstract origin for inlined subroutine at offset 0x{0:x}")]
    MissingAbstractOrigin(u64),

    /// A reference form this resolver does not support (e.g.
    /// `DW_FORM_ref_sup4` into a supplementary file)
    #[error("Unsupported DWARF reference form: {0}")]
    UnsupportedForm(&'static str),
}

/// Convenience type alias for `Result<T, SymbolError>`
///
/// ```rust
/// use tracesym_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, SymbolError>;

/// Attach an operation name to a gimli error.
pub(crate) fn map_dwarf_error(operation: &'static str, source: gimli::Error) -> SymbolError
{
    SymbolError::DebugInfo { operation, source }
}
