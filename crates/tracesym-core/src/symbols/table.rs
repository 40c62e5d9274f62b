//! The address-to-function table.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::symbols::image::BinaryImage;
use crate::symbols::session::DebugSession;
use crate::symbols::{elf, ingest};
use crate::types::{AddressRange, Symbol};

/// Ordered multi-map from address ranges to function symbols
///
/// Entries are sorted by the containment-aware range order, so a range
/// nested inside another (an inlined instance inside its caller) sorts
/// immediately before its container. A symbol with several ranges
/// contributes one entry per range, all sharing one `Arc`. On equal
/// ranges, DWARF-derived entries precede ELF-derived ones, so DWARF wins
/// ties.
///
/// ## Example
///
/// ```no_run
/// use tracesym_core::SymbolTable;
///
/// # fn example() -> tracesym_core::Result<()> {
/// let table = SymbolTable::load("/usr/bin/ls")?;
/// match table.find_function(0x4010a0) {
///     Some(symbol) => println!("0x4010a0 is in {symbol}"),
///     None => println!("0x4010a0 is not in any known function"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SymbolTable
{
    entries: Vec<(AddressRange, Arc<Symbol>)>,
}

impl SymbolTable
{
    /// Build the table for a binary on disk
    ///
    /// Ingests DWARF when `.debug_info` is present, then unconditionally
    /// appends the ELF symbol-table fallback. A binary without debug info
    /// still yields a usable (coarser) table.
    ///
    /// ## Errors
    ///
    /// Missing file, unreadable file, unparsable object, or a fatal DWARF
    /// defect (see [`SymbolError`](crate::SymbolError) for the taxonomy).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self>
    {
        let path = path.as_ref();
        let image = BinaryImage::parse(path)?;

        let mut entries = Vec::new();
        if image.has_debug_info() {
            let session = DebugSession::new(image.load_dwarf()?)?;
            let records = ingest::collect_function_dies(&session)?;
            entries.extend(ingest::build_symbols(records)?);
        } else {
            warn!(
                "{} carries no debug info, falling back to the ELF symbol table",
                path.display()
            );
        }

        entries.extend(elf::symbol_entries(image.elf_symbols())?);
        debug!("{}: {} symbol table entries", image.path().display(), entries.len());

        Ok(Self::from_entries(entries))
    }

    /// DWARF entries must precede ELF entries in the input so the stable
    /// sort keeps them first on equal ranges.
    fn from_entries(mut entries: Vec<(AddressRange, Arc<Symbol>)>) -> Self
    {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        SymbolTable { entries }
    }

    /// Find the function owning `pc`, innermost (inlined) instance first
    ///
    /// Lower-bounds the point key `[pc, pc+1)` in the containment order:
    /// everything below the bound ends at or before `pc` and can never
    /// cover it. Within the remainder, nested ranges sort before their
    /// containers and every range covering `pc` starts at or below it, so
    /// the first entry that covers `pc` is the innermost one. Ranges in
    /// between that start above `pc` (nested siblings past the query
    /// point) are skipped by the containment check.
    pub fn find_function(&self, pc: u64) -> Option<Arc<Symbol>>
    {
        let key = AddressRange::new(pc, pc.checked_add(1)?)?;

        let start = self
            .entries
            .partition_point(|(range, _)| range.cmp(&key) == Ordering::Less);

        self.entries[start..]
            .iter()
            .find(|(range, symbol)| range.contains_pc(pc) && symbol.contains_pc(pc))
            .map(|(_, symbol)| symbol.clone())
    }

    /// Number of (range, symbol) entries
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}
