//! ELF symbol-table fallback.
//!
//! Always runs, whether or not DWARF ingestion produced anything: the
//! symbol table covers functions the debug info misses (assembly stubs,
//! PLT-adjacent code, stripped objects with only a dynamic table), and
//! DWARF entries win ties because they sort ahead of these.

use std::collections::HashSet;
use std::sync::Arc;

use object::{Object, ObjectSymbol};
use tracing::debug;

use crate::error::{Result, SymbolError};
use crate::symbols::demangle::make_symbol_name;
use crate::types::{AddressRange, Symbol};

/// A function symbol as the symbol table carries it.
#[derive(Debug, Clone)]
pub(crate) struct RawElfSymbol
{
    pub(crate) name: String,
    pub(crate) value: u64,
    pub(crate) size: u64,
}

/// Extract every defined, named symbol from the static and dynamic
/// tables, deduplicated by (address, name).
///
/// No type filtering: `NOTYPE` labels (hand-written assembly entry
/// points) must resolve too, and the junk among them (`$x`-style mapping
/// symbols) is rejected by name validation downstream.
pub(crate) fn collect_symbols(file: &object::File<'_>) -> Vec<RawElfSymbol>
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for symbol in file.symbols().chain(file.dynamic_symbols()) {
        if symbol.is_undefined() {
            continue;
        }
        let Ok(name) = symbol.name() else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        if !seen.insert((symbol.address(), name.to_string())) {
            continue;
        }
        out.push(RawElfSymbol {
            name: name.to_string(),
            value: symbol.address(),
            size: symbol.size(),
        });
    }

    out
}

/// Turn raw ELF symbols into table entries.
///
/// A zero-size symbol still covers its entry point, so the range is
/// `[value, value + max(size, 1))`. Marker names are dropped.
pub(crate) fn symbol_entries(raw: &[RawElfSymbol]) -> Result<Vec<(AddressRange, Arc<Symbol>)>>
{
    let mut entries = Vec::new();

    for symbol in raw {
        let end = symbol.value.saturating_add(symbol.size.max(1));
        let Some(range) = AddressRange::new(symbol.value, end) else {
            continue;
        };

        match Symbol::new(make_symbol_name(symbol.name.clone()), false, vec![range]) {
            Ok(symbol) => entries.push((range, Arc::new(symbol))),
            Err(SymbolError::InvalidSymbol(name)) => {
                debug!("skipping ELF marker symbol {name:?}");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(entries)
}
