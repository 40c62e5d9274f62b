//! DWARF ingestion: DIE collection and the two-pass symbol build.
//!
//! Collection walks every unit's DIE tree once and lowers each
//! `DW_TAG_subprogram` / `DW_TAG_inlined_subroutine` into a flat
//! [`FunctionDie`] record. The build is then a pure fold over those
//! records in two passes: pass 1 indexes abstract inline definitions and
//! materializes concrete subprograms, pass 2 resolves the deferred
//! inlined instances through the index. Two passes are required because
//! an instance may reference an abstract definition in a unit that has
//! not been walked yet.

use std::collections::HashMap;
use std::sync::Arc;

use gimli::{constants, DebuggingInformationEntry, Unit};
use tracing::{debug, warn};

use crate::error::{map_dwarf_error, Result, SymbolError};
use crate::symbols::demangle::make_symbol_name;
use crate::symbols::ranges;
use crate::symbols::session::DebugSession;
use crate::symbols::OwnedReader;
use crate::types::{AddressRange, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionKind
{
    Subprogram,
    InlinedSubroutine,
}

/// Everything the symbol build needs to know about one function DIE.
#[derive(Debug, Clone)]
pub(crate) struct FunctionDie
{
    pub(crate) kind: FunctionKind,
    /// Offset relative to `.debug_info`; `None` for type-unit DIEs
    pub(crate) offset: Option<u64>,
    /// Raw name; chain-resolved for subprograms, direct-only for inlined
    /// instances (those resolve through the origin index instead)
    pub(crate) name: Option<String>,
    pub(crate) declared_inline: bool,
    /// Contiguous `[low_pc, high)` extent
    pub(crate) pc: Option<AddressRange>,
    /// Non-contiguous extents from `DW_AT_ranges`
    pub(crate) ranges: Vec<AddressRange>,
    /// Global offset of the `DW_AT_abstract_origin` target
    pub(crate) abstract_origin: Option<u64>,
}

/// Walk every unit and produce the flat function records.
///
/// A DIE whose `DW_AT_ranges` cannot be decoded is skipped with a
/// warning; every other decoding failure aborts ingestion.
pub(crate) fn collect_function_dies(session: &DebugSession) -> Result<Vec<FunctionDie>>
{
    let mut records = Vec::new();

    for unit in session.units() {
        let mut cursor = unit.entries();
        while let Some((_delta, entry)) = cursor.next_dfs().map_err(|err| map_dwarf_error("traversing DIE tree", err))? {
            let kind = match entry.tag() {
                constants::DW_TAG_subprogram => FunctionKind::Subprogram,
                constants::DW_TAG_inlined_subroutine => FunctionKind::InlinedSubroutine,
                _ => continue,
            };

            match build_record(session, unit, entry, kind) {
                Ok(record) => records.push(record),
                Err(SymbolError::InvalidRangeAttribute(reason)) => {
                    warn!("skipping function DIE with invalid range attribute: {reason}");
                }
                Err(err) => return Err(err),
            }
        }
    }

    Ok(records)
}

fn build_record(
    session: &DebugSession,
    unit: &Unit<OwnedReader>,
    entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
    kind: FunctionKind,
) -> Result<FunctionDie>
{
    let name = match kind {
        FunctionKind::Subprogram => session.resolve_entry_name(unit, entry)?,
        FunctionKind::InlinedSubroutine => session.direct_name(unit, entry)?,
    };

    let declared_inline = kind == FunctionKind::Subprogram && session.declared_inline(entry)?;

    let abstract_origin = match entry
        .attr(constants::DW_AT_abstract_origin)
        .map_err(|err| map_dwarf_error("reading DW_AT_abstract_origin", err))?
    {
        Some(attr) => session
            .resolve_reference(unit, attr.value())?
            .and_then(|(target_unit, target_offset)| session.global_offset(target_unit, target_offset)),
        None => None,
    };

    Ok(FunctionDie {
        kind,
        offset: session.global_offset(unit, entry.offset()),
        name,
        declared_inline,
        pc: session.entry_pc_range(unit, entry)?,
        ranges: read_die_ranges(session, unit, entry)?,
        abstract_origin,
    })
}

fn read_die_ranges(
    session: &DebugSession,
    unit: &Unit<OwnedReader>,
    entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
) -> Result<Vec<AddressRange>>
{
    let Some(attr) = entry
        .attr(constants::DW_AT_ranges)
        .map_err(|err| map_dwarf_error("reading DW_AT_ranges", err))?
    else {
        return Ok(Vec::new());
    };

    let offset = session
        .dwarf()
        .attr_ranges_offset(unit, attr.value())
        .map_err(|err| map_dwarf_error("resolving DW_AT_ranges offset", err))?;

    match offset {
        Some(offset) => ranges::read_ranges(session, unit, offset),
        None => Err(SymbolError::InvalidRangeAttribute("DW_AT_ranges has a non-range-list form")),
    }
}

/// Pure two-pass build from function records to table entries.
///
/// Each produced symbol contributes one entry per address range, all
/// sharing a single `Arc`.
pub(crate) fn build_symbols(records: Vec<FunctionDie>) -> Result<Vec<(AddressRange, Arc<Symbol>)>>
{
    let mut inline_origins: HashMap<u64, String> = HashMap::new();
    let mut deferred = Vec::new();
    let mut entries = Vec::new();

    // Pass 1: abstract inline definitions into the origin index, concrete
    // subprograms straight into the table, instances deferred.
    for record in records {
        match record.kind {
            FunctionKind::Subprogram => {
                if record.declared_inline {
                    if let (Some(offset), Some(name)) = (record.offset, record.name.as_ref()) {
                        inline_origins.insert(offset, name.clone());
                    }
                }

                let Some(ranges) = code_ranges(&record) else {
                    continue; // abstract definition or declaration
                };
                let Some(name) = record.name else {
                    continue;
                };
                push_symbol(&mut entries, name, false, ranges)?;
            }
            FunctionKind::InlinedSubroutine => {
                if code_ranges(&record).is_some() {
                    deferred.push(record);
                }
            }
        }
    }

    // Pass 2: name each inlined instance from its abstract origin.
    for record in deferred {
        let name = record
            .abstract_origin
            .and_then(|origin| inline_origins.get(&origin).cloned())
            .or_else(|| record.name.clone());
        let Some(name) = name else {
            return Err(SymbolError::MissingAbstractOrigin(record.offset.unwrap_or(0)));
        };

        let ranges = code_ranges(&record).unwrap_or_default();
        push_symbol(&mut entries, name, true, ranges)?;
    }

    debug!("built {} symbol table entries from DWARF", entries.len());
    Ok(entries)
}

/// The extents a record occupies: the contiguous PC range when present,
/// otherwise the range list.
fn code_ranges(record: &FunctionDie) -> Option<Vec<AddressRange>>
{
    if let Some(pc) = record.pc {
        return Some(vec![pc]);
    }
    (!record.ranges.is_empty()).then(|| record.ranges.clone())
}

fn push_symbol(
    entries: &mut Vec<(AddressRange, Arc<Symbol>)>,
    raw_name: String,
    inlined: bool,
    ranges: Vec<AddressRange>,
) -> Result<()>
{
    match Symbol::new(make_symbol_name(raw_name), inlined, ranges) {
        Ok(symbol) => {
            let symbol = Arc::new(symbol);
            for range in symbol.ranges().to_vec() {
                entries.push((range, symbol.clone()));
            }
            Ok(())
        }
        Err(SymbolError::InvalidSymbol(name)) => {
            debug!("skipping marker symbol {name:?}");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn range(start: u64, end: u64) -> AddressRange
    {
        AddressRange::new(start, end).unwrap()
    }

    fn record(kind: FunctionKind) -> FunctionDie
    {
        FunctionDie {
            kind,
            offset: None,
            name: None,
            declared_inline: false,
            pc: None,
            ranges: Vec::new(),
            abstract_origin: None,
        }
    }

    #[test]
    fn test_inlined_instance_takes_abstract_name()
    {
        let abstract_def = FunctionDie {
            offset: Some(0x42),
            name: Some("bar".to_string()),
            declared_inline: true,
            ..record(FunctionKind::Subprogram)
        };
        let outer = FunctionDie {
            name: Some("foo".to_string()),
            pc: Some(range(0x1000, 0x2000)),
            ..record(FunctionKind::Subprogram)
        };
        let instance = FunctionDie {
            pc: Some(range(0x1400, 0x1420)),
            abstract_origin: Some(0x42),
            ..record(FunctionKind::InlinedSubroutine)
        };

        let entries = build_symbols(vec![abstract_def, outer, instance]).unwrap();
        assert_eq!(entries.len(), 2);

        let inlined = entries.iter().find(|(_, s)| s.is_inlined()).unwrap();
        assert_eq!(inlined.1.name(), "bar");
        assert_eq!(inlined.0, range(0x1400, 0x1420));
    }

    #[test]
    fn test_instance_after_abstract_in_record_order_still_resolves()
    {
        // The abstract definition arrives last; the origin index is built
        // before any instance is resolved.
        let instance = FunctionDie {
            pc: Some(range(0x1400, 0x1420)),
            abstract_origin: Some(0x42),
            ..record(FunctionKind::InlinedSubroutine)
        };
        let abstract_def = FunctionDie {
            offset: Some(0x42),
            name: Some("bar".to_string()),
            declared_inline: true,
            ..record(FunctionKind::Subprogram)
        };

        let entries = build_symbols(vec![instance, abstract_def]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1.name(), "bar");
        assert!(entries[0].1.is_inlined());
    }

    #[test]
    fn test_missing_abstract_origin_is_fatal()
    {
        let instance = FunctionDie {
            offset: Some(0x99),
            pc: Some(range(0x1400, 0x1420)),
            abstract_origin: Some(0x42),
            ..record(FunctionKind::InlinedSubroutine)
        };

        let err = build_symbols(vec![instance]).unwrap_err();
        assert!(matches!(err, SymbolError::MissingAbstractOrigin(0x99)));
    }

    #[test]
    fn test_instance_falls_back_to_its_own_name()
    {
        let instance = FunctionDie {
            name: Some("baz".to_string()),
            pc: Some(range(0x1400, 0x1420)),
            ..record(FunctionKind::InlinedSubroutine)
        };

        let entries = build_symbols(vec![instance]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1.name(), "baz");
    }

    #[test]
    fn test_pc_range_preferred_over_range_list()
    {
        let subprogram = FunctionDie {
            name: Some("foo".to_string()),
            pc: Some(range(0x1000, 0x1100)),
            ranges: vec![range(0x2000, 0x2100), range(0x3000, 0x3100)],
            ..record(FunctionKind::Subprogram)
        };

        let entries = build_symbols(vec![subprogram]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, range(0x1000, 0x1100));
    }

    #[test]
    fn test_range_list_used_when_no_pc()
    {
        let subprogram = FunctionDie {
            name: Some("cold_split".to_string()),
            ranges: vec![range(0x2000, 0x2100), range(0x3000, 0x3100)],
            ..record(FunctionKind::Subprogram)
        };

        let entries = build_symbols(vec![subprogram]).unwrap();
        assert_eq!(entries.len(), 2);
        // Both entries share the same symbol.
        assert!(Arc::ptr_eq(&entries[0].1, &entries[1].1));
        assert_eq!(entries[0].1.ranges().len(), 2);
    }

    #[test]
    fn test_out_of_line_copy_of_inline_function()
    {
        // declared_inline with code: indexed for instances AND emitted as
        // a concrete symbol.
        let out_of_line = FunctionDie {
            offset: Some(0x42),
            name: Some("bar".to_string()),
            declared_inline: true,
            pc: Some(range(0x5000, 0x5040)),
            ..record(FunctionKind::Subprogram)
        };
        let instance = FunctionDie {
            pc: Some(range(0x1400, 0x1420)),
            abstract_origin: Some(0x42),
            ..record(FunctionKind::InlinedSubroutine)
        };

        let entries = build_symbols(vec![out_of_line, instance]).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|(_, s)| !s.is_inlined()));
        assert!(entries.iter().any(|(_, s)| s.is_inlined()));
    }

    #[test]
    fn test_marker_symbols_are_dropped_not_fatal()
    {
        let marker = FunctionDie {
            name: Some("$x".to_string()),
            pc: Some(range(0x1000, 0x1010)),
            ..record(FunctionKind::Subprogram)
        };

        let entries = build_symbols(vec![marker]).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_codeless_records_produce_nothing()
    {
        let declaration = FunctionDie {
            name: Some("declared_only".to_string()),
            ..record(FunctionKind::Subprogram)
        };
        let codeless_instance = FunctionDie {
            abstract_origin: Some(0x42),
            ..record(FunctionKind::InlinedSubroutine)
        };

        let entries = build_symbols(vec![declaration, codeless_instance]).unwrap();
        assert!(entries.is_empty());
    }
}
