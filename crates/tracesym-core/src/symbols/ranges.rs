//! Range-list decoding for `DW_AT_ranges`.
//!
//! DWARF stores non-contiguous function extents in two encodings:
//! `.debug_ranges` (before version 5) uses base-relative offset pairs with
//! inline base-selection entries, `.debug_rnglists` (version 5) uses typed
//! entries, some of which index into `.debug_addr`. gimli's raw iterator
//! picks the section from the unit encoding; this module converts the raw
//! entries into a closed enum and folds them into sorted [`AddressRange`]s
//! with a pure function, so both encodings are testable without section
//! fixtures.

use gimli::{DebugAddrIndex, Encoding, RangeListsOffset, RawRngListEntry, Unit};

use crate::error::{map_dwarf_error, Result, SymbolError};
use crate::symbols::session::DebugSession;
use crate::symbols::OwnedReader;
use crate::types::AddressRange;

/// One entry of a range list, covering both encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RangeEntry
{
    /// Pre-v5 pair of offsets relative to the current base address
    Pair
    {
        begin: u64,
        end: u64,
    },
    /// Replace the current base address
    BaseAddress
    {
        base: u64,
    },
    /// Replace the current base address via a `.debug_addr` index
    BaseAddressx
    {
        index: DebugAddrIndex<usize>,
    },
    /// v5 pair of offsets relative to the current base address
    OffsetPair
    {
        begin: u64,
        end: u64,
    },
    /// Absolute start and end addresses
    StartEnd
    {
        begin: u64,
        end: u64,
    },
    /// Absolute start address and a length
    StartLength
    {
        begin: u64,
        length: u64,
    },
    /// Start and end addresses as `.debug_addr` indices
    StartxEndx
    {
        begin: DebugAddrIndex<usize>,
        end: DebugAddrIndex<usize>,
    },
    /// Start address as a `.debug_addr` index, plus a length
    StartxLength
    {
        begin: DebugAddrIndex<usize>,
        length: u64,
    },
}

impl RangeEntry
{
    /// Convert a raw gimli entry.
    ///
    /// In the legacy encoding a pair whose begin is the address-size-wide
    /// maximum is a base-selection entry, not a code span.
    pub(crate) fn from_raw(raw: RawRngListEntry<usize>, encoding: Encoding) -> Self
    {
        match raw {
            RawRngListEntry::AddressOrOffsetPair { begin, end } => {
                if begin == base_selection_marker(encoding.address_size) {
                    RangeEntry::BaseAddress { base: end }
                } else {
                    RangeEntry::Pair { begin, end }
                }
            }
            RawRngListEntry::BaseAddress { addr } => RangeEntry::BaseAddress { base: addr },
            RawRngListEntry::BaseAddressx { addr } => RangeEntry::BaseAddressx { index: addr },
            RawRngListEntry::OffsetPair { begin, end } => RangeEntry::OffsetPair { begin, end },
            RawRngListEntry::StartEnd { begin, end } => RangeEntry::StartEnd { begin, end },
            RawRngListEntry::StartLength { begin, length } => RangeEntry::StartLength { begin, length },
            RawRngListEntry::StartxEndx { begin, end } => RangeEntry::StartxEndx { begin, end },
            RawRngListEntry::StartxLength { begin, length } => RangeEntry::StartxLength { begin, length },
        }
    }
}

fn base_selection_marker(address_size: u8) -> u64
{
    if address_size >= 8 {
        u64::MAX
    } else {
        (1u64 << (u64::from(address_size) * 8)) - 1
    }
}

/// Fold range-list entries into sorted address ranges.
///
/// `base` is the initial base address (the CU's `DW_AT_low_pc`);
/// `resolve_addr` resolves `.debug_addr` indices. Degenerate and
/// overflowing spans are skipped; a relative pair with no base at all is
/// an [`SymbolError::InvalidRangeAttribute`].
pub(crate) fn accumulate<F>(entries: Vec<RangeEntry>, mut base: Option<u64>, mut resolve_addr: F) -> Result<Vec<AddressRange>>
where
    F: FnMut(DebugAddrIndex<usize>) -> Result<u64>,
{
    let mut out = Vec::new();

    for entry in entries {
        match entry {
            RangeEntry::BaseAddress { base: addr } => base = Some(addr),
            RangeEntry::BaseAddressx { index } => base = Some(resolve_addr(index)?),
            RangeEntry::Pair { begin, end } | RangeEntry::OffsetPair { begin, end } => {
                let Some(base) = base else {
                    return Err(SymbolError::InvalidRangeAttribute("offset pair without a base address"));
                };
                push_span(&mut out, base.checked_add(begin), base.checked_add(end));
            }
            RangeEntry::StartEnd { begin, end } => push_span(&mut out, Some(begin), Some(end)),
            RangeEntry::StartLength { begin, length } => push_span(&mut out, Some(begin), begin.checked_add(length)),
            RangeEntry::StartxEndx { begin, end } => {
                let begin = resolve_addr(begin)?;
                let end = resolve_addr(end)?;
                push_span(&mut out, Some(begin), Some(end));
            }
            RangeEntry::StartxLength { begin, length } => {
                let begin = resolve_addr(begin)?;
                push_span(&mut out, Some(begin), begin.checked_add(length));
            }
        }
    }

    out.sort_unstable_by_key(|range| range.start());
    Ok(out)
}

fn push_span(out: &mut Vec<AddressRange>, begin: Option<u64>, end: Option<u64>)
{
    if let (Some(begin), Some(end)) = (begin, end) {
        if let Some(range) = AddressRange::new(begin, end) {
            out.push(range);
        }
    }
}

/// Decode the range list at `offset` for a DIE of `unit`.
pub(crate) fn read_ranges(
    session: &DebugSession,
    unit: &Unit<OwnedReader>,
    offset: RangeListsOffset<usize>,
) -> Result<Vec<AddressRange>>
{
    let mut raw = session
        .dwarf()
        .raw_ranges(unit, offset)
        .map_err(|err| map_dwarf_error("opening range list", err))?;

    let mut entries = Vec::new();
    while let Some(entry) = raw
        .next()
        .map_err(|err| map_dwarf_error("reading range list entry", err))?
    {
        entries.push(RangeEntry::from_raw(entry, unit.encoding()));
    }

    accumulate(entries, Some(unit.low_pc), |index| {
        session
            .address(unit, index)
            .map_err(|_| SymbolError::InvalidRangeAttribute("unresolvable .debug_addr index"))
    })
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn no_addr_section(_: DebugAddrIndex<usize>) -> Result<u64>
    {
        Err(SymbolError::InvalidRangeAttribute("unresolvable .debug_addr index"))
    }

    fn spans(ranges: &[AddressRange]) -> Vec<(u64, u64)>
    {
        ranges.iter().map(|r| (r.start(), r.end())).collect()
    }

    #[test]
    fn test_legacy_pairs_relative_to_cu_base()
    {
        let entries = vec![
            RangeEntry::Pair { begin: 0x10, end: 0x20 },
            RangeEntry::Pair { begin: 0x40, end: 0x48 },
        ];
        let ranges = accumulate(entries, Some(0x1000), no_addr_section).unwrap();
        assert_eq!(spans(&ranges), vec![(0x1010, 0x1020), (0x1040, 0x1048)]);
    }

    #[test]
    fn test_legacy_base_selection_rebases_following_pairs()
    {
        let entries = vec![
            RangeEntry::Pair { begin: 0x10, end: 0x20 },
            RangeEntry::BaseAddress { base: 0x4000 },
            RangeEntry::Pair { begin: 0x10, end: 0x20 },
        ];
        let ranges = accumulate(entries, Some(0x1000), no_addr_section).unwrap();
        assert_eq!(spans(&ranges), vec![(0x1010, 0x1020), (0x4010, 0x4020)]);
    }

    #[test]
    fn test_base_selection_marker_depends_on_address_size()
    {
        assert_eq!(base_selection_marker(8), u64::MAX);
        assert_eq!(base_selection_marker(4), 0xffff_ffff);
    }

    #[test]
    fn test_pair_without_base_is_an_error()
    {
        let entries = vec![RangeEntry::OffsetPair { begin: 0x10, end: 0x20 }];
        let err = accumulate(entries, None, no_addr_section).unwrap_err();
        assert!(matches!(err, SymbolError::InvalidRangeAttribute(_)));
    }

    #[test]
    fn test_degenerate_spans_are_skipped()
    {
        let entries = vec![
            RangeEntry::StartEnd { begin: 0x2000, end: 0x2000 },
            RangeEntry::StartLength { begin: 0x3000, length: 0 },
            RangeEntry::StartEnd { begin: 0x1000, end: 0x1010 },
        ];
        let ranges = accumulate(entries, None, no_addr_section).unwrap();
        assert_eq!(spans(&ranges), vec![(0x1000, 0x1010)]);
    }

    #[test]
    fn test_indexed_entries_resolve_through_debug_addr()
    {
        let pool = [0x5000u64, 0x5040, 0x6000];
        let resolve = |index: DebugAddrIndex<usize>| Ok(pool[index.0]);

        let entries = vec![
            RangeEntry::StartxEndx {
                begin: DebugAddrIndex(0),
                end: DebugAddrIndex(1),
            },
            RangeEntry::StartxLength {
                begin: DebugAddrIndex(2),
                length: 0x10,
            },
        ];
        let ranges = accumulate(entries, None, resolve).unwrap();
        assert_eq!(spans(&ranges), vec![(0x5000, 0x5040), (0x6000, 0x6010)]);
    }

    #[test]
    fn test_missing_debug_addr_fails_indexed_entries()
    {
        let entries = vec![RangeEntry::StartxLength {
            begin: DebugAddrIndex(0),
            length: 0x10,
        }];
        let err = accumulate(entries, None, no_addr_section).unwrap_err();
        assert!(matches!(err, SymbolError::InvalidRangeAttribute(_)));
    }

    #[test]
    fn test_output_is_sorted_by_start()
    {
        let entries = vec![
            RangeEntry::StartEnd { begin: 0x3000, end: 0x3010 },
            RangeEntry::StartEnd { begin: 0x1000, end: 0x1010 },
            RangeEntry::StartEnd { begin: 0x2000, end: 0x2010 },
        ];
        let ranges = accumulate(entries, None, no_addr_section).unwrap();
        assert_eq!(spans(&ranges), vec![(0x1000, 0x1010), (0x2000, 0x2010), (0x3000, 0x3010)]);
    }
}
