//! Resolved function symbols.

use std::fmt;

use crate::error::{Result, SymbolError};
use crate::types::AddressRange;

/// Source language inferred from a symbol's mangling scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolLanguage
{
    Rust,
    Cpp,
    Unknown,
}

/// A symbol name in raw and demangled form
///
/// The raw form is whatever the binary carried (usually a mangled linkage
/// name); the demangled form is present when one of the demanglers
/// recognized the scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolName
{
    raw: String,
    demangled: Option<String>,
    language: SymbolLanguage,
}

impl SymbolName
{
    pub fn new(raw: String, demangled: Option<String>, language: SymbolLanguage) -> Self
    {
        SymbolName { raw, demangled, language }
    }

    /// The name to show a human: demangled when available, raw otherwise
    pub fn display(&self) -> &str
    {
        self.demangled.as_deref().unwrap_or(&self.raw)
    }

    pub fn raw(&self) -> &str
    {
        &self.raw
    }

    pub fn language(&self) -> SymbolLanguage
    {
        self.language
    }
}

/// A function the resolver can attribute trace addresses to
///
/// Carries the name, whether this instance is an inlined copy, and the
/// sorted list of address ranges the function's code occupies. A symbol
/// always has at least one range.
///
/// ## Example
///
/// ```rust
/// use tracesym_core::types::{AddressRange, Symbol, SymbolLanguage, SymbolName};
///
/// let name = SymbolName::new("main".to_string(), None, SymbolLanguage::Unknown);
/// let range = AddressRange::new(0x400, 0x420).unwrap();
/// let symbol = Symbol::new(name, false, vec![range]).unwrap();
/// assert!(symbol.contains_pc(0x410));
/// assert!(!symbol.contains_pc(0x500));
/// ```
#[derive(Debug, Clone)]
pub struct Symbol
{
    name: SymbolName,
    inlined: bool,
    ranges: Vec<AddressRange>,
}

impl Symbol
{
    /// Build a symbol, validating the name and normalizing the ranges
    ///
    /// Ranges are sorted by start and coalesced: a malformed range list
    /// can carry overlapping or touching spans, and the binary search in
    /// [`contains_pc`](Symbol::contains_pc) relies on the stored ranges
    /// being disjoint.
    ///
    /// ## Errors
    ///
    /// Returns [`SymbolError::InvalidSymbol`] for empty names and for
    /// two-character `$`-prefixed names (`$x`, `$d`, `$t`, ...): the
    /// mapping symbols AArch64/ARM toolchains leave in the symbol table,
    /// which mark data/code transitions rather than functions.
    pub fn new(name: SymbolName, inlined: bool, mut ranges: Vec<AddressRange>) -> Result<Self>
    {
        let raw = name.raw();
        if raw.is_empty() || (raw.len() == 2 && raw.starts_with('$')) {
            return Err(SymbolError::InvalidSymbol(raw.to_string()));
        }

        ranges.sort_unstable_by_key(|range| range.start());
        let mut coalesced: Vec<AddressRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match coalesced.last_mut() {
                Some(last) if range.start() <= last.end() => {
                    if let Some(widened) = AddressRange::new(last.start(), last.end().max(range.end())) {
                        *last = widened;
                    }
                }
                _ => coalesced.push(range),
            }
        }

        Ok(Symbol {
            name,
            inlined,
            ranges: coalesced,
        })
    }

    /// Human-readable (demangled when possible) name
    pub fn name(&self) -> &str
    {
        self.name.display()
    }

    /// The name exactly as the binary carried it
    pub fn raw_name(&self) -> &str
    {
        self.name.raw()
    }

    pub fn language(&self) -> SymbolLanguage
    {
        self.name.language()
    }

    /// Whether this symbol is an inlined instance of a function
    pub fn is_inlined(&self) -> bool
    {
        self.inlined
    }

    /// The address ranges this symbol covers, sorted by start and disjoint
    pub fn ranges(&self) -> &[AddressRange]
    {
        &self.ranges
    }

    /// Whether any of this symbol's ranges covers `pc`
    ///
    /// Binary search over the sorted ranges: find the last range starting
    /// at or below `pc`, then check it.
    pub fn contains_pc(&self, pc: u64) -> bool
    {
        let idx = self.ranges.partition_point(|range| range.start() <= pc);
        idx > 0 && self.ranges[idx - 1].contains_pc(pc)
    }
}

impl fmt::Display for Symbol
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.inlined {
            write!(f, "{} (inlined)", self.name())
        } else {
            write!(f, "{}", self.name())
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn plain(raw: &str) -> SymbolName
    {
        SymbolName::new(raw.to_string(), None, SymbolLanguage::Unknown)
    }

    fn range(start: u64, end: u64) -> AddressRange
    {
        AddressRange::new(start, end).unwrap()
    }

    #[test]
    fn test_rejects_empty_name()
    {
        let err = Symbol::new(plain(""), false, vec![range(0x400, 0x420)]).unwrap_err();
        assert!(matches!(err, SymbolError::InvalidSymbol(_)));
    }

    #[test]
    fn test_rejects_mapping_symbols()
    {
        for marker in ["$x", "$d", "$t", "$a"] {
            let err = Symbol::new(plain(marker), false, vec![range(0x400, 0x420)]).unwrap_err();
            assert!(matches!(err, SymbolError::InvalidSymbol(_)), "{marker} should be rejected");
        }
    }

    #[test]
    fn test_longer_dollar_names_are_kept()
    {
        // Only the two-character markers are junk; real names can start
        // with a dollar sign.
        assert!(Symbol::new(plain("$start"), false, vec![range(0x400, 0x420)]).is_ok());
    }

    #[test]
    fn test_contains_pc_over_multiple_ranges()
    {
        let symbol = Symbol::new(
            plain("split_fn"),
            false,
            vec![range(0x3000, 0x3040), range(0x1000, 0x1020)],
        )
        .unwrap();

        // Ranges get sorted on construction.
        assert_eq!(symbol.ranges()[0].start(), 0x1000);

        assert!(symbol.contains_pc(0x1000));
        assert!(symbol.contains_pc(0x101f));
        assert!(!symbol.contains_pc(0x1020));
        assert!(!symbol.contains_pc(0x2000));
        assert!(symbol.contains_pc(0x3030));
        assert!(!symbol.contains_pc(0x3040));
    }

    #[test]
    fn test_overlapping_ranges_are_coalesced()
    {
        let symbol = Symbol::new(
            plain("merged"),
            false,
            vec![range(0x1000, 0x1100), range(0x1050, 0x1060)],
        )
        .unwrap();

        assert_eq!(symbol.ranges(), &[range(0x1000, 0x1100)]);
        // An address inside the wider range but past the narrower one
        // must still be reported as contained.
        assert!(symbol.contains_pc(0x1070));
    }

    #[test]
    fn test_adjacent_ranges_are_coalesced()
    {
        let symbol = Symbol::new(
            plain("contiguous"),
            false,
            vec![range(0x1100, 0x1200), range(0x1000, 0x1100)],
        )
        .unwrap();

        assert_eq!(symbol.ranges(), &[range(0x1000, 0x1200)]);
        assert!(symbol.contains_pc(0x10ff));
        assert!(symbol.contains_pc(0x1100));
        assert!(!symbol.contains_pc(0x1200));
    }

    #[test]
    fn test_display_marks_inlined_instances()
    {
        let symbol = Symbol::new(plain("bar"), true, vec![range(0x1400, 0x1420)]).unwrap();
        assert_eq!(symbol.to_string(), "bar (inlined)");
    }

    #[test]
    fn test_demangled_name_preferred_for_display()
    {
        let name = SymbolName::new(
            "_ZN3foo3barE".to_string(),
            Some("foo::bar".to_string()),
            SymbolLanguage::Cpp,
        );
        let symbol = Symbol::new(name, false, vec![range(0x400, 0x420)]).unwrap();
        assert_eq!(symbol.name(), "foo::bar");
        assert_eq!(symbol.raw_name(), "_ZN3foo3barE");
    }
}
