//! Half-open instruction-address ranges.

use std::cmp::Ordering;
use std::fmt;

/// A half-open range `[start, end)` of instruction addresses
///
/// This is the unit of bookkeeping for every function the resolver knows
/// about: a contiguous function has one range, a function split by the
/// compiler (hot/cold parts, or an inlined body duplicated across call
/// sites) has several.
///
/// Ranges are never empty: construction rejects `end <= start`.
///
/// ## Ordering
///
/// `AddressRange` carries a containment-aware total order, which is what
/// makes innermost-wins lookup work on a flat sorted table:
///
/// - a range strictly contained in another sorts *before* it;
/// - disjoint and partially overlapping ranges sort by start address.
///
/// With DWARF-well-formed input (nested-or-disjoint ranges), two distinct
/// ranges never tie.
///
/// ## Example
///
/// ```rust
/// use tracesym_core::types::AddressRange;
///
/// let outer = AddressRange::new(0x1000, 0x2000).unwrap();
/// let inner = AddressRange::new(0x1400, 0x1420).unwrap();
/// assert!(inner < outer);
/// assert!(outer.contains_pc(0x1500));
/// assert!(!inner.contains_pc(0x1500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange
{
    start: u64,
    end: u64,
}

impl AddressRange
{
    /// Create a new range, rejecting degenerate intervals
    ///
    /// Returns `None` when `end <= start`.
    pub fn new(start: u64, end: u64) -> Option<Self>
    {
        (end > start).then_some(AddressRange { start, end })
    }

    /// First address covered by the range
    pub const fn start(self) -> u64
    {
        self.start
    }

    /// First address past the range
    pub const fn end(self) -> u64
    {
        self.end
    }

    /// Number of addresses covered
    pub const fn len(self) -> u64
    {
        self.end - self.start
    }

    /// Whether `pc` falls inside `[start, end)`
    pub const fn contains_pc(self, pc: u64) -> bool
    {
        pc >= self.start && pc < self.end
    }

    /// Whether `other` lies entirely inside this range
    pub const fn contains_range(self, other: Self) -> bool
    {
        self.start <= other.start && other.end <= self.end
    }
}

impl Ord for AddressRange
{
    fn cmp(&self, other: &Self) -> Ordering
    {
        if self == other {
            Ordering::Equal
        } else if other.contains_range(*self) {
            Ordering::Less
        } else if self.contains_range(*other) {
            Ordering::Greater
        } else {
            // Neither contains the other; equal starts are impossible here
            // because the shorter range would be contained.
            self.start.cmp(&other.start).then(self.end.cmp(&other.end))
        }
    }
}

impl PartialOrd for AddressRange
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering>
    {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AddressRange
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "[0x{:x}, 0x{:x})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_rejects_degenerate_ranges()
    {
        assert!(AddressRange::new(0x1000, 0x1000).is_none());
        assert!(AddressRange::new(0x2000, 0x1000).is_none());
        assert!(AddressRange::new(0x1000, 0x1001).is_some());
    }

    #[test]
    fn test_contains_pc_boundaries()
    {
        let range = AddressRange::new(0x1000, 0x2000).unwrap();
        assert!(!range.contains_pc(0xfff));
        assert!(range.contains_pc(0x1000));
        assert!(range.contains_pc(0x1fff));
        assert!(!range.contains_pc(0x2000));
    }

    #[test]
    fn test_nested_range_sorts_first()
    {
        let outer = AddressRange::new(0x1000, 0x2000).unwrap();
        let inner = AddressRange::new(0x1400, 0x1420).unwrap();
        assert_eq!(inner.cmp(&outer), Ordering::Less);
        assert_eq!(outer.cmp(&inner), Ordering::Greater);
    }

    #[test]
    fn test_disjoint_ranges_sort_by_start()
    {
        let low = AddressRange::new(0x1000, 0x1100).unwrap();
        let high = AddressRange::new(0x3000, 0x3100).unwrap();
        assert_eq!(low.cmp(&high), Ordering::Less);
        assert_eq!(high.cmp(&low), Ordering::Greater);
    }

    #[test]
    fn test_equal_ranges_compare_equal()
    {
        let a = AddressRange::new(0x400, 0x420).unwrap();
        let b = AddressRange::new(0x400, 0x420).unwrap();
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_shared_start_shorter_range_sorts_first()
    {
        let long = AddressRange::new(0x1000, 0x2000).unwrap();
        let short = AddressRange::new(0x1000, 0x1200).unwrap();
        assert_eq!(short.cmp(&long), Ordering::Less);
    }

    #[test]
    fn test_len()
    {
        assert_eq!(AddressRange::new(0x1000, 0x1001).unwrap().len(), 1);
        assert_eq!(AddressRange::new(0x1000, 0x2000).unwrap().len(), 0x1000);
    }
}
