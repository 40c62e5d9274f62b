//! DWARF session: unit materialization and attribute decoding.

use std::collections::HashSet;

use gimli::{
    constants, AttributeValue, DebugAddrIndex, DebugTypeSignature, DebuggingInformationEntry, Reader, Unit, UnitOffset,
    UnitSectionOffset, UnitType,
};

use crate::error::{map_dwarf_error, Result, SymbolError};
use crate::symbols::{OwnedDwarf, OwnedReader};
use crate::types::AddressRange;

/// A loaded DWARF image with every unit materialized up front
///
/// Holds the `Dwarf` handle plus a `Vec<Unit>` covering both `.debug_info`
/// compilation units and type units, so cross-unit references
/// (`DW_FORM_ref_addr`, `DW_FORM_ref_sig8`) can be resolved without
/// re-parsing headers.
pub(crate) struct DebugSession
{
    dwarf: OwnedDwarf,
    units: Vec<Unit<OwnedReader>>,
}

impl DebugSession
{
    pub(crate) fn new(dwarf: OwnedDwarf) -> Result<Self>
    {
        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            units.push(
                dwarf
                    .unit(header)
                    .map_err(|err| map_dwarf_error("parsing compilation unit", err))?,
            );
        }

        let mut type_headers = dwarf.type_units();
        while let Some(header) = type_headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_types unit header", err))?
        {
            units.push(dwarf.unit(header).map_err(|err| map_dwarf_error("parsing type unit", err))?);
        }

        Ok(Self { dwarf, units })
    }

    pub(crate) fn dwarf(&self) -> &OwnedDwarf
    {
        &self.dwarf
    }

    pub(crate) fn units(&self) -> &[Unit<OwnedReader>]
    {
        &self.units
    }

    /// Offset of a DIE relative to the start of `.debug_info`
    ///
    /// `None` for DIEs living in a `.debug_types` section.
    pub(crate) fn global_offset(&self, unit: &Unit<OwnedReader>, offset: UnitOffset<usize>) -> Option<u64>
    {
        offset.to_debug_info_offset(&unit.header).map(|global| global.0 as u64)
    }

    /// Resolve a reference-class attribute value to a (unit, offset) pair
    ///
    /// Covers CU-local references, global `.debug_info` references, and
    /// type-unit signatures. `DW_FORM_ref_sup*` has no supplementary
    /// session to resolve into and is rejected; non-reference values
    /// resolve to nothing.
    pub(crate) fn resolve_reference<'a>(
        &'a self,
        unit: &'a Unit<OwnedReader>,
        value: AttributeValue<OwnedReader>,
    ) -> Result<Option<(&'a Unit<OwnedReader>, UnitOffset<usize>)>>
    {
        match value {
            AttributeValue::UnitRef(offset) => Ok(Some((unit, offset))),
            AttributeValue::DebugInfoRef(offset) => Ok(self.find_unit_for_offset(UnitSectionOffset::from(offset))),
            AttributeValue::DebugTypesRef(signature) => Ok(self.find_unit_for_signature(signature)),
            AttributeValue::DebugInfoRefSup(_) => Err(SymbolError::UnsupportedForm("DW_FORM_ref_sup")),
            _ => Ok(None),
        }
    }

    fn find_unit_for_offset(&self, target: UnitSectionOffset<usize>) -> Option<(&Unit<OwnedReader>, UnitOffset<usize>)>
    {
        self.units
            .iter()
            .find_map(|unit| target.to_unit_offset(unit).map(|offset| (unit, offset)))
    }

    fn find_unit_for_signature(&self, signature: DebugTypeSignature) -> Option<(&Unit<OwnedReader>, UnitOffset<usize>)>
    {
        self.units.iter().find_map(|unit| match unit.header.type_() {
            UnitType::Type {
                type_signature,
                type_offset,
            }
            | UnitType::SplitType {
                type_signature,
                type_offset,
            } if type_signature == signature => Some((unit, type_offset)),
            _ => None,
        })
    }

    /// Name from the DIE itself: linkage name first so the demangler sees
    /// the mangled form, plain name otherwise. No reference chasing.
    pub(crate) fn direct_name(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
    ) -> Result<Option<String>>
    {
        if let Some(attr) = entry
            .attr(constants::DW_AT_linkage_name)
            .map_err(|err| map_dwarf_error("reading DW_AT_linkage_name", err))?
        {
            return Ok(Some(self.attr_to_string(unit, attr.value())?));
        }
        if let Some(attr) = entry
            .attr(constants::DW_AT_name)
            .map_err(|err| map_dwarf_error("reading DW_AT_name", err))?
        {
            return Ok(Some(self.attr_to_string(unit, attr.value())?));
        }
        Ok(None)
    }

    /// Name resolution with specification-chain fallback
    ///
    /// A DIE without its own name attributes may point at the declaration
    /// that carries them via `DW_AT_specification` (out-of-line C++
    /// definitions) or `DW_AT_abstract_origin` (concrete instances). The
    /// chain is followed with a visited set; a revisited DIE means the
    /// producer emitted a reference cycle and resolution fails with
    /// [`SymbolError::CyclicReference`].
    pub(crate) fn resolve_entry_name(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
    ) -> Result<Option<String>>
    {
        let mut visited = HashSet::new();
        visited.insert(visit_key(unit, entry.offset()));
        self.resolve_name_inner(unit, entry, &mut visited)
    }

    fn resolve_name_inner(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
        visited: &mut HashSet<(u8, usize, usize)>,
    ) -> Result<Option<String>>
    {
        if let Some(name) = self.direct_name(unit, entry)? {
            return Ok(Some(name));
        }

        for attr_name in [constants::DW_AT_specification, constants::DW_AT_abstract_origin] {
            let Some((target_unit, target)) = self.follow_reference(unit, entry, attr_name, visited)? else {
                continue;
            };
            if let Some(name) = self.resolve_name_inner(target_unit, &target, visited)? {
                return Ok(Some(name));
            }
        }

        Ok(None)
    }

    /// The contiguous `[DW_AT_low_pc, high)` range of a DIE, if it has one
    ///
    /// Both PC attributes fall back through the specification chain when
    /// the DIE itself does not carry them (a declaration resolves its
    /// definition's extent). `DW_AT_high_pc` may be an absolute address or
    /// an offset from the low PC; an absent or zero high PC yields the
    /// minimal one-byte range, so the entry point still resolves.
    pub(crate) fn entry_pc_range(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
    ) -> Result<Option<AddressRange>>
    {
        let mut visited = HashSet::new();
        visited.insert(visit_key(unit, entry.offset()));
        let Some(low) = self.low_pc_inner(unit, entry, &mut visited)? else {
            return Ok(None);
        };

        let mut visited = HashSet::new();
        visited.insert(visit_key(unit, entry.offset()));
        let end = self
            .high_pc_inner(unit, entry, low, &mut visited)?
            .unwrap_or_else(|| low.saturating_add(1));

        Ok(AddressRange::new(low, end))
    }

    fn low_pc_inner(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
        visited: &mut HashSet<(u8, usize, usize)>,
    ) -> Result<Option<u64>>
    {
        if let Some(attr) = entry
            .attr(constants::DW_AT_low_pc)
            .map_err(|err| map_dwarf_error("reading DW_AT_low_pc", err))?
        {
            return Ok(match attr.value() {
                AttributeValue::Addr(addr) => Some(addr),
                AttributeValue::DebugAddrIndex(index) => Some(self.address(unit, index)?),
                _ => None,
            });
        }

        for attr_name in [constants::DW_AT_specification, constants::DW_AT_abstract_origin] {
            let Some((target_unit, target)) = self.follow_reference(unit, entry, attr_name, visited)? else {
                continue;
            };
            if let Some(low) = self.low_pc_inner(target_unit, &target, visited)? {
                return Ok(Some(low));
            }
        }

        Ok(None)
    }

    /// Follow one `DW_AT_specification` / `DW_AT_abstract_origin` link,
    /// recording the target in `visited`. A revisit is a
    /// [`SymbolError::CyclicReference`].
    fn follow_reference<'a>(
        &'a self,
        unit: &'a Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
        attr_name: constants::DwAt,
        visited: &mut HashSet<(u8, usize, usize)>,
    ) -> Result<Option<(&'a Unit<OwnedReader>, DebuggingInformationEntry<'a, 'a, OwnedReader>)>>
    {
        let Some(attr) = entry
            .attr(attr_name)
            .map_err(|err| map_dwarf_error("reading DIE reference attribute", err))?
        else {
            return Ok(None);
        };
        let Some((target_unit, target_offset)) = self.resolve_reference(unit, attr.value())? else {
            return Ok(None);
        };

        if !visited.insert(visit_key(target_unit, target_offset)) {
            return Err(SymbolError::CyclicReference(target_offset.0 as u64));
        }

        let target = target_unit
            .entry(target_offset)
            .map_err(|err| map_dwarf_error("resolving referenced DIE", err))?;
        Ok(Some((target_unit, target)))
    }

    fn high_pc_inner(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
        low: u64,
        visited: &mut HashSet<(u8, usize, usize)>,
    ) -> Result<Option<u64>>
    {
        if let Some(attr) = entry
            .attr(constants::DW_AT_high_pc)
            .map_err(|err| map_dwarf_error("reading DW_AT_high_pc", err))?
        {
            return Ok(Some(match attr.value() {
                AttributeValue::Addr(addr) => addr,
                other => match other.udata_value() {
                    Some(0) | None => low.saturating_add(1),
                    Some(offset) => low.saturating_add(offset),
                },
            }));
        }

        for attr_name in [constants::DW_AT_specification, constants::DW_AT_abstract_origin] {
            let Some((target_unit, target)) = self.follow_reference(unit, entry, attr_name, visited)? else {
                continue;
            };
            if let Some(end) = self.high_pc_inner(target_unit, &target, low, visited)? {
                return Ok(Some(end));
            }
        }

        Ok(None)
    }

    /// Whether a subprogram is marked inline (`DW_INL_inlined` or
    /// `DW_INL_declared_inlined`).
    pub(crate) fn declared_inline(&self, entry: &DebuggingInformationEntry<'_, '_, OwnedReader>) -> Result<bool>
    {
        let Some(attr) = entry
            .attr(constants::DW_AT_inline)
            .map_err(|err| map_dwarf_error("reading DW_AT_inline", err))?
        else {
            return Ok(false);
        };

        Ok(match attr.value() {
            AttributeValue::Inline(code) => {
                code == constants::DW_INL_inlined || code == constants::DW_INL_declared_inlined
            }
            other => matches!(
                other.udata_value(),
                Some(value)
                    if value == u64::from(constants::DW_INL_inlined.0)
                        || value == u64::from(constants::DW_INL_declared_inlined.0)
            ),
        })
    }

    pub(crate) fn attr_to_string(&self, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> Result<String>
    {
        let reader = self
            .dwarf
            .attr_string(unit, value)
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        let owned = match reader.to_string() {
            Ok(cow) => cow.into_owned(),
            Err(_) => reader
                .to_string_lossy()
                .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
                .into_owned(),
        };
        Ok(owned)
    }

    /// Resolve an index into `.debug_addr` to an address.
    pub(crate) fn address(&self, unit: &Unit<OwnedReader>, index: DebugAddrIndex<usize>) -> Result<u64>
    {
        self.dwarf
            .address(unit, index)
            .map_err(|err| map_dwarf_error("resolving .debug_addr index", err))
    }
}

fn visit_key(unit: &Unit<OwnedReader>, offset: UnitOffset<usize>) -> (u8, usize, usize)
{
    match unit.header.offset() {
        UnitSectionOffset::DebugInfoOffset(base) => (0, base.0, offset.0),
        UnitSectionOffset::DebugTypesOffset(base) => (1, base.0, offset.0),
    }
}
