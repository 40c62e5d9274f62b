//! Binary image loading: file bytes, debug sections, ELF symbols.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use tracing::debug;

use crate::error::{map_dwarf_error, Result, SymbolError};
use crate::symbols::elf::{self, RawElfSymbol};
use crate::symbols::{OwnedDwarf, OwnedReader};

/// The DWARF sections the resolver reads. Missing sections are served to
/// gimli as empty readers.
const DWARF_SECTIONS: &[&str] = &[
    ".debug_abbrev",
    ".debug_addr",
    ".debug_info",
    ".debug_line",
    ".debug_line_str",
    ".debug_ranges",
    ".debug_rnglists",
    ".debug_str",
    ".debug_str_offsets",
    ".debug_types",
];

/// An ELF binary with its debug sections and symbol records extracted
///
/// Everything is copied out of the mapped file during [`parse`], so the
/// image owns plain `Arc<[u8]>` blobs and no borrowed object handles.
///
/// [`parse`]: BinaryImage::parse
pub(crate) struct BinaryImage
{
    path: PathBuf,
    endian: RunTimeEndian,
    debug_sections: HashMap<&'static str, Arc<[u8]>>,
    elf_symbols: Vec<RawElfSymbol>,
    has_debug_info: bool,
}

impl BinaryImage
{
    pub(crate) fn parse(path: &Path) -> Result<Self>
    {
        if !path.exists() {
            return Err(SymbolError::BinaryNotFound(path.to_path_buf()));
        }

        let bytes = fs::read(path)?;
        let data = Arc::<[u8]>::from(bytes);
        let file = object::File::parse(&*data)?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut sections = HashMap::new();
        for name in DWARF_SECTIONS {
            sections.insert(*name, load_section_bytes(&file, name)?);
        }

        let has_debug_info = sections
            .get(".debug_info")
            .map(|data| !data.is_empty())
            .unwrap_or(false);

        let elf_symbols = elf::collect_symbols(&file);
        debug!(
            "parsed {}: {} ELF function symbols, debug info: {}",
            path.display(),
            elf_symbols.len(),
            has_debug_info
        );

        Ok(Self {
            path: path.to_path_buf(),
            endian,
            debug_sections: sections,
            elf_symbols,
            has_debug_info,
        })
    }

    pub(crate) fn path(&self) -> &Path
    {
        &self.path
    }

    pub(crate) fn elf_symbols(&self) -> &[RawElfSymbol]
    {
        &self.elf_symbols
    }

    pub(crate) fn has_debug_info(&self) -> bool
    {
        self.has_debug_info
    }

    /// Build the DWARF handle over the captured sections
    ///
    /// ## Errors
    ///
    /// [`SymbolError::NoDebugInfo`] when the binary has no `.debug_info`.
    pub(crate) fn load_dwarf(&self) -> Result<OwnedDwarf>
    {
        if !self.has_debug_info {
            return Err(SymbolError::NoDebugInfo);
        }

        Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)))
            .map_err(|err| map_dwarf_error("loading DWARF sections", err))
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .debug_sections
            .get(id.name())
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }
}

fn load_section_bytes<'data>(file: &object::File<'data>, name: &str) -> Result<Arc<[u8]>>
{
    if let Some(section) = file.section_by_name(name) {
        let data = section.uncompressed_data()?;
        return Ok(match data {
            Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
            Cow::Owned(vec) => vec.into(),
        });
    }

    Ok(Arc::<[u8]>::from(Vec::new()))
}
