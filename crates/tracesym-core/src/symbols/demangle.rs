//! Symbol-name demangling.

use cpp_demangle::DemangleOptions;
use rustc_demangle::try_demangle;

use crate::types::{SymbolLanguage, SymbolName};

/// Demangle a raw linkage name and tag its language.
///
/// Rust names (legacy `_ZN...` and v0 `_R...`) go through
/// `rustc-demangle`; Itanium C++ names through `cpp_demangle`. Anything
/// neither demangler accepts is kept raw.
pub(crate) fn make_symbol_name(raw: String) -> SymbolName
{
    if let Some(demangled) = try_demangle(&raw).ok().map(|d| d.to_string()) {
        return SymbolName::new(raw, Some(demangled), SymbolLanguage::Rust);
    }

    if raw.starts_with("_Z") || raw.starts_with("__Z") {
        let demangled = cpp_demangle::Symbol::new(raw.as_bytes())
            .ok()
            .and_then(|symbol| symbol.demangle(&DemangleOptions::default()).ok());
        return SymbolName::new(raw, demangled, SymbolLanguage::Cpp);
    }

    let language = if raw.contains("::") {
        SymbolLanguage::Rust
    } else {
        SymbolLanguage::Unknown
    };
    SymbolName::new(raw, None, language)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_rust_legacy_mangling()
    {
        let name = make_symbol_name("_ZN4core3fmt5Write9write_fmt17h1d1a2f4b8c3e5a6bE".to_string());
        assert_eq!(name.language(), SymbolLanguage::Rust);
        assert!(name.display().starts_with("core::fmt::Write::write_fmt"));
    }

    #[test]
    fn test_cpp_mangling()
    {
        let name = make_symbol_name("_ZN3foo3barEv".to_string());
        assert_eq!(name.language(), SymbolLanguage::Cpp);
        assert_eq!(name.display(), "foo::bar()");
    }

    #[test]
    fn test_plain_c_name_kept_raw()
    {
        let name = make_symbol_name("main".to_string());
        assert_eq!(name.language(), SymbolLanguage::Unknown);
        assert_eq!(name.display(), "main");
        assert_eq!(name.raw(), "main");
    }

    #[test]
    fn test_already_readable_rust_path()
    {
        let name = make_symbol_name("alloc::vec::Vec<T>::push".to_string());
        assert_eq!(name.language(), SymbolLanguage::Rust);
        assert_eq!(name.display(), "alloc::vec::Vec<T>::push");
    }
}
