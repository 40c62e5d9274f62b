//! Core value types shared across the crate.

pub mod range;
pub mod symbol;

pub use range::AddressRange;
pub use symbol::{Symbol, SymbolLanguage, SymbolName};
