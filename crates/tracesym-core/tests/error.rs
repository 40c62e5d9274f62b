//! Tests for error handling

use std::path::PathBuf;

use tracesym_core::error::{Result, SymbolError};

#[test]
fn test_binary_not_found_display()
{
    let error = SymbolError::BinaryNotFound(PathBuf::from("/no/such/binary"));
    let message = format!("{}", error);
    assert!(message.contains("/no/such/binary"));
}

#[test]
fn test_no_debug_info_display()
{
    let error = SymbolError::NoDebugInfo;
    let message = format!("{}", error);
    assert!(message.contains("debug information"));
}

#[test]
fn test_invalid_range_attribute_display()
{
    let error = SymbolError::InvalidRangeAttribute("offset pair without a base address");
    let message = format!("{}", error);
    assert!(message.contains("offset pair without a base address"));
}

#[test]
fn test_cyclic_reference_carries_offset()
{
    let error = SymbolError::CyclicReference(0x1234);
    let message = format!("{}", error);
    assert!(message.contains("0x1234"));
}

#[test]
fn test_missing_abstract_origin_carries_offset()
{
    let error = SymbolError::MissingAbstractOrigin(0xdead);
    let message = format!("{}", error);
    assert!(message.contains("0xdead"));
}

#[test]
fn test_io_error_conversion()
{
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error: SymbolError = io_err.into();
    assert!(matches!(error, SymbolError::Io(_)));
}

#[test]
fn test_result_alias()
{
    fn returns_unit() -> Result<()>
    {
        Ok(())
    }
    assert!(returns_unit().is_ok());
}
