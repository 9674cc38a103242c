use alloy_primitives::{Address, B256, U256};
use std::str::FromStr;

use crate::error::ConnectorError;

/// A trait for parsing primitive types from foreign bindings.
///
/// Hosts hand addresses, hashes and key coordinates across the FFI boundary as
/// strings or raw bytes. This trait turns them into typed values and reports which
/// attribute was at fault when they do not parse.
///
/// # Examples
/// ```rust,ignore
/// let factory = Address::parse_from_ffi("0x1234567890abcdef", "factory_address")?;
/// ```
///
/// # Errors
/// - `ConnectorError::InvalidInput` if the provided string does not parse.
pub trait ParseFromForeignBinding {
    fn parse_from_ffi(s: &str, attr: &'static str) -> Result<Self, ConnectorError>
    where
        Self: Sized;
}

impl ParseFromForeignBinding for Address {
    fn parse_from_ffi(s: &str, attr: &'static str) -> Result<Self, ConnectorError> {
        Self::from_str(s.trim()).map_err(|e| ConnectorError::InvalidInput {
            attribute: attr.to_string(),
            reason: e.to_string(),
        })
    }
}

impl ParseFromForeignBinding for U256 {
    fn parse_from_ffi(s: &str, attr: &'static str) -> Result<Self, ConnectorError> {
        let invalid = |reason: String| ConnectorError::InvalidInput {
            attribute: attr.to_string(),
            reason,
        };
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > 64 {
            return Err(invalid(format!(
                "expected 1 to 64 hex digits, got {}",
                digits.len()
            )));
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid("not a hex string".to_string()));
        }
        Self::from_str_radix(digits, 16).map_err(|e| invalid(e.to_string()))
    }
}

/// Parses a 32-byte hash handed over as raw bytes.
pub fn parse_hash_bytes(
    bytes: &[u8],
    attr: &'static str,
) -> Result<B256, ConnectorError> {
    B256::try_from(bytes).map_err(|_| ConnectorError::InvalidInput {
        attribute: attr.to_string(),
        reason: format!("expected 32 bytes, got {}", bytes.len()),
    })
}

/// Formats a `U256` as a `0x`-prefixed hex string padded to 32 bytes.
#[must_use]
pub fn to_padded_hex(value: U256) -> String {
    format!("{value:#066x}")
}
