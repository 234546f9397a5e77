//! Error types for protocol parsing

use thiserror::Error;

/// Errors that can occur while parsing protocol data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Scan response contained a token that is not an integer
    #[error("non-numeric token in scan response: {0:?}")]
    BadScanToken(String),

    /// Scan response contained an address that does not fit the address type
    #[error("address out of range: {0}")]
    AddressOutOfRange(String),
}
