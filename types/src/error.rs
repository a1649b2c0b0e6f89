//! Validation errors for value types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount has more than {decimals} decimal places")]
    TooPrecise { decimals: u8 },

    #[error("amount overflow")]
    Overflow,

    #[error("decimals must be between 0 and {max}, got {got}")]
    InvalidDecimals { got: u8, max: u8 },

    #[error("invalid token name: {0}")]
    InvalidName(String),

    #[error("invalid token symbol: {0}")]
    InvalidSymbol(String),
}
