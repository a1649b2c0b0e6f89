//! Token holdings and the validation rules for token metadata.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::Amount;
use crate::error::TypesError;

/// Largest number of decimal places a token may use.
pub const MAX_DECIMALS: u8 = 9;

/// Longest accepted token symbol, in characters.
pub const MAX_SYMBOL_LEN: usize = 5;

/// Longest accepted token name, in characters.
pub const MAX_NAME_LEN: usize = 32;

/// A balance of one fungible token owned by the connected wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHolding {
    /// Mint address; unique within a session's holdings.
    pub address: Address,
    pub name: String,
    /// Upper-case ticker.
    pub symbol: String,
    pub decimals: u8,
    /// Always expressed with `decimals` decimal places.
    pub balance: Amount,
}

impl TokenHolding {
    /// Build a holding, validating the metadata and rescaling `balance` to
    /// the token's decimals.
    pub fn new(
        address: Address,
        name: &str,
        symbol: &str,
        decimals: u8,
        balance: Amount,
    ) -> Result<Self, TypesError> {
        let decimals = validate_decimals(decimals)?;
        Ok(Self {
            address,
            name: validate_name(name)?,
            symbol: normalize_symbol(symbol)?,
            decimals,
            balance: balance.rescale(decimals)?,
        })
    }

    /// A freshly created token with zero balance.
    pub fn empty(
        address: Address,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> Result<Self, TypesError> {
        Self::new(address, name, symbol, decimals, Amount::zero(decimals))
    }
}

/// Trim a token name and check it is non-empty and not too long.
pub fn validate_name(name: &str) -> Result<String, TypesError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TypesError::InvalidName("name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(TypesError::InvalidName(format!(
            "at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Upper-case a ticker and check it is 1..=5 ASCII alphanumerics.
pub fn normalize_symbol(symbol: &str) -> Result<String, TypesError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(TypesError::InvalidSymbol("symbol is required".into()));
    }
    if symbol.chars().count() > MAX_SYMBOL_LEN {
        return Err(TypesError::InvalidSymbol(format!(
            "at most {MAX_SYMBOL_LEN} characters"
        )));
    }
    if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(TypesError::InvalidSymbol(format!(
            "{symbol:?} must be letters and digits"
        )));
    }
    Ok(symbol.to_ascii_uppercase())
}

pub fn validate_decimals(decimals: u8) -> Result<u8, TypesError> {
    if decimals > MAX_DECIMALS {
        return Err(TypesError::InvalidDecimals {
            got: decimals,
            max: MAX_DECIMALS,
        });
    }
    Ok(decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mint() -> Address {
        Address::parse("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU").unwrap()
    }

    #[test]
    fn symbol_is_upper_cased() {
        let token = TokenHolding::empty(mint(), "My Token", "mtk", 9).unwrap();
        assert_eq!(token.symbol, "MTK");
        assert_eq!(token.decimals, 9);
        assert!(token.balance.is_zero());
    }

    #[test]
    fn rejects_bad_metadata() {
        assert!(TokenHolding::empty(mint(), "", "MTK", 9).is_err());
        assert!(TokenHolding::empty(mint(), "   ", "MTK", 9).is_err());
        assert!(TokenHolding::empty(mint(), "My Token", "", 9).is_err());
        assert!(TokenHolding::empty(mint(), "My Token", "TOOLONG", 9).is_err());
        assert!(TokenHolding::empty(mint(), "My Token", "M-K", 9).is_err());
        assert!(TokenHolding::empty(mint(), "My Token", "MTK", 10).is_err());
    }

    #[test]
    fn balance_is_rescaled_to_token_decimals() {
        let token =
            TokenHolding::new(mint(), "Samo", "samo", 9, Amount::from_whole(1000, 0)).unwrap();
        assert_eq!(token.balance.decimals(), 9);
        assert_eq!(token.balance.to_string(), "1000");
    }
}
