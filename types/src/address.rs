//! Base58 account address (wallets, token mints, counterparties).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Characters of the Bitcoin base58 alphabet.
const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// An account address, a 32-byte public key rendered as base58.
///
/// Only the textual shape is checked (alphabet and length); the crate never
/// decodes the key itself.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub const MIN_LEN: usize = 32;
    pub const MAX_LEN: usize = 44;

    /// Parse and validate an address string.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s: String = raw.into();
        let trimmed = s.trim();
        if trimmed.len() < Self::MIN_LEN || trimmed.len() > Self::MAX_LEN {
            return Err(TypesError::InvalidAddress(format!(
                "expected {}-{} characters, got {}",
                Self::MIN_LEN,
                Self::MAX_LEN,
                trimmed.len()
            )));
        }
        if let Some(bad) = trimmed.bytes().find(|b| !BASE58_ALPHABET.contains(b)) {
            return Err(TypesError::InvalidAddress(format!(
                "character {:?} is not base58",
                bad as char
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Derive a well-formed address from a 32-byte digest.
    ///
    /// Each byte selects one alphabet character, so the result is a valid
    /// address string but not the base58 encoding of `digest`.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let s = digest
            .iter()
            .map(|b| BASE58_ALPHABET[(*b as usize) % BASE58_ALPHABET.len()] as char)
            .collect();
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_real_mint_address() {
        let addr = Address::parse("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
        assert_eq!(addr.as_str(), "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let addr = Address::parse("  7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU\n").unwrap();
        assert_eq!(addr.as_str().len(), 44);
    }

    #[test]
    fn rejects_short_and_empty() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse("abc").is_err());
    }

    #[test]
    fn rejects_non_base58_characters() {
        // '0', 'O', 'I' and 'l' are excluded from base58
        let err = Address::parse("0PjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap_err();
        assert!(matches!(err, TypesError::InvalidAddress(_)));
    }

    #[test]
    fn digest_derived_address_is_valid() {
        let addr = Address::from_digest(&[0xAB; 32]);
        assert!(Address::parse(addr.as_str()).is_ok());
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<Address, _> =
            serde_json::from_str("\"7iAZfkr5gWTa9xJqNsXQXnbZmgPZRfny3ABF6TJ5Xjef\"");
        assert!(ok.is_ok());
        let bad: Result<Address, _> = serde_json::from_str("\"not-an-address\"");
        assert!(bad.is_err());
    }
}
