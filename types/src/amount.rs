//! Fixed-point amounts for the native currency and fungible tokens.
//!
//! Amounts are integers of base units (u128) tagged with the number of
//! decimal places the asset uses. There is no floating point anywhere:
//! `1.5 SOL` is `1_500_000_000` base units at 9 decimals.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TypesError;
use crate::token::MAX_DECIMALS;

/// Decimal places of the native currency (lamports per SOL = 10^9).
pub const NATIVE_DECIMALS: u8 = 9;

/// Display symbol of the native currency.
pub const NATIVE_SYMBOL: &str = "SOL";

/// A non-negative fixed-point amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AmountRepr")]
pub struct Amount {
    raw: u128,
    decimals: u8,
}

#[derive(Deserialize)]
struct AmountRepr {
    raw: u128,
    decimals: u8,
}

impl TryFrom<AmountRepr> for Amount {
    type Error = TypesError;

    fn try_from(repr: AmountRepr) -> Result<Self, Self::Error> {
        if repr.decimals > MAX_DECIMALS {
            return Err(TypesError::InvalidDecimals {
                got: repr.decimals,
                max: MAX_DECIMALS,
            });
        }
        Ok(Self::from_raw(repr.raw, repr.decimals))
    }
}

impl Amount {
    /// An amount from base units. `decimals` must not exceed [`MAX_DECIMALS`].
    pub fn from_raw(raw: u128, decimals: u8) -> Self {
        debug_assert!(decimals <= MAX_DECIMALS);
        Self { raw, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self::from_raw(0, decimals)
    }

    /// An amount of whole units (`1000` tokens, `2` SOL).
    pub fn from_whole(units: u64, decimals: u8) -> Self {
        Self::from_raw(units as u128 * scale(decimals), decimals)
    }

    /// A native-currency amount from lamports.
    pub fn lamports(lamports: u64) -> Self {
        Self::from_raw(lamports as u128, NATIVE_DECIMALS)
    }

    /// Parse a decimal string such as `"12"`, `"0.05"` or `"1000.000"`.
    ///
    /// Signs, exponents and separators are rejected. Fractional digits beyond
    /// `decimals` are accepted only when they are zeros.
    pub fn parse(text: &str, decimals: u8) -> Result<Self, TypesError> {
        if decimals > MAX_DECIMALS {
            return Err(TypesError::InvalidDecimals {
                got: decimals,
                max: MAX_DECIMALS,
            });
        }
        let text = text.trim();
        let (whole, frac) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(TypesError::InvalidAmount(format!("{text:?}")));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(TypesError::InvalidAmount(format!("{text:?}")));
        }

        let (kept, dropped) = frac.split_at(frac.len().min(decimals as usize));
        if dropped.bytes().any(|b| b != b'0') {
            return Err(TypesError::TooPrecise { decimals });
        }

        let whole_units: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| TypesError::Overflow)?
        };
        let mut frac_units: u128 = if kept.is_empty() {
            0
        } else {
            kept.parse().map_err(|_| TypesError::Overflow)?
        };
        frac_units *= scale(decimals - kept.len() as u8);

        let raw = whole_units
            .checked_mul(scale(decimals))
            .and_then(|w| w.checked_add(frac_units))
            .ok_or(TypesError::Overflow)?;
        Ok(Self { raw, decimals })
    }

    pub fn raw(&self) -> u128 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Add two amounts of the same scale. `None` on overflow or scale mismatch.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        if self.decimals != other.decimals {
            return None;
        }
        self.raw.checked_add(other.raw).map(|raw| Self { raw, ..self })
    }

    /// Subtract two amounts of the same scale. `None` on underflow or scale mismatch.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        if self.decimals != other.decimals {
            return None;
        }
        self.raw.checked_sub(other.raw).map(|raw| Self { raw, ..self })
    }

    /// Express this amount with a different number of decimals.
    ///
    /// Fails with [`TypesError::TooPrecise`] when significant digits would be
    /// lost, and with [`TypesError::Overflow`] when scaling up overflows.
    pub fn rescale(self, decimals: u8) -> Result<Self, TypesError> {
        if decimals > MAX_DECIMALS {
            return Err(TypesError::InvalidDecimals {
                got: decimals,
                max: MAX_DECIMALS,
            });
        }
        if decimals >= self.decimals {
            let raw = self
                .raw
                .checked_mul(scale(decimals - self.decimals))
                .ok_or(TypesError::Overflow)?;
            return Ok(Self { raw, decimals });
        }
        let divisor = scale(self.decimals - decimals);
        if self.raw % divisor != 0 {
            return Err(TypesError::TooPrecise { decimals });
        }
        Ok(Self {
            raw: self.raw / divisor,
            decimals,
        })
    }
}

fn scale(decimals: u8) -> u128 {
    10u128.pow(decimals as u32)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = scale(self.decimals);
        let whole = self.raw / unit;
        let frac = self.raw % unit;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{:0width$}", frac, width = self.decimals as usize);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}
