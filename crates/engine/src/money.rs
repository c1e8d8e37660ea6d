use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Currency, EngineError, ResultEngine};

/// Signed money amount represented as integer **minor units** of a currency.
///
/// Use this type when amounts cross a human boundary (CSV export, CLI
/// output, parsing user input). Storage always uses the raw `i64`.
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
///
/// let amount = Money::new(12_34, Currency::Eur);
/// assert_eq!(amount.to_string(), "12.34 EUR");
/// assert_eq!(Money::new(500, Currency::Jpy).to_string(), "500 JPY");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects
/// more decimals than the currency has):
///
/// ```rust
/// use engine::{Currency, Money};
///
/// assert_eq!(Money::parse("10", Currency::Eur).unwrap().amount_minor(), 1000);
/// assert_eq!(Money::parse("10,5", Currency::Eur).unwrap().amount_minor(), 1050);
/// assert!(Money::parse("12.345", Currency::Eur).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: Currency,
}

impl Money {
    #[must_use]
    pub const fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    #[must_use]
    pub const fn amount_minor(self) -> i64 {
        self.amount_minor
    }

    #[must_use]
    pub const fn currency(self) -> Currency {
        self.currency
    }

    /// Formats the amount in major units without the currency code
    /// (`-10.50`, `1200`).
    #[must_use]
    pub fn format_major(self) -> String {
        let sign = if self.amount_minor < 0 { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        let digits = u32::from(self.currency.minor_units());
        if digits == 0 {
            return format!("{sign}{abs}");
        }
        let factor = 10u64.pow(digits);
        let major = abs / factor;
        let minor = abs % factor;
        format!("{sign}{major}.{minor:0width$}", width = digits as usize)
    }

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    pub fn parse(s: &str, currency: Currency) -> ResultEngine<Self> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest = rest.trim().replace(',', ".");
        if rest.is_empty() {
            return Err(empty());
        }

        let mut parts = rest.split('.');
        let major_str = parts.next().ok_or_else(invalid)?;
        let minor_str = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        if major_str.is_empty() || !major_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let major: i64 = major_str.parse().map_err(|_| overflow())?;

        let digits = usize::from(currency.minor_units());
        let minor: i64 = match minor_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                if frac.len() > digits {
                    return Err(EngineError::InvalidAmount("too many decimals".to_string()));
                }
                let padded = format!("{frac:0<digits$}");
                padded.parse().map_err(|_| invalid())?
            }
        };

        let factor = 10i64.pow(u32::from(currency.minor_units()));
        let total = major
            .checked_mul(factor)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(overflow)?;

        let amount_minor = if negative {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(Self::new(amount_minor, currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.format_major(), self.currency.code())
    }
}
