use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

use crate::account::LedgerError;

/// Commodity code attached to every amount, e.g. `USD` or `CAD`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, LedgerError> {
        let code = code.trim();
        if code.is_empty() || code.chars().any(char::is_whitespace) {
            return Err(LedgerError::InvalidCurrency(code.to_string()));
        }
        Ok(Currency(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::new(s)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decimal quantity of a single currency.
///
/// Equality compares the numeric value, so `10.0 USD == 10.00 USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    pub number: Decimal,
    pub currency: Currency,
}

impl Amount {
    pub fn new(number: Decimal, currency: Currency) -> Self {
        Amount { number, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Amount::new(Decimal::ZERO, currency)
    }

    pub fn is_zero(&self) -> bool {
        self.number.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.number.is_sign_negative() && !self.number.is_zero()
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount::new(-self.number, self.currency)
    }
}

impl Neg for &Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount::new(-self.number, self.currency.clone())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(s: &str) -> Amount {
        Amount::new(Decimal::from_str(s).unwrap(), Currency::new("USD").unwrap())
    }

    #[test]
    fn negation_flips_sign() {
        assert_eq!(-usd("4.50"), usd("-4.50"));
        assert_eq!(-&usd("-10"), usd("10"));
    }

    #[test]
    fn equality_is_numeric_and_structural() {
        assert_eq!(usd("10.0"), usd("10.00"));
        let cad = Amount::new(Decimal::from(10), Currency::new("CAD").unwrap());
        assert_ne!(usd("10"), cad);
    }

    #[test]
    fn decimal_sums_are_exact() {
        let total = usd("0.1").number + usd("0.2").number;
        assert_eq!(total, Decimal::from_str("0.3").unwrap());
    }

    #[test]
    fn zero_is_not_negative() {
        assert!(!usd("-0").is_negative());
        assert!(usd("-0.01").is_negative());
        assert!(usd("0.00").is_zero());
    }

    #[test]
    fn currency_rejects_blank_codes() {
        assert!(Currency::new("").is_err());
        assert!(Currency::new("US D").is_err());
        assert_eq!(Currency::new(" EUR ").unwrap().as_str(), "EUR");
    }

    #[test]
    fn display_formats_number_then_currency() {
        assert_eq!(usd("-4.50").to_string(), "-4.50 USD");
    }
}
