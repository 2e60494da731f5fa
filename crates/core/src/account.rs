use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Root of a ledger account name, the component before the first `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Assets,
    Liabilities,
    Equity,
    Income,
    Expenses,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Assets => write!(f, "Assets"),
            AccountType::Liabilities => write!(f, "Liabilities"),
            AccountType::Equity => write!(f, "Equity"),
            AccountType::Income => write!(f, "Income"),
            AccountType::Expenses => write!(f, "Expenses"),
        }
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Assets" => Ok(AccountType::Assets),
            "Liabilities" => Ok(AccountType::Liabilities),
            "Equity" => Ok(AccountType::Equity),
            "Income" => Ok(AccountType::Income),
            "Expenses" => Ok(AccountType::Expenses),
            other => Err(LedgerError::InvalidAccount(other.to_string())),
        }
    }
}

/// Checks that `name` is a well-formed account such as `Assets:Chase:Checking`
/// and returns its root type.
///
/// Every component after the root must start with an uppercase letter or a
/// digit and contain only letters, digits and `-`.
pub fn account_type(name: &str) -> Result<AccountType, LedgerError> {
    let mut components = name.split(':');
    let root = components.next().unwrap_or_default();
    let kind = root
        .parse::<AccountType>()
        .map_err(|_| LedgerError::InvalidAccount(name.to_string()))?;

    let mut depth = 0;
    for component in components {
        depth += 1;
        let mut chars = component.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit());
        let valid_rest = chars.all(|c| c.is_alphanumeric() || c == '-');
        if !valid_start || !valid_rest {
            return Err(LedgerError::InvalidAccount(name.to_string()));
        }
    }
    if depth == 0 {
        return Err(LedgerError::InvalidAccount(name.to_string()));
    }

    Ok(kind)
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("Invalid account name: {0}")]
    InvalidAccount(String),
    #[error("Invalid currency code: '{0}'")]
    InvalidCurrency(String),
    #[error("Invalid flag: '{0}' (expected a single character)")]
    InvalidFlag(String),
}
