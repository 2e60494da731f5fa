use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::{debug, info, warn};

use beanimport_core::{new_metadata, Amount, Currency, Meta, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::error::ImportError;
use crate::patterns::PatternSet;
use crate::row::{Row, RowError};
use crate::source::SourceError;

/// Recognises an institution's export by its file name.
pub trait FileIdentifier {
    /// `file_name` is the basename, without directories.
    fn identify(&self, file_name: &str) -> bool;
}

/// Turns one row of an institution's export into a transaction.
/// `Ok(None)` skips the row.
pub trait RowExtractor {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError>;
}

/// What happens to a file when one of its rows fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowErrorPolicy {
    #[default]
    Abort,
    /// Log the row and carry on with the rest of the file.
    Skip,
}

/// Fixed facts about an institution's export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementKind {
    pub key: &'static str,
    pub default_currency: Option<&'static str>,
    pub requires_lastfour: bool,
}

/// A per-institution adapter usable by [`RowImporter`].
pub trait Statement: FileIdentifier + RowExtractor + Send + Sync {
    const KIND: StatementKind;

    fn context(&self) -> &AccountContext;

    fn load(&self, path: &Path) -> Result<Vec<Row>, SourceError>;

    fn row_error_policy(&self) -> RowErrorPolicy {
        RowErrorPolicy::Abort
    }
}

/// The configured account a statement posts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    pub account: String,
    pub currency: Option<Currency>,
    pub lastfour: Option<String>,
}

impl AccountContext {
    /// Validates a configured account against an institution's requirements.
    /// Fails when a last-four discriminator is not exactly four digits, or
    /// when the institution needs one and none was given.
    pub fn new(kind: &StatementKind, definition: &AccountDefinition) -> Result<Self, ConfigError> {
        beanimport_core::account_type(&definition.account)?;

        let lastfour = definition
            .lastfour
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        if let Some(digits) = &lastfour {
            if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ConfigError::InvalidLastFour {
                    institution: kind.key.to_string(),
                    account: definition.account.clone(),
                    lastfour: digits.clone(),
                });
            }
        }
        if kind.requires_lastfour && lastfour.is_none() {
            return Err(ConfigError::MissingLastFour {
                institution: kind.key.to_string(),
                account: definition.account.clone(),
            });
        }

        let currency = definition
            .currency
            .as_deref()
            .or(kind.default_currency)
            .map(Currency::new)
            .transpose()?;

        Ok(Self {
            account: definition.account.clone(),
            currency,
            lastfour,
        })
    }

    /// Amount in the account's currency.
    pub fn amount(&self, number: Decimal) -> Result<Amount, RowError> {
        let currency = self.currency.clone().ok_or(RowError::NoCurrency)?;
        Ok(Amount::new(number, currency))
    }

    /// True when `regex` matches the file name and, if the regex captures an
    /// account number and a last-four is configured, the capture ends with it.
    pub fn matches_file(&self, regex: &Regex, file_name: &str) -> bool {
        let Some(captures) = regex.captures(file_name) else {
            return false;
        };
        match (captures.get(1), self.lastfour.as_deref()) {
            (Some(number), Some(lastfour)) => number.as_str().ends_with(lastfour),
            _ => true,
        }
    }
}

/// Object-safe facade over every importer.
pub trait Importer: Send + Sync {
    /// `"<institution>.<account>"`.
    fn name(&self) -> String;

    fn account(&self) -> &str;

    fn identify(&self, path: &Path) -> bool;

    fn extract(&self, path: &Path) -> Result<Vec<Transaction>, ImportError>;

    /// Latest transaction date in the file.
    fn file_date(&self, path: &Path) -> Result<Option<NaiveDate>, ImportError> {
        Ok(self.extract(path)?.iter().map(|tx| tx.date).max())
    }
}

pub(crate) fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Load rows, extract each, drop skips, then add at most one pattern
/// posting per transaction.
pub struct RowImporter<S> {
    statement: S,
    patterns: PatternSet,
}

impl<S: Statement> RowImporter<S> {
    pub fn new(statement: S, patterns: PatternSet) -> Self {
        Self {
            statement,
            patterns,
        }
    }

    pub fn statement(&self) -> &S {
        &self.statement
    }

    pub fn extract_rows(&self, rows: &[Row], filename: &str) -> Result<Vec<Transaction>, ImportError> {
        let policy = self.statement.row_error_policy();
        let mut transactions = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            match self.statement.extract_row(row, new_metadata(filename, index)) {
                Ok(Some(tx)) => transactions.push(tx),
                Ok(None) => debug!(file = filename, index, "row skipped"),
                Err(e) if policy == RowErrorPolicy::Skip => {
                    warn!(file = filename, index, error = %e, "dropping unparseable row");
                }
                Err(source) => {
                    return Err(ImportError::Row {
                        path: filename.to_string(),
                        index,
                        source,
                    })
                }
            }
        }

        let mut tagged = 0;
        for tx in &mut transactions {
            if self.patterns.apply(tx) {
                tagged += 1;
            }
        }
        info!(
            file = filename,
            transactions = transactions.len(),
            tagged,
            "extracted {}",
            S::KIND.key
        );

        Ok(transactions)
    }
}

impl<S: Statement> Importer for RowImporter<S> {
    fn name(&self) -> String {
        format!("{}.{}", S::KIND.key, self.statement.context().account)
    }

    fn account(&self) -> &str {
        &self.statement.context().account
    }

    fn identify(&self, path: &Path) -> bool {
        let identified = self.statement.identify(file_name(path));
        if identified {
            debug!(file = %path.display(), importer = %self.name(), "identified");
        }
        identified
    }

    fn extract(&self, path: &Path) -> Result<Vec<Transaction>, ImportError> {
        let filename = path.display().to_string();
        let rows = self.statement.load(path).map_err(|source| ImportError::Source {
            path: filename.clone(),
            source,
        })?;
        self.extract_rows(&rows, &filename)
    }
}
