use chrono::NaiveDateTime;
use regex::Regex;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use beanimport_core::{Amount, Currency, Flag, Meta, Posting, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::importer::{AccountContext, FileIdentifier, RowExtractor, Statement, StatementKind};
use crate::row::{Row, RowError};
use crate::source::{self, SourceError};

const FILE_PATTERN: &str = r"^(balance|transaction)_history_[-\w\d_ ]+.csv$";
const DATE_FORMAT: &str = "%b %d, %Y %I:%M %p";

const RECEIVED: &str = "Amount received";
const SENT: &str = "Amount sent";

const TRANSFER_ACCOUNT: &str = "Equity:Transfer";
const UNKNOWN_ACCOUNT: &str = "Expenses:Unknown";

/// Remitbee money transfer history. Deposits and transfers share one file;
/// the `Recipient` column tells them apart.
pub struct Remitbee {
    ctx: AccountContext,
    file_name: Regex,
}

impl Remitbee {
    pub fn new(definition: &AccountDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            file_name: Regex::new(FILE_PATTERN)?,
        })
    }
}

/// `"1,234.50 CAD"` into an amount.
fn parse_money(row: &Row, column: &str) -> Result<Amount, RowError> {
    let raw = row.text(column)?;
    let invalid = || RowError::InvalidAmount {
        column: column.to_string(),
        value: raw.clone(),
    };

    let mut parts = raw.split_whitespace();
    let (Some(number), Some(currency), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let number = Decimal::from_str(&number.replace(',', "")).map_err(|_| invalid())?;
    Ok(Amount::new(number, Currency::new(currency)?))
}

impl FileIdentifier for Remitbee {
    fn identify(&self, file_name: &str) -> bool {
        self.file_name.is_match(file_name)
    }
}

impl RowExtractor for Remitbee {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError> {
        let recipient = row.text("Recipient")?;
        if recipient == SENT {
            return Ok(None);
        }

        let raw_date = row.text("Date")?;
        let date = NaiveDateTime::parse_from_str(raw_date.trim(), DATE_FORMAT)
            .map_err(|_| RowError::InvalidDate {
                column: "Date".to_string(),
                value: raw_date.clone(),
            })?
            .date();
        let received = parse_money(row, RECEIVED)?;

        if recipient == RECEIVED {
            let postings = vec![
                Posting::new(&self.ctx.account, received.clone()),
                Posting::new(TRANSFER_ACCOUNT, -received),
            ];
            return Ok(Some(Transaction::build(meta, date, "Deposit", None, postings)));
        }

        let sent = parse_money(row, SENT)?;
        let rate = sent
            .number
            .checked_div(received.number)
            .ok_or_else(|| RowError::InvalidAmount {
                column: RECEIVED.to_string(),
                value: received.to_string(),
            })?;
        let price = Amount::new(rate, sent.currency.clone());

        // The priced leg cannot take a categorised account without a
        // negative price, so it lands on an unknown account flagged for review.
        let postings = vec![
            Posting::new(UNKNOWN_ACCOUNT, received)
                .with_price(price)
                .with_flag(Some(Flag::WARNING)),
            Posting::new(&self.ctx.account, -sent),
        ];
        let narration = format!("TRF to {} in {}", recipient, row.text("Country")?);
        Ok(Some(Transaction::build(meta, date, &narration, None, postings)))
    }
}

impl Statement for Remitbee {
    const KIND: StatementKind = StatementKind {
        key: "remitbee",
        default_currency: None,
        requires_lastfour: false,
    };

    fn context(&self) -> &AccountContext {
        &self.ctx
    }

    fn load(&self, path: &Path) -> Result<Vec<Row>, SourceError> {
        source::csv::read_path(path)
    }
}
