use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use std::path::Path;

use beanimport_core::{Meta, MetaValue, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::importer::{AccountContext, FileIdentifier, RowExtractor, Statement, StatementKind};
use crate::row::{parse_date, parse_decimal, Row, RowError};
use crate::source::pdf::TableAnchors;
use crate::source::{self, SourceError};

use super::single_posting;

const FILE_PATTERN: &str = r"^(\d+) .* Statement.pdf";
const YEAR_PATTERN: &str = r"\b((?:19|20)\d{2})\b";

const ANCHORS: TableAnchors<'static> = TableAnchors {
    header: "Activity details",
    footer: "Equitable Bank Towe",
};

/// EQ Bank monthly PDF statement.
pub struct EqBank {
    ctx: AccountContext,
    file_name: Regex,
    year: Regex,
}

impl EqBank {
    pub fn new(definition: &AccountDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            file_name: Regex::new(FILE_PATTERN)?,
            year: Regex::new(YEAR_PATTERN)?,
        })
    }

    /// Year printed in the statement's file name, if any.
    fn statement_year(&self, meta: &Meta) -> Option<i32> {
        let Some(MetaValue::Text(filename)) = meta.get("filename") else {
            return None;
        };
        let base = Path::new(filename).file_name()?.to_str()?;
        self.year.captures(base)?.get(1)?.as_str().parse().ok()
    }

    /// Statement rows print `Mar 4` with no year. The year comes from the
    /// file name, falling back to the current year.
    fn row_date(&self, row: &Row, meta: &Meta) -> Result<NaiveDate, RowError> {
        let text = row.text("Date")?;
        if let Some(date) = parse_date(&text) {
            return Ok(date);
        }
        let year = self
            .statement_year(meta)
            .unwrap_or_else(|| Local::now().year());
        NaiveDate::parse_from_str(&format!("{} {year}", text.trim()), "%b %d %Y").map_err(|_| {
            RowError::InvalidDate {
                column: "Date".to_string(),
                value: text,
            }
        })
    }
}

/// Withdrawals are printed as `-$12.34` in their own column.
fn signed_amount(row: &Row) -> Result<Decimal, RowError> {
    let Some(withdrawal) = row.opt_text("Withdrawals") else {
        return row.decimal("Deposits");
    };
    let digits = withdrawal.trim_matches(|c: char| matches!(c, '-' | ' ' | '$'));
    parse_decimal(digits)
        .map(|n| -n)
        .ok_or_else(|| RowError::InvalidAmount {
            column: "Withdrawals".to_string(),
            value: withdrawal.clone(),
        })
}

impl FileIdentifier for EqBank {
    fn identify(&self, file_name: &str) -> bool {
        self.ctx.matches_file(&self.file_name, file_name)
    }
}

impl RowExtractor for EqBank {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError> {
        let date = self.row_date(row, &meta)?;
        let narration = row.text("Description")?;
        let units = self.ctx.amount(signed_amount(row)?)?;

        Ok(Some(single_posting(&self.ctx, meta, date, &narration, None, units)))
    }
}

impl Statement for EqBank {
    const KIND: StatementKind = StatementKind {
        key: "eq",
        default_currency: Some("CAD"),
        requires_lastfour: false,
    };

    fn context(&self) -> &AccountContext {
        &self.ctx
    }

    fn load(&self, path: &Path) -> Result<Vec<Row>, SourceError> {
        source::pdf::read_path(path, ANCHORS)
    }
}
