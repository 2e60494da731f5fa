use regex::Regex;
use std::path::Path;

use beanimport_core::{Meta, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::importer::{AccountContext, FileIdentifier, RowExtractor, Statement, StatementKind};
use crate::row::{Row, RowError};
use crate::source::{self, SourceError};

use super::single_posting;

const FILE_PATTERN: &str = r"(?i)^Chase(\d{4})_Activity(?:\d+_)*\d+.CSV";

const ACH_PATTERN: &str = r"(?i)ORIG CO NAME:(.+?)\s*ORIG ID:.*DESC DATE:.*CO ENTRY DESCR:(.+?)\s*SEC:.*TRACE#:.*EED:.*";
const OUTBOUND_PATTERN: &str = r"(?i)Online Transfer \d+ to (.+?)\s*transaction #";
const INBOUND_PATTERN: &str = r"(?i)Online Transfer \d+ from (.+?)\s*transaction #";
const WEB_ID_PATTERN: &str = r"(?i)(.+?)\s+(PPD|WEB) ID: \d+";

/// Chase checking/savings activity download. One file per account,
/// distinguished by the last four digits in the file name.
pub struct Chase {
    ctx: AccountContext,
    file_name: Regex,
    ach: Regex,
    outbound: Regex,
    inbound: Regex,
    web_id: Regex,
}

impl Chase {
    pub fn new(definition: &AccountDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            file_name: Regex::new(FILE_PATTERN)?,
            ach: Regex::new(ACH_PATTERN)?,
            outbound: Regex::new(OUTBOUND_PATTERN)?,
            inbound: Regex::new(INBOUND_PATTERN)?,
            web_id: Regex::new(WEB_ID_PATTERN)?,
        })
    }

    /// Splits a bank description into payee and narration.
    fn parse_description(&self, description: &str) -> (Option<String>, String) {
        if let Some(c) = self.ach.captures(description) {
            return (Some(c[1].to_string()), c[2].to_string());
        }
        for transfer in [&self.outbound, &self.inbound] {
            if let Some(c) = transfer.captures(description) {
                return (Some(c[1].to_string()), description.to_string());
            }
        }
        if let Some(c) = self.web_id.captures(description) {
            return (None, c[1].to_string());
        }
        (None, description.to_string())
    }
}

impl FileIdentifier for Chase {
    fn identify(&self, file_name: &str) -> bool {
        self.ctx.matches_file(&self.file_name, file_name)
    }
}

impl RowExtractor for Chase {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError> {
        let date = row.date("Posting Date")?;
        let (payee, narration) = self.parse_description(&row.text("Description")?);
        let units = self.ctx.amount(row.decimal("Amount")?)?;
        if units.is_zero() {
            return Ok(None);
        }

        Ok(Some(single_posting(
            &self.ctx,
            meta,
            date,
            &narration,
            payee.as_deref(),
            units,
        )))
    }
}

impl Statement for Chase {
    const KIND: StatementKind = StatementKind {
        key: "chase",
        default_currency: Some("USD"),
        requires_lastfour: true,
    };

    fn context(&self) -> &AccountContext {
        &self.ctx
    }

    fn load(&self, path: &Path) -> Result<Vec<Row>, SourceError> {
        source::csv::read_path(path)
    }
}
