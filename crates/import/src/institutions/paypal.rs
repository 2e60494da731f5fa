use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

use beanimport_core::{normalize_text, Amount, Currency, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::consolidate::{self, RawRecord};
use crate::error::ImportError;
use crate::importer::{file_name, AccountContext, Importer, StatementKind};
use crate::patterns::PatternSet;
use crate::row::{Row, RowError};
use crate::source;

const FILE_NAME: &str = "Download.CSV";
const COMPLETED: &str = "Completed";
const CATEGORY: &str = "Expenses:Unknown";

/// PayPal activity download. Foreign-currency payments span several rows
/// which are folded into one transaction each.
pub struct PaypalImporter {
    ctx: AccountContext,
    patterns: PatternSet,
}

impl PaypalImporter {
    pub const KIND: StatementKind = StatementKind {
        key: "paypal",
        default_currency: None,
        requires_lastfour: false,
    };

    pub fn new(definition: &AccountDefinition, patterns: PatternSet) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            patterns,
        })
    }

    fn load(&self, path: &Path) -> Result<Vec<Row>, ImportError> {
        source::csv::read_path(path).map_err(|source| ImportError::Source {
            path: path.display().to_string(),
            source,
        })
    }

    /// Completed rows, in file order.
    pub fn records(&self, rows: &[Row], filename: &str) -> Result<Vec<RawRecord>, ImportError> {
        let mut records = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let record = match row.text("Status") {
                Ok(status) if status != COMPLETED => continue,
                Ok(_) => to_record(row, filename, index),
                Err(e) => Err(e),
            };
            records.push(record.map_err(|source| ImportError::Row {
                path: filename.to_string(),
                index,
                source,
            })?);
        }
        Ok(records)
    }

    pub fn extract_rows(&self, rows: &[Row], filename: &str) -> Result<Vec<Transaction>, ImportError> {
        let records = self.records(rows, filename)?;
        let batches = consolidate::group(records);

        let mut transactions = Vec::with_capacity(batches.len());
        for batch in &batches {
            let mut tx = consolidate::fold(batch, CATEGORY, &self.ctx.account).map_err(|source| {
                ImportError::Consolidation {
                    path: filename.to_string(),
                    source,
                }
            })?;
            self.patterns.apply(&mut tx);
            transactions.push(tx);
        }

        info!(
            file = filename,
            rows = rows.len(),
            transactions = transactions.len(),
            "extracted {}",
            Self::KIND.key
        );
        Ok(transactions)
    }
}

fn to_record(row: &Row, filename: &str, index: usize) -> Result<RawRecord, RowError> {
    let currency = Currency::new(row.text("Currency")?.trim())?;
    Ok(RawRecord {
        date: row.date("Date")?,
        meta: beanimport_core::new_metadata(filename, index),
        name: normalize_text(&row.text("Name")?),
        kind: normalize_text(&row.text("Type")?),
        amount: Amount::new(row.decimal("Amount")?, currency),
    })
}

impl Importer for PaypalImporter {
    fn name(&self) -> String {
        format!("{}.{}", Self::KIND.key, self.ctx.account)
    }

    fn account(&self) -> &str {
        &self.ctx.account
    }

    fn identify(&self, path: &Path) -> bool {
        file_name(path) == FILE_NAME
    }

    fn extract(&self, path: &Path) -> Result<Vec<Transaction>, ImportError> {
        let rows = self.load(path)?;
        self.extract_rows(&rows, &path.display().to_string())
    }

    /// Latest date on any row, completed or not.
    fn file_date(&self, path: &Path) -> Result<Option<NaiveDate>, ImportError> {
        let filename = path.display().to_string();
        let mut latest = None;
        for (index, row) in self.load(path)?.iter().enumerate() {
            let date = row.date("Date").map_err(|source| ImportError::Row {
                path: filename.clone(),
                index,
                source,
            })?;
            latest = latest.max(Some(date));
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::CONVERSIONS_ACCOUNT;
    use crate::institutions::testing::{amt, definition};
    use crate::patterns::{AccountPattern, PatternTarget};

    const HEADER: &str = "\u{feff}\"Date\",\"Time\",\"TimeZone\",\"Name\",\"Type\",\"Status\",\"Currency\",\"Amount\"\n";

    fn paypal() -> PaypalImporter {
        PaypalImporter::new(&definition("Assets:Paypal", None), PatternSet::default()).unwrap()
    }

    fn write(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(FILE_NAME);
        std::fs::write(&path, format!("{HEADER}{body}")).unwrap();
        path
    }

    #[test]
    fn identifies_by_exact_name() {
        assert!(paypal().identify(Path::new("/downloads/Download.CSV")));
        assert!(!paypal().identify(Path::new("/downloads/Download.csv")));
        assert!(!paypal().identify(Path::new("/downloads/Download (1).CSV")));
    }

    #[test]
    fn conversion_rows_fold_into_one_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "\"03/01/2024\",\"10:00:00\",\"PST\",\"game store\",\"Express Checkout Payment\",\"Completed\",\"USD\",\"-10.00\"\n\
             \"03/01/2024\",\"10:00:00\",\"PST\",\"\",\"General Currency Conversion\",\"Completed\",\"USD\",\"10.00\"\n\
             \"03/01/2024\",\"10:00:00\",\"PST\",\"\",\"General Currency Conversion\",\"Completed\",\"CAD\",\"-13.50\"\n\
             \"03/02/2024\",\"11:00:00\",\"PST\",\"friend\",\"Mobile Payment\",\"Pending\",\"CAD\",\"-5.00\"\n",
        );

        let txs = paypal().extract(&path).unwrap();
        assert_eq!(txs.len(), 1);

        let tx = &txs[0];
        assert_eq!(tx.payee.as_deref(), Some("Game Store"));
        assert_eq!(tx.narration, "Express Checkout Payment");
        assert_eq!(tx.postings.len(), 3);
        assert_eq!(tx.postings[0].account, "Expenses:Unknown");
        assert_eq!(tx.postings[0].units, Some(amt("10.00", "USD")));
        assert_eq!(tx.postings[1].account, "Assets:Paypal");
        assert_eq!(tx.postings[1].units, Some(amt("-13.50", "CAD")));
        assert_eq!(tx.postings[2].account, CONVERSIONS_ACCOUNT);
        assert_eq!(tx.postings[2].units, None);
        assert_eq!(
            tx.meta["lineno"],
            beanimport_core::MetaValue::Integer(0)
        );
    }

    #[test]
    fn file_date_includes_incomplete_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "\"03/01/2024\",\"10:00:00\",\"PST\",\"shop\",\"Express Checkout Payment\",\"Completed\",\"USD\",\"-10.00\"\n\
             \"03/09/2024\",\"11:00:00\",\"PST\",\"friend\",\"Mobile Payment\",\"Pending\",\"CAD\",\"-5.00\"\n",
        );
        assert_eq!(
            paypal().file_date(&path).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
    }

    #[test]
    fn unconsolidatable_batch_fails_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "\"03/01/2024\",\"10:00:00\",\"PST\",\"shop\",\"Express Checkout Payment\",\"Completed\",\"USD\",\"-10.00\"\n\
             \"03/01/2024\",\"10:00:00\",\"PST\",\"\",\"General Currency Conversion\",\"Completed\",\"USD\",\"10.00\"\n",
        );
        let err = paypal().extract(&path).unwrap_err();
        assert!(matches!(err, ImportError::Consolidation { .. }));
    }

    #[test]
    fn patterns_leave_folded_transactions_alone() {
        let patterns = PatternSet::new(vec![AccountPattern::new(
            "Expenses:Games",
            "Game",
            PatternTarget::Either,
            None,
        )
        .unwrap()]);
        let importer = PaypalImporter::new(&definition("Assets:Paypal", None), patterns).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "\"03/01/2024\",\"10:00:00\",\"PST\",\"game store\",\"Express Checkout Payment\",\"Completed\",\"USD\",\"-10.00\"\n\
             \"03/01/2024\",\"10:00:00\",\"PST\",\"\",\"General Currency Conversion\",\"Completed\",\"USD\",\"10.00\"\n\
             \"03/01/2024\",\"10:00:00\",\"PST\",\"\",\"General Currency Conversion\",\"Completed\",\"CAD\",\"-13.50\"\n",
        );
        let txs = importer.extract(&path).unwrap();
        assert_eq!(txs[0].postings.len(), 3);
    }
}
