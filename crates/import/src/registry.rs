use std::path::{Path, PathBuf};
use tracing::{info, warn};

use beanimport_core::Transaction;

use crate::error::ImportError;
use crate::importer::Importer;

/// What to do when one file fails to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failing file.
    #[default]
    Abort,
    /// Log the failure and move on to the next file.
    Continue,
}

/// Transactions one importer produced from one file.
#[derive(Debug)]
pub struct Extracted {
    pub path: PathBuf,
    pub importer: String,
    pub account: String,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub extracted: Vec<Extracted>,
    pub failed: Vec<ImportError>,
}

/// Every configured importer, in configuration order.
#[derive(Default)]
pub struct Importers {
    importers: Vec<Box<dyn Importer>>,
}

impl Importers {
    pub fn new(importers: Vec<Box<dyn Importer>>) -> Self {
        Self { importers }
    }

    pub fn len(&self) -> usize {
        self.importers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Importer> {
        self.importers.iter().map(|i| i.as_ref())
    }

    /// Importers that recognise `path`.
    pub fn identify(&self, path: &Path) -> Vec<&dyn Importer> {
        self.iter().filter(|i| i.identify(path)).collect()
    }

    /// Runs every matching importer over every file. Files no importer
    /// recognises are ignored.
    pub fn extract_all(
        &self,
        paths: &[PathBuf],
        policy: FailurePolicy,
    ) -> Result<Extraction, ImportError> {
        let mut extraction = Extraction::default();

        for path in paths {
            for importer in self.identify(path) {
                match importer.extract(path) {
                    Ok(transactions) => extraction.extracted.push(Extracted {
                        path: path.clone(),
                        importer: importer.name(),
                        account: importer.account().to_string(),
                        transactions,
                    }),
                    Err(e) if policy == FailurePolicy::Continue => {
                        warn!(importer = %importer.name(), error = %e, "extraction failed");
                        extraction.failed.push(e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        info!(
            files = extraction.extracted.len(),
            failed = extraction.failed.len(),
            "extraction finished"
        );
        Ok(extraction)
    }
}
