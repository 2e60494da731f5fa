use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use beanimport_core::LedgerError;

use crate::importer::{Importer, RowImporter, Statement};
use crate::institutions::{
    ActivoBank, Amex, Brim, Chase, EqBank, MilleniumBcp, PaypalImporter, Rbc, Remitbee, Revolut,
    Tangerine, Wealthsimple,
};
use crate::patterns::{AccountPattern, PatternError, PatternSet};
use crate::registry::Importers;

pub const DEFAULT_PATH: &str = "config.toml";
pub const SECTION: &str = "beancount-importer";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("No [beancount-importer] section in config")]
    MissingSection,
    #[error("Unknown institution: '{0}'")]
    UnknownInstitution(String),
    #[error("{institution} account '{account}' needs `lastfour`")]
    MissingLastFour { institution: String, account: String },
    #[error("{institution} account '{account}': `lastfour` must be four digits, got '{lastfour}'")]
    InvalidLastFour {
        institution: String,
        account: String,
        lastfour: String,
    },
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// `[target, account, regex]` or `[target, account, regex, flag]`.
pub type PatternRow = Vec<String>;

/// One configured account of an institution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountDefinition {
    pub account: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub lastfour: Option<String>,
    #[serde(default)]
    pub patterns: Vec<PatternRow>,
}

/// The `[beancount-importer]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Applied to every importer, ahead of per-account patterns.
    #[serde(default)]
    pub patterns: Vec<PatternRow>,
    #[serde(flatten)]
    pub institutions: BTreeMap<String, Vec<AccountDefinition>>,
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(rename = "beancount-importer")]
    section: Option<Config>,
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let file: ConfigFile = toml::from_str(s)?;
        file.section.ok_or(ConfigError::MissingSection)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// Builds every configured importer. Any bad definition fails the whole
    /// configuration before a file is touched.
    pub fn build(&self) -> Result<Importers, ConfigError> {
        let global = parse_patterns(&self.patterns)?;

        let mut importers = Vec::new();
        for (key, definitions) in &self.institutions {
            let institution: Institution = key.parse()?;
            for definition in definitions {
                let mut patterns = global.clone();
                patterns.extend(parse_patterns(&definition.patterns)?);
                let importer = institution.build(definition, PatternSet::new(patterns))?;
                debug!(importer = %importer.name(), "configured");
                importers.push(importer);
            }
        }

        Ok(Importers::new(importers))
    }
}

fn parse_patterns(rows: &[PatternRow]) -> Result<Vec<AccountPattern>, PatternError> {
    rows.iter().map(|row| AccountPattern::from_config(row)).collect()
}

/// Every supported export format, keyed as in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Institution {
    ActivoBank,
    Amex,
    Brim,
    Chase,
    EqBank,
    MilleniumBcp,
    Paypal,
    Rbc,
    Remitbee,
    Revolut,
    Tangerine,
    Wealthsimple,
}

impl Institution {
    pub const ALL: [Institution; 12] = [
        Institution::ActivoBank,
        Institution::Amex,
        Institution::Brim,
        Institution::Chase,
        Institution::EqBank,
        Institution::MilleniumBcp,
        Institution::Paypal,
        Institution::Rbc,
        Institution::Remitbee,
        Institution::Revolut,
        Institution::Tangerine,
        Institution::Wealthsimple,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Institution::ActivoBank => ActivoBank::KIND.key,
            Institution::Amex => Amex::KIND.key,
            Institution::Brim => Brim::KIND.key,
            Institution::Chase => Chase::KIND.key,
            Institution::EqBank => EqBank::KIND.key,
            Institution::MilleniumBcp => MilleniumBcp::KIND.key,
            Institution::Paypal => PaypalImporter::KIND.key,
            Institution::Rbc => Rbc::KIND.key,
            Institution::Remitbee => Remitbee::KIND.key,
            Institution::Revolut => Revolut::KIND.key,
            Institution::Tangerine => Tangerine::KIND.key,
            Institution::Wealthsimple => Wealthsimple::KIND.key,
        }
    }

    pub fn build(
        self,
        definition: &AccountDefinition,
        patterns: PatternSet,
    ) -> Result<Box<dyn Importer>, ConfigError> {
        fn rows<S: Statement + 'static>(statement: S, patterns: PatternSet) -> Box<dyn Importer> {
            Box::new(RowImporter::new(statement, patterns))
        }

        Ok(match self {
            Institution::ActivoBank => rows(ActivoBank::new(definition)?, patterns),
            Institution::Amex => rows(Amex::new(definition)?, patterns),
            Institution::Brim => rows(Brim::new(definition)?, patterns),
            Institution::Chase => rows(Chase::new(definition)?, patterns),
            Institution::EqBank => rows(EqBank::new(definition)?, patterns),
            Institution::MilleniumBcp => rows(MilleniumBcp::new(definition)?, patterns),
            Institution::Paypal => Box::new(PaypalImporter::new(definition, patterns)?),
            Institution::Rbc => rows(Rbc::new(definition)?, patterns),
            Institution::Remitbee => rows(Remitbee::new(definition)?, patterns),
            Institution::Revolut => rows(Revolut::new(definition)?, patterns),
            Institution::Tangerine => rows(Tangerine::new(definition)?, patterns),
            Institution::Wealthsimple => rows(Wealthsimple::new(definition)?, patterns),
        })
    }
}

impl FromStr for Institution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Institution::ALL
            .into_iter()
            .find(|i| i.key() == s)
            .ok_or_else(|| ConfigError::UnknownInstitution(s.to_string()))
    }
}
