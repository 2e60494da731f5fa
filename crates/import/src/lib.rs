//! Statement importers producing beancount transactions.
//!
//! Each supported institution export is read into [`Row`]s, turned into
//! single-posting [`Transaction`]s and, where a configured
//! [`AccountPattern`] matches, given a balancing posting. PayPal downloads
//! take a separate path that folds multi-row currency conversions.
//!
//! [`Transaction`]: beanimport_core::Transaction

pub mod config;
pub mod consolidate;
pub mod error;
pub mod importer;
pub mod institutions;
pub mod patterns;
pub mod registry;
pub mod row;
pub mod source;

pub use config::{AccountDefinition, Config, ConfigError, Institution, PatternRow};
pub use consolidate::{ConsolidationError, RawRecord};
pub use error::ImportError;
pub use importer::{
    AccountContext, FileIdentifier, Importer, RowErrorPolicy, RowExtractor, RowImporter,
    Statement, StatementKind,
};
pub use patterns::{AccountPattern, PatternError, PatternSet, PatternTarget};
pub use registry::{Extracted, Extraction, FailurePolicy, Importers};
pub use row::{Cell, Row, RowError};
pub use source::SourceError;
