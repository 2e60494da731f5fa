//! One adapter per supported institution export.
//!
//! Column names, file name patterns and currency defaults stay private to
//! each adapter; the shared pipeline only sees [`Statement`] rows.
//!
//! [`Statement`]: crate::importer::Statement

mod activobank;
mod amex;
mod brim;
mod chase;
mod eq;
mod milleniumbcp;
mod paypal;
mod rbc;
mod remitbee;
mod revolut;
mod tangerine;
mod wealthsimple;

pub use activobank::ActivoBank;
pub use amex::Amex;
pub use brim::Brim;
pub use chase::Chase;
pub use eq::EqBank;
pub use milleniumbcp::MilleniumBcp;
pub use paypal::PaypalImporter;
pub use rbc::Rbc;
pub use remitbee::Remitbee;
pub use revolut::Revolut;
pub use tangerine::Tangerine;
pub use wealthsimple::Wealthsimple;

use chrono::NaiveDate;

use beanimport_core::{Amount, Meta, Posting, Transaction};

use crate::importer::AccountContext;

/// A transaction whose only posting is on the statement's own account.
pub(crate) fn single_posting(
    ctx: &AccountContext,
    meta: Meta,
    date: NaiveDate,
    narration: &str,
    payee: Option<&str>,
    units: Amount,
) -> Transaction {
    Transaction::build(
        meta,
        date,
        narration,
        payee,
        vec![Posting::new(&ctx.account, units)],
    )
}
