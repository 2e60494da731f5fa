//! Folding of multi-row currency conversions into single transactions.
//!
//! Payment processors export one purchase in a foreign currency as several
//! same-day rows: the purchase itself, a conversion credit in the purchase
//! currency, a conversion debit in the funding currency, and sometimes an
//! authorization or hold reversal. Each run of such rows becomes one
//! transaction whose conversion spread lands on an elided equity posting.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use beanimport_core::{Amount, Meta, Posting, Transaction};

pub const CONVERSIONS_ACCOUNT: &str = "Equity:Conversions:Current";

pub const GENERAL_CURRENCY_CONVERSION: &str = "General Currency Conversion";
pub const ACCOUNT_HOLD_REVERSAL: &str = "Reversal of General Account Hold";
pub const GENERAL_AUTHORIZATION: &str = "General Authorization";
pub const PROCESSOR_NAME: &str = "PayPal";

/// One completed row of the export.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub meta: Meta,
    pub name: String,
    pub kind: String,
    pub amount: Amount,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConsolidationError {
    #[error("Could not find the funding leg of the {records}-row conversion '{name}' / '{kind}' on {date}")]
    NoCost {
        date: NaiveDate,
        name: String,
        kind: String,
        records: usize,
    },
    #[error("Cannot consolidate an empty batch")]
    EmptyBatch,
}

/// Whether `record` belongs to the batch started by `anchor`. Only the
/// anchor is consulted, never the other members of the batch.
pub fn is_conversion(anchor: &RawRecord, record: &RawRecord) -> bool {
    if record.date != anchor.date {
        return false;
    }

    (record.name.is_empty() && record.kind == GENERAL_CURRENCY_CONVERSION)
        || (record.name == PROCESSOR_NAME && record.kind == ACCOUNT_HOLD_REVERSAL)
        || (record.name == anchor.name
            && record.kind == GENERAL_AUTHORIZATION
            && record.amount == anchor.amount)
}

/// Splits records, in file order, into batches of consecutive related rows.
pub fn group(records: impl IntoIterator<Item = RawRecord>) -> Vec<Vec<RawRecord>> {
    let mut batches = Vec::new();
    let mut batch: Vec<RawRecord> = Vec::new();

    for record in records {
        if let Some(anchor) = batch.first() {
            if is_conversion(anchor, &record) {
                batch.push(record);
                continue;
            }
            batches.push(std::mem::take(&mut batch));
        }
        batch.push(record);
    }

    if !batch.is_empty() {
        batches.push(batch);
    }
    batches
}

/// Postings for one batch. The first record is the expense; the funding leg
/// is the first record with the expense's sign whose amount is neither the
/// expense nor its negation.
pub fn consolidate(
    batch: &[RawRecord],
    category: &str,
    source_account: &str,
) -> Result<Vec<Posting>, ConsolidationError> {
    let expense = batch.first().ok_or(ConsolidationError::EmptyBatch)?;
    let spent = &expense.amount;

    let cost = batch
        .iter()
        .map(|r| &r.amount)
        .find(|a| {
            if *a == spent || **a == -spent {
                return false;
            }
            let expense_negative = spent.number < Decimal::ZERO;
            let candidate_negative = a.number < Decimal::ZERO;
            expense_negative == candidate_negative
        })
        .ok_or_else(|| ConsolidationError::NoCost {
            date: expense.date,
            name: expense.name.clone(),
            kind: expense.kind.clone(),
            records: batch.len(),
        })?;

    Ok(vec![
        Posting::new(category, -spent),
        Posting::new(source_account, cost.clone()),
        Posting::elided(CONVERSIONS_ACCOUNT),
    ])
}

/// Builds the transaction for a batch; date, payee and narration come from
/// its first record.
pub fn fold(
    batch: &[RawRecord],
    category: &str,
    source_account: &str,
) -> Result<Transaction, ConsolidationError> {
    let postings = consolidate(batch, category, source_account)?;
    let anchor = &batch[0];
    Ok(Transaction::build(
        anchor.meta.clone(),
        anchor.date,
        &anchor.kind,
        Some(&anchor.name),
        postings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanimport_core::{new_metadata, Currency};
    use std::str::FromStr;

    fn amt(n: &str, c: &str) -> Amount {
        Amount::new(Decimal::from_str(n).unwrap(), Currency::new(c).unwrap())
    }

    fn rec(day: u32, name: &str, kind: &str, amount: Amount) -> RawRecord {
        RawRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            meta: new_metadata("Download.CSV", day as usize),
            name: name.to_string(),
            kind: kind.to_string(),
            amount,
        }
    }

    fn purchase() -> Vec<RawRecord> {
        vec![
            rec(1, "Store", "Express Checkout Payment", amt("-10.00", "USD")),
            rec(1, "", GENERAL_CURRENCY_CONVERSION, amt("10.00", "USD")),
            rec(1, "", GENERAL_CURRENCY_CONVERSION, amt("-13.50", "CAD")),
        ]
    }

    #[test]
    fn conversion_rows_join_their_anchor() {
        let batches = group(purchase());
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
    }

    #[test]
    fn different_day_starts_new_batch() {
        let mut records = purchase();
        records.push(rec(2, "", GENERAL_CURRENCY_CONVERSION, amt("1", "USD")));
        let batches = group(records);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].len(), 1);
    }

    #[test]
    fn hold_reversal_and_matching_authorization_join() {
        let records = vec![
            rec(1, "Store", "Express Checkout Payment", amt("-10.00", "USD")),
            rec(1, "Store", GENERAL_AUTHORIZATION, amt("-10.00", "USD")),
            rec(1, PROCESSOR_NAME, ACCOUNT_HOLD_REVERSAL, amt("10.00", "USD")),
        ];
        assert_eq!(group(records).len(), 1);
    }

    #[test]
    fn authorization_with_other_amount_does_not_join() {
        let records = vec![
            rec(1, "Store", "Express Checkout Payment", amt("-10.00", "USD")),
            rec(1, "Store", GENERAL_AUTHORIZATION, amt("-12.00", "USD")),
        ];
        assert_eq!(group(records).len(), 2);
    }

    #[test]
    fn membership_is_anchor_relative() {
        // The conversion row anchors its own batch; the authorization does not
        // match that anchor's name, so it anchors the next batch, and the
        // trailing conversion row joins the authorization.
        let records = vec![
            rec(1, "", GENERAL_CURRENCY_CONVERSION, amt("-10", "USD")),
            rec(1, "Store", GENERAL_AUTHORIZATION, amt("-10", "USD")),
            rec(1, "", GENERAL_CURRENCY_CONVERSION, amt("-13.50", "CAD")),
        ];
        let batches = group(records);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[1][0].name, "Store");

        let tx = fold(&batches[1], "Expenses:Unknown", "Assets:Paypal").unwrap();
        assert_eq!(tx.payee.as_deref(), Some("Store"));
        assert_eq!(tx.narration, "General Authorization");
    }

    #[test]
    fn consolidate_emits_three_postings() {
        let postings = consolidate(&purchase(), "Expenses:Unknown", "Assets:Paypal").unwrap();
        assert_eq!(postings.len(), 3);
        assert_eq!(postings[0].account, "Expenses:Unknown");
        assert_eq!(postings[0].units, Some(amt("10.00", "USD")));
        assert_eq!(postings[1].account, "Assets:Paypal");
        assert_eq!(postings[1].units, Some(amt("-13.50", "CAD")));
        assert_eq!(postings[2].account, CONVERSIONS_ACCOUNT);
        assert_eq!(postings[2].units, None);
    }

    #[test]
    fn fold_takes_fields_from_first_record() {
        let tx = fold(&purchase(), "Expenses:Unknown", "Assets:Paypal").unwrap();
        assert_eq!(tx.payee.as_deref(), Some("Store"));
        assert_eq!(tx.narration, "Express Checkout Payment");
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(tx.is_balanced());
    }

    #[test]
    fn refunds_pick_a_positive_funding_leg() {
        let batch = vec![
            rec(4, "Store", "Payment Refund", amt("10.00", "USD")),
            rec(4, "", GENERAL_CURRENCY_CONVERSION, amt("-10.00", "USD")),
            rec(4, "", GENERAL_CURRENCY_CONVERSION, amt("13.40", "CAD")),
        ];
        let postings = consolidate(&batch, "Expenses:Unknown", "Assets:Paypal").unwrap();
        assert_eq!(postings[0].units, Some(amt("-10.00", "USD")));
        assert_eq!(postings[1].units, Some(amt("13.40", "CAD")));
    }

    #[test]
    fn consolidate_fails_without_funding_leg() {
        let batch = vec![
            rec(1, "Store", "Express Checkout Payment", amt("-10.00", "USD")),
            rec(1, "", GENERAL_CURRENCY_CONVERSION, amt("10.00", "USD")),
        ];
        let err = consolidate(&batch, "Expenses:Unknown", "Assets:Paypal").unwrap_err();
        assert!(matches!(err, ConsolidationError::NoCost { records: 2, .. }));

        let same = vec![
            rec(1, "Store", "Express Checkout Payment", amt("-10.00", "USD")),
            rec(1, "Store", GENERAL_AUTHORIZATION, amt("-10.00", "USD")),
        ];
        assert!(consolidate(&same, "Expenses:Unknown", "Assets:Paypal").is_err());
    }

    #[test]
    fn single_record_cannot_be_consolidated() {
        let batch = vec![rec(1, "Friend", "Mobile Payment", amt("-5", "USD"))];
        assert!(matches!(
            consolidate(&batch, "Expenses:Unknown", "Assets:Paypal"),
            Err(ConsolidationError::NoCost { .. })
        ));
        assert_eq!(
            consolidate(&[], "Expenses:Unknown", "Assets:Paypal"),
            Err(ConsolidationError::EmptyBatch)
        );
    }
}
