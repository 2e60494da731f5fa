use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use beanimport_core::{account_type, Flag, LedgerError, Posting, Transaction};

/// Which transaction text an [`AccountPattern`] is searched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PatternTarget {
    /// One search over `"{payee};{narration}"`, so a pattern may span both.
    Both,
    /// Narration, then payee; either one matching is enough.
    #[default]
    Either,
    Narration,
    Payee,
}

impl std::str::FromStr for PatternTarget {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "both" => Ok(PatternTarget::Both),
            "either" => Ok(PatternTarget::Either),
            "narration" => Ok(PatternTarget::Narration),
            "payee" => Ok(PatternTarget::Payee),
            other => Err(PatternError::UnknownTarget(other.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Unknown pattern target: '{0}'")]
    UnknownTarget(String),
    #[error("Pattern rows need 3 or 4 entries (target, account, regex[, flag]), got {0}")]
    WrongArity(usize),
    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Rule that assigns the balancing account of a transaction whose text
/// matches a regex.
#[derive(Debug, Clone)]
pub struct AccountPattern {
    account: String,
    regex: Regex,
    target: PatternTarget,
    flag: Option<Flag>,
}

impl AccountPattern {
    pub fn new(
        account: &str,
        pattern: &str,
        target: PatternTarget,
        flag: Option<Flag>,
    ) -> Result<Self, PatternError> {
        account_type(account)?;
        let regex = Regex::new(pattern).map_err(|source| PatternError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            account: account.to_string(),
            regex,
            target,
            flag,
        })
    }

    /// Builds a pattern from a configuration row:
    /// `[target, account, regex]` or `[target, account, regex, flag]`.
    pub fn from_config(row: &[String]) -> Result<Self, PatternError> {
        match row {
            [target, account, pattern] => Self::new(account, pattern, target.parse()?, None),
            [target, account, pattern, flag] => Self::new(
                account,
                pattern,
                target.parse()?,
                Some(Flag::try_from(flag.as_str())?),
            ),
            other => Err(PatternError::WrongArity(other.len())),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn target(&self) -> PatternTarget {
        self.target
    }

    pub fn flag(&self) -> Option<Flag> {
        self.flag
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        let payee = tx.payee.as_deref();
        match self.target {
            PatternTarget::Narration => self.regex.is_match(&tx.narration),
            PatternTarget::Payee => payee.is_some_and(|p| self.regex.is_match(p)),
            PatternTarget::Both => self
                .regex
                .is_match(&format!("{};{}", payee.unwrap_or_default(), tx.narration)),
            PatternTarget::Either => {
                self.regex.is_match(&tx.narration) || payee.is_some_and(|p| self.regex.is_match(p))
            }
        }
    }

    /// Posting that exactly offsets the transaction's first posting.
    /// `None` when the first posting has no units to offset.
    pub fn posting(&self, tx: &Transaction) -> Option<Posting> {
        let units = tx.primary_units()?;
        Some(Posting::new(&self.account, -units).with_flag(self.flag))
    }
}

/// Ordered pattern list. Built once and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<AccountPattern>,
}

impl PatternSet {
    pub fn new(patterns: Vec<AccountPattern>) -> Self {
        Self { patterns }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First pattern, in configured order, that matches `tx`.
    pub fn find(&self, tx: &Transaction) -> Option<&AccountPattern> {
        self.patterns.iter().find(|p| p.matches(tx))
    }

    /// Balancing posting from the first matching pattern. Later patterns are
    /// never evaluated.
    pub fn match_posting(&self, tx: &Transaction) -> Option<Posting> {
        self.find(tx).and_then(|p| p.posting(tx))
    }

    /// Appends at most one pattern posting. Transactions that already balance
    /// are left untouched. Returns whether a posting was added.
    pub fn apply(&self, tx: &mut Transaction) -> bool {
        if tx.is_balanced() {
            return false;
        }
        match self.match_posting(tx) {
            Some(posting) => {
                tx.postings.push(posting);
                true
            }
            None => false,
        }
    }
}

impl FromIterator<AccountPattern> for PatternSet {
    fn from_iter<I: IntoIterator<Item = AccountPattern>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanimport_core::{new_metadata, Amount, Currency};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn usd(s: &str) -> Amount {
        Amount::new(Decimal::from_str(s).unwrap(), Currency::new("USD").unwrap())
    }

    fn make_tx(payee: Option<&str>, narration: &str, amount: &str) -> Transaction {
        Transaction::build(
            new_metadata("test.csv", 0),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            narration,
            payee,
            vec![Posting::new("Assets:Bank", usd(amount))],
        )
    }

    fn coffee() -> Transaction {
        make_tx(Some("Coffee Shop"), "Purchase at Coffee Shop", "-4.50")
    }

    fn pattern(account: &str, regex: &str, target: PatternTarget) -> AccountPattern {
        AccountPattern::new(account, regex, target, None).unwrap()
    }

    #[test]
    fn narration_target_searches_narration() {
        assert!(pattern("Expenses:Dining", "Coffee", PatternTarget::Narration).matches(&coffee()));
    }

    #[test]
    fn payee_target_ignores_narration() {
        assert!(!pattern("Expenses:Dining", "Purchase", PatternTarget::Payee).matches(&coffee()));
    }

    #[test]
    fn payee_target_without_payee_never_matches() {
        let tx = make_tx(None, "Coffee", "-1");
        assert!(!pattern("Expenses:Dining", ".*", PatternTarget::Payee).matches(&tx));
    }

    #[test]
    fn both_target_spans_the_separator() {
        assert!(pattern("Expenses:Dining", "Shop;Purchase", PatternTarget::Both).matches(&coffee()));
        assert!(!pattern("Expenses:Dining", "Shop;Purchase", PatternTarget::Either).matches(&coffee()));
    }

    #[test]
    fn both_target_without_payee_starts_with_separator() {
        let tx = make_tx(None, "Coffee", "-1");
        assert!(pattern("Expenses:Dining", "^;Coffee$", PatternTarget::Both).matches(&tx));
    }

    #[test]
    fn both_target_semicolon_in_text_can_cross_fields() {
        // A literal ';' inside the narration is indistinguishable from the join.
        let tx = make_tx(None, "Refund;Store Credit", "5");
        assert!(pattern("Income:Refunds", "Refund;Store", PatternTarget::Both).matches(&tx));
    }

    #[test]
    fn either_target_checks_both_fields_independently() {
        let p = pattern("Expenses:Dining", "^Coffee Shop$", PatternTarget::Either);
        assert!(p.matches(&coffee()));
        let p = pattern("Expenses:Dining", "^Purchase", PatternTarget::Either);
        assert!(p.matches(&coffee()));
    }

    #[test]
    fn default_target_is_either() {
        assert_eq!(PatternTarget::default(), PatternTarget::Either);
    }

    #[test]
    fn first_match_wins_and_order_matters() {
        let dining = pattern("Expenses:Dining", "Coffee", PatternTarget::Either);
        let shops = pattern("Expenses:Shopping", "Shop", PatternTarget::Either);

        let set = PatternSet::new(vec![dining.clone(), shops.clone()]);
        assert_eq!(set.find(&coffee()).unwrap().account(), "Expenses:Dining");

        let set = PatternSet::new(vec![shops, dining]);
        assert_eq!(set.find(&coffee()).unwrap().account(), "Expenses:Shopping");
    }

    #[test]
    fn no_match_returns_none() {
        let set = PatternSet::new(vec![pattern("Expenses:Fuel", "Gas", PatternTarget::Either)]);
        assert!(set.match_posting(&coffee()).is_none());
    }

    #[test]
    fn posting_offsets_first_posting() {
        let set = PatternSet::new(vec![pattern("Expenses:Dining", "Coffee", PatternTarget::Narration)]);
        let mut tx = coffee();
        assert!(set.apply(&mut tx));
        assert_eq!(tx.postings.len(), 2);
        assert_eq!(tx.postings[1].account, "Expenses:Dining");
        assert_eq!(tx.postings[1].units, Some(usd("4.50")));
        let total = tx.postings[0].units.as_ref().unwrap().number
            + tx.postings[1].units.as_ref().unwrap().number;
        assert!(total.is_zero());
    }

    #[test]
    fn posting_carries_pattern_flag() {
        let p = AccountPattern::new("Expenses:Dining", "Coffee", PatternTarget::Either, Some(Flag::WARNING))
            .unwrap();
        assert_eq!(p.posting(&coffee()).unwrap().flag, Some(Flag::WARNING));
    }

    #[test]
    fn apply_only_adds_one_posting() {
        let set = PatternSet::new(vec![
            pattern("Expenses:Dining", "Coffee", PatternTarget::Either),
            pattern("Expenses:Shopping", "Shop", PatternTarget::Either),
        ]);
        let mut tx = coffee();
        set.apply(&mut tx);
        assert_eq!(tx.postings.len(), 2);
    }

    #[test]
    fn apply_twice_is_a_no_op() {
        let set = PatternSet::new(vec![pattern("Expenses:Dining", "Coffee", PatternTarget::Either)]);
        let mut tx = coffee();
        assert!(set.apply(&mut tx));
        let once = tx.clone();
        assert!(!set.apply(&mut tx));
        assert_eq!(tx, once);
    }

    #[test]
    fn apply_skips_transactions_with_elided_postings() {
        let set = PatternSet::new(vec![pattern("Expenses:Dining", "Coffee", PatternTarget::Either)]);
        let mut tx = coffee();
        tx.postings.push(Posting::elided("Equity:Conversions:Current"));
        assert!(!set.apply(&mut tx));
        assert_eq!(tx.postings.len(), 2);
    }

    #[test]
    fn from_config_parses_rows() {
        let row = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let p = AccountPattern::from_config(&row(&["NARRATION", "Expenses:Dining", "Coffee"])).unwrap();
        assert_eq!(p.target(), PatternTarget::Narration);
        assert_eq!(p.flag(), None);

        let p = AccountPattern::from_config(&row(&["payee", "Expenses:Dining", "Coffee", "!"])).unwrap();
        assert_eq!(p.flag(), Some(Flag::WARNING));

        assert!(matches!(
            AccountPattern::from_config(&row(&["payee", "Expenses:Dining"])),
            Err(PatternError::WrongArity(2))
        ));
        assert!(matches!(
            AccountPattern::from_config(&row(&["sideways", "Expenses:Dining", "x"])),
            Err(PatternError::UnknownTarget(_))
        ));
        assert!(matches!(
            AccountPattern::from_config(&row(&["both", "Expenses:Dining", "("])),
            Err(PatternError::InvalidRegex { .. })
        ));
        assert!(matches!(
            AccountPattern::from_config(&row(&["both", "dining", "x"])),
            Err(PatternError::Ledger(_))
        ));
        assert!(matches!(
            AccountPattern::from_config(&row(&["both", "Expenses:Dining", "x", "!!"])),
            Err(PatternError::Ledger(LedgerError::InvalidFlag(_)))
        ));
    }
}
