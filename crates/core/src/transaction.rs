use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::account::LedgerError;
use super::money::{Amount, Currency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag(char);

impl Flag {
    /// Cleared, `*`.
    pub const OKAY: Flag = Flag('*');
    /// Needs review, `!`.
    pub const WARNING: Flag = Flag('!');

    pub fn as_char(self) -> char {
        self.0
    }
}

impl TryFrom<&str> for Flag {
    type Error = LedgerError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_whitespace() => Ok(Flag(c)),
            _ => Err(LedgerError::InvalidFlag(s.to_string())),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Text(String),
    Integer(i64),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Text(s) => write!(f, "\"{}\"", escape(s)),
            MetaValue::Integer(n) => write!(f, "{n}"),
        }
    }
}

pub type Meta = BTreeMap<String, MetaValue>;

/// Source location of a directive: the file it came from and the row index.
pub fn new_metadata(filename: &str, lineno: usize) -> Meta {
    let mut meta = Meta::new();
    meta.insert("filename".to_string(), MetaValue::Text(filename.to_string()));
    meta.insert(
        "lineno".to_string(),
        MetaValue::Integer(i64::try_from(lineno).unwrap_or(i64::MAX)),
    );
    meta
}

/// Per-unit acquisition cost of a posting, `{number currency, date, "label"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub number: Decimal,
    pub currency: Currency,
    pub date: Option<NaiveDate>,
    pub label: Option<String>,
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} {}", self.number, self.currency)?;
        if let Some(date) = self.date {
            write!(f, ", {date}")?;
        }
        if let Some(label) = &self.label {
            write!(f, ", \"{}\"", escape(label))?;
        }
        write!(f, "}}")
    }
}

/// One leg of a transaction. `units: None` is an elided amount that the
/// ledger fills in so the transaction balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub account: String,
    pub units: Option<Amount>,
    pub cost: Option<Cost>,
    pub price: Option<Amount>,
    pub flag: Option<Flag>,
    pub meta: Option<Meta>,
}

impl Posting {
    pub fn new(account: &str, units: Amount) -> Self {
        Posting {
            account: account.to_string(),
            units: Some(units),
            cost: None,
            price: None,
            flag: None,
            meta: None,
        }
    }

    pub fn elided(account: &str) -> Self {
        Posting {
            account: account.to_string(),
            units: None,
            cost: None,
            price: None,
            flag: None,
            meta: None,
        }
    }

    pub fn with_price(mut self, price: Amount) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_flag(mut self, flag: Option<Flag>) -> Self {
        self.flag = flag;
        self
    }

    /// Amount this posting contributes to the transaction balance.
    pub fn weight(&self) -> Option<Amount> {
        let units = self.units.as_ref()?;
        if let Some(cost) = &self.cost {
            return Some(Amount::new(units.number * cost.number, cost.currency.clone()));
        }
        if let Some(price) = &self.price {
            return Some(Amount::new(units.number * price.number, price.currency.clone()));
        }
        Some(units.clone())
    }
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        if let Some(flag) = self.flag {
            write!(f, "{flag} ")?;
        }
        write!(f, "{}", self.account)?;
        if let Some(units) = &self.units {
            write!(f, "  {units}")?;
            if let Some(cost) = &self.cost {
                write!(f, " {cost}")?;
            }
            if let Some(price) = &self.price {
                write!(f, " @ {price}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub meta: Meta,
    pub date: NaiveDate,
    pub flag: Flag,
    pub payee: Option<String>,
    pub narration: String,
    pub tags: BTreeSet<String>,
    pub links: BTreeSet<String>,
    pub postings: Vec<Posting>,
}

impl Transaction {
    /// Assembles a cleared transaction. Payee and narration are trimmed and
    /// title-cased; a payee that is blank after trimming becomes `None`.
    /// Postings are taken as given, balanced or not.
    pub fn build(
        meta: Meta,
        date: NaiveDate,
        narration: &str,
        payee: Option<&str>,
        postings: Vec<Posting>,
    ) -> Self {
        let payee = payee
            .map(normalize_text)
            .filter(|p| !p.is_empty());

        Transaction {
            meta,
            date,
            flag: Flag::OKAY,
            payee,
            narration: normalize_text(narration),
            tags: BTreeSet::new(),
            links: BTreeSet::new(),
            postings,
        }
    }

    /// Units of the first posting, the leg every other leg offsets.
    pub fn primary_units(&self) -> Option<&Amount> {
        self.postings.first().and_then(|p| p.units.as_ref())
    }

    /// Sum of posting weights per currency. Elided postings are left out.
    pub fn weights(&self) -> BTreeMap<Currency, Decimal> {
        let mut totals: BTreeMap<Currency, Decimal> = BTreeMap::new();
        for weight in self.postings.iter().filter_map(Posting::weight) {
            *totals.entry(weight.currency).or_insert(Decimal::ZERO) += weight.number;
        }
        totals
    }

    /// True when an elided posting absorbs the remainder or every currency
    /// already sums to zero.
    pub fn is_balanced(&self) -> bool {
        if self.postings.iter().any(|p| p.units.is_none()) {
            return true;
        }
        self.weights().values().all(Decimal::is_zero)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.flag)?;
        if let Some(payee) = &self.payee {
            write!(f, " \"{}\"", escape(payee))?;
        }
        write!(f, " \"{}\"", escape(&self.narration))?;
        for tag in &self.tags {
            write!(f, " #{tag}")?;
        }
        for link in &self.links {
            write!(f, " ^{link}")?;
        }
        for posting in &self.postings {
            write!(f, "\n{posting}")?;
        }
        Ok(())
    }
}

/// Trims and title-cases free text the way payees and narrations are stored.
pub fn normalize_text(text: &str) -> String {
    titlecase::titlecase(text.trim()).trim().to_string()
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
