//! Transaction records.
//!
//! A `Transaction` is one line of the transactions sheet, columns `B:H`:
//! date, outflow, inflow, category, account, memo and status.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Locale, Money, ResultEngine,
    records::{SheetRecord, parse_status},
    store::Row,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Settled,
    Pending,
    Unknown,
    /// The status cell is blank.
    #[default]
    Unset,
}

impl TransactionStatus {
    const TOKENS: [(&'static str, Self); 4] = [
        ("\u{2705}", Self::Settled),
        ("\u{1F17F}\u{FE0F}", Self::Pending),
        ("*\u{FE0F}\u{20E3}", Self::Unknown),
        ("", Self::Unset),
    ];

    /// Cell content representing the status.
    pub fn token(self) -> &'static str {
        match self {
            Self::Settled => "\u{2705}",
            Self::Pending => "\u{1F17F}\u{FE0F}",
            Self::Unknown => "*\u{FE0F}\u{20E3}",
            Self::Unset => "",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        parse_status("transaction", value, &Self::TOKENS)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub outflow: Money,
    pub inflow: Money,
    pub category: String,
    pub account: String,
    pub memo: String,
    pub status: TransactionStatus,
}

impl Transaction {
    /// Inflow minus outflow.
    #[must_use]
    pub fn net(&self) -> Money {
        self.inflow - self.outflow
    }
}

impl SheetRecord for Transaction {
    const KIND: &'static str = "transaction";
    const TABLE_START: u32 = 9;
    const FIRST_COLUMN: u32 = 1;
    const WIDTH: usize = 7;
    const MIN_FIELDS: usize = 5;

    fn from_fields(fields: &[String], locale: Locale) -> ResultEngine<Self> {
        let [date, outflow, inflow, category, account, memo, status] = fields else {
            return Err(EngineError::Format(format!(
                "transaction row must have 7 fields: {fields:?}"
            )));
        };
        Ok(Self {
            date: locale.parse_date(date)?,
            outflow: locale.parse_currency(outflow)?,
            inflow: locale.parse_currency(inflow)?,
            category: category.clone(),
            account: account.clone(),
            memo: memo.clone(),
            status: TransactionStatus::try_from(status.as_str())?,
        })
    }

    fn to_fields(&self, locale: Locale) -> Row {
        vec![
            locale.format_date(self.date),
            locale.format_currency(self.outflow),
            locale.format_currency(self.inflow),
            self.category.clone(),
            self.account.clone(),
            self.memo.clone(),
            self.status.token().to_string(),
        ]
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}
