//! Category transfer records: money moved between budget categories.
//!
//! Columns `B:G` of the category transfers sheet: date, amount, source,
//! destination, memo and status.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Locale, Money, ResultEngine,
    records::{SheetRecord, parse_status},
    store::Row,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Unknown,
    #[default]
    Unset,
}

impl TransferStatus {
    const TOKENS: [(&'static str, Self); 2] = [("*\u{FE0F}\u{20E3}", Self::Unknown), ("", Self::Unset)];

    pub fn token(self) -> &'static str {
        match self {
            Self::Unknown => "*\u{FE0F}\u{20E3}",
            Self::Unset => "",
        }
    }
}

impl TryFrom<&str> for TransferStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        parse_status("category transfer", value, &Self::TOKENS)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTransfer {
    pub date: NaiveDate,
    /// Signed amount moved from `from` to `to`.
    pub amount: Money,
    pub from: String,
    pub to: String,
    pub memo: String,
    pub status: TransferStatus,
}

impl SheetRecord for CategoryTransfer {
    const KIND: &'static str = "category transfer";
    const TABLE_START: u32 = 8;
    const FIRST_COLUMN: u32 = 1;
    const WIDTH: usize = 6;
    const MIN_FIELDS: usize = 4;

    fn from_fields(fields: &[String], locale: Locale) -> ResultEngine<Self> {
        let [date, amount, from, to, memo, status] = fields else {
            return Err(EngineError::Format(format!(
                "category transfer row must have 6 fields: {fields:?}"
            )));
        };
        Ok(Self {
            date: locale.parse_date(date)?,
            amount: locale.parse_currency(amount)?,
            from: from.clone(),
            to: to.clone(),
            memo: memo.clone(),
            status: TransferStatus::try_from(status.as_str())?,
        })
    }

    fn to_fields(&self, locale: Locale) -> Row {
        vec![
            locale.format_date(self.date),
            locale.format_currency(self.amount),
            self.from.clone(),
            self.to.clone(),
            self.memo.clone(),
            self.status.token().to_string(),
        ]
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}
