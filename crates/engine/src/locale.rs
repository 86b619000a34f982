//! Locale-aware transcoding of the currency and date strings found in the sheets.
//!
//! The spreadsheet stores everything as user-entered text, so the codec needs
//! to know how amounts and dates are rendered. The locale is an explicit value
//! handed to every codec call; there is no process-wide active locale.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Money, ResultEngine,
    money::{PartsError, from_parts},
};

/// Number and date conventions of a spreadsheet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// `€1.234,56` and `31/12/2024`.
    #[default]
    Europe,
    /// `$1,234.56` and `12/31/2024`.
    Us,
    /// `¥1,234.56` and `2024/12/31`.
    China,
}

impl Locale {
    /// Currency symbol prefixed to every amount.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Locale::Europe => '€',
            Locale::Us => '$',
            Locale::China => '¥',
        }
    }

    const fn decimal_separator(self) -> char {
        match self {
            Locale::Europe => ',',
            Locale::Us | Locale::China => '.',
        }
    }

    const fn grouping_separator(self) -> char {
        match self {
            Locale::Europe => '.',
            Locale::Us | Locale::China => ',',
        }
    }

    /// Date patterns, four-digit year first.
    const fn date_formats(self) -> (&'static str, &'static str) {
        match self {
            Locale::Europe => ("%d/%m/%Y", "%d/%m/%y"),
            Locale::Us => ("%m/%d/%Y", "%m/%d/%y"),
            Locale::China => ("%Y/%m/%d", "%y/%m/%d"),
        }
    }

    /// Parses a currency cell. The empty string is zero.
    pub fn parse_currency(self, value: &str) -> ResultEngine<Money> {
        let invalid = || EngineError::Format(format!("invalid currency value: {value:?}"));

        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(Money::ZERO);
        }

        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let rest = rest.strip_prefix(self.symbol()).ok_or_else(invalid)?;
        let (units, fraction) = rest
            .rsplit_once(self.decimal_separator())
            .ok_or_else(invalid)?;
        if fraction.len() != 2 {
            return Err(invalid());
        }
        let units: String = units
            .chars()
            .filter(|c| *c != self.grouping_separator())
            .collect();

        from_parts(negative, &units, fraction).map_err(|err| match err {
            PartsError::Overflow => {
                EngineError::Format(format!("currency value too large: {value:?}"))
            }
            PartsError::Invalid | PartsError::TooManyDecimals => invalid(),
        })
    }

    /// Formats an amount the way it is typed into a currency cell. Zero is the
    /// empty string.
    #[must_use]
    pub fn format_currency(self, amount: Money) -> String {
        if amount.is_zero() {
            return String::new();
        }
        let sign = if amount.is_negative() { "-" } else { "" };
        let (units, cents) = amount.unsigned_parts();
        format!(
            "{sign}{}{units}{}{cents:02}",
            self.symbol(),
            self.decimal_separator()
        )
    }

    /// Year part of a date cell as typed.
    fn year_field(self, value: &str) -> Option<&str> {
        match self {
            Locale::China => value.split('/').next(),
            Locale::Europe | Locale::Us => value.rsplit('/').next(),
        }
    }

    /// Parses a date cell. A year typed with exactly two digits is read as a
    /// short year, any other width as a full year.
    pub fn parse_date(self, value: &str) -> ResultEngine<NaiveDate> {
        let trimmed = value.trim();
        let (long, short) = self.date_formats();
        let format = if self.year_field(trimmed).is_some_and(|year| year.len() == 2) {
            short
        } else {
            long
        };
        NaiveDate::parse_from_str(trimmed, format)
            .map_err(|_| EngineError::Format(format!("invalid date: {value:?}")))
    }

    /// Formats a date with a four-digit year.
    #[must_use]
    pub fn format_date(self, date: NaiveDate) -> String {
        date.format(self.date_formats().0).to_string()
    }
}
