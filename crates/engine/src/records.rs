//! Record codec: one sheet row to one typed record and back.
//!
//! A row of nothing decodes to an absent record (`None`), and an absent record
//! encodes to an empty row. Present records always encode to a fixed-width
//! row, and `decode(encode(r)) == r`.

use std::fmt;

use chrono::NaiveDate;

use crate::{EngineError, Locale, ResultEngine, store::Row};

/// A record kind stored as a table of contiguous rows in its own sheet.
pub trait SheetRecord: Clone + fmt::Debug + PartialEq + Send + Sync {
    /// Human readable name used in logs and errors.
    const KIND: &'static str;
    /// Sheet row (1-based) holding the record at logical index 0.
    const TABLE_START: u32;
    /// First column of the record (0-indexed, `1` is column `B`).
    const FIRST_COLUMN: u32;
    /// Number of cells in an encoded record.
    const WIDTH: usize;
    /// Minimum number of cells in a non-empty row; the store trims trailing
    /// blanks, so the remaining optional fields are padded back.
    const MIN_FIELDS: usize;

    /// Builds a record out of exactly [`Self::WIDTH`] cells.
    fn from_fields(fields: &[String], locale: Locale) -> ResultEngine<Self>;

    /// Encodes the record into exactly [`Self::WIDTH`] cells.
    fn to_fields(&self, locale: Locale) -> Row;

    /// Date the table is sorted by.
    fn date(&self) -> NaiveDate;

    /// Last column of the record (0-indexed).
    fn last_column() -> u32 {
        Self::FIRST_COLUMN + Self::WIDTH as u32 - 1
    }
}

/// Decodes a sheet row, `None` when the row holds nothing.
pub fn decode<R: SheetRecord>(row: &[String], locale: Locale) -> ResultEngine<Option<R>> {
    if row.iter().all(String::is_empty) {
        return Ok(None);
    }
    if row.len() < R::MIN_FIELDS {
        return Err(EngineError::Format(format!(
            "{} row has {} fields, expected at least {}: {row:?}",
            R::KIND,
            row.len(),
            R::MIN_FIELDS
        )));
    }
    if row.len() > R::WIDTH {
        return Err(EngineError::Format(format!(
            "{} row has {} fields, expected at most {}: {row:?}",
            R::KIND,
            row.len(),
            R::WIDTH
        )));
    }

    let mut fields = row.to_vec();
    fields.resize(R::WIDTH, String::new());
    R::from_fields(&fields, locale).map(Some)
}

/// Encodes a record; an absent record is an empty row.
pub fn encode<R: SheetRecord>(record: Option<&R>, locale: Locale) -> Row {
    record.map(|r| r.to_fields(locale)).unwrap_or_default()
}

/// Maps a status cell to one of the known tokens.
pub(crate) fn parse_status<T: Copy>(
    kind: &str,
    value: &str,
    tokens: &[(&str, T)],
) -> ResultEngine<T> {
    tokens
        .iter()
        .find(|(token, _)| *token == value)
        .map(|(_, status)| *status)
        .ok_or_else(|| EngineError::Format(format!("unknown {kind} status: {value:?}")))
}
