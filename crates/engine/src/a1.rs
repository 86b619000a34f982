//! A1 notation for the cells and ranges addressed in the range store.

use core::fmt;

use crate::{EngineError, ResultEngine};

/// A single cell of a sheet.
///
/// `row` is **1-based**, exactly as shown in the spreadsheet UI, while `col`
/// is **0-indexed** (`col = 0` is column `A`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse an A1-style reference (e.g. `B9`, `$H$23`).
    pub fn from_a1(a1: &str) -> ResultEngine<Self> {
        let invalid = || EngineError::Format(format!("invalid A1 reference: {a1:?}"));
        let s = a1.trim().replace('$', "");
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = s.split_at(split);
        let col = name_to_col(letters).ok_or_else(invalid)?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        Ok(Self { row, col })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_name(self.col), self.row)
    }
}

/// A rectangular, inclusive region of a sheet.
///
/// Always normalized such that `start.row <= end.row` and
/// `start.col <= end.col`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Construct a new range, normalizing coordinates if needed.
    pub const fn new(a: CellRef, b: CellRef) -> Self {
        let start_row = if a.row <= b.row { a.row } else { b.row };
        let end_row = if a.row <= b.row { b.row } else { a.row };
        let start_col = if a.col <= b.col { a.col } else { b.col };
        let end_col = if a.col <= b.col { b.col } else { a.col };
        Self {
            start: CellRef::new(start_row, start_col),
            end: CellRef::new(end_row, end_col),
        }
    }

    /// The rows `first_row..=last_row` across columns `first_col..=last_col`.
    pub const fn rows(first_col: u32, last_col: u32, first_row: u32, last_row: u32) -> Self {
        Self::new(
            CellRef::new(first_row, first_col),
            CellRef::new(last_row, last_col),
        )
    }

    pub const fn cell(cell: CellRef) -> Self {
        Self::new(cell, cell)
    }

    #[inline]
    pub const fn contains(&self, cell: CellRef) -> bool {
        cell.row >= self.start.row
            && cell.row <= self.end.row
            && cell.col >= self.start.col
            && cell.col <= self.end.col
    }

    #[inline]
    pub const fn width(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    #[inline]
    pub const fn height(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    #[inline]
    pub const fn is_single_cell(&self) -> bool {
        self.start.row == self.end.row && self.start.col == self.end.col
    }

    /// Parse a range like `B9:H12` or a single cell like `H2`.
    pub fn from_a1(a1: &str) -> ResultEngine<Self> {
        match a1.trim().split_once(':') {
            None => CellRef::from_a1(a1).map(Self::cell),
            Some((a, b)) => Ok(Self::new(CellRef::from_a1(a)?, CellRef::from_a1(b)?)),
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// Column letters for a 0-indexed column (`0 -> A`, `27 -> AB`).
pub fn col_to_name(col: u32) -> String {
    let mut n = col + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

/// 0-indexed column for a run of column letters, `None` if not letters.
pub fn name_to_col(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for b in s.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let v = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col.checked_mul(26)?.checked_add(v)?;
    }
    Some(col - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names() {
        assert_eq!(col_to_name(0), "A");
        assert_eq!(col_to_name(1), "B");
        assert_eq!(col_to_name(25), "Z");
        assert_eq!(col_to_name(26), "AA");
        assert_eq!(col_to_name(27), "AB");
        assert_eq!(name_to_col("h"), Some(7));
        assert_eq!(name_to_col("AA"), Some(26));
        assert_eq!(name_to_col("A1"), None);
    }

    #[test]
    fn ranges_display_in_a1() {
        assert_eq!(CellRange::rows(1, 7, 9, 12).to_string(), "B9:H12");
        assert_eq!(CellRange::cell(CellRef::new(2, 7)).to_string(), "H2");
        assert_eq!(CellRange::from_a1("$B$9:H12").unwrap(), CellRange::rows(1, 7, 9, 12));
        assert_eq!(CellRange::from_a1("H12:B9").unwrap(), CellRange::rows(1, 7, 9, 12));
    }

    #[test]
    fn rejects_bad_references() {
        assert!(CellRef::from_a1("9B").is_err());
        assert!(CellRef::from_a1("B0").is_err());
        assert!(CellRef::from_a1("B").is_err());
        assert!(CellRange::from_a1("").is_err());
    }

    #[test]
    fn dimensions() {
        let range = CellRange::rows(1, 6, 8, 17);
        assert_eq!(range.width(), 6);
        assert_eq!(range.height(), 10);
        assert!(range.contains(CellRef::new(8, 1)));
        assert!(!range.contains(CellRef::new(18, 1)));
    }
}
