//! Stack-like table of records kept in consecutive rows of one sheet.
//!
//! # Indexing
//!
//! Nonnegative indices count rows from the start of the table, with index 0
//! being the row at [`SheetRecord::TABLE_START`]. Negative indices count back
//! from the first empty row: `-1` is the last record, and so on until the start
//! of the table, past which negative indices are invalid.
//!
//! # Normal form
//!
//! Every public operation expects, and leaves behind, a sheet where rows
//! `[0, first_empty_index)` all hold records sorted by date and no row at or
//! after `first_empty_index` holds anything. `first_empty_index` is discovered
//! once when the table is opened and then updated by each mutating operation;
//! it is never re-probed. [`Table::is_healthy`] verifies the form.
//!
//! The private primitives (`generic_get`, `set`, `clear` and their batched
//! versions) work on raw rows and ignore the frontier, so the sheet may be out
//! of normal form between them. By default they refuse to overwrite a record
//! or to clear an empty row; the public operations skip those checks because
//! they know the intermediate state they produce.
//!
//! Nothing is rolled back: if a request fails halfway through an operation the
//! sheet stays as the last successful request left it, and the caller should
//! run the health check before going on.

use std::{marker::PhantomData, slice};

use chrono::NaiveDate;

use crate::{
    EngineError, Locale, ResultEngine,
    a1::CellRange,
    records::{SheetRecord, decode},
    store::{RangeStore, Sheet},
};

/// Rows requested per probe while looking for the end of the table.
pub const DEFAULT_PROBE_WIDTH: u32 = 1000;

/// Rows past the frontier that the health check requires to be empty.
pub const DEFAULT_SAFETY_MARGIN: i64 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Check {
    /// Verify the target rows before writing.
    Enforce,
    Skip,
}

#[derive(Debug)]
pub struct Table<S, R> {
    sheet: Sheet<S>,
    locale: Locale,
    first_empty_index: i64,
    record: PhantomData<fn() -> R>,
}

fn reject_mixed(first: i64, last: i64, operation: &str) -> ResultEngine<()> {
    if first < 0 && last >= 0 {
        return Err(EngineError::Range(format!(
            "{operation} cannot span from negative index {first} to nonnegative index {last}"
        )));
    }
    Ok(())
}

impl<S: RangeStore, R: SheetRecord> Table<S, R> {
    /// Opens the table, probing the sheet to find the first empty row.
    pub async fn open(sheet: Sheet<S>, locale: Locale) -> ResultEngine<Self> {
        Self::open_with_probe_width(sheet, locale, DEFAULT_PROBE_WIDTH).await
    }

    /// Like [`Table::open`], probing `probe_width` rows per request.
    pub async fn open_with_probe_width(
        sheet: Sheet<S>,
        locale: Locale,
        probe_width: u32,
    ) -> ResultEngine<Self> {
        let probe_width = probe_width.max(1);
        let mut batch: u32 = 0;
        let first_empty_index = loop {
            let first_row = R::TABLE_START + probe_width * batch;
            let range = CellRange::rows(
                R::FIRST_COLUMN,
                R::FIRST_COLUMN,
                first_row,
                first_row + probe_width - 1,
            );
            let found = sheet.get(&range).await?.len() as u32;
            tracing::debug!("probe {}!{range}: {found} rows", sheet.name());
            if found < probe_width {
                break i64::from(probe_width) * i64::from(batch) + i64::from(found);
            }
            batch += 1;
        };

        tracing::info!(
            "opened {} table in sheet {:?} with {first_empty_index} records",
            R::KIND,
            sheet.name()
        );
        Ok(Self {
            sheet,
            locale,
            first_empty_index,
            record: PhantomData,
        })
    }

    /// Logical index of the first row without a record.
    pub fn first_empty_index(&self) -> i64 {
        self.first_empty_index
    }

    pub fn len(&self) -> usize {
        self.first_empty_index as usize
    }

    pub fn is_empty(&self) -> bool {
        self.first_empty_index == 0
    }

    pub fn sheet(&self) -> &Sheet<S> {
        &self.sheet
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Sheet row of a logical index.
    fn physical_row(&self, index: i64) -> ResultEngine<u32> {
        let past_end = || EngineError::Range(format!("index {index} is past the end of the sheet"));
        let start = i64::from(R::TABLE_START);
        let row = if index >= 0 {
            start.checked_add(index)
        } else {
            start
                .checked_add(self.first_empty_index)
                .and_then(|row| row.checked_add(index))
        }
        .ok_or_else(past_end)?;
        if row < start {
            return Err(EngineError::Range(format!(
                "index {index} is before the start of the {} table",
                R::KIND
            )));
        }
        u32::try_from(row).map_err(|_| past_end())
    }

    /// Turns a negative index into the equivalent nonnegative one.
    fn resolve(&self, index: i64) -> ResultEngine<i64> {
        Ok(i64::from(self.physical_row(index)?) - i64::from(R::TABLE_START))
    }

    fn rows(&self, first_row: u32, last_row: u32) -> CellRange {
        CellRange::rows(R::FIRST_COLUMN, R::last_column(), first_row, last_row)
    }

    fn require_live(&self, records: Vec<Option<R>>, first: i64) -> ResultEngine<Vec<R>> {
        records
            .into_iter()
            .enumerate()
            .map(|(offset, record)| {
                record.ok_or_else(|| {
                    EngineError::EmptyTarget(format!(
                        "{} table has an empty row at index {}",
                        R::KIND,
                        first + offset as i64
                    ))
                })
            })
            .collect()
    }

    fn advance(&mut self, delta: i64) {
        self.first_empty_index += delta;
        tracing::debug!(
            "{} first empty index is now {}",
            R::KIND,
            self.first_empty_index
        );
    }

    async fn generic_get(&self, index: i64) -> ResultEngine<Option<R>> {
        let row = self.physical_row(index)?;
        let grid = self.sheet.get(&self.rows(row, row)).await?;
        match grid.first() {
            Some(cells) => decode(cells, self.locale),
            None => Ok(None),
        }
    }

    async fn generic_batch_get(&self, first: i64, last: i64) -> ResultEngine<Vec<Option<R>>> {
        if first > last {
            return Ok(Vec::new());
        }
        reject_mixed(first, last, "batch get")?;

        let first_row = self.physical_row(first)?;
        let last_row = self.physical_row(last)?;
        let range = self.rows(first_row, last_row);
        let grid = self.sheet.get(&range).await?;
        tracing::debug!("get {}!{range}: {} rows", self.sheet.name(), grid.len());

        let mut records = grid
            .iter()
            .map(|cells| decode(cells, self.locale))
            .collect::<ResultEngine<Vec<_>>>()?;
        records.resize((last_row - first_row + 1) as usize, None);
        Ok(records)
    }

    async fn set(&self, index: i64, record: &R, check: Check) -> ResultEngine<()> {
        self.batch_set(index, slice::from_ref(record), check).await
    }

    async fn batch_set(&self, start: i64, records: &[R], check: Check) -> ResultEngine<()> {
        if records.is_empty() {
            return Ok(());
        }
        let start = self.resolve(start)?;
        let end = start + records.len() as i64 - 1;
        if check == Check::Enforce {
            let existing = self.generic_batch_get(start, end).await?;
            if let Some(offset) = existing.iter().position(Option::is_some) {
                return Err(EngineError::Overwrite(format!(
                    "{} at index {} would be overwritten",
                    R::KIND,
                    start + offset as i64
                )));
            }
        }

        let range = self.rows(self.physical_row(start)?, self.physical_row(end)?);
        let data = records
            .iter()
            .map(|record| record.to_fields(self.locale))
            .collect();
        tracing::debug!("set {}!{range}: {} rows", self.sheet.name(), records.len());
        self.sheet.set(&range, data).await
    }

    async fn clear(&self, index: i64, check: Check) -> ResultEngine<()> {
        self.batch_clear(index, index, check).await
    }

    async fn batch_clear(&self, first: i64, last: i64, check: Check) -> ResultEngine<()> {
        if first > last {
            return Ok(());
        }
        if check == Check::Enforce {
            let existing = self.generic_batch_get(first, last).await?;
            if let Some(offset) = existing.iter().position(Option::is_none) {
                return Err(EngineError::EmptyTarget(format!(
                    "{} row at index {} is already empty",
                    R::KIND,
                    first + offset as i64
                )));
            }
        }

        let range = self.rows(self.physical_row(first)?, self.physical_row(last)?);
        tracing::debug!("clear {}!{range}", self.sheet.name());
        self.sheet.clear(&range).await
    }

    /// Record at `index`, `None` at or past the first empty index.
    pub async fn get(&self, index: i64) -> ResultEngine<Option<R>> {
        if index >= self.first_empty_index {
            return Ok(None);
        }
        self.generic_get(index).await
    }

    /// Records `first..=last`; positions at or past the first empty index are
    /// `None` and are not read from the sheet.
    pub async fn batch_get(&self, first: i64, last: i64) -> ResultEngine<Vec<Option<R>>> {
        if first > last {
            return Ok(Vec::new());
        }
        reject_mixed(first, last, "batch_get")?;
        let first = self.resolve(first)?;
        let last = self.resolve(last)?;
        let len = (last - first + 1) as usize;

        if first >= self.first_empty_index {
            return Ok(vec![None; len]);
        }
        if last >= self.first_empty_index {
            let mut records = self
                .generic_batch_get(first, self.first_empty_index - 1)
                .await?;
            records.resize(len, None);
            return Ok(records);
        }
        self.generic_batch_get(first, last).await
    }

    /// Every record of the table, in order.
    pub async fn all(&self) -> ResultEngine<Vec<R>> {
        let records = self.batch_get(0, self.first_empty_index - 1).await?;
        self.require_live(records, 0)
    }

    /// Appends a record after the last one.
    pub async fn push(&mut self, record: &R) -> ResultEngine<()> {
        self.batch_push(slice::from_ref(record)).await
    }

    /// Appends records after the last one.
    pub async fn batch_push(&mut self, records: &[R]) -> ResultEngine<()> {
        self.batch_set(self.first_empty_index, records, Check::Skip)
            .await?;
        self.advance(records.len() as i64);
        Ok(())
    }

    /// Removes and returns the record at `index`, shifting later records up.
    pub async fn pop(&mut self, index: i64) -> ResultEngine<R> {
        let index = self.resolve(index)?;
        if index >= self.first_empty_index {
            return Err(EngineError::Range(format!(
                "cannot pop index {index}: the {} table has {} records",
                R::KIND,
                self.first_empty_index
            )));
        }

        let last = self.first_empty_index - 1;
        let live = self.batch_get(index, last).await?;
        let mut live = self.require_live(live, index)?;
        let tail = live.split_off(1);
        let Some(element) = live.pop() else {
            return Err(EngineError::EmptyTarget(format!(
                "{} row at index {index} is empty",
                R::KIND
            )));
        };

        self.batch_set(index, &tail, Check::Skip).await?;
        self.clear(last, Check::Skip).await?;
        self.advance(-1);
        Ok(element)
    }

    /// Removes and returns the records `first..=last`, shifting later records
    /// up.
    pub async fn batch_pop(&mut self, first: i64, last: i64) -> ResultEngine<Vec<R>> {
        if first > last {
            return Ok(Vec::new());
        }
        reject_mixed(first, last, "batch_pop")?;
        let first = self.resolve(first)?;
        let last = self.resolve(last)?;
        if last >= self.first_empty_index {
            return Err(EngineError::Range(format!(
                "cannot pop indices {first}..={last}: the {} table has {} records",
                R::KIND,
                self.first_empty_index
            )));
        }

        let count = last - first + 1;
        let live = self
            .batch_get(first, self.first_empty_index - 1)
            .await?;
        let mut popped = self.require_live(live, first)?;
        let tail = popped.split_off(count as usize);

        self.batch_clear(
            self.first_empty_index - count,
            self.first_empty_index - 1,
            Check::Skip,
        )
        .await?;
        self.batch_set(first, &tail, Check::Skip).await?;
        self.advance(-count);
        Ok(popped)
    }

    /// Inserts a record at `index`, shifting the records from `index` on down.
    pub async fn insert(&mut self, index: i64, record: &R) -> ResultEngine<()> {
        self.batch_insert(index, slice::from_ref(record)).await
    }

    /// Inserts records starting at `index`, shifting the records from `index`
    /// on down.
    pub async fn batch_insert(&mut self, index: i64, records: &[R]) -> ResultEngine<()> {
        let index = self.resolve(index)?;
        if index > self.first_empty_index {
            return Err(EngineError::Range(format!(
                "cannot insert at index {index}: the {} table has {} records",
                R::KIND,
                self.first_empty_index
            )));
        }
        if records.is_empty() {
            return Ok(());
        }

        let tail = self
            .batch_get(index, self.first_empty_index - 1)
            .await?;
        let tail = self.require_live(tail, index)?;
        let mut shifted = Vec::with_capacity(records.len() + tail.len());
        shifted.extend_from_slice(records);
        shifted.extend(tail);

        self.batch_set(index, &shifted, Check::Skip).await?;
        self.advance(records.len() as i64);
        Ok(())
    }

    /// Inserts a record after every record dated on or before it, returning
    /// the index it landed at.
    pub async fn insert_by_date(&mut self, record: &R) -> ResultEngine<i64> {
        let index = if self.is_empty() {
            0
        } else {
            let range = CellRange::rows(
                R::FIRST_COLUMN,
                R::FIRST_COLUMN,
                R::TABLE_START,
                self.physical_row(self.first_empty_index - 1)?,
            );
            let dates = self
                .sheet
                .get(&range)
                .await?
                .iter()
                .map(|cells| match cells.first() {
                    Some(cell) if !cell.is_empty() => self.locale.parse_date(cell),
                    _ => Err(EngineError::EmptyTarget(format!(
                        "{} table has an undated row",
                        R::KIND
                    ))),
                })
                .collect::<ResultEngine<Vec<NaiveDate>>>()?;
            dates.partition_point(|date| *date <= record.date()) as i64
        };
        self.insert(index, record).await?;
        Ok(index)
    }

    /// Overwrites the record at `index`.
    pub async fn replace(&mut self, index: i64, record: &R) -> ResultEngine<()> {
        let index = self.resolve(index)?;
        if index >= self.first_empty_index {
            return Err(EngineError::Range(format!(
                "cannot replace index {index}: the {} table has {} records",
                R::KIND,
                self.first_empty_index
            )));
        }
        self.set(index, record, Check::Skip).await
    }

    /// Overwrites the records from `index` on. Cannot grow the table.
    pub async fn batch_replace(&mut self, index: i64, records: &[R]) -> ResultEngine<()> {
        if records.is_empty() {
            return Ok(());
        }
        let index = self.resolve(index)?;
        let end = index + records.len() as i64 - 1;
        if end >= self.first_empty_index {
            return Err(EngineError::Range(format!(
                "cannot replace indices {index}..={end}: the {} table has {} records",
                R::KIND,
                self.first_empty_index
            )));
        }
        self.batch_set(index, records, Check::Skip).await
    }

    /// Checks the normal form with the default safety margin.
    pub async fn is_healthy(&self) -> bool {
        self.is_healthy_with_margin(DEFAULT_SAFETY_MARGIN).await
    }

    /// Checks that every row before the first empty index holds a record, that
    /// dates never decrease, and that the `margin + 1` rows from the first
    /// empty index on are empty. Never fails: any error counts as unhealthy.
    pub async fn is_healthy_with_margin(&self, margin: i64) -> bool {
        match self.find_violation(margin).await {
            Ok(None) => true,
            Ok(Some(violation)) => {
                tracing::warn!("{} table is unhealthy: {violation}", R::KIND);
                false
            }
            Err(err) => {
                tracing::warn!("{} table health check failed: {err}", R::KIND);
                false
            }
        }
    }

    /// Like [`Table::is_healthy`], but reports the violation as an
    /// [`EngineError::Unhealthy`] and propagates store failures.
    pub async fn ensure_healthy(&self) -> ResultEngine<()> {
        match self.find_violation(DEFAULT_SAFETY_MARGIN).await {
            Ok(None) => Ok(()),
            Ok(Some(violation)) => Err(EngineError::Unhealthy(format!(
                "{} table in sheet {:?}: {violation}",
                R::KIND,
                self.sheet.name()
            ))),
            Err(EngineError::Format(msg)) => Err(EngineError::Unhealthy(msg)),
            Err(err) => Err(err),
        }
    }

    async fn find_violation(&self, margin: i64) -> ResultEngine<Option<String>> {
        let live = self
            .generic_batch_get(0, self.first_empty_index - 1)
            .await?;
        if let Some(index) = live.iter().position(Option::is_none) {
            return Ok(Some(format!("empty row at index {index}")));
        }
        let dates: Vec<NaiveDate> = live.iter().flatten().map(SheetRecord::date).collect();
        if let Some(index) = dates.windows(2).position(|pair| pair[0] > pair[1]) {
            return Ok(Some(format!(
                "record at index {} is dated before the one preceding it",
                index + 1
            )));
        }

        let beyond = self
            .generic_batch_get(
                self.first_empty_index,
                self.first_empty_index.saturating_add(margin),
            )
            .await?;
        if let Some(offset) = beyond.iter().position(Option::is_some) {
            return Ok(Some(format!(
                "record at index {} is past the first empty index {}",
                self.first_empty_index + offset as i64,
                self.first_empty_index
            )));
        }
        Ok(None)
    }
}
