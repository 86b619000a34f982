use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use crate::{
    EngineError, ResultEngine,
    a1::{CellRange, CellRef},
};

use super::{Grid, MajorDimension, RangeStore};

type Cells = BTreeMap<CellRef, String>;

/// In-process range store.
///
/// Follows the same trimming rules as the remote spreadsheet, stores values
/// verbatim, counts every request and can be switched offline so that every
/// call fails with a remote error.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: Mutex<HashMap<String, Cells>>,
    requests: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of get/set/clear calls served so far, failed ones included.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Makes every following call fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Seeds rows starting at `top_left` without counting as a request.
    pub fn load(&self, sheet: &str, top_left: CellRef, rows: Grid) -> ResultEngine<()> {
        let mut sheets = self.lock()?;
        let cells = sheets.entry(sheet.to_string()).or_default();
        for (i, row) in rows.into_iter().enumerate() {
            for (j, value) in row.into_iter().enumerate() {
                write_cell(
                    cells,
                    CellRef::new(top_left.row + i as u32, top_left.col + j as u32),
                    value,
                );
            }
        }
        Ok(())
    }

    /// Current value of a cell, `None` when blank.
    pub fn cell(&self, sheet: &str, cell: CellRef) -> ResultEngine<Option<String>> {
        Ok(self
            .lock()?
            .get(sheet)
            .and_then(|cells| cells.get(&cell))
            .cloned())
    }

    fn lock(&self) -> ResultEngine<MutexGuard<'_, HashMap<String, Cells>>> {
        self.sheets
            .lock()
            .map_err(|_| EngineError::Remote("memory store lock poisoned".to_string()))
    }

    fn begin_request(&self, what: &str, sheet: &str, range: &CellRange) -> ResultEngine<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(EngineError::Remote(format!(
                "{what} {sheet}!{range}: store offline"
            )));
        }
        Ok(())
    }
}

fn write_cell(cells: &mut Cells, cell: CellRef, value: String) {
    if value.is_empty() {
        cells.remove(&cell);
    } else {
        cells.insert(cell, value);
    }
}

fn trim_trailing(grid: &mut Grid) {
    for line in grid.iter_mut() {
        while line.last().is_some_and(String::is_empty) {
            line.pop();
        }
    }
    while grid.last().is_some_and(Vec::is_empty) {
        grid.pop();
    }
}

impl RangeStore for MemoryStore {
    async fn get(
        &self,
        sheet: &str,
        range: &CellRange,
        major: MajorDimension,
    ) -> ResultEngine<Grid> {
        self.begin_request("get", sheet, range)?;
        let sheets = self.lock()?;
        let Some(cells) = sheets.get(sheet) else {
            return Ok(Vec::new());
        };

        let value = |row: u32, col: u32| {
            cells
                .get(&CellRef::new(row, col))
                .cloned()
                .unwrap_or_default()
        };
        let mut grid: Grid = match major {
            MajorDimension::Rows => (range.start.row..=range.end.row)
                .map(|row| {
                    let occupied = cells
                        .range(CellRef::new(row, range.start.col)..=CellRef::new(row, range.end.col))
                        .next()
                        .is_some();
                    if occupied {
                        (range.start.col..=range.end.col)
                            .map(|col| value(row, col))
                            .collect()
                    } else {
                        Vec::new()
                    }
                })
                .collect(),
            MajorDimension::Columns => (range.start.col..=range.end.col)
                .map(|col| {
                    (range.start.row..=range.end.row)
                        .map(|row| value(row, col))
                        .collect()
                })
                .collect(),
        };
        trim_trailing(&mut grid);
        Ok(grid)
    }

    async fn set(
        &self,
        sheet: &str,
        range: &CellRange,
        data: Grid,
        major: MajorDimension,
    ) -> ResultEngine<()> {
        self.begin_request("set", sheet, range)?;
        let (major_len, minor_len) = match major {
            MajorDimension::Rows => (range.height(), range.width()),
            MajorDimension::Columns => (range.width(), range.height()),
        };
        if data.len() > major_len as usize
            || data.iter().any(|line| line.len() > minor_len as usize)
        {
            return Err(EngineError::Remote(format!(
                "set {sheet}!{range}: data does not fit into the range"
            )));
        }

        let mut sheets = self.lock()?;
        let cells = sheets.entry(sheet.to_string()).or_default();
        for (i, line) in data.into_iter().enumerate() {
            for (j, value) in line.into_iter().enumerate() {
                let (i, j) = (i as u32, j as u32);
                let cell = match major {
                    MajorDimension::Rows => CellRef::new(range.start.row + i, range.start.col + j),
                    MajorDimension::Columns => {
                        CellRef::new(range.start.row + j, range.start.col + i)
                    }
                };
                write_cell(cells, cell, value);
            }
        }
        Ok(())
    }

    async fn clear(&self, sheet: &str, range: &CellRange) -> ResultEngine<()> {
        self.begin_request("clear", sheet, range)?;
        let mut sheets = self.lock()?;
        if let Some(cells) = sheets.get_mut(sheet) {
            cells.retain(|cell, _| !range.contains(*cell));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect()
    }

    #[tokio::test]
    async fn get_trims_trailing_rows_and_columns() {
        let store = MemoryStore::new();
        store
            .load(
                "S",
                CellRef::new(2, 1),
                grid(&[&["a", "b", ""], &[], &["c"]]),
            )
            .unwrap();

        let range = CellRange::from_a1("B1:E10").unwrap();
        let got = store.get("S", &range, MajorDimension::Rows).await.unwrap();
        assert_eq!(got, grid(&[&[], &["a", "b"], &[], &["c"]]));

        let columns = store.get("S", &range, MajorDimension::Columns).await.unwrap();
        assert_eq!(columns, grid(&[&["", "a", "", "c"], &["", "b"]]));

        let empty = CellRange::from_a1("B20:E30").unwrap();
        assert!(store.get("S", &empty, MajorDimension::Rows).await.unwrap().is_empty());
        assert!(store.get("missing", &range, MajorDimension::Rows).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_and_clear() {
        let store = MemoryStore::new();
        let range = CellRange::from_a1("B2:C3").unwrap();
        store
            .set("S", &range, grid(&[&["1", "2"], &["3"]]), MajorDimension::Rows)
            .await
            .unwrap();
        assert_eq!(store.cell("S", CellRef::new(3, 1)).unwrap().as_deref(), Some("3"));

        let too_wide = grid(&[&["1", "2", "3"]]);
        assert!(store.set("S", &range, too_wide, MajorDimension::Rows).await.is_err());

        store.clear("S", &CellRange::from_a1("B2:B3").unwrap()).await.unwrap();
        let got = store.get("S", &range, MajorDimension::Rows).await.unwrap();
        assert_eq!(got, grid(&[&["", "2"]]));
        assert_eq!(store.requests(), 4);
    }

    #[tokio::test]
    async fn offline_store_fails_with_remote_error() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let range = CellRange::from_a1("A1").unwrap();
        let err = store.get("S", &range, MajorDimension::Rows).await.unwrap_err();
        assert!(matches!(err, EngineError::Remote(_)));
    }
}
