//! The range store contract the tables are built on.
//!
//! A range store is a remote, cell-addressed spreadsheet offering get, set and
//! clear over rectangular ranges of a named sheet. It has no notion of row
//! count, no transactions and no locks; everything the tables guarantee is
//! built on top of these three calls.

use std::{future::Future, sync::Arc};

use crate::{ResultEngine, a1::CellRange};

mod memory;
mod throttled;

pub use memory::MemoryStore;
pub use throttled::Throttled;

/// One row (or column, see [`MajorDimension`]) of cell values.
pub type Row = Vec<String>;
/// A 2-D block of cell values.
pub type Grid = Vec<Row>;

/// Whether a [`Grid`] lists rows or columns first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MajorDimension {
    #[default]
    Rows,
    Columns,
}

impl MajorDimension {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rows => "ROWS",
            Self::Columns => "COLUMNS",
        }
    }
}

/// A remote store addressed by sheet name and A1 range.
///
/// Implementations must follow these rules:
/// - `get` returns one entry per major dimension actually containing data, in
///   order; trailing empty rows/columns are omitted, interior empty ones are
///   returned as empty entries, and a wholly empty range returns an empty grid.
/// - `set` writes values as if typed by a user (the store may reformat them)
///   and may fail if the data does not fit into the range.
/// - `clear` blanks every cell of the range.
///
/// There is no transactional guarantee across calls. Failures surface as
/// [`EngineError::Remote`](crate::EngineError::Remote).
pub trait RangeStore: Send + Sync {
    fn get(
        &self,
        sheet: &str,
        range: &CellRange,
        major: MajorDimension,
    ) -> impl Future<Output = ResultEngine<Grid>> + Send;

    fn set(
        &self,
        sheet: &str,
        range: &CellRange,
        data: Grid,
        major: MajorDimension,
    ) -> impl Future<Output = ResultEngine<()>> + Send;

    fn clear(&self, sheet: &str, range: &CellRange)
    -> impl Future<Output = ResultEngine<()>> + Send;
}

/// A range store bound to a single sheet.
#[derive(Debug)]
pub struct Sheet<S> {
    name: String,
    store: Arc<S>,
}

impl<S> Clone for Sheet<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RangeStore> Sheet<S> {
    pub fn new(name: impl Into<String>, store: Arc<S>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, range: &CellRange) -> ResultEngine<Grid> {
        self.store.get(&self.name, range, MajorDimension::Rows).await
    }

    pub async fn set(&self, range: &CellRange, data: Grid) -> ResultEngine<()> {
        self.store
            .set(&self.name, range, data, MajorDimension::Rows)
            .await
    }

    pub async fn clear(&self, range: &CellRange) -> ResultEngine<()> {
        self.store.clear(&self.name, range).await
    }

    /// Reads a single cell, empty string when the cell is blank.
    pub async fn get_cell(&self, range: &CellRange) -> ResultEngine<String> {
        let grid = self.get(range).await?;
        Ok(grid
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or_default())
    }
}
