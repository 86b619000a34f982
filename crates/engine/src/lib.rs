use std::sync::Arc;

use serde::Deserialize;

pub use a1::{CellRange, CellRef};
pub use category_transfers::{CategoryTransfer, TransferStatus};
pub use configuration::{Category, CategoryGroup, Configuration};
pub use dashboard::Dashboard;
pub use error::EngineError;
pub use locale::Locale;
pub use money::Money;
pub use records::{SheetRecord, decode, encode};
pub use store::{Grid, MajorDimension, MemoryStore, RangeStore, Row, Sheet, Throttled};
pub use table::{DEFAULT_PROBE_WIDTH, DEFAULT_SAFETY_MARGIN, Table};
pub use transactions::{Transaction, TransactionStatus};

pub mod a1;
mod category_transfers;
pub mod configuration;
mod dashboard;
mod error;
mod locale;
mod money;
mod records;
pub mod store;
mod table;
mod transactions;

type ResultEngine<T> = Result<T, EngineError>;

/// The transactions sheet as a table.
pub type Transactions<S> = Table<S, Transaction>;
/// The category transfers sheet as a table.
pub type CategoryTransfers<S> = Table<S, CategoryTransfer>;

/// Names of the four sheets of the budget spreadsheet.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub dashboard: String,
    pub category_transfers: String,
    pub transactions: String,
    pub configuration: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            dashboard: "Dashboard".to_string(),
            category_transfers: "Category Transfers".to_string(),
            transactions: "Transactions".to_string(),
            configuration: "Configuration".to_string(),
        }
    }
}

/// A budget spreadsheet: configuration, dashboard and the two record tables,
/// all backed by the same range store.
///
/// The configuration is read when the value is built; the tables are opened
/// (and probed) the first time they are asked for.
#[derive(Debug)]
pub struct Aspire<S> {
    store: Arc<S>,
    locale: Locale,
    sheet_names: SheetNames,
    ensure_healthy: bool,
    configuration_sheet: Sheet<S>,
    dashboard_sheet: Sheet<S>,
    configuration: Configuration,
    transactions: Option<Transactions<S>>,
    category_transfers: Option<CategoryTransfers<S>>,
}

impl<S: RangeStore> Aspire<S> {
    /// Return a builder for `Aspire`. Help to build the struct.
    pub fn builder(store: Arc<S>) -> AspireBuilder<S> {
        AspireBuilder {
            store,
            locale: Locale::default(),
            sheet_names: SheetNames::default(),
            ensure_healthy: true,
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Re-reads the configuration sheet.
    pub async fn reload_configuration(&mut self) -> ResultEngine<()> {
        self.configuration
            .reload(
                &self.configuration_sheet,
                self.locale,
                configuration::DEFAULT_TOTAL_ROWS,
            )
            .await
    }

    pub fn dashboard(&self) -> Dashboard<'_, S> {
        Dashboard::new(&self.dashboard_sheet, &self.configuration, self.locale)
    }

    pub async fn transactions(&mut self) -> ResultEngine<&mut Transactions<S>> {
        let table = match self.transactions.take() {
            Some(table) => table,
            None => self.open_table(&self.sheet_names.transactions).await?,
        };
        Ok(self.transactions.insert(table))
    }

    pub async fn category_transfers(&mut self) -> ResultEngine<&mut CategoryTransfers<S>> {
        let table = match self.category_transfers.take() {
            Some(table) => table,
            None => {
                self.open_table(&self.sheet_names.category_transfers)
                    .await?
            }
        };
        Ok(self.category_transfers.insert(table))
    }

    async fn open_table<R: SheetRecord>(&self, name: &str) -> ResultEngine<Table<S, R>> {
        let sheet = Sheet::new(name, Arc::clone(&self.store));
        let table = Table::open(sheet, self.locale).await?;
        if self.ensure_healthy {
            table.ensure_healthy().await?;
        }
        Ok(table)
    }
}

/// The builder for `Aspire`
#[derive(Debug)]
pub struct AspireBuilder<S> {
    store: Arc<S>,
    locale: Locale,
    sheet_names: SheetNames,
    ensure_healthy: bool,
}

impl<S: RangeStore> AspireBuilder<S> {
    /// Locale the spreadsheet renders amounts and dates in.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn sheet_names(mut self, sheet_names: SheetNames) -> Self {
        self.sheet_names = sheet_names;
        self
    }

    /// Whether opening a table runs the health check (default: true).
    pub fn ensure_healthy(mut self, ensure_healthy: bool) -> Self {
        self.ensure_healthy = ensure_healthy;
        self
    }

    /// Construct `Aspire`, reading the configuration sheet.
    pub async fn build(self) -> ResultEngine<Aspire<S>> {
        let configuration_sheet =
            Sheet::new(self.sheet_names.configuration.clone(), Arc::clone(&self.store));
        let dashboard_sheet = Sheet::new(self.sheet_names.dashboard.clone(), Arc::clone(&self.store));
        let configuration = Configuration::load(&configuration_sheet, self.locale).await?;

        Ok(Aspire {
            store: self.store,
            locale: self.locale,
            sheet_names: self.sheet_names,
            ensure_healthy: self.ensure_healthy,
            configuration_sheet,
            dashboard_sheet,
            configuration,
            transactions: None,
            category_transfers: None,
        })
    }
}
