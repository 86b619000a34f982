//! Reads the totals the spreadsheet computes on its dashboard sheet.

use crate::{
    EngineError, Locale, Money, ResultEngine,
    a1::{CellRange, CellRef},
    configuration::Configuration,
    store::{RangeStore, Sheet},
};

/// First dashboard row of the account balances; each account takes two rows.
const BALANCE_START_ROW: u32 = 8;
/// Dashboard row of the category block's first line.
const CATEGORY_START_ROW: u32 = 6;

/// Dashboard row of the monthly totals.
const SUMMARY_ROW: u32 = 2;

const COL_C: u32 = 2;
const COL_H: u32 = 7;
const COL_I: u32 = 8;
const COL_K: u32 = 10;
const COL_L: u32 = 11;
const COL_O: u32 = 14;

/// Keyed single-cell lookups on the dashboard, resolved through the
/// configuration's account and category indexes.
#[derive(Debug)]
pub struct Dashboard<'a, S> {
    sheet: &'a Sheet<S>,
    configuration: &'a Configuration,
    locale: Locale,
}

impl<'a, S: RangeStore> Dashboard<'a, S> {
    pub fn new(sheet: &'a Sheet<S>, configuration: &'a Configuration, locale: Locale) -> Self {
        Self {
            sheet,
            configuration,
            locale,
        }
    }

    async fn currency_at(&self, cell: CellRef) -> ResultEngine<Money> {
        let value = self.sheet.get_cell(&CellRange::cell(cell)).await?;
        self.locale.parse_currency(&value)
    }

    async fn category_cell(&self, category_or_group: &str, col: u32) -> ResultEngine<Money> {
        let offset = self
            .configuration
            .category_or_group_offset(category_or_group)?;
        self.currency_at(CellRef::new(CATEGORY_START_ROW + offset as u32, col))
            .await
    }

    /// Current balance of an account or credit card.
    pub async fn balance(&self, account: &str) -> ResultEngine<Money> {
        let index = self.configuration.account_index(account)? as u32;
        self.currency_at(CellRef::new(BALANCE_START_ROW + 2 * index, COL_C))
            .await
    }

    pub async fn available_to_budget(&self) -> ResultEngine<Money> {
        self.currency_at(CellRef::new(SUMMARY_ROW, COL_H)).await
    }

    pub async fn spent_this_month(&self) -> ResultEngine<Money> {
        self.currency_at(CellRef::new(SUMMARY_ROW, COL_I)).await
    }

    pub async fn budgeted_this_month(&self) -> ResultEngine<Money> {
        self.currency_at(CellRef::new(SUMMARY_ROW, COL_K)).await
    }

    /// Number of transactions still marked as pending.
    pub async fn pending_transactions(&self) -> ResultEngine<u32> {
        let value = self
            .sheet
            .get_cell(&CellRange::cell(CellRef::new(SUMMARY_ROW, COL_O)))
            .await?;
        if value.is_empty() {
            return Ok(0);
        }
        value
            .trim()
            .parse()
            .map_err(|_| EngineError::Format(format!("invalid pending transaction count: {value:?}")))
    }

    pub async fn available(&self, category_or_group: &str) -> ResultEngine<Money> {
        self.category_cell(category_or_group, COL_I).await
    }

    pub async fn activity(&self, category_or_group: &str) -> ResultEngine<Money> {
        self.category_cell(category_or_group, COL_L).await
    }

    pub async fn budgeted(&self, category_or_group: &str) -> ResultEngine<Money> {
        self.category_cell(category_or_group, COL_O).await
    }
}
