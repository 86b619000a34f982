//! Reader for the static configuration sheet.
//!
//! The configuration sheet lists accounts, credit cards and the category
//! layout of the budget. It is read once and kept in memory until
//! [`Configuration::reload`] is called; nothing here refreshes on its own.

use std::collections::HashMap;

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{
    EngineError, Locale, Money, ResultEngine,
    a1::CellRange,
    store::{Grid, RangeStore, Sheet},
};

/// Rows spanned by the category block, from row 9 up to (excluding) this one.
pub const DEFAULT_TOTAL_ROWS: u32 = 109;

const GROUP_HEADER: &str = "\u{2726}";
const NECESSARY_TICK: &str = "\u{2713}";

/// One category line of the configuration sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    /// Row offset inside the category block.
    pub offset: usize,
    pub symbol: String,
    pub amount: Option<Money>,
    pub goal: Option<Money>,
    pub necessary: bool,
    /// Group the category is listed under, `None` before the first header.
    pub group: Option<String>,
}

/// A category group and the names of its categories, in sheet order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryGroup {
    /// `None` for the categories listed before the first group header.
    pub name: Option<String>,
    pub categories: Vec<String>,
}

/// Name lookup tolerant to case, accents and punctuation.
#[derive(Clone, Debug, Default)]
struct NameIndex {
    exact: HashMap<String, usize>,
    normalized: HashMap<String, usize>,
}

impl NameIndex {
    fn insert(&mut self, name: &str, offset: usize) {
        self.exact.insert(name.to_string(), offset);
        if let Some(key) = normalize_key(name) {
            self.normalized.entry(key).or_insert(offset);
        }
    }

    fn get(&self, name: &str) -> Option<usize> {
        self.exact
            .get(name)
            .or_else(|| normalize_key(name).and_then(|key| self.normalized.get(&key)))
            .copied()
    }

    fn clear(&mut self) {
        self.exact.clear();
        self.normalized.clear();
    }
}

/// Lowercase, accent-free key with punctuation runs collapsed to one space.
fn normalize_key(input: &str) -> Option<String> {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let trimmed = out.trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn first_cells(grid: Grid) -> Vec<String> {
    grid.into_iter()
        .filter_map(|row| row.into_iter().next())
        .filter(|cell| !cell.is_empty())
        .collect()
}

#[derive(Clone, Debug)]
pub struct Configuration {
    pub monthly_income: Money,
    pub unallocated_income: Money,
    pub half_year_fund: Money,
    pub accounts: Vec<String>,
    pub credit_cards: Vec<String>,
    pub asset_categories: Vec<String>,
    pub debt_categories: Vec<String>,
    pub hidden_categories: Vec<String>,
    pub hidden_accounts: Vec<String>,
    /// Categories in sheet order.
    pub categories: Vec<Category>,
    /// Groups in sheet order.
    pub category_groups: Vec<CategoryGroup>,
    account_index: NameIndex,
    category_or_group_index: NameIndex,
    category_by_name: NameIndex,
}

impl Configuration {
    /// Reads the configuration sheet.
    pub async fn load<S: RangeStore>(sheet: &Sheet<S>, locale: Locale) -> ResultEngine<Self> {
        let mut configuration = Self {
            monthly_income: Money::ZERO,
            unallocated_income: Money::ZERO,
            half_year_fund: Money::ZERO,
            accounts: Vec::new(),
            credit_cards: Vec::new(),
            asset_categories: Vec::new(),
            debt_categories: Vec::new(),
            hidden_categories: Vec::new(),
            hidden_accounts: Vec::new(),
            categories: Vec::new(),
            category_groups: Vec::new(),
            account_index: NameIndex::default(),
            category_or_group_index: NameIndex::default(),
            category_by_name: NameIndex::default(),
        };
        configuration
            .reload(sheet, locale, DEFAULT_TOTAL_ROWS)
            .await?;
        Ok(configuration)
    }

    /// Re-reads every value from the configuration sheet.
    pub async fn reload<S: RangeStore>(
        &mut self,
        sheet: &Sheet<S>,
        locale: Locale,
        total_rows: u32,
    ) -> ResultEngine<()> {
        let cell = |a1: &str| CellRange::from_a1(a1);
        let currency = |value: String| locale.parse_currency(&value);

        self.monthly_income = currency(sheet.get_cell(&cell("B5:C5")?).await?)?;
        self.unallocated_income = currency(sheet.get_cell(&cell("D5")?).await?)?;
        self.half_year_fund = currency(sheet.get_cell(&cell("E5:F5")?).await?)?;

        self.accounts = first_cells(sheet.get(&cell("H9:H23")?).await?);
        self.credit_cards = first_cells(sheet.get(&cell("I9:I23")?).await?);
        self.asset_categories = first_cells(sheet.get(&cell("H28:H35")?).await?);
        self.debt_categories = first_cells(sheet.get(&cell("I28:I35")?).await?);
        self.hidden_categories = first_cells(sheet.get(&cell("H42:H86")?).await?);
        self.hidden_accounts = first_cells(sheet.get(&cell("H93:H107")?).await?);

        self.account_index.clear();
        for (index, account) in self.accounts.iter().chain(&self.credit_cards).enumerate() {
            self.account_index.insert(account, index);
        }

        let block = CellRange::rows(1, 5, 9, total_rows.saturating_sub(1).max(9));
        let rows = sheet.get(&block).await?;
        self.read_categories(rows, locale)?;

        tracing::debug!(
            "loaded configuration: {} accounts, {} categories in {} groups",
            self.accounts.len() + self.credit_cards.len(),
            self.categories.len(),
            self.category_groups.len()
        );
        Ok(())
    }

    fn read_categories(&mut self, rows: Grid, locale: Locale) -> ResultEngine<()> {
        self.categories.clear();
        self.category_or_group_index.clear();
        self.category_by_name.clear();
        let mut groups = vec![CategoryGroup {
            name: None,
            categories: Vec::new(),
        }];

        for (offset, mut row) in rows.into_iter().enumerate() {
            if row.iter().all(String::is_empty) {
                continue;
            }
            if row[0] == GROUP_HEADER {
                let name = row.get(1).cloned().unwrap_or_default();
                if groups.iter().any(|group| group.name.as_deref() == Some(name.as_str())) {
                    return Err(EngineError::ExistingKey(format!("category group {name}")));
                }
                self.category_or_group_index.insert(&name, offset);
                groups.push(CategoryGroup {
                    name: Some(name),
                    categories: Vec::new(),
                });
                continue;
            }

            row.resize(5, String::new());
            let optional_amount = |value: &str| -> ResultEngine<Option<Money>> {
                if value.is_empty() {
                    Ok(None)
                } else {
                    locale.parse_currency(value).map(Some)
                }
            };
            let Some(group) = groups.last_mut() else {
                continue;
            };
            let category = Category {
                name: row[1].clone(),
                offset,
                symbol: row[0].clone(),
                amount: optional_amount(&row[2])?,
                goal: optional_amount(&row[3])?,
                necessary: row[4] == NECESSARY_TICK,
                group: group.name.clone(),
            };
            group.categories.push(category.name.clone());
            self.category_or_group_index.insert(&category.name, offset);
            self.category_by_name
                .insert(&category.name, self.categories.len());
            self.categories.push(category);
        }

        groups.retain(|group| group.name.is_some() || !group.categories.is_empty());
        self.category_groups = groups;
        Ok(())
    }

    /// Position of an account among accounts followed by credit cards.
    pub fn account_index(&self, account: &str) -> ResultEngine<usize> {
        self.account_index
            .get(account)
            .ok_or_else(|| EngineError::KeyNotFound(format!("account {account}")))
    }

    /// Row offset of a category or category group inside the category block.
    pub fn category_or_group_offset(&self, name: &str) -> ResultEngine<usize> {
        self.category_or_group_index
            .get(name)
            .ok_or_else(|| EngineError::KeyNotFound(format!("category or group {name}")))
    }

    pub fn category(&self, name: &str) -> ResultEngine<&Category> {
        self.category_by_name
            .get(name)
            .and_then(|index| self.categories.get(index))
            .ok_or_else(|| EngineError::KeyNotFound(format!("category {name}")))
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|category| category.name.as_str())
    }
}
