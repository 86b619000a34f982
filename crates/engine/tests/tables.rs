use std::sync::Arc;

use chrono::NaiveDate;

use engine::{
    CellRange, CellRef, EngineError, Locale, MemoryStore, Money, RangeStore, Sheet, SheetRecord,
    Table, Transaction, TransactionStatus, Transactions, encode,
};

const SHEET: &str = "Transactions";

fn tx(day: u32, memo: &str) -> Transaction {
    Transaction {
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(day)),
        outflow: Money::new(1_000 + i64::from(day)),
        inflow: Money::ZERO,
        category: "Groceries".to_string(),
        account: "Checking".to_string(),
        memo: memo.to_string(),
        status: TransactionStatus::Settled,
    }
}

fn seed(store: &MemoryStore, records: &[Transaction]) {
    let rows = records
        .iter()
        .map(|record| encode(Some(record), Locale::Europe))
        .collect();
    store
        .load(SHEET, CellRef::new(Transaction::TABLE_START, 1), rows)
        .unwrap();
}

async fn open(store: &Arc<MemoryStore>) -> Transactions<MemoryStore> {
    Table::open(Sheet::new(SHEET, Arc::clone(store)), Locale::Europe)
        .await
        .unwrap()
}

async fn table_with(records: &[Transaction]) -> (Arc<MemoryStore>, Transactions<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    seed(&store, records);
    let table = open(&store).await;
    (store, table)
}

fn abc() -> Vec<Transaction> {
    vec![tx(1, "a"), tx(2, "b"), tx(3, "c")]
}

#[tokio::test]
async fn frontier_is_found_around_the_probe_width() {
    let width = 4;
    for n in [0, 1, width - 1, width, width + 1, 3 * width] {
        let store = Arc::new(MemoryStore::new());
        let records: Vec<_> = (0..n).map(|day| tx(day, "")).collect();
        seed(&store, &records);

        let table: Transactions<MemoryStore> =
            Table::open_with_probe_width(Sheet::new(SHEET, Arc::clone(&store)), Locale::Europe, width)
                .await
                .unwrap();
        assert_eq!(table.first_empty_index(), i64::from(n), "n = {n}");
        assert_eq!(store.requests() as u32, n / width + 1, "n = {n}");
        assert!(table.is_healthy().await, "n = {n}");
    }
}

#[tokio::test]
async fn frontier_with_default_probe_width() {
    for n in [999, 1000, 1001] {
        let records: Vec<_> = (0..n).map(|day| tx(day / 10, "")).collect();
        let (_store, table) = table_with(&records).await;
        assert_eq!(table.first_empty_index(), i64::from(n));
        assert_eq!(table.len(), n as usize);
    }
}

#[tokio::test]
async fn index_symmetry() {
    let (_store, table) = table_with(&abc()).await;
    let f = table.first_empty_index();

    assert_eq!(table.get(0).await.unwrap(), table.get(-f).await.unwrap());
    assert_eq!(table.get(-1).await.unwrap(), Some(tx(3, "c")));
    assert_eq!(table.get(f).await.unwrap(), None);
    assert!(matches!(table.get(-f - 1).await, Err(EngineError::Range(_))));
}

#[tokio::test]
async fn reads_past_the_frontier_do_not_touch_the_store() {
    let (store, table) = table_with(&abc()).await;
    let before = store.requests();

    assert_eq!(table.get(3).await.unwrap(), None);
    assert_eq!(table.get(500).await.unwrap(), None);
    assert_eq!(table.batch_get(3, 7).await.unwrap(), vec![None; 5]);
    assert_eq!(store.requests(), before);

    let mixed = table.batch_get(1, 4).await.unwrap();
    assert_eq!(mixed, vec![Some(tx(2, "b")), Some(tx(3, "c")), None, None]);
    assert_eq!(store.requests(), before + 1);
}

#[tokio::test]
async fn batch_get_with_negative_bounds() {
    let (_store, table) = table_with(&abc()).await;
    assert_eq!(
        table.batch_get(-2, -1).await.unwrap(),
        vec![Some(tx(2, "b")), Some(tx(3, "c"))]
    );
    assert!(table.batch_get(2, 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn mixed_ranges_are_rejected_regardless_of_frontier() {
    for records in [Vec::new(), vec![tx(1, "a")], abc()] {
        let (_store, mut table) = table_with(&records).await;
        assert!(matches!(table.batch_get(-1, 2).await, Err(EngineError::Range(_))));
        assert!(matches!(table.batch_get(-3, 0).await, Err(EngineError::Range(_))));
        assert!(matches!(table.batch_pop(-1, 0).await, Err(EngineError::Range(_))));
    }
}

#[tokio::test]
async fn push_then_pop_restores_the_table() {
    let (_store, mut table) = table_with(&abc()).await;
    let record = tx(4, "d");

    table.push(&record).await.unwrap();
    assert_eq!(table.first_empty_index(), 4);
    assert!(table.is_healthy().await);

    let popped = table.pop(table.first_empty_index() - 1).await.unwrap();
    assert_eq!(popped, record);
    assert_eq!(table.first_empty_index(), 3);
    assert!(table.is_healthy().await);
    assert_eq!(table.all().await.unwrap(), abc());
}

#[tokio::test]
async fn push_onto_an_empty_table() {
    let (store, mut table) = table_with(&[]).await;
    table
        .batch_push(&[tx(1, "a"), tx(1, "b")])
        .await
        .unwrap();
    assert_eq!(table.first_empty_index(), 2);

    let reopened = open(&store).await;
    assert_eq!(reopened.sheet().name(), SHEET);
    assert_eq!(reopened.first_empty_index(), 2);
    assert_eq!(reopened.get(-1).await.unwrap(), Some(tx(1, "b")));
}

#[tokio::test]
async fn pop_from_the_middle_shifts_the_tail() {
    let (store, mut table) = table_with(&abc()).await;
    assert_eq!(table.pop(-3).await.unwrap(), tx(1, "a"));
    assert_eq!(table.all().await.unwrap(), vec![tx(2, "b"), tx(3, "c")]);
    assert!(table.is_healthy().await);

    let last_row = CellRef::new(Transaction::TABLE_START + 2, 1);
    assert_eq!(store.cell(SHEET, last_row).unwrap(), None);
}

#[tokio::test]
async fn pop_out_of_range() {
    let (_store, mut table) = table_with(&abc()).await;
    assert!(matches!(table.pop(3).await, Err(EngineError::Range(_))));
    assert!(matches!(table.pop(-4).await, Err(EngineError::Range(_))));
    assert_eq!(table.first_empty_index(), 3);
}

#[tokio::test]
async fn huge_indices_are_out_of_range() {
    for records in [Vec::new(), abc()] {
        let (store, mut table) = table_with(&records).await;
        let before = store.requests();

        assert!(matches!(table.pop(i64::MAX).await, Err(EngineError::Range(_))));
        assert!(matches!(table.pop(i64::MIN).await, Err(EngineError::Range(_))));
        assert!(matches!(table.batch_get(0, i64::MAX).await, Err(EngineError::Range(_))));
        assert!(matches!(
            table.batch_get(i64::MIN, -1).await,
            Err(EngineError::Range(_))
        ));
        assert!(matches!(
            table.batch_pop(0, i64::MAX).await,
            Err(EngineError::Range(_))
        ));
        assert!(matches!(
            table.insert(i64::MAX, &tx(9, "z")).await,
            Err(EngineError::Range(_))
        ));
        assert!(matches!(
            table.replace(i64::MAX, &tx(9, "z")).await,
            Err(EngineError::Range(_))
        ));
        assert_eq!(table.get(i64::MAX).await.unwrap(), None);

        assert_eq!(store.requests(), before);
        assert_eq!(table.first_empty_index(), records.len() as i64);
    }
}

#[tokio::test]
async fn insert_shifts_later_records() {
    let (_store, mut table) = table_with(&abc()).await;
    assert!(table.is_healthy().await);

    let x = Transaction {
        memo: "x".to_string(),
        ..tx(1, "")
    };
    table.insert(1, &x).await.unwrap();
    assert_eq!(table.first_empty_index(), 4);
    assert_eq!(
        table.all().await.unwrap(),
        vec![tx(1, "a"), x, tx(2, "b"), tx(3, "c")]
    );
    assert!(table.is_healthy().await);
}

#[tokio::test]
async fn insert_at_the_frontier_appends() {
    let (_store, mut table) = table_with(&abc()).await;
    table.insert(3, &tx(5, "e")).await.unwrap();
    assert_eq!(table.get(-1).await.unwrap(), Some(tx(5, "e")));
    assert!(matches!(
        table.insert(5, &tx(6, "f")).await,
        Err(EngineError::Range(_))
    ));
    assert_eq!(table.first_empty_index(), 4);
}

#[tokio::test]
async fn batch_pop_then_batch_insert_restores_everything() {
    let records: Vec<_> = (0..6).map(|day| tx(day, &format!("r{day}"))).collect();
    let (_store, mut table) = table_with(&records).await;

    let popped = table.batch_pop(1, 3).await.unwrap();
    assert_eq!(popped, records[1..=3].to_vec());
    assert_eq!(table.first_empty_index(), 3);
    assert!(table.is_healthy().await);

    table.batch_insert(1, &popped).await.unwrap();
    assert_eq!(table.first_empty_index(), 6);
    assert_eq!(table.all().await.unwrap(), records);
    assert!(table.is_healthy().await);
}

#[tokio::test]
async fn batch_pop_of_the_tail_with_negative_indices() {
    let (_store, mut table) = table_with(&abc()).await;
    let popped = table.batch_pop(-2, -1).await.unwrap();
    assert_eq!(popped, vec![tx(2, "b"), tx(3, "c")]);
    assert_eq!(table.all().await.unwrap(), vec![tx(1, "a")]);
    assert!(table.is_healthy().await);
    assert!(matches!(table.batch_pop(0, 1).await, Err(EngineError::Range(_))));
}

#[tokio::test]
async fn replace_never_extends_the_table() {
    let (_store, mut table) = table_with(&abc()).await;
    table.replace(-1, &tx(9, "z")).await.unwrap();
    assert_eq!(table.get(2).await.unwrap(), Some(tx(9, "z")));

    assert!(matches!(
        table.replace(3, &tx(9, "z")).await,
        Err(EngineError::Range(_))
    ));
    assert!(matches!(
        table.batch_replace(2, &[tx(9, "y"), tx(9, "z")]).await,
        Err(EngineError::Range(_))
    ));

    table
        .batch_replace(0, &[tx(1, "A"), tx(2, "B")])
        .await
        .unwrap();
    assert_eq!(
        table.all().await.unwrap(),
        vec![tx(1, "A"), tx(2, "B"), tx(9, "z")]
    );
    assert_eq!(table.first_empty_index(), 3);
}

#[tokio::test]
async fn stray_record_past_the_frontier_is_unhealthy() {
    let (store, table) = table_with(&abc()).await;
    assert!(table.is_healthy().await);

    let stray_row = Transaction::TABLE_START + table.first_empty_index() as u32 + 1;
    seed_row(&store, stray_row, &tx(4, "stray"));
    assert!(!table.is_healthy().await);

    let range = CellRange::rows(1, 7, stray_row, stray_row);
    store.clear(SHEET, &range).await.unwrap();
    assert!(table.is_healthy().await);
}

fn seed_row(store: &MemoryStore, row: u32, record: &Transaction) {
    store
        .load(
            SHEET,
            CellRef::new(row, 1),
            vec![encode(Some(record), Locale::Europe)],
        )
        .unwrap();
}

#[tokio::test]
async fn out_of_order_dates_are_unhealthy() {
    let (_store, table) = table_with(&[tx(1, "a"), tx(3, "b"), tx(2, "c")]).await;
    assert!(!table.is_healthy().await);

    let (_store, table) = table_with(&[tx(1, "a"), tx(1, "b"), tx(2, "c")]).await;
    assert!(table.is_healthy().await);
}

#[tokio::test]
async fn gap_inside_the_table_is_unhealthy() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &abc());
    seed_row(&store, Transaction::TABLE_START + 4, &tx(5, "e"));
    let table = open(&store).await;

    assert_eq!(table.first_empty_index(), 5);
    assert!(!table.is_healthy().await);
}

#[tokio::test]
async fn undecodable_rows_surface_as_format_errors() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &abc());
    store
        .load(
            SHEET,
            CellRef::new(Transaction::TABLE_START + 1, 7),
            vec![vec!["??".to_string()]],
        )
        .unwrap();
    let table = open(&store).await;

    assert!(matches!(table.get(1).await, Err(EngineError::Format(_))));
    assert!(!table.is_healthy().await);
}

#[tokio::test]
async fn store_failures_propagate() {
    let (store, mut table) = table_with(&abc()).await;
    store.set_offline(true);

    assert!(matches!(table.get(0).await, Err(EngineError::Remote(_))));
    assert!(matches!(
        table.push(&tx(4, "d")).await,
        Err(EngineError::Remote(_))
    ));
    assert_eq!(table.first_empty_index(), 3);

    store.set_offline(false);
    assert!(table.is_healthy().await);
}
