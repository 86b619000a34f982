use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use engine::{
    Aspire, CategoryTransfer, Locale, Money, RangeStore, SheetRecord, Table, Throttled,
    Transaction, TransactionStatus,
};

use crate::{
    error::{AppError, Result},
    settings::Settings,
    sheets::SheetsClient,
};

mod error;
mod settings;
mod sheets;

type Store = Throttled<SheetsClient>;

#[derive(Debug, Parser)]
#[command(name = "aspire", version, about = "Read and edit an Aspire budget spreadsheet")]
struct Cli {
    /// Optional settings file path (TOML).
    #[arg(long)]
    config: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Size and health of both tables.
    Status,
    #[command(subcommand)]
    Transactions(TransactionsCommand),
    #[command(subcommand)]
    Transfers(TransfersCommand),
    /// Category groups with available, activity and budgeted amounts.
    Budget,
    /// Write every record of a table to a CSV file.
    Export { table: TableKind, path: PathBuf },
}

#[derive(Debug, Subcommand)]
enum TransactionsCommand {
    /// Last records of the table.
    Tail {
        #[arg(short = 'n', long, default_value_t = 10)]
        count: i64,
    },
    /// Add a transaction, keeping the table sorted by date.
    Add {
        /// Date as YYYY-MM-DD.
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, required_unless_present = "inflow")]
        outflow: Option<Money>,
        #[arg(long)]
        inflow: Option<Money>,
        #[arg(long)]
        category: String,
        #[arg(long)]
        account: String,
        #[arg(long, default_value = "")]
        memo: String,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Remove the record at an index (negative counts from the end).
    Pop {
        #[arg(allow_negative_numbers = true)]
        index: i64,
    },
}

#[derive(Debug, Subcommand)]
enum TransfersCommand {
    /// Last records of the table.
    Tail {
        #[arg(short = 'n', long, default_value_t = 10)]
        count: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TableKind {
    Transactions,
    Transfers,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    Settled,
    Pending,
    Unknown,
}

impl From<StatusArg> for TransactionStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Settled => Self::Settled,
            StatusArg::Pending => Self::Pending,
            StatusArg::Unknown => Self::Unknown,
        }
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "aspire={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    run(cli.command, settings).await?;
    Ok(())
}

async fn run(command: Command, settings: Settings) -> Result<()> {
    let client = SheetsClient::new(&settings.spreadsheet)?;
    let store = Arc::new(Throttled::new(
        client,
        settings.throttle.max_queries,
        Duration::from_secs(settings.throttle.window_secs),
    ));
    let mut aspire = Aspire::builder(store)
        .locale(settings.spreadsheet.locale)
        .sheet_names(settings.sheets)
        .ensure_healthy(settings.ensure_healthy)
        .build()
        .await?;

    match command {
        Command::Status => status(&mut aspire).await,
        Command::Transactions(TransactionsCommand::Tail { count }) => {
            let locale = aspire.locale();
            let table = aspire.transactions().await?;
            for (index, transaction) in tail(table, count).await? {
                print_transaction(locale, index, &transaction);
            }
            Ok(())
        }
        Command::Transactions(TransactionsCommand::Add {
            date,
            outflow,
            inflow,
            category,
            account,
            memo,
            status,
        }) => {
            let transaction = Transaction {
                date,
                outflow: outflow.unwrap_or(Money::ZERO),
                inflow: inflow.unwrap_or(Money::ZERO),
                category,
                account,
                memo,
                status: status.map(TransactionStatus::from).unwrap_or_default(),
            };
            if transaction.outflow.is_negative() || transaction.inflow.is_negative() {
                return Err(AppError::Input(
                    "outflow and inflow must not be negative".to_string(),
                ));
            }
            let index = aspire
                .transactions()
                .await?
                .insert_by_date(&transaction)
                .await?;
            tracing::info!("added transaction at index {index}");
            print_transaction(aspire.locale(), index, &transaction);
            Ok(())
        }
        Command::Transactions(TransactionsCommand::Pop { index }) => {
            let locale = aspire.locale();
            let transaction = aspire.transactions().await?.pop(index).await?;
            print_transaction(locale, index, &transaction);
            Ok(())
        }
        Command::Transfers(TransfersCommand::Tail { count }) => {
            let locale = aspire.locale();
            let table = aspire.category_transfers().await?;
            for (index, transfer) in tail(table, count).await? {
                print_transfer(locale, index, &transfer);
            }
            Ok(())
        }
        Command::Budget => budget(&aspire).await,
        Command::Export { table, path } => {
            let mut writer = csv::Writer::from_path(&path)?;
            let written = match table {
                TableKind::Transactions => {
                    let records = aspire.transactions().await?.all().await?;
                    for record in &records {
                        writer.serialize(record)?;
                    }
                    records.len()
                }
                TableKind::Transfers => {
                    let records = aspire.category_transfers().await?.all().await?;
                    for record in &records {
                        writer.serialize(record)?;
                    }
                    records.len()
                }
            };
            writer.flush()?;
            tracing::info!("exported {written} records to {}", path.display());
            Ok(())
        }
    }
}

async fn status(aspire: &mut Aspire<Store>) -> Result<()> {
    let transactions = aspire.transactions().await?;
    println!(
        "{}: {} records, healthy: {}",
        transactions.sheet().name(),
        transactions.len(),
        transactions.is_healthy().await
    );
    let transfers = aspire.category_transfers().await?;
    println!(
        "{}: {} records, healthy: {}",
        transfers.sheet().name(),
        transfers.len(),
        transfers.is_healthy().await
    );
    println!(
        "pending transactions: {}",
        aspire.dashboard().pending_transactions().await?
    );
    Ok(())
}

/// Last `count` records with their indices, oldest first.
async fn tail<S: RangeStore, R: SheetRecord>(
    table: &Table<S, R>,
    count: i64,
) -> Result<Vec<(i64, R)>> {
    let end = table.first_empty_index();
    let first = (end - count.max(0)).max(0);
    let records = table.batch_get(first, end - 1).await?;
    Ok((first..)
        .zip(records)
        .filter_map(|(index, record)| record.map(|record| (index, record)))
        .collect())
}

async fn budget(aspire: &Aspire<Store>) -> Result<()> {
    let dashboard = aspire.dashboard();
    let locale = aspire.locale();
    let amount = |money: Money| {
        let text = locale.format_currency(money);
        if text.is_empty() { "-".to_string() } else { text }
    };

    println!(
        "available to budget: {}",
        amount(dashboard.available_to_budget().await?)
    );
    println!(
        "budgeted this month: {}  spent this month: {}",
        amount(dashboard.budgeted_this_month().await?),
        amount(dashboard.spent_this_month().await?)
    );

    for group in &aspire.configuration().category_groups {
        if let Some(name) = &group.name {
            println!("\n{name}");
        }
        for category in &group.categories {
            println!(
                "  {category:<30} {:>12} {:>12} {:>12}",
                amount(dashboard.available(category).await?),
                amount(dashboard.activity(category).await?),
                amount(dashboard.budgeted(category).await?)
            );
        }
    }
    Ok(())
}

fn print_transaction(locale: Locale, index: i64, transaction: &Transaction) {
    println!(
        "{index:>6}  {}  {:>12}  {:<24} {:<16} {} {}",
        locale.format_date(transaction.date),
        transaction.net().to_string(),
        transaction.category,
        transaction.account,
        transaction.status.token(),
        transaction.memo
    );
}

fn print_transfer(locale: Locale, index: i64, transfer: &CategoryTransfer) {
    println!(
        "{index:>6}  {}  {:>12}  {} -> {}  {}",
        locale.format_date(transfer.date),
        transfer.amount.to_string(),
        transfer.from,
        transfer.to,
        transfer.memo
    );
}
