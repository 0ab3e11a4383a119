use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::{
    Engine, EngineError, ErrorClass, Money, NewTransactionCmd, NewTransferCmd, Page, SortField,
    SortOrder, TransactionKind, TransactionListFilter, TransferListFilter, UpdateTransactionCmd,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, DbErr};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

mod settings;

use settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "dompet")]
#[command(about = "Post and inspect household ledger transactions and transfers")]
struct Cli {
    /// Settings file, without extension (also read from `DOMPET_CONFIG`).
    #[arg(long, env = "DOMPET_CONFIG", default_value = "dompet")]
    config: String,

    /// Overrides `database_url` from the settings.
    #[arg(long)]
    database_url: Option<String>,

    /// Overrides `log_level` from the settings.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Income and expense transactions.
    Tx(Tx),
    /// Transfers between accounts of one member.
    Transfer(Transfer),
    /// Account balances and the adjustment audit log.
    Balance(Balance),
}

#[derive(Args, Debug)]
struct Scope {
    /// Requesting user id.
    #[arg(long)]
    user: String,
}

#[derive(Args, Debug)]
struct ById {
    #[command(flatten)]
    scope: Scope,
    #[arg(long)]
    id: Uuid,
}

#[derive(Args, Debug)]
struct Tx {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    Add(TxAddArgs),
    Show(ById),
    Ls(TxListArgs),
    Edit(TxEditArgs),
    Rm(ById),
}

#[derive(Args, Debug)]
struct TxAddArgs {
    #[command(flatten)]
    scope: Scope,
    #[arg(long)]
    member: Uuid,
    #[arg(long)]
    account: Uuid,
    #[arg(long)]
    category: Uuid,
    #[arg(long, value_parser = parse_kind)]
    kind: TransactionKind,
    /// Decimal amount, e.g. `10.50`.
    #[arg(long)]
    amount: Money,
    #[arg(long, value_parser = engine::parse_date)]
    date: NaiveDate,
    #[arg(long, default_value = "")]
    description: String,
}

#[derive(Args, Debug)]
struct TxEditArgs {
    #[command(flatten)]
    scope: Scope,
    #[arg(long)]
    id: Uuid,
    #[arg(long)]
    member: Option<Uuid>,
    #[arg(long)]
    account: Option<Uuid>,
    #[arg(long)]
    category: Option<Uuid>,
    #[arg(long, value_parser = parse_kind)]
    kind: Option<TransactionKind>,
    #[arg(long)]
    amount: Option<Money>,
    #[arg(long, value_parser = engine::parse_date)]
    date: Option<NaiveDate>,
    /// Pass an empty string to clear the description.
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
struct TxListArgs {
    #[command(flatten)]
    scope: Scope,
    #[arg(long)]
    member: Option<Uuid>,
    #[arg(long)]
    account: Option<Uuid>,
    #[arg(long)]
    category: Option<Uuid>,
    #[arg(long, value_parser = parse_kind)]
    kind: Option<TransactionKind>,
    /// First date included.
    #[arg(long, value_parser = engine::parse_date)]
    from: Option<NaiveDate>,
    /// Last date included.
    #[arg(long, value_parser = engine::parse_date)]
    to: Option<NaiveDate>,
    #[arg(long)]
    min_amount: Option<Money>,
    #[arg(long)]
    max_amount: Option<Money>,
    /// Substring of the description.
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value = "date")]
    sort_by: SortField,
    #[arg(long, default_value = "desc")]
    order: SortOrder,
    #[arg(long, default_value_t = 1)]
    page: u64,
    #[arg(long, default_value_t = engine::Page::default().limit)]
    limit: u64,
}

#[derive(Args, Debug)]
struct Transfer {
    #[command(subcommand)]
    command: TransferCommand,
}

#[derive(Subcommand, Debug)]
enum TransferCommand {
    Add(TransferAddArgs),
    Show(ById),
    Ls(TransferListArgs),
    Rm(ById),
}

#[derive(Args, Debug)]
struct TransferAddArgs {
    #[command(flatten)]
    scope: Scope,
    #[arg(long)]
    member: Uuid,
    #[arg(long)]
    from: Uuid,
    #[arg(long)]
    to: Uuid,
    #[arg(long)]
    amount: Money,
    #[arg(long)]
    fee: Option<Money>,
    /// Defaults to today (UTC).
    #[arg(long, value_parser = engine::parse_date)]
    date: Option<NaiveDate>,
    #[arg(long, default_value = "")]
    description: String,
}

#[derive(Args, Debug)]
struct TransferListArgs {
    #[command(flatten)]
    scope: Scope,
    #[arg(long)]
    member: Option<Uuid>,
    /// Either side of the transfer.
    #[arg(long)]
    account: Option<Uuid>,
}

#[derive(Args, Debug)]
struct Balance {
    #[command(subcommand)]
    command: BalanceCommand,
}

#[derive(Subcommand, Debug)]
enum BalanceCommand {
    Show(AccountArgs),
    History(AccountArgs),
    Verify(Scope),
}

#[derive(Args, Debug)]
struct AccountArgs {
    #[command(flatten)]
    scope: Scope,
    #[arg(long)]
    account: Uuid,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("database: {0}")]
    Database(#[from] DbErr),
    #[error("output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Engine(err) => match err.class() {
                ErrorClass::NotFound => 3,
                ErrorClass::InsufficientBalance => 4,
                ErrorClass::InvalidTransfer => 5,
                ErrorClass::Validation => 2,
                ErrorClass::Internal => 1,
            },
            Self::Database(_) | Self::Output(_) => 1,
        }
    }
}

fn parse_kind(raw: &str) -> Result<TransactionKind, EngineError> {
    TransactionKind::try_from(raw)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect_db(database_url: &str) -> Result<DatabaseConnection, CliError> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn run(command: Command, settings: &Settings) -> Result<(), CliError> {
    let db = connect_db(&settings.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match command {
        Command::Migrate => {
            tracing::info!("schema is up to date");
        }
        Command::Tx(Tx { command }) => run_tx(&engine, command).await?,
        Command::Transfer(Transfer { command }) => run_transfer(&engine, command).await?,
        Command::Balance(Balance { command }) => run_balance(&engine, command).await?,
    }
    Ok(())
}

async fn run_tx(engine: &Engine, command: TxCommand) -> Result<(), CliError> {
    match command {
        TxCommand::Add(args) => {
            let cmd = NewTransactionCmd::new(
                args.scope.user,
                args.member,
                args.account,
                args.category,
                args.kind,
                args.amount.minor(),
                args.date,
            )
            .description(args.description);
            print_json(&engine.create_transaction(cmd).await?)
        }
        TxCommand::Show(args) => print_json(&engine.transaction(&args.scope.user, args.id).await?),
        TxCommand::Ls(args) => {
            let filter = TransactionListFilter {
                member_id: args.member,
                account_id: args.account,
                category_id: args.category,
                kind: args.kind,
                start_date: args.from,
                end_date: args.to,
                min_amount_minor: args.min_amount.map(Money::minor),
                max_amount_minor: args.max_amount.map(Money::minor),
                description: args.search,
                sort_by: args.sort_by,
                sort_order: args.order,
            };
            let page = Page {
                page: args.page,
                limit: args.limit,
            };
            print_json(
                &engine
                    .list_transactions(&args.scope.user, &filter, page)
                    .await?,
            )
        }
        TxCommand::Edit(args) => {
            let mut cmd = UpdateTransactionCmd::new(args.scope.user, args.id);
            if let Some(member_id) = args.member {
                cmd = cmd.member_id(member_id);
            }
            if let Some(account_id) = args.account {
                cmd = cmd.account_id(account_id);
            }
            if let Some(category_id) = args.category {
                cmd = cmd.category_id(category_id);
            }
            if let Some(kind) = args.kind {
                cmd = cmd.kind(kind);
            }
            if let Some(amount) = args.amount {
                cmd = cmd.amount_minor(amount.minor());
            }
            if let Some(date) = args.date {
                cmd = cmd.date(date);
            }
            if let Some(description) = args.description {
                cmd = cmd.description(description);
            }
            print_json(&engine.update_transaction(cmd).await?)
        }
        TxCommand::Rm(args) => {
            engine
                .delete_transaction(&args.scope.user, args.id)
                .await?;
            print_json(&serde_json::json!({ "deleted": args.id }))
        }
    }
}

async fn run_transfer(engine: &Engine, command: TransferCommand) -> Result<(), CliError> {
    match command {
        TransferCommand::Add(args) => {
            let mut cmd = NewTransferCmd::new(
                args.scope.user,
                args.member,
                args.from,
                args.to,
                args.amount.minor(),
            )
            .fee_minor(args.fee.unwrap_or(Money::ZERO).minor())
            .description(args.description);
            if let Some(date) = args.date {
                cmd = cmd.date(date);
            }
            print_json(&engine.create_transfer(cmd).await?)
        }
        TransferCommand::Show(args) => {
            print_json(&engine.transfer(&args.scope.user, args.id).await?)
        }
        TransferCommand::Ls(args) => {
            let filter = TransferListFilter {
                member_id: args.member,
                account_id: args.account,
            };
            print_json(&engine.list_transfers(&args.scope.user, &filter).await?)
        }
        TransferCommand::Rm(args) => {
            engine.delete_transfer(&args.scope.user, args.id).await?;
            print_json(&serde_json::json!({ "deleted": args.id }))
        }
    }
}

async fn run_balance(engine: &Engine, command: BalanceCommand) -> Result<(), CliError> {
    match command {
        BalanceCommand::Show(args) => {
            let account = engine
                .account_balance(&args.scope.user, args.account)
                .await?;
            let balance = Money::new(account.balance_minor).to_string();
            print_json(&serde_json::json!({ "account": account, "balance": balance }))
        }
        BalanceCommand::History(args) => print_json(
            &engine
                .balance_history(&args.scope.user, args.account)
                .await?,
        ),
        BalanceCommand::Verify(scope) => {
            let drifts = engine.verify_balances(&scope.user).await?;
            if !drifts.is_empty() {
                tracing::warn!(count = drifts.len(), "balances disagree with the audit log");
            }
            print_json(&drifts)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(&cli.config) {
        Ok(settings) => settings.with_overrides(cli.database_url, cli.log_level),
        Err(err) => {
            eprintln!("error: invalid settings: {err}");
            return ExitCode::from(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "dompet={level},engine={level},migration={level}",
            level = settings.log_level
        ))
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(?err, "command failed");
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_transaction_add() {
        let cli = Cli::try_parse_from([
            "dompet",
            "tx",
            "add",
            "--user",
            "alice",
            "--member",
            "6f1c1a4e-0c55-4b7c-9b59-0f6c2b8d9a11",
            "--account",
            "7a2d2b5f-1d66-4c8d-8c6a-1a7d3c9e0b22",
            "--category",
            "8b3e3c60-2e77-4d9e-9d7b-2b8e4daf1c33",
            "--kind",
            "expense",
            "--amount",
            "10,50",
            "--date",
            "2024-01-05",
        ])
        .unwrap();

        let Command::Tx(Tx {
            command: TxCommand::Add(args),
        }) = cli.command
        else {
            panic!("expected tx add");
        };
        assert_eq!(args.scope.user, "alice");
        assert_eq!(args.kind, TransactionKind::Expense);
        assert_eq!(args.amount.minor(), 1050);
        assert_eq!(args.description, "");
    }

    #[test]
    fn rejects_bad_amounts_and_dates() {
        let base = ["dompet", "transfer", "add", "--user", "alice"];
        let ids = [
            "--member",
            "6f1c1a4e-0c55-4b7c-9b59-0f6c2b8d9a11",
            "--from",
            "7a2d2b5f-1d66-4c8d-8c6a-1a7d3c9e0b22",
            "--to",
            "8b3e3c60-2e77-4d9e-9d7b-2b8e4daf1c33",
        ];
        let with = |extra: &[&'static str]| -> Vec<&'static str> {
            base.iter().chain(ids.iter()).chain(extra.iter()).copied().collect()
        };
        assert!(Cli::try_parse_from(with(&["--amount", "1.234"])).is_err());
        assert!(Cli::try_parse_from(with(&["--amount", "1"])).is_ok());

        let bad_date = with(&["--amount", "1", "--date", "05/01/2024"]);
        assert!(Cli::try_parse_from(bad_date).is_err());
    }

    #[test]
    fn exit_codes_follow_error_class() {
        let code = |err: EngineError| CliError::from(err).exit_code();
        assert_eq!(code(EngineError::KeyNotFound("account".to_string())), 3);
        assert_eq!(code(EngineError::InsufficientFunds(String::new())), 4);
        assert_eq!(code(EngineError::InvalidTransfer(String::new())), 5);
        assert_eq!(code(EngineError::InvalidAmount(String::new())), 2);
        assert_eq!(code(EngineError::Corrupted(String::new())), 1);
    }
}
