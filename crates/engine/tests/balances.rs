mod common;

use chrono::NaiveDate;
use tokio::task::JoinSet;

use common::{
    OTHER_USER, USER, count_rows, household, household_on_disk, raw_balance, stranger,
    tamper_balance,
};
use engine::{
    AccountKind, AdjustmentSource, Currency, Direction, Engine, EngineError, NewTransactionCmd,
    NewTransferCmd, TransactionKind, UpdateTransactionCmd,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

#[tokio::test]
async fn account_balance_is_scoped_to_the_owner() {
    let h = household().await;
    let bob = stranger(&h.db).await;

    let account = h.engine.account_balance(USER, h.bank).await.unwrap();
    assert_eq!(account.balance_minor, 10_000);
    assert_eq!(account.kind, AccountKind::Bank);
    assert_eq!(account.currency, Currency::Idr);

    assert_eq!(
        h.engine
            .account_balance(USER, bob.account)
            .await
            .unwrap_err(),
        EngineError::KeyNotFound("account".to_string())
    );
    assert!(
        h.engine
            .balance_history(OTHER_USER, h.bank)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn every_mutation_is_recorded_once() {
    let h = household().await;

    let tx = h
        .engine
        .create_transaction(NewTransactionCmd::new(
            USER,
            h.member,
            h.bank,
            h.food,
            TransactionKind::Expense,
            2_000,
            day(1),
        ))
        .await
        .unwrap();
    h.engine
        .update_transaction(UpdateTransactionCmd::new(USER, tx.id).amount_minor(3_000))
        .await
        .unwrap();
    let transfer = h
        .engine
        .create_transfer(NewTransferCmd::new(USER, h.member, h.bank, h.cash, 1_000).fee_minor(100))
        .await
        .unwrap();

    let history = h.engine.balance_history(USER, h.bank).await.unwrap();
    let deltas: Vec<(i64, Direction)> = history
        .iter()
        .map(|row| (row.delta_minor, row.direction))
        .collect();
    assert_eq!(
        deltas,
        vec![
            (-2_000, Direction::Apply),
            (2_000, Direction::Reverse),
            (-3_000, Direction::Apply),
            (-1_100, Direction::Apply),
        ]
    );
    assert_eq!(history[0].balance_before_minor(), 10_000);
    assert_eq!(history[3].balance_after_minor, 5_900);
    assert_eq!(history[3].source, AdjustmentSource::Transfer(transfer.id));
    assert!(history.windows(2).all(|w| w[0].seq < w[1].seq));

    let cash = h.engine.balance_history(USER, h.cash).await.unwrap();
    assert_eq!(cash.len(), 1);
    assert_eq!(cash[0].delta_minor, 1_000);
    assert_eq!(cash[0].balance_after_minor, 2_000);

    assert_eq!(count_rows(&h.db, "balance_adjustments").await, 5);
    assert!(h.engine.verify_balances(USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn out_of_band_writes_show_up_as_drift() {
    let h = household().await;
    let bob = stranger(&h.db).await;

    h.engine
        .create_transaction(NewTransactionCmd::new(
            USER,
            h.member,
            h.bank,
            h.salary,
            TransactionKind::Income,
            1_000,
            day(2),
        ))
        .await
        .unwrap();
    assert!(h.engine.verify_balances(USER).await.unwrap().is_empty());

    tamper_balance(&h.db, h.bank, 1).await;
    // Accounts without history are not checked.
    tamper_balance(&h.db, h.cash, 1).await;
    tamper_balance(&h.db, bob.account, 1).await;

    let drifts = h.engine.verify_balances(USER).await.unwrap();
    assert_eq!(drifts.len(), 1);
    assert_eq!(drifts[0].account_id, h.bank);
    assert_eq!(drifts[0].at_seq, None);
    assert_eq!(drifts[0].expected_minor, 11_000);
    assert_eq!(drifts[0].actual_minor, 11_001);

    // Later postings build on the tampered balance, so the chain breaks.
    h.engine
        .create_transaction(NewTransactionCmd::new(
            USER,
            h.member,
            h.bank,
            h.food,
            TransactionKind::Expense,
            1,
            day(3),
        ))
        .await
        .unwrap();
    let drifts = h.engine.verify_balances(USER).await.unwrap();
    assert_eq!(drifts.len(), 1);
    assert!(drifts[0].at_seq.is_some());
    assert_eq!(drifts[0].expected_minor, 11_000);
    assert_eq!(drifts[0].actual_minor, 11_001);
}

/// Posts `cmd`, retrying while SQLite reports the database as busy. A busy
/// attempt rolls back without writing anything.
async fn post_with_retry(engine: Engine, cmd: NewTransactionCmd) -> Result<(), EngineError> {
    for _ in 0..50 {
        match engine.create_transaction(cmd.clone()).await {
            Err(EngineError::Database(_)) => tokio::task::yield_now().await,
            other => return other.map(|_| ()),
        }
    }
    panic!("database stayed busy");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_expenses_never_overdraw() {
    let (h, _dir) = household_on_disk().await;

    let mut tasks = JoinSet::new();
    for _ in 0..10 {
        let engine = h.engine.clone();
        let cmd = NewTransactionCmd::new(
            USER,
            h.member,
            h.bank,
            h.food,
            TransactionKind::Expense,
            3_000,
            day(4),
        );
        tasks.spawn(post_with_retry(engine, cmd));
    }

    let mut posted = 0;
    let mut rejected = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(()) => posted += 1,
            Err(EngineError::InsufficientFunds(_)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(posted, 3);
    assert_eq!(rejected, 7);
    assert_eq!(raw_balance(&h.db, h.bank).await, 1_000);
    assert_eq!(count_rows(&h.db, "transactions").await, 3);
    assert_eq!(count_rows(&h.db, "balance_adjustments").await, 3);
    assert!(h.engine.verify_balances(USER).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_conserve_money() {
    let h = household().await;

    let mut tasks = JoinSet::new();
    for i in 0..8 {
        let engine = h.engine.clone();
        let (from, to) = if i % 2 == 0 {
            (h.bank, h.cash)
        } else {
            (h.cash, h.bank)
        };
        let cmd = NewTransferCmd::new(USER, h.member, from, to, 500).date(day(5));
        tasks.spawn(async move { engine.create_transfer(cmd).await });
    }

    let mut posted = 0;
    while let Some(joined) = tasks.join_next().await {
        if joined.unwrap().is_ok() {
            posted += 1;
        }
    }

    let bank = raw_balance(&h.db, h.bank).await;
    let cash = raw_balance(&h.db, h.cash).await;
    assert_eq!(bank + cash, 11_000);
    assert!(bank >= 0 && cash >= 0);
    assert_eq!(count_rows(&h.db, "transfers").await, posted);
}
