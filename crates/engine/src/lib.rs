//! Posting engine for a household ledger.
//!
//! Keeps account balances consistent with the transactions and transfers
//! posted against them. Every write runs in a single database transaction and
//! every balance change goes through one adjustment routine, which also
//! appends to the `balance_adjustments` audit log.

pub use accounts::{Account, AccountKind};
pub use balance_adjustments::{AdjustmentSource, BalanceAdjustment, BalanceDrift, Direction};
pub use commands::{NewTransactionCmd, NewTransferCmd, UpdateTransactionCmd};
pub use currency::Currency;
pub use error::{EngineError, ErrorClass};
pub use money::Money;
pub use ops::{
    Engine, EngineBuilder, Page, SortField, SortOrder, TransactionListFilter, TransactionPage,
    TransferListFilter,
};
pub use transactions::{Transaction, TransactionKind};
pub use transfers::Transfer;
pub use util::parse_date;

mod accounts;
mod balance_adjustments;
mod categories;
mod commands;
mod currency;
mod error;
mod members;
mod money;
mod ops;
mod transactions;
mod transfers;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
