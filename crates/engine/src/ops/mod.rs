use sea_orm::DatabaseConnection;

use crate::ResultEngine;

mod access;
mod balances;
mod transactions;
mod transfers;

pub use transactions::{Page, SortField, SortOrder, TransactionListFilter, TransactionPage};
pub use transfers::TransferListFilter;

/// Run a block inside a DB transaction, committing on success.
///
/// Any `?` or `return Err(..)` inside the block leaves the macro before the
/// commit; the dropped `DatabaseTransaction` then rolls back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The posting engine.
///
/// Holds only the connection pool, so it is cheap to clone and safe to share
/// across tasks. Every write operation runs in exactly one DB transaction.
#[derive(Clone, Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
