//! Balance adjustment engine and the read side of the audit log.
//!
//! `adjust` is the only code path that writes `accounts.balance_minor`. It
//! always runs on a DB transaction opened by a lifecycle operation.

use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    Account, AdjustmentSource, BalanceAdjustment, BalanceDrift, Direction, EngineError, Money,
    ResultEngine, TransactionKind, accounts, balance_adjustments, members,
    util::ensure_positive_amount,
};

use super::{Engine, with_tx};

/// Signed effect of a movement on an account balance.
///
/// | kind    | direction | delta   |
/// |---------|-----------|---------|
/// | income  | apply     | +amount |
/// | income  | reverse   | -amount |
/// | expense | apply     | -amount |
/// | expense | reverse   | +amount |
pub(crate) fn balance_delta(
    kind: TransactionKind,
    direction: Direction,
    amount_minor: i64,
) -> ResultEngine<i64> {
    ensure_positive_amount(amount_minor, "amount")?;
    Ok(match (kind, direction) {
        (TransactionKind::Income, Direction::Apply)
        | (TransactionKind::Expense, Direction::Reverse) => amount_minor,
        (TransactionKind::Income, Direction::Reverse)
        | (TransactionKind::Expense, Direction::Apply) => -amount_minor,
    })
}

/// Walks one account's audit rows and reports the first inconsistency.
pub(crate) fn find_drift(
    account_id: Uuid,
    balance_minor: i64,
    history: &[BalanceAdjustment],
) -> Option<BalanceDrift> {
    let mut previous: Option<&BalanceAdjustment> = None;
    for row in history {
        if let Some(prev) = previous
            && row.balance_before_minor() != prev.balance_after_minor
        {
            return Some(BalanceDrift {
                account_id,
                at_seq: Some(row.seq),
                expected_minor: prev.balance_after_minor,
                actual_minor: row.balance_before_minor(),
            });
        }
        previous = Some(row);
    }

    let last = previous?;
    (last.balance_after_minor != balance_minor).then_some(BalanceDrift {
        account_id,
        at_seq: None,
        expected_minor: last.balance_after_minor,
        actual_minor: balance_minor,
    })
}

impl Engine {
    /// Applies or reverses a movement on one account and records it in the
    /// audit log. Returns the balance after the change.
    ///
    /// Applying an expense never takes the balance below zero: the write is a
    /// single guarded `UPDATE` and zero affected rows means the funds were not
    /// there. Reversals are unconditional.
    pub(super) async fn adjust(
        &self,
        db_tx: &DatabaseTransaction,
        account_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        direction: Direction,
        source: AdjustmentSource,
    ) -> ResultEngine<i64> {
        let delta = balance_delta(kind, direction, amount_minor)?;

        let account = accounts::Entity::find_by_id(account_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account".to_string()))?;
        account.balance_minor.checked_add(delta).ok_or_else(|| {
            EngineError::InvalidAmount("balance out of range".to_string())
        })?;

        let guarded = kind == TransactionKind::Expense && direction == Direction::Apply;
        let mut update = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::BalanceMinor,
                Expr::col(accounts::Column::BalanceMinor).add(delta),
            )
            .filter(accounts::Column::Id.eq(account_id));
        if guarded {
            update = update.filter(accounts::Column::BalanceMinor.gte(amount_minor));
        }

        let result = update.exec(db_tx).await?;
        if result.rows_affected == 0 {
            if guarded {
                warn!(
                    %account_id,
                    balance_minor = account.balance_minor,
                    amount_minor,
                    "posting rejected: insufficient balance"
                );
                return Err(EngineError::InsufficientFunds(format!(
                    "account holds {}, needs {}",
                    Money::new(account.balance_minor),
                    Money::new(amount_minor)
                )));
            }
            return Err(EngineError::KeyNotFound("account".to_string()));
        }

        let balance_after: i64 = accounts::Entity::find_by_id(account_id)
            .select_only()
            .column(accounts::Column::BalanceMinor)
            .into_tuple()
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account".to_string()))?;

        balance_adjustments::ActiveModel::record(
            account_id,
            source,
            direction,
            delta,
            balance_after,
        )
        .insert(db_tx)
        .await?;

        debug!(
            %account_id,
            kind = kind.as_str(),
            direction = direction.as_str(),
            delta_minor = delta,
            balance_after_minor = balance_after,
            "balance adjusted"
        );
        Ok(balance_after)
    }

    /// Returns the account with its current balance.
    pub async fn account_balance(&self, user_id: &str, account_id: Uuid) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_account_of_user(&db_tx, user_id, account_id)
                .await?;
            Account::try_from(model)
        })
    }

    /// Lists the audit rows of an account, oldest first.
    pub async fn balance_history(
        &self,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<Vec<BalanceAdjustment>> {
        with_tx!(self, |db_tx| {
            self.require_account_of_user(&db_tx, user_id, account_id)
                .await?;
            let models = balance_adjustments::Entity::find()
                .filter(balance_adjustments::Column::AccountId.eq(account_id))
                .order_by_asc(balance_adjustments::Column::Id)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(BalanceAdjustment::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Checks every account of the user against its audit log.
    ///
    /// Accounts with no recorded adjustments are skipped: their balance is
    /// whatever they were opened with.
    pub async fn verify_balances(&self, user_id: &str) -> ResultEngine<Vec<BalanceDrift>> {
        with_tx!(self, |db_tx| {
            let accounts = accounts::Entity::find()
                .inner_join(members::Entity)
                .filter(members::Column::UserId.eq(user_id))
                .order_by_asc(accounts::Column::Id)
                .all(&db_tx)
                .await?;

            let mut drifts = Vec::new();
            for account in accounts {
                let history = balance_adjustments::Entity::find()
                    .filter(balance_adjustments::Column::AccountId.eq(account.id))
                    .order_by_asc(balance_adjustments::Column::Id)
                    .all(&db_tx)
                    .await?
                    .into_iter()
                    .map(BalanceAdjustment::try_from)
                    .collect::<ResultEngine<Vec<_>>>()?;

                if let Some(drift) = find_drift(account.id, account.balance_minor, &history) {
                    warn!(
                        account_id = %drift.account_id,
                        at_seq = ?drift.at_seq,
                        expected_minor = drift.expected_minor,
                        actual_minor = drift.actual_minor,
                        "balance drift detected"
                    );
                    drifts.push(drift);
                }
            }
            Ok(drifts)
        })
    }
}
