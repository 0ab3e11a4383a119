use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{
    AdjustmentSource, Direction, NewTransactionCmd, ResultEngine, Transaction,
    UpdateTransactionCmd, transactions,
    util::{ensure_positive_amount, normalize_description},
};

use super::{Engine, access::TransactionRefs, with_tx};

mod list;

pub use list::{Page, SortField, SortOrder, TransactionListFilter, TransactionPage};

impl Engine {
    /// Posts an income or expense and applies it to the account balance.
    ///
    /// An expense larger than the account balance is rejected with
    /// `InsufficientFunds` and nothing is written.
    pub async fn create_transaction(&self, cmd: NewTransactionCmd) -> ResultEngine<Transaction> {
        ensure_positive_amount(cmd.amount_minor, "amount")?;
        let description = normalize_description(&cmd.description);

        let transaction = with_tx!(self, |db_tx| {
            self.validate_transaction_refs(
                &db_tx,
                &cmd.user_id,
                TransactionRefs {
                    member_id: cmd.member_id,
                    account_id: cmd.account_id,
                    category_id: cmd.category_id,
                },
            )
            .await?;

            let id = Uuid::new_v4();
            let now = Utc::now();
            let model = transactions::ActiveModel {
                id: ActiveValue::Set(id),
                user_id: ActiveValue::Set(cmd.user_id.clone()),
                member_id: ActiveValue::Set(cmd.member_id),
                account_id: ActiveValue::Set(cmd.account_id),
                category_id: ActiveValue::Set(cmd.category_id),
                amount_minor: ActiveValue::Set(cmd.amount_minor),
                date: ActiveValue::Set(cmd.date),
                description: ActiveValue::Set(description),
                kind: ActiveValue::Set(cmd.kind.as_str().to_string()),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            self.adjust(
                &db_tx,
                cmd.account_id,
                cmd.kind,
                cmd.amount_minor,
                Direction::Apply,
                AdjustmentSource::Transaction(id),
            )
            .await?;

            Transaction::try_from(model)
        })?;

        info!(
            transaction_id = %transaction.id,
            account_id = %transaction.account_id,
            kind = transaction.kind.as_str(),
            amount_minor = transaction.amount_minor,
            "transaction posted"
        );
        Ok(transaction)
    }

    /// Returns a single transaction owned by the user.
    pub async fn transaction(&self, user_id: &str, transaction_id: Uuid) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, user_id, transaction_id)
                .await?;
            Transaction::try_from(model)
        })
    }

    /// Edits a posted transaction.
    ///
    /// The old effect is reversed on the old account and the new effect is
    /// applied on the (possibly different) new account, in one DB transaction.
    /// Ownership is checked against the resulting member, account and
    /// category. If applying the new effect fails, the row and both balances
    /// stay as they were.
    pub async fn update_transaction(
        &self,
        cmd: UpdateTransactionCmd,
    ) -> ResultEngine<Transaction> {
        if let Some(amount_minor) = cmd.amount_minor {
            ensure_positive_amount(amount_minor, "amount")?;
        }

        let transaction = with_tx!(self, |db_tx| {
            let existing = self
                .require_transaction(&db_tx, &cmd.user_id, cmd.transaction_id)
                .await?;
            let old = Transaction::try_from(existing.clone())?;

            let refs = TransactionRefs {
                member_id: cmd.member_id.unwrap_or(old.member_id),
                account_id: cmd.account_id.unwrap_or(old.account_id),
                category_id: cmd.category_id.unwrap_or(old.category_id),
            };
            let kind = cmd.kind.unwrap_or(old.kind);
            let amount_minor = cmd.amount_minor.unwrap_or(old.amount_minor);
            let date = cmd.date.unwrap_or(old.date);
            let description = cmd
                .description
                .as_deref()
                .map(normalize_description)
                .unwrap_or(old.description);

            self.validate_transaction_refs(&db_tx, &cmd.user_id, refs)
                .await?;

            let source = AdjustmentSource::Transaction(old.id);
            self.adjust(
                &db_tx,
                old.account_id,
                old.kind,
                old.amount_minor,
                Direction::Reverse,
                source,
            )
            .await?;

            let mut active: transactions::ActiveModel = existing.into();
            active.member_id = ActiveValue::Set(refs.member_id);
            active.account_id = ActiveValue::Set(refs.account_id);
            active.category_id = ActiveValue::Set(refs.category_id);
            active.kind = ActiveValue::Set(kind.as_str().to_string());
            active.amount_minor = ActiveValue::Set(amount_minor);
            active.date = ActiveValue::Set(date);
            active.description = ActiveValue::Set(description);
            active.updated_at = ActiveValue::Set(Utc::now());
            let model = active.update(&db_tx).await?;

            self.adjust(
                &db_tx,
                refs.account_id,
                kind,
                amount_minor,
                Direction::Apply,
                source,
            )
            .await?;

            Transaction::try_from(model)
        })?;

        info!(
            transaction_id = %transaction.id,
            account_id = %transaction.account_id,
            kind = transaction.kind.as_str(),
            amount_minor = transaction.amount_minor,
            "transaction updated"
        );
        Ok(transaction)
    }

    /// Reverses a transaction's effect and removes it.
    ///
    /// Reversing an income may leave the account negative.
    pub async fn delete_transaction(&self, user_id: &str, transaction_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let existing = self
                .require_transaction(&db_tx, user_id, transaction_id)
                .await?;
            let old = Transaction::try_from(existing)?;

            self.adjust(
                &db_tx,
                old.account_id,
                old.kind,
                old.amount_minor,
                Direction::Reverse,
                AdjustmentSource::Transaction(old.id),
            )
            .await?;
            transactions::Entity::delete_by_id(old.id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })?;

        info!(%transaction_id, "transaction deleted");
        Ok(())
    }
}
