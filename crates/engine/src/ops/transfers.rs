use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use sea_orm::{ActiveValue, Condition, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    Account, AdjustmentSource, Direction, EngineError, NewTransferCmd, ResultEngine, TransactionKind,
    Transfer, transfers,
    util::{ensure_positive_amount, normalize_description},
};

use super::{Engine, with_tx};

/// Filters for listing transfers.
#[derive(Clone, Debug, Default)]
pub struct TransferListFilter {
    pub member_id: Option<Uuid>,
    /// Matches transfers where the account is either side.
    pub account_id: Option<Uuid>,
}

impl Engine {
    /// Moves money between two accounts of the same member.
    ///
    /// The source is debited `amount + fee` and the destination credited
    /// `amount`. A transfer to the same account is rejected before anything
    /// is read.
    pub async fn create_transfer(&self, cmd: NewTransferCmd) -> ResultEngine<Transfer> {
        if cmd.from_account_id == cmd.to_account_id {
            warn!(account_id = %cmd.from_account_id, "transfer rejected: same account");
            return Err(EngineError::InvalidTransfer(
                "source and destination account must differ".to_string(),
            ));
        }
        ensure_positive_amount(cmd.amount_minor, "amount")?;
        if cmd.fee_minor < 0 {
            return Err(EngineError::InvalidAmount("fee must be >= 0".to_string()));
        }
        let debit_minor = cmd
            .amount_minor
            .checked_add(cmd.fee_minor)
            .ok_or_else(|| EngineError::InvalidAmount("amount + fee out of range".to_string()))?;
        let date = cmd.date.unwrap_or_else(|| Utc::now().date_naive());
        let description = normalize_description(&cmd.description);

        let transfer = with_tx!(self, |db_tx| {
            let (from, to) = self
                .validate_transfer_refs(
                    &db_tx,
                    &cmd.user_id,
                    cmd.member_id,
                    cmd.from_account_id,
                    cmd.to_account_id,
                )
                .await?;
            let (from, to) = (Account::try_from(from)?, Account::try_from(to)?);
            if from.currency != to.currency {
                return Err(EngineError::CurrencyMismatch(format!(
                    "cannot transfer from {} to {}",
                    from.currency, to.currency
                )));
            }

            let id = Uuid::new_v4();
            let source = AdjustmentSource::Transfer(id);
            self.adjust(
                &db_tx,
                from.id,
                TransactionKind::Expense,
                debit_minor,
                Direction::Apply,
                source,
            )
            .await?;
            self.adjust(
                &db_tx,
                to.id,
                TransactionKind::Income,
                cmd.amount_minor,
                Direction::Apply,
                source,
            )
            .await?;

            let model = transfers::ActiveModel {
                id: ActiveValue::Set(id),
                user_id: ActiveValue::Set(cmd.user_id.clone()),
                member_id: ActiveValue::Set(cmd.member_id),
                from_account_id: ActiveValue::Set(from.id),
                to_account_id: ActiveValue::Set(to.id),
                amount_minor: ActiveValue::Set(cmd.amount_minor),
                fee_minor: ActiveValue::Set(cmd.fee_minor),
                date: ActiveValue::Set(date),
                description: ActiveValue::Set(description),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            Ok(Transfer::from(model))
        })?;

        info!(
            transfer_id = %transfer.id,
            from_account_id = %transfer.from_account_id,
            to_account_id = %transfer.to_account_id,
            amount_minor = transfer.amount_minor,
            fee_minor = transfer.fee_minor,
            "transfer posted"
        );
        Ok(transfer)
    }

    pub async fn transfer(&self, user_id: &str, transfer_id: Uuid) -> ResultEngine<Transfer> {
        with_tx!(self, |db_tx| {
            let model = self.require_transfer(&db_tx, user_id, transfer_id).await?;
            Ok(Transfer::from(model))
        })
    }

    /// Lists the user's transfers, newest first.
    pub async fn list_transfers(
        &self,
        user_id: &str,
        filter: &TransferListFilter,
    ) -> ResultEngine<Vec<Transfer>> {
        with_tx!(self, |db_tx| {
            let mut query =
                transfers::Entity::find().filter(transfers::Column::UserId.eq(user_id));
            if let Some(member_id) = filter.member_id {
                query = query.filter(transfers::Column::MemberId.eq(member_id));
            }
            if let Some(account_id) = filter.account_id {
                query = query.filter(
                    Condition::any()
                        .add(transfers::Column::FromAccountId.eq(account_id))
                        .add(transfers::Column::ToAccountId.eq(account_id)),
                );
            }

            let models = query
                .order_by_desc(transfers::Column::Date)
                .order_by_desc(transfers::Column::CreatedAt)
                .order_by_desc(transfers::Column::Id)
                .all(&db_tx)
                .await?;
            Ok(models.into_iter().map(Transfer::from).collect())
        })
    }

    /// Reverses both legs of a transfer and removes it.
    ///
    /// The destination may go negative if the credited money was already
    /// spent.
    pub async fn delete_transfer(&self, user_id: &str, transfer_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let transfer = Transfer::from(
                self.require_transfer(&db_tx, user_id, transfer_id)
                    .await?,
            );
            let source = AdjustmentSource::Transfer(transfer.id);

            self.adjust(
                &db_tx,
                transfer.to_account_id,
                TransactionKind::Income,
                transfer.amount_minor,
                Direction::Reverse,
                source,
            )
            .await?;
            self.adjust(
                &db_tx,
                transfer.from_account_id,
                TransactionKind::Expense,
                transfer.debit_minor(),
                Direction::Reverse,
                source,
            )
            .await?;
            transfers::Entity::delete_by_id(transfer.id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })?;

        info!(%transfer_id, "transfer deleted");
        Ok(())
    }
}
