//! Ownership checks along the User → Member → Account and User → Category
//! chains.
//!
//! Every check runs on the caller's DB transaction, before anything is
//! written, and fails with `KeyNotFound` naming only the entity kind. A record
//! owned by another user is reported exactly like a missing one.

use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, accounts, categories, members, transactions, transfers};

use super::Engine;

/// The references a transaction points at.
#[derive(Clone, Copy, Debug)]
pub(super) struct TransactionRefs {
    pub(super) member_id: Uuid,
    pub(super) account_id: Uuid,
    pub(super) category_id: Uuid,
}

/// Generates a `require_*` method for an entity owned directly by a user.
macro_rules! impl_owned_by_user {
    ($require_fn:ident, $entity:path, $model:path, $user_col:expr, $label:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            user_id: &str,
            id: Uuid,
        ) -> ResultEngine<$model> {
            <$entity>::find_by_id(id)
                .filter($user_col.eq(user_id))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($label.to_string()))
        }
    };
}

impl Engine {
    impl_owned_by_user!(
        require_member,
        members::Entity,
        members::Model,
        members::Column::UserId,
        "member"
    );

    impl_owned_by_user!(
        require_category,
        categories::Entity,
        categories::Model,
        categories::Column::UserId,
        "category"
    );

    impl_owned_by_user!(
        require_transaction,
        transactions::Entity,
        transactions::Model,
        transactions::Column::UserId,
        "transaction"
    );

    impl_owned_by_user!(
        require_transfer,
        transfers::Entity,
        transfers::Model,
        transfers::Column::UserId,
        "transfer"
    );

    pub(super) async fn require_account_of_member(
        &self,
        db: &DatabaseTransaction,
        member_id: Uuid,
        account_id: Uuid,
        label: &str,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(account_id)
            .filter(accounts::Column::MemberId.eq(member_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(label.to_string()))
    }

    /// Resolves an account through its member, for reads that only know the
    /// user.
    pub(super) async fn require_account_of_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(account_id)
            .inner_join(members::Entity)
            .filter(members::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account".to_string()))
    }

    /// Checks member, account and category in that order and returns the
    /// account row.
    pub(super) async fn validate_transaction_refs(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        refs: TransactionRefs,
    ) -> ResultEngine<accounts::Model> {
        self.require_member(db, user_id, refs.member_id).await?;
        let account = self
            .require_account_of_member(db, refs.member_id, refs.account_id, "account")
            .await?;
        self.require_category(db, user_id, refs.category_id).await?;
        Ok(account)
    }

    /// Checks the member and that both transfer accounts belong to it.
    pub(super) async fn validate_transfer_refs(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        member_id: Uuid,
        from_account_id: Uuid,
        to_account_id: Uuid,
    ) -> ResultEngine<(accounts::Model, accounts::Model)> {
        self.require_member(db, user_id, member_id).await?;
        let from = self
            .require_account_of_member(db, member_id, from_account_id, "from account")
            .await?;
        let to = self
            .require_account_of_member(db, member_id, to_account_id, "to account")
            .await?;
        Ok((from, to))
    }
}
