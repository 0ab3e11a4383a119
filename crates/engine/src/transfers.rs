//! Transfers move money between two accounts of the same member.
//!
//! The source is debited by `amount_minor + fee_minor`, the destination is
//! credited by `amount_minor`; the fee leaves the household.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    pub user_id: String,
    pub member_id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount_minor: i64,
    pub fee_minor: i64,
    pub date: NaiveDate,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    /// Total leaving the source account.
    #[must_use]
    pub fn debit_minor(&self) -> i64 {
        self.amount_minor + self.fee_minor
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub member_id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount_minor: i64,
    pub fee_minor: i64,
    pub date: Date,
    pub description: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::MemberId",
        to = "super::members::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Member,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Transfer {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            member_id: model.member_id,
            from_account_id: model.from_account_id,
            to_account_id: model.to_account_id,
            amount_minor: model.amount_minor,
            fee_minor: model.fee_minor,
            date: model.date,
            description: model.description,
            created_at: model.created_at,
        }
    }
}
