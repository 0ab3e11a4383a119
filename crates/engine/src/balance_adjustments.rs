//! Append-only audit log of account balance mutations.
//!
//! One row is written, inside the same DB transaction, for every change the
//! balance adjustment engine makes. The log is never read by the posting path;
//! it exists so balance drift can be detected after the fact.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

/// Whether a movement is being applied for the first time or undone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Apply,
    Reverse,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Reverse => "reverse",
        }
    }
}

impl TryFrom<&str> for Direction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "apply" => Ok(Self::Apply),
            "reverse" => Ok(Self::Reverse),
            other => Err(EngineError::Corrupted(format!("adjustment direction: {other}"))),
        }
    }
}

/// The ledger row that caused an adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "id", rename_all = "snake_case")]
pub enum AdjustmentSource {
    Transaction(Uuid),
    Transfer(Uuid),
}

impl AdjustmentSource {
    fn parts(self) -> (&'static str, Uuid) {
        match self {
            Self::Transaction(id) => ("transaction", id),
            Self::Transfer(id) => ("transfer", id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAdjustment {
    pub seq: i64,
    pub account_id: Uuid,
    pub source: AdjustmentSource,
    pub direction: Direction,
    pub delta_minor: i64,
    pub balance_after_minor: i64,
    pub created_at: DateTime<Utc>,
}

impl BalanceAdjustment {
    #[must_use]
    pub fn balance_before_minor(&self) -> i64 {
        self.balance_after_minor - self.delta_minor
    }
}

/// A mismatch found by [`Engine::verify_balances`](crate::Engine::verify_balances).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDrift {
    pub account_id: Uuid,
    /// Audit row at which the chain broke; `None` when the stored balance
    /// disagrees with the last audit row.
    pub at_seq: Option<i64>,
    pub expected_minor: i64,
    pub actual_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balance_adjustments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: Uuid,
    pub source_kind: String,
    pub source_id: Uuid,
    pub direction: String,
    pub delta_minor: i64,
    pub balance_after_minor: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Account,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn record(
        account_id: Uuid,
        source: AdjustmentSource,
        direction: Direction,
        delta_minor: i64,
        balance_after_minor: i64,
    ) -> Self {
        let (source_kind, source_id) = source.parts();
        Self {
            id: ActiveValue::NotSet,
            account_id: ActiveValue::Set(account_id),
            source_kind: ActiveValue::Set(source_kind.to_string()),
            source_id: ActiveValue::Set(source_id),
            direction: ActiveValue::Set(direction.as_str().to_string()),
            delta_minor: ActiveValue::Set(delta_minor),
            balance_after_minor: ActiveValue::Set(balance_after_minor),
            created_at: ActiveValue::Set(Utc::now()),
        }
    }
}

impl TryFrom<Model> for BalanceAdjustment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let source = match model.source_kind.as_str() {
            "transaction" => AdjustmentSource::Transaction(model.source_id),
            "transfer" => AdjustmentSource::Transfer(model.source_id),
            other => {
                return Err(EngineError::Corrupted(format!("adjustment source: {other}")));
            }
        };
        Ok(Self {
            seq: model.id,
            account_id: model.account_id,
            source,
            direction: Direction::try_from(model.direction.as_str())?,
            delta_minor: model.delta_minor,
            balance_after_minor: model.balance_after_minor,
            created_at: model.created_at,
        })
    }
}
