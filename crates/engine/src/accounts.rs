//! The module contains `Account` and its table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError};

/// Where an account's money is kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Bank,
    EWallet,
    Cash,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::EWallet => "e_wallet",
            Self::Cash => "cash",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "bank" => Ok(Self::Bank),
            "e_wallet" => Ok(Self::EWallet),
            "cash" => Ok(Self::Cash),
            other => Err(EngineError::InvalidKind(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

/// An account owned by a household member.
///
/// `balance_minor` is the authoritative running total. It is only ever
/// written by the balance adjustment engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub member_id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub balance_minor: i64,
    pub currency: Currency,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub member_id: Uuid,
    pub name: String,
    pub kind: String,
    pub balance_minor: i64,
    pub currency: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::MemberId",
        to = "super::members::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Member,
    #[sea_orm(has_many = "super::balance_adjustments::Entity")]
    Adjustments,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::balance_adjustments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Adjustments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let kind = AccountKind::try_from(model.kind.as_str())
            .map_err(|_| EngineError::Corrupted(format!("account kind: {}", model.kind)))?;
        let currency = Currency::try_from(model.currency.as_str())
            .map_err(|_| EngineError::Corrupted(format!("account currency: {}", model.currency)))?;
        Ok(Self {
            id: model.id,
            member_id: model.member_id,
            name: model.name,
            kind,
            balance_minor: model.balance_minor,
            currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_storage_label() {
        for kind in [AccountKind::Bank, AccountKind::EWallet, AccountKind::Cash] {
            assert_eq!(AccountKind::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(AccountKind::try_from("credit_card").is_err());
    }

    #[test]
    fn unknown_stored_kind_is_corruption() {
        let model = Model {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            name: "BCA".to_string(),
            kind: "brokerage".to_string(),
            balance_minor: 0,
            currency: "IDR".to_string(),
        };
        let err = Account::try_from(model).unwrap_err();
        assert!(matches!(err, EngineError::Corrupted(_)));
    }
}
