//! Command structs for engine write operations.
//!
//! These types group parameters for create/update operations, keeping call
//! sites readable and avoiding long argument lists. Every command carries the
//! requesting `user_id`, already authenticated by the caller.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::TransactionKind;

/// Post a new income or expense.
#[derive(Clone, Debug)]
pub struct NewTransactionCmd {
    pub user_id: String,
    pub member_id: Uuid,
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub date: NaiveDate,
    pub description: String,
}

impl NewTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        member_id: Uuid,
        account_id: Uuid,
        category_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        date: NaiveDate,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            member_id,
            account_id,
            category_id,
            kind,
            amount_minor,
            date,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update of a posted transaction.
///
/// `None` keeps the stored value. `Some` always overwrites it, so
/// `description(String::new())` clears the description and `amount_minor(0)`
/// is rejected instead of being ignored.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub member_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub amount_minor: Option<i64>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, transaction_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            transaction_id,
            member_id: None,
            account_id: None,
            category_id: None,
            kind: None,
            amount_minor: None,
            date: None,
            description: None,
        }
    }

    #[must_use]
    pub fn member_id(mut self, member_id: Uuid) -> Self {
        self.member_id = Some(member_id);
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Move money between two accounts of one member.
#[derive(Clone, Debug)]
pub struct NewTransferCmd {
    pub user_id: String,
    pub member_id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount_minor: i64,
    pub fee_minor: i64,
    /// Defaults to today (UTC) when absent.
    pub date: Option<NaiveDate>,
    pub description: String,
}

impl NewTransferCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        member_id: Uuid,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount_minor: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            member_id,
            from_account_id,
            to_account_id,
            amount_minor,
            fee_minor: 0,
            date: None,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn fee_minor(mut self, fee_minor: i64) -> Self {
        self.fee_minor = fee_minor;
        self
    }

    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
