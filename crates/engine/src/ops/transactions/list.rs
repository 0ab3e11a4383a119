use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    Order, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::{Expr, LikeExpr},
};

use crate::{EngineError, ResultEngine, Transaction, TransactionKind, transactions};

use super::super::{Engine, with_tx};

pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Filters for listing transactions.
///
/// Every field is optional and fields combine with AND. The date range is
/// inclusive on both ends.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub member_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_amount_minor: Option<i64>,
    pub max_amount_minor: Option<i64>,
    /// Substring match on the description.
    pub description: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Date,
    Amount,
    CreatedAt,
    Id,
}

impl FromStr for SortField {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Self::Date),
            "amount" => Ok(Self::Amount),
            "created_at" => Ok(Self::CreatedAt),
            "id" => Ok(Self::Id),
            other => Err(EngineError::InvalidFilter(format!("unknown sort field: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(EngineError::InvalidFilter(format!("unknown sort order: {other}"))),
        }
    }
}

impl From<SortOrder> for Order {
    fn from(value: SortOrder) -> Self {
        match value {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Offset pagination. `page` starts at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    /// Matching rows before pagination.
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

fn validate_list_filter(filter: &TransactionListFilter, page: Page) -> ResultEngine<()> {
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date)
        && start > end
    {
        return Err(EngineError::InvalidFilter(
            "invalid range: start_date must be <= end_date".to_string(),
        ));
    }
    if filter.min_amount_minor.is_some_and(|v| v < 0)
        || filter.max_amount_minor.is_some_and(|v| v < 0)
    {
        return Err(EngineError::InvalidFilter(
            "amount bounds must be >= 0".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (filter.min_amount_minor, filter.max_amount_minor)
        && min > max
    {
        return Err(EngineError::InvalidFilter(
            "invalid range: min_amount must be <= max_amount".to_string(),
        ));
    }
    if page.page == 0 {
        return Err(EngineError::InvalidFilter("page starts at 1".to_string()));
    }
    if page.limit == 0 || page.limit > MAX_PAGE_LIMIT {
        return Err(EngineError::InvalidFilter(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

/// `LIKE` pattern matching `needle` literally anywhere in the value.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(member_id) = filter.member_id {
            self = self.filter(transactions::Column::MemberId.eq(member_id));
        }
        if let Some(account_id) = filter.account_id {
            self = self.filter(transactions::Column::AccountId.eq(account_id));
        }
        if let Some(category_id) = filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(start) = filter.start_date {
            self = self.filter(transactions::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            self = self.filter(transactions::Column::Date.lte(end));
        }
        if let Some(min) = filter.min_amount_minor {
            self = self.filter(transactions::Column::AmountMinor.gte(min));
        }
        if let Some(max) = filter.max_amount_minor {
            self = self.filter(transactions::Column::AmountMinor.lte(max));
        }
        if let Some(needle) = filter.description.as_deref().map(str::trim)
            && !needle.is_empty()
        {
            self = self.filter(
                Expr::col(transactions::Column::Description)
                    .like(LikeExpr::new(contains_pattern(needle)).escape('\\')),
            );
        }
        self
    }
}

impl Engine {
    /// Lists the user's transactions, filtered, sorted and paginated.
    ///
    /// Ties on the sort field are broken by id in the same direction, so
    /// pages are stable.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
        page: Page,
    ) -> ResultEngine<TransactionPage> {
        validate_list_filter(filter, page)?;

        with_tx!(self, |db_tx| {
            let order = Order::from(filter.sort_order);
            let sort_column = match filter.sort_by {
                SortField::Date => transactions::Column::Date,
                SortField::Amount => transactions::Column::AmountMinor,
                SortField::CreatedAt => transactions::Column::CreatedAt,
                SortField::Id => transactions::Column::Id,
            };

            let mut query = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .apply_tx_filters(filter)
                .order_by(sort_column, order.clone());
            if filter.sort_by != SortField::Id {
                query = query.order_by(transactions::Column::Id, order);
            }

            let paginator = query.paginate(&db_tx, page.limit);
            let total = paginator.num_items().await?;
            let items = paginator
                .fetch_page(page.page - 1)
                .await?
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            Ok(TransactionPage {
                items,
                total,
                page: page.page,
                limit: page.limit,
            })
        })
    }
}
