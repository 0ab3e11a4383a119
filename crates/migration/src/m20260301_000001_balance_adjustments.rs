//! Append-only audit log of account balance changes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum BalanceAdjustments {
    Table,
    Id,
    AccountId,
    SourceKind,
    SourceId,
    Direction,
    DeltaMinor,
    BalanceAfterMinor,
    CreatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BalanceAdjustments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BalanceAdjustments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BalanceAdjustments::AccountId)
                            .blob()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceAdjustments::SourceKind)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BalanceAdjustments::SourceId).blob().not_null())
                    .col(
                        ColumnDef::new(BalanceAdjustments::Direction)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceAdjustments::DeltaMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceAdjustments::BalanceAfterMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceAdjustments::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balance_adjustments-account_id")
                            .from(BalanceAdjustments::Table, BalanceAdjustments::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-balance_adjustments-account_id")
                    .table(BalanceAdjustments::Table)
                    .col(BalanceAdjustments::AccountId)
                    .col(BalanceAdjustments::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-balance_adjustments-source")
                    .table(BalanceAdjustments::Table)
                    .col(BalanceAdjustments::SourceKind)
                    .col(BalanceAdjustments::SourceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BalanceAdjustments::Table).to_owned())
            .await?;
        Ok(())
    }
}
