use sea_orm_migration::prelude::*;

use super::m20251019_000001_ledger_entries::LedgerEntries;

#[derive(DeriveMigrationName)]
pub struct Migration;

const OWNER_DATE_INDEX: &str = "idx-ledger_entries-user_id-date";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name(OWNER_DATE_INDEX)
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::UserId)
                    .col(LedgerEntries::Date)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(OWNER_DATE_INDEX)
                    .table(LedgerEntries::Table)
                    .to_owned(),
            )
            .await
    }
}
