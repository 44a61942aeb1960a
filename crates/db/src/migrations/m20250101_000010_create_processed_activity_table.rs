//! Create processed_activity table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProcessedActivity::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProcessedActivity::ActivityId)
                            .string_len(1024)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProcessedActivity::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_processed_activity_expires_at")
                    .table(ProcessedActivity::Table)
                    .col(ProcessedActivity::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProcessedActivity::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ProcessedActivity {
    Table,
    ActivityId,
    ExpiresAt,
}
