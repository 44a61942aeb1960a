//! Create reminder table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reminder::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Reminder::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Reminder::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Reminder::EventId).string_len(32).not_null())
                    .col(ColumnDef::new(Reminder::RemindAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Reminder::MinutesBeforeStart).integer().not_null())
                    .col(ColumnDef::new(Reminder::Status).string_len(16).not_null().default("pending"))
                    .col(
                        ColumnDef::new(Reminder::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reminder_status_remind_at")
                    .table(Reminder::Table)
                    .col(Reminder::Status)
                    .col(Reminder::RemindAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_reminder_user_id")
                    .from(Reminder::Table, Reminder::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_reminder_event_id")
                    .from(Reminder::Table, Reminder::EventId)
                    .to(Event::Table, Event::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reminder::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Reminder {
    Table,
    Id,
    UserId,
    EventId,
    RemindAt,
    MinutesBeforeStart,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
}
