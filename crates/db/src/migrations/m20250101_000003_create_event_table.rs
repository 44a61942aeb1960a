//! Create event table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Event::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Event::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Event::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Event::ExternalId).string_len(1024))
                    .col(ColumnDef::new(Event::AttributedTo).string_len(1024).not_null())
                    .col(ColumnDef::new(Event::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Event::Summary).text())
                    .col(ColumnDef::new(Event::Location).string_len(512))
                    .col(ColumnDef::new(Event::Latitude).double())
                    .col(ColumnDef::new(Event::Longitude).double())
                    .col(ColumnDef::new(Event::Timezone).string_len(64).not_null())
                    .col(ColumnDef::new(Event::StartTime).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Event::EndTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(Event::RecurrencePattern).string_len(16))
                    .col(ColumnDef::new(Event::RecurrenceEndDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Event::Visibility).string_len(16).not_null().default("public"))
                    .col(ColumnDef::new(Event::Tags).json_binary().not_null().default("[]"))
                    .col(ColumnDef::new(Event::PrivateRecipients).json_binary())
                    .col(ColumnDef::new(Event::SharedEventId).string_len(32))
                    .col(ColumnDef::new(Event::IsLocal).boolean().not_null().default(true))
                    .col(ColumnDef::new(Event::LikesCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Event::AttendanceCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Event::CommentsCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Event::SharesCount).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Event::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Event::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_external_id")
                    .table(Event::Table)
                    .col(Event::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_start_time")
                    .table(Event::Table)
                    .col(Event::StartTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_user_id_start_time")
                    .table(Event::Table)
                    .col(Event::UserId)
                    .col(Event::StartTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_event_user_id")
                    .from(Event::Table, Event::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_event_shared_event_id")
                    .from(Event::Table, Event::SharedEventId)
                    .to(Event::Table, Event::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Event::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
    UserId,
    ExternalId,
    AttributedTo,
    Title,
    Summary,
    Location,
    Latitude,
    Longitude,
    Timezone,
    StartTime,
    EndTime,
    RecurrencePattern,
    RecurrenceEndDate,
    Visibility,
    Tags,
    PrivateRecipients,
    SharedEventId,
    IsLocal,
    LikesCount,
    AttendanceCount,
    CommentsCount,
    SharesCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
