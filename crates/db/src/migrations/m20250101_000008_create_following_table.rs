//! Create following table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Following::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Following::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Following::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Following::ActorUrl).string_len(1024).not_null())
                    .col(ColumnDef::new(Following::Username).string_len(128).not_null())
                    .col(ColumnDef::new(Following::Host).string_len(256))
                    .col(ColumnDef::new(Following::InboxUrl).string_len(1024).not_null())
                    .col(ColumnDef::new(Following::SharedInboxUrl).string_len(1024))
                    .col(ColumnDef::new(Following::Accepted).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Following::CreatedAt)
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
                    .name("idx_following_user_id_actor_url")
                    .table(Following::Table)
                    .col(Following::UserId)
                    .col(Following::ActorUrl)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_following_user_id")
                    .from(Following::Table, Following::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Following::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Following {
    Table,
    Id,
    UserId,
    ActorUrl,
    Username,
    Host,
    InboxUrl,
    SharedInboxUrl,
    Accepted,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
