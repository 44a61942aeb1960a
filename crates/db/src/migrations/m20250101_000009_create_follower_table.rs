//! Create follower table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Follower::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Follower::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Follower::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Follower::ActorUrl).string_len(1024).not_null())
                    .col(ColumnDef::new(Follower::InboxUrl).string_len(1024).not_null())
                    .col(ColumnDef::new(Follower::SharedInboxUrl).string_len(1024))
                    .col(ColumnDef::new(Follower::Accepted).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Follower::CreatedAt)
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
                    .name("idx_follower_user_id_actor_url")
                    .table(Follower::Table)
                    .col(Follower::UserId)
                    .col(Follower::ActorUrl)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_follower_user_id")
                    .from(Follower::Table, Follower::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Follower::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Follower {
    Table,
    Id,
    UserId,
    ActorUrl,
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
