//! Create comment_mention table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CommentMention::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommentMention::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CommentMention::CommentId).string_len(32).not_null())
                    .col(ColumnDef::new(CommentMention::MentionedUserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(CommentMention::CreatedAt)
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
                    .name("idx_comment_mention_comment_id")
                    .table(CommentMention::Table)
                    .col(CommentMention::CommentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_mention_mentioned_user_id")
                    .table(CommentMention::Table)
                    .col(CommentMention::MentionedUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_comment_mention_comment_id")
                    .from(CommentMention::Table, CommentMention::CommentId)
                    .to(Comment::Table, Comment::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_comment_mention_mentioned_user_id")
                    .from(CommentMention::Table, CommentMention::MentionedUserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommentMention::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CommentMention {
    Table,
    Id,
    CommentId,
    MentionedUserId,
    CreatedAt,
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
