use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageMedia::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MessageMedia::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MessageMedia::MessageId).uuid().not_null())
                    .col(ColumnDef::new(MessageMedia::Src).string().not_null())
                    .col(
                        ColumnDef::new(MessageMedia::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MessageMedia::Table, MessageMedia::MessageId)
                            .to(Messages::Table, Messages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(MessageMedia::Table)
                    .col(MessageMedia::MessageId)
                    .name("idx_message_media_message_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MessageMedia::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MessageMedia {
    Table,
    Id,
    MessageId,
    Src,
    CreatedAt,
}

#[derive(Iden)]
enum Messages {
    Table,
    Id,
}
