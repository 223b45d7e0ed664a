//! Migration to create the message_transaction_history table.
//!
//! History is an append-only archive of terminal transactions. The unique
//! index on (original_id, status) keeps archival idempotent when an outcome
//! write is retried after a crash.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageTransactionHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MessageTransactionHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::OriginalId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::ProviderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::Recipients)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::Body)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::RequestData)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::ResponseData)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::Status)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::ErrorMessage)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::ProcessedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(MessageTransactionHistory::UpdatedAt)
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
                    .name("idx_message_transaction_history_original_status")
                    .table(MessageTransactionHistory::Table)
                    .col(MessageTransactionHistory::OriginalId)
                    .col(MessageTransactionHistory::Status)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_transaction_history_original_id")
                    .table(MessageTransactionHistory::Table)
                    .col(MessageTransactionHistory::OriginalId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_transaction_history_user_id")
                    .table(MessageTransactionHistory::Table)
                    .col(MessageTransactionHistory::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_message_transaction_history_original_status",
            "idx_message_transaction_history_original_id",
            "idx_message_transaction_history_user_id",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        manager
            .drop_table(
                Table::drop()
                    .table(MessageTransactionHistory::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum MessageTransactionHistory {
    Table,
    Id,
    OriginalId,
    UserId,
    ProviderId,
    Recipients,
    Body,
    RequestData,
    ResponseData,
    Status,
    ErrorMessage,
    RetryCount,
    ProcessedAt,
    CreatedAt,
    UpdatedAt,
}
