//! Migration to create the message_transactions table.
//!
//! Message transactions are the durable state machine rows driving dispatch:
//! pending rows are claimed by the worker pool, terminal rows are archived
//! into history. The indices cover the scanner, retry planner, and rate
//! limit query paths.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MessageTransactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::ProviderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::Recipients)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MessageTransactions::Body).text().not_null())
                    .col(
                        ColumnDef::new(MessageTransactions::RequestData)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::ResponseData)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::ErrorMessage)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::NextRetryAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::Processing)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(MessageTransactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Scanner Pass A: pending rows not yet claimed.
        manager
            .create_index(
                Index::create()
                    .name("idx_message_transactions_status_processing")
                    .table(MessageTransactions::Table)
                    .col(MessageTransactions::Status)
                    .col(MessageTransactions::Processing)
                    .to_owned(),
            )
            .await?;

        // Retry planner: failed rows whose retry window has elapsed.
        manager
            .create_index(
                Index::create()
                    .name("idx_message_transactions_status_next_retry_at")
                    .table(MessageTransactions::Table)
                    .col(MessageTransactions::Status)
                    .col(MessageTransactions::NextRetryAt)
                    .to_owned(),
            )
            .await?;

        // Scanner Pass B: stale successful rows.
        manager
            .create_index(
                Index::create()
                    .name("idx_message_transactions_status_updated_at")
                    .table(MessageTransactions::Table)
                    .col(MessageTransactions::Status)
                    .col(MessageTransactions::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        // Daily rate limit count per user.
        manager
            .create_index(
                Index::create()
                    .name("idx_message_transactions_user_created_at")
                    .table(MessageTransactions::Table)
                    .col(MessageTransactions::UserId)
                    .col(MessageTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_message_transactions_status_processing",
            "idx_message_transactions_status_next_retry_at",
            "idx_message_transactions_status_updated_at",
            "idx_message_transactions_user_created_at",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(MessageTransactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MessageTransactions {
    Table,
    Id,
    UserId,
    ProviderId,
    Recipients,
    Body,
    RequestData,
    ResponseData,
    Status,
    ErrorMessage,
    RetryCount,
    NextRetryAt,
    Processing,
    ProcessedAt,
    CreatedAt,
    UpdatedAt,
}
