//! Migration to create the user_providers table.
//!
//! A user_provider row binds a user to a provider with a priority (lower
//! means preferred) and a per-user JSON configuration that may carry the
//! webhook notification settings.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserProviders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserProviders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserProviders::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserProviders::ProviderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserProviders::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(UserProviders::Config).json_binary().null())
                    .col(
                        ColumnDef::new(UserProviders::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(UserProviders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserProviders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_providers_user_id")
                            .from(UserProviders::Table, UserProviders::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_providers_provider_id")
                            .from(UserProviders::Table, UserProviders::ProviderId)
                            .to(Providers::Table, Providers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Priority-ordered lookups per user are the hot path of provider
        // selection.
        manager
            .create_index(
                Index::create()
                    .name("idx_user_providers_user_priority")
                    .table(UserProviders::Table)
                    .col(UserProviders::UserId)
                    .col(UserProviders::Priority)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_user_providers_user_priority")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(UserProviders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserProviders {
    Table,
    Id,
    UserId,
    ProviderId,
    Priority,
    Config,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Providers {
    Table,
    Id,
}
