//! Migration: Create appraisals table.
//!
//! One row per valuation request. Status moves pending -> processing ->
//! completed|failed and is only ever written by the pipeline run that owns it.

use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Appraisals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Appraisals::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Appraisals::UserId).integer().null())
                    .col(ColumnDef::new(Appraisals::ImagePath).string().not_null())
                    .col(ColumnDef::new(Appraisals::ImageUrl).string().null())
                    .col(
                        ColumnDef::new(Appraisals::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Appraisals::Category).string().null())
                    .col(ColumnDef::new(Appraisals::ItemCondition).string().null())
                    // Vision stage output
                    .col(ColumnDef::new(Appraisals::VisionResults).json().null())
                    .col(ColumnDef::new(Appraisals::DetectedObjects).json().null())
                    .col(ColumnDef::new(Appraisals::Embeddings).json().null())
                    // Market stage output
                    .col(ColumnDef::new(Appraisals::SimilarItems).json().null())
                    // Price stage output, written only on completion
                    .col(ColumnDef::new(Appraisals::MarketPrice).double().null())
                    .col(ColumnDef::new(Appraisals::EstimatedPrice).double().null())
                    .col(ColumnDef::new(Appraisals::PriceRangeMin).double().null())
                    .col(ColumnDef::new(Appraisals::PriceRangeMax).double().null())
                    .col(ColumnDef::new(Appraisals::ConfidenceScore).double().null())
                    .col(ColumnDef::new(Appraisals::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(Appraisals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Appraisals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Appraisals::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appraisals_user_id")
                            .from(Appraisals::Table, Appraisals::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Per-user history, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_appraisals_user_id")
                    .table(Appraisals::Table)
                    .col(Appraisals::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_appraisals_status")
                    .table(Appraisals::Table)
                    .col(Appraisals::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_appraisals_created_at")
                    .table(Appraisals::Table)
                    .col(Appraisals::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Appraisals::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Appraisals {
    Table,
    Id,
    UserId,
    ImagePath,
    ImageUrl,
    Status,
    Category,
    ItemCondition,
    VisionResults,
    DetectedObjects,
    Embeddings,
    SimilarItems,
    MarketPrice,
    EstimatedPrice,
    PriceRangeMin,
    PriceRangeMax,
    ConfidenceScore,
    ErrorMessage,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}
