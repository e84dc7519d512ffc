//! Migration: Create market_data table.
//!
//! Catalog of comparable listings. Populated by external ingestion; the
//! appraisal pipeline only reads it.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MarketData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarketData::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MarketData::Title).string().not_null())
                    .col(ColumnDef::new(MarketData::Description).text().null())
                    .col(ColumnDef::new(MarketData::Category).string().not_null())
                    .col(ColumnDef::new(MarketData::Subcategory).string().null())
                    .col(ColumnDef::new(MarketData::Brand).string().null())
                    .col(ColumnDef::new(MarketData::Condition).string().null())
                    .col(ColumnDef::new(MarketData::Price).double().not_null())
                    .col(
                        ColumnDef::new(MarketData::Currency)
                            .string_len(3)
                            .not_null()
                            .default("USD"),
                    )
                    .col(ColumnDef::new(MarketData::OriginalPrice).double().null())
                    .col(ColumnDef::new(MarketData::Source).string().not_null())
                    .col(ColumnDef::new(MarketData::SourceUrl).string().null())
                    .col(ColumnDef::new(MarketData::SourceId).string().null())
                    .col(ColumnDef::new(MarketData::Embeddings).json().null())
                    .col(ColumnDef::new(MarketData::Features).json().null())
                    .col(ColumnDef::new(MarketData::ImageUrl).string().null())
                    .col(
                        ColumnDef::new(MarketData::ScrapedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MarketData::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketData::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Comparable lookup: category + price band
        manager
            .create_index(
                Index::create()
                    .name("idx_market_data_category_price")
                    .table(MarketData::Table)
                    .col(MarketData::Category)
                    .col(MarketData::Price)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_market_data_source_category")
                    .table(MarketData::Table)
                    .col(MarketData::Source)
                    .col(MarketData::Category)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_market_data_created_at")
                    .table(MarketData::Table)
                    .col(MarketData::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketData::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MarketData {
    Table,
    Id,
    Title,
    Description,
    Category,
    Subcategory,
    Brand,
    Condition,
    Price,
    Currency,
    OriginalPrice,
    Source,
    SourceUrl,
    SourceId,
    Embeddings,
    Features,
    ImageUrl,
    ScrapedAt,
    CreatedAt,
    UpdatedAt,
}
