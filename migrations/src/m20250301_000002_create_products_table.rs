use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000002_create_products_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Products::ProductCode).string_len(64).null())
                    .col(ColumnDef::new(Products::ExternalId).string_len(64).null())
                    .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Products::BaseName).string_len(255).null())
                    .col(ColumnDef::new(Products::VariationName).string_len(255).null())
                    .col(ColumnDef::new(Products::CategoryId).integer().null())
                    .col(
                        ColumnDef::new(Products::Price)
                            .decimal_len(12, 0)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::TaxType)
                            .string_len(16)
                            .not_null()
                            .default("inclusive"),
                    )
                    .col(
                        ColumnDef::new(Products::TaxRate)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(
                        ColumnDef::new(Products::PriceType)
                            .string_len(16)
                            .not_null()
                            .default("fixed"),
                    )
                    .col(
                        ColumnDef::new(Products::UnitType)
                            .string_len(16)
                            .not_null()
                            .default("piece"),
                    )
                    .col(ColumnDef::new(Products::Barcode).string_len(64).null())
                    .col(
                        ColumnDef::new(Products::Visible)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Products::PointEligible)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Products::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Products::Comment).text().null())
                    .col(ColumnDef::new(Products::Memo).text().null())
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
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
                    .if_not_exists()
                    .name("idx_products_product_code")
                    .table(Products::Table)
                    .col(Products::ProductCode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_products_visible")
                    .table(Products::Table)
                    .col(Products::Visible)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Products {
    Table,
    Id,
    ProductCode,
    ExternalId,
    Name,
    BaseName,
    VariationName,
    CategoryId,
    Price,
    TaxType,
    TaxRate,
    PriceType,
    UnitType,
    Barcode,
    Visible,
    PointEligible,
    DisplayOrder,
    Comment,
    Memo,
    CreatedAt,
    UpdatedAt,
}
