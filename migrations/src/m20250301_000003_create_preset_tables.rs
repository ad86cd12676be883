use sea_orm_migration::prelude::*;

use super::m20250301_000002_create_products_table::Products;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000003_create_preset_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductPresets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductPresets::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductPresets::PresetName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductPresets::Description).text().null())
                    .col(ColumnDef::new(ProductPresets::FormExpiryDate).date().null())
                    .col(
                        ColumnDef::new(ProductPresets::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ProductPresets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ProductPresets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PresetProducts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PresetProducts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PresetProducts::PresetId).uuid().not_null())
                    .col(ColumnDef::new(PresetProducts::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(PresetProducts::PickupStart)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PresetProducts::PickupEnd)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PresetProducts::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PresetProducts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_preset_products_preset")
                            .from(PresetProducts::Table, PresetProducts::PresetId)
                            .to(ProductPresets::Table, ProductPresets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_preset_products_product")
                            .from(PresetProducts::Table, PresetProducts::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_preset_products_preset_id")
                    .table(PresetProducts::Table)
                    .col(PresetProducts::PresetId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FormSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FormSettings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FormSettings::PresetId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(flag(FormSettings::ShowName, true))
                    .col(flag(FormSettings::ShowFurigana, true))
                    .col(flag(FormSettings::ShowGender, false))
                    .col(flag(FormSettings::ShowBirthday, false))
                    .col(flag(FormSettings::ShowPhone, true))
                    .col(flag(FormSettings::ShowZip, false))
                    .col(flag(FormSettings::ShowAddress1, false))
                    .col(flag(FormSettings::ShowAddress2, false))
                    .col(flag(FormSettings::ShowComment, true))
                    .col(flag(FormSettings::ShowPrice, true))
                    .col(flag(FormSettings::ShowTotal, true))
                    .col(flag(FormSettings::RequirePhone, true))
                    .col(flag(FormSettings::RequireFurigana, false))
                    .col(flag(FormSettings::AllowNote, true))
                    .col(flag(FormSettings::IsEnabled, true))
                    .col(ColumnDef::new(FormSettings::CustomMessage).text().null())
                    .col(
                        ColumnDef::new(FormSettings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(FormSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_settings_preset")
                            .from(FormSettings::Table, FormSettings::PresetId)
                            .to(ProductPresets::Table, ProductPresets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FormSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PresetProducts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductPresets::Table).to_owned())
            .await
    }
}

fn flag(column: FormSettings, default: bool) -> ColumnDef {
    ColumnDef::new(column)
        .boolean()
        .not_null()
        .default(default)
        .to_owned()
}

#[derive(DeriveIden)]
pub enum ProductPresets {
    Table,
    Id,
    PresetName,
    Description,
    FormExpiryDate,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum PresetProducts {
    Table,
    Id,
    PresetId,
    ProductId,
    PickupStart,
    PickupEnd,
    DisplayOrder,
    IsActive,
}

#[derive(DeriveIden)]
pub enum FormSettings {
    Table,
    Id,
    PresetId,
    ShowName,
    ShowFurigana,
    ShowGender,
    ShowBirthday,
    ShowPhone,
    ShowZip,
    ShowAddress1,
    ShowAddress2,
    ShowComment,
    ShowPrice,
    ShowTotal,
    RequirePhone,
    RequireFurigana,
    AllowNote,
    IsEnabled,
    CustomMessage,
    CreatedAt,
    UpdatedAt,
}
