use sea_orm_migration::prelude::*;

use super::m20250301_000003_create_preset_tables::ProductPresets;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000004_create_pickup_windows_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PickupWindows::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PickupWindows::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PickupWindows::PresetId).uuid().not_null())
                    .col(ColumnDef::new(PickupWindows::ProductId).uuid().null())
                    .col(
                        ColumnDef::new(PickupWindows::PickupStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PickupWindows::PickupEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PickupWindows::Price).decimal_len(12, 0).null())
                    .col(ColumnDef::new(PickupWindows::Comment).text().null())
                    .col(ColumnDef::new(PickupWindows::Variation).string_len(255).null())
                    .col(
                        ColumnDef::new(PickupWindows::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pickup_windows_preset")
                            .from(PickupWindows::Table, PickupWindows::PresetId)
                            .to(ProductPresets::Table, ProductPresets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pickup_windows_preset_start")
                    .table(PickupWindows::Table)
                    .col(PickupWindows::PresetId)
                    .col(PickupWindows::PickupStart)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PickupWindows::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PickupWindows {
    Table,
    Id,
    PresetId,
    ProductId,
    PickupStart,
    PickupEnd,
    Price,
    Comment,
    Variation,
    CreatedAt,
}
