use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_customers_table::Customers;
use super::m20250301_000002_create_products_table::Products;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000005_create_reservation_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reservations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Reservations::ReservationNumber)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Reservations::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(Reservations::PresetId).uuid().null())
                    .col(ColumnDef::new(Reservations::ReservationDate).date().not_null())
                    .col(ColumnDef::new(Reservations::PickupTimeStart).time().null())
                    .col(ColumnDef::new(Reservations::PickupTimeEnd).time().null())
                    .col(
                        ColumnDef::new(Reservations::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Reservations::TotalAmount)
                            .decimal_len(12, 0)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reservations::DiscountAmount)
                            .decimal_len(12, 0)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reservations::FinalAmount)
                            .decimal_len(12, 0)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Reservations::Notes).text().null())
                    .col(ColumnDef::new(Reservations::AdminNotes).text().null())
                    .col(
                        ColumnDef::new(Reservations::ReminderSentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::ConfirmationSentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Reservations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_customer")
                            .from(Reservations::Table, Reservations::CustomerId)
                            .to(Customers::Table, Customers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_reservations_date", Reservations::ReservationDate),
            ("idx_reservations_status", Reservations::Status),
            ("idx_reservations_customer_id", Reservations::CustomerId),
            ("idx_reservations_created_at", Reservations::CreatedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Reservations::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(ReservationItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReservationItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReservationItems::ReservationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReservationItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ReservationItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(ReservationItems::UnitPrice)
                            .decimal_len(12, 0)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationItems::Subtotal)
                            .decimal_len(12, 0)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_items_reservation")
                            .from(ReservationItems::Table, ReservationItems::ReservationId)
                            .to(Reservations::Table, Reservations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_items_product")
                            .from(ReservationItems::Table, ReservationItems::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reservation_items_reservation_id")
                    .table(ReservationItems::Table)
                    .col(ReservationItems::ReservationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReservationItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reservations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Reservations {
    Table,
    Id,
    ReservationNumber,
    CustomerId,
    PresetId,
    ReservationDate,
    PickupTimeStart,
    PickupTimeEnd,
    Status,
    TotalAmount,
    DiscountAmount,
    FinalAmount,
    Notes,
    AdminNotes,
    ReminderSentAt,
    ConfirmationSentAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum ReservationItems {
    Table,
    Id,
    ReservationId,
    ProductId,
    Quantity,
    UnitPrice,
    Subtotal,
}
