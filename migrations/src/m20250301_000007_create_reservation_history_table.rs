use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000007_create_reservation_history_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReservationHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReservationHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReservationHistory::ReservationId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ReservationHistory::ReservationNumber)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReservationHistory::CustomerId).uuid().null())
                    .col(
                        ColumnDef::new(ReservationHistory::CustomerName)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReservationHistory::CustomerPhone)
                            .string_len(20)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReservationHistory::ReservationDate)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReservationHistory::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(ReservationHistory::FinalAmount)
                            .decimal_len(12, 0)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReservationHistory::Items).json().not_null())
                    .col(ColumnDef::new(ReservationHistory::Notes).text().null())
                    .col(ColumnDef::new(ReservationHistory::AdminNotes).text().null())
                    .col(
                        ColumnDef::new(ReservationHistory::OriginalCreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationHistory::ArchivedAt)
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
                    .name("idx_reservation_history_phone")
                    .table(ReservationHistory::Table)
                    .col(ReservationHistory::CustomerPhone)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReservationHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ReservationHistory {
    Table,
    Id,
    ReservationId,
    ReservationNumber,
    CustomerId,
    CustomerName,
    CustomerPhone,
    ReservationDate,
    Status,
    FinalAmount,
    Items,
    Notes,
    AdminNotes,
    OriginalCreatedAt,
    ArchivedAt,
}
