use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000006_create_notification_logs_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No foreign keys: log rows outlive archived reservations.
        manager
            .create_table(
                Table::create()
                    .table(NotificationLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(NotificationLogs::ReservationId).uuid().not_null())
                    .col(ColumnDef::new(NotificationLogs::CustomerId).uuid().null())
                    .col(
                        ColumnDef::new(NotificationLogs::NotificationType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(NotificationLogs::Success).boolean().not_null())
                    .col(ColumnDef::new(NotificationLogs::Results).json().not_null())
                    .col(
                        ColumnDef::new(NotificationLogs::CreatedAt)
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
                    .name("idx_notification_logs_reservation_id")
                    .table(NotificationLogs::Table)
                    .col(NotificationLogs::ReservationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum NotificationLogs {
    Table,
    Id,
    ReservationId,
    CustomerId,
    NotificationType,
    Success,
    Results,
    CreatedAt,
}
