use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogs::EventId).string().not_null())
                    .col(ColumnDef::new(AuditLogs::EventType).string().not_null())
                    .col(ColumnDef::new(AuditLogs::EntityType).string().not_null())
                    .col(ColumnDef::new(AuditLogs::EntityId).big_integer().null())
                    .col(ColumnDef::new(AuditLogs::Operation).string().not_null())
                    .col(ColumnDef::new(AuditLogs::Status).string().null())
                    .col(ColumnDef::new(AuditLogs::UserId).string().null())
                    .col(ColumnDef::new(AuditLogs::RequestPayload).text().null())
                    .col(ColumnDef::new(AuditLogs::ResponsePayload).text().null())
                    .col(ColumnDef::new(AuditLogs::ErrorMessage).string().null())
                    .col(ColumnDef::new(AuditLogs::HttpStatusCode).integer().null())
                    .col(
                        ColumnDef::new(AuditLogs::RequestTimestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AuditLogs::CompletionTimestamp)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(AuditLogs::DurationMs).big_integer().null())
                    .col(ColumnDef::new(AuditLogs::SourceIp).string().null())
                    .col(ColumnDef::new(AuditLogs::PodName).string().null())
                    .col(
                        ColumnDef::new(AuditLogs::ChaosActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AuditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Status and request_timestamp back the filter and retention queries.
        manager
            .create_index(
                Index::create()
                    .name("idx_audit_logs_status")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_logs_request_timestamp")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::RequestTimestamp)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    EventId,
    EventType,
    EntityType,
    EntityId,
    Operation,
    Status,
    UserId,
    RequestPayload,
    ResponsePayload,
    ErrorMessage,
    HttpStatusCode,
    RequestTimestamp,
    CompletionTimestamp,
    DurationMs,
    SourceIp,
    PodName,
    ChaosActive,
    CreatedAt,
}
