//! Initial migration creating the record, watermark and run-log tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_synced_records(manager).await?;
        self.create_record_children(manager).await?;
        self.create_sync_state(manager).await?;
        self.create_sync_logs(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SyncState::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecordChildren::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SyncedRecords::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_synced_records(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncedRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncedRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SyncedRecords::ResourceType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SyncedRecords::RecordKey).string().not_null())
                    .col(
                        ColumnDef::new(SyncedRecords::Body)
                            .json()
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    .col(
                        ColumnDef::new(SyncedRecords::ModificationTimestamp)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncedRecords::SyncedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Natural key
        manager
            .create_index(
                Index::create()
                    .name("idx_synced_records_resource_key")
                    .table(SyncedRecords::Table)
                    .col(SyncedRecords::ResourceType)
                    .col(SyncedRecords::RecordKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_synced_records_modified")
                    .table(SyncedRecords::Table)
                    .col(SyncedRecords::ResourceType)
                    .col(SyncedRecords::ModificationTimestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_record_children(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RecordChildren::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecordChildren::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RecordChildren::ResourceType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecordChildren::ParentKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecordChildren::Collection)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecordChildren::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecordChildren::Body).json().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_record_children_parent")
                    .table(RecordChildren::Table)
                    .col(RecordChildren::ResourceType)
                    .col(RecordChildren::ParentKey)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_sync_state(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncState::ResourceType)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SyncState::LastWatermark)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncState::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_sync_logs(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncLogs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncLogs::RunId).uuid().not_null())
                    .col(ColumnDef::new(SyncLogs::ResourceType).string().not_null())
                    .col(ColumnDef::new(SyncLogs::SyncKind).string().not_null())
                    .col(ColumnDef::new(SyncLogs::Status).string().not_null())
                    .col(
                        ColumnDef::new(SyncLogs::RecordsFetched)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::RecordsProcessed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::RecordsCreated)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::RecordsUpdated)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::RecordsDeleted)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::RecordsSkipped)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::RecordsFailed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::CompletedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::DurationSeconds)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(SyncLogs::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(SyncLogs::Failures)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_logs_started")
                    .table(SyncLogs::Table)
                    .col((SyncLogs::StartedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_logs_run")
                    .table(SyncLogs::Table)
                    .col(SyncLogs::RunId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "synced_records")]
enum SyncedRecords {
    Table,
    Id,
    ResourceType,
    RecordKey,
    Body,
    ModificationTimestamp,
    SyncedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "record_children")]
enum RecordChildren {
    Table,
    Id,
    ResourceType,
    ParentKey,
    Collection,
    Position,
    Body,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "sync_state")]
enum SyncState {
    Table,
    ResourceType,
    LastWatermark,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "sync_logs")]
enum SyncLogs {
    Table,
    Id,
    RunId,
    ResourceType,
    SyncKind,
    Status,
    RecordsFetched,
    RecordsProcessed,
    RecordsCreated,
    RecordsUpdated,
    RecordsDeleted,
    RecordsSkipped,
    RecordsFailed,
    StartedAt,
    CompletedAt,
    DurationSeconds,
    ErrorMessage,
    Failures,
}
