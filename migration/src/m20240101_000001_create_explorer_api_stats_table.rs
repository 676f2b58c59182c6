use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(ExplorerApiStats::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(ExplorerApiStats::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key()
                )
                .col(
                    ColumnDef::new(ExplorerApiStats::ProviderName)
                        .string()
                        .not_null()
                        .unique_key()
                )
                .col(
                    ColumnDef::new(ExplorerApiStats::TotalRequests)
                        .integer()
                        .not_null()
                        .default(0)
                )
                .col(
                    ColumnDef::new(ExplorerApiStats::SuccessfulRequests)
                        .integer()
                        .not_null()
                        .default(0)
                )
                .col(
                    ColumnDef::new(ExplorerApiStats::DailyLimit)
                        .integer()
                        .not_null()
                        .default(1000)
                )
                .col(
                    ColumnDef::new(ExplorerApiStats::RemainingDailyRequests)
                        .integer()
                        .not_null()
                        .default(1000)
                )
                .col(ColumnDef::new(ExplorerApiStats::LastUsedAt).timestamp_with_time_zone())
                .col(ColumnDef::new(ExplorerApiStats::QuotaDay).date().not_null())
                .col(
                    ColumnDef::new(ExplorerApiStats::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .to_owned()
        ).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ExplorerApiStats::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ExplorerApiStats {
    Table,
    Id,
    ProviderName,
    TotalRequests,
    SuccessfulRequests,
    DailyLimit,
    RemainingDailyRequests,
    LastUsedAt,
    QuotaDay,
    UpdatedAt,
}
