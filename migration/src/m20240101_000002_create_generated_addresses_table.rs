use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(GeneratedAddresses::Table)
                .if_not_exists()
                .col(ColumnDef::new(GeneratedAddresses::Id).uuid().not_null().primary_key())
                .col(
                    ColumnDef::new(GeneratedAddresses::Address)
                        .string()
                        .not_null()
                        .unique_key()
                )
                .col(ColumnDef::new(GeneratedAddresses::DerivationIndex).integer().not_null())
                .col(ColumnDef::new(GeneratedAddresses::Label).string())
                .col(
                    ColumnDef::new(GeneratedAddresses::CachedBalance)
                        .decimal_len(16, 8)
                        .not_null()
                )
                .col(
                    ColumnDef::new(GeneratedAddresses::CachedTransactionCount)
                        .integer()
                        .not_null()
                        .default(0)
                )
                .col(ColumnDef::new(GeneratedAddresses::BalanceCheckedAt).timestamp_with_time_zone())
                .col(
                    ColumnDef::new(GeneratedAddresses::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_generated_addresses_created_at")
                .table(GeneratedAddresses::Table)
                .col(GeneratedAddresses::CreatedAt)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(GeneratedAddresses::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum GeneratedAddresses {
    Table,
    Id,
    Address,
    DerivationIndex,
    Label,
    CachedBalance,
    CachedTransactionCount,
    BalanceCheckedAt,
    CreatedAt,
}
