use sea_orm::{
    entity::prelude::*,
    DatabaseConnection,
    QueryOrder,
    QuerySelect,
    Set,
};
use uuid::Uuid;

use crate::error::{ AppError, Result };

pub mod entity;
pub use entity::*;

mod quota_ledger;
pub use quota_ledger::QuotaLedger;

/// Addresses handed out by the HD wallet together with their cached balance.
#[derive(Clone)]
pub struct AddressRepository {
    db: DatabaseConnection,
}

impl AddressRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        address: String,
        derivation_index: i32,
        label: Option<String>
    ) -> Result<entity::generated_address::Model> {
        if self.find_by_address(&address).await?.is_some() {
            return Err(AppError::InvalidInput(format!("Address {} already exists", address)));
        }

        let model = entity::generated_address::ActiveModel {
            id: Set(Uuid::new_v4()),
            address: Set(address),
            derivation_index: Set(derivation_index),
            label: Set(label),
            cached_balance: Set(Decimal::ZERO),
            cached_transaction_count: Set(0),
            balance_checked_at: Set(None),
            created_at: Set(chrono::Utc::now()),
        };

        let model = model.insert(&self.db).await?;
        Ok(model)
    }

    pub async fn find_by_address(
        &self,
        address: &str
    ) -> Result<Option<entity::generated_address::Model>> {
        let model = entity::generated_address::Entity
            ::find()
            .filter(entity::generated_address::Column::Address.eq(address))
            .one(&self.db).await?;

        Ok(model)
    }

    /// Newest first.
    pub async fn list(&self, limit: u64) -> Result<Vec<entity::generated_address::Model>> {
        let models = entity::generated_address::Entity
            ::find()
            .order_by_desc(entity::generated_address::Column::CreatedAt)
            .limit(limit)
            .all(&self.db).await?;

        Ok(models)
    }

    /// One past the highest derivation index handed out so far.
    pub async fn next_index(&self) -> Result<i32> {
        let highest = entity::generated_address::Entity
            ::find()
            .order_by_desc(entity::generated_address::Column::DerivationIndex)
            .one(&self.db).await?;

        Ok(highest.map(|m| m.derivation_index + 1).unwrap_or(0))
    }

    pub async fn update_label(
        &self,
        address: &str,
        label: Option<String>
    ) -> Result<entity::generated_address::Model> {
        let model = self
            .find_by_address(address).await?
            .ok_or_else(|| AppError::NotFound(format!("Address {} not found", address)))?;

        let mut active: entity::generated_address::ActiveModel = model.into();
        active.label = Set(label);

        Ok(active.update(&self.db).await?)
    }

    pub async fn update_balance_cache(
        &self,
        address: &str,
        balance: Decimal,
        transaction_count: i32
    ) -> Result<entity::generated_address::Model> {
        let model = self
            .find_by_address(address).await?
            .ok_or_else(|| AppError::NotFound(format!("Address {} not found", address)))?;

        let mut active: entity::generated_address::ActiveModel = model.into();
        active.cached_balance = Set(balance);
        active.cached_transaction_count = Set(transaction_count);
        active.balance_checked_at = Set(Some(chrono::Utc::now()));

        Ok(active.update(&self.db).await?)
    }
}

/// In-memory SQLite database with the production migrations applied.
#[cfg(test)]
pub(crate) async fn test_connection() -> DatabaseConnection {
    use migration::{ Migrator, MigratorTrait };
    use sea_orm::{ ConnectOptions, Database };

    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}
