use std::sync::Arc;

use chrono::{ DateTime, Utc };
use sea_orm::prelude::Decimal;
use serde::Serialize;

use crate::db::{ generated_address, AddressRepository, QuotaLedger };
use crate::enums::ProviderId;
use crate::error::{ AppError, Result };
use crate::providers::ProviderRegistry;
use crate::wallet::{ BackupCheck, WalletBackend };

pub const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 500;
const MAX_LABEL_LEN: usize = 255;

/// Outcome of an on-demand balance check.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceCheck {
    pub address: String,
    pub balance: Decimal,
    pub transaction_count: i32,
    /// Explorers that answered; empty means the cached values were kept.
    pub sources: Vec<ProviderId>,
    pub checked_at: Option<DateTime<Utc>>,
}

/// Receiving addresses derived from the shop wallet.
pub struct AddressService {
    repository: AddressRepository,
    wallet: Arc<dyn WalletBackend>,
    registry: ProviderRegistry,
    ledger: QuotaLedger,
}

impl AddressService {
    pub fn new(
        repository: AddressRepository,
        wallet: Arc<dyn WalletBackend>,
        registry: ProviderRegistry,
        ledger: QuotaLedger
    ) -> Self {
        Self {
            repository,
            wallet,
            registry,
            ledger,
        }
    }

    /// Derive and store a new address. Without an explicit index the next
    /// unused one is taken.
    pub async fn generate(
        &self,
        index: Option<u32>,
        label: Option<String>
    ) -> Result<generated_address::Model> {
        let index = match index {
            Some(index) => index,
            None => {
                let next = self.repository.next_index().await?;
                u32::try_from(next).map_err(|_| AppError::Internal(format!("Invalid index {}", next)))?
            }
        };

        let derived = self.wallet.derive_address(index)?;
        let stored_index = i32::try_from(derived.index).map_err(|_|
            AppError::InvalidInput(format!("Derivation index {} is out of range", derived.index))
        )?;

        let model = self.repository.create(
            derived.address,
            stored_index,
            normalize_label(label)?
        ).await?;

        tracing::info!("Generated address {} at index {}", model.address, model.derivation_index);
        Ok(model)
    }

    pub async fn list(&self, limit: Option<u64>) -> Result<Vec<generated_address::Model>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        self.repository.list(limit).await
    }

    pub async fn update_label(
        &self,
        address: &str,
        label: Option<String>
    ) -> Result<generated_address::Model> {
        self.repository.update_label(address, normalize_label(label)?).await
    }

    /// Ask every explorer with quota left and keep the highest reported
    /// balance and transaction count.
    pub async fn check_balance(&self, address: &str) -> Result<BalanceCheck> {
        let stored = self.repository
            .find_by_address(address).await?
            .ok_or_else(|| AppError::NotFound(format!("Address {} not found", address)))?;

        let mut best: Option<(Decimal, u64)> = None;
        let mut sources = Vec::new();

        for probe in self.registry.explorers() {
            let provider = probe.id();
            if !self.ledger.has_quota(provider).await {
                tracing::debug!("Skipping {} for balance check: daily quota exhausted", provider);
                continue;
            }

            match probe.probe_balance(address).await {
                Ok(found) => {
                    self.ledger.record_provider_attempt(provider, true).await;
                    sources.push(provider);

                    let txs = found.transaction_count.unwrap_or(0);
                    best = Some(match best {
                        Some((balance, count)) => (balance.max(found.balance), count.max(txs)),
                        None => (found.balance, txs),
                    });
                }
                Err(e) => {
                    tracing::warn!("Balance check via {} failed for {}: {}", provider, address, e);
                    self.ledger.record_failure(provider, &e).await;
                }
            }
        }

        let Some((balance, transaction_count)) = best else {
            tracing::warn!("No explorer answered for {}, keeping cached balance", address);
            return Ok(BalanceCheck {
                address: stored.address,
                balance: stored.cached_balance,
                transaction_count: stored.cached_transaction_count,
                sources,
                checked_at: stored.balance_checked_at,
            });
        };

        let transaction_count = i32::try_from(transaction_count).unwrap_or(i32::MAX);
        let updated = self.repository.update_balance_cache(
            address,
            balance,
            transaction_count
        ).await?;

        Ok(BalanceCheck {
            address: updated.address,
            balance: updated.cached_balance,
            transaction_count: updated.cached_transaction_count,
            sources,
            checked_at: updated.balance_checked_at,
        })
    }

    /// Encrypted wallet backup. Sealing runs on the blocking pool.
    pub async fn export_backup(&self, password: String, confirm: String) -> Result<Vec<u8>> {
        if password.is_empty() {
            return Err(AppError::InvalidInput("Password is required".to_string()));
        }
        if password != confirm {
            return Err(AppError::InvalidInput("Passwords do not match".to_string()));
        }

        let wallet = self.wallet.clone();
        let backup = tokio::task
            ::spawn_blocking(move || wallet.export_backup(&password)).await
            .map_err(|e| AppError::Internal(format!("Backup task failed: {}", e)))??;

        tracing::info!("Wallet backup exported ({} bytes)", backup.len());
        Ok(backup)
    }

    /// Open an uploaded backup and report whether it restores the configured
    /// wallet. A wrong password or a damaged file is an input error.
    pub async fn verify_backup(&self, sealed: Vec<u8>, password: String) -> Result<BackupCheck> {
        if sealed.is_empty() {
            return Err(AppError::InvalidInput("Backup file is empty".to_string()));
        }

        let wallet = self.wallet.clone();
        let check = tokio::task
            ::spawn_blocking(move || wallet.verify_backup(&sealed, &password)).await
            .map_err(|e| AppError::Internal(format!("Backup task failed: {}", e)))?
            .map_err(|e| {
                match e {
                    AppError::Encryption(msg) | AppError::Wallet(msg) => AppError::InvalidInput(msg),
                    other => other,
                }
            })?;

        if check.matches_wallet {
            tracing::info!("Backup verified against the configured wallet");
        } else {
            tracing::warn!("Backup restores a different wallet ({})", check.first_address);
        }
        Ok(check)
    }
}

/// Blank labels clear the label.
fn normalize_label(label: Option<String>) -> Result<Option<String>> {
    let label = label.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());
    if let Some(l) = &label {
        if l.chars().count() > MAX_LABEL_LEN {
            return Err(
                AppError::InvalidInput(format!("Label must be at most {} characters", MAX_LABEL_LEN))
            );
        }
    }
    Ok(label)
}
