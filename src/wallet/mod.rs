mod hd_wallet;

pub use hd_wallet::HdWallet;

use serde::Serialize;

use crate::enums::NetworkMode;
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct WalletHealth {
    pub healthy: bool,
    pub network: NetworkMode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedAddress {
    pub address: String,
    pub index: u32,
}

/// What an uploaded backup restores to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupCheck {
    /// Index-0 address of the restored wallet.
    pub first_address: String,
    pub matches_wallet: bool,
}

/// Source of receiving addresses and wallet backups.
pub trait WalletBackend: Send + Sync {
    fn health_check(&self) -> WalletHealth;

    fn derive_address(&self, index: u32) -> Result<DerivedAddress>;

    /// Password-encrypted backup of the wallet secret.
    fn export_backup(&self, password: &str) -> Result<Vec<u8>>;

    /// Open a backup and compare the wallet it restores with this one.
    fn verify_backup(&self, sealed: &[u8], password: &str) -> Result<BackupCheck>;
}
