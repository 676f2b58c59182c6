use bech32::Hrp;
use bip32::XPrv;
use bip39::Mnemonic;
use bitcoin::secp256k1::{ PublicKey, Secp256k1, SecretKey };
use ripemd::Ripemd160;
use sha2::{ Digest, Sha256 };

use crate::crypto::{ open_backup, seal_backup };
use crate::enums::NetworkMode;
use crate::error::{ AppError, Result };

use super::{ BackupCheck, DerivedAddress, WalletBackend, WalletHealth };

/// BIP84 HD wallet producing native SegWit (P2WPKH) Litecoin addresses along
/// `m/84'/coin'/0'/0/index`.
pub struct HdWallet {
    mnemonic: Mnemonic,
    seed: [u8; 64],
    network: NetworkMode,
}

impl HdWallet {
    pub fn from_mnemonic(phrase: &str, network: NetworkMode) -> Result<Self> {
        let mnemonic = Mnemonic::parse(phrase.trim()).map_err(|e|
            AppError::Wallet(format!("Invalid mnemonic: {}", e))
        )?;
        let seed = mnemonic.to_seed("");

        Ok(Self { mnemonic, seed, network })
    }

    /// Restore from a file produced by [`WalletBackend::export_backup`].
    pub fn from_backup(sealed: &[u8], password: &str, network: NetworkMode) -> Result<Self> {
        let plaintext = open_backup(sealed, password)?;
        let phrase = String::from_utf8(plaintext).map_err(|_|
            AppError::Wallet("Backup does not contain a mnemonic".to_string())
        )?;
        Self::from_mnemonic(&phrase, network)
    }

    fn derive(&self, index: u32) -> Result<String> {
        if index > (i32::MAX as u32) {
            return Err(AppError::InvalidInput(format!("Derivation index {} is out of range", index)));
        }

        let path: bip32::DerivationPath = format!(
            "m/84'/{}'/0'/0/{}",
            self.network.coin_type(),
            index
        )
            .parse()
            .map_err(|e| AppError::Wallet(format!("Invalid derivation path: {}", e)))?;

        let child = XPrv::derive_from_path(self.seed, &path).map_err(|e|
            AppError::Wallet(format!("Key derivation failed: {}", e))
        )?;

        let secret_key = SecretKey::from_slice(&child.to_bytes()).map_err(|e|
            AppError::Wallet(format!("Invalid secret key: {}", e))
        )?;
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);

        let program = hash160(&public_key.serialize());
        let hrp = Hrp::parse(self.network.bech32_hrp()).map_err(|e|
            AppError::Wallet(format!("Invalid address prefix: {}", e))
        )?;

        bech32::segwit
            ::encode(hrp, bech32::segwit::VERSION_0, &program)
            .map_err(|e| AppError::Wallet(format!("Address encoding failed: {}", e)))
    }
}

impl WalletBackend for HdWallet {
    fn health_check(&self) -> WalletHealth {
        match self.derive(0) {
            Ok(_) =>
                WalletHealth {
                    healthy: true,
                    network: self.network,
                    message: format!("HD wallet ready ({} words)", self.mnemonic.word_count()),
                },
            Err(e) =>
                WalletHealth {
                    healthy: false,
                    network: self.network,
                    message: e.to_string(),
                },
        }
    }

    fn derive_address(&self, index: u32) -> Result<DerivedAddress> {
        let address = self.derive(index)?;
        Ok(DerivedAddress { address, index })
    }

    fn export_backup(&self, password: &str) -> Result<Vec<u8>> {
        seal_backup(self.mnemonic.to_string().as_bytes(), password)
    }

    fn verify_backup(&self, sealed: &[u8], password: &str) -> Result<BackupCheck> {
        let restored = Self::from_backup(sealed, password, self.network)?;
        let first_address = restored.derive(0)?;
        let matches_wallet = restored.seed == self.seed;

        Ok(BackupCheck { first_address, matches_wallet })
    }
}

fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let digest = Ripemd160::digest(sha);

    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    out
}
