use aes_gcm::{ aead::{ Aead, KeyInit }, Aes256Gcm, Nonce };
use argon2::Argon2;
use rand::RngCore;

use crate::error::{ AppError, Result };

const MAGIC: &[u8; 4] = b"LTCB";
const FORMAT_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = MAGIC.len() + 1 + SALT_LEN + NONCE_LEN;

/// Encrypt `plaintext` under a password.
///
/// Layout: `MAGIC || version || salt || nonce || AES-256-GCM ciphertext`, the key
/// being Argon2id(password, salt).
pub fn seal_backup(plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Err(AppError::InvalidInput("Backup password must not be empty".to_string()));
    }

    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    let mut rng = rand::rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce_bytes);

    let cipher = cipher_for(password, &salt)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| AppError::Encryption(e.to_string()))?;

    let mut sealed = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    sealed.extend_from_slice(MAGIC);
    sealed.push(FORMAT_VERSION);
    sealed.extend_from_slice(&salt);
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);

    Ok(sealed)
}

/// Reverse of [`seal_backup`]. A wrong password and a tampered file are
/// indistinguishable.
pub fn open_backup(sealed: &[u8], password: &str) -> Result<Vec<u8>> {
    if sealed.len() <= HEADER_LEN || &sealed[..MAGIC.len()] != MAGIC {
        return Err(AppError::Encryption("Not a wallet backup file".to_string()));
    }

    let version = sealed[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(AppError::Encryption(format!("Unsupported backup version {}", version)));
    }

    let salt_start = MAGIC.len() + 1;
    let nonce_start = salt_start + SALT_LEN;
    let salt = &sealed[salt_start..nonce_start];
    let nonce = Nonce::from_slice(&sealed[nonce_start..HEADER_LEN]);

    let cipher = cipher_for(password, salt)?;
    cipher
        .decrypt(nonce, &sealed[HEADER_LEN..])
        .map_err(|_| AppError::Encryption("Wrong password or corrupted backup".to_string()))
}

fn cipher_for(password: &str, salt: &[u8]) -> Result<Aes256Gcm> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| AppError::Encryption(format!("Key derivation failed: {}", e)))?;

    Aes256Gcm::new_from_slice(&key).map_err(|e| AppError::Encryption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let sealed = seal_backup(b"abandon abandon about", "hunter2").unwrap();
        assert_eq!(&sealed[..4], MAGIC);

        let opened = open_backup(&sealed, "hunter2").unwrap();
        assert_eq!(opened, b"abandon abandon about");
    }

    #[test]
    fn test_wrong_password_and_tampering() {
        let mut sealed = seal_backup(b"secret words", "correct").unwrap();
        assert!(open_backup(&sealed, "incorrect").is_err());

        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(open_backup(&sealed, "correct").is_err());
    }

    #[test]
    fn test_rejects_foreign_files_and_empty_password() {
        assert!(open_backup(b"PK\x03\x04 definitely a zip file, not a backup", "x").is_err());
        assert!(seal_backup(b"data", "").is_err());
    }
}
