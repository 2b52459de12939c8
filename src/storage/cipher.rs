//! AES-GCM encryption of stored request payloads (they carry credentials).
//! Key is the SHA-256 of a configured secret.

use crate::error::PersistenceError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

fn derive_key(seed: &[u8]) -> [u8; KEY_LEN] {
    use ring::digest;
    let mut out = [0u8; KEY_LEN];
    let h = digest::digest(&digest::SHA256, seed);
    out[..h.as_ref().len().min(KEY_LEN)].copy_from_slice(h.as_ref());
    out
}

#[derive(Clone)]
pub struct PayloadCipher {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PayloadCipher(..)")
    }
}

impl PayloadCipher {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: derive_key(secret),
        }
    }

    /// base64(nonce || ciphertext)
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, PersistenceError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| PersistenceError::Crypto)?;
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt((&nonce).into(), plaintext)
            .map_err(|_| PersistenceError::Crypto)?;
        let mut out = nonce.to_vec();
        out.extend(ciphertext);
        Ok(BASE64.encode(&out))
    }

    pub fn open(&self, encoded: &str) -> Result<Vec<u8>, PersistenceError> {
        let raw = BASE64.decode(encoded).map_err(|_| PersistenceError::Crypto)?;
        if raw.len() < NONCE_LEN {
            return Err(PersistenceError::Crypto);
        }
        let (nonce, ct) = raw.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| PersistenceError::Crypto)?;
        cipher
            .decrypt(nonce.into(), ct)
            .map_err(|_| PersistenceError::Crypto)
    }
}
