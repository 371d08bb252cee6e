//! Password-based link cipher for lockbox notes.
//!
//! A lockbox link carries its own ciphertext. Nothing is stored anywhere
//! else, so the password is the only secret.
//!
//! # Format
//!
//! - Key: PBKDF2-HMAC-SHA256(password, salt, [`KDF_ITERATIONS`]) → 256 bits.
//! - Cipher: AES-256-GCM, no associated data, tag appended to the ciphertext.
//! - Fresh random 16-byte salt and 12-byte IV per [`encrypt`] call.
//! - Package JSON: `{"s":[..salt],"iv":[..iv],"c":[..ciphertext]}`, byte
//!   arrays as JSON numbers, rendered through [`text::to_portable`].
//!
//! Salt length, IV length and iteration count are part of every issued link.
//! Changing any of them needs a new, versioned package format.
//!
//! # Failure model
//!
//! Wrong password, flipped bits, truncated arrays and wrong lengths all
//! produce the same [`CipherError::AuthenticationFailure`].

use std::fmt;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CipherError, DecodeError};
use crate::text;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;

/// PBKDF2 iteration count.
pub const KDF_ITERATIONS: u32 = 100_000;

const KEY_LEN: usize = 32;
const TAG_LEN: usize = 16;

/// A sealed lockbox note. Immutable: changing the note means sealing a new
/// package and sharing a new link.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    #[serde(rename = "s")]
    pub salt: Vec<u8>,
    pub iv: Vec<u8>,
    #[serde(rename = "c")]
    pub ciphertext: Vec<u8>,
}

impl Package {
    /// Render the package as a lockbox link token.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Serialization`] if JSON encoding fails.
    pub fn to_token(&self) -> Result<String, CipherError> {
        let json = serde_json::to_string(self).map_err(|e| CipherError::Serialization {
            reason: e.to_string(),
        })?;
        Ok(text::to_portable(&json))
    }

    /// Parse a lockbox link token.
    ///
    /// Only the shape is checked here; lengths and integrity are checked by
    /// [`decrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the token is not a rendered package.
    pub fn from_token(token: &str) -> Result<Self, DecodeError> {
        let json = text::from_portable(token)?;
        serde_json::from_str(&json).map_err(|e| DecodeError::Document {
            reason: e.to_string(),
        })
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("salt_len", &self.salt.len())
            .field("iv_len", &self.iv.len())
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

/// A password-derived AES-256 key, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct LockboxKey([u8; KEY_LEN]);

impl LockboxKey {
    fn derive(password: &str, salt: &[u8]) -> Self {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, KDF_ITERATIONS, &mut key);
        Self(key)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl fmt::Debug for LockboxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockboxKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Seal `plaintext` under `password`.
///
/// Runs the full key derivation on the calling thread; use [`seal`] from
/// async code.
///
/// # Errors
///
/// Returns [`CipherError::Encryption`] if the AEAD operation fails.
pub fn encrypt(plaintext: &str, password: &str) -> Result<Package, CipherError> {
    let mut salt = vec![0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let key = LockboxKey::derive(password, &salt);
    let ciphertext = key
        .cipher()
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| CipherError::Encryption {
            reason: e.to_string(),
        })?;

    debug!(ciphertext_len = ciphertext.len(), "sealed lockbox package");
    Ok(Package {
        salt,
        iv: nonce.to_vec(),
        ciphertext,
    })
}

/// Open `package` with `password`.
///
/// # Errors
///
/// Returns [`CipherError::AuthenticationFailure`] for a wrong password or a
/// corrupted or tampered package.
pub fn decrypt(package: &Package, password: &str) -> Result<String, CipherError> {
    if package.salt.len() != SALT_LEN
        || package.iv.len() != IV_LEN
        || package.ciphertext.len() < TAG_LEN
    {
        debug!(?package, "lockbox package has wrong dimensions");
        return Err(CipherError::AuthenticationFailure);
    }

    let key = LockboxKey::derive(password, &package.salt);
    let plaintext = key
        .cipher()
        .decrypt(Nonce::from_slice(&package.iv), package.ciphertext.as_slice())
        .map_err(|_| CipherError::AuthenticationFailure)?;

    String::from_utf8(plaintext).map_err(|e| {
        e.into_bytes().zeroize();
        CipherError::AuthenticationFailure
    })
}

/// [`encrypt`] on the blocking thread pool, so the key derivation does not
/// stall the async runtime.
///
/// # Errors
///
/// As [`encrypt`], plus [`CipherError::Task`] if the worker is lost.
pub async fn seal(
    plaintext: Zeroizing<String>,
    password: Zeroizing<String>,
) -> Result<Package, CipherError> {
    tokio::task::spawn_blocking(move || encrypt(&plaintext, &password))
        .await
        .map_err(|e| CipherError::Task {
            reason: e.to_string(),
        })?
}

/// [`decrypt`] on the blocking thread pool.
///
/// # Errors
///
/// As [`decrypt`], plus [`CipherError::Task`] if the worker is lost.
pub async fn open(
    package: Package,
    password: Zeroizing<String>,
) -> Result<Zeroizing<String>, CipherError> {
    tokio::task::spawn_blocking(move || decrypt(&package, &password).map(Zeroizing::new))
        .await
        .map_err(|e| CipherError::Task {
            reason: e.to_string(),
        })?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        for (message, password) in [
            ("secret", "correct"),
            ("", "pw"),
            ("wifi: hunter2\nalarm: 1234", ""),
            ("Geheimnis 🔐 ünd 秘密", "pässwörd ✓"),
        ] {
            let package = encrypt(message, password).unwrap();
            assert_eq!(decrypt(&package, password).unwrap(), message);
        }
    }

    #[test]
    fn wrong_password_is_rejected() {
        let package = encrypt("secret", "correct").unwrap();
        assert!(matches!(
            decrypt(&package, "wrong"),
            Err(CipherError::AuthenticationFailure)
        ));
    }

    #[test]
    fn every_encryption_is_fresh() {
        let a = encrypt("same note", "same password").unwrap();
        let b = encrypt("same note", "same password").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn package_dimensions() {
        let package = encrypt("data", "pw").unwrap();
        assert_eq!(package.salt.len(), SALT_LEN);
        assert_eq!(package.iv.len(), IV_LEN);
        assert_eq!(package.ciphertext.len(), "data".len() + TAG_LEN);
    }

    #[test]
    fn tampering_is_indistinguishable_from_wrong_password() {
        let package = encrypt("secret", "pw").unwrap();

        let mut flipped = package.clone();
        flipped.ciphertext[0] ^= 0x01;
        let mut bad_salt = package.clone();
        bad_salt.salt[3] ^= 0x80;
        let mut short_iv = package.clone();
        short_iv.iv.pop();
        let mut truncated = package.clone();
        truncated.ciphertext.truncate(TAG_LEN - 1);

        for broken in [flipped, bad_salt, short_iv, truncated] {
            assert!(matches!(
                decrypt(&broken, "pw"),
                Err(CipherError::AuthenticationFailure)
            ));
        }
    }

    #[test]
    fn token_roundtrip_uses_web_app_field_names() {
        let package = encrypt("note", "pw").unwrap();
        let token = package.to_token().unwrap();

        let json = text::from_portable(&token).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["s"].is_array());
        assert!(value["iv"].is_array());
        assert!(value["c"].is_array());

        let parsed = Package::from_token(&token).unwrap();
        assert_eq!(parsed, package);
        assert_eq!(decrypt(&parsed, "pw").unwrap(), "note");
    }

    #[test]
    fn malformed_token_is_a_decode_error() {
        assert!(Package::from_token("not-a-valid-token").is_err());
        let not_a_package = text::to_portable(r#"{"t":"Milk","i":[]}"#);
        assert!(matches!(
            Package::from_token(&not_a_package),
            Err(DecodeError::Document { .. })
        ));
    }

    #[test]
    fn debug_output_hides_bytes() {
        let package = encrypt("note", "pw").unwrap();
        let debug = format!("{package:?}");
        assert!(debug.contains("ciphertext_len"));
        assert!(!debug.contains('['));

        let key = LockboxKey::derive("pw", &package.salt);
        assert!(format!("{key:?}").contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn async_seal_and_open() {
        let package = seal(
            Zeroizing::new("async note".to_owned()),
            Zeroizing::new("pw".to_owned()),
        )
        .await
        .unwrap();

        let opened = open(package.clone(), Zeroizing::new("pw".to_owned()))
            .await
            .unwrap();
        assert_eq!(opened.as_str(), "async note");

        let denied = open(package, Zeroizing::new("nope".to_owned())).await;
        assert!(matches!(denied, Err(CipherError::AuthenticationFailure)));
    }
}
