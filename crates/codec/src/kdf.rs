//! Password → key derivation.
//!
//! The key is the SHA-256 digest of the password's UTF-8 bytes; its
//! identifier is the first three bytes of SHA-256 over the key. Both are
//! deterministic so a token written on one machine opens on any other.

use std::{fmt, str::FromStr};

use {
    sha2::{Digest, Sha256},
    zeroize::Zeroizing,
};

use crate::{error::CodecError, z85};

/// Length of a [`KeyId`] in bytes.
pub const KEY_ID_LEN: usize = 3;

/// Length of [`KeyMaterial`] in bytes (AES-256 key).
pub const KEY_LEN: usize = 32;

/// Secret AEAD key derived from a password. Zeroized on drop.
#[derive(Clone)]
pub struct KeyMaterial(Zeroizing<[u8; KEY_LEN]>);

impl KeyMaterial {
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Truncated SHA-256 of the key: the non-secret handle stored in tokens.
    #[must_use]
    pub fn key_id(&self) -> KeyId {
        let digest = Sha256::digest(self.0.as_slice());
        let mut id = [0u8; KEY_ID_LEN];
        id.copy_from_slice(&digest[..KEY_ID_LEN]);
        KeyId(id)
    }

    /// Transport-encoded form used as the secret-store value.
    #[must_use]
    pub fn to_z85(&self) -> Zeroizing<String> {
        Zeroizing::new(z85::encode(self.0.as_slice()))
    }

    /// Parse a value written by [`to_z85`](Self::to_z85).
    pub fn from_z85(text: &str) -> Result<Self, CodecError> {
        let bytes = Zeroizing::new(z85::decode(text)?);
        if bytes.len() != KEY_LEN {
            return Err(CodecError::MalformedToken(format!(
                "key material has {} bytes, expected {KEY_LEN}",
                bytes.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }

    /// Compare two keys without short-circuiting on the first differing byte.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyMaterial").field(&"[redacted]").finish()
    }
}

/// Short, non-secret fingerprint of a [`KeyMaterial`].
///
/// Displayed and parsed in transport encoding (four characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; KEY_ID_LEN]);

impl KeyId {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_ID_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&z85::encode(&self.0))
    }
}

impl FromStr for KeyId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = z85::decode(s)?;
        let id: [u8; KEY_ID_LEN] = bytes.as_slice().try_into().map_err(|_| {
            CodecError::MalformedToken(format!(
                "key identifier has {} bytes, expected {KEY_ID_LEN}",
                bytes.len()
            ))
        })?;
        Ok(Self(id))
    }
}

/// Derive the key and its identifier from a password.
///
/// The copy of the password bytes made for hashing is wiped before returning.
#[must_use]
pub fn derive_from_password(password: &str) -> (KeyMaterial, KeyId) {
    let raw = Zeroizing::new(password.as_bytes().to_vec());

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&Sha256::digest(raw.as_slice()));

    let key = KeyMaterial(key);
    let id = key.key_id();
    (key, id)
}
