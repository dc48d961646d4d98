//! Password records and the default-password pointer on top of a
//! [`SecretStore`].
//!
//! Entry layout:
//! - `mask-smith.key.<key id>` → transport-encoded key material
//! - `mask-smith.default-key` → transport-encoded key id of the last password used

use masksmith_codec::{KeyId, KeyMaterial};

use crate::{error::VaultError, store::SecretStore};

const RECORD_PREFIX: &str = "mask-smith.key.";
const DEFAULT_POINTER: &str = "mask-smith.default-key";

fn record_name(id: KeyId) -> String {
    format!("{RECORD_PREFIX}{id}")
}

/// Maps key identifiers to stored key material.
pub struct PasswordStore<S> {
    store: S,
}

impl<S: SecretStore> PasswordStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Key material stored for `id`, if any.
    ///
    /// A record that does not decode, or whose key no longer hashes to `id`,
    /// is reported as a storage failure rather than silently ignored.
    pub async fn lookup(&self, id: KeyId) -> Result<Option<KeyMaterial>, VaultError> {
        let Some(value) = self.store.get(&record_name(id)).await? else {
            return Ok(None);
        };

        let key = KeyMaterial::from_z85(&value)
            .map_err(|e| VaultError::StorageFailure(format!("record for key {id}: {e}")))?;
        if key.key_id() != id {
            return Err(VaultError::StorageFailure(format!(
                "record for key {id} holds key {}",
                key.key_id()
            )));
        }

        Ok(Some(key))
    }

    /// Persist the record for `key`. Its identifier is derived, not trusted.
    pub async fn remember(&self, key: &KeyMaterial) -> Result<KeyId, VaultError> {
        let id = key.key_id();
        self.store.set(&record_name(id), &key.to_z85()).await?;

        #[cfg(feature = "tracing")]
        tracing::info!(key_id = %id, "stored password record");

        Ok(id)
    }

    /// Identifier the default pointer names, whether or not its record exists.
    pub async fn default_key_id(&self) -> Result<Option<KeyId>, VaultError> {
        let Some(value) = self.store.get(DEFAULT_POINTER).await? else {
            return Ok(None);
        };
        value
            .parse::<KeyId>()
            .map(Some)
            .map_err(|e| VaultError::StorageFailure(format!("default key pointer: {e}")))
    }

    /// The default pointer resolved to its record.
    ///
    /// A pointer whose record is missing counts as no default.
    pub async fn default_key(&self) -> Result<Option<(KeyId, KeyMaterial)>, VaultError> {
        let Some(id) = self.default_key_id().await? else {
            return Ok(None);
        };
        Ok(self.lookup(id).await?.map(|key| (id, key)))
    }

    /// Point the default at `id`. Last writer wins.
    pub async fn set_default(&self, id: KeyId) -> Result<(), VaultError> {
        self.store.set(DEFAULT_POINTER, &id.to_string()).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(key_id = %id, "default password updated");

        Ok(())
    }
}
