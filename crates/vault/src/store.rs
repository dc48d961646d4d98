//! Secret store collaborator: a durable string → string map.

use std::collections::HashMap;

use {async_trait::async_trait, tokio::sync::RwLock};

use crate::error::VaultError;

/// Key-value storage for transport-encoded secrets.
///
/// Values are never raw passwords. Implementations must be safe to share
/// between concurrent requests; the last `set` for a name wins.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<String>, VaultError>;
    async fn set(&self, name: &str, value: &str) -> Result<(), VaultError>;
}

/// Process-scoped store; contents vanish when the process exits.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>, VaultError> {
        Ok(self.entries.read().await.get(name).cloned())
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), VaultError> {
        self.entries
            .write()
            .await
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl<S: SecretStore + ?Sized> SecretStore for std::sync::Arc<S> {
    async fn get(&self, name: &str) -> Result<Option<String>, VaultError> {
        (**self).get(name).await
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), VaultError> {
        (**self).set(name, value).await
    }
}

#[async_trait]
impl<S: SecretStore + ?Sized> SecretStore for Box<S> {
    async fn get(&self, name: &str) -> Result<Option<String>, VaultError> {
        (**self).get(name).await
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), VaultError> {
        (**self).set(name, value).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::sync::Arc};

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = MemorySecretStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn set_then_get() {
        let store = MemorySecretStore::new();
        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn last_writer_wins() {
        let store = MemorySecretStore::new();
        store.set("a", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn shared_through_arc() {
        let store = Arc::new(MemorySecretStore::new());
        let handle: Arc<dyn SecretStore> = store.clone();
        handle.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
