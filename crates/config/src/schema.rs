//! Config schema types (storage, crypto, prompt).
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskSmithConfig {
    pub storage: StorageConfig,
    pub crypto: CryptoConfig,
    pub prompt: PromptConfig,
}

/// Where password records live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite secret-store file. Defaults to `<data dir>/secrets.db`.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured path, or the default under the data directory.
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| crate::loader::data_dir().join("secrets.db"))
    }
}

/// Self-verification after encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Decrypt every fresh token and compare before handing it out.
    pub verify_after_encrypt: bool,
    /// Skip the check for plaintexts larger than this many bytes.
    pub verify_max_bytes: Option<usize>,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            verify_after_encrypt: true,
            verify_max_bytes: None,
        }
    }
}

/// Interactive prompt behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Offer the last password used before asking for one.
    pub offer_last_password: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            offer_last_password: true,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = MaskSmithConfig::default();
        assert!(cfg.crypto.verify_after_encrypt);
        assert_eq!(cfg.crypto.verify_max_bytes, None);
        assert!(cfg.prompt.offer_last_password);
        assert_eq!(cfg.storage.path, None);
        assert!(cfg.storage.resolved_path().ends_with("secrets.db"));
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let cfg: MaskSmithConfig = toml::from_str("[crypto]\nverify_max_bytes = 4096\n").unwrap();
        assert!(cfg.crypto.verify_after_encrypt);
        assert_eq!(cfg.crypto.verify_max_bytes, Some(4096));
        assert!(cfg.prompt.offer_last_password);
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = MaskSmithConfig {
            storage: StorageConfig {
                path: Some(PathBuf::from("/tmp/masksmith/secrets.db")),
            },
            crypto: CryptoConfig {
                verify_after_encrypt: false,
                verify_max_bytes: None,
            },
            prompt: PromptConfig {
                offer_last_password: false,
            },
        };
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: MaskSmithConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
