//! Configuration loading, validation and env substitution for masksmith.
//!
//! Config files: `masksmith.toml`, `masksmith.yaml`, `masksmith.yml` or
//! `masksmith.json`, searched in `./` then `~/.config/masksmith/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        LoadedConfig, STORE_ENV, apply_env_overrides, config_dir, data_dir, default_config_path,
        discover_and_load, find_config_file, load, load_config, save_config,
    },
    schema::{CryptoConfig, MaskSmithConfig, PromptConfig, StorageConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
