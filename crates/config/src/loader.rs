use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::MaskSmithConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "masksmith.toml",
    "masksmith.yaml",
    "masksmith.yml",
    "masksmith.json",
];

/// Overrides `storage.path`.
pub const STORE_ENV: &str = "MASKSMITH_STORE";

/// A loaded config and the file it came from, if any.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: MaskSmithConfig,
    pub path: Option<PathBuf>,
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<MaskSmithConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Load the config file as an untyped value, after env substitution.
pub fn load_config_value(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config_value(&raw, path)
}

/// Load from `explicit` if given, otherwise discover; then apply env overrides.
///
/// An explicit path that cannot be loaded is an error. A discovered file that
/// cannot be loaded is logged and defaults are used instead.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<LoadedConfig> {
    let loaded = match explicit {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            LoadedConfig {
                config: load_config(path)?,
                path: Some(path.to_path_buf()),
            }
        },
        None => discover_and_load(),
    };

    Ok(LoadedConfig {
        config: apply_env_overrides(loaded.config),
        path: loaded.path,
    })
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./masksmith.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/masksmith/masksmith.{toml,yaml,yml,json}` (user-global)
///
/// Returns defaults if no config file is found.
pub fn discover_and_load() -> LoadedConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(config) => {
                return LoadedConfig {
                    config,
                    path: Some(path),
                };
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    LoadedConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    find_config_file_in(Path::new("."), config_dir().as_deref())
}

/// Find the first config file in `local`, then in `global`.
pub fn find_config_file_in(local: &Path, global: Option<&Path>) -> Option<PathBuf> {
    std::iter::once(local)
        .chain(global)
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/masksmith/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "masksmith").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory holding the secret store.
///
/// Falls back to `./.masksmith` when no home directory can be determined.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "masksmith")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".masksmith"))
}

/// Where `config init` writes when no path is given.
pub fn default_config_path() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("masksmith.toml")
}

/// Serialize `config` to TOML at `path`, creating parent directories.
pub fn save_config(config: &MaskSmithConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

/// Apply `MASKSMITH_*` environment overrides.
#[must_use]
pub fn apply_env_overrides(config: MaskSmithConfig) -> MaskSmithConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: MaskSmithConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> MaskSmithConfig {
    if let Some(path) = lookup(STORE_ENV).filter(|p| !p.is_empty()) {
        debug!(env = STORE_ENV, "store path overridden from environment");
        config.storage.path = Some(PathBuf::from(path));
    }
    config
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<MaskSmithConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

pub(crate) fn parse_config_value(raw: &str, path: &Path) -> anyhow::Result<serde_json::Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => {
            let v: toml::Value = toml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
