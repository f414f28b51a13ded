use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::overrides::ConfigOverrides;
use super::{DiscoveryConfig, EncryptionConfig, ExecutionConfig, OutputConfig};

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

const ENV_PREFIX: &str = "BATCHCRYPTOR_";
const REPO_CONFIG_FILE: &str = "batchcryptor.toml";

/// Fully merged configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub encryption: EncryptionConfig,
    pub discovery: DiscoveryConfig,
    pub execution: ExecutionConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load the layered configuration.
    ///
    /// 1. embedded defaults
    /// 2. `~/.config/batchcryptor/config.toml`
    /// 3. `./batchcryptor.toml`
    /// 4. `custom_config`, which must exist when given
    /// 5. `BATCHCRYPTOR_*` environment, `__` separating sections
    /// 6. CLI overrides
    pub fn load(custom_config: Option<&Path>, cli_overrides: Option<&ConfigOverrides>) -> Result<Self> {
        tracing::trace!("CONFIG LOAD: Starting");

        let mut figment = Figment::new()
            .merge(Toml::string(DEFAULT_CONFIG))
            .merge(Toml::file(Self::user_config_path()))
            .merge(Toml::file(REPO_CONFIG_FILE));

        if let Some(path) = custom_config {
            if !path.is_file() {
                bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(overrides) = cli_overrides {
            tracing::trace!("CONFIG LOAD: Applying CLI overrides");
            figment = figment.merge(Serialized::defaults(overrides.to_value()));
        }

        let config: AppConfig = figment
            .extract()
            .context("Failed to load configuration")?;
        tracing::trace!("CONFIG LOAD: Final config = {:?}", config);
        Ok(config)
    }

    /// Effective configuration rendered as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }

    fn user_config_path() -> PathBuf {
        match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(".config/batchcryptor/config.toml"),
            Err(_) => PathBuf::from("~/.config/batchcryptor/config.toml"),
        }
    }
}
