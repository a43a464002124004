use crate::fetch::WgetFetcher;
use crate::product::{ProductError, ProductRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "granule-sync.json";

/// Environment variable holding the archive bearer token
pub const TOKEN_ENV_VAR: &str = "NASA_EARTHDATA_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error(
        "No archive token provided. Set {} or add \"token\" to the config file",
        TOKEN_ENV_VAR
    )]
    MissingToken,

    #[error(transparent)]
    Product(#[from] ProductError),
}

/// Product and credential a run works with, settled before any date is touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTarget {
    pub product: String,
    pub token: String,
}

fn default_inventory_root() -> PathBuf {
    PathBuf::from("./INFOR")
}

fn default_data_root() -> PathBuf {
    PathBuf::from("./DATA")
}

/// Sync configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Where `<product>/<YYYY>/<YYYY-MM-DD>.csv` inventories live
    #[serde(default = "default_inventory_root")]
    pub inventory_root: PathBuf,
    /// Canonical artifact root, checked first for presence
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    /// Fallback token when the environment does not provide one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_products: Vec<String>,
    #[serde(default)]
    pub wget: WgetFetcher,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            inventory_root: default_inventory_root(),
            data_root: default_data_root(),
            token: None,
            extra_products: Vec::new(),
            wget: WgetFetcher::default(),
        }
    }
}

impl SyncConfig {
    /// Pick the bearer token: environment first, config file second.
    /// Blank values count as absent.
    pub fn resolve_token(&self, env_token: Option<&str>) -> Result<String, ConfigError> {
        env_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| self.token.as_deref().map(str::trim).filter(|t| !t.is_empty()))
            .map(str::to_string)
            .ok_or(ConfigError::MissingToken)
    }

    /// Check the requested product against the built-in and configured names,
    /// then resolve the token. Either failure is fatal for the whole run.
    pub fn resolve_target(
        &self,
        product: &str,
        env_token: Option<&str>,
    ) -> Result<RunTarget, ConfigError> {
        let registry = ProductRegistry::with_extra(&self.extra_products)?;
        let product = registry.resolve(product)?.to_string();
        let token = self.resolve_token(env_token)?;
        Ok(RunTarget { product, token })
    }
}

/// Read the configuration file
pub async fn read_config(config_path: &Path) -> Result<SyncConfig, ConfigError> {
    if !config_path.exists() {
        return Err(ConfigError::NotFound(config_path.to_path_buf()));
    }

    let content = fs::read_to_string(config_path).await?;
    let config: SyncConfig = serde_json::from_str(&content)?;
    Ok(config)
}
