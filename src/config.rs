//! # Toolkit Configuration
//!
//! Process-wide knobs read while handling requests and building documents.
//!
//! ## Environment Variables
//!
//! ### `BRRTS_MAX_QUERY_PARAMS`
//!
//! Ceiling on the number of `name=value` pairs parsed from one query string.
//! Accepts decimal (`10000`) or hexadecimal (`0x2710`). Requests over the
//! ceiling are rejected as client errors.
//!
//! Default: `10000`.
//!
//! ### `BRRTS_OPENAPI_VERSION`
//!
//! Value of the `openapi` field in generated documents. Default: `3.0.3`.
//!
//! ## Config files
//!
//! The same settings can be loaded from YAML:
//!
//! ```yaml
//! max_query_params: 2048
//! openapi_version: "3.0.3"
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use brrtschema::config::ToolkitConfig;
//!
//! let config = ToolkitConfig::from_yaml_str("max_query_params: 2048").unwrap();
//! assert_eq!(config.max_query_params, 2048);
//! assert_eq!(config.openapi_version, "3.0.3");
//! ```
//!
//! Install the configuration once during assembly with
//! [`ToolkitConfig::install`]; descriptors read it through
//! [`ToolkitConfig::current`], which falls back to [`ToolkitConfig::from_env`]
//! when nothing was installed.

use anyhow::{ensure, Context};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_MAX_QUERY_PARAMS: usize = 10_000;
pub const DEFAULT_OPENAPI_VERSION: &str = "3.0.3";

static INSTALLED: OnceCell<ToolkitConfig> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolkitConfig {
    /// Maximum query pairs parsed per request
    pub max_query_params: usize,
    /// `openapi` version string emitted in documents
    pub openapi_version: String,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        ToolkitConfig {
            max_query_params: DEFAULT_MAX_QUERY_PARAMS,
            openapi_version: DEFAULT_OPENAPI_VERSION.to_string(),
        }
    }
}

impl ToolkitConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars<F: Fn(&str) -> Option<String>>(get: F) -> Self {
        let mut config = ToolkitConfig::default();
        if let Some(val) = get("BRRTS_MAX_QUERY_PARAMS") {
            let parsed = match val.strip_prefix("0x") {
                Some(hex) => usize::from_str_radix(hex, 16).ok(),
                None => val.parse().ok(),
            };
            match parsed {
                Some(n) if n > 0 => config.max_query_params = n,
                _ => warn!(value = %val, "Ignoring invalid BRRTS_MAX_QUERY_PARAMS"),
            }
        }
        if let Some(val) = get("BRRTS_OPENAPI_VERSION") {
            config.openapi_version = val;
        }
        config
    }

    /// Parse YAML; an empty document yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(ToolkitConfig::default());
        }
        let config: ToolkitConfig =
            serde_yaml::from_str(yaml).context("failed to parse toolkit config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read toolkit config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("invalid toolkit config {}", path.display()))
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.max_query_params > 0, "max_query_params must be greater than zero");
        ensure!(!self.openapi_version.is_empty(), "openapi_version must not be empty");
        Ok(())
    }

    /// Install as the process-wide configuration.
    ///
    /// Returns the rejected configuration if one was already installed (or
    /// already defaulted by an earlier [`current`](Self::current) call).
    pub fn install(self) -> Result<(), ToolkitConfig> {
        let max_query_params = self.max_query_params;
        INSTALLED.set(self)?;
        info!(max_query_params, "Toolkit configuration installed");
        Ok(())
    }

    /// The installed configuration, or the environment configuration if none
    /// was installed.
    pub fn current() -> &'static ToolkitConfig {
        INSTALLED.get_or_init(ToolkitConfig::from_env)
    }
}
