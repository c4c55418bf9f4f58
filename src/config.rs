use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::constants::{self, DEFAULT_AUTHORITY_HOST};
use crate::api::GraphError;

pub const BASE_FILE: &str = "appsettings.toml";
pub const DEVELOPMENT_FILE: &str = "appsettings.development.toml";
pub const ENV_PREFIX: &str = "GRAPH_SEARCH_";

const MISSING_SETTINGS: &str =
    "Could not load app settings. See README for configuration instructions";

/// Identity settings, the `[app_settings]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Example: ["user.read", "files.read"]
    #[serde(default)]
    pub graph_user_scopes: Vec<String>,
    #[serde(default)]
    pub run_device_code_flow: bool,
    /// Space separated, e.g. "user.read files.read"
    #[serde(default)]
    pub token_request_context_scopes: Option<String>,
    #[serde(default = "default_authority_host")]
    pub authority_host: String,
    /// 0 binds an ephemeral port
    #[serde(default)]
    pub redirect_port: u16,
    #[serde(default = "default_browser_timeout_secs")]
    pub browser_timeout_secs: u64,
}

fn default_authority_host() -> String {
    DEFAULT_AUTHORITY_HOST.to_string()
}

fn default_browser_timeout_secs() -> u64 {
    300
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            tenant_id: None,
            graph_user_scopes: Vec::new(),
            run_device_code_flow: false,
            token_request_context_scopes: None,
            authority_host: default_authority_host(),
            redirect_port: 0,
            browser_timeout_secs: default_browser_timeout_secs(),
        }
    }
}

impl AuthConfig {
    /// Fully qualified Graph scopes for the "display access token" request
    pub fn token_request_scopes(&self) -> Vec<String> {
        self.token_request_context_scopes
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(constants::graph_scope)
            .collect()
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_secs(self.browser_timeout_secs)
    }
}

/// The optional `[graph]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSettings {
    /// Overrides `https://graph.microsoft.com` (national clouds, tests)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub use_beta_endpoint: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app_settings: AuthConfig,
    #[serde(default)]
    pub graph: GraphSettings,
}

impl Config {
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("graph-search-cli")
        } else {
            // Use home directory with dot prefix on Windows/Mac
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".graph-search-cli")
        };
        Ok(config_dir)
    }

    /// Resolve the base settings file: explicit path, working directory, config directory
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        let local = PathBuf::from(BASE_FILE);
        if local.exists() {
            return Ok(local);
        }

        Ok(Self::get_config_dir()?.join(BASE_FILE))
    }

    /// Load all layers: base file, development file, `.env` and process environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        // .env is optional, values land in the process environment
        dotenvy::dotenv().ok();

        let base_path = Self::locate(explicit)?;
        let env_vars = std::env::vars().filter(|(key, _)| key.starts_with(ENV_PREFIX));
        Self::load_layers(&base_path, env_vars)
    }

    /// Load from a base file plus explicit environment overrides
    pub fn load_layers<I>(base_path: &Path, env_vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        debug!("Loading settings from: {:?}", base_path);

        if !base_path.exists() {
            return Err(GraphError::Configuration(format!(
                "{} (missing {:?})",
                MISSING_SETTINGS, base_path
            ))
            .into());
        }

        let mut table = read_table(base_path)?;

        let development = base_path
            .parent()
            .map(|dir| dir.join(DEVELOPMENT_FILE))
            .filter(|path| path.exists());
        if let Some(path) = development {
            info!("Applying development overrides from: {:?}", path);
            merge_tables(&mut table, read_table(&path)?);
        }

        let overrides = env_overrides(env_vars)?;
        if !overrides.is_empty() {
            debug!("Applying {} environment overrides", overrides.len());
            let mut wrapper = toml::Table::new();
            wrapper.insert("app_settings".to_string(), toml::Value::Table(overrides));
            merge_tables(&mut table, wrapper);
        }

        if !table.contains_key("app_settings") {
            return Err(GraphError::Configuration(MISSING_SETTINGS.to_string()).into());
        }

        let config: Config = toml::Value::Table(table)
            .try_into()
            .with_context(|| format!("Failed to parse settings: {:?}", base_path))?;

        debug!(
            "Loaded settings (device code flow: {}, {} scopes)",
            config.app_settings.run_device_code_flow,
            config.app_settings.graph_user_scopes.len()
        );
        Ok(config)
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {:?}", path))?;
    content
        .parse::<toml::Table>()
        .with_context(|| format!("Failed to parse settings file: {:?}", path))
}

/// Deep merge, values from `overlay` win
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn env_overrides<I>(env_vars: I) -> Result<toml::Table>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut table = toml::Table::new();

    for (key, raw) in env_vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        let (field, value) = match name {
            "CLIENT_ID" => ("client_id", toml::Value::String(raw)),
            "TENANT_ID" => ("tenant_id", toml::Value::String(raw)),
            "TOKEN_REQUEST_CONTEXT_SCOPES" => {
                ("token_request_context_scopes", toml::Value::String(raw))
            }
            "GRAPH_USER_SCOPES" => {
                let scopes = raw
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(|s| toml::Value::String(s.to_string()))
                    .collect();
                ("graph_user_scopes", toml::Value::Array(scopes))
            }
            "RUN_DEVICE_CODE_FLOW" => {
                let flag = raw.trim().parse::<bool>().map_err(|_| {
                    GraphError::Configuration(format!(
                        "{} must be true or false, got '{}'",
                        key, raw
                    ))
                })?;
                ("run_device_code_flow", toml::Value::Boolean(flag))
            }
            _ => continue,
        };

        table.insert(field.to_string(), value);
    }

    Ok(table)
}
