//! Layered client configuration.
//!
//! Precedence, lowest first: `settings.*`, `settings.<environment>.*`,
//! `KEYCHECK_*` environment variables, then the secret store for the two
//! credentials.

use ::config::{Config, Environment, File};
use keycheck_core::{Error, Result};
use keycheck_licensing::{KeygenConfig, MachineFingerprint};
use keycheck_secrets::SecretProvider;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Prefix for environment overrides, e.g. `KEYCHECK_ACCOUNT_ID`.
pub const ENV_PREFIX: &str = "KEYCHECK";

/// Prefix for secrets read from the environment, e.g. `KEYCHECK_SECRET_LICENSE_KEY`.
pub const SECRET_ENV_PREFIX: &str = "KEYCHECK_SECRET";

/// Where and how to load settings.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Directory holding `settings.*` files.
    pub config_dir: PathBuf,
    /// Environment name selecting the override file.
    pub environment: String,
    /// Replaces the process environment as the env-var source when set.
    pub env_vars: Option<HashMap<String, String>>,
}

impl LoadOptions {
    pub fn new(config_dir: PathBuf, environment: impl Into<String>) -> Self {
        Self {
            config_dir,
            environment: environment.into(),
            env_vars: None,
        }
    }
}

/// Platform configuration directory.
pub fn default_config_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("sh", "keycheck", "keycheck")
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
    Ok(dirs.config_dir().to_path_buf())
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    account_id: Option<String>,
    license_key: Option<String>,
    fingerprint: Option<String>,
    activation_token: Option<String>,
    api_url: Option<String>,
    timeout_secs: Option<u64>,
}

/// Resolved client settings. `Debug` output redacts credentials.
#[derive(Clone)]
pub struct Settings {
    pub account_id: String,
    pub license_key: String,
    pub fingerprint: String,
    pub activation_token: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("account_id", &self.account_id)
            .field("license_key", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint)
            .field("activation_token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Settings {
    /// Load settings from every layer and merge credentials from the secret store.
    pub async fn load(options: &LoadOptions, secrets: &dyn SecretProvider) -> Result<Self> {
        let mut raw = Self::load_layers(options)?;

        let credentials = [
            ("license_key", &mut raw.license_key),
            ("activation_token", &mut raw.activation_token),
        ];
        for (key, slot) in credentials {
            if let Some(secret) = secrets.lookup(key).await? {
                debug!(key, provider = secrets.name(), "Setting overridden from secret store");
                *slot = Some(secret.value);
            }
        }

        Self::resolve(raw)
    }

    fn load_layers(options: &LoadOptions) -> Result<RawSettings> {
        let base = options.config_dir.join("settings");
        let per_env = options
            .config_dir
            .join(format!("settings.{}", options.environment));

        debug!(
            config_dir = %options.config_dir.display(),
            environment = %options.environment,
            "Loading settings"
        );

        Config::builder()
            .add_source(File::with_name(&base.to_string_lossy()).required(false))
            .add_source(File::with_name(&per_env.to_string_lossy()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).source(options.env_vars.clone()))
            .build()
            .and_then(|c| c.try_deserialize::<RawSettings>())
            .map_err(|e| Error::Config(e.to_string()))
    }

    fn resolve(raw: RawSettings) -> Result<Self> {
        let fingerprint = match non_empty(raw.fingerprint) {
            Some(fp) => fp,
            None => {
                let fp = MachineFingerprint::current();
                info!(
                    fingerprint = %fp.id,
                    hostname = %fp.hostname,
                    platform = %fp.platform,
                    "No fingerprint configured, derived one from host"
                );
                fp.id
            }
        };

        let defaults = KeygenConfig::default();

        Ok(Self {
            account_id: required(raw.account_id, "account_id")?,
            license_key: required(raw.license_key, "license_key")?,
            fingerprint,
            activation_token: required(raw.activation_token, "activation_token")?,
            api_url: non_empty(raw.api_url).unwrap_or(defaults.api_url),
            timeout_secs: raw.timeout_secs.unwrap_or(defaults.timeout_secs),
        })
    }

    /// Licensing client configuration for these settings.
    pub fn keygen_config(&self) -> KeygenConfig {
        KeygenConfig {
            account_id: self.account_id.clone(),
            api_url: self.api_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    non_empty(value).ok_or_else(|| Error::Config(format!("Missing required setting: {}", key)))
}
