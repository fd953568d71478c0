//! Secret provider trait and implementations.

use async_trait::async_trait;
use keycheck_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A secret value. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue {
    pub value: String,
}

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Trait for secret providers.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Get a secret by name.
    async fn get(&self, name: &str) -> Result<SecretValue>;

    /// Check if a secret exists.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Get a secret, treating a missing one as `None`.
    async fn lookup(&self, name: &str) -> Result<Option<SecretValue>> {
        match self.get(name).await {
            Ok(value) => Ok(Some(value)),
            Err(Error::SecretNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Environment variable secret provider.
///
/// `license_key` with prefix `KEYCHECK_SECRET` resolves to `KEYCHECK_SECRET_LICENSE_KEY`.
pub struct EnvProvider {
    prefix: Option<String>,
}

impl EnvProvider {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    fn resolve_name(&self, name: &str) -> String {
        let name = name.to_uppercase();
        match &self.prefix {
            Some(p) => format!("{}_{}", p, name),
            None => name,
        }
    }
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl SecretProvider for EnvProvider {
    async fn get(&self, name: &str) -> Result<SecretValue> {
        let env_name = self.resolve_name(name);
        std::env::var(&env_name)
            .map(SecretValue::new)
            .map_err(|_| Error::SecretNotFound(name.to_string()))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let env_name = self.resolve_name(name);
        Ok(std::env::var(&env_name).is_ok())
    }

    fn name(&self) -> &str {
        "env"
    }
}

/// File-backed secret provider. The file is a flat JSON object of names to values.
pub struct FileProvider {
    secrets: HashMap<String, String>,
}

impl FileProvider {
    pub fn from_map(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }

    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!(
                "Failed to read secrets file {}: {}",
                path.display(),
                e
            ))
        })?;

        let secrets: HashMap<String, String> = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse secrets file {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(path = %path.display(), count = secrets.len(), "Loaded secrets file");
        Ok(Self { secrets })
    }
}

#[async_trait]
impl SecretProvider for FileProvider {
    async fn get(&self, name: &str) -> Result<SecretValue> {
        self.secrets
            .get(name)
            .map(|value| SecretValue::new(value.clone()))
            .ok_or_else(|| Error::SecretNotFound(name.to_string()))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.secrets.contains_key(name))
    }

    fn name(&self) -> &str {
        "file"
    }
}
