//! Keygen.sh API client for license validation and machine activation.

use async_trait::async_trait;
use keycheck_core::{Error, License, LicenseService, Machine, Result, Validation, ValidationResult};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

const JSON_API: &str = "application/vnd.api+json";

/// Keygen API configuration.
#[derive(Debug, Clone)]
pub struct KeygenConfig {
    /// Keygen account ID.
    pub account_id: String,
    /// API base URL.
    pub api_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for KeygenConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            api_url: "https://api.keygen.sh".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Keygen API client.
pub struct KeygenClient {
    base_url: Url,
    account_id: String,
    client: reqwest::Client,
}

/// JSON:API document. Resource and metadata kinds vary independently.
#[derive(Debug, Deserialize)]
struct Document<D, M = IgnoredAny> {
    data: Option<D>,
    meta: Option<M>,
    #[serde(default)]
    errors: Vec<ErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorObject {
    #[serde(default)]
    title: String,
    detail: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Serialize)]
struct ValidateLicenseRequest<'a> {
    meta: ValidateMeta<'a>,
}

#[derive(Debug, Serialize)]
struct ValidateMeta<'a> {
    key: &'a str,
    scope: ValidateScope<'a>,
}

#[derive(Debug, Serialize)]
struct ValidateScope<'a> {
    fingerprint: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateMachineRequest<'a> {
    data: MachineData<'a>,
}

#[derive(Debug, Serialize)]
struct MachineData<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    attributes: MachineAttributes<'a>,
    relationships: MachineRelationships<'a>,
}

#[derive(Debug, Serialize)]
struct MachineAttributes<'a> {
    fingerprint: &'a str,
}

#[derive(Debug, Serialize)]
struct MachineRelationships<'a> {
    license: Relationship<'a>,
}

#[derive(Debug, Serialize)]
struct Relationship<'a> {
    data: ResourceIdentifier<'a>,
}

#[derive(Debug, Serialize)]
struct ResourceIdentifier<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    id: &'a str,
}

impl KeygenClient {
    /// Create a new Keygen client.
    pub fn new(config: KeygenConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| Error::Config(format!("Invalid API URL {}: {}", config.api_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("Invalid API URL {}", config.api_url)));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("keycheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            base_url,
            account_id: config.account_id,
            client,
        })
    }

    /// Build `{api_url}/v1/accounts/{account_id}/{segments...}`, encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["v1", "accounts", self.account_id.as_str()])
                .extend(segments);
        }
        url
    }

    /// Validate a license key scoped to a device fingerprint.
    pub async fn validate_license(&self, license_key: &str, fingerprint: &str) -> Result<Validation> {
        info!(
            key_prefix = license_key.get(..8).unwrap_or(license_key),
            fingerprint, "Validating license"
        );

        let request = ValidateLicenseRequest {
            meta: ValidateMeta {
                key: license_key,
                scope: ValidateScope { fingerprint },
            },
        };

        let url = self.endpoint(&["licenses", "actions", "validate-key"]);
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, JSON_API)
            .header(ACCEPT, JSON_API)
            .body(serde_json::to_vec(&request)?)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let body: Document<License, ValidationResult> = decode(response).await?;

        let result = body.meta.ok_or_else(|| {
            Error::Serialization("No validation metadata in response".to_string())
        })?;

        debug!(
            license_id = body.data.as_ref().map(|l| l.id.as_str()),
            valid = result.valid,
            code = %result.code,
            "Validation response decoded"
        );

        Ok(Validation {
            license: body.data,
            result,
        })
    }

    /// Register the device as a machine bound to the license.
    pub async fn activate_device(
        &self,
        license_id: &str,
        fingerprint: &str,
        activation_token: &str,
    ) -> Result<Machine> {
        info!(license_id, fingerprint, "Activating machine");

        let request = CreateMachineRequest {
            data: MachineData {
                kind: "machine",
                attributes: MachineAttributes { fingerprint },
                relationships: MachineRelationships {
                    license: Relationship {
                        data: ResourceIdentifier {
                            kind: "license",
                            id: license_id,
                        },
                    },
                },
            },
        };

        let url = self.endpoint(&["machines"]);
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, JSON_API)
            .header(ACCEPT, JSON_API)
            .header(AUTHORIZATION, format!("Bearer {}", activation_token))
            .body(serde_json::to_vec(&request)?)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let body: Document<Machine> = decode(response).await?;

        let machine = body
            .data
            .ok_or_else(|| Error::Serialization("No machine data in response".to_string()))?;

        info!(machine_id = %machine.id, license_id, "Machine activated");
        Ok(machine)
    }

    /// Delete the machine registered under the fingerprint. Only `204 No Content` counts as success.
    pub async fn deactivate_device(&self, fingerprint: &str, activation_token: &str) -> Result<()> {
        info!(fingerprint, "Deactivating machine");

        let url = self.endpoint(&["machines", fingerprint]);
        let response = self
            .client
            .delete(url)
            .header(ACCEPT, JSON_API)
            .header(AUTHORIZATION, format!("Bearer {}", activation_token))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            info!(fingerprint, "Machine deactivated");
            return Ok(());
        }

        let bytes = response.bytes().await.unwrap_or_default();
        let first = serde_json::from_slice::<Document<IgnoredAny>>(&bytes)
            .ok()
            .and_then(|doc| doc.errors.into_iter().next());

        let err = match first {
            Some(e) => api_error(status, e),
            None => status_error(status),
        };
        error!(status = %status, "Machine deactivation failed");
        Err(err)
    }
}

/// Decode a JSON:API document, turning a non-empty error list or an
/// undecodable non-2xx response into `Error::Api`.
async fn decode<D, M>(response: reqwest::Response) -> Result<Document<D, M>>
where
    D: DeserializeOwned,
    M: DeserializeOwned,
{
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    let document: Document<D, M> = match serde_json::from_slice(&bytes) {
        Ok(document) => document,
        Err(_) if !status.is_success() => return Err(status_error(status)),
        Err(e) => return Err(e.into()),
    };

    if let Some(first) = document.errors.first() {
        if document.errors.len() > 1 {
            debug!(count = document.errors.len(), "Response carried multiple errors");
        }
        warn!(
            status = %status,
            title = %first.title,
            code = first.code.as_deref(),
            "Licensing API rejected request"
        );
        return Err(api_error(status, first.clone()));
    }

    if !status.is_success() {
        return Err(status_error(status));
    }

    Ok(document)
}

fn api_error(status: StatusCode, e: ErrorObject) -> Error {
    Error::Api {
        status: status.as_u16(),
        title: e.title,
        detail: e.detail,
        code: e.code,
    }
}

fn status_error(status: StatusCode) -> Error {
    Error::Api {
        status: status.as_u16(),
        title: status
            .canonical_reason()
            .unwrap_or("Unexpected status")
            .to_string(),
        detail: None,
        code: None,
    }
}

#[async_trait]
impl LicenseService for KeygenClient {
    async fn validate_license(&self, license_key: &str, fingerprint: &str) -> Result<Validation> {
        KeygenClient::validate_license(self, license_key, fingerprint).await
    }

    async fn activate_device(
        &self,
        license_id: &str,
        fingerprint: &str,
        activation_token: &str,
    ) -> Result<Machine> {
        KeygenClient::activate_device(self, license_id, fingerprint, activation_token).await
    }

    async fn deactivate_device(&self, fingerprint: &str, activation_token: &str) -> Result<()> {
        KeygenClient::deactivate_device(self, fingerprint, activation_token).await
    }
}
