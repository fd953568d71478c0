//! Port traits.
//!
//! The licensing service seen from the client flow. The HTTP adapter lives
//! in `keycheck-licensing`; tests substitute recording fakes.

use crate::Result;
use crate::license::{Machine, Validation};
use async_trait::async_trait;

/// Remote licensing service.
#[async_trait]
pub trait LicenseService: Send + Sync {
    /// Validate a license key scoped to a device fingerprint.
    async fn validate_license(&self, license_key: &str, fingerprint: &str) -> Result<Validation>;

    /// Register the device as a machine bound to the license.
    async fn activate_device(
        &self,
        license_id: &str,
        fingerprint: &str,
        activation_token: &str,
    ) -> Result<Machine>;

    /// Remove the machine registered under the fingerprint.
    async fn deactivate_device(&self, fingerprint: &str, activation_token: &str) -> Result<()>;
}
